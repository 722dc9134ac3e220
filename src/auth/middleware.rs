use actix_web::{
    Error, HttpMessage, HttpResponse,
    dev::{Service, ServiceRequest, ServiceResponse, Transform, forward_ready},
    http::header,
};
use actix_web::{FromRequest, HttpRequest};
use futures::future::{Ready, err, ok};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use super::session::{SessionIdentity, SessionStore};

pub const SESSION_COOKIE: &str = "session";

/// Paths that require a live session. Everything else passes through.
const GATED_PREFIXES: [&str; 2] = ["/predict", "/me"];

/// Admits or rejects requests to gated paths based on the session cookie.
/// Rejection is a redirect to the login flow, not an error response.
#[derive(Clone)]
pub struct SessionGate {
    sessions: Arc<SessionStore>,
}

impl SessionGate {
    pub fn new(sessions: Arc<SessionStore>) -> Self {
        Self { sessions }
    }
}

impl<S, B> Transform<S, ServiceRequest> for SessionGate
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<actix_web::body::EitherBody<B>>;
    type Error = Error;
    type Transform = SessionGateService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(SessionGateService {
            service: Arc::new(service),
            sessions: self.sessions.clone(),
        })
    }
}

pub struct SessionGateService<S> {
    service: Arc<S>,
    sessions: Arc<SessionStore>,
}

impl<S, B> Service<ServiceRequest> for SessionGateService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<actix_web::body::EitherBody<B>>;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = self.service.clone();
        let sessions = self.sessions.clone();

        Box::pin(async move {
            let path = req.path().to_string();
            if !GATED_PREFIXES.iter().any(|p| path.starts_with(p)) {
                let res = service.call(req).await?;
                return Ok(res.map_into_left_body());
            }

            let token = req.cookie(SESSION_COOKIE).map(|c| c.value().to_string());
            match token.as_deref().and_then(|t| sessions.resolve(t)) {
                Some(identity) => {
                    req.extensions_mut().insert(identity);
                    let res = service.call(req).await?;
                    Ok(res.map_into_left_body())
                }
                None => {
                    log::debug!("no live session for gated path {}", path);
                    let (http_req, _payload) = req.into_parts();
                    let response = HttpResponse::Found()
                        .insert_header((header::LOCATION, "/login"))
                        .finish()
                        .map_into_right_body();
                    Ok(ServiceResponse::new(http_req, response))
                }
            }
        })
    }
}

/// Extractor for handlers behind the gate. The gate inserts the resolved
/// identity into request extensions before the handler runs.
pub struct AuthenticatedUser(pub SessionIdentity);

impl FromRequest for AuthenticatedUser {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut actix_web::dev::Payload) -> Self::Future {
        match req.extensions().get::<SessionIdentity>() {
            Some(identity) => ok(AuthenticatedUser(identity.clone())),
            None => {
                log::warn!(
                    "AuthenticatedUser extractor hit without a gated session on {}",
                    req.path()
                );
                err(actix_web::error::ErrorUnauthorized("no session"))
            }
        }
    }
}
