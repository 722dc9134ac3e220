use actix_web::{HttpRequest, HttpResponse, cookie::Cookie, web};
use serde::Deserialize;

use super::middleware::{AuthenticatedUser, SESSION_COOKIE};
use super::service::{AuthError, AuthService};
use super::session::SessionStore;

#[derive(serde::Serialize)]
struct ErrorResponse {
    error: String,
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

pub fn configure_auth_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/register").route(web::post().to(register)))
        .service(web::resource("/login").route(web::post().to(login)))
        .service(web::resource("/logout").route(web::post().to(logout)))
        .service(web::resource("/me").route(web::get().to(me)));
}

async fn register(auth: web::Data<AuthService>, body: web::Json<RegisterRequest>) -> HttpResponse {
    match auth.register(&body.name, &body.email, &body.password) {
        Ok(()) => HttpResponse::Created().json(serde_json::json!({ "status": "registered" })),
        Err(e @ AuthError::DuplicateEmail) => HttpResponse::Conflict().json(ErrorResponse {
            error: e.to_string(),
        }),
        Err(e) => HttpResponse::BadRequest().json(ErrorResponse {
            error: e.to_string(),
        }),
    }
}

async fn login(
    auth: web::Data<AuthService>,
    sessions: web::Data<SessionStore>,
    body: web::Json<LoginRequest>,
) -> HttpResponse {
    match auth.verify(&body.email, &body.password) {
        Ok(identity) => {
            let token = sessions.create(identity.clone());
            log::info!("session opened for {}", identity.email);
            let cookie = Cookie::build(SESSION_COOKIE, token)
                .path("/")
                .http_only(true)
                .finish();
            HttpResponse::Ok().cookie(cookie).json(identity)
        }
        Err(e) => {
            log::warn!("login rejected: {}", e);
            HttpResponse::Unauthorized().json(ErrorResponse {
                error: e.to_string(),
            })
        }
    }
}

async fn logout(req: HttpRequest, sessions: web::Data<SessionStore>) -> HttpResponse {
    if let Some(cookie) = req.cookie(SESSION_COOKIE) {
        sessions.revoke(cookie.value());
    }
    let mut removal = Cookie::new(SESSION_COOKIE, "");
    removal.set_path("/");
    removal.make_removal();
    HttpResponse::Ok()
        .cookie(removal)
        .json(serde_json::json!({ "status": "logged out" }))
}

async fn me(user: AuthenticatedUser) -> HttpResponse {
    HttpResponse::Ok().json(user.0)
}
