mod auth;
mod inference;
mod routes;
mod storage;

use actix_cors::Cors;
use actix_web::{App, HttpServer, web};
use std::env;
use std::path::PathBuf;

use auth::middleware::SessionGate;
use auth::routes::configure_auth_routes;
use auth::service::AuthService;
use auth::session::SessionStore;
use inference::classifier::{CLASS_LABELS, Classifier};
use inference::model::ModelHost;
use routes::configure_routes;
use storage::upload_store::UploadStore;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));
    dotenv::dotenv().ok();

    let model_path =
        env::var("MODEL_PATH").unwrap_or_else(|_| "models/retina_xception.pt".to_string());
    let upload_dir = env::var("UPLOAD_DIR").unwrap_or_else(|_| "static/uploads".to_string());
    let port = env::var("PORT").unwrap_or_else(|_| "8081".to_string());

    // The process must not serve without a loadable model whose output
    // width matches the label table.
    let model = match ModelHost::load(&PathBuf::from(&model_path)) {
        Ok(model) => model,
        Err(e) => {
            log::error!("failed to load model from {}: {}", model_path, e);
            return Err(std::io::Error::new(
                std::io::ErrorKind::Other,
                format!("model loading failed: {}", e),
            ));
        }
    };
    if let Err(e) = model.validate_class_count(CLASS_LABELS.len()) {
        log::error!("model validation failed: {}", e);
        return Err(std::io::Error::new(
            std::io::ErrorKind::Other,
            format!("model validation failed: {}", e),
        ));
    }
    let classifier = Classifier::new(model);

    let store = match UploadStore::new(&upload_dir) {
        Ok(store) => store,
        Err(e) => {
            log::error!("failed to prepare upload directory {}: {}", upload_dir, e);
            return Err(std::io::Error::new(
                std::io::ErrorKind::Other,
                format!("upload directory unavailable: {}", e),
            ));
        }
    };

    let auth_service = web::Data::new(AuthService::new());
    let sessions = web::Data::new(SessionStore::new());
    let session_gate = SessionGate::new(sessions.clone().into_inner());

    let bind_address = format!("0.0.0.0:{}", port);
    log::info!("model loaded from {}, uploads under {}", model_path, upload_dir);
    log::info!("starting server on {}", bind_address);

    HttpServer::new(move || {
        App::new()
            .wrap(
                Cors::default()
                    .allow_any_origin()
                    .allowed_methods(vec!["GET", "POST", "OPTIONS"])
                    .allowed_headers(vec![
                        actix_web::http::header::AUTHORIZATION,
                        actix_web::http::header::ACCEPT,
                        actix_web::http::header::CONTENT_TYPE,
                    ])
                    .max_age(3600),
            )
            .wrap(session_gate.clone())
            .app_data(web::Data::new(classifier.clone()))
            .app_data(web::Data::new(store.clone()))
            .app_data(auth_service.clone())
            .app_data(sessions.clone())
            .configure(configure_auth_routes)
            .configure(|cfg| configure_routes(cfg, upload_dir.clone()))
    })
    .bind(&bind_address)?
    .run()
    .await
}
