use actix_files::Files;
use actix_multipart::Multipart;
use actix_web::{Error, HttpResponse, web};
use futures::{StreamExt, TryStreamExt};
use log::{error, info};
use serde::Serialize;
use std::io::Write;

use crate::auth::middleware::AuthenticatedUser;
use crate::inference::classifier::{CLASS_LABELS, Classifier, ClassifyError};
use crate::inference::preprocess::PreprocessError;
use crate::storage::upload_store::UploadStore;

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

/// Empty form state, also returned for a POST that carried no file.
#[derive(Serialize)]
struct PredictForm {
    prediction: Option<String>,
    uploaded_image: Option<String>,
}

#[derive(Serialize)]
struct PredictionResponse {
    prediction: String,
    class_index: usize,
    probabilities: Vec<f32>,
    class_labels: Vec<String>,
    uploaded_image: String,
}

pub fn configure_routes(cfg: &mut web::ServiceConfig, upload_dir: String) {
    cfg.service(
        web::resource("/predict")
            .route(web::get().to(predict_form))
            .route(web::post().to(predict)),
    )
    .service(Files::new("/uploads", upload_dir));
}

async fn predict_form(_user: AuthenticatedUser) -> HttpResponse {
    HttpResponse::Ok().json(PredictForm {
        prediction: None,
        uploaded_image: None,
    })
}

/// The end-to-end predict flow: store the upload, preprocess, run one
/// forward pass, map the argmax to a label. Any failure aborts the request;
/// nothing is retried.
async fn predict(
    user: AuthenticatedUser,
    classifier: web::Data<Classifier>,
    store: web::Data<UploadStore>,
    mut payload: Multipart,
) -> Result<HttpResponse, Error> {
    let mut upload: Option<(String, Vec<u8>)> = None;

    while let Ok(Some(mut field)) = payload.try_next().await {
        let Some(disposition) = field.content_disposition() else {
            continue;
        };
        if disposition.get_name() != Some("image") {
            continue;
        }
        let Some(filename) = disposition.get_filename().map(str::to_string) else {
            continue;
        };

        let mut bytes = Vec::new();
        while let Some(chunk) = field.next().await {
            bytes.write_all(&chunk?)?;
        }
        if !filename.is_empty() && !bytes.is_empty() {
            upload = Some((filename, bytes));
            break;
        }
    }

    let Some((filename, bytes)) = upload else {
        return Ok(HttpResponse::Ok().json(PredictForm {
            prediction: None,
            uploaded_image: None,
        }));
    };

    let stored_name = match store.store(&filename, &bytes) {
        Ok(name) => name,
        Err(e) => {
            error!("upload write failed for {}: {}", user.0.email, e);
            return Ok(HttpResponse::InternalServerError().json(ErrorResponse {
                error: "failed to store upload".into(),
            }));
        }
    };

    match classifier.classify(&store.path_of(&stored_name)) {
        Ok(prediction) => {
            info!(
                "classified {} as {} for {}",
                stored_name, prediction.label, user.0.email
            );
            Ok(HttpResponse::Ok().json(PredictionResponse {
                prediction: prediction.label.to_string(),
                class_index: prediction.index,
                probabilities: prediction.probabilities,
                class_labels: CLASS_LABELS.iter().map(|s| s.to_string()).collect(),
                uploaded_image: stored_name,
            }))
        }
        Err(ClassifyError::Preprocess(PreprocessError::Decode(e))) => {
            error!("undecodable upload {}: {}", stored_name, e);
            Ok(HttpResponse::BadRequest().json(ErrorResponse {
                error: "uploaded file is not a decodable image".into(),
            }))
        }
        Err(e) => {
            error!("classification failed for {}: {}", stored_name, e);
            Ok(HttpResponse::InternalServerError().json(ErrorResponse {
                error: "classification failed".into(),
            }))
        }
    }
}
