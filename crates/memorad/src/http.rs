//! HTTP interface.
//!
//! `GET /` is a liveness check; `POST /recognize` takes a multipart upload
//! with a `file` field. Every outcome, including malformed requests, is a
//! `200` JSON body tagged by `status`.

use crate::engine::EngineHandle;
use axum::extract::multipart::{Multipart, MultipartError, MultipartRejection};
use axum::extract::{DefaultBodyLimit, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use memora_core::RecognitionResult;
use thiserror::Error;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Multipart field carrying the photo.
const UPLOAD_FIELD: &str = "file";

#[derive(Clone)]
struct AppState {
    engine: EngineHandle,
}

#[derive(Error, Debug)]
enum UploadError {
    #[error("invalid multipart request: {0}")]
    Rejected(#[from] MultipartRejection),
    #[error("malformed upload: {0}")]
    Multipart(#[from] MultipartError),
    #[error("missing `file` field in upload")]
    MissingFile,
}

/// Build the application router.
pub fn router(engine: EngineHandle, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/", get(home))
        .route("/recognize", post(recognize))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(CorsLayer::very_permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(AppState { engine })
}

async fn home() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "message": "Memora Backend Active" }))
}

async fn recognize(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Json<RecognitionResult> {
    let request_id = uuid::Uuid::new_v4().to_string();

    let upload = match read_upload(multipart).await {
        Ok(bytes) => bytes,
        Err(err) => {
            tracing::warn!(%request_id, error = %err, "rejected upload");
            return Json(RecognitionResult::error(err.to_string()));
        }
    };

    match state.engine.recognize(upload, request_id.clone()).await {
        Ok(result) => Json(result),
        Err(err) => {
            tracing::error!(%request_id, error = %err, "engine unavailable");
            Json(RecognitionResult::error(err.to_string()))
        }
    }
}

/// Bytes of the first `file` field. Other fields are ignored.
async fn read_upload(multipart: Result<Multipart, MultipartRejection>) -> Result<Vec<u8>, UploadError> {
    let mut multipart = multipart?;
    while let Some(field) = multipart.next_field().await? {
        if field.name() == Some(UPLOAD_FIELD) {
            let file_name = field.file_name().map(str::to_owned);
            let bytes = field.bytes().await?;
            tracing::debug!(file_name = ?file_name, bytes = bytes.len(), "upload received");
            return Ok(bytes.to_vec());
        }
    }
    Err(UploadError::MissingFile)
}
