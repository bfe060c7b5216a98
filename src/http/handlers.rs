//! HTTP request handlers
//!
//! Implements handlers for the ingest and job endpoints.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;

use crate::error::IngestError;
use crate::registry::JobSummary;
use crate::service::VodIngestRequest;
use crate::state::AppState;

/// HTTP error type
#[derive(Debug)]
pub enum HttpError {
    BadRequest(String),
    JobNotFound(String),
    InternalError(String),
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            HttpError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            HttpError::JobNotFound(key) => (StatusCode::NOT_FOUND, format!("Job not found: {}", key)),
            HttpError::InternalError(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        (status, body).into_response()
    }
}

impl From<IngestError> for HttpError {
    fn from(err: IngestError) -> Self {
        match err {
            IngestError::InvalidUrl(_) | IngestError::InvalidAsset(_) => {
                HttpError::BadRequest(err.to_string())
            }
            _ => HttpError::InternalError(err.to_string()),
        }
    }
}

impl From<JsonRejection> for HttpError {
    fn from(rejection: JsonRejection) -> Self {
        HttpError::BadRequest(format!("Invalid JSON: {}", rejection.body_text()))
    }
}

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "OK"
}

/// Version endpoint
pub async fn version_check() -> &'static str {
    concat!("vod-ingest v", env!("CARGO_PKG_VERSION"))
}

/// Start an ingest job
/// GET|POST /api/Media/Ingest/VOD
pub async fn ingest_vod(
    State(state): State<Arc<AppState>>,
    body: Result<Json<VodIngestRequest>, JsonRejection>,
) -> Result<Json<JobSummary>, HttpError> {
    let Json(request) = body?;
    let job = state.service.ingest_hls(&request).await?;
    Ok(Json(job.summary()))
}

/// List all known jobs
/// GET /api/jobs
pub async fn list_jobs(State(state): State<Arc<AppState>>) -> Json<Vec<JobSummary>> {
    Json(state.jobs.jobs().iter().map(|job| job.summary()).collect())
}

/// Cancel and remove a job
/// DELETE /api/jobs/{key}
pub async fn cancel_job(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
) -> Result<Json<JobSummary>, HttpError> {
    let job = state
        .cancel_job(&key)
        .ok_or_else(|| HttpError::JobNotFound(key.clone()))?;
    tracing::info!("Cancelled job {} ({})", key, job.id);
    Ok(Json(job.summary()))
}
