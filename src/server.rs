//! HTTP surface: dataset upload endpoint and liveness probe

use crate::config::AppConfig;
use crate::ingest::{load_dataset, DatasetError};
use crate::metrics::TrainingMetrics;
use crate::trainer::TrainingEngine;
use crate::types::report::{ModelOutcome, RunReport};
use anyhow::anyhow;
use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tokio::sync::Semaphore;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;
use uuid::Uuid;

const MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub engine: Arc<TrainingEngine>,
    pub metrics: Arc<TrainingMetrics>,
    run_limit: Arc<Semaphore>,
}

impl AppState {
    pub fn new(config: AppConfig, metrics: Arc<TrainingMetrics>) -> Self {
        let engine = Arc::new(TrainingEngine::new(config.training.clone()));
        let run_limit = Arc::new(Semaphore::new(config.server.max_concurrent_runs));
        Self {
            config: Arc::new(config),
            engine,
            metrics,
            run_limit,
        }
    }
}

/// Errors surfaced to HTTP clients
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),
    #[error(transparent)]
    Dataset(#[from] DatasetError),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Dataset(DatasetError::Io(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Dataset(_) => StatusCode::BAD_REQUEST,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = Json(serde_json::json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}

/// Build the service router
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/upload", post(handle_upload))
        .with_state(state)
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

async fn health() -> &'static str {
    "OK"
}

/// `POST /upload`: accept a tabular file, train every configured model, and
/// respond with the model-name → outcome map.
async fn handle_upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<BTreeMap<String, ModelOutcome>>, AppError> {
    let mut upload = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.to_string()))?
    {
        if field.name() == Some("file") {
            let file_name = field
                .file_name()
                .map(|s| s.to_string())
                .ok_or_else(|| AppError::BadRequest("upload is missing a filename".into()))?;
            let bytes = field
                .bytes()
                .await
                .map_err(|e| AppError::BadRequest(e.to_string()))?;
            upload = Some((file_name, bytes));
            break;
        }
    }

    let (file_name, bytes) = upload
        .ok_or_else(|| AppError::BadRequest("missing multipart field 'file'".into()))?;
    let file_name = sanitize_filename(&file_name)
        .ok_or_else(|| AppError::BadRequest(format!("invalid filename {file_name:?}")))?;

    // queue behind in-flight runs
    let _permit = state
        .run_limit
        .clone()
        .acquire_owned()
        .await
        .map_err(|_| AppError::Internal(anyhow!("server is shutting down")))?;

    let run_id = Uuid::new_v4().to_string();
    let run_dir = Path::new(&state.config.storage.upload_dir).join(format!("run-{run_id}"));
    tokio::fs::create_dir_all(&run_dir)
        .await
        .map_err(|e| AppError::Internal(anyhow!("failed to create run directory: {e}")))?;

    let data_path = run_dir.join(&file_name);
    tokio::fs::write(&data_path, &bytes)
        .await
        .map_err(|e| AppError::Internal(anyhow!("failed to store upload: {e}")))?;

    info!(
        run_id = %run_id,
        file = %file_name,
        bytes = bytes.len(),
        "Received training upload"
    );

    let engine = state.engine.clone();
    let started = Instant::now();
    let models = tokio::task::spawn_blocking(move || -> Result<_, AppError> {
        let dataset = load_dataset(&data_path)?;
        let report = engine.run(&dataset, &run_dir).map_err(AppError::Internal)?;
        Ok(report)
    })
    .await
    .map_err(|e| AppError::Internal(anyhow!("training task panicked: {e}")))??;

    let elapsed = started.elapsed();
    state.metrics.record_run(elapsed);
    for (name, outcome) in &models {
        match outcome {
            ModelOutcome::Trained {
                training_time_ms, ..
            } => state.metrics.record_model(name, *training_time_ms),
            ModelOutcome::Failed { .. } => state.metrics.record_failure(),
        }
    }

    let report = RunReport::new(run_id, models);
    if report.all_failed() {
        return Err(AppError::Internal(anyhow!("all models failed to train")));
    }

    info!(
        run_id = %report.run_id,
        trained = report.trained_count(),
        total = report.models.len(),
        duration_ms = elapsed.as_millis() as u64,
        "Training run complete"
    );

    Ok(Json(report.models))
}

/// Strip any path components from a client-supplied filename
fn sanitize_filename(name: &str) -> Option<String> {
    let name = Path::new(name).file_name()?.to_str()?;
    if name.is_empty() || name.starts_with('.') {
        return None;
    }
    Some(name.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    // Endpoint behavior is exercised end-to-end through the engine path in
    // tests/; driving the router itself would require a running server.

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("data.csv"), Some("data.csv".to_string()));
        assert_eq!(
            sanitize_filename("/tmp/../etc/data.csv"),
            Some("data.csv".to_string())
        );
        assert_eq!(sanitize_filename(".."), None);
        assert_eq!(sanitize_filename(""), None);
        assert_eq!(sanitize_filename(".hidden"), None);
    }

    #[test]
    fn test_error_status_mapping() {
        let bad = AppError::BadRequest("nope".into()).into_response();
        assert_eq!(bad.status(), StatusCode::BAD_REQUEST);

        let unsupported =
            AppError::Dataset(DatasetError::UnsupportedFormat("xlsx".into())).into_response();
        assert_eq!(unsupported.status(), StatusCode::BAD_REQUEST);

        let internal = AppError::Internal(anyhow!("boom")).into_response();
        assert_eq!(internal.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
