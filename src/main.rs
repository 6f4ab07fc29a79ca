//! Model Training Pipeline - Main Entry Point
//!
//! Serves the dataset upload endpoint, trains the configured model zoo per
//! upload, and reports evaluation metrics and artifact paths.

use anyhow::Result;
use model_training_pipeline::config::AppConfig;
use model_training_pipeline::metrics::{MetricsReporter, TrainingMetrics};
use model_training_pipeline::server::{router, AppState};
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config = AppConfig::load_or_default();

    // Initialize logging
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(format!(
            "model_training_pipeline={}",
            config.logging.level
        ))
    });
    if config.logging.format == "json" {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    info!("Starting Model Training Pipeline");
    info!(
        test_ratio = config.training.test_ratio,
        seed = config.training.seed,
        models = ?config.training.models,
        "Training configuration loaded"
    );

    // Make sure the upload root exists before the first request
    tokio::fs::create_dir_all(&config.storage.upload_dir).await?;
    info!(upload_dir = %config.storage.upload_dir, "Upload directory ready");

    // Initialize metrics and start the periodic reporter
    let metrics = Arc::new(TrainingMetrics::new());
    let reporter_metrics = metrics.clone();
    tokio::spawn(async move {
        let reporter = MetricsReporter::new(reporter_metrics, 60);
        reporter.start().await;
    });

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let state = AppState::new(config, metrics);
    let app = router(state);

    info!(addr = %addr, "Model training pipeline listening");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
