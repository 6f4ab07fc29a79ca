//! Model Training Pipeline Library
//!
//! An HTTP service that accepts a tabular dataset upload, trains a fixed
//! zoo of classification models on it, evaluates each on a held-out split,
//! and serializes the fitted pipelines to disk.

pub mod config;
pub mod evaluation;
pub mod ingest;
pub mod metrics;
pub mod models;
pub mod preprocessing;
pub mod server;
pub mod trainer;
pub mod types;

pub use config::AppConfig;
pub use ingest::load_dataset;
pub use models::FittedPipeline;
pub use preprocessing::Preprocessor;
pub use trainer::TrainingEngine;
pub use types::{Dataset, ModelOutcome, RunReport};
