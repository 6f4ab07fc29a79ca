//! Configuration management for the model training pipeline

use anyhow::{Context, Result};
use config::{Config, File};
use serde::Deserialize;
use std::path::Path;

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub training: TrainingConfig,
    pub logging: LoggingConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Bind address
    #[serde(default = "default_host")]
    pub host: String,
    /// Bind port
    #[serde(default = "default_port")]
    pub port: u16,
    /// Number of training runs allowed to execute concurrently
    #[serde(default = "default_max_concurrent_runs")]
    pub max_concurrent_runs: usize,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_max_concurrent_runs() -> usize {
    2
}

/// Upload and model artifact storage configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Root directory for uploaded datasets and fitted pipelines
    #[serde(default = "default_upload_dir")]
    pub upload_dir: String,
}

fn default_upload_dir() -> String {
    "uploads".to_string()
}

/// Training run configuration
#[derive(Debug, Clone, Deserialize)]
pub struct TrainingConfig {
    /// Fraction of rows held out for evaluation
    #[serde(default = "default_test_ratio")]
    pub test_ratio: f64,
    /// Seed for the train/test shuffle and for randomized estimators
    #[serde(default = "default_seed")]
    pub seed: u64,
    /// Models to train, by registry name
    #[serde(default = "default_models")]
    pub models: Vec<String>,
}

fn default_test_ratio() -> f64 {
    0.2
}

fn default_seed() -> u64 {
    42
}

fn default_models() -> Vec<String> {
    [
        "svm",
        "decision_tree",
        "random_forest",
        "ada_boost",
        "bagging",
        "gradient_boosting",
        "mlp",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format (json, pretty)
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl AppConfig {
    /// Load configuration from the default file location
    pub fn load() -> Result<Self> {
        Self::load_from_path("config/config.toml")
    }

    /// Load configuration from a specific path
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config = Config::builder()
            .add_source(File::from(path.as_ref()))
            .build()
            .context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }

    /// Load from the default location, falling back to defaults when the
    /// file does not exist
    pub fn load_or_default() -> Self {
        match Self::load() {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!(error = %e, "Config file not loaded, using defaults");
                Self::default()
            }
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: default_host(),
                port: default_port(),
                max_concurrent_runs: default_max_concurrent_runs(),
            },
            storage: StorageConfig {
                upload_dir: default_upload_dir(),
            },
            training: TrainingConfig {
                test_ratio: default_test_ratio(),
                seed: default_seed(),
                models: default_models(),
            },
            logging: LoggingConfig {
                level: default_log_level(),
                format: default_log_format(),
            },
        }
    }
}
