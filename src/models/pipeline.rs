//! Fitted pipeline persistence
//!
//! A pipeline bundles the fitted preprocessor, the label encoder, and one
//! fitted estimator, so a saved artifact can score raw rows on its own.

use super::Estimator;
use crate::preprocessing::{Preprocessor, TransformError};
use crate::types::dataset::LabelEncoder;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Errors raised while saving, loading, or serving a pipeline
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("failed to encode rows: {0}")]
    Transform(#[from] TransformError),
    #[error("failed to serialize pipeline: {0}")]
    Serialize(#[from] bincode::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Preprocessor + label encoder + estimator, fit and saved as a unit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FittedPipeline {
    pub model_name: String,
    pub preprocessor: Preprocessor,
    pub labels: LabelEncoder,
    pub estimator: Estimator,
    pub trained_at: DateTime<Utc>,
}

impl FittedPipeline {
    pub fn new(
        model_name: String,
        preprocessor: Preprocessor,
        labels: LabelEncoder,
        estimator: Estimator,
    ) -> Self {
        Self {
            model_name,
            preprocessor,
            labels,
            estimator,
            trained_at: Utc::now(),
        }
    }

    /// Predict raw label strings for raw string rows
    pub fn predict_rows(&self, rows: &[Vec<String>]) -> Result<Vec<String>, PipelineError> {
        let x = self.preprocessor.transform_rows(rows)?;
        let classes = self.estimator.predict(&x);
        Ok(self.labels.decode(&classes))
    }

    /// Serialize the whole pipeline to a file
    pub fn save(&self, path: &Path) -> Result<(), PipelineError> {
        let bytes = bincode::serialize(self)?;
        std::fs::write(path, bytes)?;
        Ok(())
    }

    /// Load a pipeline previously written by [`save`](Self::save)
    pub fn load(path: &Path) -> Result<Self, PipelineError> {
        let bytes = std::fs::read(path)?;
        Ok(bincode::deserialize(&bytes)?)
    }
}
