//! Type definitions for the model training pipeline

pub mod dataset;
pub mod report;

pub use dataset::{Dataset, FeatureColumn, LabelEncoder};
pub use report::{ModelOutcome, RunReport};
