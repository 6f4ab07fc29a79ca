//! Training run report structures

use crate::evaluation::Evaluation;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Outcome for a single model within a run.
///
/// Serializes untagged so the response body matches the
/// `name -> {evaluation, model_path}` shape, with failed models reported as
/// `{"error": ...}` entries.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ModelOutcome {
    Trained {
        evaluation: Evaluation,
        model_path: String,
        training_time_ms: u64,
    },
    Failed {
        error: String,
    },
}

impl ModelOutcome {
    pub fn is_trained(&self) -> bool {
        matches!(self, ModelOutcome::Trained { .. })
    }
}

/// Report for one upload-and-train cycle
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: String,
    /// Per-model outcomes, ordered by model name
    pub models: BTreeMap<String, ModelOutcome>,
}

impl RunReport {
    pub fn new(run_id: String, models: BTreeMap<String, ModelOutcome>) -> Self {
        Self { run_id, models }
    }

    /// Number of models that trained successfully
    pub fn trained_count(&self) -> usize {
        self.models.values().filter(|m| m.is_trained()).count()
    }

    /// Whether every model in the run failed
    pub fn all_failed(&self) -> bool {
        !self.models.is_empty() && self.trained_count() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_serialization_shape() {
        let outcome = ModelOutcome::Trained {
            evaluation: Evaluation {
                accuracy: 0.9,
                macro_f1: 0.88,
                rmse: None,
            },
            model_path: "uploads/run-1/svm_model.bin".to_string(),
            training_time_ms: 12,
        };

        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["evaluation"]["accuracy"], 0.9);
        assert_eq!(json["model_path"], "uploads/run-1/svm_model.bin");
        // rmse is omitted entirely when labels are not numeric
        assert!(json["evaluation"].get("rmse").is_none());

        let failed = ModelOutcome::Failed {
            error: "training set is empty".to_string(),
        };
        let json = serde_json::to_value(&failed).unwrap();
        assert_eq!(json["error"], "training set is empty");
    }

    #[test]
    fn test_run_report_counts() {
        let mut models = BTreeMap::new();
        models.insert(
            "svm".to_string(),
            ModelOutcome::Failed {
                error: "boom".to_string(),
            },
        );
        let report = RunReport::new("run-1".to_string(), models.clone());
        assert!(report.all_failed());
        assert_eq!(report.trained_count(), 0);

        models.insert(
            "mlp".to_string(),
            ModelOutcome::Trained {
                evaluation: Evaluation {
                    accuracy: 1.0,
                    macro_f1: 1.0,
                    rmse: Some(0.0),
                },
                model_path: "p".to_string(),
                training_time_ms: 1,
            },
        );
        let report = RunReport::new("run-2".to_string(), models);
        assert!(!report.all_failed());
        assert_eq!(report.trained_count(), 1);
    }
}
