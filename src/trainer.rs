//! The training engine: split, fit, evaluate, and persist every model

use crate::config::TrainingConfig;
use crate::evaluation::evaluate;
use crate::ingest::train_test_split;
use crate::models::{registry, FittedPipeline};
use crate::preprocessing::Preprocessor;
use crate::types::dataset::{Dataset, LabelEncoder};
use crate::types::report::ModelOutcome;
use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Instant;
use tracing::{error, info};

/// Runs one upload's train-evaluate-persist cycle per configured model
pub struct TrainingEngine {
    config: TrainingConfig,
}

impl TrainingEngine {
    /// Create a new engine from configuration
    pub fn new(config: TrainingConfig) -> Self {
        Self { config }
    }

    /// Models this engine will train
    pub fn model_names(&self) -> &[String] {
        &self.config.models
    }

    /// Train every configured model on the dataset and write the fitted
    /// pipelines into `run_dir`.
    ///
    /// A model that fails to train or persist becomes a `Failed` entry; the
    /// remaining models still run.
    pub fn run(
        &self,
        dataset: &Dataset,
        run_dir: &Path,
    ) -> Result<BTreeMap<String, ModelOutcome>> {
        let labels = LabelEncoder::fit(&dataset.target);
        let y_all = labels.encode(&dataset.target);

        let (train_idx, test_idx) =
            train_test_split(dataset.n_rows(), self.config.test_ratio, self.config.seed)
                .context("Failed to split dataset")?;

        let train = dataset.select(&train_idx);
        let test = dataset.select(&test_idx);
        let y_train: Vec<usize> = train_idx.iter().map(|&i| y_all[i]).collect();
        let y_test: Vec<usize> = test_idx.iter().map(|&i| y_all[i]).collect();

        let preprocessor = Preprocessor::fit(&train);
        let x_train = preprocessor
            .transform(&train)
            .context("Failed to encode training split")?;
        let x_test = preprocessor
            .transform(&test)
            .context("Failed to encode test split")?;

        info!(
            train_rows = x_train.nrows(),
            test_rows = x_test.nrows(),
            encoded_features = preprocessor.output_dim(),
            classes = labels.n_classes(),
            numeric_labels = labels.is_numeric(),
            "Dataset prepared"
        );

        let mut report = BTreeMap::new();

        for (name, mut estimator) in registry::build_all(&self.config.models, self.config.seed) {
            let started = Instant::now();

            if let Err(e) = estimator.fit(&x_train, &y_train, labels.n_classes()) {
                error!(model = %name, error = %e, "Training failed");
                report.insert(
                    name,
                    ModelOutcome::Failed {
                        error: e.to_string(),
                    },
                );
                continue;
            }

            let y_pred = estimator.predict(&x_test);
            let evaluation = evaluate(&y_test, &y_pred, &labels);
            let training_time_ms = started.elapsed().as_millis() as u64;

            let pipeline = FittedPipeline::new(
                name.clone(),
                preprocessor.clone(),
                labels.clone(),
                estimator,
            );
            let model_path = run_dir.join(format!("{}_model.bin", name));

            match pipeline.save(&model_path) {
                Ok(()) => {
                    info!(
                        model = %name,
                        accuracy = evaluation.accuracy,
                        macro_f1 = evaluation.macro_f1,
                        training_time_ms,
                        path = %model_path.display(),
                        "Model trained"
                    );
                    report.insert(
                        name,
                        ModelOutcome::Trained {
                            evaluation,
                            model_path: model_path.display().to_string(),
                            training_time_ms,
                        },
                    );
                }
                Err(e) => {
                    error!(model = %name, error = %e, "Failed to persist pipeline");
                    report.insert(
                        name,
                        ModelOutcome::Failed {
                            error: e.to_string(),
                        },
                    );
                }
            }
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::dataset::FeatureColumn;

    fn toy_dataset(labels: [&str; 2]) -> Dataset {
        let mut x = Vec::new();
        let mut group = Vec::new();
        let mut target = Vec::new();
        for i in 0..20 {
            let jitter = (i % 5) as f64 * 0.1;
            x.push(jitter);
            group.push("low".to_string());
            target.push(labels[0].to_string());

            x.push(10.0 + jitter);
            group.push("high".to_string());
            target.push(labels[1].to_string());
        }
        Dataset {
            features: vec![
                FeatureColumn::Numeric {
                    name: "x".to_string(),
                    values: x,
                },
                FeatureColumn::Categorical {
                    name: "group".to_string(),
                    values: group,
                },
            ],
            target_name: "label".to_string(),
            target,
        }
    }

    fn engine(models: &[&str]) -> TrainingEngine {
        TrainingEngine::new(TrainingConfig {
            test_ratio: 0.2,
            seed: 42,
            models: models.iter().map(|s| s.to_string()).collect(),
        })
    }

    #[test]
    fn test_run_trains_and_persists() {
        let dataset = toy_dataset(["no", "yes"]);
        let dir = tempfile::tempdir().unwrap();

        let report = engine(&["decision_tree", "svm"])
            .run(&dataset, dir.path())
            .unwrap();

        assert_eq!(report.len(), 2);
        for (name, outcome) in &report {
            match outcome {
                ModelOutcome::Trained {
                    evaluation,
                    model_path,
                    ..
                } => {
                    assert!(
                        evaluation.accuracy >= 0.8,
                        "{name} accuracy {}",
                        evaluation.accuracy
                    );
                    assert!(evaluation.rmse.is_none());
                    assert!(std::path::Path::new(model_path).exists());
                }
                ModelOutcome::Failed { error } => panic!("{name} failed: {error}"),
            }
        }
    }

    #[test]
    fn test_run_reports_rmse_for_numeric_labels() {
        let dataset = toy_dataset(["0", "1"]);
        let dir = tempfile::tempdir().unwrap();

        let report = engine(&["decision_tree"]).run(&dataset, dir.path()).unwrap();
        match &report["decision_tree"] {
            ModelOutcome::Trained { evaluation, .. } => {
                assert!(evaluation.rmse.is_some());
            }
            ModelOutcome::Failed { error } => panic!("failed: {error}"),
        }
    }

    #[test]
    fn test_saved_pipeline_serves_raw_rows() {
        let dataset = toy_dataset(["no", "yes"]);
        let dir = tempfile::tempdir().unwrap();

        engine(&["random_forest"]).run(&dataset, dir.path()).unwrap();

        let pipeline =
            FittedPipeline::load(&dir.path().join("random_forest_model.bin")).unwrap();
        let pred = pipeline
            .predict_rows(&[
                vec!["0.2".to_string(), "low".to_string()],
                vec!["10.3".to_string(), "high".to_string()],
            ])
            .unwrap();
        assert_eq!(pred, vec!["no", "yes"]);
    }

    #[test]
    fn test_unknown_models_are_skipped() {
        let dataset = toy_dataset(["no", "yes"]);
        let dir = tempfile::tempdir().unwrap();

        let report = engine(&["decision_tree", "oracle"])
            .run(&dataset, dir.path())
            .unwrap();
        assert_eq!(report.len(), 1);
        assert!(report.contains_key("decision_tree"));
    }
}
