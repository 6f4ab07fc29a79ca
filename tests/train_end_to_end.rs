//! End-to-end training run: parse a CSV from disk, train the full model zoo,
//! persist the pipelines, and serve predictions from a reloaded artifact.

use model_training_pipeline::config::AppConfig;
use model_training_pipeline::ingest::load_dataset;
use model_training_pipeline::models::FittedPipeline;
use model_training_pipeline::trainer::TrainingEngine;
use model_training_pipeline::types::report::ModelOutcome;
use std::io::Write;
use std::path::PathBuf;

/// Fifty clearly separable customer rows: retained customers have high
/// income and few tickets, churned customers the opposite.
fn synthetic_csv() -> String {
    let mut csv = String::from("income_k,tenure_months,support_tickets,segment,churned\n");
    for i in 0..25 {
        csv.push_str(&format!(
            "{},{},{},{},no\n",
            45 + i,
            24 + i,
            i % 3,
            if i % 2 == 0 { "premium" } else { "standard" }
        ));
        csv.push_str(&format!(
            "{},{},{},{},yes\n",
            12 + i % 10,
            1 + i % 12,
            5 + i % 5,
            if i % 3 == 0 { "trial" } else { "standard" }
        ));
    }
    csv
}

fn write_dataset(dir: &tempfile::TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    let mut f = std::fs::File::create(&path).unwrap();
    f.write_all(content.as_bytes()).unwrap();
    path
}

#[test]
fn full_zoo_trains_and_reloads() {
    let dir = tempfile::tempdir().unwrap();
    let data_path = write_dataset(&dir, "customers.csv", &synthetic_csv());
    let run_dir = dir.path().join("run");
    std::fs::create_dir_all(&run_dir).unwrap();

    let dataset = load_dataset(&data_path).unwrap();
    assert_eq!(dataset.n_rows(), 50);
    assert_eq!(dataset.n_features(), 4);

    let config = AppConfig::default();
    let engine = TrainingEngine::new(config.training);
    let report = engine.run(&dataset, &run_dir).unwrap();

    assert_eq!(report.len(), 7, "all seven models should report");

    for (name, outcome) in &report {
        match outcome {
            ModelOutcome::Trained {
                evaluation,
                model_path,
                ..
            } => {
                assert!(
                    evaluation.accuracy >= 0.8,
                    "{name} accuracy {} below expectation",
                    evaluation.accuracy
                );
                // "yes"/"no" labels are not numeric, so no RMSE
                assert!(evaluation.rmse.is_none());
                assert!(std::path::Path::new(model_path).exists());
            }
            ModelOutcome::Failed { error } => panic!("{name} failed: {error}"),
        }
    }

    // the report serializes to the name -> {evaluation, model_path} shape
    let json = serde_json::to_value(&report).unwrap();
    assert!(json["svm"]["evaluation"]["accuracy"].is_number());
    assert!(json["svm"]["model_path"].is_string());

    // a reloaded pipeline classifies raw rows on its own
    let pipeline = FittedPipeline::load(&run_dir.join("random_forest_model.bin")).unwrap();
    let predictions = pipeline
        .predict_rows(&[
            vec![
                "60".to_string(),
                "40".to_string(),
                "1".to_string(),
                "premium".to_string(),
            ],
            vec![
                "13".to_string(),
                "2".to_string(),
                "8".to_string(),
                "trial".to_string(),
            ],
        ])
        .unwrap();
    assert_eq!(predictions, vec!["no", "yes"]);
}

#[test]
fn numeric_labels_report_rmse() {
    let dir = tempfile::tempdir().unwrap();
    let csv = synthetic_csv().replace(",no\n", ",0\n").replace(",yes\n", ",1\n");
    let data_path = write_dataset(&dir, "customers.csv", &csv);
    let run_dir = dir.path().join("run");
    std::fs::create_dir_all(&run_dir).unwrap();

    let dataset = load_dataset(&data_path).unwrap();
    let engine = TrainingEngine::new(AppConfig::default().training);
    let report = engine.run(&dataset, &run_dir).unwrap();

    for (name, outcome) in &report {
        match outcome {
            ModelOutcome::Trained { evaluation, .. } => {
                let rmse = evaluation
                    .rmse
                    .unwrap_or_else(|| panic!("{name} should report rmse"));
                assert!(rmse <= 0.5, "{name} rmse {rmse} out of range");
            }
            ModelOutcome::Failed { error } => panic!("{name} failed: {error}"),
        }
    }
}

#[test]
fn identical_uploads_produce_identical_reports() {
    let dir = tempfile::tempdir().unwrap();
    let data_path = write_dataset(&dir, "customers.csv", &synthetic_csv());
    let dataset = load_dataset(&data_path).unwrap();

    let run_a = dir.path().join("a");
    let run_b = dir.path().join("b");
    std::fs::create_dir_all(&run_a).unwrap();
    std::fs::create_dir_all(&run_b).unwrap();

    let engine = TrainingEngine::new(AppConfig::default().training);
    let report_a = engine.run(&dataset, &run_a).unwrap();
    let report_b = engine.run(&dataset, &run_b).unwrap();

    for (name, outcome_a) in &report_a {
        match (outcome_a, &report_b[name]) {
            (
                ModelOutcome::Trained {
                    evaluation: eval_a, ..
                },
                ModelOutcome::Trained {
                    evaluation: eval_b, ..
                },
            ) => assert_eq!(eval_a, eval_b, "{name} evaluations differ between runs"),
            _ => panic!("{name} did not train in both runs"),
        }
    }
}
