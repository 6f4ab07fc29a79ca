//! Model registry: the fixed set of trainable models, built by name

use super::tree::TreeParams;
use super::{
    AdaBoostClassifier, BaggingClassifier, DecisionTreeClassifier, Estimator,
    GradientBoostingClassifier, LinearSvmClassifier, MlpClassifier, RandomForestClassifier,
};
use tracing::warn;

/// Every model the pipeline can train, in report order
pub const MODEL_NAMES: [&str; 7] = [
    "svm",
    "decision_tree",
    "random_forest",
    "ada_boost",
    "bagging",
    "gradient_boosting",
    "mlp",
];

/// Build a default-configured estimator by registry name
pub fn build(name: &str, seed: u64) -> Option<Estimator> {
    let estimator = match name {
        "svm" => Estimator::Svm(LinearSvmClassifier::new(50, 1e-4, seed)),
        "decision_tree" => Estimator::DecisionTree(DecisionTreeClassifier::new(TreeParams {
            seed,
            ..TreeParams::default()
        })),
        "random_forest" => Estimator::RandomForest(RandomForestClassifier::new(100, None, seed)),
        "ada_boost" => Estimator::AdaBoost(AdaBoostClassifier::new(50, 1.0, seed)),
        "bagging" => Estimator::Bagging(BaggingClassifier::new(10, None, seed)),
        "gradient_boosting" => {
            Estimator::GradientBoosting(GradientBoostingClassifier::new(100, 0.1, 3, seed))
        }
        "mlp" => Estimator::Mlp(MlpClassifier::new(100, 1000, 1e-3, seed)),
        _ => return None,
    };
    Some(estimator)
}

/// Build the requested models, skipping unknown names with a warning
pub fn build_all(names: &[String], seed: u64) -> Vec<(String, Estimator)> {
    let mut models = Vec::with_capacity(names.len());
    for name in names {
        match build(name, seed) {
            Some(estimator) => models.push((name.clone(), estimator)),
            None => {
                warn!(model = %name, "Unknown model name, skipping");
            }
        }
    }
    models
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_registry_name_builds() {
        for name in MODEL_NAMES {
            assert!(build(name, 42).is_some(), "model {name} did not build");
        }
    }

    #[test]
    fn test_unknown_name_is_skipped() {
        let names: Vec<String> = vec!["svm".to_string(), "quantum_leap".to_string()];
        let models = build_all(&names, 42);
        assert_eq!(models.len(), 1);
        assert_eq!(models[0].0, "svm");
    }

    #[test]
    fn test_build_all_preserves_request_order() {
        let names: Vec<String> = vec!["mlp".to_string(), "svm".to_string()];
        let models = build_all(&names, 42);
        let built: Vec<&str> = models.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(built, vec!["mlp", "svm"]);
    }
}
