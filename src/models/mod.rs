//! The estimator zoo: seven classifiers behind one enum-dispatched surface

pub mod boosting;
pub mod ensemble;
pub mod mlp;
pub mod pipeline;
pub mod registry;
pub mod svm;
pub mod tree;

use ndarray::Array2;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use boosting::{AdaBoostClassifier, GradientBoostingClassifier};
pub use ensemble::{BaggingClassifier, RandomForestClassifier};
pub use mlp::MlpClassifier;
pub use pipeline::FittedPipeline;
pub use svm::LinearSvmClassifier;
pub use tree::DecisionTreeClassifier;

/// Errors raised while fitting an estimator
#[derive(Debug, Error)]
pub enum TrainError {
    #[error("training set is empty")]
    EmptyTrainingSet,
    #[error("feature matrix has no columns")]
    NoFeatures,
    #[error("feature matrix has {rows} rows but {labels} labels")]
    ShapeMismatch { rows: usize, labels: usize },
}

pub(crate) fn check_fit_inputs(
    x: &Array2<f64>,
    y: &[usize],
) -> Result<(), TrainError> {
    if x.nrows() == 0 {
        return Err(TrainError::EmptyTrainingSet);
    }
    if x.ncols() == 0 {
        return Err(TrainError::NoFeatures);
    }
    if x.nrows() != y.len() {
        return Err(TrainError::ShapeMismatch {
            rows: x.nrows(),
            labels: y.len(),
        });
    }
    Ok(())
}

/// One of the seven supported classifiers.
///
/// Enum dispatch keeps the set closed and the whole fitted state
/// serde-serializable, which is what pipeline persistence needs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Estimator {
    Svm(LinearSvmClassifier),
    DecisionTree(DecisionTreeClassifier),
    RandomForest(RandomForestClassifier),
    AdaBoost(AdaBoostClassifier),
    Bagging(BaggingClassifier),
    GradientBoosting(GradientBoostingClassifier),
    Mlp(MlpClassifier),
}

impl Estimator {
    /// Fit the estimator on an encoded feature matrix and class indices
    pub fn fit(
        &mut self,
        x: &Array2<f64>,
        y: &[usize],
        n_classes: usize,
    ) -> Result<(), TrainError> {
        match self {
            Estimator::Svm(m) => m.fit(x, y, n_classes),
            Estimator::DecisionTree(m) => m.fit(x, y, n_classes),
            Estimator::RandomForest(m) => m.fit(x, y, n_classes),
            Estimator::AdaBoost(m) => m.fit(x, y, n_classes),
            Estimator::Bagging(m) => m.fit(x, y, n_classes),
            Estimator::GradientBoosting(m) => m.fit(x, y, n_classes),
            Estimator::Mlp(m) => m.fit(x, y, n_classes),
        }
    }

    /// Predict class indices for an encoded feature matrix
    pub fn predict(&self, x: &Array2<f64>) -> Vec<usize> {
        match self {
            Estimator::Svm(m) => m.predict(x),
            Estimator::DecisionTree(m) => m.predict(x),
            Estimator::RandomForest(m) => m.predict(x),
            Estimator::AdaBoost(m) => m.predict(x),
            Estimator::Bagging(m) => m.predict(x),
            Estimator::GradientBoosting(m) => m.predict(x),
            Estimator::Mlp(m) => m.predict(x),
        }
    }
}

#[cfg(test)]
pub(crate) mod test_data {
    use ndarray::Array2;

    /// Two well-separated clusters: class 0 near the origin, class 1 around
    /// (10, 10). Every estimator should separate these.
    pub fn separable() -> (Array2<f64>, Vec<usize>) {
        let mut rows: Vec<f64> = Vec::new();
        let mut y = Vec::new();
        for i in 0..20 {
            let jitter = (i % 5) as f64 * 0.1;
            rows.extend_from_slice(&[jitter, 1.0 - jitter]);
            y.push(0);
            rows.extend_from_slice(&[10.0 + jitter, 11.0 - jitter]);
            y.push(1);
        }
        let x = Array2::from_shape_vec((40, 2), rows).unwrap();
        (x, y)
    }
}
