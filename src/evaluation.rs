//! Held-out evaluation: confusion matrix, accuracy, macro-F1, RMSE fallback

use crate::types::dataset::LabelEncoder;
use serde::{Deserialize, Serialize};

/// Metrics reported for one fitted model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    pub accuracy: f64,
    pub macro_f1: f64,
    /// Present only when every label parses as a number
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rmse: Option<f64>,
}

/// Square confusion matrix over dense class indices
#[derive(Debug, Clone)]
pub struct ConfusionMatrix {
    counts: Vec<Vec<usize>>,
    n_classes: usize,
}

impl ConfusionMatrix {
    /// Tally predictions against ground truth
    pub fn from_predictions(y_true: &[usize], y_pred: &[usize], n_classes: usize) -> Self {
        let mut counts = vec![vec![0usize; n_classes]; n_classes];
        for (&t, &p) in y_true.iter().zip(y_pred) {
            counts[t][p] += 1;
        }
        Self { counts, n_classes }
    }

    /// Count of rows with true class `t` predicted as class `p`
    pub fn count(&self, t: usize, p: usize) -> usize {
        self.counts[t][p]
    }

    pub fn total(&self) -> usize {
        self.counts.iter().map(|row| row.iter().sum::<usize>()).sum()
    }

    pub fn accuracy(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            return 0.0;
        }
        let correct: usize = (0..self.n_classes).map(|k| self.counts[k][k]).sum();
        correct as f64 / total as f64
    }

    pub fn precision(&self, class: usize) -> f64 {
        let predicted: usize = (0..self.n_classes).map(|t| self.counts[t][class]).sum();
        if predicted == 0 {
            return 0.0;
        }
        self.counts[class][class] as f64 / predicted as f64
    }

    pub fn recall(&self, class: usize) -> f64 {
        let actual: usize = self.counts[class].iter().sum();
        if actual == 0 {
            return 0.0;
        }
        self.counts[class][class] as f64 / actual as f64
    }

    pub fn f1(&self, class: usize) -> f64 {
        let p = self.precision(class);
        let r = self.recall(class);
        if p + r == 0.0 {
            return 0.0;
        }
        2.0 * p * r / (p + r)
    }

    /// Unweighted mean of per-class F1 scores
    pub fn macro_f1(&self) -> f64 {
        if self.n_classes == 0 {
            return 0.0;
        }
        let sum: f64 = (0..self.n_classes).map(|k| self.f1(k)).sum();
        sum / self.n_classes as f64
    }
}

/// Root mean squared error between numeric values
pub fn rmse(truth: &[f64], pred: &[f64]) -> f64 {
    if truth.is_empty() {
        return 0.0;
    }
    let sum_sq: f64 = truth
        .iter()
        .zip(pred)
        .map(|(t, p)| (t - p) * (t - p))
        .sum();
    (sum_sq / truth.len() as f64).sqrt()
}

/// Score predictions against the held-out split.
///
/// Accuracy and macro-F1 always apply. RMSE applies only when the label
/// encoder saw purely numeric labels; otherwise it is omitted.
pub fn evaluate(y_true: &[usize], y_pred: &[usize], labels: &LabelEncoder) -> Evaluation {
    let matrix = ConfusionMatrix::from_predictions(y_true, y_pred, labels.n_classes());

    let rmse = if labels.is_numeric() {
        let truth: Vec<f64> = y_true
            .iter()
            .filter_map(|&c| labels.numeric_value(c))
            .collect();
        let pred: Vec<f64> = y_pred
            .iter()
            .filter_map(|&c| labels.numeric_value(c))
            .collect();
        Some(rmse(&truth, &pred))
    } else {
        None
    };

    Evaluation {
        accuracy: matrix.accuracy(),
        macro_f1: matrix.macro_f1(),
        rmse,
    }
}
