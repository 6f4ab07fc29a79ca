//! Boosted ensembles: SAMME AdaBoost and logistic gradient boosting

use super::tree::{argmax, DecisionTreeClassifier, MaxFeatures, TreeParams};
use super::{check_fit_inputs, TrainError};
use ndarray::{Array2, ArrayView1};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// AdaBoost (SAMME) over depth-1 decision stumps
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdaBoostClassifier {
    pub n_estimators: usize,
    pub learning_rate: f64,
    pub seed: u64,
    stumps: Vec<(DecisionTreeClassifier, f64)>,
    fallback_class: usize,
    n_classes: usize,
}

impl AdaBoostClassifier {
    pub fn new(n_estimators: usize, learning_rate: f64, seed: u64) -> Self {
        Self {
            n_estimators,
            learning_rate,
            seed,
            stumps: Vec::new(),
            fallback_class: 0,
            n_classes: 0,
        }
    }

    pub fn fit(
        &mut self,
        x: &Array2<f64>,
        y: &[usize],
        n_classes: usize,
    ) -> Result<(), TrainError> {
        check_fit_inputs(x, y)?;
        self.stumps.clear();
        self.n_classes = n_classes;
        self.fallback_class = majority_class(y, n_classes);

        if n_classes < 2 {
            return Ok(());
        }

        let n = y.len();
        let k = n_classes as f64;
        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut weights = vec![1.0 / n as f64; n];
        let indices: Vec<usize> = (0..n).collect();

        let stump_params = TreeParams {
            max_depth: Some(1),
            max_features: MaxFeatures::All,
            seed: self.seed,
            ..TreeParams::default()
        };

        for _ in 0..self.n_estimators {
            let mut stump = DecisionTreeClassifier::new(stump_params.clone());
            stump.fit_subset(x, y, &weights, indices.clone(), n_classes, &mut rng);
            let pred = stump.predict(x);

            let total: f64 = weights.iter().sum();
            let err: f64 = weights
                .iter()
                .zip(&pred)
                .zip(y)
                .filter(|((_, p), t)| p != t)
                .map(|((w, _), _)| w)
                .sum::<f64>()
                / total;

            if err < 1e-12 {
                // perfect stump dominates the vote
                self.stumps.push((stump, 1.0));
                break;
            }
            if err >= 1.0 - 1.0 / k {
                // no better than chance, stop boosting
                break;
            }

            let alpha = self.learning_rate * (((1.0 - err) / err).ln() + (k - 1.0).ln());

            for (i, p) in pred.iter().enumerate() {
                if *p != y[i] {
                    weights[i] *= alpha.exp();
                }
            }
            let sum: f64 = weights.iter().sum();
            for w in &mut weights {
                *w /= sum;
            }

            self.stumps.push((stump, alpha));
        }

        Ok(())
    }

    pub fn predict(&self, x: &Array2<f64>) -> Vec<usize> {
        if self.stumps.is_empty() {
            return vec![self.fallback_class; x.nrows()];
        }

        let mut scores = vec![vec![0.0; self.n_classes]; x.nrows()];
        for (stump, alpha) in &self.stumps {
            for (i, class) in stump.predict(x).into_iter().enumerate() {
                scores[i][class] += alpha;
            }
        }
        scores.iter().map(|s| argmax(s)).collect()
    }

    pub fn round_count(&self) -> usize {
        self.stumps.len()
    }
}

impl Default for AdaBoostClassifier {
    fn default() -> Self {
        Self::new(50, 1.0, 42)
    }
}

fn majority_class(y: &[usize], n_classes: usize) -> usize {
    let mut counts = vec![0.0; n_classes.max(1)];
    for &c in y {
        counts[c] += 1.0;
    }
    argmax(&counts)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
enum RNode {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        value: f64,
    },
}

/// Regression tree over gradient/hessian pairs; leaf values are the Newton
/// step sum(g) / sum(h)
#[derive(Debug, Clone, Serialize, Deserialize)]
struct RegressionTree {
    nodes: Vec<RNode>,
    root: usize,
}

impl RegressionTree {
    fn fit(x: &Array2<f64>, grad: &[f64], hess: &[f64], max_depth: usize) -> Self {
        let mut tree = Self {
            nodes: Vec::new(),
            root: 0,
        };
        let indices: Vec<usize> = (0..grad.len()).collect();
        tree.root = tree.grow(x, grad, hess, indices, 0, max_depth);
        tree
    }

    fn grow(
        &mut self,
        x: &Array2<f64>,
        grad: &[f64],
        hess: &[f64],
        indices: Vec<usize>,
        depth: usize,
        max_depth: usize,
    ) -> usize {
        if depth >= max_depth || indices.len() < 2 {
            return self.push_leaf(grad, hess, &indices);
        }

        let split = match best_sse_split(x, grad, &indices) {
            Some(s) => s,
            None => return self.push_leaf(grad, hess, &indices),
        };

        let (left_idx, right_idx): (Vec<usize>, Vec<usize>) = indices
            .into_iter()
            .partition(|&i| x[[i, split.0]] <= split.1);

        if left_idx.is_empty() || right_idx.is_empty() {
            let merged: Vec<usize> = left_idx.into_iter().chain(right_idx).collect();
            return self.push_leaf(grad, hess, &merged);
        }

        let left = self.grow(x, grad, hess, left_idx, depth + 1, max_depth);
        let right = self.grow(x, grad, hess, right_idx, depth + 1, max_depth);
        self.nodes.push(RNode::Split {
            feature: split.0,
            threshold: split.1,
            left,
            right,
        });
        self.nodes.len() - 1
    }

    fn push_leaf(&mut self, grad: &[f64], hess: &[f64], indices: &[usize]) -> usize {
        let sum_g: f64 = indices.iter().map(|&i| grad[i]).sum();
        let sum_h: f64 = indices.iter().map(|&i| hess[i]).sum();
        self.nodes.push(RNode::Leaf {
            value: sum_g / (sum_h + 1e-12),
        });
        self.nodes.len() - 1
    }

    fn predict_row(&self, row: ArrayView1<f64>) -> f64 {
        if self.nodes.is_empty() {
            return 0.0;
        }
        let mut at = self.root;
        loop {
            match &self.nodes[at] {
                RNode::Leaf { value } => return *value,
                RNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    at = if row[*feature] <= *threshold {
                        *left
                    } else {
                        *right
                    };
                }
            }
        }
    }
}

/// Best (feature, threshold) by squared-error reduction on the gradients
fn best_sse_split(x: &Array2<f64>, grad: &[f64], indices: &[usize]) -> Option<(usize, f64)> {
    let n = indices.len() as f64;
    let total_sum: f64 = indices.iter().map(|&i| grad[i]).sum();
    let total_sq: f64 = indices.iter().map(|&i| grad[i] * grad[i]).sum();
    let parent_sse = total_sq - total_sum * total_sum / n;

    let mut best: Option<(usize, f64, f64)> = None;

    for feature in 0..x.ncols() {
        let mut ordered: Vec<(f64, usize)> =
            indices.iter().map(|&i| (x[[i, feature]], i)).collect();
        ordered.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(Ordering::Equal));

        let mut left_sum = 0.0;
        let mut left_sq = 0.0;

        for k in 0..ordered.len() - 1 {
            let (value, i) = ordered[k];
            left_sum += grad[i];
            left_sq += grad[i] * grad[i];

            if value == ordered[k + 1].0 {
                continue;
            }

            let left_n = (k + 1) as f64;
            let right_n = n - left_n;
            let right_sum = total_sum - left_sum;
            let right_sq = total_sq - left_sq;

            let sse = (left_sq - left_sum * left_sum / left_n)
                + (right_sq - right_sum * right_sum / right_n);

            if sse + 1e-12 >= parent_sse {
                continue;
            }

            let threshold = (value + ordered[k + 1].0) / 2.0;
            let better = best.map(|b| sse < b.2).unwrap_or(true);
            if better {
                best = Some((feature, threshold, sse));
            }
        }
    }

    best.map(|(f, t, _)| (f, t))
}

/// One-vs-rest logistic gradient boosting over shallow regression trees
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradientBoostingClassifier {
    pub n_estimators: usize,
    pub learning_rate: f64,
    pub max_depth: usize,
    pub seed: u64,
    base_scores: Vec<f64>,
    ensembles: Vec<Vec<RegressionTree>>,
    n_classes: usize,
}

impl GradientBoostingClassifier {
    pub fn new(n_estimators: usize, learning_rate: f64, max_depth: usize, seed: u64) -> Self {
        Self {
            n_estimators,
            learning_rate,
            max_depth,
            seed,
            base_scores: Vec::new(),
            ensembles: Vec::new(),
            n_classes: 0,
        }
    }

    pub fn fit(
        &mut self,
        x: &Array2<f64>,
        y: &[usize],
        n_classes: usize,
    ) -> Result<(), TrainError> {
        check_fit_inputs(x, y)?;
        self.n_classes = n_classes;
        self.base_scores = Vec::with_capacity(n_classes);
        self.ensembles = Vec::with_capacity(n_classes);

        let n = y.len();
        for class in 0..n_classes {
            let y_bin: Vec<f64> = y.iter().map(|&c| if c == class { 1.0 } else { 0.0 }).collect();
            let prior = (y_bin.iter().sum::<f64>() / n as f64).clamp(1e-6, 1.0 - 1e-6);
            let base = (prior / (1.0 - prior)).ln();

            let mut scores = vec![base; n];
            let mut trees = Vec::with_capacity(self.n_estimators);

            for _ in 0..self.n_estimators {
                let mut grad = vec![0.0; n];
                let mut hess = vec![0.0; n];
                for i in 0..n {
                    let p = sigmoid(scores[i]);
                    grad[i] = y_bin[i] - p;
                    hess[i] = p * (1.0 - p);
                }

                let tree = RegressionTree::fit(x, &grad, &hess, self.max_depth);
                for i in 0..n {
                    scores[i] += self.learning_rate * tree.predict_row(x.row(i));
                }
                trees.push(tree);
            }

            self.base_scores.push(base);
            self.ensembles.push(trees);
        }

        Ok(())
    }

    pub fn predict(&self, x: &Array2<f64>) -> Vec<usize> {
        (0..x.nrows())
            .map(|i| {
                let row = x.row(i);
                let scores: Vec<f64> = (0..self.n_classes.max(1))
                    .map(|class| self.class_score(class, row))
                    .collect();
                argmax(&scores)
            })
            .collect()
    }

    fn class_score(&self, class: usize, row: ArrayView1<f64>) -> f64 {
        if class >= self.ensembles.len() {
            return f64::NEG_INFINITY;
        }
        let mut score = self.base_scores[class];
        for tree in &self.ensembles[class] {
            score += self.learning_rate * tree.predict_row(row);
        }
        score
    }
}

impl Default for GradientBoostingClassifier {
    fn default() -> Self {
        Self::new(100, 0.1, 3, 42)
    }
}

fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::test_data::separable;

    #[test]
    fn test_adaboost_separates_clusters() {
        let (x, y) = separable();
        let mut booster = AdaBoostClassifier::default();
        booster.fit(&x, &y, 2).unwrap();

        // a single stump already separates the clusters
        assert!(booster.round_count() >= 1);
        assert_eq!(booster.predict(&x), y);
    }

    #[test]
    fn test_adaboost_reweights_mistakes() {
        // alternating intervals: one stump cannot be perfect, so the first
        // round misclassifies x=2 and boosting must keep going
        let x = Array2::from_shape_vec((4, 1), vec![0.0, 1.0, 2.0, 3.0]).unwrap();
        let y = vec![0, 1, 0, 1];

        let mut booster = AdaBoostClassifier::new(25, 1.0, 42);
        booster.fit(&x, &y, 2).unwrap();
        assert!(booster.round_count() >= 2);
    }

    #[test]
    fn test_adaboost_single_class_fallback() {
        let x = Array2::from_shape_vec((3, 1), vec![1.0, 2.0, 3.0]).unwrap();
        let y = vec![0, 0, 0];
        let mut booster = AdaBoostClassifier::default();
        booster.fit(&x, &y, 1).unwrap();
        assert_eq!(booster.predict(&x), vec![0, 0, 0]);
    }

    #[test]
    fn test_gradient_boosting_separates_clusters() {
        let (x, y) = separable();
        let mut gbm = GradientBoostingClassifier::new(20, 0.2, 3, 42);
        gbm.fit(&x, &y, 2).unwrap();
        assert_eq!(gbm.predict(&x), y);
    }

    #[test]
    fn test_regression_tree_fits_step_function() {
        let x = Array2::from_shape_vec((4, 1), vec![1.0, 2.0, 10.0, 11.0]).unwrap();
        let grad = vec![-1.0, -1.0, 1.0, 1.0];
        let hess = vec![1.0, 1.0, 1.0, 1.0];

        let tree = RegressionTree::fit(&x, &grad, &hess, 3);
        assert!(tree.predict_row(x.row(0)) < 0.0);
        assert!(tree.predict_row(x.row(3)) > 0.0);
    }
}
