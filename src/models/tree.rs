//! CART decision tree classifier with weighted Gini impurity
//!
//! The tree doubles as the base learner for the bagged ensembles (which pass
//! bootstrap row subsets and per-tree feature subsampling) and for AdaBoost
//! (which passes sample weights and a depth limit of one).

use super::{check_fit_inputs, TrainError};
use ndarray::{Array2, ArrayView1};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// How many features are examined at each split
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MaxFeatures {
    /// Examine every feature
    All,
    /// Examine ceil(sqrt(n_features)) randomly drawn features
    Sqrt,
}

impl MaxFeatures {
    fn count(&self, n_features: usize) -> usize {
        match self {
            MaxFeatures::All => n_features,
            MaxFeatures::Sqrt => ((n_features as f64).sqrt().ceil() as usize).max(1),
        }
    }
}

/// Tree growth parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreeParams {
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    pub max_features: MaxFeatures,
    pub seed: u64,
}

impl Default for TreeParams {
    fn default() -> Self {
        Self {
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: MaxFeatures::All,
            seed: 42,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
enum Node {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        class: usize,
    },
}

/// Fitted CART classifier
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionTreeClassifier {
    pub params: TreeParams,
    nodes: Vec<Node>,
    root: usize,
    n_classes: usize,
}

struct BestSplit {
    feature: usize,
    threshold: f64,
    impurity: f64,
}

impl DecisionTreeClassifier {
    pub fn new(params: TreeParams) -> Self {
        Self {
            params,
            nodes: Vec::new(),
            root: 0,
            n_classes: 0,
        }
    }

    /// Fit on all rows with uniform sample weights
    pub fn fit(
        &mut self,
        x: &Array2<f64>,
        y: &[usize],
        n_classes: usize,
    ) -> Result<(), TrainError> {
        check_fit_inputs(x, y)?;
        let weights = vec![1.0; y.len()];
        let indices: Vec<usize> = (0..y.len()).collect();
        let mut rng = StdRng::seed_from_u64(self.params.seed);
        self.fit_subset(x, y, &weights, indices, n_classes, &mut rng);
        Ok(())
    }

    /// Fit on a row subset with sample weights, using the caller's RNG.
    /// Used by the ensembles (bootstrap subsets) and AdaBoost (weights).
    pub(crate) fn fit_subset(
        &mut self,
        x: &Array2<f64>,
        y: &[usize],
        weights: &[f64],
        indices: Vec<usize>,
        n_classes: usize,
        rng: &mut StdRng,
    ) {
        self.nodes.clear();
        self.n_classes = n_classes;
        self.root = self.grow(x, y, weights, indices, 0, rng);
    }

    fn grow(
        &mut self,
        x: &Array2<f64>,
        y: &[usize],
        weights: &[f64],
        indices: Vec<usize>,
        depth: usize,
        rng: &mut StdRng,
    ) -> usize {
        let counts = self.weighted_counts(y, weights, &indices);
        let majority = argmax(&counts);

        let at_depth_limit = self
            .params
            .max_depth
            .map(|d| depth >= d)
            .unwrap_or(false);
        let n_present = counts.iter().filter(|&&c| c > 0.0).count();

        if at_depth_limit || n_present <= 1 || indices.len() < self.params.min_samples_split {
            return self.push(Node::Leaf { class: majority });
        }

        let split = match self.best_split(x, y, weights, &indices, &counts, rng) {
            Some(s) => s,
            None => return self.push(Node::Leaf { class: majority }),
        };

        let (left_idx, right_idx): (Vec<usize>, Vec<usize>) = indices
            .into_iter()
            .partition(|&i| x[[i, split.feature]] <= split.threshold);

        if left_idx.is_empty() || right_idx.is_empty() {
            return self.push(Node::Leaf { class: majority });
        }

        let left = self.grow(x, y, weights, left_idx, depth + 1, rng);
        let right = self.grow(x, y, weights, right_idx, depth + 1, rng);
        self.push(Node::Split {
            feature: split.feature,
            threshold: split.threshold,
            left,
            right,
        })
    }

    fn weighted_counts(&self, y: &[usize], weights: &[f64], indices: &[usize]) -> Vec<f64> {
        let mut counts = vec![0.0; self.n_classes];
        for &i in indices {
            counts[y[i]] += weights[i];
        }
        counts
    }

    /// Scan candidate features for the threshold minimizing the weighted
    /// child Gini impurity. Returns None when no split satisfies the leaf
    /// size constraint or improves on the parent.
    fn best_split(
        &self,
        x: &Array2<f64>,
        y: &[usize],
        weights: &[f64],
        indices: &[usize],
        parent_counts: &[f64],
        rng: &mut StdRng,
    ) -> Option<BestSplit> {
        let n_features = x.ncols();
        let n_candidates = self.params.max_features.count(n_features);

        let candidates: Vec<usize> = if n_candidates >= n_features {
            (0..n_features).collect()
        } else {
            rand::seq::index::sample(rng, n_features, n_candidates).into_vec()
        };

        let total_weight: f64 = parent_counts.iter().sum();
        if total_weight <= 0.0 {
            return None;
        }
        let parent_impurity = gini(parent_counts, total_weight);

        let mut best: Option<BestSplit> = None;

        for &feature in &candidates {
            let mut ordered: Vec<(f64, usize)> = indices
                .iter()
                .map(|&i| (x[[i, feature]], i))
                .collect();
            ordered.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(Ordering::Equal));

            let mut left_counts = vec![0.0; self.n_classes];
            let mut left_weight = 0.0;

            for k in 0..ordered.len() - 1 {
                let (value, i) = ordered[k];
                left_counts[y[i]] += weights[i];
                left_weight += weights[i];

                if value == ordered[k + 1].0 {
                    continue;
                }

                let left_n = k + 1;
                let right_n = ordered.len() - left_n;
                if left_n < self.params.min_samples_leaf
                    || right_n < self.params.min_samples_leaf
                {
                    continue;
                }

                let right_weight = total_weight - left_weight;
                if left_weight <= 0.0 || right_weight <= 0.0 {
                    continue;
                }

                let right_counts: Vec<f64> = parent_counts
                    .iter()
                    .zip(&left_counts)
                    .map(|(p, l)| p - l)
                    .collect();

                let impurity = (left_weight / total_weight) * gini(&left_counts, left_weight)
                    + (right_weight / total_weight) * gini(&right_counts, right_weight);

                if impurity + 1e-12 >= parent_impurity {
                    continue;
                }

                let threshold = (value + ordered[k + 1].0) / 2.0;
                let better = best
                    .as_ref()
                    .map(|b| impurity < b.impurity)
                    .unwrap_or(true);
                if better {
                    best = Some(BestSplit {
                        feature,
                        threshold,
                        impurity,
                    });
                }
            }
        }

        best
    }

    fn push(&mut self, node: Node) -> usize {
        self.nodes.push(node);
        self.nodes.len() - 1
    }

    /// Predict the class for a single encoded row
    pub fn predict_row(&self, row: ArrayView1<f64>) -> usize {
        if self.nodes.is_empty() {
            return 0;
        }
        let mut at = self.root;
        loop {
            match &self.nodes[at] {
                Node::Leaf { class } => return *class,
                Node::Split {
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

    /// Predict classes for every row of an encoded matrix
    pub fn predict(&self, x: &Array2<f64>) -> Vec<usize> {
        (0..x.nrows()).map(|i| self.predict_row(x.row(i))).collect()
    }

    /// Number of nodes in the fitted tree
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }
}

impl Default for DecisionTreeClassifier {
    fn default() -> Self {
        Self::new(TreeParams::default())
    }
}

fn gini(counts: &[f64], total: f64) -> f64 {
    let sum_sq: f64 = counts.iter().map(|c| (c / total) * (c / total)).sum();
    1.0 - sum_sq
}

pub(crate) fn argmax(values: &[f64]) -> usize {
    let mut best = 0;
    let mut best_value = f64::NEG_INFINITY;
    for (k, &v) in values.iter().enumerate() {
        if v > best_value {
            best = k;
            best_value = v;
        }
    }
    best
}
