//! Bootstrap-aggregated tree ensembles: random forest and bagging
//!
//! Both share one ensemble core: each member tree is grown on a bootstrap
//! sample of the training rows and prediction is a majority vote. Random
//! forest additionally subsamples sqrt(n_features) candidates per split;
//! bagging examines every feature.

use super::tree::{argmax, DecisionTreeClassifier, MaxFeatures, TreeParams};
use super::{check_fit_inputs, TrainError};
use ndarray::Array2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// Shared bootstrap-ensemble state
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct BaggedEnsemble {
    trees: Vec<DecisionTreeClassifier>,
    n_classes: usize,
}

impl BaggedEnsemble {
    fn fit(
        &mut self,
        x: &Array2<f64>,
        y: &[usize],
        n_classes: usize,
        n_estimators: usize,
        tree_params: TreeParams,
        seed: u64,
    ) {
        let n = y.len();
        let weights = vec![1.0; n];
        let mut rng = StdRng::seed_from_u64(seed);

        self.trees = Vec::with_capacity(n_estimators);
        self.n_classes = n_classes;

        for _ in 0..n_estimators {
            let bootstrap: Vec<usize> = (0..n).map(|_| rng.gen_range(0..n)).collect();
            let mut tree = DecisionTreeClassifier::new(tree_params.clone());
            tree.fit_subset(x, y, &weights, bootstrap, n_classes, &mut rng);
            self.trees.push(tree);
        }
    }

    fn predict(&self, x: &Array2<f64>) -> Vec<usize> {
        let n = x.nrows();
        let mut votes = vec![vec![0.0; self.n_classes.max(1)]; n];

        for tree in &self.trees {
            for (i, class) in tree.predict(x).into_iter().enumerate() {
                votes[i][class] += 1.0;
            }
        }

        votes.iter().map(|v| argmax(v)).collect()
    }

    fn len(&self) -> usize {
        self.trees.len()
    }
}

/// Random forest: bootstrapped trees with sqrt feature subsampling
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomForestClassifier {
    pub n_estimators: usize,
    pub max_depth: Option<usize>,
    pub seed: u64,
    ensemble: BaggedEnsemble,
}

impl RandomForestClassifier {
    pub fn new(n_estimators: usize, max_depth: Option<usize>, seed: u64) -> Self {
        Self {
            n_estimators,
            max_depth,
            seed,
            ensemble: BaggedEnsemble::default(),
        }
    }

    pub fn fit(
        &mut self,
        x: &Array2<f64>,
        y: &[usize],
        n_classes: usize,
    ) -> Result<(), TrainError> {
        check_fit_inputs(x, y)?;
        let params = TreeParams {
            max_depth: self.max_depth,
            max_features: MaxFeatures::Sqrt,
            seed: self.seed,
            ..TreeParams::default()
        };
        self.ensemble
            .fit(x, y, n_classes, self.n_estimators, params, self.seed);
        Ok(())
    }

    pub fn predict(&self, x: &Array2<f64>) -> Vec<usize> {
        self.ensemble.predict(x)
    }

    pub fn tree_count(&self) -> usize {
        self.ensemble.len()
    }
}

impl Default for RandomForestClassifier {
    fn default() -> Self {
        Self::new(100, None, 42)
    }
}

/// Bagging: bootstrapped trees over the full feature set
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BaggingClassifier {
    pub n_estimators: usize,
    pub max_depth: Option<usize>,
    pub seed: u64,
    ensemble: BaggedEnsemble,
}

impl BaggingClassifier {
    pub fn new(n_estimators: usize, max_depth: Option<usize>, seed: u64) -> Self {
        Self {
            n_estimators,
            max_depth,
            seed,
            ensemble: BaggedEnsemble::default(),
        }
    }

    pub fn fit(
        &mut self,
        x: &Array2<f64>,
        y: &[usize],
        n_classes: usize,
    ) -> Result<(), TrainError> {
        check_fit_inputs(x, y)?;
        let params = TreeParams {
            max_depth: self.max_depth,
            max_features: MaxFeatures::All,
            seed: self.seed,
            ..TreeParams::default()
        };
        self.ensemble
            .fit(x, y, n_classes, self.n_estimators, params, self.seed);
        Ok(())
    }

    pub fn predict(&self, x: &Array2<f64>) -> Vec<usize> {
        self.ensemble.predict(x)
    }

    pub fn tree_count(&self) -> usize {
        self.ensemble.len()
    }
}

impl Default for BaggingClassifier {
    fn default() -> Self {
        Self::new(10, None, 42)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::test_data::separable;

    #[test]
    fn test_random_forest_separates_clusters() {
        let (x, y) = separable();
        let mut forest = RandomForestClassifier::new(25, None, 42);
        forest.fit(&x, &y, 2).unwrap();

        assert_eq!(forest.tree_count(), 25);
        assert_eq!(forest.predict(&x), y);
    }

    #[test]
    fn test_bagging_separates_clusters() {
        let (x, y) = separable();
        let mut bagging = BaggingClassifier::default();
        bagging.fit(&x, &y, 2).unwrap();

        assert_eq!(bagging.tree_count(), 10);
        assert_eq!(bagging.predict(&x), y);
    }

    #[test]
    fn test_forest_deterministic_per_seed() {
        let (x, y) = separable();

        let mut a = RandomForestClassifier::new(10, None, 7);
        a.fit(&x, &y, 2).unwrap();
        let mut b = RandomForestClassifier::new(10, None, 7);
        b.fit(&x, &y, 2).unwrap();

        assert_eq!(a.predict(&x), b.predict(&x));
    }

    #[test]
    fn test_empty_input_rejected() {
        let x = Array2::zeros((0, 2));
        let mut forest = RandomForestClassifier::default();
        assert!(matches!(
            forest.fit(&x, &[], 2),
            Err(TrainError::EmptyTrainingSet)
        ));
    }
}
