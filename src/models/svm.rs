//! One-vs-rest linear SVM trained with Pegasos-style SGD

use super::{check_fit_inputs, TrainError};
use ndarray::{Array2, ArrayView1};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

/// Linear support vector classifier
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinearSvmClassifier {
    pub epochs: usize,
    /// L2 regularization strength
    pub lambda: f64,
    pub seed: u64,
    weights: Vec<Vec<f64>>,
    biases: Vec<f64>,
    n_classes: usize,
}

impl LinearSvmClassifier {
    pub fn new(epochs: usize, lambda: f64, seed: u64) -> Self {
        Self {
            epochs,
            lambda,
            seed,
            weights: Vec::new(),
            biases: Vec::new(),
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
        let n = y.len();
        let d = x.ncols();
        let mut rng = StdRng::seed_from_u64(self.seed);

        self.n_classes = n_classes;
        self.weights = Vec::with_capacity(n_classes);
        self.biases = Vec::with_capacity(n_classes);

        for class in 0..n_classes {
            let targets: Vec<f64> = y
                .iter()
                .map(|&c| if c == class { 1.0 } else { -1.0 })
                .collect();

            let mut w = vec![0.0; d];
            let mut b = 0.0;
            let mut order: Vec<usize> = (0..n).collect();
            let mut t: u64 = 0;

            for _ in 0..self.epochs {
                order.shuffle(&mut rng);
                for &i in &order {
                    t += 1;
                    let eta = 1.0 / (self.lambda * t as f64);
                    let row = x.row(i);
                    let margin = targets[i] * (dot(&w, row) + b);

                    let shrink = 1.0 - eta * self.lambda;
                    for wj in w.iter_mut() {
                        *wj *= shrink;
                    }
                    if margin < 1.0 {
                        for (wj, &xj) in w.iter_mut().zip(row.iter()) {
                            *wj += eta * targets[i] * xj;
                        }
                        b += eta * targets[i];
                    }
                }
            }

            self.weights.push(w);
            self.biases.push(b);
        }

        Ok(())
    }

    pub fn predict(&self, x: &Array2<f64>) -> Vec<usize> {
        (0..x.nrows())
            .map(|i| {
                let row = x.row(i);
                let mut best = 0;
                let mut best_score = f64::NEG_INFINITY;
                for class in 0..self.n_classes.max(1) {
                    let score = self.decision(class, row);
                    if score > best_score {
                        best = class;
                        best_score = score;
                    }
                }
                best
            })
            .collect()
    }

    /// Signed margin of one class's hyperplane; 0 when the model is unfit
    fn decision(&self, class: usize, row: ArrayView1<f64>) -> f64 {
        if class >= self.weights.len() {
            return 0.0;
        }
        dot(&self.weights[class], row) + self.biases[class]
    }
}

impl Default for LinearSvmClassifier {
    fn default() -> Self {
        Self::new(50, 1e-4, 42)
    }
}

fn dot(w: &[f64], row: ArrayView1<f64>) -> f64 {
    w.iter().zip(row.iter()).map(|(a, b)| a * b).sum()
}
