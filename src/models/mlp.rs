//! Multilayer perceptron: one ReLU hidden layer, softmax output, Adam

use super::{check_fit_inputs, TrainError};
use ndarray::{Array2, Axis};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// Feed-forward neural network classifier
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MlpClassifier {
    pub hidden: usize,
    /// Maximum number of training epochs
    pub max_iter: usize,
    pub learning_rate: f64,
    pub batch_size: usize,
    /// Minimum per-epoch loss improvement before early stopping kicks in
    pub tol: f64,
    pub seed: u64,
    w1: Array2<f64>,
    b1: Vec<f64>,
    w2: Array2<f64>,
    b2: Vec<f64>,
    n_classes: usize,
}

impl MlpClassifier {
    pub fn new(hidden: usize, max_iter: usize, learning_rate: f64, seed: u64) -> Self {
        Self {
            hidden: hidden.max(1),
            max_iter,
            learning_rate,
            batch_size: 200,
            tol: 1e-4,
            seed,
            w1: Array2::zeros((0, 0)),
            b1: Vec::new(),
            w2: Array2::zeros((0, 0)),
            b2: Vec::new(),
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
        let h = self.hidden;
        let k = n_classes.max(1);
        let batch = self.batch_size.clamp(1, n);

        let mut rng = StdRng::seed_from_u64(self.seed);
        self.n_classes = k;
        self.w1 = glorot_init(d, h, &mut rng);
        self.b1 = vec![0.0; h];
        self.w2 = glorot_init(h, k, &mut rng);
        self.b2 = vec![0.0; k];

        let mut adam = AdamState::new(d, h, k);
        let mut order: Vec<usize> = (0..n).collect();
        let mut best_loss = f64::INFINITY;
        let mut stalled = 0;

        for _ in 0..self.max_iter {
            order.shuffle(&mut rng);
            let mut epoch_loss = 0.0;

            for chunk in order.chunks(batch) {
                let b = chunk.len();
                let mut x_batch = Array2::zeros((b, d));
                for (r, &i) in chunk.iter().enumerate() {
                    x_batch.row_mut(r).assign(&x.row(i));
                }

                // forward
                let mut z1 = x_batch.dot(&self.w1);
                for mut row in z1.rows_mut() {
                    for (v, bias) in row.iter_mut().zip(&self.b1) {
                        *v += bias;
                    }
                }
                let a1 = z1.mapv(|v| v.max(0.0));

                let mut z2 = a1.dot(&self.w2);
                for mut row in z2.rows_mut() {
                    for (v, bias) in row.iter_mut().zip(&self.b2) {
                        *v += bias;
                    }
                }
                let probs = softmax_rows(&z2);

                for (r, &i) in chunk.iter().enumerate() {
                    epoch_loss -= probs[[r, y[i]]].max(1e-12).ln();
                }

                // backward
                let mut dz2 = probs;
                for (r, &i) in chunk.iter().enumerate() {
                    dz2[[r, y[i]]] -= 1.0;
                }
                dz2.mapv_inplace(|v| v / b as f64);

                let gw2 = a1.t().dot(&dz2);
                let gb2: Vec<f64> = dz2.sum_axis(Axis(0)).to_vec();

                let da1 = dz2.dot(&self.w2.t());
                let mut dz1 = da1;
                for ((r, c), v) in dz1.indexed_iter_mut() {
                    if z1[[r, c]] <= 0.0 {
                        *v = 0.0;
                    }
                }

                let gw1 = x_batch.t().dot(&dz1);
                let gb1: Vec<f64> = dz1.sum_axis(Axis(0)).to_vec();

                adam.step += 1;
                adam_update_matrix(
                    &mut self.w1,
                    &gw1,
                    &mut adam.mw1,
                    &mut adam.vw1,
                    self.learning_rate,
                    adam.step,
                );
                adam_update_vec(
                    &mut self.b1,
                    &gb1,
                    &mut adam.mb1,
                    &mut adam.vb1,
                    self.learning_rate,
                    adam.step,
                );
                adam_update_matrix(
                    &mut self.w2,
                    &gw2,
                    &mut adam.mw2,
                    &mut adam.vw2,
                    self.learning_rate,
                    adam.step,
                );
                adam_update_vec(
                    &mut self.b2,
                    &gb2,
                    &mut adam.mb2,
                    &mut adam.vb2,
                    self.learning_rate,
                    adam.step,
                );
            }

            let epoch_loss = epoch_loss / n as f64;
            if epoch_loss < best_loss - self.tol {
                best_loss = epoch_loss;
                stalled = 0;
            } else {
                stalled += 1;
                if stalled >= 10 {
                    break;
                }
            }
        }

        Ok(())
    }

    pub fn predict(&self, x: &Array2<f64>) -> Vec<usize> {
        if self.w1.nrows() == 0 {
            return vec![0; x.nrows()];
        }

        let mut z1 = x.dot(&self.w1);
        for mut row in z1.rows_mut() {
            for (v, bias) in row.iter_mut().zip(&self.b1) {
                *v += bias;
            }
        }
        let a1 = z1.mapv(|v| v.max(0.0));

        let mut z2 = a1.dot(&self.w2);
        for mut row in z2.rows_mut() {
            for (v, bias) in row.iter_mut().zip(&self.b2) {
                *v += bias;
            }
        }

        z2.rows()
            .into_iter()
            .map(|row| {
                let mut best = 0;
                let mut best_score = f64::NEG_INFINITY;
                for (k, &v) in row.iter().enumerate() {
                    if v > best_score {
                        best = k;
                        best_score = v;
                    }
                }
                best
            })
            .collect()
    }
}

impl Default for MlpClassifier {
    fn default() -> Self {
        Self::new(100, 1000, 1e-3, 42)
    }
}

fn glorot_init(fan_in: usize, fan_out: usize, rng: &mut StdRng) -> Array2<f64> {
    let limit = (6.0 / (fan_in + fan_out) as f64).sqrt();
    Array2::from_shape_fn((fan_in, fan_out), |_| rng.gen_range(-limit..limit))
}

fn softmax_rows(z: &Array2<f64>) -> Array2<f64> {
    let mut out = z.clone();
    for mut row in out.rows_mut() {
        let max = row.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let mut sum = 0.0;
        for v in row.iter_mut() {
            *v = (*v - max).exp();
            sum += *v;
        }
        for v in row.iter_mut() {
            *v /= sum;
        }
    }
    out
}

const BETA1: f64 = 0.9;
const BETA2: f64 = 0.999;
const EPS: f64 = 1e-8;

struct AdamState {
    step: u64,
    mw1: Array2<f64>,
    vw1: Array2<f64>,
    mb1: Vec<f64>,
    vb1: Vec<f64>,
    mw2: Array2<f64>,
    vw2: Array2<f64>,
    mb2: Vec<f64>,
    vb2: Vec<f64>,
}

impl AdamState {
    fn new(d: usize, h: usize, k: usize) -> Self {
        Self {
            step: 0,
            mw1: Array2::zeros((d, h)),
            vw1: Array2::zeros((d, h)),
            mb1: vec![0.0; h],
            vb1: vec![0.0; h],
            mw2: Array2::zeros((h, k)),
            vw2: Array2::zeros((h, k)),
            mb2: vec![0.0; k],
            vb2: vec![0.0; k],
        }
    }
}

fn adam_update_matrix(
    param: &mut Array2<f64>,
    grad: &Array2<f64>,
    m: &mut Array2<f64>,
    v: &mut Array2<f64>,
    lr: f64,
    step: u64,
) {
    let bc1 = 1.0 - BETA1.powi(step as i32);
    let bc2 = 1.0 - BETA2.powi(step as i32);
    for ((p, g), (mi, vi)) in param
        .iter_mut()
        .zip(grad.iter())
        .zip(m.iter_mut().zip(v.iter_mut()))
    {
        *mi = BETA1 * *mi + (1.0 - BETA1) * g;
        *vi = BETA2 * *vi + (1.0 - BETA2) * g * g;
        let m_hat = *mi / bc1;
        let v_hat = *vi / bc2;
        *p -= lr * m_hat / (v_hat.sqrt() + EPS);
    }
}

fn adam_update_vec(
    param: &mut [f64],
    grad: &[f64],
    m: &mut [f64],
    v: &mut [f64],
    lr: f64,
    step: u64,
) {
    let bc1 = 1.0 - BETA1.powi(step as i32);
    let bc2 = 1.0 - BETA2.powi(step as i32);
    for ((p, g), (mi, vi)) in param
        .iter_mut()
        .zip(grad.iter())
        .zip(m.iter_mut().zip(v.iter_mut()))
    {
        *mi = BETA1 * *mi + (1.0 - BETA1) * g;
        *vi = BETA2 * *vi + (1.0 - BETA2) * g * g;
        let m_hat = *mi / bc1;
        let v_hat = *vi / bc2;
        *p -= lr * m_hat / (v_hat.sqrt() + EPS);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::test_data::separable;

    #[test]
    fn test_mlp_separates_clusters() {
        let (x, y) = separable();
        let mut mlp = MlpClassifier::new(16, 500, 1e-2, 42);
        mlp.fit(&x, &y, 2).unwrap();

        let pred = mlp.predict(&x);
        let correct = pred.iter().zip(&y).filter(|(p, t)| p == t).count();
        assert!(correct as f64 / y.len() as f64 >= 0.95);
    }

    #[test]
    fn test_mlp_deterministic_per_seed() {
        let (x, y) = separable();
        let mut a = MlpClassifier::new(8, 50, 1e-2, 7);
        a.fit(&x, &y, 2).unwrap();
        let mut b = MlpClassifier::new(8, 50, 1e-2, 7);
        b.fit(&x, &y, 2).unwrap();
        assert_eq!(a.predict(&x), b.predict(&x));
    }

    #[test]
    fn test_mlp_unfit_predicts_default_class() {
        let mlp = MlpClassifier::default();
        let x = Array2::zeros((3, 2));
        assert_eq!(mlp.predict(&x), vec![0, 0, 0]);
    }
}
