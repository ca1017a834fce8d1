//! Feed-forward expectation regressor.
//!
//! A fixed-recipe multi-layer perceptron mapping an encoded feature vector
//! to a scalar expected value.
//!
//! # Architecture
//!
//! ```text
//! d → max(1, d) → max(1, d/2) → max(1, d/4) → 1
//!     ReLU        ReLU          ReLU          identity
//! ```
//!
//! # Training
//!
//! Mini-batch Adam on the squared-error loss `Σ(ŷ − y)² / 2n` plus an L2
//! penalty `α/2n · Σ‖W‖²`. Weights and biases start from a Glorot uniform
//! draw in `±√(6 / (fan_in + fan_out))`. Rows are reshuffled every epoch.
//! Training stops after `max_iter` epochs, or earlier once the epoch loss
//! has failed to improve by `tol` for more than `n_iter_no_change`
//! consecutive epochs.
//!
//! Reference: Kingma & Ba (2015), "Adam: A Method for Stochastic
//! Optimization"; Glorot & Bengio (2010), "Understanding the difficulty of
//! training deep feedforward neural networks".

use ndarray::{Array, Array1, Array2, ArrayView2, Axis, Dimension, Zip};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::ModelError;
use crate::random::{derive_rng, shuffle};

/// Hyper-parameters of the regressor.
///
/// The defaults form the canonical recipe; every field may be overridden
/// from configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegressorConfig {
    /// Adam step size.
    pub learning_rate: f64,
    /// Exponential decay of the first-moment estimate.
    pub beta1: f64,
    /// Exponential decay of the second-moment estimate.
    pub beta2: f64,
    /// Adam denominator guard.
    pub epsilon: f64,
    /// L2 penalty strength.
    pub alpha: f64,
    /// Mini-batch size, clamped to the number of rows.
    pub batch_size: usize,
    /// Maximum number of epochs.
    pub max_iter: usize,
    /// Minimum loss improvement that resets the patience counter.
    pub tol: f64,
    /// Patience, in epochs.
    pub n_iter_no_change: usize,
    /// Reshuffle rows every epoch.
    pub shuffle: bool,
    /// Fixed training seed. When `None`, a seed is drawn from the RNG
    /// passed to [`MlpRegressor::fit`].
    pub seed: Option<u64>,
}

impl Default for RegressorConfig {
    fn default() -> Self {
        Self {
            learning_rate: 1e-3,
            beta1: 0.9,
            beta2: 0.999,
            epsilon: 1e-8,
            alpha: 1e-4,
            batch_size: 200,
            max_iter: 200,
            tol: 1e-4,
            n_iter_no_change: 10,
            shuffle: true,
            seed: None,
        }
    }
}

impl RegressorConfig {
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_learning_rate(mut self, learning_rate: f64) -> Self {
        self.learning_rate = learning_rate;
        self
    }

    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Checks that every hyper-parameter lies in its valid range.
    pub fn validate(&self) -> Result<(), ModelError> {
        let invalid = |msg: String| Err(ModelError::InvalidConfig(msg));
        if !(self.learning_rate > 0.0) || !self.learning_rate.is_finite() {
            return invalid(format!("learning_rate must be > 0, got {}", self.learning_rate));
        }
        for (name, beta) in [("beta1", self.beta1), ("beta2", self.beta2)] {
            if !(0.0..1.0).contains(&beta) {
                return invalid(format!("{name} must be in [0, 1), got {beta}"));
            }
        }
        if !(self.epsilon > 0.0) {
            return invalid(format!("epsilon must be > 0, got {}", self.epsilon));
        }
        if !(self.alpha >= 0.0) || !self.alpha.is_finite() {
            return invalid(format!("alpha must be >= 0, got {}", self.alpha));
        }
        if self.batch_size == 0 {
            return invalid("batch_size must be at least 1".into());
        }
        if self.max_iter == 0 {
            return invalid("max_iter must be at least 1".into());
        }
        if !(self.tol >= 0.0) {
            return invalid(format!("tol must be >= 0, got {}", self.tol));
        }
        Ok(())
    }
}

/// Fully connected layer: `out = input · weights + bias`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Dense {
    weights: Array2<f64>,
    bias: Array1<f64>,
}

impl Dense {
    fn glorot<R: Rng + ?Sized>(fan_in: usize, fan_out: usize, rng: &mut R) -> Self {
        let bound = (6.0 / (fan_in + fan_out) as f64).sqrt();
        let mut draw = || rng.random_range(-bound..bound);
        let weights = Array2::from_shape_simple_fn((fan_in, fan_out), &mut draw);
        let bias = Array1::from_shape_simple_fn(fan_out, &mut draw);
        Self { weights, bias }
    }
}

/// Adam first/second moment estimates for every layer.
struct Adam {
    learning_rate: f64,
    beta1: f64,
    beta2: f64,
    epsilon: f64,
    t: i32,
    weight_moments: Vec<(Array2<f64>, Array2<f64>)>,
    bias_moments: Vec<(Array1<f64>, Array1<f64>)>,
}

impl Adam {
    fn new(config: &RegressorConfig, layers: &[Dense]) -> Self {
        Self {
            learning_rate: config.learning_rate,
            beta1: config.beta1,
            beta2: config.beta2,
            epsilon: config.epsilon,
            t: 0,
            weight_moments: layers
                .iter()
                .map(|l| (Array2::zeros(l.weights.raw_dim()), Array2::zeros(l.weights.raw_dim())))
                .collect(),
            bias_moments: layers
                .iter()
                .map(|l| (Array1::zeros(l.bias.len()), Array1::zeros(l.bias.len())))
                .collect(),
        }
    }

    fn step(&mut self, layers: &mut [Dense], grads: &[(Array2<f64>, Array1<f64>)]) {
        self.t = self.t.saturating_add(1);
        // Bias correction folded into the step size.
        let lr_t = self.learning_rate * (1.0 - self.beta2.powi(self.t)).sqrt()
            / (1.0 - self.beta1.powi(self.t));
        for (i, layer) in layers.iter_mut().enumerate() {
            let (gw, gb) = &grads[i];
            let (mw, vw) = &mut self.weight_moments[i];
            adam_update(&mut layer.weights, mw, vw, gw, self.beta1, self.beta2, self.epsilon, lr_t);
            let (mb, vb) = &mut self.bias_moments[i];
            adam_update(&mut layer.bias, mb, vb, gb, self.beta1, self.beta2, self.epsilon, lr_t);
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn adam_update<D: Dimension>(
    param: &mut Array<f64, D>,
    m: &mut Array<f64, D>,
    v: &mut Array<f64, D>,
    grad: &Array<f64, D>,
    beta1: f64,
    beta2: f64,
    epsilon: f64,
    lr_t: f64,
) {
    Zip::from(param)
        .and(m)
        .and(v)
        .and(grad)
        .for_each(|p, m, v, &g| {
            *m = beta1 * *m + (1.0 - beta1) * g;
            *v = beta2 * *v + (1.0 - beta2) * g * g;
            *p -= lr_t * *m / (v.sqrt() + epsilon);
        });
}

/// Multi-layer perceptron regressor with three ReLU hidden layers.
///
/// # Examples
/// ```
/// use ndarray::array;
/// use u_stratify::random::create_rng;
/// use u_stratify::regressor::{MlpRegressor, RegressorConfig};
///
/// let x = array![[0.0, 1.0], [1.0, 0.0], [0.5, 0.5], [1.0, 1.0]];
/// let y = [1.0, 2.0, 1.5, 3.0];
/// let mut mlp = MlpRegressor::new(RegressorConfig::default().with_seed(7));
/// mlp.fit(&x, &y, &mut create_rng(0)).unwrap();
/// assert_eq!(mlp.predict(&x).unwrap().len(), 4);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MlpRegressor {
    config: RegressorConfig,
    layers: Vec<Dense>,
    loss_curve: Vec<f64>,
    converged: bool,
}

impl MlpRegressor {
    pub fn new(config: RegressorConfig) -> Self {
        Self {
            config,
            layers: Vec::new(),
            loss_curve: Vec::new(),
            converged: false,
        }
    }

    pub fn config(&self) -> &RegressorConfig {
        &self.config
    }

    pub fn is_fitted(&self) -> bool {
        !self.layers.is_empty()
    }

    /// Input dimensionality, or 0 before fitting.
    pub fn input_dim(&self) -> usize {
        self.layers.first().map_or(0, |l| l.weights.nrows())
    }

    /// Widths of the hidden layers.
    pub fn hidden_sizes(&self) -> Vec<usize> {
        let hidden = self.layers.len().saturating_sub(1);
        self.layers[..hidden].iter().map(|l| l.bias.len()).collect()
    }

    /// Training loss after each completed epoch.
    pub fn loss_curve(&self) -> &[f64] {
        &self.loss_curve
    }

    /// Number of epochs run by the last `fit`.
    pub fn n_iter(&self) -> usize {
        self.loss_curve.len()
    }

    /// Whether the last `fit` stopped on the patience criterion rather
    /// than exhausting `max_iter`.
    pub fn converged(&self) -> bool {
        self.converged
    }

    /// Trains the network in place on `x` (n × d) against targets `y`.
    ///
    /// # Errors
    /// - [`ModelError::EmptyData`] if `x` has no rows
    /// - [`ModelError::EmptyFeatureSpace`] if `x` has no columns
    /// - [`ModelError::DimensionMismatch`] if `y.len() != n`
    /// - [`ModelError::InvalidConfig`] if the hyper-parameters are invalid
    pub fn fit<R: Rng + ?Sized>(
        &mut self,
        x: &Array2<f64>,
        y: &[f64],
        rng: &mut R,
    ) -> Result<(), ModelError> {
        self.config.validate()?;
        let (n, d) = x.dim();
        if n == 0 {
            return Err(ModelError::EmptyData);
        }
        if d == 0 {
            return Err(ModelError::EmptyFeatureSpace);
        }
        if y.len() != n {
            return Err(ModelError::DimensionMismatch {
                expected: n,
                actual: y.len(),
            });
        }

        let mut rng = derive_rng(self.config.seed, rng);

        let sizes = [d, d.max(1), (d / 2).max(1), (d / 4).max(1), 1];
        self.layers = sizes
            .windows(2)
            .map(|w| Dense::glorot(w[0], w[1], &mut rng))
            .collect();
        self.loss_curve.clear();
        self.converged = false;

        let mut adam = Adam::new(&self.config, &self.layers);
        let batch_size = self.config.batch_size.min(n);
        let targets = Array1::from(y.to_vec());
        let mut order: Vec<usize> = (0..n).collect();
        let mut best_loss = f64::INFINITY;
        let mut no_improvement = 0;

        for epoch in 0..self.config.max_iter {
            if self.config.shuffle {
                shuffle(&mut order, &mut rng);
            }
            let mut accumulated = 0.0;
            for chunk in order.chunks(batch_size) {
                let xb = x.select(Axis(0), chunk);
                let yb = targets.select(Axis(0), chunk);
                let batch_loss = self.train_batch(&xb, &yb, &mut adam);
                accumulated += batch_loss * chunk.len() as f64;
            }
            let loss = accumulated / n as f64;
            self.loss_curve.push(loss);

            if loss > best_loss - self.config.tol {
                no_improvement += 1;
            } else {
                no_improvement = 0;
            }
            if loss < best_loss {
                best_loss = loss;
            }
            if no_improvement > self.config.n_iter_no_change {
                debug!(epoch, loss, "regressor converged");
                self.converged = true;
                break;
            }
        }

        if !self.converged {
            warn!(
                max_iter = self.config.max_iter,
                loss = self.loss_curve.last().copied().unwrap_or(f64::NAN),
                "regressor reached max_iter without converging"
            );
        }
        Ok(())
    }

    /// Predicts one value per row of `x`.
    ///
    /// # Errors
    /// - [`ModelError::NotFitted`] before a successful `fit`
    /// - [`ModelError::DimensionMismatch`] if `x` has the wrong width
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>, ModelError> {
        if !self.is_fitted() {
            return Err(ModelError::NotFitted);
        }
        if x.ncols() != self.input_dim() {
            return Err(ModelError::DimensionMismatch {
                expected: self.input_dim(),
                actual: x.ncols(),
            });
        }
        let mut activations = self.forward(x.view());
        let output = activations.pop().unwrap_or_else(|| x.clone());
        Ok(output.column(0).to_owned())
    }

    /// Returns the input followed by every layer's output.
    fn forward(&self, x: ArrayView2<f64>) -> Vec<Array2<f64>> {
        let mut activations = Vec::with_capacity(self.layers.len() + 1);
        activations.push(x.to_owned());
        let last = self.layers.len().saturating_sub(1);
        for (i, layer) in self.layers.iter().enumerate() {
            let mut z = activations[i].dot(&layer.weights) + &layer.bias;
            if i < last {
                z.mapv_inplace(|v| v.max(0.0));
            }
            activations.push(z);
        }
        activations
    }

    /// One Adam step on a mini-batch; returns the penalised batch loss.
    fn train_batch(&mut self, xb: &Array2<f64>, yb: &Array1<f64>, adam: &mut Adam) -> f64 {
        let m = xb.nrows() as f64;
        let alpha = self.config.alpha;
        let activations = self.forward(xb.view());
        let Some(output) = activations.last() else {
            return f64::NAN;
        };

        let mut delta = output - &yb.view().insert_axis(Axis(1));
        let penalty: f64 = self
            .layers
            .iter()
            .map(|l| l.weights.iter().map(|w| w * w).sum::<f64>())
            .sum();
        let loss = delta.iter().map(|e| e * e).sum::<f64>() / (2.0 * m) + alpha * penalty / (2.0 * m);

        let mut grads = Vec::with_capacity(self.layers.len());
        for i in (0..self.layers.len()).rev() {
            let layer = &self.layers[i];
            let grad_w = (activations[i].t().dot(&delta) + &(alpha * &layer.weights)) / m;
            let grad_b = delta.sum_axis(Axis(0)) / m;
            if i > 0 {
                let mut back = delta.dot(&layer.weights.t());
                Zip::from(&mut back)
                    .and(&activations[i])
                    .for_each(|g, &a| {
                        if a <= 0.0 {
                            *g = 0.0;
                        }
                    });
                delta = back;
            }
            grads.push((grad_w, grad_b));
        }
        grads.reverse();
        adam.step(&mut self.layers, &grads);
        loss
    }

    /// Shifts the output bias, for forcing non-positive predictions in tests.
    #[cfg(test)]
    pub(crate) fn shift_output(&mut self, delta: f64) {
        if let Some(last) = self.layers.last_mut() {
            last.bias += delta;
        }
    }
}
