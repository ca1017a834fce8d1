use rand::Rng;
use rand_distr::Distribution as _;
use serde::{Deserialize, Serialize};

use super::gamma::fit_shape_scale;
use super::{Distribution, Learn};
use crate::error::DistributionError;
use crate::stats;

/// Erlang distribution: a gamma distribution with integer shape `k`.
///
/// `learn` runs the two-parameter gamma MLE (location 0), rounds the shape
/// to the nearest integer ≥ 1 and re-derives the scale as `x̄ / k`, which
/// is the scale MLE for a fixed shape. Data containing zeros (instant
/// durations) is fitted as the exponential case `k = 1`, `θ = x̄`.
///
/// # Mathematical Definition
/// - Mean: k·θ
/// - Variance: k·θ²
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Erlang {
    shape: u32,
    scale: f64,
}

impl Default for Erlang {
    fn default() -> Self {
        Self {
            shape: 1,
            scale: 0.0,
        }
    }
}

impl Erlang {
    /// Creates an Erlang distribution with shape `k` and scale `θ`.
    ///
    /// # Errors
    /// Returns `Err` if `shape == 0` or `scale` is not a positive finite number.
    pub fn new(shape: u32, scale: f64) -> Result<Self, DistributionError> {
        if shape == 0 || !scale.is_finite() || scale <= 0.0 {
            return Err(DistributionError::InvalidParameters(format!(
                "Erlang requires shape ≥ 1 and scale > 0, got shape={shape}, scale={scale}"
            )));
        }
        Ok(Self { shape, scale })
    }

    pub fn shape(&self) -> u32 {
        self.shape
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    /// Rate λ = 1/θ.
    pub fn rate(&self) -> f64 {
        1.0 / self.scale
    }

    pub fn mean(&self) -> f64 {
        self.shape as f64 * self.scale
    }

    pub fn var(&self) -> f64 {
        self.shape as f64 * self.scale * self.scale
    }

    pub fn std(&self) -> f64 {
        self.var().sqrt()
    }
}

impl Learn for Erlang {
    fn learn(&mut self, samples: &[f64]) -> Result<(), DistributionError> {
        let insufficient = |reason: &str| DistributionError::InsufficientData {
            family: "Erlang",
            reason: reason.into(),
        };
        let (Some(mean), Some((min, _))) = (stats::mean(samples), stats::range(samples)) else {
            return Err(insufficient("need at least one finite value"));
        };
        // ln x is undefined at zero; the likelihood there is maximised on
        // the boundary k = 1, i.e. the exponential with θ = x̄.
        if min == 0.0 {
            if !(mean > 0.0) {
                return Err(insufficient("values are all zero"));
            }
            *self = Self::new(1, mean)?;
            return Ok(());
        }
        let (shape, _, _) = fit_shape_scale(samples)
            .ok_or_else(|| insufficient("need non-negative values with non-zero spread"))?;
        let k = shape.round().max(1.0) as u32;
        *self = Self::new(k, mean / k as f64)?;
        Ok(())
    }
}

impl Distribution for Erlang {
    type Value = f64;

    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<f64, DistributionError> {
        if self.shape == 0 || !(self.scale > 0.0) {
            return Err(DistributionError::InvalidParameters(format!(
                "Erlang is not fitted (shape={}, scale={})",
                self.shape, self.scale
            )));
        }
        let gamma = rand_distr::Gamma::new(self.shape as f64, self.scale)
            .map_err(|e| DistributionError::InvalidParameters(e.to_string()))?;
        Ok(gamma.sample(rng))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random::create_rng;

    #[test]
    fn test_erlang_closed_form_moments() {
        let e = Erlang::new(3, 2.0).unwrap();
        assert!((e.mean() - 6.0).abs() < 1e-12);
        assert!((e.var() - 12.0).abs() < 1e-12);
        assert!((e.std() - 12.0_f64.sqrt()).abs() < 1e-12);
        assert!((e.rate() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_erlang_learn_recovers_integer_shape() {
        let truth = Erlang::new(4, 0.5).unwrap();
        let mut rng = create_rng(11);
        let data: Vec<f64> = (0..20_000).map(|_| truth.sample(&mut rng).unwrap()).collect();
        let mut fitted = Erlang::default();
        fitted.learn(&data).unwrap();
        assert_eq!(fitted.shape(), 4);
        // scale is re-derived so the fitted mean equals the sample mean
        let m = stats::mean(&data).unwrap();
        assert!((fitted.mean() - m).abs() < 1e-9);
    }

    #[test]
    fn test_erlang_learn_rejects_non_positive() {
        let mut e = Erlang::default();
        assert!(e.learn(&[1.0, -2.0, 3.0]).is_err());
        assert!(e.learn(&[]).is_err());
    }

    #[test]
    fn test_erlang_learn_accepts_zero_durations() {
        let mut e = Erlang::default();
        e.learn(&[0.0, 1.0, 2.0, 3.0, 5.0, 2.5]).unwrap();
        assert_eq!(e.shape(), 1);
        assert!((e.scale() - 2.25).abs() < 1e-12);

        let mut rng = create_rng(4);
        assert!((0..500).all(|_| e.sample(&mut rng).unwrap() >= 0.0));

        // a zero next to a negative value is still rejected
        assert!(e.learn(&[0.0, -1.0, 2.0]).is_err());
        assert!(e.learn(&[0.0, 0.0]).is_err());
        assert_eq!(e.scale(), 2.25);
    }

    #[test]
    fn test_erlang_invalid() {
        assert!(Erlang::new(0, 1.0).is_err());
        assert!(Erlang::new(2, 0.0).is_err());
        let mut rng = create_rng(0);
        assert!(Erlang::default().sample(&mut rng).is_err());
    }
}
