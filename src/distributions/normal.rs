use rand::Rng;
use rand_distr::Distribution as _;
use serde::{Deserialize, Serialize};

use super::{Distribution, Learn};
use crate::error::DistributionError;
use crate::stats;

/// Normal distribution N(μ, σ).
///
/// `learn` is the maximum-likelihood fit: sample mean and population
/// (n-denominator) standard deviation. A zero σ is allowed and samples
/// collapse to μ, which is what a fit on constant data produces.
///
/// # Mathematical Definition
/// - PDF: φ(x) = (1/(σ√(2π))) exp(−(x−μ)²/(2σ²))
/// - Mean: μ
/// - Variance: σ²
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Normal {
    mu: f64,
    sigma: f64,
}

impl Normal {
    /// Creates a new normal distribution N(μ, σ).
    ///
    /// # Errors
    /// Returns `Err` if `sigma < 0` or parameters are not finite.
    pub fn new(mu: f64, sigma: f64) -> Result<Self, DistributionError> {
        if !mu.is_finite() || !sigma.is_finite() || sigma < 0.0 {
            return Err(DistributionError::InvalidParameters(format!(
                "Normal requires finite μ and σ ≥ 0, got μ={mu}, σ={sigma}"
            )));
        }
        Ok(Self { mu, sigma })
    }

    pub fn mu(&self) -> f64 {
        self.mu
    }

    pub fn sigma(&self) -> f64 {
        self.sigma
    }

    pub fn mean(&self) -> f64 {
        self.mu
    }

    pub fn variance(&self) -> f64 {
        self.sigma * self.sigma
    }

    pub fn std_dev(&self) -> f64 {
        self.sigma
    }
}

impl Learn for Normal {
    fn learn(&mut self, samples: &[f64]) -> Result<(), DistributionError> {
        let (Some(mu), Some(sigma)) = (stats::mean(samples), stats::population_std_dev(samples))
        else {
            return Err(DistributionError::InsufficientData {
                family: "Normal",
                reason: format!("need at least one finite value, got {}", samples.len()),
            });
        };
        self.mu = mu;
        self.sigma = sigma;
        Ok(())
    }
}

impl Distribution for Normal {
    type Value = f64;

    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<f64, DistributionError> {
        if self.sigma == 0.0 {
            return Ok(self.mu);
        }
        let normal = rand_distr::Normal::new(self.mu, self.sigma)
            .map_err(|e| DistributionError::InvalidParameters(e.to_string()))?;
        Ok(normal.sample(rng))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random::create_rng;

    #[test]
    fn test_normal_learn_mle() {
        let mut n = Normal::default();
        n.learn(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]).unwrap();
        assert!((n.mu() - 5.0).abs() < 1e-12);
        // population σ, not the n−1 estimate
        assert!((n.sigma() - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_normal_learn_empty() {
        let mut n = Normal::default();
        assert!(n.learn(&[]).is_err());
        assert!(n.learn(&[1.0, f64::NAN]).is_err());
    }

    #[test]
    fn test_normal_zero_sigma_is_constant() {
        let n = Normal::new(3.5, 0.0).unwrap();
        let mut rng = create_rng(1);
        for _ in 0..10 {
            assert_eq!(n.sample(&mut rng).unwrap(), 3.5);
        }
    }

    #[test]
    fn test_normal_invalid() {
        assert!(Normal::new(0.0, -1.0).is_err());
        assert!(Normal::new(f64::NAN, 1.0).is_err());
        assert!(Normal::new(0.0, f64::INFINITY).is_err());
    }

    #[test]
    fn test_normal_sample_moments() {
        let n = Normal::new(10.0, 2.0).unwrap();
        let mut rng = create_rng(42);
        let draws: Vec<f64> = (0..20_000).map(|_| n.sample(&mut rng).unwrap()).collect();
        let m = stats::mean(&draws).unwrap();
        let s = stats::population_std_dev(&draws).unwrap();
        assert!((m - 10.0).abs() < 0.1, "mean {m}");
        assert!((s - 2.0).abs() < 0.1, "std {s}");
    }
}
