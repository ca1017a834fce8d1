use rand::Rng;
use serde::{Deserialize, Serialize};

use super::{Distribution, Learn};
use crate::error::DistributionError;
use crate::stats;

/// Continuous uniform distribution on `[min, max]`.
///
/// Commonly used as the error-cap policy of the stratified model, e.g.
/// `Uniform::new(0.05, 0.2)`. A degenerate `min == max` is accepted and
/// always samples `min`.
///
/// # Mathematical Definition
/// - Mean: (min+max)/2
/// - Variance: (max−min)²/12
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Uniform {
    min: f64,
    max: f64,
}

impl Uniform {
    /// Creates a new uniform distribution on `[min, max]`.
    ///
    /// # Errors
    /// Returns `Err` if `min > max` or either parameter is not finite.
    pub fn new(min: f64, max: f64) -> Result<Self, DistributionError> {
        if !min.is_finite() || !max.is_finite() || min > max {
            return Err(DistributionError::InvalidParameters(format!(
                "Uniform requires min ≤ max, got min={min}, max={max}"
            )));
        }
        Ok(Self { min, max })
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }

    pub fn mean(&self) -> f64 {
        (self.min + self.max) / 2.0
    }

    pub fn variance(&self) -> f64 {
        let range = self.max - self.min;
        range * range / 12.0
    }
}

impl Learn for Uniform {
    fn learn(&mut self, samples: &[f64]) -> Result<(), DistributionError> {
        let Some((min, max)) = stats::range(samples) else {
            return Err(DistributionError::InsufficientData {
                family: "Uniform",
                reason: "need at least one non-NaN value".into(),
            });
        };
        *self = Self::new(min, max)?;
        Ok(())
    }
}

impl Distribution for Uniform {
    type Value = f64;

    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<f64, DistributionError> {
        let u: f64 = rng.random();
        Ok(self.min + (self.max - self.min) * u)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random::create_rng;

    #[test]
    fn test_uniform_basic() {
        let u = Uniform::new(0.0, 10.0).unwrap();
        assert!((u.mean() - 5.0).abs() < 1e-15);
        assert!((u.variance() - 100.0 / 12.0).abs() < 1e-10);
    }

    #[test]
    fn test_uniform_learn_min_max() {
        let mut u = Uniform::default();
        u.learn(&[3.0, -1.0, 7.5, 2.0]).unwrap();
        assert_eq!(u.min(), -1.0);
        assert_eq!(u.max(), 7.5);
    }

    #[test]
    fn test_uniform_degenerate_samples_min() {
        let u = Uniform::new(0.1, 0.1).unwrap();
        let mut rng = create_rng(9);
        assert_eq!(u.sample(&mut rng).unwrap(), 0.1);
    }

    #[test]
    fn test_uniform_invalid() {
        assert!(Uniform::new(5.0, 3.0).is_err());
        assert!(Uniform::new(f64::NAN, 5.0).is_err());
        assert!(Uniform::default().learn(&[]).is_err());
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use crate::random::create_rng;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(300))]

        #[test]
        fn uniform_sample_in_range(
            min in -100.0_f64..0.0,
            width in 0.0_f64..100.0,
            seed in 0_u64..10000,
        ) {
            let u = Uniform::new(min, min + width).unwrap();
            let mut rng = create_rng(seed);
            let x = u.sample(&mut rng).unwrap();
            prop_assert!(x >= u.min() && x <= u.max());
        }
    }
}
