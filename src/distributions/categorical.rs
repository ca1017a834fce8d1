use rand::Rng;
use serde::{Deserialize, Serialize};

use super::Distribution;
use crate::error::DistributionError;
use crate::random::WeightedSampler;

/// Categorical distribution over distinct values with observed weights.
///
/// Weights may be integer counts or arbitrary non-negative floats; they
/// need not sum to one.
///
/// # Examples
/// ```
/// use u_stratify::distributions::{Categorical, Distribution};
/// use u_stratify::random::create_rng;
///
/// let mut loan_goal = Categorical::default();
/// loan_goal.learn(vec!["car", "home"], &[30.0, 10.0]).unwrap();
/// let mut rng = create_rng(1);
/// let v = loan_goal.sample(&mut rng).unwrap();
/// assert!(v == "car" || v == "home");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Categorical<T> {
    values: Vec<T>,
    weights: Vec<f64>,
    sampler: Option<WeightedSampler>,
}

impl<T> Default for Categorical<T> {
    fn default() -> Self {
        Self {
            values: Vec::new(),
            weights: Vec::new(),
            sampler: None,
        }
    }
}

impl<T> Categorical<T> {
    /// Creates a categorical distribution from parallel value/weight lists.
    ///
    /// # Errors
    /// See [`Categorical::learn`].
    pub fn new(values: Vec<T>, weights: &[f64]) -> Result<Self, DistributionError> {
        let mut dist = Self::default();
        dist.learn(values, weights)?;
        Ok(dist)
    }

    /// Replaces the distribution with `values` observed with `weights`.
    ///
    /// # Errors
    /// Returns `Err` if the lists differ in length, are empty, or carry no
    /// positive finite weight.
    pub fn learn(&mut self, values: Vec<T>, weights: &[f64]) -> Result<(), DistributionError> {
        if values.len() != weights.len() {
            return Err(DistributionError::InvalidParameters(format!(
                "Categorical got {} values but {} weights",
                values.len(),
                weights.len()
            )));
        }
        let sampler = WeightedSampler::new(weights).ok_or_else(|| {
            DistributionError::InsufficientData {
                family: "Categorical",
                reason: "need at least one positive finite weight".into(),
            }
        })?;
        self.values = values;
        self.weights = weights.to_vec();
        self.sampler = Some(sampler);
        Ok(())
    }

    pub fn values(&self) -> &[T] {
        &self.values
    }

    pub fn weights(&self) -> &[f64] {
        &self.weights
    }
}

impl<T: Clone> Distribution for Categorical<T> {
    type Value = T;

    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<T, DistributionError> {
        let sampler = self
            .sampler
            .as_ref()
            .ok_or_else(|| DistributionError::InvalidParameters("Categorical is not fitted".into()))?;
        Ok(self.values[sampler.sample(rng)].clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random::create_rng;

    #[test]
    fn test_categorical_integer_counts() {
        let c = Categorical::new(vec![1_u32, 2, 3], &[0.0, 5.0, 0.0]).unwrap();
        let mut rng = create_rng(4);
        for _ in 0..100 {
            assert_eq!(c.sample(&mut rng).unwrap(), 2);
        }
    }

    #[test]
    fn test_categorical_frequencies() {
        let c = Categorical::new(vec!["a", "b"], &[1.0, 3.0]).unwrap();
        let mut rng = create_rng(42);
        let n = 10_000;
        let b_count = (0..n).filter(|_| c.sample(&mut rng).unwrap() == "b").count();
        let share = b_count as f64 / n as f64;
        assert!((share - 0.75).abs() < 0.03, "share {share}");
    }

    #[test]
    fn test_categorical_rejects_mismatch() {
        assert!(Categorical::new(vec!["a"], &[1.0, 2.0]).is_err());
        assert!(Categorical::<&str>::new(vec![], &[]).is_err());
        assert!(Categorical::new(vec!["a"], &[0.0]).is_err());
    }

    #[test]
    fn test_categorical_unfitted_sample_fails() {
        let c: Categorical<String> = Categorical::default();
        let mut rng = create_rng(0);
        assert!(c.sample(&mut rng).is_err());
    }
}
