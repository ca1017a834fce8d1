//! Seeded random sources, shuffling and weighted index sampling.
//!
//! The crate never touches a global RNG: callers hand an `Rng` to every
//! `learn` and `sample`. Components that need a private stream (the
//! regressor's initialisation and epoch shuffles) derive one with
//! [`derive_rng`], so a seeded caller gets reproducible models.

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// Seeded `SmallRng`; the stream is fixed for a given seed and platform.
///
/// ```
/// use rand::Rng;
/// use u_stratify::random::create_rng;
/// let a: u64 = create_rng(3).random();
/// let b: u64 = create_rng(3).random();
/// assert_eq!(a, b);
/// ```
pub fn create_rng(seed: u64) -> SmallRng {
    SmallRng::seed_from_u64(seed)
}

/// Private stream for a sub-component: seeded from `seed` when given,
/// otherwise from one draw of `parent`.
pub fn derive_rng<R: Rng + ?Sized>(seed: Option<u64>, parent: &mut R) -> SmallRng {
    create_rng(seed.unwrap_or_else(|| parent.random()))
}

/// In-place Fisher-Yates (Durstenfeld) shuffle.
///
/// Reference: Knuth (1997), *TAOCP* Vol. 2, §3.4.2, Algorithm P.
pub fn shuffle<T, R: Rng + ?Sized>(slice: &mut [T], rng: &mut R) {
    for i in (1..slice.len()).rev() {
        let j = rng.random_range(0..=i);
        slice.swap(i, j);
    }
}

/// Index sampler over non-negative weights, by binary search on the
/// cumulative weight table.
///
/// Non-positive weights are kept as empty buckets and never drawn.
///
/// ```
/// use u_stratify::random::{create_rng, WeightedSampler};
/// let sampler = WeightedSampler::new(&[0.0, 2.0, 0.0]).unwrap();
/// assert_eq!(sampler.sample(&mut create_rng(1)), 1);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightedSampler {
    cumulative: Vec<f64>,
}

impl WeightedSampler {
    /// Returns `None` if `weights` is empty, holds a non-finite value, or
    /// has no positive weight.
    pub fn new(weights: &[f64]) -> Option<Self> {
        if !weights.iter().all(|w| w.is_finite()) {
            return None;
        }
        let cumulative: Vec<f64> = weights
            .iter()
            .scan(0.0, |total, &w| {
                *total += w.max(0.0);
                Some(*total)
            })
            .collect();
        match cumulative.last() {
            Some(&total) if total > 0.0 => Some(Self { cumulative }),
            _ => None,
        }
    }

    /// O(log n) draw of one index.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> usize {
        let threshold = rng.random_range(0.0..self.total_weight());
        let idx = self.cumulative.partition_point(|&c| c <= threshold);
        idx.min(self.cumulative.len() - 1)
    }

    /// Number of buckets, including zero-weight ones.
    pub fn len(&self) -> usize {
        self.cumulative.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cumulative.is_empty()
    }

    pub fn total_weight(&self) -> f64 {
        self.cumulative.last().copied().unwrap_or(0.0)
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        #[test]
        fn shuffle_keeps_multiset(seed in any::<u64>(), mut data in proptest::collection::vec(0_u16..500, 0..60)) {
            let mut shuffled = data.clone();
            shuffle(&mut shuffled, &mut create_rng(seed));
            shuffled.sort_unstable();
            data.sort_unstable();
            prop_assert_eq!(shuffled, data);
        }

        #[test]
        fn sampler_only_draws_positive_buckets(
            seed in any::<u64>(),
            weights in proptest::collection::vec(-1.0_f64..5.0, 1..20),
        ) {
            if let Some(sampler) = WeightedSampler::new(&weights) {
                let mut rng = create_rng(seed);
                for _ in 0..25 {
                    prop_assert!(weights[sampler.sample(&mut rng)] > 0.0);
                }
            }
        }
    }
}
