use rand::Rng;
use rand_distr::Distribution as _;
use serde::{Deserialize, Serialize};

use super::{Distribution, Learn};
use crate::error::DistributionError;
use crate::{special, stats};

/// Fraction of the sample range added on each side so every observation
/// lies strictly inside `(loc, loc + scale)`.
const SUPPORT_MARGIN: f64 = 1e-3;
const NEWTON_MAX_ITER: usize = 200;
const NEWTON_TOL: f64 = 1e-10;

/// Four-parameter beta distribution: `loc + scale · Beta(a, b)`.
///
/// # Fitting
/// The support `[loc, loc + scale]` is the sample range widened by
/// 0.1% of the range on each side. The shapes `a`, `b` then solve the
/// likelihood equations
///
/// ```text
/// ψ(a) − ψ(a+b) = mean(ln u)
/// ψ(b) − ψ(a+b) = mean(ln(1−u))
/// ```
///
/// by two-dimensional Newton iteration from the method-of-moments estimate.
///
/// Reference: Johnson, Kotz & Balakrishnan (1995), *Continuous Univariate
/// Distributions*, Vol. 2, Chapter 25.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Beta {
    a: f64,
    b: f64,
    loc: f64,
    scale: f64,
}

impl Beta {
    /// Creates a beta distribution with explicit parameters.
    ///
    /// # Errors
    /// Returns `Err` if `a`, `b` or `scale` is not positive, or any
    /// parameter is not finite.
    pub fn new(a: f64, b: f64, loc: f64, scale: f64) -> Result<Self, DistributionError> {
        if ![a, b, loc, scale].iter().all(|v| v.is_finite()) {
            return Err(DistributionError::InvalidParameters(
                "Beta parameters must be finite".into(),
            ));
        }
        if a <= 0.0 || b <= 0.0 || scale <= 0.0 {
            return Err(DistributionError::InvalidParameters(format!(
                "Beta requires a, b, scale > 0, got a={a}, b={b}, scale={scale}"
            )));
        }
        Ok(Self { a, b, loc, scale })
    }

    pub fn a(&self) -> f64 {
        self.a
    }

    pub fn b(&self) -> f64 {
        self.b
    }

    pub fn loc(&self) -> f64 {
        self.loc
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    /// Mean = loc + scale · a/(a+b).
    pub fn mean(&self) -> f64 {
        self.loc + self.scale * self.a / (self.a + self.b)
    }

    /// Variance = scale² · ab / ((a+b)²(a+b+1)).
    pub fn variance(&self) -> f64 {
        let s = self.a + self.b;
        self.scale * self.scale * self.a * self.b / (s * s * (s + 1.0))
    }

    /// Log-likelihood of standardised data `u ∈ (0, 1)` summarised by
    /// `g1 = mean(ln u)` and `g2 = mean(ln(1−u))`, per observation.
    fn mean_log_likelihood(a: f64, b: f64, g1: f64, g2: f64) -> f64 {
        (a - 1.0) * g1 + (b - 1.0) * g2 - special::ln_beta(a, b)
    }
}

impl Learn for Beta {
    fn learn(&mut self, samples: &[f64]) -> Result<(), DistributionError> {
        let insufficient = |reason: &str| DistributionError::InsufficientData {
            family: "Beta",
            reason: reason.into(),
        };
        if samples.len() < 2 {
            return Err(insufficient("need at least two values"));
        }
        let Some((min, max)) = stats::range(samples) else {
            return Err(insufficient("values must not be NaN"));
        };
        let range = max - min;
        if !(range > 0.0) || !range.is_finite() {
            return Err(insufficient("values have no spread"));
        }

        let loc = min - SUPPORT_MARGIN * range;
        let scale = range * (1.0 + 2.0 * SUPPORT_MARGIN);
        let u: Vec<f64> = samples.iter().map(|x| (x - loc) / scale).collect();
        let n = u.len() as f64;
        let g1 = stats::kahan_sum(u.iter().map(|v| v.ln())) / n;
        let g2 = stats::kahan_sum(u.iter().map(|v| (1.0 - v).ln())) / n;

        // Method-of-moments start.
        let m = stats::kahan_sum(u.iter().copied()) / n;
        let v = stats::population_variance(&u).unwrap_or(0.0);
        let common = if v > 0.0 { m * (1.0 - m) / v - 1.0 } else { 0.0 };
        let (mut a, mut b) = if common > 0.0 {
            (m * common, (1.0 - m) * common)
        } else {
            (1.0, 1.0)
        };

        for _ in 0..NEWTON_MAX_ITER {
            let psi_ab = special::digamma(a + b);
            let f1 = special::digamma(a) - psi_ab - g1;
            let f2 = special::digamma(b) - psi_ab - g2;
            let t_ab = special::trigamma(a + b);
            let j11 = special::trigamma(a) - t_ab;
            let j22 = special::trigamma(b) - t_ab;
            let j12 = -t_ab;
            let det = j11 * j22 - j12 * j12;
            if !det.is_finite() || det.abs() < f64::MIN_POSITIVE {
                break;
            }
            let da = (j22 * f1 - j12 * f2) / det;
            let db = (j11 * f2 - j12 * f1) / det;

            // Step halving keeps both shapes positive and never lowers
            // the likelihood.
            let current = Self::mean_log_likelihood(a, b, g1, g2);
            let mut step = 1.0;
            let (mut next_a, mut next_b) = (a - da, b - db);
            while step > 1e-8
                && (next_a <= 0.0
                    || next_b <= 0.0
                    || Self::mean_log_likelihood(next_a, next_b, g1, g2) < current)
            {
                step /= 2.0;
                next_a = a - step * da;
                next_b = b - step * db;
            }
            if next_a <= 0.0 || next_b <= 0.0 {
                break;
            }
            let converged = ((next_a - a) / a).abs() < NEWTON_TOL
                && ((next_b - b) / b).abs() < NEWTON_TOL;
            a = next_a;
            b = next_b;
            if converged {
                break;
            }
        }

        *self = Self::new(a, b, loc, scale)?;
        Ok(())
    }
}

impl Distribution for Beta {
    type Value = f64;

    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<f64, DistributionError> {
        if !(self.a > 0.0) || !(self.b > 0.0) {
            return Err(DistributionError::InvalidParameters(format!(
                "Beta is not fitted (a={}, b={})",
                self.a, self.b
            )));
        }
        let beta = rand_distr::Beta::new(self.a, self.b)
            .map_err(|e| DistributionError::InvalidParameters(e.to_string()))?;
        Ok(self.loc + self.scale * beta.sample(rng))
    }
}
