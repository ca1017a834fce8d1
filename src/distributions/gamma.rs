//! Gamma family: the three-parameter MLE variant and the zero-location
//! method-of-moments variant.

use rand::Rng;
use rand_distr::Distribution as _;
use serde::{Deserialize, Serialize};

use super::{Distribution, Learn};
use crate::error::DistributionError;
use crate::{special, stats};

const NEWTON_MAX_ITER: usize = 100;
const NEWTON_TOL: f64 = 1e-10;
const GOLDEN_MAX_ITER: usize = 100;
/// The lower location bound starts at `min − 10·range` and is doubled at
/// most this many times.
const LOC_WIDEN_MAX: usize = 8;

/// Gamma(shape, scale) maximum-likelihood fit for data already shifted
/// to be strictly positive.
///
/// Solves `ln a − ψ(a) = ln x̄ − mean(ln x)` by Newton's method from
/// Minka's closed-form starting point.
///
/// Reference: Minka (2002), "Estimating a Gamma distribution".
///
/// # Returns
/// `(shape, scale, log_likelihood)`, or `None` if any value is ≤ 0 or
/// the data has no spread.
pub(crate) fn fit_shape_scale(data: &[f64]) -> Option<(f64, f64, f64)> {
    if data.is_empty() || data.iter().any(|&x| !(x > 0.0) || !x.is_finite()) {
        return None;
    }
    let n = data.len() as f64;
    let mean = stats::kahan_sum(data.iter().copied()) / n;
    let mean_log = stats::kahan_sum(data.iter().map(|x| x.ln())) / n;
    let s = mean.ln() - mean_log;
    if !(s > 1e-12) {
        return None;
    }

    let mut a = (3.0 - s + ((s - 3.0) * (s - 3.0) + 24.0 * s).sqrt()) / (12.0 * s);
    for _ in 0..NEWTON_MAX_ITER {
        let f = a.ln() - special::digamma(a) - s;
        let df = 1.0 / a - special::trigamma(a);
        let mut next = a - f / df;
        if !(next > 0.0) || !next.is_finite() {
            next = a / 2.0;
        }
        let done = ((next - a) / a).abs() < NEWTON_TOL;
        a = next;
        if done {
            break;
        }
    }

    let scale = mean / a;
    let log_lik = n * ((a - 1.0) * mean_log - a - a * scale.ln() - special::ln_gamma(a));
    Some((a, scale, log_lik))
}

fn sample_gamma<R: Rng + ?Sized>(
    shape: f64,
    scale: f64,
    rng: &mut R,
) -> Result<f64, DistributionError> {
    if !(shape > 0.0) || !(scale > 0.0) {
        return Err(DistributionError::InvalidParameters(format!(
            "Gamma requires shape > 0 and scale > 0, got shape={shape}, scale={scale}"
        )));
    }
    let gamma = rand_distr::Gamma::new(shape, scale)
        .map_err(|e| DistributionError::InvalidParameters(e.to_string()))?;
    Ok(gamma.sample(rng))
}

/// Location maximising `profile` on `(−∞, min)`.
///
/// The bracket `[min − w, min − 10⁻³·range]` starts with `w = 10·range`;
/// `w` doubles while the profile is still no lower at `min − w` than at
/// `min − w/2`. Golden-section search then runs inside the bracket.
fn maximise_loc<F: Fn(f64) -> f64>(profile: F, min: f64, range: f64) -> f64 {
    let mut width = 10.0 * range;
    for _ in 0..LOC_WIDEN_MAX {
        if profile(min - width) < profile(min - width / 2.0) {
            break;
        }
        width *= 2.0;
    }

    let inv_phi = (5.0_f64.sqrt() - 1.0) / 2.0;
    let mut lo = min - width;
    let mut hi = min - 1e-3 * range;
    let mut c = hi - inv_phi * (hi - lo);
    let mut d = lo + inv_phi * (hi - lo);
    let mut fc = profile(c);
    let mut fd = profile(d);
    for _ in 0..GOLDEN_MAX_ITER {
        if (hi - lo).abs() < 1e-9 * range {
            break;
        }
        if fc > fd {
            hi = d;
            d = c;
            fd = fc;
            c = hi - inv_phi * (hi - lo);
            fc = profile(c);
        } else {
            lo = c;
            c = d;
            fc = fd;
            d = lo + inv_phi * (hi - lo);
            fd = profile(d);
        }
    }
    (lo + hi) / 2.0
}

// ============================================================================
// Gamma (shape, loc, scale)
// ============================================================================

/// Three-parameter gamma distribution: `loc + Gamma(shape, scale)`.
///
/// `learn` maximises the likelihood over all three parameters. For a
/// fixed location the shape/scale MLE is solved by Newton's method; the
/// location is found by golden-section search of that profile likelihood
/// below the sample minimum, on a bracket that widens while the likelihood
/// keeps rising toward its lower end.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Gamma {
    shape: f64,
    loc: f64,
    scale: f64,
}

impl Gamma {
    /// Creates a gamma distribution with explicit parameters.
    ///
    /// # Errors
    /// Returns `Err` if `shape ≤ 0`, `scale ≤ 0` or any parameter is not finite.
    pub fn new(shape: f64, loc: f64, scale: f64) -> Result<Self, DistributionError> {
        if !shape.is_finite() || !loc.is_finite() || !scale.is_finite() {
            return Err(DistributionError::InvalidParameters(
                "Gamma parameters must be finite".into(),
            ));
        }
        if shape <= 0.0 || scale <= 0.0 {
            return Err(DistributionError::InvalidParameters(format!(
                "Gamma requires shape > 0 and scale > 0, got shape={shape}, scale={scale}"
            )));
        }
        Ok(Self { shape, loc, scale })
    }

    pub fn shape(&self) -> f64 {
        self.shape
    }

    pub fn loc(&self) -> f64 {
        self.loc
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    /// Mean = loc + shape·scale.
    pub fn mean(&self) -> f64 {
        self.loc + self.shape * self.scale
    }

    /// Variance = shape·scale².
    pub fn variance(&self) -> f64 {
        self.shape * self.scale * self.scale
    }
}

impl Learn for Gamma {
    fn learn(&mut self, samples: &[f64]) -> Result<(), DistributionError> {
        let insufficient = |reason: &str| DistributionError::InsufficientData {
            family: "Gamma",
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

        let profile = |loc: f64| -> f64 {
            let shifted: Vec<f64> = samples.iter().map(|x| x - loc).collect();
            fit_shape_scale(&shifted).map_or(f64::NEG_INFINITY, |(_, _, ll)| ll)
        };

        let loc = maximise_loc(profile, min, range);

        let shifted: Vec<f64> = samples.iter().map(|x| x - loc).collect();
        let (shape, scale, _) =
            fit_shape_scale(&shifted).ok_or_else(|| insufficient("likelihood did not converge"))?;
        *self = Self::new(shape, loc, scale)?;
        Ok(())
    }
}

impl Distribution for Gamma {
    type Value = f64;

    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<f64, DistributionError> {
        Ok(self.loc + sample_gamma(self.shape, self.scale, rng)?)
    }
}

// ============================================================================
// GammaPo (method of moments, loc = 0)
// ============================================================================

/// Gamma distribution fitted by the method of moments with the location
/// fixed at zero, for data known to start at zero.
///
/// - shape = x̄² / s²
/// - scale = s² / x̄
///
/// where s² is the population variance.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GammaPo {
    shape: f64,
    scale: f64,
}

impl GammaPo {
    /// Creates a zero-location gamma distribution with explicit parameters.
    ///
    /// # Errors
    /// Returns `Err` if `shape ≤ 0`, `scale ≤ 0` or either is not finite.
    pub fn new(shape: f64, scale: f64) -> Result<Self, DistributionError> {
        Gamma::new(shape, 0.0, scale)?;
        Ok(Self { shape, scale })
    }

    pub fn shape(&self) -> f64 {
        self.shape
    }

    /// Always 0.
    pub fn loc(&self) -> f64 {
        0.0
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn mean(&self) -> f64 {
        self.shape * self.scale
    }

    pub fn variance(&self) -> f64 {
        self.shape * self.scale * self.scale
    }
}

impl Learn for GammaPo {
    fn learn(&mut self, samples: &[f64]) -> Result<(), DistributionError> {
        let (Some(mean), Some(var)) = (stats::mean(samples), stats::population_variance(samples))
        else {
            return Err(DistributionError::InsufficientData {
                family: "GammaPo",
                reason: "need at least one finite value".into(),
            });
        };
        if !(mean > 0.0) || !(var > 0.0) {
            return Err(DistributionError::InsufficientData {
                family: "GammaPo",
                reason: format!("need positive mean and variance, got mean={mean}, var={var}"),
            });
        }
        *self = Self::new(mean * mean / var, var / mean)?;
        Ok(())
    }
}

impl Distribution for GammaPo {
    type Value = f64;

    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<f64, DistributionError> {
        sample_gamma(self.shape, self.scale, rng)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random::create_rng;

    fn gamma_draws(shape: f64, loc: f64, scale: f64, n: usize, seed: u64) -> Vec<f64> {
        let g = Gamma::new(shape, loc, scale).unwrap();
        let mut rng = create_rng(seed);
        (0..n).map(|_| g.sample(&mut rng).unwrap()).collect()
    }

    #[test]
    fn test_fit_shape_scale_recovers_parameters() {
        let data = gamma_draws(3.0, 0.0, 2.0, 20_000, 42);
        let (shape, scale, _) = fit_shape_scale(&data).unwrap();
        assert!((shape - 3.0).abs() < 0.15, "shape {shape}");
        assert!((scale - 2.0).abs() < 0.1, "scale {scale}");
    }

    #[test]
    fn test_fit_shape_scale_rejects_degenerate() {
        assert!(fit_shape_scale(&[]).is_none());
        assert!(fit_shape_scale(&[1.0, 0.0, 2.0]).is_none());
        assert!(fit_shape_scale(&[2.0, 2.0, 2.0]).is_none());
    }

    #[test]
    fn test_gamma_learn_matches_moments() {
        let data = gamma_draws(4.0, 10.0, 1.5, 5_000, 7);
        let mut g = Gamma::default();
        g.learn(&data).unwrap();
        let m = stats::mean(&data).unwrap();
        let v = stats::population_variance(&data).unwrap();
        assert!(g.loc() < stats::range(&data).unwrap().0);
        assert!((g.shape() - 4.0).abs() < 1.0, "shape {}", g.shape());
        assert!((g.loc() - 10.0).abs() < 0.75, "loc {}", g.loc());
        assert!((g.scale() - 1.5).abs() < 0.3, "scale {}", g.scale());
        assert!((g.mean() - m).abs() / m < 0.01, "mean {} vs {m}", g.mean());
        assert!((g.variance() - v).abs() / v < 0.1, "var {} vs {v}", g.variance());
    }

    #[test]
    fn test_loc_bracket_widens_past_ten_ranges() {
        // peak 40 ranges below the minimum
        let (min, range) = (100.0, 2.0);
        let peak = min - 40.0 * range;
        let loc = maximise_loc(|x| -(x - peak) * (x - peak), min, range);
        assert!((loc - peak).abs() < 1e-6, "loc {loc}");

        // a peak inside the initial bracket is not disturbed
        let near = min - 3.0 * range;
        let loc = maximise_loc(|x| -(x - near).abs(), min, range);
        assert!((loc - near).abs() < 1e-6, "loc {loc}");
    }

    #[test]
    fn test_loc_bracket_widening_is_bounded() {
        // likelihood rising forever: stops at the widest bracket
        let loc = maximise_loc(|x| -x, 0.0, 1.0);
        let widest = -10.0 * 2.0_f64.powi(LOC_WIDEN_MAX as i32);
        assert!((loc - widest).abs() < 1e-6, "loc {loc}");
    }

    #[test]
    fn test_gamma_learn_insufficient() {
        let mut g = Gamma::default();
        assert!(g.learn(&[1.0]).is_err());
        assert!(g.learn(&[2.0, 2.0, 2.0]).is_err());
    }

    #[test]
    fn test_gamma_unfitted_sample_fails() {
        let mut rng = create_rng(0);
        assert!(Gamma::default().sample(&mut rng).is_err());
        assert!(GammaPo::default().sample(&mut rng).is_err());
    }

    #[test]
    fn test_gamma_po_method_of_moments() {
        // mean 5, population variance 4 → shape 6.25, scale 0.8
        let data = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        let mut g = GammaPo::default();
        g.learn(&data).unwrap();
        assert!((g.shape() - 6.25).abs() < 1e-10);
        assert!((g.scale() - 0.8).abs() < 1e-10);
        assert_eq!(g.loc(), 0.0);
        assert!((g.mean() - 5.0).abs() < 1e-10);
    }

    #[test]
    fn test_gamma_po_rejects_non_positive_mean() {
        let mut g = GammaPo::default();
        assert!(g.learn(&[-1.0, -2.0, -3.0]).is_err());
        assert!(g.learn(&[3.0, 3.0]).is_err());
    }

    #[test]
    fn test_gamma_po_samples_positive() {
        let g = GammaPo::new(0.5, 3.0).unwrap();
        let mut rng = create_rng(3);
        for _ in 0..1000 {
            assert!(g.sample(&mut rng).unwrap() >= 0.0);
        }
    }
}
