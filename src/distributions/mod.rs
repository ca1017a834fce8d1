//! Primitive probability distributions.
//!
//! A closed family of one-dimensional distributions, each learnable from a
//! raw sample set and sample-able with an external random source.
//!
//! # Supported Distributions
//!
//! | Distribution | Parameters | `learn` method |
//! |---|---|---|
//! | [`Categorical`] | values, weights | observed counts |
//! | [`Uniform`] | min, max | sample min / max |
//! | [`Gamma`] | shape, loc, scale | profile-likelihood MLE |
//! | [`GammaPo`] | shape, scale (loc = 0) | method of moments |
//! | [`Erlang`] | integer shape, scale | gamma MLE, rounded shape |
//! | [`Normal`] | μ, σ | MLE (population σ) |
//! | [`Beta`] | a, b, loc, scale | range support + Newton MLE |
//!
//! # Lifecycle
//!
//! Every family can be constructed empty (`Default`, zero parameters) or
//! with explicit parameters via `new`. [`Learn::learn`] overwrites the
//! parameters; [`Distribution::sample`] is a pure function of the current
//! parameters plus the supplied RNG. Sampling an empty instance of a
//! family whose zero parameters are invalid returns an error.

mod beta;
mod categorical;
mod erlang;
mod gamma;
mod normal;
mod uniform;

pub use beta::Beta;
pub use categorical::Categorical;
pub use erlang::Erlang;
pub use gamma::{Gamma, GammaPo};
pub use normal::Normal;
pub use uniform::Uniform;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::DistributionError;

/// A distribution that can produce independent draws.
pub trait Distribution {
    type Value;

    /// Draws one value using the current parameters.
    ///
    /// # Errors
    /// Returns `Err` if the current parameters do not define a valid
    /// distribution (typically an unfitted instance).
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<Self::Value, DistributionError>;
}

/// A distribution whose parameters can be fitted from numeric samples.
pub trait Learn {
    /// Overwrites the parameters with the canonical fit for `samples`.
    ///
    /// Callers must guard the minimum sample size; a sample set that
    /// cannot be fitted at all returns `Err`, while a technically
    /// fittable but tiny set may yield degenerate parameters.
    fn learn(&mut self, samples: &[f64]) -> Result<(), DistributionError>;
}

/// Tag naming a distribution family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistributionKind {
    Categorical,
    Uniform,
    Gamma,
    GammaPo,
    Erlang,
    Normal,
    Beta,
}

/// Closed union of the numeric (f64-valued) families.
///
/// This is the form in which distributions travel through configuration,
/// e.g. the error-cap policy of the stratified model:
///
/// ```
/// use u_stratify::distributions::NumericDistribution;
///
/// let cap: NumericDistribution = toml::from_str(
///     r#"
///     family = "uniform"
///     min = 0.05
///     max = 0.2
///     "#,
/// ).unwrap();
/// assert!(cap.check().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "family", rename_all = "snake_case")]
pub enum NumericDistribution {
    Uniform(Uniform),
    Gamma(Gamma),
    GammaPo(GammaPo),
    Erlang(Erlang),
    Normal(Normal),
    Beta(Beta),
}

impl NumericDistribution {
    /// Returns an empty instance of the given family, or `None` for
    /// [`DistributionKind::Categorical`], which is not numeric.
    pub fn unfitted(kind: DistributionKind) -> Option<Self> {
        match kind {
            DistributionKind::Categorical => None,
            DistributionKind::Uniform => Some(Self::Uniform(Uniform::default())),
            DistributionKind::Gamma => Some(Self::Gamma(Gamma::default())),
            DistributionKind::GammaPo => Some(Self::GammaPo(GammaPo::default())),
            DistributionKind::Erlang => Some(Self::Erlang(Erlang::default())),
            DistributionKind::Normal => Some(Self::Normal(Normal::default())),
            DistributionKind::Beta => Some(Self::Beta(Beta::default())),
        }
    }

    pub fn kind(&self) -> DistributionKind {
        match self {
            Self::Uniform(_) => DistributionKind::Uniform,
            Self::Gamma(_) => DistributionKind::Gamma,
            Self::GammaPo(_) => DistributionKind::GammaPo,
            Self::Erlang(_) => DistributionKind::Erlang,
            Self::Normal(_) => DistributionKind::Normal,
            Self::Beta(_) => DistributionKind::Beta,
        }
    }

    /// Validates the current parameters as if they were passed to `new`.
    ///
    /// Deserialized values bypass the constructors, so configuration code
    /// calls this before sampling.
    pub fn check(&self) -> Result<(), DistributionError> {
        match self {
            Self::Uniform(d) => Uniform::new(d.min(), d.max()).map(drop),
            Self::Gamma(d) => Gamma::new(d.shape(), d.loc(), d.scale()).map(drop),
            Self::GammaPo(d) => GammaPo::new(d.shape(), d.scale()).map(drop),
            Self::Erlang(d) => Erlang::new(d.shape(), d.scale()).map(drop),
            Self::Normal(d) => Normal::new(d.mu(), d.sigma()).map(drop),
            Self::Beta(d) => Beta::new(d.a(), d.b(), d.loc(), d.scale()).map(drop),
        }
    }
}

impl Learn for NumericDistribution {
    fn learn(&mut self, samples: &[f64]) -> Result<(), DistributionError> {
        match self {
            Self::Uniform(d) => d.learn(samples),
            Self::Gamma(d) => d.learn(samples),
            Self::GammaPo(d) => d.learn(samples),
            Self::Erlang(d) => d.learn(samples),
            Self::Normal(d) => d.learn(samples),
            Self::Beta(d) => d.learn(samples),
        }
    }
}

impl Distribution for NumericDistribution {
    type Value = f64;

    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<f64, DistributionError> {
        match self {
            Self::Uniform(d) => d.sample(rng),
            Self::Gamma(d) => d.sample(rng),
            Self::GammaPo(d) => d.sample(rng),
            Self::Erlang(d) => d.sample(rng),
            Self::Normal(d) => d.sample(rng),
            Self::Beta(d) => d.sample(rng),
        }
    }
}

impl From<Uniform> for NumericDistribution {
    fn from(d: Uniform) -> Self {
        Self::Uniform(d)
    }
}

impl From<Normal> for NumericDistribution {
    fn from(d: Normal) -> Self {
        Self::Normal(d)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random::create_rng;

    const KINDS: [DistributionKind; 7] = [
        DistributionKind::Categorical,
        DistributionKind::Uniform,
        DistributionKind::Gamma,
        DistributionKind::GammaPo,
        DistributionKind::Erlang,
        DistributionKind::Normal,
        DistributionKind::Beta,
    ];

    #[test]
    fn test_unfitted_kind_roundtrip() {
        for kind in KINDS {
            match NumericDistribution::unfitted(kind) {
                Some(d) => assert_eq!(d.kind(), kind),
                None => assert_eq!(kind, DistributionKind::Categorical),
            }
        }
    }

    #[test]
    fn test_every_numeric_family_learns_and_samples() {
        let truth = GammaPo::new(3.0, 2.0).unwrap();
        let mut rng = create_rng(21);
        let data: Vec<f64> = (0..2_000).map(|_| truth.sample(&mut rng).unwrap()).collect();
        for kind in KINDS {
            let Some(mut d) = NumericDistribution::unfitted(kind) else {
                continue;
            };
            d.learn(&data).unwrap();
            d.check().unwrap();
            let x = d.sample(&mut rng).unwrap();
            assert!(x.is_finite(), "{kind:?} produced {x}");
        }
    }

    #[test]
    fn test_check_rejects_deserialized_garbage() {
        let bad: NumericDistribution =
            toml::from_str("family = \"uniform\"\nmin = 2.0\nmax = 1.0\n").unwrap();
        assert!(bad.check().is_err());
        let unfitted = NumericDistribution::unfitted(DistributionKind::Gamma).unwrap();
        assert!(unfitted.check().is_err());
    }

    #[test]
    fn test_from_conversions() {
        let u: NumericDistribution = Uniform::new(0.05, 0.2).unwrap().into();
        assert_eq!(u.kind(), DistributionKind::Uniform);
        let n: NumericDistribution = Normal::new(0.0, 1.0).unwrap().into();
        assert_eq!(n.kind(), DistributionKind::Normal);
    }
}
