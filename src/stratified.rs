//! Stratified numeric distribution.
//!
//! A conditional distribution of a positive numeric target given a feature
//! record. The expected value comes from an [`MlpRegressor`] over encoded
//! features; the spread comes from Normal residual distributions fitted per
//! stratum, where a stratum is one distinct value of the stratifier column.
//!
//! # Learning
//!
//! 1. Fit the [`FeaturePipeline`] and encode the training table.
//! 2. Fit the regressor; record the mean target as a fallback.
//! 3. Fit the overall error distribution on all residuals
//!    (actual − predicted).
//! 4. Per stratum, in order of first appearance:
//!    - more than 50 residuals: fit a dedicated [`Normal`]
//!    - otherwise: share the overall distribution
//!    - with a cap policy: draw `c`, and if the stratum's σ exceeds
//!      `c · mean(actual target)`, replace it with `N(0, c · mean)`.
//!      This also applies to strata sharing the overall distribution.
//!
//! # Sampling
//!
//! The point prediction is replaced by the training mean when it is not
//! positive. A residual is then drawn from the record's stratum and
//! redrawn until `prediction + residual > 0`, for at most 10 attempts.
//! If every attempt fails, the bare prediction is returned. A sample is
//! therefore always positive when the training mean is.
//!
//! # Example
//!
//! ```
//! use u_stratify::config::StratifiedConfig;
//! use u_stratify::distributions::Uniform;
//! use u_stratify::random::create_rng;
//! use u_stratify::regressor::RegressorConfig;
//! use u_stratify::stratified::StratifiedNumericDistribution;
//! use u_stratify::table::Table;
//!
//! let n = 120;
//! let table = Table::new()
//!     .with_column("activity", (0..n).map(|i| if i % 2 == 0 { "review" } else { "approve" }))?
//!     .with_column("amount", (0..n).map(|i| (i % 10) as f64))?
//!     .with_column("duration", (0..n).map(|i| 5.0 + (i % 10) as f64 + (i % 3) as f64))?;
//!
//! let config = StratifiedConfig::new("duration", ["activity", "amount"], "activity")
//!     .with_onehot(["activity"])
//!     .with_max_error_std(Uniform::new(0.05, 0.2)?)
//!     .with_regressor(RegressorConfig::default().with_seed(1).with_max_iter(20));
//!
//! let mut rng = create_rng(42);
//! let mut model = StratifiedNumericDistribution::new();
//! model.learn(&table, config, &mut rng)?;
//!
//! let record = table.record(0).ok_or(u_stratify::ModelError::EmptyData)?;
//! assert!(model.sample(&record, &mut rng)? > 0.0);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use std::collections::{BTreeMap, HashMap};

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace};

use crate::config::StratifiedConfig;
use crate::distributions::{Distribution, Learn, Normal};
use crate::encoding::FeaturePipeline;
use crate::error::ModelError;
use crate::regressor::MlpRegressor;
use crate::stats;
use crate::table::{Record, Table};

/// A stratum gets its own error fit only above this many residuals.
const MIN_STRATUM_SIZE: usize = 50;

/// Residual draws per sample before falling back to the bare prediction.
const MAX_ATTEMPTS: usize = 10;

/// Error distribution assigned to one stratum.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum StratumError {
    /// Normal fitted on the stratum's own residuals.
    Fitted(Normal),
    /// Too few residuals; the overall error distribution is used.
    Shared,
    /// Zero-mean Normal whose σ was limited by the cap policy.
    Capped(Normal),
}

impl StratumError {
    /// The concrete distribution, resolving [`StratumError::Shared`] to
    /// `overall`.
    pub fn resolve<'a>(&'a self, overall: &'a Normal) -> &'a Normal {
        match self {
            Self::Fitted(d) | Self::Capped(d) => d,
            Self::Shared => overall,
        }
    }

    fn label(&self) -> &'static str {
        match self {
            Self::Fitted(_) => "fitted",
            Self::Shared => "shared",
            Self::Capped(_) => "capped",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct FittedModel {
    config: StratifiedConfig,
    pipeline: FeaturePipeline,
    regressor: MlpRegressor,
    overall_mean: f64,
    overall_error: Normal,
    strata: BTreeMap<String, StratumError>,
}

/// Regressor-plus-stratified-error model of a positive numeric target.
///
/// Unfitted after [`new`](Self::new); every query returns
/// [`ModelError::NotFitted`] (or `None`) until [`learn`](Self::learn)
/// succeeds. A failed `learn` leaves the previous state untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StratifiedNumericDistribution {
    fitted: Option<FittedModel>,
}

/// Residuals and actual targets of one stratum.
struct StratumRows {
    key: String,
    residuals: Vec<f64>,
    actuals: Vec<f64>,
}

/// Groups rows by stratum key, preserving first-appearance order.
fn group_by_stratum(keys: Vec<String>, residuals: &[f64], actuals: &[f64]) -> Vec<StratumRows> {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut groups: Vec<StratumRows> = Vec::new();
    for (i, key) in keys.into_iter().enumerate() {
        let slot = match index.get(&key) {
            Some(&slot) => slot,
            None => {
                index.insert(key.clone(), groups.len());
                groups.push(StratumRows {
                    key,
                    residuals: Vec::new(),
                    actuals: Vec::new(),
                });
                groups.len() - 1
            }
        };
        groups[slot].residuals.push(residuals[i]);
        groups[slot].actuals.push(actuals[i]);
    }
    groups
}

impl StratifiedNumericDistribution {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_fitted(&self) -> bool {
        self.fitted.is_some()
    }

    /// Fits the pipeline, the regressor and the per-stratum errors on
    /// `data`.
    ///
    /// `rng` drives the regressor seed (when the configuration has none)
    /// and the cap-policy draws.
    ///
    /// # Errors
    /// - [`ModelError::InvalidConfig`] if `config` fails validation
    /// - [`ModelError::EmptyData`] if `data` has no rows
    /// - [`ModelError::MissingColumn`] if a configured column is absent
    /// - [`ModelError::NonNumeric`] / [`ModelError::NonFinite`] for bad
    ///   numeric cells
    /// - [`ModelError::EmptyFeatureSpace`] if the encoding has no columns
    pub fn learn<R: Rng + ?Sized>(
        &mut self,
        data: &Table,
        config: StratifiedConfig,
        rng: &mut R,
    ) -> Result<(), ModelError> {
        config.validate()?;
        if data.is_empty() {
            return Err(ModelError::EmptyData);
        }
        let targets = data.numeric_column(&config.target_column)?;
        let keys = data.category_column(&config.stratifier)?;

        let pipeline = FeaturePipeline::fit(data, &config.partition()?)?;
        if pipeline.width() == 0 {
            return Err(ModelError::EmptyFeatureSpace);
        }
        let x = pipeline.transform(data)?;

        let mut regressor = MlpRegressor::new(config.regressor.clone());
        regressor.fit(&x, &targets, rng)?;
        let predictions = regressor.predict(&x)?;
        let residuals: Vec<f64> = targets
            .iter()
            .zip(predictions.iter())
            .map(|(actual, predicted)| actual - predicted)
            .collect();

        let overall_mean = stats::mean(&targets).ok_or(ModelError::EmptyData)?;
        let mut overall_error = Normal::default();
        overall_error.learn(&residuals)?;

        let mut strata = BTreeMap::new();
        let mut capped = 0;
        for group in group_by_stratum(keys, &residuals, &targets) {
            let mut error = if group.residuals.len() > MIN_STRATUM_SIZE {
                let mut own = Normal::default();
                own.learn(&group.residuals)?;
                StratumError::Fitted(own)
            } else {
                StratumError::Shared
            };

            if let Some(cap) = &config.max_error_std {
                let factor = cap.sample(rng)?;
                let mean_actual = stats::mean(&group.actuals).unwrap_or(overall_mean);
                let limit = (factor * mean_actual).max(0.0);
                let sigma = error.resolve(&overall_error).std_dev();
                if sigma > limit {
                    debug!(stratum = %group.key, sigma, limit, "capping stratum error");
                    error = StratumError::Capped(Normal::new(0.0, limit)?);
                    capped += 1;
                }
            }

            debug!(
                stratum = %group.key,
                rows = group.residuals.len(),
                source = error.label(),
                "stratum error assigned"
            );
            strata.insert(group.key, error);
        }

        info!(
            rows = data.len(),
            encoded_dim = pipeline.width(),
            strata = strata.len(),
            capped,
            overall_mean,
            overall_sigma = overall_error.std_dev(),
            "learned stratified distribution"
        );

        self.fitted = Some(FittedModel {
            config,
            pipeline,
            regressor,
            overall_mean,
            overall_error,
            strata,
        });
        Ok(())
    }

    fn model(&self) -> Result<&FittedModel, ModelError> {
        self.fitted.as_ref().ok_or(ModelError::NotFitted)
    }

    /// Point prediction for `record`, replaced by the training mean when
    /// it is not positive.
    pub fn predict(&self, record: &Record) -> Result<f64, ModelError> {
        let model = self.model()?;
        let x = model.pipeline.transform_record(record)?;
        let prediction = model
            .regressor
            .predict(&x)?
            .get(0)
            .copied()
            .ok_or(ModelError::NotFitted)?;
        if prediction > 0.0 {
            Ok(prediction)
        } else {
            Ok(model.overall_mean)
        }
    }

    /// Draws one value for `record`.
    ///
    /// The record must carry every feature column and the stratifier.
    ///
    /// # Errors
    /// - [`ModelError::NotFitted`] before `learn`
    /// - [`ModelError::MissingColumn`] if a required column is absent
    /// - [`ModelError::UnseenStratum`] if the stratifier value was not
    ///   present in the training data
    /// - [`ModelError::UnknownCategory`] for an unseen one-hot category
    pub fn sample<R: Rng + ?Sized>(&self, record: &Record, rng: &mut R) -> Result<f64, ModelError> {
        let model = self.model()?;
        let stratifier = &model.config.stratifier;
        let key = record
            .get(stratifier)
            .ok_or_else(|| ModelError::MissingColumn(stratifier.clone()))?
            .category();
        let error = model
            .strata
            .get(&key)
            .ok_or_else(|| ModelError::UnseenStratum(key.clone()))?
            .resolve(&model.overall_error);

        let prediction = self.predict(record)?;
        for _ in 0..MAX_ATTEMPTS {
            let value = prediction + error.sample(rng)?;
            if value > 0.0 {
                return Ok(value);
            }
        }
        trace!(stratum = %key, prediction, "residual retries exhausted");
        Ok(prediction)
    }

    /// Mean of the training target.
    pub fn overall_mean(&self) -> Option<f64> {
        self.fitted.as_ref().map(|m| m.overall_mean)
    }

    /// Error distribution fitted on all residuals.
    pub fn overall_error(&self) -> Option<&Normal> {
        self.fitted.as_ref().map(|m| &m.overall_error)
    }

    pub fn stratum(&self, key: &str) -> Option<&StratumError> {
        self.fitted.as_ref()?.strata.get(key)
    }

    /// The concrete error distribution sampled for stratum `key`.
    pub fn error_distribution(&self, key: &str) -> Option<&Normal> {
        let model = self.fitted.as_ref()?;
        model
            .strata
            .get(key)
            .map(|e| e.resolve(&model.overall_error))
    }

    /// Strata in key order.
    pub fn strata(&self) -> impl Iterator<Item = (&str, &StratumError)> {
        self.fitted
            .iter()
            .flat_map(|m| m.strata.iter().map(|(k, e)| (k.as_str(), e)))
    }

    pub fn encoded_dim(&self) -> Option<usize> {
        self.fitted.as_ref().map(|m| m.pipeline.width())
    }

    pub fn pipeline(&self) -> Option<&FeaturePipeline> {
        self.fitted.as_ref().map(|m| &m.pipeline)
    }

    pub fn regressor(&self) -> Option<&MlpRegressor> {
        self.fitted.as_ref().map(|m| &m.regressor)
    }

    pub fn config(&self) -> Option<&StratifiedConfig> {
        self.fitted.as_ref().map(|m| &m.config)
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use crate::random::create_rng;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(16))]

        #[test]
        fn strata_follow_size_rule(sizes in proptest::collection::vec(1_usize..90, 1..4), seed in 0_u64..1000) {
            let mut activity = Vec::new();
            let mut amount = Vec::new();
            let mut duration = Vec::new();
            for (g, &n) in sizes.iter().enumerate() {
                for i in 0..n {
                    activity.push(format!("s{g}"));
                    amount.push(i as f64);
                    duration.push(5.0 + g as f64 + (i % 7) as f64);
                }
            }
            let table = Table::new()
                .with_column("activity", activity).unwrap()
                .with_column("amount", amount).unwrap()
                .with_column("duration", duration).unwrap();
            let cfg = StratifiedConfig::new("duration", ["amount"], "activity")
                .with_regressor(crate::regressor::RegressorConfig::default().with_seed(seed).with_max_iter(5));
            let mut model = StratifiedNumericDistribution::new();
            model.learn(&table, cfg, &mut create_rng(seed)).unwrap();
            for (g, &n) in sizes.iter().enumerate() {
                let own = matches!(model.stratum(&format!("s{g}")), Some(StratumError::Fitted(_)));
                prop_assert_eq!(own, n > 50);
            }
        }
    }
}
