//! Learn-time configuration of the stratified model.
//!
//! # Example
//!
//! ```
//! use u_stratify::config::StratifiedConfig;
//!
//! let config = StratifiedConfig::from_toml_str(
//!     r#"
//!     target_column = "duration"
//!     feature_columns = ["activity", "resource", "amount", "hour"]
//!     onehot_columns = ["activity", "resource"]
//!     standardization_columns = ["amount"]
//!     stratifier = "activity"
//!
//!     [max_error_std]
//!     family = "uniform"
//!     min = 0.05
//!     max = 0.2
//!
//!     [regressor]
//!     seed = 7
//!     "#,
//! ).unwrap();
//! assert_eq!(config.partition().unwrap().rest(), &["hour"]);
//! ```

use serde::{Deserialize, Serialize};

use crate::distributions::NumericDistribution;
use crate::encoding::ColumnPartition;
use crate::error::ModelError;
use crate::regressor::RegressorConfig;

/// Named learn parameters of a
/// [`StratifiedNumericDistribution`](crate::stratified::StratifiedNumericDistribution).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StratifiedConfig {
    /// Column holding the value to model.
    pub target_column: String,
    /// Every column fed to the regressor.
    pub feature_columns: Vec<String>,
    /// Feature columns encoded as one-hot indicators.
    #[serde(default)]
    pub onehot_columns: Vec<String>,
    /// Feature columns standardized to zero mean and unit variance.
    #[serde(default)]
    pub standardization_columns: Vec<String>,
    /// Column whose distinct values define the error strata.
    pub stratifier: String,
    /// Cap policy: a draw from this distribution, times a stratum's mean
    /// target, bounds that stratum's error standard deviation.
    #[serde(default)]
    pub max_error_std: Option<NumericDistribution>,
    #[serde(default)]
    pub regressor: RegressorConfig,
}

impl StratifiedConfig {
    pub fn new(
        target_column: impl Into<String>,
        feature_columns: impl IntoIterator<Item = impl Into<String>>,
        stratifier: impl Into<String>,
    ) -> Self {
        Self {
            target_column: target_column.into(),
            feature_columns: feature_columns.into_iter().map(Into::into).collect(),
            onehot_columns: Vec::new(),
            standardization_columns: Vec::new(),
            stratifier: stratifier.into(),
            max_error_std: None,
            regressor: RegressorConfig::default(),
        }
    }

    pub fn with_onehot(mut self, columns: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.onehot_columns = columns.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_standardization(
        mut self,
        columns: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        self.standardization_columns = columns.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_max_error_std(mut self, cap: impl Into<NumericDistribution>) -> Self {
        self.max_error_std = Some(cap.into());
        self
    }

    pub fn with_regressor(mut self, regressor: RegressorConfig) -> Self {
        self.regressor = regressor;
        self
    }

    /// Parses and validates a TOML document.
    pub fn from_toml_str(s: &str) -> Result<Self, ModelError> {
        let config: Self = toml::from_str(s).map_err(|e| ModelError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Splits the feature columns into standardized, min-max and one-hot
    /// blocks.
    pub fn partition(&self) -> Result<ColumnPartition, ModelError> {
        ColumnPartition::new(
            &self.feature_columns,
            &self.standardization_columns,
            &self.onehot_columns,
        )
    }

    /// Checks the configuration.
    ///
    /// # Errors
    /// Returns [`ModelError::InvalidConfig`] if the target, stratifier or
    /// feature list is empty, the target is also a feature, the column
    /// partition is inconsistent, the cap policy has invalid parameters,
    /// or the regressor hyper-parameters are out of range.
    pub fn validate(&self) -> Result<(), ModelError> {
        if self.target_column.is_empty() {
            return Err(ModelError::InvalidConfig("target_column is empty".into()));
        }
        if self.stratifier.is_empty() {
            return Err(ModelError::InvalidConfig("stratifier is empty".into()));
        }
        if self.feature_columns.is_empty() {
            return Err(ModelError::InvalidConfig("feature_columns is empty".into()));
        }
        if self.feature_columns.contains(&self.target_column) {
            return Err(ModelError::InvalidConfig(format!(
                "target column '{}' is also a feature",
                self.target_column
            )));
        }
        self.partition()?;
        if let Some(cap) = &self.max_error_std {
            cap.check()
                .map_err(|e| ModelError::InvalidConfig(format!("max_error_std: {e}")))?;
        }
        self.regressor.validate()
    }
}
