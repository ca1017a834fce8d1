//! Error types.
//!
//! [`DistributionError`] covers the primitive distribution family;
//! [`ModelError`] covers encoding, regression and the stratified model,
//! and wraps distribution errors via `From`.

/// Errors raised by primitive distributions.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DistributionError {
    /// Parameters violate distribution constraints.
    #[error("invalid distribution parameters: {0}")]
    InvalidParameters(String),

    /// `learn` was given a sample set it cannot fit.
    #[error("cannot fit {family}: {reason}")]
    InsufficientData {
        family: &'static str,
        reason: String,
    },
}

/// Errors raised while learning or sampling the stratified model.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ModelError {
    #[error(transparent)]
    Distribution(#[from] DistributionError),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("failed to parse configuration: {0}")]
    ConfigParse(String),

    #[error("column '{0}' not found")]
    MissingColumn(String),

    #[error("column '{column}' has {actual} rows, expected {expected}")]
    RaggedColumn {
        column: String,
        expected: usize,
        actual: usize,
    },

    #[error("column '{column}' requires numeric values, got '{value}'")]
    NonNumeric { column: String, value: String },

    #[error("column '{column}' contains non-finite value {value}")]
    NonFinite { column: String, value: f64 },

    #[error("category '{value}' of column '{column}' was not seen during learning")]
    UnknownCategory { column: String, value: String },

    #[error("stratum '{0}' was not seen during learning")]
    UnseenStratum(String),

    #[error("training data is empty")]
    EmptyData,

    #[error("encoded feature space has zero columns")]
    EmptyFeatureSpace,

    #[error("encoded input has {actual} columns, expected {expected}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("model has not been learned")]
    NotFitted,
}
