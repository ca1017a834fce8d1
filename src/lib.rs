//! # u-stratify
//!
//! Stratified numeric distributions for process simulation.
//!
//! This crate learns a conditional distribution of a positive numeric target
//! (typically an activity duration) from a mixed-type feature table, and
//! samples from it one record at a time. It knows nothing about event logs,
//! mining, or simulation engines.
//!
//! ## Layers
//!
//! 1. [`distributions`]: primitive one-dimensional families (Categorical,
//!    Uniform, Gamma, GammaPo, Erlang, Normal, Beta), learnable from raw
//!    samples and sample-able with an external RNG
//! 2. [`encoding`]: standardize / min-max / one-hot feature pipeline
//! 3. [`regressor`]: fixed-recipe MLP expectation regressor
//! 4. [`stratified`]: regressor plus per-stratum Normal error model
//!
//! Supporting modules: [`config`], [`table`], [`error`], [`stats`],
//! [`special`], [`random`].
//!
//! ## Design Philosophy
//!
//! - **Explicit randomness**: every `learn`/`sample` takes a caller-owned
//!   `Rng`, so seeded runs are reproducible
//! - **Numerical stability first**: Welford's algorithm for variance,
//!   Kahan summation for accumulation
//! - **Serializable state**: every fitted object round-trips through serde
//! - **Property-based testing**: invariants verified via proptest

pub mod config;
pub mod distributions;
pub mod encoding;
pub mod error;
pub mod random;
pub mod regressor;
pub mod special;
pub mod stats;
pub mod stratified;
pub mod table;

pub use config::StratifiedConfig;
pub use error::{DistributionError, ModelError};
pub use stratified::{StratifiedNumericDistribution, StratumError};
pub use table::{Record, Table, Value};
