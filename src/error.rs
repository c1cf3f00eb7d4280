//! Error types for configuration validation, sampling, and Monte Carlo runs
//!
//! Numeric instability inside a trajectory is never an error: the stepper
//! recovers locally and flags the year as degraded.

use thiserror::Error;

/// Rejected `PolicyConfiguration`. Raised eagerly when a simulator is built.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    #[error("simulation horizon must be between 1 and {max} years (got {value})")]
    InvalidHorizon { value: u32, max: u32 },

    #[error("{field} must be finite (got {value})")]
    NonFinite { field: String, value: f64 },

    #[error("initial GDP must be positive (got {0})")]
    NonPositiveGdp(f64),

    #[error("{field} must be between {min} and {max} (got {value})")]
    OutOfRange {
        field: String,
        min: f64,
        max: f64,
        value: f64,
    },

    #[error("policy must define at least one revenue stream")]
    NoRevenueStreams,

    #[error("{kind} name must not be empty")]
    EmptyName { kind: &'static str },

    #[error("duplicate {kind} name '{name}'")]
    DuplicateName { kind: &'static str, name: String },

    #[error("revenue stream '{stream}' has no destination allocation")]
    MissingDestinations { stream: String },

    #[error("revenue stream '{stream}' destination shares sum to {total:.9}, expected exactly 1")]
    DestinationSum { stream: String, total: f64 },

    #[error("spending category '{category}' funding shares sum to {total:.9}, which exceeds 1")]
    FundingSum { category: String, total: f64 },

    #[error("allocation share {share} in '{owner}' must lie in [0, 1]")]
    InvalidShare { owner: String, share: f64 },

    #[error("'{owner}' references unknown revenue stream '{stream}'")]
    UnknownStream { owner: String, stream: String },

    #[error("revenue stream '{stream}' is based on '{base}', which is not defined before it")]
    ForwardReference { stream: String, base: String },

    #[error("reduction curve for '{category}' is invalid: {reason}")]
    InvalidCurve {
        category: String,
        reason: &'static str,
    },

    #[error("surplus redirect shares sum to {0:.9}, expected exactly 1")]
    RedirectSharesSum(f64),
}

/// Invalid stochastic sampling configuration.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SamplingError {
    #[error("invalid {parameter} distribution: {reason}")]
    InvalidDistribution {
        parameter: String,
        reason: &'static str,
    },

    #[error("cost shock targets unknown spending category '{0}'")]
    UnknownCategory(String),
}

/// Fatal failures of a Monte Carlo run. Never retried internally.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Sampling(#[from] SamplingError),

    #[error("trial count must be positive (got {0})")]
    InvalidTrialCount(usize),

    #[error("monte carlo run cancelled after {completed} trials")]
    Cancelled { completed: usize },
}
