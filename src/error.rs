//! Error taxonomy for predictive checks.
//!
//! Every variant signals a caller-side contract violation. Nothing here is retried or
//! suppressed internally; errors are surfaced to the caller as soon as they are detected.

use crate::family::Family;
use thiserror::Error;

/// Errors raised while sampling, replicating or evaluating.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CheckError {
    /// A parameter value lies outside its distribution's domain.
    #[error("invalid parameter `{name}` = {value} for {family} family: {reason}")]
    InvalidParameter {
        family: Family,
        name: String,
        value: f64,
        reason: &'static str,
    },

    /// Two shapes that must agree do not.
    #[error("shape mismatch in {what}: expected {expected}, found {found}")]
    ShapeMismatch {
        what: String,
        expected: usize,
        found: usize,
    },

    /// No draws or no observations were supplied.
    #[error("empty batch: {0}")]
    EmptyBatch(&'static str),

    /// A draw index is past the end of the batch.
    #[error("draw index {index} out of range for batch of size {len}")]
    OutOfRange { index: usize, len: usize },

    /// A family needs a field the parameter draw does not carry.
    #[error("parameter draw has no field `{name}`")]
    MissingParameter { name: String },

    /// A statistic has no value (NaN) on one of the datasets, so no rank can be formed.
    #[error("statistic `{statistic}` is undefined on {dataset}")]
    UndefinedStatistic { statistic: String, dataset: String },

    /// A configuration value or prior hyperparameter is unusable.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl CheckError {
    pub(crate) fn shape(what: impl Into<String>, expected: usize, found: usize) -> Self {
        Self::ShapeMismatch {
            what: what.into(),
            expected,
            found,
        }
    }
}

/// Result alias used throughout the crate.
pub type Result<T, E = CheckError> = std::result::Result<T, E>;
