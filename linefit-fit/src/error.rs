//! Error types for linefit-fit.

use thiserror::Error;

/// Result type alias for fit operations.
pub type Result<T> = std::result::Result<T, FitError>;

/// Errors raised while setting up or running a fit.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FitError {
    /// A parameter description cannot be minimized.
    #[error("invalid parameter '{name}': {reason}")]
    InvalidParameter {
        /// Parameter name.
        name: String,
        /// What is wrong with it.
        reason: String,
    },

    /// The score was not finite at the starting point.
    #[error("score is not finite at the starting point ({value})")]
    NonFiniteStart {
        /// Score value.
        value: f64,
    },

    /// The minimizer hit a numerical breakdown.
    #[error("numerical failure: {0}")]
    NumericalFailure(String),

    /// Invalid hit data or configuration.
    #[error(transparent)]
    Core(#[from] linefit_core::Error),
}
