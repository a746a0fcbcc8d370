//! Error types for linefit-core.

use crate::geometry::SensorId;
use thiserror::Error;

/// Result type alias for linefit operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types for linefit operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// Sensor id not known to the geometry provider.
    #[error("unknown sensor id: {0}")]
    UnknownSensor(SensorId),

    /// Configuration value out of range.
    #[error("configuration error: {0}")]
    Config(String),

    /// Mismatched per-hit input arrays.
    #[error("input length mismatch: {times} times, {heights} heights, {weights} weights")]
    LengthMismatch {
        /// Number of arrival times.
        times: usize,
        /// Number of sensor heights.
        heights: usize,
        /// Number of weights.
        weights: usize,
    },

    /// An operation required at least one hit.
    #[error("no hits to process")]
    NoHits,
}

impl Error {
    /// Shorthand for building a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }
}
