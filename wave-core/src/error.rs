//! # Error Types for the Wave Lattice
//!
//! Unified error handling across the wave crates.
//!
//! The numeric kernel itself never fails: extreme values are absorbed by
//! clamping and gating. Errors only come from malformed buffers, invalid
//! parameters, configuration files and snapshots.

use thiserror::Error;

/// Main error type for wave lattice operations
#[derive(Error, Debug)]
pub enum WaveError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// A buffer does not match the lattice shape
    #[error("Shape mismatch for {what}: expected {expected} values, got {actual}")]
    Shape {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    /// A scalar parameter is outside its allowed range
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Compute backend error
    #[error("Compute error: {0}")]
    Compute(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Result type for wave lattice operations
pub type WaveResult<T> = Result<T, WaveError>;

impl WaveError {
    /// Create a config error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an invalid parameter error
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidParameter(msg.into())
    }

    /// Create a compute error
    pub fn compute(msg: impl Into<String>) -> Self {
        Self::Compute(msg.into())
    }

    /// Create a shape error
    pub fn shape(what: &'static str, expected: usize, actual: usize) -> Self {
        Self::Shape {
            what,
            expected,
            actual,
        }
    }
}

impl From<serde_json::Error> for WaveError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
