//! Error types for the Oracle core.

use thiserror::Error;

/// Errors raised by the physics world and the calibration engine.
#[derive(Debug, Error)]
pub enum OracleError {
    /// Body parameters cannot be simulated (non-positive mass or size)
    #[error("Invalid body: {0}")]
    InvalidBody(String),

    /// A configuration value is out of range
    #[error("Invalid config for {field}: {reason}")]
    InvalidConfig { field: String, reason: String },

    /// Operation needs a tracked body but the world has none
    #[error("No dynamic body in the world")]
    NoBody,

    /// Trajectories of different lengths cannot be compared
    #[error("Trajectory length mismatch: expected {expected}, got {actual}")]
    TrajectoryMismatch { expected: usize, actual: usize },

    /// Sensor noise model rejected its parameters
    #[error("Invalid noise model: {0}")]
    InvalidNoise(String),
}

impl OracleError {
    /// Creates a config error for the given field.
    pub fn config(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, OracleError>;
