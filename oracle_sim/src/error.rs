//! Error types for the experiment harness.

use oracle_core::OracleError;
use thiserror::Error;

/// Errors that can occur while configuring or running experiments.
#[derive(Debug, Error)]
pub enum SimError {
    /// Physics or calibration failure
    #[error("Oracle error: {0}")]
    Oracle(#[from] OracleError),

    /// Reading config or writing exports failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Config or export JSON is malformed
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Experiment settings are out of range
    #[error("Config error: {0}")]
    Config(String),
}

impl SimError {
    /// Creates a config error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, SimError>;
