//! Oracle Core - Self-Calibrating Causal Oracle
//!
//! A predictive physics model (the Oracle) starts with a wrong belief about
//! its world and corrects itself by comparing forecasts against a hidden
//! ground truth:
//! 1. **Physics**: a 2D world where an impulse slides a box across a floor
//! 2. **Environment**: ground truth (hidden params, noisy sensor) vs. the Oracle
//! 3. **Calibration**: trial, measure, update, until the error is in tolerance

pub mod error;
pub mod metrics;
pub mod oracle_calibration;
pub mod oracle_env;
pub mod oracle_physics;

// Re-export key types for convenience
pub use error::{OracleError, Result};
pub use metrics::{ConvergenceStats, ErrorMetric};
pub use oracle_calibration::{
    Bisection, CalibrationConfig, CalibrationEngine, CalibrationOutcome, CalibrationReport,
    CalibrationStep, HillClimb, SearchStrategy,
};
pub use oracle_env::{divergence, run_trial, CausalOracle, DivergenceReport, GroundTruth, Observation, Scenario};
pub use oracle_physics::{BodyState, BoxSpec, Floor, Simulator, WorldParams};
