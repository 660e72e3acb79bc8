//! Oracle Simulation Harness
//!
//! Runs the self-calibration experiment end to end: a ground-truth world
//! with a hidden friction, a Causal Oracle that starts out wrong, and a
//! calibration loop that closes the gap.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      ScenarioRunner                         │
//! │  ┌──────────────────────────────────────────────────────┐   │
//! │  │ SimContext (master seed → noise / search streams)    │   │
//! │  └──────────────────────────────────────────────────────┘   │
//! │       │                                  │                  │
//! │  ┌────▼─────────┐   observation   ┌──────▼──────────────┐   │
//! │  │ GroundTruth  │────────────────►│ CalibrationEngine   │   │
//! │  │ (hidden μ)   │                 │ trial → error → μ'  │   │
//! │  └──────────────┘                 └──────┬──────────────┘   │
//! │                                          │                  │
//! │                                   ┌──────▼──────┐           │
//! │                                   │ CausalOracle│           │
//! │                                   └─────────────┘           │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use oracle_sim::{ExperimentConfig, ScenarioRunner};
//! use oracle_sim::scenarios::ScenarioId;
//!
//! let runner = ScenarioRunner::new(ExperimentConfig::default())?;
//! let result = runner.run(ScenarioId::Bisection)?;
//! assert!(result.passed);
//! ```

pub mod cli;
mod config;
mod context;
mod error;
mod exporter;
mod runner;
pub mod scenarios;

pub use config::ExperimentConfig;
pub use context::SimContext;
pub use error::{Result, SimError};
pub use exporter::CalibrationExport;
pub use runner::{ScenarioResult, ScenarioRunner};
