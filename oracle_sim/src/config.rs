//! Experiment configuration.
//!
//! Defaults reproduce the reference experiment: a box kicked with a
//! 10000-unit impulse, 150 steps at 60 Hz, hidden friction 0.9, and an
//! Oracle that starts out believing 0.2.

use crate::error::{Result, SimError};
use oracle_core::{CalibrationConfig, Scenario};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Configuration for a set of scenario runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExperimentConfig {
    /// Master seed for determinism
    pub seed: u64,

    /// Hidden friction of the ground-truth world
    pub true_friction: f64,

    /// Draw the hidden friction from the seed instead of `true_friction`
    pub randomize_truth: bool,

    /// Oracle's starting friction
    pub initial_guess: f64,

    /// Std dev of ground-truth sensor noise (0 = perfect sensor)
    pub observation_noise_std: f64,

    /// Initial step size for hill climbing
    pub hill_climb_step: f64,

    /// Max distance between recovered and hidden friction for a pass
    pub friction_tolerance: f64,

    /// Physical setup of every trial
    pub scenario: Scenario,

    /// Search settings
    pub calibration: CalibrationConfig,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            true_friction: 0.9,
            randomize_truth: false,
            initial_guess: 0.2,
            observation_noise_std: 0.0,
            hill_climb_step: 0.1,
            friction_tolerance: 0.01,
            scenario: Scenario::default(),
            calibration: CalibrationConfig::default(),
        }
    }
}

impl ExperimentConfig {
    /// Loads a config from a JSON file. Missing fields take their defaults.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    /// Parses a config from a JSON string.
    pub fn from_json_str(content: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks that every value describes a runnable experiment.
    pub fn validate(&self) -> Result<()> {
        self.calibration.validate()?;

        let bounds = self.calibration.lower_bound..=self.calibration.upper_bound;
        if !bounds.contains(&self.true_friction) {
            return Err(SimError::config(format!(
                "true_friction {} is outside the search bounds {:?}",
                self.true_friction, bounds
            )));
        }
        if !bounds.contains(&self.initial_guess) {
            return Err(SimError::config(format!(
                "initial_guess {} is outside the search bounds {:?}",
                self.initial_guess, bounds
            )));
        }
        if !self.observation_noise_std.is_finite() || self.observation_noise_std < 0.0 {
            return Err(SimError::config("observation_noise_std must be finite and non-negative"));
        }
        if !(self.hill_climb_step > 0.0) {
            return Err(SimError::config("hill_climb_step must be positive"));
        }
        if !(self.friction_tolerance > 0.0) {
            return Err(SimError::config("friction_tolerance must be positive"));
        }
        if self.scenario.steps == 0 {
            return Err(SimError::config("scenario.steps must be at least 1"));
        }
        if !(self.scenario.dt > 0.0) || !self.scenario.dt.is_finite() {
            return Err(SimError::config("scenario.dt must be positive"));
        }
        Ok(())
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }
}
