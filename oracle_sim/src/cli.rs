//! Command-line arguments for the `oracle-sim` binary.
//!
//! Flags are layered over an optional JSON config file; the merged
//! config is validated after every override is applied.

use crate::config::ExperimentConfig;
use crate::error::{Result, SimError};
use crate::runner::ScenarioResult;
use crate::scenarios::ScenarioId;
use clap::Parser;
use std::path::PathBuf;

/// Self-calibrating Causal Oracle CLI
#[derive(Parser, Debug)]
#[command(name = "oracle-sim")]
#[command(about = "Run self-calibration experiments for the Causal Oracle", long_about = None)]
pub struct Args {
    /// Master seed for determinism (0 = random from time)
    #[arg(short, long)]
    pub seed: Option<u64>,

    /// Scenario to run (divergence, bisection, hill_climb, noisy_truth, trajectory_fit, gentle_push, all)
    #[arg(short = 'S', long, default_value = "all")]
    pub scenario: String,

    /// Number of consecutive seeds to test (run concurrently)
    #[arg(long, default_value = "1")]
    pub seeds: usize,

    /// JSON experiment config; flags below override its values
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Hidden friction of the ground truth
    #[arg(long)]
    pub truth: Option<f64>,

    /// Draw the hidden friction from the seed
    #[arg(long)]
    pub random_truth: bool,

    /// Oracle's initial friction guess
    #[arg(long)]
    pub guess: Option<f64>,

    /// Maximum calibration iterations
    #[arg(long)]
    pub max_iterations: Option<usize>,

    /// Positional error tolerance
    #[arg(long)]
    pub tolerance: Option<f64>,

    /// Ground-truth sensor noise std dev
    #[arg(long)]
    pub noise: Option<f64>,

    /// Physics steps per trial
    #[arg(long)]
    pub steps: Option<usize>,

    /// Verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// JSON output for CI parsing
    #[arg(long)]
    pub json: bool,

    /// Export the convergence series of a single scenario to a JSON file
    #[arg(long)]
    pub export: Option<PathBuf>,
}

impl Args {
    /// Loads the config file (if any) and applies command-line overrides.
    pub fn build_config(&self) -> Result<ExperimentConfig> {
        let mut config = match &self.config {
            Some(path) => ExperimentConfig::from_json_file(path)?,
            None => ExperimentConfig::default(),
        };

        if let Some(seed) = self.seed {
            config.seed = seed;
        }
        if let Some(truth) = self.truth {
            config.true_friction = truth;
        }
        if self.random_truth {
            config.randomize_truth = true;
        }
        if let Some(guess) = self.guess {
            config.initial_guess = guess;
        }
        if let Some(max_iterations) = self.max_iterations {
            config.calibration.max_iterations = max_iterations;
        }
        if let Some(tolerance) = self.tolerance {
            config.calibration.tolerance = tolerance;
        }
        if let Some(noise) = self.noise {
            config.observation_noise_std = noise;
        }
        if let Some(steps) = self.steps {
            config.scenario.steps = steps;
        }

        if config.seed == 0 {
            config.seed = std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .map(|d| d.as_nanos() as u64)
                .unwrap_or(42)
                .max(1);
        }

        config.validate()?;
        Ok(config)
    }

    /// Resolves the scenario selection, checking it against `--export`.
    pub fn scenarios(&self) -> Result<Vec<ScenarioId>> {
        let scenarios = if self.scenario == "all" {
            ScenarioId::all()
        } else {
            vec![self.scenario.parse::<ScenarioId>().map_err(SimError::Config)?]
        };

        if self.export.is_some() {
            if scenarios.len() > 1 {
                return Err(SimError::config("--export only supports a single scenario, not 'all'"));
            }
            if self.seeds > 1 {
                return Err(SimError::config("--export only supports a single seed, not a --seeds sweep"));
            }
        }

        Ok(scenarios)
    }
}

/// Builds the machine-readable summary printed under `--json`.
pub fn summary_json(results: &[ScenarioResult], errored: usize) -> serde_json::Value {
    let failed = results.iter().filter(|r| !r.passed).count();

    serde_json::json!({
        "total": results.len(),
        "passed": results.len() - failed,
        "failed": failed,
        "errored": errored,
        "results": results.iter().map(|r| {
            serde_json::json!({
                "scenario": r.scenario.name(),
                "seed": r.seed,
                "passed": r.passed,
                "true_friction": r.true_friction,
                "calibrated_friction": r.calibrated_friction,
                "friction_error": r.friction_error,
                "iterations": r.iterations(),
                "final_error": r.final_error(),
                "failure_reason": r.failure_reason,
            })
        }).collect::<Vec<_>>(),
    })
}
