//! JSON exporter for calibration runs.
//!
//! Writes the convergence series (error per iteration) alongside the
//! scenario outcome so it can be plotted by external tooling.

use crate::error::Result;
use crate::runner::ScenarioResult;
use oracle_core::{CalibrationOutcome, CalibrationStep, ConvergenceStats, DivergenceReport};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

/// Complete calibration export.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalibrationExport {
    /// Scenario name
    pub scenario: String,

    /// Seed used
    pub seed: u64,

    /// Hidden friction
    pub true_friction: f64,

    /// Oracle's friction before calibration
    pub initial_guess: f64,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub calibrated_friction: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub strategy: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<CalibrationOutcome>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub divergence: Option<DivergenceReport>,

    /// Convergence series
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub iterations: Vec<CalibrationStep>,

    pub stats: ConvergenceStats,

    /// Final results
    pub passed: bool,
}

impl CalibrationExport {
    /// Builds an export from a scenario result.
    pub fn from_result(result: &ScenarioResult) -> Self {
        let history = result
            .report
            .as_ref()
            .map(|r| r.history.clone())
            .unwrap_or_default();

        Self {
            scenario: result.scenario.name().to_string(),
            seed: result.seed,
            true_friction: result.true_friction,
            initial_guess: result.initial_guess,
            calibrated_friction: result.calibrated_friction,
            strategy: result.report.as_ref().map(|r| r.strategy.clone()),
            outcome: result.report.as_ref().map(|r| r.outcome),
            divergence: result.divergence,
            stats: ConvergenceStats::from_history(&history),
            iterations: history,
            passed: result.passed,
        }
    }

    /// Writes to a JSON file, creating parent directories as needed.
    pub fn write_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let json = serde_json::to_string_pretty(self)?;
        let mut file = File::create(path)?;
        file.write_all(json.as_bytes())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ExperimentConfig;
    use crate::runner::ScenarioRunner;
    use crate::scenarios::ScenarioId;

    #[test]
    fn test_export_bisection_run() {
        let runner = ScenarioRunner::new(ExperimentConfig::default()).unwrap();
        let result = runner.run(ScenarioId::Bisection).unwrap();

        let export = CalibrationExport::from_result(&result);
        assert_eq!(export.scenario, "bisection");
        assert_eq!(export.iterations.len(), result.iterations());
        assert_eq!(export.stats.iterations, result.iterations());
        assert_eq!(export.strategy.as_deref(), Some("bisection"));

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("figures").join("calibration_convergence.json");
        export.write_to_file(&path).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let parsed: CalibrationExport = serde_json::from_str(&content).unwrap();
        assert_eq!(parsed.iterations, export.iterations);
        assert_eq!(parsed.outcome, export.outcome);
    }

    #[test]
    fn test_export_divergence_has_no_series() {
        let runner = ScenarioRunner::new(ExperimentConfig::default()).unwrap();
        let result = runner.run(ScenarioId::Divergence).unwrap();

        let export = CalibrationExport::from_result(&result);
        let json = serde_json::to_value(&export).unwrap();

        assert!(json.get("iterations").is_none());
        assert!(json.get("divergence").is_some());
        assert_eq!(export.stats.iterations, 0);
    }
}
