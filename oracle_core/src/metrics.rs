//! Oracle Metrics Module
//! =====================
//!
//! Error signals that compare an Oracle forecast with a ground-truth
//! observation, and summary statistics over a calibration run.

use crate::error::{OracleError, Result};
use crate::oracle_calibration::CalibrationStep;
use crate::oracle_env::Observation;
use serde::{Deserialize, Serialize};

/// How a trial is scored against the observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorMetric {
    /// Absolute difference of final x positions
    #[default]
    FinalPosition,

    /// Root mean square of per-step position distances
    TrajectoryRms,
}

impl ErrorMetric {
    /// Computes the error of `predicted` against `target`.
    pub fn error(&self, predicted: &Observation, target: &Observation) -> Result<f64> {
        match self {
            ErrorMetric::FinalPosition => Ok((predicted.final_x() - target.final_x()).abs()),
            ErrorMetric::TrajectoryRms => trajectory_rms(predicted, target),
        }
    }
}

// =============================================================================
// TRAJECTORY RMS
// =============================================================================

fn trajectory_rms(predicted: &Observation, target: &Observation) -> Result<f64> {
    if predicted.trajectory.len() != target.trajectory.len() {
        return Err(OracleError::TrajectoryMismatch {
            expected: target.trajectory.len(),
            actual: predicted.trajectory.len(),
        });
    }

    // Zero-step trials only have their final position to compare
    if target.trajectory.is_empty() {
        return Ok((predicted.final_position - target.final_position).norm());
    }

    let sum_sq: f64 = predicted
        .trajectory
        .iter()
        .zip(&target.trajectory)
        .map(|(p, t)| (p - t).norm_squared())
        .sum();

    Ok((sum_sq / target.trajectory.len() as f64).sqrt())
}

// =============================================================================
// CONVERGENCE STATISTICS
// =============================================================================

/// Summary of how a calibration run progressed.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ConvergenceStats {
    pub iterations: usize,
    pub initial_error: f64,
    pub final_error: f64,
    pub best_error: f64,

    /// Every trial scored at least as well as the one before it
    pub monotone: bool,
}

impl ConvergenceStats {
    /// Builds stats from a run's history. Empty history yields the default.
    pub fn from_history(history: &[CalibrationStep]) -> Self {
        let (Some(first), Some(last)) = (history.first(), history.last()) else {
            return Self::default();
        };

        Self {
            iterations: history.len(),
            initial_error: first.error,
            final_error: last.error,
            best_error: history.iter().map(|s| s.error).fold(f64::INFINITY, f64::min),
            monotone: history.windows(2).all(|w| w[1].error <= w[0].error),
        }
    }

    /// Fraction of the initial error removed by calibration, in [0, 1].
    pub fn improvement(&self) -> f64 {
        if self.initial_error > 0.0 {
            (1.0 - self.best_error / self.initial_error).clamp(0.0, 1.0)
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::Vector2;

    fn observation(points: &[(f64, f64)]) -> Observation {
        let trajectory: Vec<Vector2<f64>> = points.iter().map(|&(x, y)| Vector2::new(x, y)).collect();
        Observation {
            final_position: trajectory.last().copied().unwrap_or_else(Vector2::zeros),
            trajectory,
        }
    }

    fn step(iteration: usize, error: f64) -> CalibrationStep {
        CalibrationStep {
            iteration,
            guess: 0.5,
            predicted_x: 0.0,
            error,
        }
    }

    #[test]
    fn test_final_position_error() {
        let predicted = observation(&[(0.0, 0.0), (12.0, 3.0)]);
        let target = observation(&[(0.0, 0.0), (10.0, -4.0)]);

        let error = ErrorMetric::FinalPosition.error(&predicted, &target).unwrap();
        assert_relative_eq!(error, 2.0);
    }

    #[test]
    fn test_trajectory_rms() {
        let predicted = observation(&[(3.0, 4.0), (0.0, 0.0)]);
        let target = observation(&[(0.0, 0.0), (0.0, 0.0)]);

        // distances 5 and 0 -> sqrt(25 / 2)
        let error = ErrorMetric::TrajectoryRms.error(&predicted, &target).unwrap();
        assert_relative_eq!(error, (12.5f64).sqrt(), epsilon = 1e-12);
    }

    #[test]
    fn test_trajectory_length_mismatch() {
        let predicted = observation(&[(0.0, 0.0)]);
        let target = observation(&[(0.0, 0.0), (1.0, 0.0)]);

        let result = ErrorMetric::TrajectoryRms.error(&predicted, &target);
        assert!(matches!(
            result,
            Err(OracleError::TrajectoryMismatch { expected: 2, actual: 1 })
        ));
    }

    #[test]
    fn test_convergence_stats() {
        let history = vec![step(1, 100.0), step(2, 40.0), step(3, 60.0), step(4, 0.5)];
        let stats = ConvergenceStats::from_history(&history);

        assert_eq!(stats.iterations, 4);
        assert_relative_eq!(stats.initial_error, 100.0);
        assert_relative_eq!(stats.final_error, 0.5);
        assert_relative_eq!(stats.best_error, 0.5);
        assert!(!stats.monotone);
        assert_relative_eq!(stats.improvement(), 0.995, epsilon = 1e-12);
    }

    #[test]
    fn test_convergence_stats_empty() {
        let stats = ConvergenceStats::from_history(&[]);
        assert_eq!(stats.iterations, 0);
        assert_eq!(stats.improvement(), 0.0);
    }

    #[test]
    fn test_metric_serde_names() {
        let json = serde_json::to_string(&ErrorMetric::TrajectoryRms).unwrap();
        assert_eq!(json, "\"trajectory_rms\"");
    }
}
