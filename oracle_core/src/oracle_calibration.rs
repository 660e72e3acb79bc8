//! The "CALIBRATION" Engine - closing the loop between Oracle and reality
//!
//! Each iteration runs a trial world with a candidate friction, measures
//! how far its outcome is from the observed ground truth, and asks a
//! `SearchStrategy` for the next candidate. The loop stops as soon as the
//! error falls within tolerance or the iteration budget runs out.
//!
//! Two strategies are provided:
//! - `Bisection`: halves the search interval every iteration. Relies on the
//!   final position being monotone in friction.
//! - `HillClimb`: mutate / keep / revert search that needs no ordering,
//!   only that the error has a single valley.

use crate::error::{OracleError, Result};
use crate::metrics::ErrorMetric;
use crate::oracle_env::{run_trial, Observation, Scenario};
use crate::oracle_physics::WorldParams;
use nalgebra::Vector2;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Settings for one calibration run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationConfig {
    /// Maximum number of trials
    pub max_iterations: usize,

    /// Error at or below which the Oracle counts as calibrated
    pub tolerance: f64,

    /// Lowest friction the search may propose
    pub lower_bound: f64,

    /// Highest friction the search may propose
    pub upper_bound: f64,

    /// How trial outcomes are compared with the observation
    pub metric: ErrorMetric,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            max_iterations: 10,
            tolerance: 1.0,
            lower_bound: 0.0,
            upper_bound: 1.0,
            metric: ErrorMetric::FinalPosition,
        }
    }
}

impl CalibrationConfig {
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn with_bounds(mut self, lower: f64, upper: f64) -> Self {
        self.lower_bound = lower;
        self.upper_bound = upper;
        self
    }

    pub fn with_metric(mut self, metric: ErrorMetric) -> Self {
        self.metric = metric;
        self
    }

    /// Checks that the search is well defined.
    pub fn validate(&self) -> Result<()> {
        if self.max_iterations == 0 {
            return Err(OracleError::config("max_iterations", "must be at least 1"));
        }
        if !self.tolerance.is_finite() || self.tolerance < 0.0 {
            return Err(OracleError::config(
                "tolerance",
                format!("must be finite and non-negative, got {}", self.tolerance),
            ));
        }
        if !self.lower_bound.is_finite() || !self.upper_bound.is_finite() {
            return Err(OracleError::config("bounds", "must be finite"));
        }
        if self.lower_bound >= self.upper_bound {
            return Err(OracleError::config(
                "bounds",
                format!(
                    "lower bound {} must be below upper bound {}",
                    self.lower_bound, self.upper_bound
                ),
            ));
        }
        Ok(())
    }

    fn clamp(&self, friction: f64) -> f64 {
        friction.clamp(self.lower_bound, self.upper_bound)
    }
}

/// Record of a single trial.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CalibrationStep {
    /// 1-based iteration number
    pub iteration: usize,

    /// Friction used for the trial
    pub guess: f64,

    /// Final x position reached in the trial
    pub predicted_x: f64,

    /// Error against the observation
    pub error: f64,
}

/// How a calibration run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CalibrationOutcome {
    /// Error reached the tolerance
    Converged,

    /// Iteration budget ran out first
    Exhausted,
}

/// Result of a calibration run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalibrationReport {
    /// Strategy that produced this report
    pub strategy: String,

    /// Lowest-error friction seen
    pub best_guess: f64,

    /// Error at `best_guess`
    pub best_error: f64,

    /// Error of the last trial
    pub final_error: f64,

    pub outcome: CalibrationOutcome,

    pub history: Vec<CalibrationStep>,
}

impl CalibrationReport {
    pub fn iterations(&self) -> usize {
        self.history.len()
    }

    pub fn converged(&self) -> bool {
        self.outcome == CalibrationOutcome::Converged
    }
}

/// Proposes friction guesses from the results of previous trials.
pub trait SearchStrategy: Send {
    /// Returns the name of this strategy.
    fn name(&self) -> &str;

    /// Clears internal state before a new run.
    fn reset(&mut self);

    /// First friction to try.
    fn first_guess(&mut self, config: &CalibrationConfig) -> f64;

    /// Next friction to try, given the trial that just ran.
    fn next_guess(&mut self, last: &CalibrationStep, target_x: f64, config: &CalibrationConfig) -> f64;
}

/// Binary search over the friction interval.
///
/// A trial that travels farther than the target had too little friction,
/// so the lower half of the interval is discarded; otherwise the upper half.
#[derive(Debug, Clone, Default)]
pub struct Bisection {
    low: f64,
    high: f64,
}

impl Bisection {
    pub fn new() -> Self {
        Self::default()
    }

    fn midpoint(&self) -> f64 {
        (self.low + self.high) / 2.0
    }
}

impl SearchStrategy for Bisection {
    fn name(&self) -> &str {
        "bisection"
    }

    fn reset(&mut self) {
        self.low = 0.0;
        self.high = 0.0;
    }

    fn first_guess(&mut self, config: &CalibrationConfig) -> f64 {
        self.low = config.lower_bound;
        self.high = config.upper_bound;
        self.midpoint()
    }

    fn next_guess(&mut self, last: &CalibrationStep, target_x: f64, _config: &CalibrationConfig) -> f64 {
        if last.predicted_x > target_x {
            self.low = last.guess;
        } else {
            self.high = last.guess;
        }
        self.midpoint()
    }
}

/// Mutate / keep / revert search.
///
/// A mutation moves the current friction by `step` in the current
/// direction. An improving mutation is kept; a worsening one is reverted
/// and the opposite direction is tried. When both directions fail the step
/// halves and a fresh direction is drawn from the seeded RNG.
#[derive(Debug, Clone)]
pub struct HillClimb {
    start: f64,
    initial_step: f64,
    seed: u64,

    rng: ChaCha8Rng,
    current: f64,
    current_error: Option<f64>,
    step: f64,
    direction: f64,
    tried_opposite: bool,
}

impl HillClimb {
    /// Creates a climber starting at `start` with the given step size.
    pub fn new(start: f64, initial_step: f64, seed: u64) -> Self {
        Self {
            start,
            initial_step,
            seed,
            rng: ChaCha8Rng::seed_from_u64(seed),
            current: start,
            current_error: None,
            step: initial_step,
            direction: 1.0,
            tried_opposite: false,
        }
    }

    /// Current step size.
    pub fn step_size(&self) -> f64 {
        self.step
    }

    fn draw_direction(&mut self) -> f64 {
        if self.rng.gen_bool(0.5) {
            1.0
        } else {
            -1.0
        }
    }
}

impl SearchStrategy for HillClimb {
    fn name(&self) -> &str {
        "hill_climb"
    }

    fn reset(&mut self) {
        self.rng = ChaCha8Rng::seed_from_u64(self.seed);
        self.current = self.start;
        self.current_error = None;
        self.step = self.initial_step;
        self.direction = 1.0;
        self.tried_opposite = false;
    }

    fn first_guess(&mut self, config: &CalibrationConfig) -> f64 {
        self.current = config.clamp(self.start);
        self.direction = self.draw_direction();
        self.current
    }

    fn next_guess(&mut self, last: &CalibrationStep, _target_x: f64, config: &CalibrationConfig) -> f64 {
        match self.current_error {
            None => {
                self.current_error = Some(last.error);
            }
            Some(best) if last.error < best => {
                // Keep the mutation and keep going the same way
                self.current = last.guess;
                self.current_error = Some(last.error);
                self.tried_opposite = false;
            }
            Some(_) => {
                if self.tried_opposite {
                    self.step *= 0.5;
                    self.tried_opposite = false;
                    self.direction = self.draw_direction();
                } else {
                    self.direction = -self.direction;
                    self.tried_opposite = true;
                }
            }
        }

        config.clamp(self.current + self.direction * self.step)
    }
}

/// Drives trials until the Oracle matches the observation.
pub struct CalibrationEngine {
    scenario: Scenario,
    config: CalibrationConfig,
    gravity: Vector2<f64>,
    history: Vec<CalibrationStep>,
}

impl CalibrationEngine {
    /// Creates an engine that calibrates friction for `scenario`.
    pub fn new(scenario: Scenario, config: CalibrationConfig) -> Self {
        Self {
            scenario,
            config,
            gravity: Vector2::from(WorldParams::DEFAULT_GRAVITY),
            history: Vec::new(),
        }
    }

    /// Sets the gravity used by trial worlds.
    pub fn with_gravity(mut self, gravity: Vector2<f64>) -> Self {
        self.gravity = gravity;
        self
    }

    pub fn config(&self) -> &CalibrationConfig {
        &self.config
    }

    /// Steps recorded by the most recent `calibrate` call.
    pub fn history(&self) -> &[CalibrationStep] {
        &self.history
    }

    fn run_trial(&self, friction: f64) -> Result<Observation> {
        let params = WorldParams {
            friction,
            gravity: self.gravity,
        };
        run_trial(params, &self.scenario)
    }

    /// Searches for the friction whose trial reproduces `target`.
    pub fn calibrate(
        &mut self,
        target: &Observation,
        strategy: &mut dyn SearchStrategy,
    ) -> Result<CalibrationReport> {
        self.config.validate()?;
        self.history.clear();
        strategy.reset();

        info!(
            "Starting calibration: strategy={}, target x={:.2}, budget={} iterations",
            strategy.name(),
            target.final_x(),
            self.config.max_iterations
        );

        let mut outcome = CalibrationOutcome::Exhausted;
        let mut guess = strategy.first_guess(&self.config);

        for iteration in 1..=self.config.max_iterations {
            let prediction = self.run_trial(guess)?;
            let error = self.config.metric.error(&prediction, target)?;

            let step = CalibrationStep {
                iteration,
                guess,
                predicted_x: prediction.final_x(),
                error,
            };
            self.history.push(step);

            debug!("Iteration {:02}: guess={:.4}, error={:.2}", iteration, guess, error);

            if error <= self.config.tolerance {
                outcome = CalibrationOutcome::Converged;
                break;
            }

            guess = strategy.next_guess(&step, target.final_x(), &self.config);
        }

        let best = self
            .history
            .iter()
            .min_by(|a, b| a.error.total_cmp(&b.error))
            .copied()
            .ok_or_else(|| OracleError::config("max_iterations", "no trials were run"))?;
        let final_error = self.history.last().map(|s| s.error).unwrap_or(best.error);

        match outcome {
            CalibrationOutcome::Converged => info!(
                "Calibration converged after {} iterations: friction={:.4}, error={:.2}",
                self.history.len(),
                best.guess,
                best.error
            ),
            CalibrationOutcome::Exhausted => warn!(
                "Calibration exhausted {} iterations: best friction={:.4}, error={:.2}",
                self.history.len(),
                best.guess,
                best.error
            ),
        }

        Ok(CalibrationReport {
            strategy: strategy.name().to_string(),
            best_guess: best.guess,
            best_error: best.error,
            final_error,
            outcome,
            history: self.history.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle_env::GroundTruth;
    use approx::assert_relative_eq;

    fn observe(friction: f64, scenario: &Scenario) -> Observation {
        GroundTruth::new(WorldParams::with_friction(friction))
            .observe(scenario)
            .unwrap()
    }

    #[test]
    fn test_bisection_recovers_hidden_friction() {
        let scenario = Scenario::default();
        let target = observe(0.9, &scenario);

        let mut engine = CalibrationEngine::new(scenario, CalibrationConfig::default().with_max_iterations(30));
        let report = engine.calibrate(&target, &mut Bisection::new()).unwrap();

        assert!(report.converged());
        assert!(report.best_error <= 1.0);
        assert!((report.best_guess - 0.9).abs() < 0.01);
        assert_eq!(engine.history().len(), report.iterations());
    }

    #[test]
    fn test_bisection_first_guess_is_midpoint() {
        let scenario = Scenario::default();
        let target = observe(0.9, &scenario);

        let config = CalibrationConfig::default().with_bounds(0.2, 0.6).with_max_iterations(1);
        let mut engine = CalibrationEngine::new(scenario, config);
        let report = engine.calibrate(&target, &mut Bisection::new()).unwrap();

        assert_relative_eq!(report.history[0].guess, 0.4, epsilon = 1e-12);
        assert_eq!(report.history[0].iteration, 1);
    }

    #[test]
    fn test_bisection_moves_toward_target() {
        let config = CalibrationConfig::default();
        let mut bisection = Bisection::new();
        let first = bisection.first_guess(&config);
        assert_eq!(first, 0.5);

        // Trial overshot: need more friction
        let overshoot = CalibrationStep { iteration: 1, guess: first, predicted_x: 200.0, error: 100.0 };
        assert_eq!(bisection.next_guess(&overshoot, 100.0, &config), 0.75);

        // Trial fell short: need less friction
        let short = CalibrationStep { iteration: 2, guess: 0.75, predicted_x: 50.0, error: 50.0 };
        assert_eq!(bisection.next_guess(&short, 100.0, &config), 0.625);
    }

    #[test]
    fn test_exhausted_run_returns_lowest_error_guess() {
        let scenario = Scenario::default();
        let target = observe(0.9, &scenario);

        let config = CalibrationConfig::default().with_max_iterations(3).with_tolerance(0.0);
        let mut engine = CalibrationEngine::new(scenario, config);
        let report = engine.calibrate(&target, &mut Bisection::new()).unwrap();

        assert_eq!(report.outcome, CalibrationOutcome::Exhausted);
        assert_eq!(report.iterations(), 3);

        let min_error = report
            .history
            .iter()
            .map(|s| s.error)
            .fold(f64::INFINITY, f64::min);
        assert_eq!(report.best_error, min_error);
        assert!(report.history.iter().any(|s| s.guess == report.best_guess));
    }

    #[test]
    fn test_rejects_invalid_config() {
        assert!(CalibrationConfig::default().with_max_iterations(0).validate().is_err());
        assert!(CalibrationConfig::default().with_bounds(1.0, 0.0).validate().is_err());
        assert!(CalibrationConfig::default().with_bounds(0.5, 0.5).validate().is_err());
        assert!(CalibrationConfig::default().with_tolerance(-1.0).validate().is_err());
        assert!(CalibrationConfig::default().with_tolerance(f64::NAN).validate().is_err());
        assert!(CalibrationConfig::default().validate().is_ok());

        let scenario = Scenario::default();
        let target = observe(0.9, &scenario);
        let mut engine = CalibrationEngine::new(scenario, CalibrationConfig::default().with_max_iterations(0));
        let result = engine.calibrate(&target, &mut Bisection::new());
        assert!(matches!(result, Err(OracleError::InvalidConfig { .. })));
    }

    #[test]
    fn test_each_calibration_starts_fresh_history() {
        let scenario = Scenario::default();
        let target = observe(0.9, &scenario);
        let mut engine = CalibrationEngine::new(scenario, CalibrationConfig::default().with_max_iterations(4).with_tolerance(0.0));

        engine.calibrate(&target, &mut Bisection::new()).unwrap();
        let second = engine.calibrate(&target, &mut Bisection::new()).unwrap();

        assert_eq!(engine.history().len(), 4);
        assert_eq!(second.history[0].iteration, 1);
    }

    #[test]
    fn test_hill_climb_improves_on_first_trial() {
        let scenario = Scenario::default();
        let target = observe(0.9, &scenario);

        let config = CalibrationConfig::default().with_max_iterations(40);
        let mut engine = CalibrationEngine::new(scenario, config);
        let report = engine.calibrate(&target, &mut HillClimb::new(0.2, 0.1, 42)).unwrap();

        let first_error = report.history[0].error;
        assert_eq!(report.history[0].guess, 0.2);
        assert!(report.best_error < first_error);
        assert!(report.history.iter().all(|s| s.guess >= 0.0 && s.guess <= 1.0));
    }

    #[test]
    fn test_hill_climb_is_deterministic_per_seed() {
        let scenario = Scenario::default();
        let target = observe(0.7, &scenario);
        let config = CalibrationConfig::default().with_max_iterations(15);

        let mut engine = CalibrationEngine::new(scenario, config);
        let a = engine.calibrate(&target, &mut HillClimb::new(0.3, 0.1, 9)).unwrap();
        let b = engine.calibrate(&target, &mut HillClimb::new(0.3, 0.1, 9)).unwrap();

        assert_eq!(a.history, b.history);
    }

    #[test]
    fn test_hill_climb_halves_step_after_both_directions_fail() {
        let config = CalibrationConfig::default();
        let mut climber = HillClimb::new(0.5, 0.1, 1);
        let start = climber.first_guess(&config);

        // Baseline, then two failing mutations
        let baseline = CalibrationStep { iteration: 1, guess: start, predicted_x: 0.0, error: 1.0 };
        let m1 = climber.next_guess(&baseline, 0.0, &config);
        let fail1 = CalibrationStep { iteration: 2, guess: m1, predicted_x: 0.0, error: 2.0 };
        let m2 = climber.next_guess(&fail1, 0.0, &config);
        assert!((m1 - 0.5).abs() > 0.09 && (m2 - 0.5).abs() > 0.09);
        assert!((m1 - m2).abs() > 0.19);

        let fail2 = CalibrationStep { iteration: 3, guess: m2, predicted_x: 0.0, error: 2.0 };
        climber.next_guess(&fail2, 0.0, &config);
        assert_eq!(climber.step_size(), 0.05);
    }

    #[test]
    fn test_trajectory_metric_calibration() {
        let scenario = Scenario::default();
        let target = observe(0.9, &scenario);

        let config = CalibrationConfig::default()
            .with_metric(ErrorMetric::TrajectoryRms)
            .with_max_iterations(30);
        let mut engine = CalibrationEngine::new(scenario, config);
        let report = engine.calibrate(&target, &mut Bisection::new()).unwrap();

        assert!(report.converged());
        assert!((report.best_guess - 0.9).abs() < 0.01);
    }
}
