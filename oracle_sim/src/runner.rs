//! Scenario runner - executes calibration scenarios.

use crate::config::ExperimentConfig;
use crate::context::SimContext;
use crate::error::{Result, SimError};
use crate::scenarios::ScenarioId;

use nalgebra::Vector2;
use oracle_core::{
    divergence, Bisection, CalibrationConfig, CalibrationReport, CausalOracle, DivergenceReport,
    ErrorMetric, GroundTruth, HillClimb, Scenario, SearchStrategy, WorldParams,
};
use tracing::{debug, info, warn};

/// Noise used by `noisy_truth` when the config asks for a perfect sensor.
const DEFAULT_SCENARIO_NOISE: f64 = 0.5;

/// Results from running a scenario.
#[derive(Debug, Clone)]
pub struct ScenarioResult {
    /// Scenario that was run
    pub scenario: ScenarioId,

    /// Seed used
    pub seed: u64,

    /// Whether scenario passed all assertions
    pub passed: bool,

    /// Hidden friction of the ground truth
    pub true_friction: f64,

    /// Oracle's friction before calibration
    pub initial_guess: f64,

    /// Oracle's friction after calibration
    pub calibrated_friction: Option<f64>,

    /// |calibrated - true|
    pub friction_error: Option<f64>,

    /// Phase 1 comparison (divergence scenario only)
    pub divergence: Option<DivergenceReport>,

    /// Calibration run (calibrating scenarios only)
    pub report: Option<CalibrationReport>,

    /// Failure message if any
    pub failure_reason: Option<String>,
}

impl ScenarioResult {
    /// Number of calibration trials run.
    pub fn iterations(&self) -> usize {
        self.report.as_ref().map_or(0, |r| r.iterations())
    }

    /// Lowest positional error reached (or the divergence for phase 1).
    pub fn final_error(&self) -> Option<f64> {
        match (&self.report, &self.divergence) {
            (Some(report), _) => Some(report.best_error),
            (None, Some(d)) => Some(d.error),
            (None, None) => None,
        }
    }
}

/// Runs calibration scenarios.
pub struct ScenarioRunner {
    config: ExperimentConfig,
}

impl ScenarioRunner {
    /// Creates a new scenario runner from a validated config.
    pub fn new(config: ExperimentConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Sets the master seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.config.seed = seed;
        self
    }

    /// Sets the number of physics steps per trial.
    ///
    /// Zero steps is rejected, matching config validation.
    pub fn with_steps(mut self, steps: usize) -> Result<Self> {
        if steps == 0 {
            return Err(SimError::config("scenario.steps must be at least 1"));
        }
        self.config.scenario.steps = steps;
        Ok(self)
    }

    pub fn config(&self) -> &ExperimentConfig {
        &self.config
    }

    /// Runs a scenario and returns the result.
    pub fn run(&self, scenario: ScenarioId) -> Result<ScenarioResult> {
        info!("Starting scenario: {} (seed={})", scenario.name(), self.config.seed);

        match scenario {
            ScenarioId::Divergence => self.run_divergence(),
            ScenarioId::Bisection => self.run_bisection(),
            ScenarioId::HillClimb => self.run_hill_climb(),
            ScenarioId::NoisyTruth => self.run_noisy_truth(),
            ScenarioId::TrajectoryFit => self.run_trajectory_fit(),
            ScenarioId::GentlePush => self.run_gentle_push(),
        }
    }

    /// Builds the seeded context and decides the hidden friction.
    fn setup(&self) -> (SimContext, f64) {
        let mut context = SimContext::new(self.config.seed);
        let truth = if self.config.randomize_truth {
            let range = self.config.calibration.lower_bound..self.config.calibration.upper_bound;
            context.draw_friction(range)
        } else {
            self.config.true_friction
        };
        debug!("  hidden friction = {:.4}", truth);
        (context, truth)
    }

    fn ground_truth(&self, context: &SimContext, truth: f64, noise_std: f64) -> Result<GroundTruth> {
        let world = GroundTruth::new(WorldParams::with_friction(truth));
        Ok(world.with_noise(noise_std, context.physics_seed())?)
    }

    /// CAL-001: Divergence - an uncalibrated Oracle drifts from reality.
    ///
    /// **Assertion**: final positions differ by more than the calibration
    /// tolerance, unless the Oracle's guess happens to be right already.
    fn run_divergence(&self) -> Result<ScenarioResult> {
        info!("CAL-001: Divergence - uncalibrated Oracle vs ground truth");

        let (context, truth) = self.setup();
        let mut ground_truth = self.ground_truth(&context, truth, self.config.observation_noise_std)?;
        let oracle = CausalOracle::new(WorldParams::with_friction(self.config.initial_guess));

        let report = divergence(&mut ground_truth, &oracle, &self.config.scenario)?;

        info!(
            "  ground truth x = {:.2} | oracle x = {:.2} | divergence = {:.2}",
            report.truth_x, report.oracle_x, report.error
        );

        let guess_is_right = (truth - self.config.initial_guess).abs() < self.config.friction_tolerance;
        let passed = report.error > self.config.calibration.tolerance || guess_is_right;

        Ok(ScenarioResult {
            scenario: ScenarioId::Divergence,
            seed: self.config.seed,
            passed,
            true_friction: truth,
            initial_guess: self.config.initial_guess,
            calibrated_friction: None,
            friction_error: None,
            divergence: Some(report),
            report: None,
            failure_reason: if !passed {
                Some(format!(
                    "Divergence {:.2} is within tolerance {:.2} although friction is wrong",
                    report.error, self.config.calibration.tolerance
                ))
            } else {
                None
            },
        })
    }

    /// CAL-002: Bisection - the reference calibration loop.
    fn run_bisection(&self) -> Result<ScenarioResult> {
        info!("CAL-002: Bisection - binary search over friction");

        self.calibrate(
            ScenarioId::Bisection,
            &self.config.scenario,
            self.config.calibration,
            self.config.observation_noise_std,
            |_| Box::new(Bisection::new()),
        )
    }

    /// CAL-003: HillClimb - evolutionary search from the initial guess.
    fn run_hill_climb(&self) -> Result<ScenarioResult> {
        info!("CAL-003: HillClimb - mutate/keep/revert search");

        let calibration = self
            .config
            .calibration
            .with_max_iterations(self.config.calibration.max_iterations.max(60));
        let start = self.config.initial_guess;
        let step = self.config.hill_climb_step;

        self.calibrate(
            ScenarioId::HillClimb,
            &self.config.scenario,
            calibration,
            self.config.observation_noise_std,
            |context| Box::new(HillClimb::new(start, step, context.search_seed())),
        )
    }

    /// CAL-004: NoisyTruth - the sensor reporting ground truth is noisy.
    fn run_noisy_truth(&self) -> Result<ScenarioResult> {
        info!("CAL-004: NoisyTruth - calibrating against a noisy sensor");

        let noise = if self.config.observation_noise_std > 0.0 {
            self.config.observation_noise_std
        } else {
            DEFAULT_SCENARIO_NOISE
        };
        debug!("  sensor noise std = {:.2}", noise);

        self.calibrate(
            ScenarioId::NoisyTruth,
            &self.config.scenario,
            self.config.calibration,
            noise,
            |_| Box::new(Bisection::new()),
        )
    }

    /// CAL-005: TrajectoryFit - score whole trajectories instead of end points.
    fn run_trajectory_fit(&self) -> Result<ScenarioResult> {
        info!("CAL-005: TrajectoryFit - RMS over every step");

        let calibration = self
            .config
            .calibration
            .with_metric(ErrorMetric::TrajectoryRms)
            .with_max_iterations(self.config.calibration.max_iterations.max(30));

        self.calibrate(
            ScenarioId::TrajectoryFit,
            &self.config.scenario,
            calibration,
            self.config.observation_noise_std,
            |_| Box::new(Bisection::new()),
        )
    }

    /// CAL-006: GentlePush - the box comes to rest on the floor.
    ///
    /// Short slides are far less sensitive to friction, so the positional
    /// tolerance is tightened to keep the recovered friction accurate.
    fn run_gentle_push(&self) -> Result<ScenarioResult> {
        info!("CAL-006: GentlePush - box stops on the floor");

        let scenario = self.config.scenario.with_impulse(Vector2::new(3000.0, 0.0));
        let calibration = self
            .config
            .calibration
            .with_tolerance(self.config.calibration.tolerance.min(0.05))
            .with_max_iterations(self.config.calibration.max_iterations.max(30));

        self.calibrate(
            ScenarioId::GentlePush,
            &scenario,
            calibration,
            self.config.observation_noise_std,
            |_| Box::new(Bisection::new()),
        )
    }

    /// Observes the ground truth once, then calibrates a fresh Oracle against it.
    ///
    /// **Assertion**: recovered friction is within `friction_tolerance` of the
    /// hidden friction.
    fn calibrate<F>(
        &self,
        id: ScenarioId,
        scenario: &Scenario,
        calibration: CalibrationConfig,
        noise_std: f64,
        make_strategy: F,
    ) -> Result<ScenarioResult>
    where
        F: FnOnce(&SimContext) -> Box<dyn SearchStrategy>,
    {
        let (context, truth) = self.setup();
        let mut ground_truth = self.ground_truth(&context, truth, noise_std)?;
        let target = ground_truth.observe(scenario)?;

        let mut strategy = make_strategy(&context);
        let mut oracle = CausalOracle::new(WorldParams::with_friction(self.config.initial_guess));
        let report = oracle.calibrate_against(scenario, &target, calibration, strategy.as_mut())?;

        let friction_error = (oracle.friction() - truth).abs();
        let passed = friction_error < self.config.friction_tolerance;

        if passed {
            info!(
                "✓ {} complete: friction {:.4} -> {:.4} (true {:.4}) in {} iterations",
                id.name(),
                self.config.initial_guess,
                oracle.friction(),
                truth,
                report.iterations()
            );
        } else {
            warn!(
                "✗ {} missed: friction {:.4} vs true {:.4} after {} iterations",
                id.name(),
                oracle.friction(),
                truth,
                report.iterations()
            );
        }

        Ok(ScenarioResult {
            scenario: id,
            seed: self.config.seed,
            passed,
            true_friction: truth,
            initial_guess: self.config.initial_guess,
            calibrated_friction: Some(oracle.friction()),
            friction_error: Some(friction_error),
            divergence: None,
            failure_reason: if !passed {
                Some(format!(
                    "Friction error {:.4} exceeds threshold {:.4}",
                    friction_error, self.config.friction_tolerance
                ))
            } else {
                None
            },
            report: Some(report),
        })
    }
}
