//! Ground truth and the Causal Oracle.
//!
//! Both sides of the experiment run the same physics world. The ground
//! truth holds the hidden real parameters (and optionally a noisy sensor);
//! the Oracle holds adjustable guesses and forecasts what the world will do.

use crate::error::{OracleError, Result};
use crate::oracle_calibration::{CalibrationConfig, CalibrationEngine, CalibrationReport, SearchStrategy};
use crate::oracle_physics::{BoxSpec, Floor, Simulator, WorldParams};
use nalgebra::Vector2;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// One experiment setup: which box, how hard it is pushed, for how long.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    pub box_spec: BoxSpec,
    pub floor: Floor,

    /// Impulse applied once before the first step
    pub impulse: Vector2<f64>,

    /// Number of physics steps per trial
    pub steps: usize,

    /// Step length in seconds
    pub dt: f64,
}

impl Default for Scenario {
    fn default() -> Self {
        Self {
            box_spec: BoxSpec::default(),
            floor: Floor::default(),
            impulse: Vector2::new(10000.0, 0.0),
            steps: 150,
            dt: 1.0 / 60.0,
        }
    }
}

impl Scenario {
    pub fn with_impulse(mut self, impulse: Vector2<f64>) -> Self {
        self.impulse = impulse;
        self
    }

    pub fn with_steps(mut self, steps: usize) -> Self {
        self.steps = steps;
        self
    }
}

/// What an observer sees after a trial.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    /// Position of the box after the last step
    pub final_position: Vector2<f64>,

    /// Position after every step
    pub trajectory: Vec<Vector2<f64>>,
}

impl Observation {
    pub fn final_x(&self) -> f64 {
        self.final_position.x
    }
}

/// Runs a single trial of `scenario` in a fresh world with `params`.
pub fn run_trial(params: WorldParams, scenario: &Scenario) -> Result<Observation> {
    let mut sim = Simulator::with_floor(params, scenario.floor);
    sim.add_dynamic_box(scenario.box_spec)?;
    sim.record_trajectory(true);
    sim.apply_impulse(scenario.impulse);

    for _ in 0..scenario.steps {
        sim.step(scenario.dt);
    }

    let final_position = sim.object_state().ok_or(OracleError::NoBody)?;
    Ok(Observation {
        final_position,
        trajectory: sim.into_trajectory(),
    })
}

/// The real world, whose parameters the Oracle cannot see.
pub struct GroundTruth {
    params: WorldParams,

    /// Sensor noise on observed positions (None = perfect sensor)
    noise: Option<Normal<f64>>,

    /// RNG for sensor noise
    rng: ChaCha8Rng,
}

impl GroundTruth {
    /// Creates a noiseless ground truth.
    pub fn new(params: WorldParams) -> Self {
        Self {
            params,
            noise: None,
            rng: ChaCha8Rng::seed_from_u64(0),
        }
    }

    /// Adds Gaussian position noise with the given std dev.
    ///
    /// The same seed always yields the same noise sequence.
    pub fn with_noise(mut self, std_dev: f64, seed: u64) -> Result<Self> {
        if !std_dev.is_finite() || std_dev < 0.0 {
            return Err(OracleError::InvalidNoise(format!(
                "std dev must be finite and non-negative, got {}",
                std_dev
            )));
        }
        self.noise = if std_dev > 0.0 {
            Some(Normal::new(0.0, std_dev).map_err(|e| OracleError::InvalidNoise(e.to_string()))?)
        } else {
            None
        };
        self.rng = ChaCha8Rng::seed_from_u64(seed);
        Ok(self)
    }

    /// Runs the scenario in the real world and returns what the sensor reports.
    pub fn observe(&mut self, scenario: &Scenario) -> Result<Observation> {
        let mut observation = run_trial(self.params, scenario)?;

        if let Some(normal) = self.noise {
            for point in observation.trajectory.iter_mut() {
                *point += self.sample_noise(&normal);
            }
            // One reading per instant: the final position is the last sample.
            observation.final_position = match observation.trajectory.last() {
                Some(last) => *last,
                None => observation.final_position + self.sample_noise(&normal),
            };
        }

        debug!("Ground truth observed final x = {:.2}", observation.final_x());
        Ok(observation)
    }

    fn sample_noise(&mut self, normal: &Normal<f64>) -> Vector2<f64> {
        Vector2::new(normal.sample(&mut self.rng), normal.sample(&mut self.rng))
    }

    /// Hidden friction, for reporting only.
    pub fn true_friction(&self) -> f64 {
        self.params.friction
    }
}

/// Predictive model of the world with adjustable parameters.
#[derive(Debug, Clone)]
pub struct CausalOracle {
    params: WorldParams,
}

impl CausalOracle {
    pub fn new(params: WorldParams) -> Self {
        Self { params }
    }

    /// Forecasts the outcome of `scenario` with the current parameters.
    pub fn predict(&self, scenario: &Scenario) -> Result<Observation> {
        run_trial(self.params, scenario)
    }

    pub fn friction(&self) -> f64 {
        self.params.friction
    }

    pub fn set_friction(&mut self, friction: f64) {
        self.params.friction = friction;
    }

    pub fn params(&self) -> &WorldParams {
        &self.params
    }

    /// Calibrates against an observation and adopts the best friction found.
    pub fn calibrate_against(
        &mut self,
        scenario: &Scenario,
        target: &Observation,
        config: CalibrationConfig,
        strategy: &mut dyn SearchStrategy,
    ) -> Result<CalibrationReport> {
        let mut engine = CalibrationEngine::new(*scenario, config).with_gravity(self.params.gravity);
        let report = engine.calibrate(target, strategy)?;
        self.params.friction = report.best_guess;
        Ok(report)
    }
}

/// How far an uncalibrated Oracle drifts from reality.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DivergenceReport {
    pub truth_x: f64,
    pub oracle_x: f64,

    /// Absolute difference of final x positions
    pub error: f64,
}

/// Runs the same scenario in both worlds and compares final positions.
pub fn divergence(
    truth: &mut GroundTruth,
    oracle: &CausalOracle,
    scenario: &Scenario,
) -> Result<DivergenceReport> {
    let truth_x = truth.observe(scenario)?.final_x();
    let oracle_x = oracle.predict(scenario)?.final_x();

    Ok(DivergenceReport {
        truth_x,
        oracle_x,
        error: (truth_x - oracle_x).abs(),
    })
}
