//! Calibration scenarios.

/// Scenario identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScenarioId {
    /// CAL-001: Uncalibrated Oracle drifts away from reality
    Divergence,

    /// CAL-002: Binary search recovers the hidden friction
    Bisection,

    /// CAL-003: Mutate / keep / revert search recovers the hidden friction
    HillClimb,

    /// CAL-004: Calibrate against a noisy sensor
    NoisyTruth,

    /// CAL-005: Match the whole trajectory, not just the end point
    TrajectoryFit,

    /// CAL-006: Weak impulse, the box stops on the floor
    GentlePush,
}

impl ScenarioId {
    /// Returns a list of all scenarios.
    pub fn all() -> Vec<ScenarioId> {
        vec![
            ScenarioId::Divergence,
            ScenarioId::Bisection,
            ScenarioId::HillClimb,
            ScenarioId::NoisyTruth,
            ScenarioId::TrajectoryFit,
            ScenarioId::GentlePush,
        ]
    }

    /// Returns the scenario name.
    pub fn name(&self) -> &'static str {
        match self {
            ScenarioId::Divergence => "divergence",
            ScenarioId::Bisection => "bisection",
            ScenarioId::HillClimb => "hill_climb",
            ScenarioId::NoisyTruth => "noisy_truth",
            ScenarioId::TrajectoryFit => "trajectory_fit",
            ScenarioId::GentlePush => "gentle_push",
        }
    }

    /// Returns a description of the scenario.
    pub fn description(&self) -> &'static str {
        match self {
            ScenarioId::Divergence => "Same impulse in both worlds, wrong friction: final positions diverge",
            ScenarioId::Bisection => "Binary search over [0, 1] until the final x matches ground truth",
            ScenarioId::HillClimb => "Seeded mutate/keep/revert search from the Oracle's initial guess",
            ScenarioId::NoisyTruth => "Bisection against a sensor with Gaussian position noise",
            ScenarioId::TrajectoryFit => "Bisection scored by RMS distance over the whole trajectory",
            ScenarioId::GentlePush => "Small impulse, box comes to rest on the floor; fine tolerance",
        }
    }

    /// Returns true if this scenario runs a calibration loop.
    pub fn calibrates(&self) -> bool {
        !matches!(self, ScenarioId::Divergence)
    }
}

impl std::fmt::Display for ScenarioId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for ScenarioId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "divergence" | "phase1" | "cal-001" => Ok(ScenarioId::Divergence),
            "bisection" | "phase2" | "cal-002" => Ok(ScenarioId::Bisection),
            "hill_climb" | "hillclimb" | "cal-003" => Ok(ScenarioId::HillClimb),
            "noisy_truth" | "noisytruth" | "cal-004" => Ok(ScenarioId::NoisyTruth),
            "trajectory_fit" | "trajectoryfit" | "cal-005" => Ok(ScenarioId::TrajectoryFit),
            "gentle_push" | "gentlepush" | "cal-006" => Ok(ScenarioId::GentlePush),
            _ => Err(format!("Unknown scenario: {}", s)),
        }
    }
}
