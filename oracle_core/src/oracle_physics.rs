//! The "PHYSICS" Engine - a small 2D rigid-body world
//!
//! Each `Simulator` is a self-contained world with its own gravity and
//! friction: a static horizontal floor and one tracked dynamic box that
//! can be kicked with an impulse and slides until friction stops it or it
//! leaves the floor.
//!
//! Integration is semi-implicit Euler. Contact with the floor is resolved
//! with an inelastic normal impulse, and Coulomb friction is bounded by
//! that normal impulse. Friction coefficients combine multiplicatively.
//! Rotation is not modelled.

use crate::error::{OracleError, Result};
use nalgebra::Vector2;
use serde::{Deserialize, Serialize};

/// Tolerance when deciding whether a body still rests on top of the floor.
const CONTACT_SLOP: f64 = 1e-6;

/// Physical parameters of a world.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WorldParams {
    /// Friction coefficient applied to dynamic bodies in this world
    pub friction: f64,

    /// Gravitational acceleration (units/s²)
    pub gravity: Vector2<f64>,
}

impl WorldParams {
    /// Default gravity, pointing down.
    pub const DEFAULT_GRAVITY: [f64; 2] = [0.0, -900.0];

    /// Creates params with the given friction and default gravity.
    pub fn with_friction(friction: f64) -> Self {
        Self {
            friction,
            gravity: Vector2::from(Self::DEFAULT_GRAVITY),
        }
    }
}

impl Default for WorldParams {
    fn default() -> Self {
        Self::with_friction(0.5)
    }
}

/// Static horizontal floor segment with rounded ends.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Floor {
    /// Left end of the segment
    pub left_x: f64,

    /// Right end of the segment
    pub right_x: f64,

    /// Height of the segment's centre line
    pub y: f64,

    /// Segment thickness radius
    pub radius: f64,

    /// Friction of the floor surface
    pub friction: f64,
}

impl Floor {
    /// Height of the contact surface.
    pub fn top(&self) -> f64 {
        self.y + self.radius
    }

    /// Returns true if a body centred at `x` is held up by the floor.
    pub fn supports(&self, x: f64) -> bool {
        x >= self.left_x - self.radius && x <= self.right_x + self.radius
    }
}

impl Default for Floor {
    fn default() -> Self {
        Self {
            left_x: -500.0,
            right_x: 500.0,
            y: 10.0,
            radius: 5.0,
            friction: 1.0,
        }
    }
}

/// Description of a dynamic box to add to the world.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoxSpec {
    /// Initial centre position
    pub position: Vector2<f64>,

    /// Width and height
    pub size: Vector2<f64>,

    /// Mass
    pub mass: f64,
}

impl Default for BoxSpec {
    fn default() -> Self {
        Self {
            position: Vector2::new(0.0, 50.0),
            size: Vector2::new(50.0, 50.0),
            mass: 10.0,
        }
    }
}

/// Current state of the tracked dynamic body.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BodyState {
    pub position: Vector2<f64>,
    pub velocity: Vector2<f64>,
    pub size: Vector2<f64>,
    pub mass: f64,

    /// Body touched the floor during the last step
    pub grounded: bool,
}

impl BodyState {
    fn bottom(&self) -> f64 {
        self.position.y - self.size.y / 2.0
    }
}

/// A self-contained physics world.
#[derive(Debug, Clone)]
pub struct Simulator {
    params: WorldParams,
    floor: Floor,
    body: Option<BodyState>,
    time: f64,
    record_trajectory: bool,
    trajectory: Vec<Vector2<f64>>,
}

impl Simulator {
    /// Creates a world with the default floor.
    pub fn new(params: WorldParams) -> Self {
        Self::with_floor(params, Floor::default())
    }

    /// Creates a world with a custom floor.
    pub fn with_floor(params: WorldParams, floor: Floor) -> Self {
        Self {
            params,
            floor,
            body: None,
            time: 0.0,
            record_trajectory: false,
            trajectory: Vec::new(),
        }
    }

    /// Adds the dynamic box that this world tracks.
    ///
    /// A world tracks a single body; adding another replaces it and clears
    /// any recorded trajectory.
    pub fn add_dynamic_box(&mut self, spec: BoxSpec) -> Result<&BodyState> {
        if !(spec.mass > 0.0) || !spec.mass.is_finite() {
            return Err(OracleError::InvalidBody(format!(
                "mass must be positive, got {}",
                spec.mass
            )));
        }
        if !(spec.size.x > 0.0 && spec.size.y > 0.0) {
            return Err(OracleError::InvalidBody(format!(
                "size must be positive, got ({}, {})",
                spec.size.x, spec.size.y
            )));
        }

        self.trajectory.clear();
        let body = self.body.insert(BodyState {
            position: spec.position,
            velocity: Vector2::zeros(),
            size: spec.size,
            mass: spec.mass,
            grounded: false,
        });
        Ok(&*body)
    }

    /// Applies a one-time impulse at the body's centre of mass.
    ///
    /// Does nothing if the world has no body.
    pub fn apply_impulse(&mut self, impulse: Vector2<f64>) {
        if let Some(body) = self.body.as_mut() {
            body.velocity += impulse / body.mass;
        }
    }

    /// Advances the world by `dt` seconds.
    pub fn step(&mut self, dt: f64) {
        self.time += dt;

        let Some(body) = self.body.as_mut() else {
            return;
        };

        body.velocity += self.params.gravity * dt;

        let floor_top = self.floor.top();
        let resting_on_top = body.bottom() >= floor_top - CONTACT_SLOP;
        let penetrating = body.bottom() + body.velocity.y * dt <= floor_top;

        body.grounded = self.floor.supports(body.position.x) && resting_on_top && penetrating;

        if body.grounded {
            // Inelastic contact: the normal impulse cancels downward motion
            let normal_impulse = (-body.velocity.y).max(0.0);
            body.velocity.y = 0.0;
            body.position.y = floor_top + body.size.y / 2.0;

            let mu = self.params.friction * self.floor.friction;
            let speed = body.velocity.x.abs();
            let slowed = (speed - mu * normal_impulse).max(0.0);
            body.velocity.x = slowed.copysign(body.velocity.x);
        }

        body.position += body.velocity * dt;

        if self.record_trajectory {
            self.trajectory.push(body.position);
        }
    }

    /// Returns the position of the tracked body, if any.
    pub fn object_state(&self) -> Option<Vector2<f64>> {
        self.body.map(|b| b.position)
    }

    /// Returns the full state of the tracked body.
    pub fn body(&self) -> Option<&BodyState> {
        self.body.as_ref()
    }

    /// Elapsed simulation time in seconds.
    pub fn time(&self) -> f64 {
        self.time
    }

    pub fn params(&self) -> &WorldParams {
        &self.params
    }

    pub fn floor(&self) -> &Floor {
        &self.floor
    }

    /// Enables or disables per-step position recording.
    pub fn record_trajectory(&mut self, enabled: bool) {
        self.record_trajectory = enabled;
    }

    /// Positions recorded after each step.
    pub fn trajectory(&self) -> &[Vector2<f64>] {
        &self.trajectory
    }

    pub fn into_trajectory(self) -> Vec<Vector2<f64>> {
        self.trajectory
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const DT: f64 = 1.0 / 60.0;

    #[test]
    fn test_box_falls_and_rests_on_floor() {
        let mut sim = Simulator::new(WorldParams::with_friction(0.5));
        sim.add_dynamic_box(BoxSpec::default()).unwrap();

        for _ in 0..120 {
            sim.step(DT);
        }

        let body = sim.body().unwrap();
        // floor top 15 + half height 25
        assert_relative_eq!(body.position.y, 40.0, epsilon = 1e-9);
        assert_relative_eq!(body.velocity.y, 0.0);
        assert!(body.grounded);
        assert_relative_eq!(body.position.x, 0.0);
    }

    #[test]
    fn test_impulse_changes_velocity_by_impulse_over_mass() {
        let mut sim = Simulator::new(WorldParams::with_friction(0.5));
        sim.add_dynamic_box(BoxSpec::default()).unwrap();

        sim.apply_impulse(Vector2::new(10000.0, 0.0));

        let body = sim.body().unwrap();
        assert_relative_eq!(body.velocity.x, 1000.0);
    }

    #[test]
    fn test_impulse_without_body_is_noop() {
        let mut sim = Simulator::new(WorldParams::default());
        sim.apply_impulse(Vector2::new(10.0, 0.0));
        sim.step(DT);

        assert!(sim.object_state().is_none());
        assert_relative_eq!(sim.time(), DT);
    }

    #[test]
    fn test_friction_never_reverses_motion() {
        let mut sim = Simulator::new(WorldParams::with_friction(1.0));
        sim.add_dynamic_box(BoxSpec {
            position: Vector2::new(0.0, 40.0),
            ..BoxSpec::default()
        })
        .unwrap();
        sim.apply_impulse(Vector2::new(500.0, 0.0));

        let mut last_x = 0.0;
        for _ in 0..300 {
            sim.step(DT);
            let body = sim.body().unwrap();
            assert!(body.velocity.x >= 0.0);
            assert!(body.position.x >= last_x);
            last_x = body.position.x;
        }

        // 50 units/s against 900 units/s² decel stops inside the floor
        assert_relative_eq!(sim.body().unwrap().velocity.x, 0.0);
    }

    #[test]
    fn test_frictionless_box_keeps_sliding() {
        let mut sim = Simulator::new(WorldParams::with_friction(0.0));
        sim.add_dynamic_box(BoxSpec {
            position: Vector2::new(0.0, 40.0),
            ..BoxSpec::default()
        })
        .unwrap();
        sim.apply_impulse(Vector2::new(600.0, 0.0));

        for _ in 0..60 {
            sim.step(DT);
        }

        assert_relative_eq!(sim.object_state().unwrap().x, 60.0, epsilon = 1e-9);
    }

    #[test]
    fn test_box_falls_off_floor_edge() {
        let mut sim = Simulator::new(WorldParams::with_friction(0.0));
        sim.add_dynamic_box(BoxSpec {
            position: Vector2::new(490.0, 40.0),
            ..BoxSpec::default()
        })
        .unwrap();
        sim.apply_impulse(Vector2::new(3000.0, 0.0));

        for _ in 0..60 {
            sim.step(DT);
        }

        let body = sim.body().unwrap();
        assert!(!body.grounded);
        assert!(body.position.y < sim.floor().top());
    }

    #[test]
    fn test_rejects_invalid_body() {
        let mut sim = Simulator::new(WorldParams::default());

        let zero_mass = BoxSpec {
            mass: 0.0,
            ..BoxSpec::default()
        };
        assert!(matches!(
            sim.add_dynamic_box(zero_mass),
            Err(OracleError::InvalidBody(_))
        ));

        let flat = BoxSpec {
            size: Vector2::new(50.0, 0.0),
            ..BoxSpec::default()
        };
        assert!(sim.add_dynamic_box(flat).is_err());
    }

    #[test]
    fn test_trajectory_recording() {
        let mut sim = Simulator::new(WorldParams::default());
        sim.add_dynamic_box(BoxSpec::default()).unwrap();
        sim.record_trajectory(true);

        for _ in 0..10 {
            sim.step(DT);
        }

        assert_eq!(sim.trajectory().len(), 10);
        assert_eq!(sim.trajectory()[9], sim.object_state().unwrap());
    }
}
