//! Seeded simulation context.
//!
//! Every source of randomness in an experiment is derived from one master
//! seed, so any run is reproducible from its seed number. Sensor noise and
//! search mutations draw from separate streams: changing the search
//! strategy never changes what the ground truth reports.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::ops::Range;

/// Derives independent deterministic streams from a master seed.
#[derive(Debug, Clone)]
pub struct SimContext {
    /// Master seed for this experiment
    seed: u64,

    /// RNG for experiment setup (e.g. drawing a hidden friction)
    setup_rng: ChaCha8Rng,
}

impl SimContext {
    /// Creates a new SimContext with the given seed.
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            setup_rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// Returns the master seed.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Seed for ground-truth sensor noise.
    pub fn physics_seed(&self) -> u64 {
        self.seed.wrapping_mul(0x9e3779b97f4a7c15)
    }

    /// Seed for search strategy mutations.
    pub fn search_seed(&self) -> u64 {
        self.seed.wrapping_mul(0x517cc1b727220a95) ^ 0x3c6ef372fe94f82b
    }

    /// Draws a hidden friction uniformly from `range`.
    pub fn draw_friction(&mut self, range: Range<f64>) -> f64 {
        self.setup_rng.gen_range(range)
    }
}
