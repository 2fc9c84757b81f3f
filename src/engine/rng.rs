//! Deterministic random number generation.
//!
//! Randomize operations (new angles, new physical parameters) draw from a
//! seeded PCG stream so that a scenario replays identically from its seed.

use rand::prelude::*;
use rand_pcg::Pcg64;
use std::f64::consts::PI;

/// Deterministic, reproducible random number generator.
#[derive(Debug, Clone)]
pub struct SimRng {
    /// Master seed for reproducibility.
    master_seed: u64,
    /// Internal PCG state.
    rng: Pcg64,
}

impl SimRng {
    /// Create a new RNG with the given master seed.
    #[must_use]
    pub fn new(master_seed: u64) -> Self {
        Self {
            master_seed,
            rng: Pcg64::seed_from_u64(master_seed),
        }
    }

    /// Get the master seed.
    #[must_use]
    pub const fn master_seed(&self) -> u64 {
        self.master_seed
    }

    /// Generate a random f64 in [0, 1).
    pub fn gen_f64(&mut self) -> f64 {
        self.rng.gen()
    }

    /// Generate a random f64 between `a` and `b`, in either order.
    pub fn gen_range_f64(&mut self, a: f64, b: f64) -> f64 {
        let (min, max) = if a <= b { (a, b) } else { (b, a) };
        min + (max - min) * self.gen_f64()
    }

    /// Uniform angle in `[-π, π)`.
    pub fn gen_angle(&mut self) -> f64 {
        self.gen_range_f64(-PI, PI)
    }

    /// Restart the stream from the master seed.
    pub fn reseed(&mut self) {
        self.rng = Pcg64::seed_from_u64(self.master_seed);
    }
}
