//! Simulation clock management.
//!
//! Handles time progression with support for:
//! - A user time-scale factor applied to real elapsed time
//! - Fixed frame steps for explicit single-frame stepping
//! - Rewind, floored at zero

use serde::{Deserialize, Serialize};

/// Default presenter frame rate (frames per second).
pub const DEFAULT_FRAME_RATE: f64 = 60.0;

/// Simulation clock.
///
/// Simulation time is monotone under normal play. Only explicit rewind moves
/// it backward, and never below zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimClock {
    /// Current simulation time (s).
    sim_time: f64,
    /// Multiplier from real time to simulation time.
    time_scale: f64,
    /// Frames per second assumed by explicit frame stepping.
    frame_rate: f64,
    /// Number of integration steps taken, in either direction.
    step_count: u64,
}

impl SimClock {
    /// Create a clock at time zero.
    ///
    /// Non-positive or non-finite inputs fall back to `1.0` and
    /// [`DEFAULT_FRAME_RATE`].
    #[must_use]
    pub fn new(time_scale: f64, frame_rate: f64) -> Self {
        Self {
            sim_time: 0.0,
            time_scale: positive_or(time_scale, 1.0),
            frame_rate: positive_or(frame_rate, DEFAULT_FRAME_RATE),
            step_count: 0,
        }
    }

    /// Current simulation time in seconds.
    #[must_use]
    pub const fn sim_time(&self) -> f64 {
        self.sim_time
    }

    /// Current time-scale factor.
    #[must_use]
    pub const fn time_scale(&self) -> f64 {
        self.time_scale
    }

    /// Set the time-scale factor. Non-positive or non-finite values are ignored.
    ///
    /// Returns whether the value was accepted.
    pub fn set_time_scale(&mut self, time_scale: f64) -> bool {
        if time_scale.is_finite() && time_scale > 0.0 {
            self.time_scale = time_scale;
            true
        } else {
            false
        }
    }

    /// Frames per second.
    #[must_use]
    pub const fn frame_rate(&self) -> f64 {
        self.frame_rate
    }

    /// Simulation time covered by one explicit frame step: `time_scale / frame_rate`.
    #[must_use]
    pub fn frame_dt(&self) -> f64 {
        self.time_scale / self.frame_rate
    }

    /// Simulation-time budget for `elapsed` real seconds.
    #[must_use]
    pub fn budget(&self, elapsed: f64) -> f64 {
        elapsed * self.time_scale
    }

    /// Number of integration steps taken.
    #[must_use]
    pub const fn step_count(&self) -> u64 {
        self.step_count
    }

    /// Advance simulation time by one integration step of `dt` seconds.
    pub fn advance(&mut self, dt: f64) {
        self.sim_time += dt;
        self.step_count += 1;
    }

    /// Move simulation time back by `dt`, floored at zero.
    pub fn rewind(&mut self, dt: f64) {
        self.sim_time = (self.sim_time - dt).max(0.0);
    }

    /// Apply an explicit signed frame step that took `steps` integration steps.
    ///
    /// Backward steps rewind as [`Self::rewind`] does. Every step counts
    /// toward [`Self::step_count`] whatever its direction.
    pub fn shift(&mut self, dt: f64, steps: u32) {
        if dt < 0.0 {
            self.rewind(-dt);
        } else {
            self.sim_time += dt;
        }
        self.step_count += u64::from(steps);
    }

    /// Reset time and step count to zero, keeping scale and frame rate.
    #[allow(clippy::missing_const_for_fn)] // Mutable const not stable
    pub fn reset(&mut self) {
        self.sim_time = 0.0;
        self.step_count = 0;
    }
}

impl Default for SimClock {
    fn default() -> Self {
        Self::new(1.0, DEFAULT_FRAME_RATE)
    }
}

fn positive_or(value: f64, fallback: f64) -> f64 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        fallback
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Falsification: time never goes negative under any rewind sequence.
        #[test]
        fn prop_time_never_negative(ops in proptest::collection::vec((any::<bool>(), 0.0f64..0.1), 0..100)) {
            let mut clock = SimClock::default();
            for (forward, dt) in ops {
                if forward {
                    clock.advance(dt);
                } else {
                    clock.rewind(dt);
                }
                prop_assert!(clock.sim_time() >= 0.0);
            }
        }

        /// Falsification: step count equals number of advances.
        #[test]
        fn prop_step_count_accurate(steps in 0u64..500) {
            let mut clock = SimClock::default();
            for _ in 0..steps {
                clock.advance(0.002);
            }
            prop_assert_eq!(clock.step_count(), steps);
        }
    }
}
