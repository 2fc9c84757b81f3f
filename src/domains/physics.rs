//! Numerical integration for the pendulum.
//!
//! Implements:
//! - RK4 (classical, 4th order) behind the [`Integrator`] seam
//! - [`SubStepper`], which splits a frame budget into bounded RK4 steps
//!
//! # Sub-stepping
//!
//! The frame budget is `elapsed × time_scale` and can be arbitrarily large.
//! Chaotic dynamics punish large steps, so every budget is consumed in steps
//! of at most `max_dt`, the last one partial.

use serde::{Deserialize, Serialize};

use crate::domains::pendulum::{PendulumModel, PendulumState, StateRate};
use crate::engine::clock::SimClock;

/// Default upper bound on a single integration step (s).
pub const DEFAULT_MAX_DT: f64 = 0.002;

/// A system that can report its state derivative.
pub trait Dynamics {
    /// Time derivative of `state`. Must not mutate anything.
    fn derivatives(&self, state: &PendulumState) -> StateRate;
}

/// Numerical integrator trait.
pub trait Integrator {
    /// Advance `state` by `dt` under `dynamics`. A negative `dt` integrates backward.
    fn step(&self, dynamics: &dyn Dynamics, state: &mut PendulumState, dt: f64);

    /// Get the error order of this integrator.
    fn error_order(&self) -> u32;
}

/// Classical fourth-order Runge-Kutta integrator.
///
/// Fourth-order accurate, non-symplectic. Energy drift stays bounded for
/// step sizes at or below [`DEFAULT_MAX_DT`] but is not exactly zero.
///
/// Algorithm:
/// ```text
/// k1 = f(y_n)
/// k2 = f(y_n + h/2 * k1)
/// k3 = f(y_n + h/2 * k2)
/// k4 = f(y_n + h * k3)
///
/// y_{n+1} = y_n + h/6 * (k1 + 2*k2 + 2*k3 + k4)
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct RK4Integrator;

impl RK4Integrator {
    /// Create a new RK4 integrator.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Integrator for RK4Integrator {
    fn step(&self, dynamics: &dyn Dynamics, state: &mut PendulumState, dt: f64) {
        let half_dt = dt / 2.0;
        let initial = *state;

        let k1 = dynamics.derivatives(&initial);
        let k2 = dynamics.derivatives(&initial.advanced(&k1, half_dt));
        let k3 = dynamics.derivatives(&initial.advanced(&k2, half_dt));
        let k4 = dynamics.derivatives(&initial.advanced(&k3, dt));

        *state = initial.advanced(&StateRate::rk4_average(&k1, &k2, &k3, &k4), dt);
    }

    fn error_order(&self) -> u32 {
        4
    }
}

/// Outcome of a sub-stepped advance.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SubStepReport {
    /// Number of RK4 steps taken.
    pub substeps: u32,
    /// Simulation time actually advanced (s).
    pub advanced: f64,
}

/// Splits a time budget into RK4 steps of at most `max_dt`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SubStepper {
    max_dt: f64,
}

impl Default for SubStepper {
    fn default() -> Self {
        Self {
            max_dt: DEFAULT_MAX_DT,
        }
    }
}

impl SubStepper {
    /// Create a sub-stepper. A non-positive or non-finite `max_dt` falls back
    /// to [`DEFAULT_MAX_DT`].
    #[must_use]
    pub fn new(max_dt: f64) -> Self {
        if max_dt.is_finite() && max_dt > 0.0 {
            Self { max_dt }
        } else {
            Self::default()
        }
    }

    /// Largest single step.
    #[must_use]
    pub const fn max_dt(&self) -> f64 {
        self.max_dt
    }

    /// Consume `budget` seconds of simulation time.
    ///
    /// Each step is `min(remaining, max_dt)` and advances `clock` by the same
    /// amount. A non-positive or non-finite budget is a no-op, as is one so
    /// large that a `max_dt` step cannot reduce it. This never steps backward,
    /// and the step count never exceeds [`Self::step_bound`].
    pub fn advance(
        &self,
        model: &mut PendulumModel,
        clock: &mut SimClock,
        budget: f64,
    ) -> SubStepReport {
        let mut report = SubStepReport::default();
        if !self.can_drain(budget) {
            return report;
        }

        let bound = self.step_bound(budget);
        let mut remaining = budget;
        while remaining > 0.0 && report.substeps < bound {
            let dt = remaining.min(self.max_dt);
            model.step(dt);
            clock.advance(dt);
            remaining -= dt;
            report.substeps += 1;
            report.advanced += dt;
        }
        report
    }

    /// Integrate a signed frame step in chunks of at most `max_dt`.
    ///
    /// Used by explicit single-frame stepping in either direction. The clock
    /// is left to the caller. Returns the number of chunks taken.
    pub fn step_signed(&self, model: &mut PendulumModel, dt: f64) -> u32 {
        if !self.can_drain(dt.abs()) {
            return 0;
        }

        let direction = dt.signum();
        let bound = self.step_bound(dt.abs());
        let mut remaining = dt.abs();
        let mut chunks = 0;
        while remaining > 0.0 && chunks < bound {
            let h = remaining.min(self.max_dt);
            model.step(direction * h);
            remaining -= h;
            chunks += 1;
        }
        chunks
    }

    /// Upper bound on steps for a budget.
    ///
    /// Rounding in the remaining-time subtraction can add one tiny final step,
    /// hence `ceil(budget / max_dt) + 1`. Saturates at `u32::MAX`.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn step_bound(&self, budget: f64) -> u32 {
        if budget > 0.0 {
            ((budget / self.max_dt).ceil() as u32).saturating_add(1)
        } else {
            0
        }
    }

    /// Whether stepping at `max_dt` makes progress on `budget`.
    fn can_drain(&self, budget: f64) -> bool {
        budget > 0.0 && budget.is_finite() && budget - self.max_dt < budget
    }
}
