//! Double pendulum model.
//!
//! Two point masses on two massless rods hanging from the origin:
//! - Angles are measured from the downward vertical
//! - `y` grows downward, so potential energy is `-g (m1 y1 + m2 y2)`
//! - Linear viscous damping acts independently at each joint
//!
//! The equations of motion are the closed-form Lagrangian accelerations.
//! No special case is made for degenerate parameter sets; a blow-up shows up
//! as a non-finite state that the Jidoka guard reports.

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::domains::physics::{Dynamics, Integrator, RK4Integrator};
use crate::error::{SimError, SimResult};

/// Physical parameters of the double pendulum.
///
/// Missing fields in a YAML section fall back to the defaults.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default, deny_unknown_fields)]
pub struct PendulumParams {
    /// Mass of the middle bob (kg).
    #[validate(range(min = 0.0))]
    pub m1: f64,
    /// Mass of the end bob (kg).
    #[validate(range(min = 0.0))]
    pub m2: f64,
    /// Length of the first rod (m).
    #[validate(range(min = 0.0))]
    pub l1: f64,
    /// Length of the second rod (m).
    #[validate(range(min = 0.0))]
    pub l2: f64,
    /// Gravitational acceleration (m/s²).
    #[validate(range(min = 0.0))]
    pub g: f64,
    /// Viscous damping coefficient per joint (1/s).
    #[validate(range(min = 0.0))]
    pub damping: f64,
}

impl Default for PendulumParams {
    fn default() -> Self {
        Self {
            m1: 1.0,
            m2: 1.0,
            l1: 1.0,
            l2: 1.0,
            g: 9.81,
            damping: 0.01,
        }
    }
}

impl PendulumParams {
    /// Undamped parameters with otherwise default values.
    #[must_use]
    pub fn undamped() -> Self {
        Self {
            damping: 0.0,
            ..Default::default()
        }
    }

    /// Check the strict positivity the equations of motion rely on.
    ///
    /// # Errors
    ///
    /// Returns `SimError::Config` for a non-positive mass, length or gravity,
    /// or a negative damping coefficient.
    pub fn check(&self) -> SimResult<()> {
        let positive = [
            ("m1", self.m1),
            ("m2", self.m2),
            ("l1", self.l1),
            ("l2", self.l2),
            ("g", self.g),
        ];
        for (name, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(SimError::config(format!(
                    "{name} must be strictly positive, got {value}"
                )));
            }
        }
        if !(self.damping.is_finite() && self.damping >= 0.0) {
            return Err(SimError::config(format!(
                "damping must be non-negative, got {}",
                self.damping
            )));
        }
        Ok(())
    }

    /// Whether either rod length differs from `other`.
    ///
    /// Trail points are only valid for the lengths they were computed with.
    #[must_use]
    #[allow(clippy::float_cmp)]
    pub fn lengths_differ(&self, other: &Self) -> bool {
        self.l1 != other.l1 || self.l2 != other.l2
    }

    /// Combined reach of both rods.
    #[must_use]
    pub fn reach(&self) -> f64 {
        self.l1 + self.l2
    }
}

/// Kinematic state: joint angles (rad) and angular velocities (rad/s).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PendulumState {
    /// Angle of the first rod from the downward vertical.
    pub theta1: f64,
    /// Angle of the second rod from the downward vertical.
    pub theta2: f64,
    /// Angular velocity of the first rod.
    pub omega1: f64,
    /// Angular velocity of the second rod.
    pub omega2: f64,
}

impl PendulumState {
    /// State at rest with the given angles.
    #[must_use]
    pub const fn at_rest(theta1: f64, theta2: f64) -> Self {
        Self {
            theta1,
            theta2,
            omega1: 0.0,
            omega2: 0.0,
        }
    }

    /// `self + h * rate`, the Runge-Kutta stage update.
    #[must_use]
    pub fn advanced(&self, rate: &StateRate, h: f64) -> Self {
        Self {
            theta1: self.theta1 + h * rate.dtheta1,
            theta2: self.theta2 + h * rate.dtheta2,
            omega1: self.omega1 + h * rate.domega1,
            omega2: self.omega2 + h * rate.domega2,
        }
    }

    /// Check that every component is finite.
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.theta1.is_finite()
            && self.theta2.is_finite()
            && self.omega1.is_finite()
            && self.omega2.is_finite()
    }

    /// Name of the first non-finite component, if any.
    #[must_use]
    pub fn first_non_finite(&self) -> Option<&'static str> {
        [
            ("theta1", self.theta1),
            ("theta2", self.theta2),
            ("omega1", self.omega1),
            ("omega2", self.omega2),
        ]
        .into_iter()
        .find(|(_, v)| !v.is_finite())
        .map(|(name, _)| name)
    }

    /// Zero both angular velocities.
    pub fn stop(&mut self) {
        self.omega1 = 0.0;
        self.omega2 = 0.0;
    }
}

/// Time derivative of a [`PendulumState`].
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct StateRate {
    /// dθ1/dt.
    pub dtheta1: f64,
    /// dθ2/dt.
    pub dtheta2: f64,
    /// dω1/dt.
    pub domega1: f64,
    /// dω2/dt.
    pub domega2: f64,
}

impl StateRate {
    /// Weighted RK4 combination `(k1 + 2 k2 + 2 k3 + k4) / 6`.
    #[must_use]
    pub fn rk4_average(k1: &Self, k2: &Self, k3: &Self, k4: &Self) -> Self {
        let avg = |a: f64, b: f64, c: f64, d: f64| (a + 2.0 * b + 2.0 * c + d) / 6.0;
        Self {
            dtheta1: avg(k1.dtheta1, k2.dtheta1, k3.dtheta1, k4.dtheta1),
            dtheta2: avg(k1.dtheta2, k2.dtheta2, k3.dtheta2, k4.dtheta2),
            domega1: avg(k1.domega1, k2.domega1, k3.domega1, k4.domega1),
            domega2: avg(k1.domega2, k2.domega2, k3.domega2, k4.domega2),
        }
    }
}

impl Dynamics for PendulumParams {
    fn derivatives(&self, state: &PendulumState) -> StateRate {
        let Self {
            m1,
            m2,
            l1,
            l2,
            g,
            damping,
        } = *self;
        let PendulumState {
            theta1,
            theta2,
            omega1,
            omega2,
        } = *state;

        let delta = theta2 - theta1;
        let (sin_d, cos_d) = delta.sin_cos();
        let m_total = m1 + m2;

        let den1 = m_total * l1 - m2 * l1 * cos_d * cos_d;
        let den2 = (l2 / l1) * den1;

        let mut domega1 = (m2 * l1 * omega1 * omega1 * sin_d * cos_d
            + m2 * g * theta2.sin() * cos_d
            + m2 * l2 * omega2 * omega2 * sin_d
            - m_total * g * theta1.sin())
            / den1;

        let mut domega2 = (-m2 * l2 * omega2 * omega2 * sin_d * cos_d
            + m_total
                * (g * theta1.sin() * cos_d - l1 * omega1 * omega1 * sin_d - g * theta2.sin()))
            / den2;

        domega1 -= damping * omega1;
        domega2 -= damping * omega2;

        StateRate {
            dtheta1: omega1,
            dtheta2: omega2,
            domega1,
            domega2,
        }
    }
}

/// Cartesian point in model units (origin at the pivot, `y` down).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point2 {
    /// Horizontal coordinate.
    pub x: f64,
    /// Vertical coordinate, growing downward.
    pub y: f64,
}

impl Point2 {
    /// Create a new point.
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Distance from the origin.
    #[must_use]
    pub fn norm(&self) -> f64 {
        self.x.hypot(self.y)
    }

    /// Distance to another point.
    #[must_use]
    pub fn distance(&self, other: &Self) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

/// Snapshot of total energy taken when the state was last frozen.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EnergyReference {
    /// Total mechanical energy (J).
    pub energy: f64,
    /// Damping coefficient in effect when the snapshot was taken.
    pub damping: f64,
}

/// Double pendulum: parameters, state and energy reference.
#[derive(Debug, Clone)]
pub struct PendulumModel {
    params: PendulumParams,
    state: PendulumState,
    energy_reference: Option<EnergyReference>,
    integrator: RK4Integrator,
}

impl PendulumModel {
    /// Create a model resting at the given angles.
    #[must_use]
    pub fn new(params: PendulumParams, theta1: f64, theta2: f64) -> Self {
        let mut model = Self {
            params,
            state: PendulumState::at_rest(theta1, theta2),
            energy_reference: None,
            integrator: RK4Integrator::new(),
        };
        model.refresh_energy_reference();
        model
    }

    /// Physical parameters.
    #[must_use]
    pub const fn params(&self) -> &PendulumParams {
        &self.params
    }

    /// Current kinematic state.
    #[must_use]
    pub const fn state(&self) -> &PendulumState {
        &self.state
    }

    /// Replace the physical parameters. The state is left untouched.
    pub fn set_params(&mut self, params: PendulumParams) {
        self.params = params;
    }

    /// Angular accelerations for an arbitrary state under the current parameters.
    #[must_use]
    pub fn derivatives(&self, state: &PendulumState) -> StateRate {
        self.params.derivatives(state)
    }

    /// Advance the state by a single RK4 step of size `dt`.
    ///
    /// `dt` is not clamped; a negative value integrates backward.
    pub fn step(&mut self, dt: f64) {
        self.integrator.step(&self.params, &mut self.state, dt);
    }

    /// Forward kinematics: positions of the middle and end masses.
    #[must_use]
    pub fn positions(&self) -> (Point2, Point2) {
        let (s1, c1) = self.state.theta1.sin_cos();
        let (s2, c2) = self.state.theta2.sin_cos();
        let mid = Point2::new(self.params.l1 * s1, self.params.l1 * c1);
        let end = Point2::new(mid.x + self.params.l2 * s2, mid.y + self.params.l2 * c2);
        (mid, end)
    }

    /// Position of the end mass.
    #[must_use]
    pub fn end_point(&self) -> Point2 {
        self.positions().1
    }

    /// Cartesian velocities of the middle and end masses.
    #[must_use]
    pub fn velocities(&self) -> (Point2, Point2) {
        let PendulumState {
            theta1,
            theta2,
            omega1,
            omega2,
        } = self.state;
        let (s1, c1) = theta1.sin_cos();
        let (s2, c2) = theta2.sin_cos();
        let v1 = Point2::new(self.params.l1 * omega1 * c1, -self.params.l1 * omega1 * s1);
        let v2 = Point2::new(
            v1.x + self.params.l2 * omega2 * c2,
            v1.y - self.params.l2 * omega2 * s2,
        );
        (v1, v2)
    }

    /// Kinetic energy of both masses (J).
    #[must_use]
    pub fn kinetic_energy(&self) -> f64 {
        let PendulumParams { m1, m2, l1, l2, .. } = self.params;
        let PendulumState {
            theta1,
            theta2,
            omega1,
            omega2,
        } = self.state;

        let v1_sq = (l1 * omega1).powi(2);
        let v2_sq = v1_sq
            + (l2 * omega2).powi(2)
            + 2.0 * l1 * l2 * omega1 * omega2 * (theta1 - theta2).cos();

        0.5 * m1 * v1_sq + 0.5 * m2 * v2_sq
    }

    /// Potential energy referenced to the pivot (J).
    #[must_use]
    pub fn potential_energy(&self) -> f64 {
        let (mid, end) = self.positions();
        -self.params.g * (self.params.m1 * mid.y + self.params.m2 * end.y)
    }

    /// Total mechanical energy `T + V` (J).
    #[must_use]
    pub fn energy(&self) -> f64 {
        self.kinetic_energy() + self.potential_energy()
    }

    /// Set both angles, zero both velocities and refresh the energy reference.
    pub fn reset(&mut self, theta1: f64, theta2: f64) {
        self.state = PendulumState::at_rest(theta1, theta2);
        self.refresh_energy_reference();
    }

    /// Overwrite both angles and stop motion, as a drag does.
    ///
    /// The energy reference is left to the caller.
    pub fn place(&mut self, theta1: f64, theta2: f64) {
        self.state = PendulumState::at_rest(theta1, theta2);
    }

    /// Zero both angular velocities, keeping the angles.
    pub fn stop(&mut self) {
        self.state.stop();
    }

    /// Take a fresh energy snapshot of the current state.
    pub fn refresh_energy_reference(&mut self) {
        self.energy_reference = Some(EnergyReference {
            energy: self.energy(),
            damping: self.params.damping,
        });
    }

    /// Current energy reference, if one has been taken.
    #[must_use]
    pub const fn energy_reference(&self) -> Option<EnergyReference> {
        self.energy_reference
    }

    /// Energy change since the reference snapshot (J).
    #[must_use]
    pub fn energy_drift(&self) -> Option<f64> {
        self.energy_reference.map(|r| self.energy() - r.energy)
    }

    /// Whether the reference was taken under the damping now in effect.
    #[must_use]
    #[allow(clippy::float_cmp)]
    pub fn reference_matches_damping(&self) -> bool {
        self.energy_reference
            .is_some_and(|r| r.damping == self.params.damping)
    }
}

impl Default for PendulumModel {
    fn default() -> Self {
        Self::new(
            PendulumParams::default(),
            std::f64::consts::FRAC_PI_2,
            std::f64::consts::FRAC_PI_2,
        )
    }
}
