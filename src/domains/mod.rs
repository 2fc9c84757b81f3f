//! Domain models for the double pendulum.
//!
//! - Pendulum: parameters, state, equations of motion, energy
//! - Physics: RK4 integration and bounded sub-stepping
//! - Kinematics: angle conventions and drag inverse kinematics

pub mod kinematics;
pub mod pendulum;
pub mod physics;

pub use kinematics::{hit_test, solve_end, solve_mid, DragMode};
pub use pendulum::{
    EnergyReference, PendulumModel, PendulumParams, PendulumState, Point2, StateRate,
};
pub use physics::{Dynamics, Integrator, RK4Integrator, SubStepReport, SubStepper};
