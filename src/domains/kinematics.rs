//! Angle conventions and drag inverse kinematics.
//!
//! Joint angles are measured from the downward vertical, while `atan2`
//! bearings are measured from the positive x-axis. The two conversion
//! functions below are the only place that offset is applied.

use serde::{Deserialize, Serialize};
use std::f64::consts::{FRAC_PI_2, PI, TAU};

use crate::domains::pendulum::Point2;

/// Radial margin keeping end-mass targets strictly inside the reachable annulus.
pub const REACH_EPSILON: f64 = 1e-4;

/// Joint angle (from vertical) to `atan2` bearing (from +x).
#[must_use]
pub fn to_screen_angle(theta: f64) -> f64 {
    FRAC_PI_2 - theta
}

/// `atan2` bearing (from +x) to joint angle (from vertical).
#[must_use]
pub fn from_screen_angle(bearing: f64) -> f64 {
    FRAC_PI_2 - bearing
}

/// Wrap an angle into `(-π, π]`.
#[must_use]
pub fn wrap_angle(angle: f64) -> f64 {
    let wrapped = (angle + PI).rem_euclid(TAU) - PI;
    if wrapped <= -PI {
        wrapped + TAU
    } else {
        wrapped
    }
}

/// Clamp `value` into `[lo, hi]`. NaN passes through unchanged.
#[must_use]
pub fn clamp(value: f64, lo: f64, hi: f64) -> f64 {
    if value < lo {
        lo
    } else if value > hi {
        hi
    } else {
        value
    }
}

/// Which mass a drag gesture moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DragMode {
    /// Full two-link IK on the end mass.
    End,
    /// Re-aim the first link, keeping the elbow shape.
    Mid,
}

/// Pick the mass under `point`, if any. The end mass wins when both are in range.
#[must_use]
pub fn hit_test(mid: Point2, end: Point2, point: Point2, radius: f64) -> Option<DragMode> {
    if point.distance(&end) < radius {
        Some(DragMode::End)
    } else if point.distance(&mid) < radius {
        Some(DragMode::Mid)
    } else {
        None
    }
}

/// Reachable radius range `[|l1 - l2| + ε, l1 + l2 - ε]` for the end mass.
#[must_use]
pub fn reach_bounds(l1: f64, l2: f64) -> (f64, f64) {
    ((l1 - l2).abs() + REACH_EPSILON, l1 + l2 - REACH_EPSILON)
}

/// Two-link inverse kinematics for the end mass.
///
/// The target radius is clamped into [`reach_bounds`], so every target
/// yields a solution. Returns `(theta1, theta2)` in the joint convention.
#[must_use]
pub fn solve_end(target: Point2, l1: f64, l2: f64) -> (f64, f64) {
    let (r_min, r_max) = reach_bounds(l1, l2);
    let r = target.norm().max(r_min).min(r_max);

    let cos_elbow = clamp((r * r - l1 * l1 - l2 * l2) / (2.0 * l1 * l2), -1.0, 1.0);
    let elbow = cos_elbow.acos();

    let bearing = target.y.atan2(target.x);
    let a1 = bearing - (l2 * elbow.sin()).atan2(l1 + l2 * elbow.cos());
    let a2 = a1 + elbow;

    (from_screen_angle(a1), from_screen_angle(a2))
}

/// Re-aim the first link at `target`, keeping `theta2 - theta1` unchanged.
#[must_use]
pub fn solve_mid(target: Point2, theta1: f64, theta2: f64) -> (f64, f64) {
    let elbow = theta2 - theta1;
    let new_theta1 = wrap_angle(from_screen_angle(target.y.atan2(target.x)));
    (new_theta1, new_theta1 + elbow)
}
