//! Playback, drag and recording behaviour through the public context API.

use pendular::domains::kinematics::{reach_bounds, REACH_EPSILON};
use pendular::prelude::*;
use pendular::visualization::CSV_HEADER;
use tempfile::tempdir;

const FRAME: f64 = 1.0 / 60.0;

fn paused_context(theta1: f64, theta2: f64) -> SimContext {
    SimContext::new(SimConfig::builder().initial_angles(theta1, theta2).build())
}

#[test]
fn pausing_never_shrinks_the_visible_trail() {
    let mut ctx = paused_context(2.0, 1.0);
    ctx.resume();
    let n = 40;
    for _ in 0..n {
        ctx.tick(FRAME).unwrap();
    }
    ctx.pause();

    for _ in 0..10 {
        let report = ctx.tick(FRAME).unwrap();
        assert!(
            report.visible_trail >= n,
            "visible trail shrank to {}",
            report.visible_trail
        );
        assert_eq!(report.substeps, 0);
    }
}

#[test]
fn rewind_then_redo_restores_state_and_trail() {
    let mut ctx = paused_context(2.0, 1.0);
    ctx.resume();
    for _ in 0..30 {
        ctx.tick(FRAME).unwrap();
    }
    ctx.pause();
    ctx.tick(FRAME).unwrap();

    let before = *ctx.state();
    let time_before = ctx.sim_time();
    let trail_before: Vec<Point2> = ctx.visible_trail().copied().collect();

    ctx.step_back().unwrap();
    assert_eq!(ctx.visible_trail().count(), trail_before.len() - 1);
    ctx.step_forward().unwrap();
    ctx.tick(FRAME).unwrap();

    let after = *ctx.state();
    assert!((after.theta1 - before.theta1).abs() < 1e-9);
    assert!((after.theta2 - before.theta2).abs() < 1e-9);
    assert!((after.omega1 - before.omega1).abs() < 1e-9);
    assert!((after.omega2 - before.omega2).abs() < 1e-9);
    assert!((ctx.sim_time() - time_before).abs() < 1e-12);

    let trail_after: Vec<Point2> = ctx.visible_trail().copied().collect();
    assert_eq!(trail_after.len(), trail_before.len());
    for (a, b) in trail_after.iter().zip(&trail_before) {
        assert!(a.distance(b) < 1e-9);
    }
}

#[test]
fn repeated_rewind_stops_at_first_point() {
    let mut ctx = paused_context(1.0, 1.0);
    ctx.resume();
    for _ in 0..5 {
        ctx.tick(FRAME).unwrap();
    }
    for _ in 0..20 {
        ctx.step_back().unwrap();
    }
    assert_eq!(ctx.trail().index(), 1);
    assert!(ctx.sim_time().abs() < f64::EPSILON);
    ctx.tick(FRAME).unwrap();
    assert_eq!(ctx.visible_trail().count(), 1);
}

#[test]
fn forward_play_after_rewind_overwrites_future() {
    let mut ctx = paused_context(1.5, -0.5);
    ctx.resume();
    for _ in 0..10 {
        ctx.tick(FRAME).unwrap();
    }
    let len = ctx.trail().len();
    for _ in 0..3 {
        ctx.step_back().unwrap();
    }
    assert_eq!(ctx.trail().len(), len);
    assert_eq!(ctx.trail().index(), len - 3);

    ctx.resume();
    ctx.tick(FRAME).unwrap();
    assert_eq!(ctx.trail().len(), len);
    assert_eq!(ctx.trail().index(), len - 2);
}

#[test]
fn drag_target_beyond_reach_is_clamped() {
    let mut ctx = paused_context(0.0, 0.0);
    let (_, end) = ctx.model().positions();
    assert_eq!(ctx.pick(end, 0.2), Some(DragMode::End));
    assert!(ctx.begin_drag(DragMode::End));

    assert!(ctx.update_drag(Point2::new(1.5, 2.0)));
    let r = ctx.model().end_point().norm();
    assert!((r - (2.0 - REACH_EPSILON)).abs() < 1e-9, "radius {r}");

    assert!(ctx.update_drag(Point2::new(0.0, 0.0)));
    let (r_min, _) = reach_bounds(1.0, 1.0);
    assert!((ctx.model().end_point().norm() - r_min).abs() < 1e-9);
    assert!(ctx.end_drag());
}

#[test]
fn drag_reaches_interior_targets_exactly() {
    let mut ctx = paused_context(0.3, 0.2);
    ctx.begin_drag(DragMode::End);
    for target in [
        Point2::new(0.5, 0.5),
        Point2::new(-1.2, 0.9),
        Point2::new(0.1, -1.7),
    ] {
        ctx.update_drag(target);
        assert!(ctx.model().end_point().distance(&target) < 1e-9);
        assert!(ctx.state().omega1.abs() < f64::EPSILON);
        assert_eq!(ctx.trail().len(), 1);
    }
}

#[test]
fn export_lifecycle_and_csv() {
    let mut ctx = paused_context(2.0, 2.5);
    ctx.resume();

    // Samples before arming never reach the export.
    for _ in 0..10 {
        ctx.tick(FRAME).unwrap();
    }
    assert_eq!(ctx.export_samples().count(), 0);

    ctx.arm_recording();
    let armed_at = ctx.sim_time();
    for _ in 0..60 {
        ctx.tick(FRAME).unwrap();
    }
    let session = ctx.disarm_recording();
    let disarmed_at = ctx.sim_time();
    for _ in 0..10 {
        ctx.tick(FRAME).unwrap();
    }

    assert!(!session.is_empty());
    assert!(session.iter().all(|s| s.t > armed_at && s.t <= disarmed_at));
    assert!(session.windows(2).all(|w| w[0].t < w[1].t));
    assert_eq!(ctx.export_samples().count(), session.len());

    let dir = tempdir().unwrap();
    let path = ctx.export_csv(dir.path()).unwrap();
    let text = std::fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = text.split('\n').collect();
    assert_eq!(lines[0], CSV_HEADER);
    assert_eq!(lines.len(), session.len() + 2);
    assert_eq!(*lines.last().unwrap(), "");

    let first: Vec<&str> = lines[1].split(',').collect();
    assert_eq!(first.len(), 5);
    assert_eq!(first[0], format!("{:.6}", session[0].t));
    assert_eq!(first[1], format!("{:.10}", session[0].theta1));
    assert_eq!(first[0].split('.').nth(1).unwrap().len(), 6);
    assert!(first[1..].iter().all(|f| f.split('.').nth(1).unwrap().len() == 10));

    // Re-arming starts from empty.
    ctx.arm_recording();
    assert_eq!(ctx.export_samples().count(), 0);
}

#[test]
fn reinitializing_clears_graph_only() {
    let mut ctx = paused_context(2.0, 2.5);
    ctx.resume();
    ctx.arm_recording();
    for _ in 0..20 {
        ctx.tick(FRAME).unwrap();
    }
    let exported = ctx.export_samples().count();

    ctx.randomize_params();
    assert_eq!(ctx.graph_samples().count(), 0);
    assert_eq!(ctx.export_samples().count(), exported);

    ctx.reset(0.4, 0.4);
    assert_eq!(ctx.graph_samples().count(), 0);
    assert_eq!(ctx.export_samples().count(), exported);
}

#[test]
fn graph_recorder_respects_capacity() {
    let mut config = SimConfig::builder()
        .initial_angles(2.0, 2.5)
        .start_paused(false)
        .build();
    config.recording.graph_capacity = 25;
    let mut ctx = SimContext::new(config);

    for _ in 0..200 {
        ctx.tick(FRAME).unwrap();
    }
    let samples: Vec<Sample> = ctx.graph_samples().copied().collect();
    assert_eq!(samples.len(), 25);
    assert!(samples.windows(2).all(|w| w[0].t < w[1].t));
    assert!((samples[24].t - ctx.sim_time()).abs() < 2.0 * FRAME);
}

#[test]
fn export_session_continues_across_randomize() {
    let mut ctx = paused_context(2.0, 2.5);
    ctx.resume();
    ctx.arm_recording();
    for _ in 0..300 {
        ctx.tick(FRAME).unwrap();
    }
    let before = ctx.export_samples().count();
    assert_eq!(before, 300);

    ctx.randomize();
    assert!(ctx.sim_time().abs() < f64::EPSILON);
    for _ in 0..240 {
        ctx.tick(FRAME).unwrap();
    }

    let session = ctx.disarm_recording();
    assert_eq!(session.len(), before + 240);
    assert!(
        session.windows(2).all(|w| w[0].t < w[1].t),
        "export timestamps went backward"
    );
    let last = session.last().unwrap().t;
    assert!((last - 540.0 * FRAME).abs() < 1e-6, "last t = {last}");
}
