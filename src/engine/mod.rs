//! Core simulation engine.
//!
//! [`SimContext`] owns every piece of mutable simulation state and exposes
//! the entry points a presenter calls: the per-frame [`SimContext::tick`],
//! parameter edits, playback control, drag and recording.
//!
//! Data flow per unpaused tick:
//! 1. `elapsed × time_scale` is split into bounded RK4 steps
//! 2. Jidoka checks the new state for NaN/Inf
//! 3. The end-mass position is appended to the trail
//! 4. Graph and (if armed) export recorders sample the state
//! 5. The trail is reconciled for drawing

pub mod clock;
pub mod jidoka;
pub mod rng;

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, error};

pub use clock::SimClock;
pub use jidoka::{JidokaConfig, JidokaGuard, ViolationSeverity};
pub use rng::SimRng;

use crate::config::SimConfig;
use crate::domains::kinematics::{hit_test, solve_end, solve_mid, DragMode};
use crate::domains::pendulum::{PendulumModel, PendulumParams, PendulumState, Point2};
use crate::domains::physics::SubStepper;
use crate::error::SimResult;
use crate::replay::{ExportRecorder, Sample, SampleRecorder, TrailPoint, TrailTimeline};
use crate::visualization::{Exporter, SimMetrics};

/// Outcome of one [`SimContext::tick`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TickReport {
    /// RK4 steps taken this tick.
    pub substeps: u32,
    /// Simulation time advanced this tick (s).
    pub advanced: f64,
    /// Simulation time after the tick (s).
    pub sim_time: f64,
    /// Number of trail points to draw.
    pub visible_trail: usize,
    /// Energy drift grade after the tick.
    pub severity: ViolationSeverity,
    /// Whether the graph recorder took a sample.
    pub graph_sampled: bool,
    /// Whether the export recorder took a sample.
    pub export_sampled: bool,
}

/// The explicit simulation context.
///
/// # Example
///
/// ```rust
/// use pendular::config::SimConfig;
/// use pendular::engine::SimContext;
///
/// let mut ctx = SimContext::new(SimConfig::default());
/// ctx.resume();
/// let report = ctx.tick(1.0 / 60.0).unwrap();
/// assert_eq!(report.substeps, 9);
/// ```
#[derive(Debug, Clone)]
pub struct SimContext {
    config: SimConfig,
    model: PendulumModel,
    stepper: SubStepper,
    clock: SimClock,
    trail: TrailTimeline,
    graph: SampleRecorder,
    export: ExportRecorder,
    jidoka: JidokaGuard,
    rng: SimRng,
    paused: bool,
    diverged: bool,
    drag: Option<DragMode>,
    default_damping: f64,
    frames: u64,
    jidoka_warnings: u32,
}

impl SimContext {
    /// Build a context from a validated configuration.
    #[must_use]
    pub fn new(config: SimConfig) -> Self {
        let model = PendulumModel::new(
            config.pendulum,
            config.initial.theta1,
            config.initial.theta2,
        );
        let mut trail = TrailTimeline::new(config.trail.capacity);
        trail.reset_with(model.end_point());

        let default_damping = if config.pendulum.damping > 0.0 {
            config.pendulum.damping
        } else {
            PendulumParams::default().damping
        };

        Self {
            model,
            stepper: SubStepper::new(config.integrator.max_dt),
            clock: SimClock::new(config.playback.time_scale, config.playback.frame_rate),
            trail,
            graph: SampleRecorder::new(
                config.recording.sample_interval,
                config.recording.graph_capacity,
            ),
            export: ExportRecorder::new(
                config.recording.sample_interval,
                config.recording.export_capacity,
            ),
            jidoka: JidokaGuard::new(config.jidoka),
            rng: SimRng::new(config.reproducibility.seed),
            paused: config.playback.start_paused,
            diverged: false,
            drag: None,
            default_damping,
            frames: 0,
            jidoka_warnings: 0,
            config,
        }
    }

    // ===== Per-frame =====

    /// Advance by `elapsed` real seconds, scaled by the time scale.
    ///
    /// While paused only the trail is reconciled. The caller is expected to
    /// cap `elapsed` (see `playback.max_frame_seconds`); no cap is applied here.
    ///
    /// # Errors
    ///
    /// Returns `SimError::NonFiniteValue` when the step produced NaN or Inf.
    /// The context is then paused and marked diverged, and nothing is
    /// recorded; the non-finite state is left as is for inspection.
    pub fn tick(&mut self, elapsed: f64) -> SimResult<TickReport> {
        self.frames += 1;
        let mut report = TickReport {
            substeps: 0,
            advanced: 0.0,
            sim_time: self.clock.sim_time(),
            visible_trail: 0,
            severity: ViolationSeverity::Acceptable,
            graph_sampled: false,
            export_sampled: false,
        };

        if !self.paused {
            let budget = self.clock.budget(elapsed);
            let stepped = self.stepper.advance(&mut self.model, &mut self.clock, budget);
            report.substeps = stepped.substeps;
            report.advanced = stepped.advanced;

            report.severity = match self.jidoka.check(&self.model) {
                Ok(severity) => severity,
                Err(e) => {
                    error!(sim_time = self.clock.sim_time(), error = %e, "simulation diverged");
                    self.diverged = true;
                    self.paused = true;
                    return Err(e);
                }
            };
            if report.severity >= ViolationSeverity::Warning {
                self.jidoka_warnings += 1;
            }

            self.trail.advance_forward(self.model.end_point());

            let t = self.clock.sim_time();
            let state = *self.model.state();
            report.graph_sampled = self.graph.maybe_sample(t, &state);
            report.export_sampled = self.export.maybe_sample(t, &state);
        }

        report.sim_time = self.clock.sim_time();
        report.visible_trail = self.trail.reconcile(self.paused);
        Ok(report)
    }

    // ===== Parameters =====

    /// Replace the physical parameters.
    ///
    /// Refreshes the energy reference and clears the graph recorder. The trail
    /// is reset only when a rod length changed. Values are not re-validated.
    pub fn set_params(&mut self, params: PendulumParams) {
        let lengths_changed = self.model.params().lengths_differ(&params);
        self.model.set_params(params);
        if params.damping > 0.0 {
            self.default_damping = params.damping;
        }
        self.model.refresh_energy_reference();
        self.graph.clear();
        self.jidoka.rearm();
        if lengths_changed {
            self.trail.reset_with(self.model.end_point());
        }
        debug!(?params, lengths_changed, "parameters updated");
    }

    /// Set the time-scale factor. Returns whether the value was accepted.
    pub fn set_time_scale(&mut self, time_scale: f64) -> bool {
        self.clock.set_time_scale(time_scale)
    }

    /// Move to the next configured time-scale preset, wrapping around.
    ///
    /// A scale that is not itself a preset continues from the middle preset.
    pub fn cycle_time_scale(&mut self) -> f64 {
        let presets = &self.config.controls.time_scale_presets;
        let current = self.clock.time_scale();
        #[allow(clippy::float_cmp)]
        let index = presets
            .iter()
            .position(|&s| s == current)
            .unwrap_or(presets.len() / 2);
        let next = presets
            .get((index + 1) % presets.len().max(1))
            .copied()
            .unwrap_or(current);
        self.clock.set_time_scale(next);
        self.clock.time_scale()
    }

    /// Change gravity by `delta`, clamped to the configured limits.
    pub fn adjust_gravity(&mut self, delta: f64) -> f64 {
        let controls = &self.config.controls;
        let g = (self.model.params().g + delta)
            .max(controls.gravity_min)
            .min(controls.gravity_max);
        self.set_params(PendulumParams {
            g,
            ..*self.model.params()
        });
        g
    }

    /// Configured gravity increment for [`Self::adjust_gravity`].
    #[must_use]
    pub fn gravity_step(&self) -> f64 {
        self.config.controls.gravity_step
    }

    /// Switch damping off, or back on to the last non-zero value.
    pub fn toggle_damping(&mut self) -> f64 {
        let damping = if self.model.params().damping > 0.0 {
            0.0
        } else {
            self.default_damping
        };
        self.set_params(PendulumParams {
            damping,
            ..*self.model.params()
        });
        damping
    }

    // ===== Playback =====

    /// Stop advancing on subsequent ticks.
    pub fn pause(&mut self) {
        self.paused = true;
    }

    /// Resume advancing. Refused after divergence until a reset.
    pub fn resume(&mut self) -> bool {
        if self.diverged {
            return false;
        }
        self.paused = false;
        self.drag = None;
        true
    }

    /// Toggle between paused and running. Returns the new paused flag.
    pub fn toggle_pause(&mut self) -> bool {
        if self.paused {
            self.resume();
        } else {
            self.pause();
        }
        self.paused
    }

    /// Pause, integrate one frame backward and rewind the trail one slot.
    ///
    /// # Errors
    ///
    /// Returns `SimError::NonFiniteValue` if the backward step diverged.
    pub fn step_back(&mut self) -> SimResult<()> {
        self.pause();
        if self.diverged {
            return Ok(());
        }
        let dt = self.clock.frame_dt();
        let before = self.clock.sim_time();
        let chunks = self.stepper.step_signed(&mut self.model, -dt);
        self.clock.shift(-dt, chunks);
        self.export.rebase(before, self.clock.sim_time());
        self.check_finite()?;
        self.trail.step_back(self.model.end_point());
        Ok(())
    }

    /// Pause, integrate one frame forward and advance the trail one slot.
    ///
    /// # Errors
    ///
    /// Returns `SimError::NonFiniteValue` if the forward step diverged.
    pub fn step_forward(&mut self) -> SimResult<()> {
        self.pause();
        if self.diverged {
            return Ok(());
        }
        let dt = self.clock.frame_dt();
        let chunks = self.stepper.step_signed(&mut self.model, dt);
        self.clock.shift(dt, chunks);
        self.check_finite()?;
        self.trail.advance_forward(self.model.end_point());
        Ok(())
    }

    fn check_finite(&mut self) -> SimResult<()> {
        if let Err(e) = self.jidoka.check(&self.model) {
            error!(sim_time = self.clock.sim_time(), error = %e, "simulation diverged");
            self.diverged = true;
            return Err(e);
        }
        Ok(())
    }

    // ===== Resets =====

    /// Restart from rest at the given angles. The paused flag is kept.
    pub fn reset(&mut self, theta1: f64, theta2: f64) {
        self.model.reset(theta1, theta2);
        let before = self.clock.sim_time();
        self.clock.reset();
        self.export.rebase(before, 0.0);
        self.diverged = false;
        self.drag = None;
        self.reinitialize_trajectory();
        debug!(theta1, theta2, "reset");
    }

    /// Restore the configured parameters, angles and time scale, paused.
    pub fn reset_to_defaults(&mut self) {
        self.model.set_params(self.config.pendulum);
        self.clock.set_time_scale(self.config.playback.time_scale);
        self.default_damping = if self.config.pendulum.damping > 0.0 {
            self.config.pendulum.damping
        } else {
            PendulumParams::default().damping
        };
        self.reset(self.config.initial.theta1, self.config.initial.theta2);
        self.paused = true;
    }

    /// Restart from random angles in `[-π, π)` and resume.
    pub fn randomize(&mut self) {
        let theta1 = self.rng.gen_angle();
        let theta2 = self.rng.gen_angle();
        self.reset(theta1, theta2);
        self.resume();
    }

    /// Draw new parameters and time scale from the configured ranges.
    ///
    /// Angles are kept, velocities zeroed and the trail restarted.
    pub fn randomize_params(&mut self) {
        let controls = self.config.controls.clone();
        let params = PendulumParams {
            l1: self.rng.gen_range_f64(controls.length.min, controls.length.max),
            l2: self.rng.gen_range_f64(controls.length.min, controls.length.max),
            m1: self.rng.gen_range_f64(controls.mass.min, controls.mass.max),
            m2: self.rng.gen_range_f64(controls.mass.min, controls.mass.max),
            g: self
                .rng
                .gen_range_f64(controls.gravity.min, controls.gravity.max),
            damping: self
                .rng
                .gen_range_f64(controls.damping.min, controls.damping.max),
        };
        let time_scale = self
            .rng
            .gen_range_f64(controls.time_scale.min, controls.time_scale.max);

        self.set_params(params);
        self.clock.set_time_scale(time_scale);
        self.model.stop();
        self.reinitialize_trajectory();
        debug!(?params, time_scale, "parameters randomized");
    }

    /// Restart the trail from the current end-mass position.
    pub fn clear_trail(&mut self) {
        self.trail.reset_with(self.model.end_point());
    }

    fn reinitialize_trajectory(&mut self) {
        self.model.refresh_energy_reference();
        self.jidoka.rearm();
        self.trail.reset_with(self.model.end_point());
        self.graph.clear();
    }

    // ===== Drag =====

    /// Which mass lies within `radius` of `point`; the end mass wins ties.
    #[must_use]
    pub fn pick(&self, point: Point2, radius: f64) -> Option<DragMode> {
        let (mid, end) = self.model.positions();
        hit_test(mid, end, point, radius)
    }

    /// Start dragging a mass. Only while paused.
    pub fn begin_drag(&mut self, mode: DragMode) -> bool {
        if !self.paused {
            return false;
        }
        self.drag = Some(mode);
        self.trail.reset_with(self.model.end_point());
        debug!(?mode, "drag started");
        true
    }

    /// Move the dragged mass toward `point` (model units, origin at the pivot).
    ///
    /// Velocities are zeroed, the trail restarts at the new end point, the
    /// energy reference is refreshed and the graph recorder cleared.
    pub fn update_drag(&mut self, point: Point2) -> bool {
        let Some(mode) = self.drag.filter(|_| self.paused) else {
            return false;
        };

        let state = *self.model.state();
        let (theta1, theta2) = match mode {
            DragMode::End => solve_end(point, self.model.params().l1, self.model.params().l2),
            DragMode::Mid => solve_mid(point, state.theta1, state.theta2),
        };
        self.model.place(theta1, theta2);
        self.diverged = false;
        self.reinitialize_trajectory();
        true
    }

    /// Release the drag and take a fresh energy reference.
    pub fn end_drag(&mut self) -> bool {
        if !self.paused {
            return false;
        }
        let Some(mode) = self.drag.take() else {
            return false;
        };
        self.model.refresh_energy_reference();
        debug!(?mode, "drag released");
        true
    }

    /// Mass currently being dragged.
    #[must_use]
    pub const fn dragging(&self) -> Option<DragMode> {
        self.drag
    }

    // ===== Recording =====

    /// Start a new export session, discarding any earlier one.
    pub fn arm_recording(&mut self) {
        self.export.arm();
        debug!(sim_time = self.clock.sim_time(), "export recording armed");
    }

    /// Stop the export session and return its samples.
    pub fn disarm_recording(&mut self) -> Vec<Sample> {
        let samples = self.export.disarm();
        debug!(samples = samples.len(), "export recording disarmed");
        samples
    }

    /// Whether an export session is active.
    #[must_use]
    pub const fn is_recording(&self) -> bool {
        self.export.is_armed()
    }

    /// Write the export samples to a timestamped CSV file in `dir`.
    ///
    /// # Errors
    ///
    /// Returns `SimError::Io` if the directory or file cannot be written.
    pub fn export_csv(&self, dir: &Path) -> SimResult<PathBuf> {
        Exporter::new().export_to_dir(self.export.samples(), dir)
    }

    /// Write the export samples into `dir` in `recording.export_format`.
    ///
    /// # Errors
    ///
    /// Returns `SimError::Io` or `SimError::Serialization` if writing fails.
    pub fn export_recording(&self, dir: &Path) -> SimResult<PathBuf> {
        Exporter::with_format(self.config.recording.export_format)
            .export_to_dir(self.export.samples(), dir)
    }

    // ===== Read side =====

    /// The pendulum model.
    #[must_use]
    pub const fn model(&self) -> &PendulumModel {
        &self.model
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> &PendulumState {
        self.model.state()
    }

    /// Current parameters.
    #[must_use]
    pub const fn params(&self) -> &PendulumParams {
        self.model.params()
    }

    /// Configuration the context was built from.
    #[must_use]
    pub const fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Simulation time (s).
    #[must_use]
    pub const fn sim_time(&self) -> f64 {
        self.clock.sim_time()
    }

    /// Time-scale factor.
    #[must_use]
    pub const fn time_scale(&self) -> f64 {
        self.clock.time_scale()
    }

    /// Simulation clock.
    #[must_use]
    pub const fn clock(&self) -> &SimClock {
        &self.clock
    }

    /// Whether ticks are currently ignored.
    #[must_use]
    pub const fn is_paused(&self) -> bool {
        self.paused
    }

    /// Whether a non-finite state stopped the simulation.
    #[must_use]
    pub const fn is_diverged(&self) -> bool {
        self.diverged
    }

    /// The trail timeline.
    #[must_use]
    pub const fn trail(&self) -> &TrailTimeline {
        &self.trail
    }

    /// Trail points up to the cursor.
    pub fn visible_trail(&self) -> impl Iterator<Item = &TrailPoint> + '_ {
        self.trail.visible()
    }

    /// Live graph samples, oldest first.
    pub fn graph_samples(&self) -> impl Iterator<Item = &Sample> + '_ {
        self.graph.samples().iter()
    }

    /// Export samples of the current or last session.
    pub fn export_samples(&self) -> impl Iterator<Item = &Sample> + '_ {
        self.export.samples().iter()
    }

    /// HUD readout.
    #[must_use]
    pub fn metrics(&self) -> SimMetrics {
        SimMetrics {
            time: self.clock.sim_time(),
            frames: self.frames,
            steps: self.clock.step_count(),
            time_scale: self.clock.time_scale(),
            paused: self.paused,
            diverged: self.diverged,
            state: *self.model.state(),
            params: *self.model.params(),
            total_energy: self.model.energy(),
            kinetic_energy: self.model.kinetic_energy(),
            potential_energy: self.model.potential_energy(),
            energy_drift: self.model.energy_drift(),
            drift_comparable: self.model.reference_matches_damping(),
            trail_points: self.trail.len(),
            visible_trail: self.trail.index(),
            graph_samples: self.graph.len(),
            export_samples: self.export.len(),
            recording: self.export.is_armed(),
            jidoka_warnings: self.jidoka_warnings,
        }
    }
}

impl Default for SimContext {
    fn default() -> Self {
        Self::new(SimConfig::default())
    }
}
