//! Gap-sampled state recorders.
//!
//! Physics runs at up to 500 Hz; recorders keep at most one sample per
//! `interval` of simulation time. Two instances live side by side:
//! - the graph recorder, cleared whenever the trajectory is reinitialized
//! - the [`ExportRecorder`], cleared only when a recording session is armed
//!
//! Sub-stepped frame times land a few ulps off the nominal gap, so the gap
//! check allows [`SAMPLE_TIME_TOLERANCE`] of slack.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use crate::domains::pendulum::PendulumState;

/// Default minimum simulation time between samples (s).
pub const DEFAULT_SAMPLE_INTERVAL: f64 = 1.0 / 60.0;

/// Default maximum number of retained samples.
pub const DEFAULT_SAMPLE_CAPACITY: usize = 12_000;

/// Slack in the gap check for accumulated rounding in simulation time (s).
pub const SAMPLE_TIME_TOLERANCE: f64 = 1e-9;

/// One recorded snapshot of the state.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Simulation time (s).
    pub t: f64,
    /// First rod angle (rad).
    pub theta1: f64,
    /// Second rod angle (rad).
    pub theta2: f64,
    /// First rod angular velocity (rad/s).
    pub omega1: f64,
    /// Second rod angular velocity (rad/s).
    pub omega2: f64,
}

impl Sample {
    /// Snapshot `state` at time `t`.
    #[must_use]
    pub const fn new(t: f64, state: &PendulumState) -> Self {
        Self {
            t,
            theta1: state.theta1,
            theta2: state.theta2,
            omega1: state.omega1,
            omega2: state.omega2,
        }
    }
}

/// Rolling, gap-sampled buffer of [`Sample`]s.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SampleRecorder {
    samples: VecDeque<Sample>,
    interval: f64,
    capacity: usize,
    /// Time of the last accepted sample; `None` right after a clear.
    last_sample_time: Option<f64>,
}

impl SampleRecorder {
    /// Create a recorder with the given gap and capacity (minimum 1).
    #[must_use]
    pub fn new(interval: f64, capacity: usize) -> Self {
        Self {
            samples: VecDeque::new(),
            interval: interval.max(0.0),
            capacity: capacity.max(1),
            last_sample_time: None,
        }
    }

    /// Record `state` at `t` if at least `interval` has passed since the last
    /// sample. The first call after a clear always records.
    ///
    /// Returns whether a sample was taken.
    pub fn maybe_sample(&mut self, t: f64, state: &PendulumState) -> bool {
        if let Some(last) = self.last_sample_time {
            if t - last + SAMPLE_TIME_TOLERANCE < self.interval {
                return false;
            }
        }

        if self.samples.len() >= self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(Sample::new(t, state));
        self.last_sample_time = Some(t);
        true
    }

    /// Drop every sample and restart the gap clock.
    pub fn clear(&mut self) {
        self.samples.clear();
        self.last_sample_time = None;
    }

    /// Retained samples, oldest first.
    #[must_use]
    pub const fn samples(&self) -> &VecDeque<Sample> {
        &self.samples
    }

    /// Most recent sample.
    #[must_use]
    pub fn latest(&self) -> Option<&Sample> {
        self.samples.back()
    }

    /// Minimum time between samples.
    #[must_use]
    pub const fn interval(&self) -> f64 {
        self.interval
    }

    /// Maximum number of retained samples.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of retained samples.
    #[must_use]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Check if empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

impl Default for SampleRecorder {
    fn default() -> Self {
        Self::new(DEFAULT_SAMPLE_INTERVAL, DEFAULT_SAMPLE_CAPACITY)
    }
}

/// Recorder for file export, active only between `arm` and `disarm`.
///
/// Samples are stamped with session time: simulation time plus the total
/// distance the clock was moved back (resets, rewinds) since `arm`. Session
/// time never decreases, so a session stays in time order across resets.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExportRecorder {
    recorder: SampleRecorder,
    armed: bool,
    offset: f64,
}

impl ExportRecorder {
    /// Create a disarmed export recorder.
    #[must_use]
    pub fn new(interval: f64, capacity: usize) -> Self {
        Self {
            recorder: SampleRecorder::new(interval, capacity),
            armed: false,
            offset: 0.0,
        }
    }

    /// Start a new session. Samples from any earlier session are discarded.
    pub fn arm(&mut self) {
        self.recorder.clear();
        self.offset = 0.0;
        self.armed = true;
    }

    /// Note that the simulation clock jumped from `from` to `to`.
    ///
    /// A backward jump is absorbed into the session offset; forward jumps
    /// need no correction.
    pub fn rebase(&mut self, from: f64, to: f64) {
        if self.armed && to < from {
            self.offset += from - to;
        }
    }

    /// Session time corresponding to simulation time `t`.
    #[must_use]
    pub fn session_time(&self, t: f64) -> f64 {
        t + self.offset
    }

    /// Stop recording and return the session's samples in time order.
    ///
    /// The samples stay readable through [`Self::samples`] until the next `arm`.
    pub fn disarm(&mut self) -> Vec<Sample> {
        self.armed = false;
        self.recorder.samples().iter().copied().collect()
    }

    /// Whether a session is active.
    #[must_use]
    pub const fn is_armed(&self) -> bool {
        self.armed
    }

    /// Sample at simulation time `t` while armed; a no-op otherwise.
    pub fn maybe_sample(&mut self, t: f64, state: &PendulumState) -> bool {
        let session_time = self.session_time(t);
        self.armed && self.recorder.maybe_sample(session_time, state)
    }

    /// Samples of the current or most recent session.
    #[must_use]
    pub const fn samples(&self) -> &VecDeque<Sample> {
        self.recorder.samples()
    }

    /// Number of recorded samples.
    #[must_use]
    pub fn len(&self) -> usize {
        self.recorder.len()
    }

    /// Check if empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.recorder.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn state(theta1: f64) -> PendulumState {
        PendulumState {
            theta1,
            theta2: -theta1,
            omega1: 0.5,
            omega2: -0.5,
        }
    }

    #[test]
    fn test_first_sample_always_taken() {
        let mut recorder = SampleRecorder::default();
        assert!(recorder.maybe_sample(5.0, &state(0.1)));
        assert_eq!(recorder.len(), 1);

        let sample = recorder.latest().unwrap();
        assert!((sample.t - 5.0).abs() < f64::EPSILON);
        assert!((sample.theta2 + 0.1).abs() < f64::EPSILON);
    }

    #[test]
    fn test_gap_sampling() {
        let mut recorder = SampleRecorder::new(0.1, 100);
        assert!(recorder.maybe_sample(0.0, &state(0.0)));
        assert!(!recorder.maybe_sample(0.05, &state(0.0)));
        assert!(!recorder.maybe_sample(0.099, &state(0.0)));
        assert!(recorder.maybe_sample(0.1, &state(0.0)));
        assert!(recorder.maybe_sample(0.25, &state(0.0)));
        assert_eq!(recorder.len(), 3);
    }

    #[test]
    fn test_physics_rate_is_decimated() {
        // 500 Hz steps for one second yield about 60 samples.
        let mut recorder = SampleRecorder::default();
        let mut taken = 0;
        for i in 0..=500 {
            if recorder.maybe_sample(f64::from(i) * 0.002, &state(0.0)) {
                taken += 1;
            }
        }
        assert!((55..=61).contains(&taken), "taken={taken}");
    }

    #[test]
    fn test_gap_tolerates_rounding() {
        // Nine sub-steps of a 1/60 s frame sum to a hair under the interval.
        let mut recorder = SampleRecorder::default();
        let mut t = 0.0;
        let mut taken = 0;
        for _ in 0..60 {
            for _ in 0..8 {
                t += 0.002;
            }
            t += DEFAULT_SAMPLE_INTERVAL - 8.0 * 0.002;
            if recorder.maybe_sample(t, &state(0.0)) {
                taken += 1;
            }
        }
        assert_eq!(taken, 60);
        assert!(!recorder.maybe_sample(t + DEFAULT_SAMPLE_INTERVAL * 0.5, &state(0.0)));
    }

    #[test]
    fn test_time_going_backward_waits() {
        let mut recorder = SampleRecorder::new(0.1, 100);
        recorder.maybe_sample(1.0, &state(0.0));
        assert!(!recorder.maybe_sample(0.5, &state(0.0)));
        assert!(recorder.maybe_sample(1.1, &state(0.0)));
    }

    #[test]
    fn test_capacity_drops_oldest() {
        let mut recorder = SampleRecorder::new(0.0, 3);
        for i in 0..5 {
            recorder.maybe_sample(f64::from(i), &state(f64::from(i)));
        }
        let times: Vec<f64> = recorder.samples().iter().map(|s| s.t).collect();
        assert_eq!(times, vec![2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_clear_restarts_gap_clock() {
        let mut recorder = SampleRecorder::new(1.0, 10);
        recorder.maybe_sample(0.0, &state(0.0));
        recorder.clear();
        assert!(recorder.is_empty());
        assert!(recorder.maybe_sample(0.1, &state(0.0)));
    }

    #[test]
    fn test_export_ignores_samples_when_disarmed() {
        let mut export = ExportRecorder::default();
        assert!(!export.maybe_sample(0.0, &state(0.0)));
        assert!(export.is_empty());
        assert!(!export.is_armed());
    }

    #[test]
    fn test_export_session_lifecycle() {
        let mut export = ExportRecorder::new(0.1, 100);
        export.arm();
        export.maybe_sample(0.0, &state(0.1));
        export.maybe_sample(0.2, &state(0.2));

        let session = export.disarm();
        assert_eq!(session.len(), 2);
        assert!(session[0].t < session[1].t);

        // Readable after disarm, no longer growing.
        assert!(!export.maybe_sample(0.4, &state(0.3)));
        assert_eq!(export.samples().len(), 2);

        // A new session starts empty.
        export.arm();
        assert!(export.is_empty());
        export.maybe_sample(10.0, &state(0.0));
        assert_eq!(export.disarm().len(), 1);
    }

    #[test]
    fn test_export_session_time_survives_clock_reset() {
        let mut export = ExportRecorder::new(0.1, 100);
        export.arm();
        assert!(export.maybe_sample(0.0, &state(0.0)));
        assert!(export.maybe_sample(2.0, &state(0.0)));

        // Clock reset to zero, then play resumes.
        export.rebase(2.0, 0.0);
        assert!((export.session_time(0.5) - 2.5).abs() < 1e-12);
        assert!(export.maybe_sample(0.5, &state(0.1)));
        assert!(export.maybe_sample(0.7, &state(0.2)));

        let times: Vec<f64> = export.samples().iter().map(|s| s.t).collect();
        assert_eq!(times.len(), 4);
        assert!(times.windows(2).all(|w| w[0] < w[1]), "{times:?}");

        // Forward jumps and jumps while disarmed leave the offset alone.
        export.rebase(0.7, 5.0);
        assert!((export.session_time(1.0) - 3.0).abs() < 1e-12);
        export.disarm();
        export.rebase(1.0, 0.0);
        assert!((export.session_time(1.0) - 3.0).abs() < 1e-12);

        // A new session starts on plain simulation time.
        export.arm();
        assert!((export.session_time(1.0) - 1.0).abs() < f64::EPSILON);
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Retained samples never exceed capacity and stay in time order.
        #[test]
        fn prop_capacity_and_order(
            capacity in 1usize..50,
            steps in proptest::collection::vec(0.0f64..0.05, 0..300),
        ) {
            let mut recorder = SampleRecorder::new(DEFAULT_SAMPLE_INTERVAL, capacity);
            let mut t = 0.0;
            for dt in steps {
                t += dt;
                recorder.maybe_sample(t, &PendulumState::default());
                prop_assert!(recorder.len() <= capacity);
            }
            let times: Vec<f64> = recorder.samples().iter().map(|s| s.t).collect();
            prop_assert!(times
                .windows(2)
                .all(|w| w[1] - w[0] + SAMPLE_TIME_TOLERANCE >= DEFAULT_SAMPLE_INTERVAL));
        }
    }
}
