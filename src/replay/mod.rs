//! Replay: the rewindable trail, sample recording and trajectory fingerprints.
//!
//! Implements:
//! - [`TrailTimeline`]: bounded end-mass history with rewind and redo-by-overwrite
//! - [`SampleRecorder`] / [`ExportRecorder`]: gap-sampled state snapshots
//! - [`Fingerprinter`]: BLAKE3 digest of a trajectory for determinism checks

pub mod fingerprint;
pub mod recorder;
pub mod timeline;

pub use fingerprint::{Fingerprinter, TrajectoryFingerprint};
pub use recorder::{
    ExportRecorder, Sample, SampleRecorder, DEFAULT_SAMPLE_CAPACITY, DEFAULT_SAMPLE_INTERVAL,
    SAMPLE_TIME_TOLERANCE,
};
pub use timeline::{TrailPoint, TrailTimeline, DEFAULT_TRAIL_CAPACITY};
