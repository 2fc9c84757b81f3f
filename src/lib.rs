//! # pendular
//!
//! Real-time double pendulum simulation core.
//!
//! The hard parts of an interactive chaotic-pendulum toy, without the window:
//! - Stable RK4 stepping under any wall-clock / time-scale ratio (bounded sub-steps)
//! - A reversible trail timeline: forward play, single-step rewind, redo-by-overwrite
//! - Drag inverse kinematics with reachability clamping
//! - Gap-sampled recorders and a fixed-precision CSV export
//! - Jidoka: stop on NaN/Inf, grade energy drift
//!
//! A presenter (GUI, TUI or the bundled CLI) owns the frame loop and calls
//! [`engine::SimContext::tick`] once per frame.
//!
//! ## Example
//!
//! ```rust
//! use pendular::prelude::*;
//!
//! let config = SimConfig::builder()
//!     .seed(42)
//!     .initial_angles(1.0, 0.5)
//!     .start_paused(false)
//!     .build();
//!
//! let mut ctx = SimContext::new(config);
//! for _ in 0..60 {
//!     ctx.tick(1.0 / 60.0).unwrap();
//! }
//! assert!((ctx.sim_time() - 1.0).abs() < 1e-9);
//! ```

#![forbid(unsafe_code)]
#![deny(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![warn(clippy::pedantic, clippy::nursery)]
#![allow(
    clippy::module_name_repetitions,
    clippy::similar_names,
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::suboptimal_flops,  // Written to mirror the equations of motion
    clippy::imprecise_flops,
    clippy::many_single_char_names,
    clippy::too_many_lines,
    clippy::missing_const_for_fn,  // Many functions can't be const in stable Rust
)]

pub mod cli;
pub mod config;
pub mod domains;
pub mod engine;
pub mod error;
pub mod replay;
pub mod visualization;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::config::{SimConfig, SimConfigBuilder};
    pub use crate::domains::kinematics::DragMode;
    pub use crate::domains::pendulum::{PendulumModel, PendulumParams, PendulumState, Point2};
    pub use crate::domains::physics::{RK4Integrator, SubStepper};
    pub use crate::engine::jidoka::{JidokaConfig, JidokaGuard, ViolationSeverity};
    pub use crate::engine::rng::SimRng;
    pub use crate::engine::{SimContext, TickReport};
    pub use crate::error::{SimError, SimResult};
    pub use crate::replay::{ExportRecorder, Sample, SampleRecorder, TrailTimeline};
    pub use crate::visualization::{Exporter, SimMetrics};
}

/// Re-export for public API
pub use error::{SimError, SimResult};
