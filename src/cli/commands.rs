//! CLI command handlers.
//!
//! `run` and `verify` share [`simulate`], a headless presenter that drives
//! [`SimContext::tick`] at the configured frame rate.

use serde::Serialize;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{info, warn};

use super::output::{
    print_check_result, print_help, print_run_summary, print_verify_summary, print_version,
};
use super::args::DEFAULT_DURATION;
use super::{Args, Command};
use crate::config::SimConfig;
use crate::engine::SimContext;
use crate::error::SimResult;
use crate::replay::Fingerprinter;
use crate::visualization::{channel_ranges, ChannelRange, ExportFormat, SimMetrics};

/// Outcome of one headless run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    /// Scenario name from the configuration.
    pub scenario: String,
    /// Seed in effect.
    pub seed: u64,
    /// Ticks requested.
    pub frames_requested: u64,
    /// Ticks completed before the end or a divergence.
    pub frames_completed: u64,
    /// Final HUD metrics.
    pub metrics: SimMetrics,
    /// Samples collected by the export recorder.
    pub samples: usize,
    /// Per-channel value ranges over the exported samples.
    pub ranges: Vec<ChannelRange>,
    /// Hex BLAKE3 digest of the per-frame states.
    pub fingerprint: String,
    /// Written export file, if exporting.
    pub export_path: Option<PathBuf>,
    /// Whether the run stopped on a non-finite state.
    pub diverged: bool,
}

/// Summary of a reproducibility check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VerifySummary {
    /// Number of runs.
    pub runs: usize,
    /// Fingerprint of each run.
    pub fingerprints: Vec<String>,
    /// Whether all fingerprints match.
    pub identical: bool,
}

/// Main CLI entry point.
///
/// Dispatches to the appropriate command handler based on parsed arguments.
#[must_use]
pub fn run_cli(args: Args) -> ExitCode {
    match args.command {
        Command::Run {
            scenario_path,
            duration,
            export_dir,
            format,
            seed_override,
            json,
            verbose: _,
        } => run_scenario(
            &scenario_path,
            duration,
            export_dir.as_deref(),
            RunOverrides {
                seed: seed_override,
                format,
            },
            json,
        ),
        Command::Verify {
            scenario_path,
            runs,
        } => verify_reproducibility(&scenario_path, runs),
        Command::Check { scenario_path } => check_scenario(&scenario_path),
        Command::Help => {
            print_help();
            ExitCode::SUCCESS
        }
        Command::Version => {
            print_version();
            ExitCode::SUCCESS
        }
    }
}

/// Run `config` headlessly for `duration` wall-clock seconds.
///
/// The simulation is resumed and export recording armed before the first
/// tick. Each tick is fed [`SimConfig::frame_seconds`]. A divergence ends the
/// run early; the samples collected up to then are still exported, in
/// `recording.export_format`.
///
/// # Errors
///
/// Returns error if fingerprinting or the export fails.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn simulate(
    config: SimConfig,
    duration: f64,
    export_dir: Option<&Path>,
) -> SimResult<RunSummary> {
    let scenario = config.simulation.name.clone();
    let seed = config.reproducibility.seed;
    let randomize = config.initial.randomize;
    let frame_seconds = config.frame_seconds();
    let frames_requested = (duration.max(0.0) * config.playback.frame_rate).round() as u64;

    let mut ctx = SimContext::new(config);
    if randomize {
        ctx.randomize();
    }
    ctx.resume();
    ctx.arm_recording();

    let mut fingerprinter = Fingerprinter::new();
    fingerprinter.update(ctx.sim_time(), ctx.state())?;

    let mut frames_completed = 0;
    for _ in 0..frames_requested {
        if let Err(e) = ctx.tick(frame_seconds) {
            warn!(frame = frames_completed, error = %e, "run stopped early");
            break;
        }
        fingerprinter.update(ctx.sim_time(), ctx.state())?;
        frames_completed += 1;
    }

    let samples = ctx.disarm_recording();
    let export_path = match export_dir {
        Some(dir) => {
            let path = ctx.export_recording(dir)?;
            info!(path = %path.display(), samples = samples.len(), "exported samples");
            Some(path)
        }
        None => None,
    };

    Ok(RunSummary {
        scenario,
        seed,
        frames_requested,
        frames_completed,
        metrics: ctx.metrics(),
        samples: samples.len(),
        ranges: channel_ranges(&samples),
        fingerprint: fingerprinter.finish().to_hex(),
        export_path,
        diverged: ctx.is_diverged(),
    })
}

/// Run `config` `runs` times and compare trajectory fingerprints.
///
/// # Errors
///
/// Returns error if any run fails.
pub fn verify(config: &SimConfig, duration: f64, runs: usize) -> SimResult<VerifySummary> {
    let fingerprints = (0..runs)
        .map(|_| simulate(config.clone(), duration, None).map(|s| s.fingerprint))
        .collect::<SimResult<Vec<_>>>()?;
    let identical = fingerprints.windows(2).all(|w| w[0] == w[1]);

    Ok(VerifySummary {
        runs,
        fingerprints,
        identical,
    })
}

/// Command-line values that take precedence over the scenario file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunOverrides {
    /// Replaces `reproducibility.seed`.
    pub seed: Option<u64>,
    /// Replaces `recording.export_format`.
    pub format: Option<ExportFormat>,
}

fn load(path: &Path, overrides: RunOverrides) -> SimResult<SimConfig> {
    let mut config = SimConfig::load(path)?;
    if let Some(seed) = overrides.seed {
        config.reproducibility.seed = seed;
    }
    if let Some(format) = overrides.format {
        config.recording.export_format = format;
    }
    Ok(config)
}

/// Run a scenario file and print the summary.
#[must_use]
pub fn run_scenario(
    path: &Path,
    duration: f64,
    export_dir: Option<&Path>,
    overrides: RunOverrides,
    json: bool,
) -> ExitCode {
    let result = load(path, overrides).and_then(|config| simulate(config, duration, export_dir));

    match result {
        Ok(summary) => {
            if let Err(e) = print_run_summary(&summary, json) {
                eprintln!("Error: {e}");
                return ExitCode::from(1);
            }
            if summary.diverged {
                ExitCode::from(2)
            } else {
                ExitCode::SUCCESS
            }
        }
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::from(1)
        }
    }
}

/// Verify reproducibility of a scenario across multiple runs.
#[must_use]
pub fn verify_reproducibility(path: &Path, runs: usize) -> ExitCode {
    let result = load(path, RunOverrides::default()).and_then(|config| verify(&config, DEFAULT_DURATION, runs));

    match result {
        Ok(summary) => {
            print_verify_summary(&summary);
            if summary.identical {
                ExitCode::SUCCESS
            } else {
                ExitCode::from(1)
            }
        }
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::from(1)
        }
    }
}

/// Load and validate a scenario file.
#[must_use]
pub fn check_scenario(path: &Path) -> ExitCode {
    match SimConfig::load(path) {
        Ok(config) => {
            print_check_result(path, &config);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("✗ {}: {e}", path.display());
            ExitCode::from(1)
        }
    }
}
