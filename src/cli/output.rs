//! CLI output formatting.
//!
//! Text rendering is split from printing so the summaries can be tested.

use std::fmt::Write as _;
use std::path::Path;

use super::commands::{RunSummary, VerifySummary};
use crate::config::SimConfig;
use crate::error::{SimError, SimResult};

const RULE: &str = "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━";

/// Version line with build metadata.
#[must_use]
pub fn version_text() -> String {
    format!(
        "pendular {} (git {}, built {})",
        option_env!("PENDULAR_VERSION").unwrap_or(env!("CARGO_PKG_VERSION")),
        option_env!("GIT_HASH").unwrap_or("unknown"),
        option_env!("BUILD_TIMESTAMP").unwrap_or("unknown"),
    )
}

/// Print version information.
pub fn print_version() {
    println!("{}", version_text());
}

/// Print help message.
pub fn print_help() {
    println!(
        r"pendular - Real-time double pendulum simulation core

USAGE:
    pendular <COMMAND> [OPTIONS]

COMMANDS:
    run <scenario.yaml>         Run a scenario headlessly at its frame rate
        --duration <SECS>       Wall-clock seconds to simulate (default: 10)
        --export <DIR>          Write the recorded samples into DIR
        --format <csv|jsonl>    Export format (default: from the scenario, csv)
        --seed <N>              Override the scenario seed
        --json                  Print the summary as JSON
        -v, --verbose           Enable debug logging

    verify <scenario.yaml>      Check that repeated runs are bit-identical
        --runs <N>              Number of runs (default: 3)

    check <scenario.yaml>       Load and validate a scenario file

    help                        Show this help message
    version                     Show version information

EXAMPLES:
    pendular run scenarios/default.yaml --duration 30 --export out/
    pendular verify scenarios/default.yaml --runs 5

Set RUST_LOG to override the log filter.
"
    );
}

/// Render a run summary as text.
#[must_use]
pub fn format_run_summary(summary: &RunSummary) -> String {
    let m = &summary.metrics;
    let mut out = String::new();
    let name = if summary.scenario.is_empty() {
        "(unnamed)"
    } else {
        &summary.scenario
    };

    let _ = writeln!(out, "{RULE}");
    let _ = writeln!(out, "Scenario: {name}");
    let _ = writeln!(out, "Seed: {}", summary.seed);
    let _ = writeln!(out, "{RULE}\n");

    let _ = writeln!(out, "Simulation:");
    let _ = writeln!(
        out,
        "  Frames:      {}/{}",
        summary.frames_completed, summary.frames_requested
    );
    let _ = writeln!(out, "  Sim time:    {:.6} s", m.time);
    let _ = writeln!(out, "  RK4 steps:   {}", m.steps);
    let _ = writeln!(out, "  Time scale:  {}", m.time_scale);

    let _ = writeln!(out, "\nFinal state:");
    let _ = writeln!(out, "  theta1: {:+.10} rad", m.state.theta1);
    let _ = writeln!(out, "  theta2: {:+.10} rad", m.state.theta2);
    let _ = writeln!(out, "  omega1: {:+.10} rad/s", m.state.omega1);
    let _ = writeln!(out, "  omega2: {:+.10} rad/s", m.state.omega2);

    let _ = writeln!(out, "\nEnergy:");
    let _ = writeln!(out, "  Total:     {:.6} J", m.total_energy);
    let _ = writeln!(out, "  Kinetic:   {:.6} J", m.kinetic_energy);
    let _ = writeln!(out, "  Potential: {:.6} J", m.potential_energy);
    match m.energy_drift {
        Some(drift) => {
            let _ = writeln!(out, "  Drift:     {drift:+.3e} J");
        }
        None => {
            let _ = writeln!(out, "  Drift:     n/a");
        }
    }
    if m.jidoka_warnings > 0 {
        let _ = writeln!(out, "  Jidoka:    {} drift warnings", m.jidoka_warnings);
    }

    let _ = writeln!(out, "\nRecording:");
    let _ = writeln!(out, "  Trail points:   {}", m.trail_points);
    let _ = writeln!(out, "  Graph samples:  {}", m.graph_samples);
    let _ = writeln!(out, "  Export samples: {}", summary.samples);
    if let Some(path) = &summary.export_path {
        let _ = writeln!(out, "  File:           {}", path.display());
    }
    if !summary.ranges.is_empty() {
        let _ = writeln!(out, "\nRanges:");
        for r in &summary.ranges {
            let _ = writeln!(
                out,
                "  {:<13} [{:+.6}, {:+.6}]",
                r.channel.label(),
                r.min,
                r.max
            );
        }
    }
    let _ = writeln!(out, "\n  Fingerprint: {}", summary.fingerprint);

    let (sym, status) = if summary.diverged {
        ("✗", "DIVERGED (stopped on non-finite state)")
    } else {
        ("✓", "COMPLETED")
    };
    let _ = writeln!(out, "\n{RULE}");
    let _ = writeln!(out, "{sym} Result: {status}");
    let _ = write!(out, "{RULE}");
    out
}

/// Print a run summary, as text or pretty JSON.
///
/// # Errors
///
/// Returns `SimError::Serialization` if JSON encoding fails.
pub fn print_run_summary(summary: &RunSummary, json: bool) -> SimResult<()> {
    if json {
        let text = serde_json::to_string_pretty(summary)
            .map_err(|e| SimError::serialization(format!("JSON serialization failed: {e}")))?;
        println!("{text}");
    } else {
        println!("{}", format_run_summary(summary));
    }
    Ok(())
}

/// Render a reproducibility summary as text.
#[must_use]
pub fn format_verify_summary(summary: &VerifySummary) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{RULE}");
    let _ = writeln!(out, "Reproducibility Check");
    let _ = writeln!(out, "{RULE}\n");
    let _ = writeln!(out, "  Runs:      {}", summary.runs);
    let _ = writeln!(out, "  Identical: {}", summary.identical);

    if let Some(reference) = summary.fingerprints.first() {
        let _ = writeln!(out, "\n  Reference: {reference}");
        for (i, hash) in summary.fingerprints.iter().enumerate().skip(1) {
            let mark = if hash == reference { "=" } else { "!" };
            let _ = writeln!(out, "    Run {}: {hash} {mark}", i + 1);
        }
    }

    let (sym, status) = if summary.identical {
        ("✓", "PASSED")
    } else {
        ("✗", "FAILED")
    };
    let _ = writeln!(out, "\n{RULE}");
    let _ = writeln!(out, "{sym} Result: {status}");
    let _ = write!(out, "{RULE}");
    out
}

/// Print a reproducibility summary.
pub fn print_verify_summary(summary: &VerifySummary) {
    println!("{}", format_verify_summary(summary));
}

/// Render the result of a successful `check`.
#[must_use]
pub fn format_check_result(path: &Path, config: &SimConfig) -> String {
    let p = &config.pendulum;
    let mut out = String::new();
    let _ = writeln!(out, "✓ {} is valid", path.display());
    let _ = writeln!(
        out,
        "  pendulum: m1={} m2={} L1={} L2={} g={} damping={}",
        p.m1, p.m2, p.l1, p.l2, p.g, p.damping
    );
    let _ = writeln!(
        out,
        "  initial:  theta1={} theta2={}{}",
        config.initial.theta1,
        config.initial.theta2,
        if config.initial.randomize {
            " (randomized)"
        } else {
            ""
        }
    );
    let _ = writeln!(
        out,
        "  playback: {} fps, x{}, max_dt={}",
        config.playback.frame_rate, config.playback.time_scale, config.integrator.max_dt
    );
    let _ = write!(out, "  seed:     {}", config.reproducibility.seed);
    out
}

/// Print the result of a successful `check`.
pub fn print_check_result(path: &Path, config: &SimConfig) {
    println!("{}", format_check_result(path, config));
}
