//! Visualization module for pendular.
//!
//! Provides the presenter-facing read side:
//! - [`SimMetrics`]: HUD readout snapshot (time, energies, drift, counters)
//! - [`Exporter`]: CSV and JSON Lines export of recorded samples
//! - [`channel_bounds`] / [`channel_ranges`]: value range of plotted channels,
//!   for graph scaling and run summaries
//!
//! # Example
//!
//! ```rust
//! use pendular::replay::Sample;
//! use pendular::visualization::{Exporter, SimMetrics};
//!
//! let metrics = SimMetrics::default();
//! let exporter = Exporter::new();
//! let mut out = Vec::new();
//! exporter.write_csv(&mut out, std::iter::empty::<&Sample>()).unwrap();
//! assert_eq!(out, b"t_s,theta1_rad,theta2_rad,omega1_rad_s,omega2_rad_s\n");
//! assert!(!metrics.paused);
//! ```

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::domains::pendulum::{PendulumParams, PendulumState};
use crate::error::{SimError, SimResult};
use crate::replay::Sample;

// ============================================================================
// Simulation Metrics
// ============================================================================

/// Snapshot of everything a HUD shows.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SimMetrics {
    /// Current simulation time (s).
    pub time: f64,
    /// Ticks processed.
    pub frames: u64,
    /// RK4 steps taken since the last reset, explicit frame steps in either
    /// direction included.
    pub steps: u64,
    /// Time-scale factor.
    pub time_scale: f64,
    /// Whether the simulation is paused.
    pub paused: bool,
    /// Whether a non-finite state stopped the simulation.
    pub diverged: bool,
    /// Current state.
    pub state: PendulumState,
    /// Current parameters.
    pub params: PendulumParams,
    /// Total energy (J).
    pub total_energy: f64,
    /// Kinetic energy (J).
    pub kinetic_energy: f64,
    /// Potential energy (J).
    pub potential_energy: f64,
    /// Energy change since the reference snapshot (J).
    pub energy_drift: Option<f64>,
    /// Whether the reference was taken under the damping now in effect.
    pub drift_comparable: bool,
    /// Stored trail points.
    pub trail_points: usize,
    /// Trail points currently drawn.
    pub visible_trail: usize,
    /// Live graph samples.
    pub graph_samples: usize,
    /// Export samples.
    pub export_samples: usize,
    /// Whether an export session is armed.
    pub recording: bool,
    /// Ticks that ended with an energy-drift warning or worse.
    pub jidoka_warnings: u32,
}

impl SimMetrics {
    /// Drift as a percentage of the reference energy magnitude.
    ///
    /// `None` without a reference, or when the reference energy is zero.
    #[must_use]
    pub fn drift_percent(&self) -> Option<f64> {
        let drift = self.energy_drift?;
        let reference = self.total_energy - drift;
        if reference.abs() > f64::EPSILON {
            Some(100.0 * drift / reference.abs())
        } else {
            None
        }
    }

    /// One-line HUD text.
    #[must_use]
    pub fn hud_line(&self) -> String {
        let drift = match (self.energy_drift, self.drift_comparable) {
            (Some(d), true) => format!("{d:+.3e} J"),
            (Some(d), false) => format!("{d:+.3e} J (damping changed)"),
            (None, _) => "n/a".to_string(),
        };
        let status = if self.diverged {
            "DIVERGED"
        } else if self.paused {
            "paused"
        } else {
            "running"
        };
        format!(
            "t={:.3}s x{:.2} {status} | E={:.4} J drift={drift} | trail {}/{} | rec {}",
            self.time,
            self.time_scale,
            self.total_energy,
            self.visible_trail,
            self.trail_points,
            if self.recording { "on" } else { "off" },
        )
    }
}

// ============================================================================
// Graph channels
// ============================================================================

/// One plotted quantity of a [`Sample`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Channel {
    /// First rod angle.
    Theta1,
    /// Second rod angle.
    Theta2,
    /// First rod angular velocity.
    Omega1,
    /// Second rod angular velocity.
    Omega2,
}

impl Channel {
    /// All channels in CSV column order.
    pub const ALL: [Self; 4] = [Self::Theta1, Self::Theta2, Self::Omega1, Self::Omega2];

    /// Column name in the CSV export.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Theta1 => "theta1_rad",
            Self::Theta2 => "theta2_rad",
            Self::Omega1 => "omega1_rad_s",
            Self::Omega2 => "omega2_rad_s",
        }
    }

    /// Value of this channel in `sample`.
    #[must_use]
    pub const fn value(self, sample: &Sample) -> f64 {
        match self {
            Self::Theta1 => sample.theta1,
            Self::Theta2 => sample.theta2,
            Self::Omega1 => sample.omega1,
            Self::Omega2 => sample.omega2,
        }
    }
}

/// `(min, max)` of `channel` over `samples`, ignoring non-finite values.
#[must_use]
pub fn channel_bounds<'a, I>(samples: I, channel: Channel) -> Option<(f64, f64)>
where
    I: IntoIterator<Item = &'a Sample>,
{
    samples
        .into_iter()
        .map(|s| channel.value(s))
        .filter(|v| v.is_finite())
        .fold(None, |acc, v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
}

/// Observed range of one channel.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChannelRange {
    /// Which quantity.
    pub channel: Channel,
    /// Smallest finite value.
    pub min: f64,
    /// Largest finite value.
    pub max: f64,
}

/// Ranges of every channel that has at least one finite value, in CSV order.
#[must_use]
pub fn channel_ranges<'a, I>(samples: I) -> Vec<ChannelRange>
where
    I: IntoIterator<Item = &'a Sample>,
    I::IntoIter: Clone,
{
    let samples = samples.into_iter();
    Channel::ALL
        .iter()
        .filter_map(|&channel| {
            channel_bounds(samples.clone(), channel).map(|(min, max)| ChannelRange {
                channel,
                min,
                max,
            })
        })
        .collect()
}

// ============================================================================
// Export
// ============================================================================

/// CSV header of the export format.
pub const CSV_HEADER: &str = "t_s,theta1_rad,theta2_rad,omega1_rad_s,omega2_rad_s";

/// Prefix of exported file names.
pub const FILE_PREFIX: &str = "double_pendulum";

/// Export output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportFormat {
    /// Fixed-precision CSV.
    #[default]
    Csv,
    /// One JSON object per sample.
    JsonLines,
}

impl ExportFormat {
    /// File extension, without the dot.
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::JsonLines => "jsonl",
        }
    }

    /// Parse a format name as written on the command line.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "csv" => Some(Self::Csv),
            "jsonl" | "json_lines" | "json-lines" => Some(Self::JsonLines),
            _ => None,
        }
    }
}

/// Exporter for recorded samples.
#[derive(Debug, Clone, Copy, Default)]
pub struct Exporter {
    format: ExportFormat,
}

impl Exporter {
    /// CSV exporter.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            format: ExportFormat::Csv,
        }
    }

    /// Exporter for the given format.
    #[must_use]
    pub const fn with_format(format: ExportFormat) -> Self {
        Self { format }
    }

    /// Configured format.
    #[must_use]
    pub const fn format(&self) -> ExportFormat {
        self.format
    }

    /// Write samples as CSV.
    ///
    /// Time uses 6 decimals, angles and rates 10; lines end in `\n`.
    ///
    /// # Errors
    ///
    /// Returns error if writing fails.
    pub fn write_csv<'a, W, I>(&self, writer: &mut W, samples: I) -> SimResult<()>
    where
        W: Write,
        I: IntoIterator<Item = &'a Sample>,
    {
        writeln!(writer, "{CSV_HEADER}")
            .map_err(|e| SimError::io(format!("Write header failed: {e}")))?;

        for s in samples {
            writeln!(
                writer,
                "{:.6},{:.10},{:.10},{:.10},{:.10}",
                s.t, s.theta1, s.theta2, s.omega1, s.omega2
            )
            .map_err(|e| SimError::io(format!("Write data failed: {e}")))?;
        }
        Ok(())
    }

    /// Write samples as JSON Lines.
    ///
    /// # Errors
    ///
    /// Returns error if serialization or writing fails.
    pub fn write_json_lines<'a, W, I>(&self, writer: &mut W, samples: I) -> SimResult<()>
    where
        W: Write,
        I: IntoIterator<Item = &'a Sample>,
    {
        for s in samples {
            let json = serde_json::to_string(s)
                .map_err(|e| SimError::serialization(format!("JSON serialization failed: {e}")))?;
            writeln!(writer, "{json}").map_err(|e| SimError::io(format!("Write failed: {e}")))?;
        }
        Ok(())
    }

    /// Write samples to `path` in the configured format.
    ///
    /// # Errors
    ///
    /// Returns error if file operations fail.
    pub fn export<'a, I>(&self, samples: I, path: &Path) -> SimResult<()>
    where
        I: IntoIterator<Item = &'a Sample>,
    {
        let file =
            File::create(path).map_err(|e| SimError::io(format!("Failed to create file: {e}")))?;
        let mut writer = BufWriter::new(file);

        match self.format {
            ExportFormat::Csv => self.write_csv(&mut writer, samples)?,
            ExportFormat::JsonLines => self.write_json_lines(&mut writer, samples)?,
        }

        writer
            .flush()
            .map_err(|e| SimError::io(format!("Flush failed: {e}")))?;
        Ok(())
    }

    /// File name for an export taken at `at`: `double_pendulum_YYYYMMDD_HHMMSS.<ext>`.
    #[must_use]
    pub fn file_name(&self, at: &NaiveDateTime) -> String {
        format!(
            "{FILE_PREFIX}_{}.{}",
            at.format("%Y%m%d_%H%M%S"),
            self.format.extension()
        )
    }

    /// Write samples into `dir` under a local-time stamped name.
    ///
    /// Creates `dir` if needed and returns the written path.
    ///
    /// # Errors
    ///
    /// Returns error if the directory or file cannot be written.
    pub fn export_to_dir<'a, I>(&self, samples: I, dir: &Path) -> SimResult<PathBuf>
    where
        I: IntoIterator<Item = &'a Sample>,
    {
        fs::create_dir_all(dir).map_err(|e| {
            SimError::io(format!("Failed to create directory {}: {e}", dir.display()))
        })?;
        let path = dir.join(self.file_name(&Local::now().naive_local()));
        self.export(samples, &path)?;
        Ok(path)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use tempfile::tempdir;

    fn sample(t: f64) -> Sample {
        Sample {
            t,
            theta1: 1.5707963267948966,
            theta2: -0.25,
            omega1: 0.0,
            omega2: 12.345_678_901_234,
        }
    }

    #[test]
    fn test_csv_exact_format() {
        let samples = [sample(0.0), sample(1.0 / 60.0)];
        let mut out = Vec::new();
        Exporter::new().write_csv(&mut out, &samples).unwrap();

        let text = String::from_utf8(out).unwrap();
        assert_eq!(
            text,
            "t_s,theta1_rad,theta2_rad,omega1_rad_s,omega2_rad_s\n\
             0.000000,1.5707963268,-0.2500000000,0.0000000000,12.3456789012\n\
             0.016667,1.5707963268,-0.2500000000,0.0000000000,12.3456789012\n"
        );
    }

    #[test]
    fn test_csv_no_carriage_returns() {
        let samples = [sample(0.5)];
        let mut out = Vec::new();
        Exporter::new().write_csv(&mut out, &samples).unwrap();
        assert!(!out.contains(&b'\r'));
        assert!(out.ends_with(b"\n"));
    }

    #[test]
    fn test_json_lines() {
        let samples = [sample(0.0), sample(0.5)];
        let mut out = Vec::new();
        Exporter::with_format(ExportFormat::JsonLines)
            .write_json_lines(&mut out, &samples)
            .unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        let parsed: Sample = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(parsed, samples[1]);
    }

    #[test]
    fn test_file_name() {
        let at = NaiveDate::from_ymd_opt(2024, 3, 7)
            .unwrap()
            .and_hms_opt(9, 5, 1)
            .unwrap();
        assert_eq!(
            Exporter::new().file_name(&at),
            "double_pendulum_20240307_090501.csv"
        );
        assert_eq!(
            Exporter::with_format(ExportFormat::JsonLines).file_name(&at),
            "double_pendulum_20240307_090501.jsonl"
        );
    }

    #[test]
    fn test_export_to_dir_creates_file() {
        let dir = tempdir().unwrap();
        let nested = dir.path().join("exports");
        let samples = [sample(0.0), sample(0.25)];

        let path = Exporter::new().export_to_dir(&samples, &nested).unwrap();
        assert!(path.starts_with(&nested));
        let name = path.file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with("double_pendulum_"));
        assert!(name.ends_with(".csv"));
        assert_eq!(name.len(), "double_pendulum_YYYYMMDD_HHMMSS.csv".len());

        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text.lines().count(), 3);
        assert!(text.starts_with(CSV_HEADER));
    }

    #[test]
    fn test_export_empty_writes_header_only() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("empty.csv");
        Exporter::new().export(std::iter::empty::<&Sample>(), &path).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text, format!("{CSV_HEADER}\n"));
    }

    #[test]
    fn test_export_bad_path_fails() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("missing").join("x.csv");
        let err = Exporter::new().export(std::iter::empty::<&Sample>(), &path).unwrap_err();
        assert!(err.to_string().contains("Failed to create file"));
    }

    #[test]
    fn test_channel_bounds() {
        let mut samples = vec![sample(0.0), sample(1.0)];
        samples[1].theta2 = 0.75;
        samples.push(Sample {
            theta2: f64::NAN,
            ..sample(2.0)
        });
        assert_eq!(
            channel_bounds(&samples, Channel::Theta2),
            Some((-0.25, 0.75))
        );
        assert_eq!(channel_bounds(std::iter::empty::<&Sample>(), Channel::Omega1), None);
        assert!((Channel::Omega2.value(&samples[0]) - 12.345_678_901_234).abs() < 1e-15);
        assert_eq!(Channel::ALL.len(), 4);
    }

    #[test]
    fn test_channel_labels_match_csv_header() {
        let labels: Vec<&str> = Channel::ALL.iter().map(|c| c.label()).collect();
        assert_eq!(format!("t_s,{}", labels.join(",")), CSV_HEADER);
    }

    #[test]
    fn test_channel_ranges() {
        let mut samples = vec![sample(0.0), sample(1.0)];
        samples[1].omega1 = -3.0;
        let ranges = channel_ranges(&samples);
        assert_eq!(ranges.len(), 4);
        assert_eq!(ranges[2].channel, Channel::Omega1);
        assert!((ranges[2].min + 3.0).abs() < f64::EPSILON);
        assert!(ranges[2].max.abs() < f64::EPSILON);
        assert!(channel_ranges(std::iter::empty::<&Sample>()).is_empty());
    }

    #[test]
    fn test_export_format_names() {
        assert_eq!(ExportFormat::from_name("csv"), Some(ExportFormat::Csv));
        assert_eq!(ExportFormat::from_name("JSONL"), Some(ExportFormat::JsonLines));
        assert_eq!(ExportFormat::from_name("json_lines"), Some(ExportFormat::JsonLines));
        assert_eq!(ExportFormat::from_name("xml"), None);
    }

    #[test]
    fn test_drift_percent() {
        let metrics = SimMetrics {
            total_energy: 10.5,
            energy_drift: Some(0.5),
            ..Default::default()
        };
        assert!((metrics.drift_percent().unwrap() - 5.0).abs() < 1e-10);

        let zero_ref = SimMetrics {
            total_energy: 0.5,
            energy_drift: Some(0.5),
            ..Default::default()
        };
        assert!(zero_ref.drift_percent().is_none());
        assert!(SimMetrics::default().drift_percent().is_none());
    }

    #[test]
    fn test_hud_line() {
        let metrics = SimMetrics {
            time: 1.5,
            time_scale: 1.0,
            paused: true,
            energy_drift: Some(1e-6),
            drift_comparable: false,
            ..Default::default()
        };
        let line = metrics.hud_line();
        assert!(line.contains("t=1.500s"));
        assert!(line.contains("paused"));
        assert!(line.contains("damping changed"));
        assert!(line.contains("rec off"));
    }
}
