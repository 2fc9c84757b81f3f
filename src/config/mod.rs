//! Configuration system with YAML schema and validation.
//!
//! Implements Poka-Yoke (mistake-proofing) through:
//! - Type-safe configuration structs
//! - Schema validation via serde and validator
//! - Runtime semantic validation
//!
//! Every section is optional; an empty document yields the defaults of
//! the interactive program (unit lengths and masses, g = 9.81, both rods
//! horizontal, paused).

use serde::{Deserialize, Serialize};
use std::f64::consts::FRAC_PI_2;
use std::path::Path;
use validator::Validate;

use crate::domains::pendulum::PendulumParams;
use crate::domains::physics::DEFAULT_MAX_DT;
use crate::engine::clock::DEFAULT_FRAME_RATE;
use crate::engine::jidoka::JidokaConfig;
use crate::error::{SimError, SimResult};
use crate::replay::{DEFAULT_SAMPLE_CAPACITY, DEFAULT_SAMPLE_INTERVAL, DEFAULT_TRAIL_CAPACITY};
use crate::visualization::ExportFormat;

/// Top-level simulation configuration.
///
/// Loaded from YAML files with full schema validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct SimConfig {
    /// Schema version for forward compatibility.
    #[validate(length(min = 1))]
    #[serde(default = "default_schema_version")]
    pub schema_version: String,

    /// Scenario metadata.
    #[serde(default)]
    pub simulation: SimulationMeta,

    /// Physical parameters.
    #[validate(nested)]
    #[serde(default)]
    pub pendulum: PendulumParams,

    /// Initial joint angles.
    #[serde(default)]
    pub initial: InitialConditions,

    /// Integration settings.
    #[validate(nested)]
    #[serde(default)]
    pub integrator: IntegratorConfig,

    /// Playback settings.
    #[validate(nested)]
    #[serde(default)]
    pub playback: PlaybackConfig,

    /// Sample recorder settings.
    #[validate(nested)]
    #[serde(default)]
    pub recording: RecordingConfig,

    /// Trail settings.
    #[validate(nested)]
    #[serde(default)]
    pub trail: TrailConfig,

    /// Ranges and steps for randomize and keyboard-style controls.
    #[serde(default)]
    pub controls: ControlsConfig,

    /// Reproducibility settings.
    #[serde(default)]
    pub reproducibility: ReproducibilityConfig,

    /// Jidoka (stop-on-error) configuration.
    #[serde(default)]
    pub jidoka: JidokaConfig,
}

fn default_schema_version() -> String {
    "1.0".to_string()
}

impl SimConfig {
    /// Load configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - File cannot be read
    /// - YAML parsing fails
    /// - Validation fails
    pub fn load<P: AsRef<Path>>(path: P) -> SimResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from YAML string.
    ///
    /// # Errors
    ///
    /// Returns error if parsing or validation fails.
    pub fn from_yaml(yaml: &str) -> SimResult<Self> {
        // An empty document parses as unit, not as an empty mapping.
        let config: Self = if yaml.trim().is_empty() {
            Self::default()
        } else {
            serde_yaml::from_str(yaml)?
        };

        // Poka-Yoke: validate all constraints
        config.validate()?;

        // Additional semantic validation
        config.validate_semantic()?;

        Ok(config)
    }

    /// Serialize to YAML.
    ///
    /// # Errors
    ///
    /// Returns `SimError::YamlParse` if serialization fails.
    pub fn to_yaml(&self) -> SimResult<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Create a builder for configuration.
    #[must_use]
    pub fn builder() -> SimConfigBuilder {
        SimConfigBuilder::default()
    }

    /// Validate semantic constraints beyond schema.
    ///
    /// # Errors
    ///
    /// Returns `SimError::Config` describing the first violated constraint.
    pub fn validate_semantic(&self) -> SimResult<()> {
        self.pendulum.check()?;

        if !(self.initial.theta1.is_finite() && self.initial.theta2.is_finite()) {
            return Err(SimError::config("initial angles must be finite"));
        }

        if self.integrator.max_dt <= 0.0 {
            return Err(SimError::config("integrator.max_dt must be positive"));
        }

        let playback = &self.playback;
        if playback.time_scale <= 0.0 {
            return Err(SimError::config("playback.time_scale must be positive"));
        }
        if playback.max_frame_seconds <= 0.0 {
            return Err(SimError::config(
                "playback.max_frame_seconds must be positive",
            ));
        }

        let controls = &self.controls;
        if controls.time_scale_presets.is_empty() {
            return Err(SimError::config("controls.time_scale_presets is empty"));
        }
        if let Some(bad) = controls
            .time_scale_presets
            .iter()
            .find(|s| !(s.is_finite() && **s > 0.0))
        {
            return Err(SimError::config(format!(
                "time scale presets must be positive, got {bad}"
            )));
        }
        if controls.gravity_min <= 0.0 || controls.gravity_min > controls.gravity_max {
            return Err(SimError::config(format!(
                "gravity limits must satisfy 0 < min <= max, got [{}, {}]",
                controls.gravity_min, controls.gravity_max
            )));
        }

        for (name, range, strictly_positive) in [
            ("length", &controls.length, true),
            ("mass", &controls.mass, true),
            ("gravity", &controls.gravity, true),
            ("damping", &controls.damping, false),
            ("time_scale", &controls.time_scale, true),
        ] {
            range.check(name, strictly_positive)?;
        }

        Ok(())
    }

    /// Real seconds fed to each tick at the configured frame rate,
    /// capped by `playback.max_frame_seconds`.
    #[must_use]
    pub fn frame_seconds(&self) -> f64 {
        (1.0 / self.playback.frame_rate).min(self.playback.max_frame_seconds)
    }
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            schema_version: default_schema_version(),
            simulation: SimulationMeta::default(),
            pendulum: PendulumParams::default(),
            initial: InitialConditions::default(),
            integrator: IntegratorConfig::default(),
            playback: PlaybackConfig::default(),
            recording: RecordingConfig::default(),
            trail: TrailConfig::default(),
            controls: ControlsConfig::default(),
            reproducibility: ReproducibilityConfig::default(),
            jidoka: JidokaConfig::default(),
        }
    }
}

/// Configuration builder for programmatic construction.
#[derive(Debug, Default)]
pub struct SimConfigBuilder {
    seed: Option<u64>,
    params: Option<PendulumParams>,
    initial: Option<(f64, f64)>,
    time_scale: Option<f64>,
    start_paused: Option<bool>,
    max_dt: Option<f64>,
    jidoka: Option<JidokaConfig>,
}

impl SimConfigBuilder {
    /// Set the random seed.
    #[must_use]
    pub const fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Set the physical parameters.
    #[must_use]
    pub const fn params(mut self, params: PendulumParams) -> Self {
        self.params = Some(params);
        self
    }

    /// Set the initial joint angles.
    #[must_use]
    pub const fn initial_angles(mut self, theta1: f64, theta2: f64) -> Self {
        self.initial = Some((theta1, theta2));
        self
    }

    /// Set the time-scale factor.
    #[must_use]
    pub const fn time_scale(mut self, time_scale: f64) -> Self {
        self.time_scale = Some(time_scale);
        self
    }

    /// Choose whether the simulation starts paused.
    #[must_use]
    pub const fn start_paused(mut self, paused: bool) -> Self {
        self.start_paused = Some(paused);
        self
    }

    /// Set the largest single integration step.
    #[must_use]
    pub const fn max_dt(mut self, max_dt: f64) -> Self {
        self.max_dt = Some(max_dt);
        self
    }

    /// Set Jidoka configuration.
    #[must_use]
    pub const fn jidoka(mut self, config: JidokaConfig) -> Self {
        self.jidoka = Some(config);
        self
    }

    /// Build the configuration.
    #[must_use]
    pub fn build(self) -> SimConfig {
        let mut config = SimConfig::default();

        if let Some(seed) = self.seed {
            config.reproducibility.seed = seed;
        }
        if let Some(params) = self.params {
            config.pendulum = params;
        }
        if let Some((theta1, theta2)) = self.initial {
            config.initial = InitialConditions {
                theta1,
                theta2,
                randomize: false,
            };
        }
        if let Some(time_scale) = self.time_scale {
            config.playback.time_scale = time_scale;
        }
        if let Some(paused) = self.start_paused {
            config.playback.start_paused = paused;
        }
        if let Some(max_dt) = self.max_dt {
            config.integrator.max_dt = max_dt;
        }
        if let Some(jidoka) = self.jidoka {
            config.jidoka = jidoka;
        }

        config
    }
}

/// Scenario metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimulationMeta {
    /// Scenario name.
    pub name: String,
    /// Description.
    pub description: String,
}

/// Initial joint angles (rad, from the downward vertical).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct InitialConditions {
    /// First rod angle.
    pub theta1: f64,
    /// Second rod angle.
    pub theta2: f64,
    /// Ignore the angles above and start from seeded random ones.
    pub randomize: bool,
}

impl Default for InitialConditions {
    fn default() -> Self {
        Self {
            theta1: FRAC_PI_2,
            theta2: FRAC_PI_2,
            randomize: false,
        }
    }
}

/// Integration settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct IntegratorConfig {
    /// Largest single RK4 step (s).
    #[validate(range(min = 0.000_001, max = 0.1))]
    #[serde(default = "default_max_dt")]
    pub max_dt: f64,
}

const fn default_max_dt() -> f64 {
    DEFAULT_MAX_DT
}

impl Default for IntegratorConfig {
    fn default() -> Self {
        Self {
            max_dt: default_max_dt(),
        }
    }
}

/// Playback settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct PlaybackConfig {
    /// Initial time-scale factor.
    #[validate(range(min = 0.01, max = 100.0))]
    #[serde(default = "default_time_scale")]
    pub time_scale: f64,
    /// Frames per second for the presenter and explicit frame steps.
    #[validate(range(min = 1.0, max = 1000.0))]
    #[serde(default = "default_frame_rate")]
    pub frame_rate: f64,
    /// Whether the simulation starts paused.
    #[serde(default = "default_true")]
    pub start_paused: bool,
    /// Cap on real elapsed time fed to one tick by the presenter (s).
    #[validate(range(min = 0.0, max = 10.0))]
    #[serde(default = "default_max_frame_seconds")]
    pub max_frame_seconds: f64,
}

const fn default_time_scale() -> f64 {
    1.0
}

const fn default_frame_rate() -> f64 {
    DEFAULT_FRAME_RATE
}

const fn default_true() -> bool {
    true
}

const fn default_max_frame_seconds() -> f64 {
    0.25
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            time_scale: default_time_scale(),
            frame_rate: default_frame_rate(),
            start_paused: true,
            max_frame_seconds: default_max_frame_seconds(),
        }
    }
}

/// Sample recorder settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct RecordingConfig {
    /// Minimum simulation time between samples (s).
    #[validate(range(min = 0.0, max = 10.0))]
    #[serde(default = "default_sample_interval")]
    pub sample_interval: f64,
    /// Maximum samples kept by the live graph recorder.
    #[validate(range(min = 1))]
    #[serde(default = "default_sample_capacity")]
    pub graph_capacity: usize,
    /// Maximum samples kept by the export recorder.
    #[validate(range(min = 1))]
    #[serde(default = "default_sample_capacity")]
    pub export_capacity: usize,
    /// File format written by exports (`csv` or `json_lines`).
    #[serde(default)]
    pub export_format: ExportFormat,
}

const fn default_sample_interval() -> f64 {
    DEFAULT_SAMPLE_INTERVAL
}

const fn default_sample_capacity() -> usize {
    DEFAULT_SAMPLE_CAPACITY
}

impl Default for RecordingConfig {
    fn default() -> Self {
        Self {
            sample_interval: default_sample_interval(),
            graph_capacity: default_sample_capacity(),
            export_capacity: default_sample_capacity(),
            export_format: ExportFormat::Csv,
        }
    }
}

/// Trail settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct TrailConfig {
    /// Maximum stored trail points.
    #[validate(range(min = 1))]
    #[serde(default = "default_trail_capacity")]
    pub capacity: usize,
}

const fn default_trail_capacity() -> usize {
    DEFAULT_TRAIL_CAPACITY
}

impl Default for TrailConfig {
    fn default() -> Self {
        Self {
            capacity: default_trail_capacity(),
        }
    }
}

/// Inclusive numeric range.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ParamRange {
    /// Lower bound.
    pub min: f64,
    /// Upper bound.
    pub max: f64,
}

impl ParamRange {
    /// Create a new range.
    #[must_use]
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Clamp `value` into the range.
    #[must_use]
    pub fn clamp(&self, value: f64) -> f64 {
        value.max(self.min).min(self.max)
    }

    fn check(&self, name: &str, strictly_positive: bool) -> SimResult<()> {
        let lower_ok = if strictly_positive {
            self.min > 0.0
        } else {
            self.min >= 0.0
        };
        if !(self.min.is_finite() && self.max.is_finite() && lower_ok && self.min <= self.max) {
            return Err(SimError::config(format!(
                "controls.{name} range [{}, {}] is invalid",
                self.min, self.max
            )));
        }
        Ok(())
    }
}

/// Ranges for randomize-params plus the gravity and time-scale controls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ControlsConfig {
    /// Rod length range (m), shared by both rods.
    pub length: ParamRange,
    /// Bob mass range (kg), shared by both bobs.
    pub mass: ParamRange,
    /// Gravity range for randomization (m/s²).
    pub gravity: ParamRange,
    /// Damping range for randomization (1/s).
    pub damping: ParamRange,
    /// Time-scale range for randomization.
    pub time_scale: ParamRange,
    /// Gravity increment per adjust step.
    pub gravity_step: f64,
    /// Lowest gravity reachable by adjustment.
    pub gravity_min: f64,
    /// Highest gravity reachable by adjustment.
    pub gravity_max: f64,
    /// Time scales visited by the cycle control, in order.
    pub time_scale_presets: Vec<f64>,
}

impl Default for ControlsConfig {
    fn default() -> Self {
        Self {
            length: ParamRange::new(0.4, 2.5),
            mass: ParamRange::new(0.5, 5.0),
            gravity: ParamRange::new(0.5, 25.0),
            damping: ParamRange::new(0.0, 0.05),
            time_scale: ParamRange::new(0.25, 3.0),
            gravity_step: 0.5,
            gravity_min: 0.5,
            gravity_max: 30.0,
            time_scale_presets: vec![0.25, 0.5, 1.0, 1.5, 2.0],
        }
    }
}

/// Reproducibility settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReproducibilityConfig {
    /// Master seed for randomize operations.
    pub seed: u64,
}

impl Default for ReproducibilityConfig {
    fn default() -> Self {
        Self { seed: 42 }
    }
}
