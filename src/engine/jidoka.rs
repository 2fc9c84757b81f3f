//! Jidoka (自働化) - Autonomous anomaly detection.
//!
//! Implements Toyota's Jidoka principle: machines that detect problems
//! and stop automatically to prevent defect propagation.
//!
//! # Anomaly Types
//!
//! 1. **Non-finite values**: NaN or Inf in any state variable. The line stops.
//! 2. **Energy drift**: total energy departs from the last reference snapshot.
//!    This is graded and logged, never fatal to the simulation.
//!
//! # Severity Levels
//!
//! - **Acceptable**: Within tolerance, continue normally
//! - **Warning**: Approaching tolerance, log and continue
//! - **Critical**: Tolerance exceeded, log and continue
//! - **Fatal**: Non-finite drift, the state itself is already invalid
//!
//! Damping removes energy on purpose, so under damping only energy *gain*
//! counts as drift.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::domains::pendulum::{PendulumModel, PendulumParams};
use crate::error::{SimError, SimResult};

/// Severity levels for Jidoka violations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ViolationSeverity {
    /// Acceptable variance within tolerance (continue).
    Acceptable,
    /// Warning: approaching tolerance boundary (log, continue).
    Warning,
    /// Critical: tolerance exceeded.
    Critical,
    /// Fatal: unrecoverable state.
    Fatal,
}

/// Classifier for graduated Jidoka responses.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeverityClassifier {
    /// Warning threshold as fraction of tolerance (e.g., 0.8 = warn at 80%).
    pub warning_fraction: f64,
}

impl Default for SeverityClassifier {
    fn default() -> Self {
        Self {
            warning_fraction: 0.8,
        }
    }
}

impl SeverityClassifier {
    /// Create a new severity classifier.
    #[must_use]
    pub const fn new(warning_fraction: f64) -> Self {
        Self { warning_fraction }
    }

    /// Classify energy drift severity.
    #[must_use]
    pub fn classify_energy_drift(&self, drift: f64, tolerance: f64) -> ViolationSeverity {
        if drift.is_nan() || drift.is_infinite() {
            ViolationSeverity::Fatal
        } else if drift > tolerance {
            ViolationSeverity::Critical
        } else if drift > tolerance * self.warning_fraction {
            ViolationSeverity::Warning
        } else {
            ViolationSeverity::Acceptable
        }
    }
}

/// Jidoka guard configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct JidokaConfig {
    /// Maximum relative energy drift, normalized by [`energy_scale`].
    pub energy_tolerance: f64,
    /// NaN/Inf detection enabled.
    pub check_finite: bool,
    /// Enable energy drift grading.
    pub check_energy: bool,
    /// Severity classifier for graduated responses.
    pub severity_classifier: SeverityClassifier,
}

impl Default for JidokaConfig {
    fn default() -> Self {
        Self {
            energy_tolerance: 1e-2,
            check_finite: true,
            check_energy: true,
            severity_classifier: SeverityClassifier::default(),
        }
    }
}

/// Characteristic energy `g (m1 L1 + m2 (L1 + L2))` used to normalize drift.
///
/// Total energy itself can sit at zero (both rods horizontal), so it cannot
/// serve as the denominator.
#[must_use]
pub fn energy_scale(params: &PendulumParams) -> f64 {
    params.g * (params.m1 * params.l1 + params.m2 * (params.l1 + params.l2))
}

/// Jidoka guard for autonomous anomaly detection.
///
/// # Example
///
/// ```rust
/// use pendular::engine::jidoka::{JidokaGuard, JidokaConfig, ViolationSeverity};
/// use pendular::domains::pendulum::PendulumModel;
///
/// let mut guard = JidokaGuard::new(JidokaConfig::default());
/// let model = PendulumModel::default();
///
/// assert_eq!(guard.check(&model).ok(), Some(ViolationSeverity::Acceptable));
/// ```
#[derive(Debug, Clone)]
pub struct JidokaGuard {
    config: JidokaConfig,
    /// Last reported drift severity, so repeated warnings log once.
    last_severity: ViolationSeverity,
}

impl JidokaGuard {
    /// Create a new Jidoka guard with given configuration.
    #[must_use]
    pub const fn new(config: JidokaConfig) -> Self {
        Self {
            config,
            last_severity: ViolationSeverity::Acceptable,
        }
    }

    /// Guard configuration.
    #[must_use]
    pub const fn config(&self) -> &JidokaConfig {
        &self.config
    }

    /// Inspect the model after a step.
    ///
    /// # Errors
    ///
    /// Returns `SimError::NonFiniteValue` naming the first non-finite state
    /// component.
    pub fn check(&mut self, model: &PendulumModel) -> SimResult<ViolationSeverity> {
        if self.config.check_finite {
            if let Some(location) = model.state().first_non_finite() {
                return Err(SimError::non_finite(location));
            }
        }

        if !self.config.check_energy {
            return Ok(ViolationSeverity::Acceptable);
        }

        let severity = self.classify_drift(model);
        if severity > self.last_severity && severity >= ViolationSeverity::Warning {
            warn!(
                ?severity,
                drift = self.relative_drift(model),
                tolerance = self.config.energy_tolerance,
                "energy drift past threshold"
            );
        }
        self.last_severity = severity;
        Ok(severity)
    }

    /// Relative drift since the model's energy reference.
    #[must_use]
    pub fn relative_drift(&self, model: &PendulumModel) -> f64 {
        let Some(drift) = model.energy_drift() else {
            return 0.0;
        };
        let scale = energy_scale(model.params());
        let drift = if model.params().damping > 0.0 {
            drift.max(0.0)
        } else {
            drift.abs()
        };
        if scale > 0.0 {
            drift / scale
        } else {
            drift
        }
    }

    /// Grade the current drift without logging.
    #[must_use]
    pub fn classify_drift(&self, model: &PendulumModel) -> ViolationSeverity {
        self.config
            .severity_classifier
            .classify_energy_drift(self.relative_drift(model), self.config.energy_tolerance)
    }

    /// Forget the last reported severity (after a reset or drag).
    pub fn rearm(&mut self) {
        self.last_severity = ViolationSeverity::Acceptable;
    }
}

impl Default for JidokaGuard {
    fn default() -> Self {
        Self::new(JidokaConfig::default())
    }
}
