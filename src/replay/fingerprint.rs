//! Trajectory fingerprinting for determinism checks.
//!
//! Each recorded state is serialized with bincode and folded into a
//! BLAKE3 hasher. Identical inputs and step sizes must yield identical
//! fingerprints on the same platform.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domains::pendulum::PendulumState;
use crate::error::{SimError, SimResult};

/// BLAKE3 digest of a state trajectory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TrajectoryFingerprint {
    digest: [u8; 32],
    frames: u64,
}

impl TrajectoryFingerprint {
    /// Raw digest bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.digest
    }

    /// Number of states folded in.
    #[must_use]
    pub const fn frames(&self) -> u64 {
        self.frames
    }

    /// Lowercase hex digest.
    #[must_use]
    pub fn to_hex(&self) -> String {
        blake3::Hash::from(self.digest).to_hex().to_string()
    }
}

impl fmt::Display for TrajectoryFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

/// Incremental fingerprint builder.
#[derive(Debug, Clone, Default)]
pub struct Fingerprinter {
    hasher: blake3::Hasher,
    frames: u64,
}

impl Fingerprinter {
    /// Create an empty fingerprinter.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold a timestamped state into the digest.
    ///
    /// # Errors
    ///
    /// Returns `SimError::Serialization` if the state cannot be encoded.
    pub fn update(&mut self, t: f64, state: &PendulumState) -> SimResult<()> {
        let bytes = bincode::serialize(&(t, state))
            .map_err(|e| SimError::serialization(format!("fingerprint encode failed: {e}")))?;
        self.hasher.update(&bytes);
        self.frames += 1;
        Ok(())
    }

    /// Number of states folded in so far.
    #[must_use]
    pub const fn frames(&self) -> u64 {
        self.frames
    }

    /// Finalize without consuming, so a running digest can be inspected.
    #[must_use]
    pub fn finish(&self) -> TrajectoryFingerprint {
        TrajectoryFingerprint {
            digest: *self.hasher.finalize().as_bytes(),
            frames: self.frames,
        }
    }
}
