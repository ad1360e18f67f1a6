//! Capabilities the tracker consumes from the platform.

use std::time::Duration;

use thiserror::Error;

use crate::activity::WindowSample;

/// A platform probe failed. Always transient from the tracker's view.
#[derive(Debug, Error)]
pub enum ProbeError {
    /// The platform mechanism is not available (missing tool, no display).
    #[error("{probe} unavailable: {reason}")]
    Unavailable { probe: &'static str, reason: String },

    /// An external command ran but failed.
    #[error("{command} failed: {message}")]
    Command {
        command: &'static str,
        message: String,
    },

    /// Probe output could not be parsed.
    #[error("unexpected {probe} output: {output}")]
    Parse { probe: &'static str, output: String },

    /// The probe did not answer within the allotted time.
    #[error("{probe} timed out after {timeout:?}")]
    Timeout {
        probe: &'static str,
        timeout: Duration,
    },

    /// No adapter exists for this operating system.
    #[error("unsupported platform: {0}")]
    Unsupported(&'static str),
}

/// Reports how long the user has been inactive.
pub trait IdleProbe {
    /// Time since the last keyboard or pointer input.
    fn sample_idle_duration(&self) -> Result<Duration, ProbeError>;
}

/// Reports the current foreground window.
pub trait WindowProbe {
    fn sample_active_window(&self) -> Result<WindowSample, ProbeError>;
}
