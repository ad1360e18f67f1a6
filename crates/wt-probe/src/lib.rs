//! Platform probes for the window-time tracker.
//!
//! [`SystemProbe`] implements [`IdleProbe`] and [`WindowProbe`] for the host
//! operating system:
//!
//! - Linux (X11): `xprintidle` and `xdotool`, process identity from `/proc`.
//! - macOS: `ioreg` for HID idle time, `osascript` for the frontmost window.
//! - Windows: Win32 calls through `windows-sys`.
//!
//! Every call blocks. Callers that need a deadline run probes on a blocking
//! thread and bound them with a timeout.

use std::time::Duration;

use wt_core::{IdleProbe, ProbeError, WindowProbe, WindowSample};

#[cfg(any(target_os = "linux", target_os = "macos"))]
mod command;
#[cfg(any(target_os = "linux", target_os = "macos"))]
mod parse;

#[cfg(target_os = "linux")]
mod linux;
#[cfg(target_os = "linux")]
use linux as platform;

#[cfg(target_os = "macos")]
mod macos;
#[cfg(target_os = "macos")]
use macos as platform;

#[cfg(windows)]
mod windows;
#[cfg(windows)]
use windows as platform;

#[cfg(not(any(target_os = "linux", target_os = "macos", windows)))]
mod unsupported;
#[cfg(not(any(target_os = "linux", target_os = "macos", windows)))]
use unsupported as platform;

/// App name used when the foreground process cannot be identified.
pub const UNKNOWN_APP: &str = "Unknown";

/// Probes backed by the host operating system.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemProbe;

impl SystemProbe {
    pub const fn new() -> Self {
        Self
    }
}

impl IdleProbe for SystemProbe {
    fn sample_idle_duration(&self) -> Result<Duration, ProbeError> {
        let idle = platform::idle_duration()?;
        tracing::trace!(idle_ms = idle.as_millis(), "sampled idle duration");
        Ok(idle)
    }
}

impl WindowProbe for SystemProbe {
    fn sample_active_window(&self) -> Result<WindowSample, ProbeError> {
        let window = platform::active_window()?;
        tracing::trace!(
            app = %window.app_name,
            title = %window.window_title,
            "sampled active window"
        );
        Ok(window)
    }
}
