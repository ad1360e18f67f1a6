use std::time::Duration;

use wt_core::{ProbeError, WindowSample};

pub fn idle_duration() -> Result<Duration, ProbeError> {
    Err(ProbeError::Unsupported(std::env::consts::OS))
}

pub fn active_window() -> Result<WindowSample, ProbeError> {
    Err(ProbeError::Unsupported(std::env::consts::OS))
}
