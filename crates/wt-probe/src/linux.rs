//! X11 probes: `xprintidle` for idle time, `xdotool` for the active window.

use std::fs;
use std::path::Path;
use std::time::Duration;

use chrono::Utc;
use wt_core::{ProbeError, WindowSample};

use crate::UNKNOWN_APP;
use crate::command::run;
use crate::parse;

pub fn idle_duration() -> Result<Duration, ProbeError> {
    let output = run("xprintidle", &[])?;
    parse::xprintidle_millis(&output).map(Duration::from_millis)
}

pub fn active_window() -> Result<WindowSample, ProbeError> {
    let window_title = run("xdotool", &["getactivewindow", "getwindowname"])?;
    let sampled_at = Utc::now();

    let pid = run("xdotool", &["getactivewindow", "getwindowpid"])
        .and_then(|output| parse::window_pid(&output));
    let (app_name, process_path) = match pid {
        Ok(pid) => process_identity(&Path::new("/proc").join(pid.to_string())),
        Err(err) => {
            tracing::debug!(error = %err, "active window has no pid");
            (UNKNOWN_APP.to_string(), String::new())
        }
    };

    Ok(WindowSample {
        app_name,
        window_title,
        process_path,
        sampled_at,
    })
}

/// Process name and executable path from a `/proc/<pid>` directory.
fn process_identity(proc_dir: &Path) -> (String, String) {
    let app_name = fs::read_to_string(proc_dir.join("comm"))
        .map(|comm| comm.trim().to_string())
        .ok()
        .filter(|comm| !comm.is_empty())
        .unwrap_or_else(|| UNKNOWN_APP.to_string());
    let process_path = fs::read_link(proc_dir.join("exe"))
        .map(|exe| exe.display().to_string())
        .unwrap_or_default();
    (app_name, process_path)
}
