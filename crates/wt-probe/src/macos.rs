//! macOS probes: HID idle time from `ioreg`, frontmost window from AppleScript.

use std::time::Duration;

use chrono::Utc;
use wt_core::{ProbeError, WindowSample};

use crate::command::run;
use crate::parse;

/// Prints `app|path|title` for the frontmost application process.
const FRONT_WINDOW_SCRIPT: &str = r#"tell application "System Events"
    set frontProc to first application process whose frontmost is true
    set frontApp to name of frontProc
    set appPath to ""
    try
        set appPath to POSIX path of (file of frontProc as alias)
    end try
    set frontWindow to ""
    try
        tell frontProc
            set frontWindow to name of front window
        end tell
    end try
    return frontApp & "|" & appPath & "|" & frontWindow
end tell"#;

/// Frontmost app name only; used when the window title is not accessible.
const FRONT_APP_SCRIPT: &str =
    r#"tell application "System Events" to name of first application process whose frontmost is true"#;

pub fn idle_duration() -> Result<Duration, ProbeError> {
    let output = run("ioreg", &["-c", "IOHIDSystem"])?;
    parse::hid_idle_nanos(&output).map(Duration::from_nanos)
}

pub fn active_window() -> Result<WindowSample, ProbeError> {
    let front = match run("osascript", &["-e", FRONT_WINDOW_SCRIPT]) {
        Ok(output) => parse::front_window(&output)?,
        Err(err) => {
            tracing::debug!(error = %err, "front window script failed, falling back to app name");
            parse::front_window(&run("osascript", &["-e", FRONT_APP_SCRIPT])?)?
        }
    };

    Ok(WindowSample {
        app_name: front.app_name,
        window_title: front.window_title,
        process_path: front.process_path,
        sampled_at: Utc::now(),
    })
}
