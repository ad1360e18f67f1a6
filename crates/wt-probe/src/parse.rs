//! Parsers for probe command output.
//!
//! Kept separate from the platform modules so every format is tested on any
//! Unix host.

use wt_core::ProbeError;

/// `xprintidle` prints the idle time in milliseconds.
#[cfg_attr(not(target_os = "linux"), allow(dead_code))]
pub fn xprintidle_millis(output: &str) -> Result<u64, ProbeError> {
    output.trim().parse().map_err(|_| ProbeError::Parse {
        probe: "xprintidle",
        output: output.to_string(),
    })
}

/// `xdotool getactivewindow getwindowpid` prints a single pid.
#[cfg_attr(not(target_os = "linux"), allow(dead_code))]
pub fn window_pid(output: &str) -> Result<u32, ProbeError> {
    output.trim().parse().map_err(|_| ProbeError::Parse {
        probe: "xdotool",
        output: output.to_string(),
    })
}

/// Extracts `HIDIdleTime` (nanoseconds) from `ioreg -c IOHIDSystem`.
///
/// The relevant line looks like `|   "HIDIdleTime" = 1234567890`.
#[cfg_attr(not(target_os = "macos"), allow(dead_code))]
pub fn hid_idle_nanos(output: &str) -> Result<u64, ProbeError> {
    output
        .lines()
        .find(|line| line.contains("\"HIDIdleTime\""))
        .and_then(|line| line.split_once('='))
        .and_then(|(_, value)| value.trim().parse().ok())
        .ok_or_else(|| ProbeError::Parse {
            probe: "ioreg",
            output: output.lines().take(5).collect::<Vec<_>>().join("\n"),
        })
}

/// Frontmost app as printed by the AppleScript probe.
#[derive(Debug, PartialEq, Eq)]
pub struct FrontWindow {
    pub app_name: String,
    pub process_path: String,
    pub window_title: String,
}

/// Splits `app|path|title` output. The title comes last and may itself
/// contain `|`.
#[cfg_attr(not(target_os = "macos"), allow(dead_code))]
pub fn front_window(output: &str) -> Result<FrontWindow, ProbeError> {
    let mut parts = output.trim().splitn(3, '|');
    let app_name = parts.next().unwrap_or_default().trim();
    if app_name.is_empty() {
        return Err(ProbeError::Parse {
            probe: "osascript",
            output: output.to_string(),
        });
    }
    Ok(FrontWindow {
        app_name: app_name.to_string(),
        process_path: parts.next().unwrap_or_default().trim().to_string(),
        window_title: parts.next().unwrap_or_default().trim().to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_xprintidle_output() {
        assert_eq!(xprintidle_millis("61234\n").unwrap(), 61_234);
        assert!(xprintidle_millis("couldn't open display").is_err());
    }

    #[test]
    fn parses_window_pid() {
        assert_eq!(window_pid(" 4242\n").unwrap(), 4242);
        assert!(window_pid("").is_err());
    }

    #[test]
    fn parses_hid_idle_time() {
        let output = r#"+-o IOHIDSystem  <class IOHIDSystem, id 0x100000433>
    {
      "HIDIdleTimeDelta" = 0
      "HIDIdleTime" = 2500000000
      "HIDParameters" = {}
    }"#;
        assert_eq!(hid_idle_nanos(output).unwrap(), 2_500_000_000);
    }

    #[test]
    fn missing_hid_idle_time_is_a_parse_error() {
        let err = hid_idle_nanos("+-o Root\n").unwrap_err();
        assert!(matches!(err, ProbeError::Parse { probe: "ioreg", .. }));
    }

    #[test]
    fn parses_front_window_with_pipe_in_title() {
        let parsed = front_window(
            "Google Chrome|/Applications/Google Chrome.app/|a | b - YouTube\n",
        )
        .unwrap();
        assert_eq!(
            parsed,
            FrontWindow {
                app_name: "Google Chrome".to_string(),
                process_path: "/Applications/Google Chrome.app/".to_string(),
                window_title: "a | b - YouTube".to_string(),
            }
        );
    }

    #[test]
    fn front_window_tolerates_missing_fields() {
        let parsed = front_window("Finder").unwrap();
        assert_eq!(parsed.app_name, "Finder");
        assert_eq!(parsed.process_path, "");
        assert_eq!(parsed.window_title, "");

        assert!(front_window("|/x|title").is_err());
    }
}
