//! Window samples, closed segments and persisted activities.

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

use crate::classify::classify;
use crate::types::{ActivityId, ValidationError};

/// App name recorded for idle segments.
pub const IDLE_APP_NAME: &str = "IDLE";

/// Window title recorded for idle segments.
pub const IDLE_WINDOW_TITLE: &str = "Idle";

/// The foreground window as reported by a probe on one tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowSample {
    pub app_name: String,
    pub window_title: String,
    pub process_path: String,
    pub sampled_at: DateTime<Utc>,
}

impl WindowSample {
    /// Returns `true` if both samples name the same app and window title.
    ///
    /// The process path is deliberately not part of a window's identity.
    pub fn same_window(&self, other: &Self) -> bool {
        self.app_name == other.app_name && self.window_title == other.window_title
    }
}

/// A closed time segment that has not been persisted yet.
///
/// Construction enforces a positive duration, so every `Segment` can be
/// stored as is. Boundaries are truncated to whole milliseconds, the
/// precision of stored timestamps, before the duration is computed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    app_name: String,
    enriched_name: Option<String>,
    window_title: String,
    process_path: String,
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
    duration_seconds: i64,
    is_idle: bool,
}

impl Segment {
    /// Closes an active segment for `window`, labelling it with the classifier.
    pub fn active(
        window: &WindowSample,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
    ) -> Result<Self, ValidationError> {
        let (start_time, end_time, duration_seconds) = checked_bounds(start_time, end_time)?;
        Ok(Self {
            app_name: window.app_name.clone(),
            enriched_name: Some(classify(&window.app_name, &window.window_title)),
            window_title: window.window_title.clone(),
            process_path: window.process_path.clone(),
            start_time,
            end_time,
            duration_seconds,
            is_idle: false,
        })
    }

    /// Closes an idle segment.
    pub fn idle(start_time: DateTime<Utc>, end_time: DateTime<Utc>) -> Result<Self, ValidationError> {
        let (start_time, end_time, duration_seconds) = checked_bounds(start_time, end_time)?;
        Ok(Self {
            app_name: IDLE_APP_NAME.to_string(),
            enriched_name: None,
            window_title: IDLE_WINDOW_TITLE.to_string(),
            process_path: String::new(),
            start_time,
            end_time,
            duration_seconds,
            is_idle: true,
        })
    }

    pub fn app_name(&self) -> &str {
        &self.app_name
    }

    pub fn enriched_name(&self) -> Option<&str> {
        self.enriched_name.as_deref()
    }

    pub fn window_title(&self) -> &str {
        &self.window_title
    }

    pub fn process_path(&self) -> &str {
        &self.process_path
    }

    pub const fn start_time(&self) -> DateTime<Utc> {
        self.start_time
    }

    pub const fn end_time(&self) -> DateTime<Utc> {
        self.end_time
    }

    pub const fn duration_seconds(&self) -> i64 {
        self.duration_seconds
    }

    pub const fn is_idle(&self) -> bool {
        self.is_idle
    }
}

/// A segment as stored, with its assigned identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Activity {
    pub id: ActivityId,
    pub app_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enriched_name: Option<String>,
    pub window_title: String,
    pub process_path: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub duration_seconds: i64,
    pub is_idle: bool,
}

impl Activity {
    /// Label used for grouping: the enriched name, or the app name without one.
    pub fn label(&self) -> &str {
        match self.enriched_name.as_deref() {
            Some(name) if !name.is_empty() => name,
            _ => &self.app_name,
        }
    }
}

/// Rounds an interval to whole seconds, half away from zero.
pub fn round_duration_seconds(start: DateTime<Utc>, end: DateTime<Utc>) -> i64 {
    let millis = (end - start).num_milliseconds();
    if millis >= 0 {
        (millis + 500) / 1000
    } else {
        (millis - 500) / 1000
    }
}

fn checked_bounds(
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Result<(DateTime<Utc>, DateTime<Utc>, i64), ValidationError> {
    let (start, end) = (start.trunc_subsecs(3), end.trunc_subsecs(3));
    let seconds = round_duration_seconds(start, end);
    if end <= start || seconds <= 0 {
        return Err(ValidationError::NonPositiveDuration { start, end });
    }
    Ok((start, end, seconds))
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::{Duration, TimeZone};

    fn at(seconds: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 15, 9, 0, 0).unwrap() + Duration::seconds(seconds)
    }

    fn window(app: &str, title: &str) -> WindowSample {
        WindowSample {
            app_name: app.to_string(),
            window_title: title.to_string(),
            process_path: format!("/usr/bin/{app}"),
            sampled_at: at(0),
        }
    }

    #[test]
    fn active_segment_is_classified_at_close() {
        let segment = Segment::active(
            &window("Google Chrome", "Trending - YouTube"),
            at(0),
            at(30),
        )
        .unwrap();

        assert_eq!(segment.enriched_name(), Some("YouTube"));
        assert_eq!(segment.duration_seconds(), 30);
        assert!(!segment.is_idle());
    }

    #[test]
    fn idle_segment_has_fixed_identity() {
        let segment = Segment::idle(at(0), at(120)).unwrap();

        assert_eq!(segment.app_name(), IDLE_APP_NAME);
        assert_eq!(segment.process_path(), "");
        assert_eq!(segment.enriched_name(), None);
        assert!(segment.is_idle());
    }

    #[test]
    fn zero_and_negative_segments_are_rejected() {
        assert!(Segment::idle(at(10), at(10)).is_err());
        assert!(Segment::idle(at(10), at(5)).is_err());
        assert!(Segment::active(&window("Terminal", "zsh"), at(3), at(3)).is_err());
    }

    #[test]
    fn sub_half_second_segment_is_rejected() {
        let start = at(0);
        let end = start + Duration::milliseconds(400);
        assert!(Segment::idle(start, end).is_err());
    }

    #[test]
    fn boundaries_are_truncated_to_milliseconds() {
        let start = at(0) + Duration::microseconds(900);
        let end = at(1) + Duration::microseconds(500_400);

        let segment = Segment::idle(start, end).unwrap();

        assert_eq!(segment.start_time(), at(0));
        assert_eq!(segment.end_time(), at(1) + Duration::milliseconds(500));
        assert_eq!(segment.duration_seconds(), 2);
    }

    #[test]
    fn duration_rounds_to_nearest_second() {
        let start = at(0);
        assert_eq!(round_duration_seconds(start, start + Duration::milliseconds(1_499)), 1);
        assert_eq!(round_duration_seconds(start, start + Duration::milliseconds(1_500)), 2);
        assert_eq!(round_duration_seconds(start, start + Duration::seconds(60)), 60);
    }

    #[test]
    fn same_window_ignores_process_path() {
        let a = window("Terminal", "zsh");
        let mut b = a.clone();
        b.process_path = "/opt/other/terminal".to_string();
        assert!(a.same_window(&b));

        b.window_title = "vim".to_string();
        assert!(!a.same_window(&b));
    }

    #[test]
    fn activity_label_falls_back_to_app_name() {
        let mut activity = Activity {
            id: ActivityId::new(1),
            app_name: "Terminal".to_string(),
            enriched_name: None,
            window_title: "zsh".to_string(),
            process_path: String::new(),
            start_time: at(0),
            end_time: at(10),
            duration_seconds: 10,
            is_idle: false,
        };
        assert_eq!(activity.label(), "Terminal");

        activity.enriched_name = Some(String::new());
        assert_eq!(activity.label(), "Terminal");

        activity.enriched_name = Some("dotfiles".to_string());
        assert_eq!(activity.label(), "dotfiles");
    }
}
