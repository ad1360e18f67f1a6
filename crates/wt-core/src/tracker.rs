//! Segment tracker: turns periodic samples into closed, contiguous segments.
//!
//! # States
//!
//! - `NoSegment`: nothing open (startup, or just back from idle).
//! - `Active`: a foreground window has been current since `start`.
//! - `Idle`: the user has been inactive since `start`.
//!
//! Each tick the driver samples the idle probe and, when the user is active,
//! the window probe, then hands one [`TickInput`] to [`SegmentTracker::tick`].
//! A failed idle probe means the tick is skipped entirely; a failed window
//! probe is passed through as an active input without a window.
//!
//! Durations are computed at close time as `now - start`; nothing is
//! accumulated per tick. Segments that would have no positive duration are
//! dropped silently. If the sink fails the state is left untouched, so the
//! segment stays open and the next tick retries the close.

use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::activity::{Segment, WindowSample};
use crate::types::{ActivityId, ValidationError};

/// Default inactivity before the user counts as idle.
pub const DEFAULT_IDLE_THRESHOLD: Duration = Duration::from_secs(60);

/// Destination for closed segments.
pub trait ActivitySink {
    type Error: std::error::Error;

    /// Persists one closed segment and returns its identifier.
    fn record(&mut self, segment: &Segment) -> Result<ActivityId, Self::Error>;
}

/// Configuration for the segment tracker.
#[derive(Debug, Clone)]
pub struct TrackerConfig {
    /// Inactivity after which the user is considered idle.
    /// Default: 60 seconds.
    pub idle_threshold: Duration,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            idle_threshold: DEFAULT_IDLE_THRESHOLD,
        }
    }
}

/// What the driver observed on one tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickInput {
    /// Idle duration reached the threshold.
    Idle,
    /// The user is active. `window` is `None` when the window probe failed.
    Active { window: Option<WindowSample> },
}

/// The tracker's single open segment, if any.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum TrackerState {
    #[default]
    NoSegment,
    Active {
        window: WindowSample,
        start: DateTime<Utc>,
    },
    Idle {
        start: DateTime<Utc>,
    },
}

/// The open active segment, as exposed to reporting code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurrentActivity<'a> {
    pub window: &'a WindowSample,
    pub since: DateTime<Utc>,
}

/// State machine owning the currently open segment.
#[derive(Debug, Default)]
pub struct SegmentTracker {
    config: TrackerConfig,
    state: TrackerState,
}

impl SegmentTracker {
    pub fn new(config: TrackerConfig) -> Self {
        Self {
            config,
            state: TrackerState::NoSegment,
        }
    }

    pub const fn state(&self) -> &TrackerState {
        &self.state
    }

    /// Returns `true` if an idle duration reaches the configured threshold.
    pub fn is_idle(&self, idle_for: Duration) -> bool {
        idle_for >= self.config.idle_threshold
    }

    /// The open active segment, if the user is currently on a window.
    pub fn current(&self) -> Option<CurrentActivity<'_>> {
        match &self.state {
            TrackerState::Active { window, start } => Some(CurrentActivity {
                window,
                since: *start,
            }),
            TrackerState::NoSegment | TrackerState::Idle { .. } => None,
        }
    }

    /// Applies one tick's observation at instant `now`.
    ///
    /// Returns the identifier of the segment persisted on this tick, if any.
    pub fn tick<S: ActivitySink>(
        &mut self,
        now: DateTime<Utc>,
        input: TickInput,
        sink: &mut S,
    ) -> Result<Option<ActivityId>, S::Error> {
        match input {
            TickInput::Idle => self.enter_idle(now, sink),
            TickInput::Active { window } => {
                let mut closed = self.leave_idle(now, sink)?;
                if let Some(window) = window {
                    if let Some(id) = self.observe_window(window, now, sink)? {
                        closed = Some(id);
                    }
                }
                Ok(closed)
            }
        }
    }

    /// Closes the open active segment before the process exits.
    ///
    /// An open idle segment is discarded; the next run starts fresh.
    pub fn shutdown<S: ActivitySink>(
        &mut self,
        now: DateTime<Utc>,
        sink: &mut S,
    ) -> Result<Option<ActivityId>, S::Error> {
        let segment = match &self.state {
            TrackerState::Active { window, start } => Some(Segment::active(window, *start, now)),
            TrackerState::Idle { .. } | TrackerState::NoSegment => None,
        };
        let closed = match segment {
            Some(segment) => persist(segment, sink)?,
            None => None,
        };
        self.state = TrackerState::NoSegment;
        Ok(closed)
    }

    fn enter_idle<S: ActivitySink>(
        &mut self,
        now: DateTime<Utc>,
        sink: &mut S,
    ) -> Result<Option<ActivityId>, S::Error> {
        let segment = match &self.state {
            TrackerState::Idle { .. } => return Ok(None),
            TrackerState::NoSegment => None,
            TrackerState::Active { window, start } => Some(Segment::active(window, *start, now)),
        };
        let closed = match segment {
            Some(segment) => persist(segment, sink)?,
            None => None,
        };
        tracing::info!(since = %now, "user idle");
        self.state = TrackerState::Idle { start: now };
        Ok(closed)
    }

    fn leave_idle<S: ActivitySink>(
        &mut self,
        now: DateTime<Utc>,
        sink: &mut S,
    ) -> Result<Option<ActivityId>, S::Error> {
        let TrackerState::Idle { start } = self.state else {
            return Ok(None);
        };
        let closed = persist(Segment::idle(start, now), sink)?;
        tracing::info!(idle_since = %start, "user back");
        self.state = TrackerState::NoSegment;
        Ok(closed)
    }

    fn observe_window<S: ActivitySink>(
        &mut self,
        window: WindowSample,
        now: DateTime<Utc>,
        sink: &mut S,
    ) -> Result<Option<ActivityId>, S::Error> {
        let segment = match &self.state {
            TrackerState::Active { window: current, .. } if current.same_window(&window) => {
                return Ok(None);
            }
            TrackerState::Active {
                window: current,
                start,
            } => Some(Segment::active(current, *start, now)),
            TrackerState::NoSegment | TrackerState::Idle { .. } => None,
        };
        let closed = match segment {
            Some(segment) => persist(segment, sink)?,
            None => None,
        };
        tracing::info!(
            app = %window.app_name,
            title = %window.window_title,
            "activity changed"
        );
        self.state = TrackerState::Active { window, start: now };
        Ok(closed)
    }
}

fn persist<S: ActivitySink>(
    segment: Result<Segment, ValidationError>,
    sink: &mut S,
) -> Result<Option<ActivityId>, S::Error> {
    let segment = match segment {
        Ok(segment) => segment,
        Err(err) => {
            tracing::debug!(%err, "dropping segment without duration");
            return Ok(None);
        }
    };
    let id = sink.record(&segment)?;
    tracing::info!(
        %id,
        app = segment.app_name(),
        label = segment.enriched_name().unwrap_or_default(),
        duration_seconds = segment.duration_seconds(),
        idle = segment.is_idle(),
        "activity saved"
    );
    Ok(Some(id))
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::TimeZone;
    use thiserror::Error;

    use crate::activity::IDLE_APP_NAME;

    #[derive(Debug, Error)]
    #[error("sink offline")]
    struct SinkOffline;

    #[derive(Debug, Default)]
    struct MemorySink {
        segments: Vec<Segment>,
        offline: bool,
    }

    impl ActivitySink for MemorySink {
        type Error = SinkOffline;

        fn record(&mut self, segment: &Segment) -> Result<ActivityId, Self::Error> {
            if self.offline {
                return Err(SinkOffline);
            }
            self.segments.push(segment.clone());
            Ok(ActivityId::new(i64::try_from(self.segments.len()).unwrap()))
        }
    }

    fn at(seconds: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 15, 9, 0, 0).unwrap() + chrono::Duration::seconds(seconds)
    }

    fn window(app: &str, title: &str) -> WindowSample {
        WindowSample {
            app_name: app.to_string(),
            window_title: title.to_string(),
            process_path: format!("/usr/bin/{}", app.to_lowercase()),
            sampled_at: at(0),
        }
    }

    fn active(app: &str, title: &str) -> TickInput {
        TickInput::Active {
            window: Some(window(app, title)),
        }
    }

    fn assert_segment_invariants(segments: &[Segment]) {
        for segment in segments {
            assert!(segment.end_time() > segment.start_time());
            assert_eq!(
                segment.duration_seconds(),
                (segment.end_time() - segment.start_time()).num_seconds()
            );
            if segment.is_idle() {
                assert_eq!(segment.app_name(), IDLE_APP_NAME);
                assert_eq!(segment.process_path(), "");
                assert_eq!(segment.enriched_name(), None);
            } else {
                assert!(segment.enriched_name().is_some());
            }
        }
    }

    fn assert_contiguous(segments: &[Segment]) {
        for pair in segments.windows(2) {
            assert_eq!(pair[1].start_time(), pair[0].end_time());
        }
    }

    #[test]
    fn unchanged_window_extends_segment_until_change() {
        let mut tracker = SegmentTracker::default();
        let mut sink = MemorySink::default();

        tracker.tick(at(0), active("App A", "Win1"), &mut sink).unwrap();
        tracker.tick(at(2), active("App A", "Win1"), &mut sink).unwrap();
        let closed = tracker.tick(at(4), active("App B", "Win2"), &mut sink).unwrap();

        assert_eq!(closed, Some(ActivityId::new(1)));
        assert_eq!(sink.segments.len(), 1);
        let segment = &sink.segments[0];
        assert_eq!(segment.app_name(), "App A");
        assert_eq!(segment.window_title(), "Win1");
        assert_eq!(segment.start_time(), at(0));
        assert_eq!(segment.end_time(), at(4));
        assert_eq!(segment.duration_seconds(), 4);

        let current = tracker.current().unwrap();
        assert_eq!(current.window.app_name, "App B");
        assert_eq!(current.window.window_title, "Win2");
        assert_eq!(current.since, at(4));
    }

    #[test]
    fn process_path_change_is_not_a_boundary() {
        let mut tracker = SegmentTracker::default();
        let mut sink = MemorySink::default();

        tracker.tick(at(0), active("Terminal", "zsh"), &mut sink).unwrap();
        let mut moved = window("Terminal", "zsh");
        moved.process_path = "/opt/terminal/bin/terminal".to_string();
        tracker
            .tick(at(2), TickInput::Active { window: Some(moved) }, &mut sink)
            .unwrap();

        assert!(sink.segments.is_empty());
        assert_eq!(tracker.current().unwrap().since, at(0));
    }

    #[test]
    fn going_idle_closes_active_segment() {
        let mut tracker = SegmentTracker::default();
        let mut sink = MemorySink::default();

        tracker.tick(at(0), active("Terminal", "zsh"), &mut sink).unwrap();
        tracker.tick(at(10), TickInput::Idle, &mut sink).unwrap();
        tracker.tick(at(12), TickInput::Idle, &mut sink).unwrap();

        assert_eq!(sink.segments.len(), 1);
        assert!(!sink.segments[0].is_idle());
        assert_eq!(sink.segments[0].end_time(), at(10));
        assert_eq!(tracker.state(), &TrackerState::Idle { start: at(10) });
    }

    #[test]
    fn returning_from_idle_closes_idle_segment_and_opens_window() {
        let mut tracker = SegmentTracker::default();
        let mut sink = MemorySink::default();

        tracker.tick(at(0), active("Terminal", "zsh"), &mut sink).unwrap();
        tracker.tick(at(10), TickInput::Idle, &mut sink).unwrap();
        let closed = tracker.tick(at(70), active("Terminal", "zsh"), &mut sink).unwrap();

        assert_eq!(closed, Some(ActivityId::new(2)));
        assert_eq!(sink.segments.len(), 2);
        let idle = &sink.segments[1];
        assert!(idle.is_idle());
        assert_eq!(idle.app_name(), IDLE_APP_NAME);
        assert_eq!(idle.start_time(), at(10));
        assert_eq!(idle.end_time(), at(70));
        assert_eq!(tracker.current().unwrap().since, at(70));
        assert_contiguous(&sink.segments);
    }

    #[test]
    fn idle_from_startup_opens_idle_segment() {
        let mut tracker = SegmentTracker::default();
        let mut sink = MemorySink::default();

        tracker.tick(at(0), TickInput::Idle, &mut sink).unwrap();

        assert!(sink.segments.is_empty());
        assert_eq!(tracker.state(), &TrackerState::Idle { start: at(0) });
    }

    #[test]
    fn window_probe_failure_leaves_active_segment_untouched() {
        let mut tracker = SegmentTracker::default();
        let mut sink = MemorySink::default();

        tracker.tick(at(0), active("Terminal", "zsh"), &mut sink).unwrap();
        tracker
            .tick(at(2), TickInput::Active { window: None }, &mut sink)
            .unwrap();
        tracker.tick(at(4), active("Terminal", "vim"), &mut sink).unwrap();

        assert_eq!(sink.segments.len(), 1);
        assert_eq!(sink.segments[0].start_time(), at(0));
        assert_eq!(sink.segments[0].end_time(), at(4));
    }

    #[test]
    fn window_probe_failure_after_idle_still_closes_idle() {
        let mut tracker = SegmentTracker::default();
        let mut sink = MemorySink::default();

        tracker.tick(at(0), TickInput::Idle, &mut sink).unwrap();
        tracker
            .tick(at(30), TickInput::Active { window: None }, &mut sink)
            .unwrap();

        assert_eq!(sink.segments.len(), 1);
        assert!(sink.segments[0].is_idle());
        assert_eq!(tracker.state(), &TrackerState::NoSegment);
    }

    #[test]
    fn zero_length_segment_is_dropped_but_state_advances() {
        let mut tracker = SegmentTracker::default();
        let mut sink = MemorySink::default();

        tracker.tick(at(0), active("App A", "Win1"), &mut sink).unwrap();
        tracker.tick(at(2), active("App B", "Win2"), &mut sink).unwrap();
        let closed = tracker.tick(at(2), active("App C", "Win3"), &mut sink).unwrap();

        assert_eq!(closed, None);
        assert_eq!(sink.segments.len(), 1);
        assert_eq!(tracker.current().unwrap().window.app_name, "App C");
        assert_segment_invariants(&sink.segments);
    }

    #[test]
    fn sink_failure_keeps_segment_open_for_retry() {
        let mut tracker = SegmentTracker::default();
        let mut sink = MemorySink::default();

        tracker.tick(at(0), active("App A", "Win1"), &mut sink).unwrap();
        sink.offline = true;
        assert!(tracker.tick(at(2), active("App B", "Win2"), &mut sink).is_err());
        assert_eq!(tracker.current().unwrap().window.app_name, "App A");

        sink.offline = false;
        tracker.tick(at(4), active("App B", "Win2"), &mut sink).unwrap();

        assert_eq!(sink.segments.len(), 1);
        assert_eq!(sink.segments[0].app_name(), "App A");
        assert_eq!(sink.segments[0].end_time(), at(4));
        assert_eq!(tracker.current().unwrap().since, at(4));
    }

    #[test]
    fn sink_failure_while_leaving_idle_keeps_idle_open() {
        let mut tracker = SegmentTracker::default();
        let mut sink = MemorySink::default();

        tracker.tick(at(0), TickInput::Idle, &mut sink).unwrap();
        sink.offline = true;
        assert!(tracker.tick(at(20), active("App A", "Win1"), &mut sink).is_err());
        assert_eq!(tracker.state(), &TrackerState::Idle { start: at(0) });
    }

    #[test]
    fn shutdown_flushes_active_segment() {
        let mut tracker = SegmentTracker::default();
        let mut sink = MemorySink::default();

        tracker.tick(at(0), active("Terminal", "zsh"), &mut sink).unwrap();
        let closed = tracker.shutdown(at(7), &mut sink).unwrap();

        assert_eq!(closed, Some(ActivityId::new(1)));
        assert_eq!(sink.segments[0].end_time(), at(7));
        assert_eq!(tracker.state(), &TrackerState::NoSegment);
    }

    #[test]
    fn shutdown_discards_idle_segment() {
        let mut tracker = SegmentTracker::default();
        let mut sink = MemorySink::default();

        tracker.tick(at(0), TickInput::Idle, &mut sink).unwrap();
        let closed = tracker.shutdown(at(100), &mut sink).unwrap();

        assert_eq!(closed, None);
        assert!(sink.segments.is_empty());
        assert_eq!(tracker.state(), &TrackerState::NoSegment);
    }

    #[test]
    fn idle_threshold_is_inclusive() {
        let tracker = SegmentTracker::new(TrackerConfig {
            idle_threshold: Duration::from_secs(30),
        });
        assert!(!tracker.is_idle(Duration::from_secs(29)));
        assert!(tracker.is_idle(Duration::from_secs(30)));
    }

    #[test]
    fn long_tick_sequences_stay_contiguous() {
        let apps = [
            ("Google Chrome", "Trending - YouTube"),
            ("Visual Studio Code", "lib.rs — wt-core — Workspace"),
            ("Terminal", "zsh"),
        ];
        let mut tracker = SegmentTracker::default();
        let mut sink = MemorySink::default();

        // Deterministic pseudo-random walk over idle/active and window changes.
        let mut seed: u64 = 0x2545_f491_4f6c_dd1d;
        let mut seconds = 0;
        for _ in 0..500 {
            seed ^= seed << 13;
            seed ^= seed >> 7;
            seed ^= seed << 17;
            let input = if seed % 7 == 0 {
                TickInput::Idle
            } else {
                let (app, title) = apps[usize::try_from(seed % 3).unwrap()];
                active(app, title)
            };
            tracker.tick(at(seconds), input, &mut sink).unwrap();
            seconds += 2;
        }
        tracker.shutdown(at(seconds), &mut sink).unwrap();

        assert!(!sink.segments.is_empty());
        assert_segment_invariants(&sink.segments);
        assert_contiguous(&sink.segments);
        let covered: i64 = sink.segments.iter().map(Segment::duration_seconds).sum();
        assert!(covered <= seconds);
    }
}
