//! Core domain logic for the window-time tracker.
//!
//! This crate contains the fundamental types and logic for:
//! - Classification: deriving short labels from browser and editor titles
//! - Segmentation: turning periodic probe samples into closed activities
//! - Probe capabilities: the platform interfaces the tracker consumes

pub mod activity;
pub mod classify;
pub mod probe;
pub mod tracker;
pub mod types;

pub use activity::{
    Activity, IDLE_APP_NAME, IDLE_WINDOW_TITLE, Segment, WindowSample, round_duration_seconds,
};
pub use classify::classify;
pub use probe::{IdleProbe, ProbeError, WindowProbe};
pub use tracker::{
    ActivitySink, CurrentActivity, SegmentTracker, TickInput, TrackerConfig, TrackerState,
};
pub use types::{ActivityId, ValidationError};
