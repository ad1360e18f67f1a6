//! Core type definitions with validation.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Validation errors for core types.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A segment would end at or before its start, or round to zero seconds.
    #[error("segment from {start} to {end} has no positive duration")]
    NonPositiveDuration {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
}

/// Identifier assigned by the store on insert.
///
/// Identifiers are strictly increasing in insertion order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActivityId(i64);

impl ActivityId {
    /// Wraps a raw row identifier.
    #[must_use]
    pub const fn new(id: i64) -> Self {
        Self(id)
    }
}

impl fmt::Display for ActivityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<ActivityId> for i64 {
    fn from(id: ActivityId) -> Self {
        id.0
    }
}
