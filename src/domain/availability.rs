//! Composed availability windows.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Source of an availability window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AvailabilityKind {
    Banner,
    Event,
}

/// A short lapse absorbed into a surrounding window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Gap {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// A presented window of obtainability for one item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Availability {
    pub kind: AvailabilityKind,
    /// `None` when the window spans differently named banners.
    pub name: Option<String>,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub gaps: Vec<Gap>,
    pub limited: bool,
}
