//! Append-only history log entries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// One row of the history log. The payload is a JSON document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: i32,
    /// Epoch seconds.
    pub time: i64,
    pub payload: Vec<u8>,
}

impl HistoryEntry {
    /// Entry time as a UTC timestamp, `None` if out of range.
    #[must_use]
    pub fn datetime(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.time, 0)
    }

    /// Entry date formatted as `%Y-%m-%d`.
    #[must_use]
    pub fn date_string(&self) -> Option<String> {
        self.datetime().map(|dt| dt.format("%Y-%m-%d").to_string())
    }

    /// Decode the payload.
    ///
    /// # Errors
    /// Returns an error if the payload is not valid JSON.
    pub fn payload_json(&self) -> Result<serde_json::Value> {
        Ok(serde_json::from_slice(&self.payload)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_date_and_decodes_payload() {
        let entry = HistoryEntry {
            id: 1,
            time: 1_767_225_600, // 2026-01-01T00:00:00Z
            payload: br#"{"added":[100001]}"#.to_vec(),
        };
        assert_eq!(entry.date_string().as_deref(), Some("2026-01-01"));
        let json = entry.payload_json().unwrap();
        assert_eq!(json["added"][0], 100_001);
    }

    #[test]
    fn invalid_payload_is_an_error() {
        let entry = HistoryEntry {
            id: 2,
            time: 0,
            payload: b"not json".to_vec(),
        };
        assert!(entry.payload_json().is_err());
    }
}
