//! Core types for the tracker.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

/// Seconds since Unix epoch.
#[derive(
    Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub struct Timestamp(pub i64);

impl Timestamp {
    /// Current time.
    pub fn now() -> Self {
        let duration = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("Time went backwards");
        Timestamp(duration.as_secs() as i64)
    }
}

impl fmt::Debug for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Timestamp({})", self.0)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A single tracked series.
///
/// The external identifier doubles as the store key. Descriptive fields the
/// tracker does not interpret round-trip through `extra` untouched.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Series {
    /// External identifier (e.g. a media-database id). Required, non-empty.
    #[serde(rename = "ExternalID", default)]
    pub external_id: String,

    /// Display title. May be empty.
    #[serde(rename = "Title", default)]
    pub title: String,

    /// Last modification time, stamped by the tracker on every write.
    #[serde(rename = "Modified", default)]
    pub modified: Timestamp,

    /// Opaque descriptive attributes, carried through unmodified.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Series {
    /// A series is valid iff its external identifier is non-empty.
    /// No other field is checked.
    pub fn is_valid(&self) -> bool {
        !self.external_id.is_empty()
    }

    /// Refresh the modification time to the current wall clock.
    ///
    /// Called immediately before every accepted persist; a client-supplied
    /// value never survives a write.
    pub fn touch(&mut self) {
        self.modified = Timestamp::now();
    }
}
