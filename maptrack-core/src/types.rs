//! Core domain types for maptrack
//!
//! These types form the persisted data model of the session store.
//!
//! ## Terminology
//!
//! | Term | Definition |
//! |------|------------|
//! | **Map** | An in-game destination a player can be in; identified by a stable map id |
//! | **ActiveSession** | The single session currently being timed (at most one exists) |
//! | **MapSession** | A completed visit to a map with a positive duration |
//! | **Daily totals** | Per calendar day, per map, accumulated play time in milliseconds |
//! | **Day key** | A UTC calendar day rendered as `YYYY-MM-DD` |
//!
//! Everything here round-trips through serde: the whole [`StoreData`] is
//! serialized as one JSON blob into the persistence backend. Fields use
//! `#[serde(default)]` so blobs written by older versions still load.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Schema version written into every persisted blob.
pub const STORE_VERSION: u32 = 1;

// ============================================
// Sessions
// ============================================

/// The session currently being timed.
///
/// At most one instance exists at any time; it is owned by the store and
/// converted into a [`MapSession`] when closed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveSession {
    /// Map being played
    pub map_id: String,
    /// When the player entered the map
    pub started_at: DateTime<Utc>,
}

/// A completed visit to a map.
///
/// Invariant: `ended_at > started_at`. Sessions that would violate this are
/// discarded by the store and never constructed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapSession {
    /// Map that was played
    pub map_id: String,
    /// When the visit began
    pub started_at: DateTime<Utc>,
    /// When the visit ended
    pub ended_at: DateTime<Utc>,
}

impl MapSession {
    /// Session length in milliseconds.
    pub fn duration_ms(&self) -> u64 {
        (self.ended_at - self.started_at).num_milliseconds().max(0) as u64
    }
}

// ============================================
// Daily totals
// ============================================

/// Day key (`YYYY-MM-DD`) -> map id -> accumulated milliseconds.
///
/// `BTreeMap` keeps iteration deterministic: day keys sort chronologically
/// and map ids sort lexically, which is what gives rankings a stable
/// tie-break.
pub type DailyTotals = BTreeMap<String, BTreeMap<String, u64>>;

// ============================================
// Map metadata
// ============================================

/// Optional display metadata for a map, independent of usage data.
///
/// Last-write-wins per field; fields absent from an update keep their
/// previous value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapMetadata {
    /// Map this metadata describes
    pub map_id: String,
    /// Display title
    #[serde(default)]
    pub title: Option<String>,
    /// Thumbnail URL or asset path
    #[serde(default)]
    pub thumbnail: Option<String>,
    /// When any field was last written
    pub updated_at: DateTime<Utc>,
}

/// Partial metadata supplied by callers on `start()` or an explicit update.
///
/// `None` fields mean "leave the stored value alone".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapMetadataPatch {
    /// New display title, if known
    #[serde(default)]
    pub title: Option<String>,
    /// New thumbnail, if known
    #[serde(default)]
    pub thumbnail: Option<String>,
}

// ============================================
// Store aggregate
// ============================================

/// The full persisted state of the session store.
///
/// Loaded once at startup, cached in memory, and written back as a single
/// JSON blob after every mutation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreData {
    /// Schema version of this blob
    #[serde(default = "default_version")]
    pub version: u32,
    /// The single in-flight session, if any
    #[serde(default)]
    pub active_session: Option<ActiveSession>,
    /// Completed sessions, in close order; pruned by retention
    #[serde(default)]
    pub sessions: Vec<MapSession>,
    /// Day-bucketed play time
    #[serde(default)]
    pub daily_totals: DailyTotals,
    /// Display metadata per map
    #[serde(default)]
    pub maps: BTreeMap<String, MapMetadata>,
    /// When retention cleanup last ran
    #[serde(default)]
    pub last_cleanup_at: Option<DateTime<Utc>>,
}

fn default_version() -> u32 {
    STORE_VERSION
}

impl Default for StoreData {
    fn default() -> Self {
        Self {
            version: STORE_VERSION,
            active_session: None,
            sessions: Vec::new(),
            daily_totals: BTreeMap::new(),
            maps: BTreeMap::new(),
            last_cleanup_at: None,
        }
    }
}

// ============================================
// Query ranges
// ============================================

/// Reporting window for the analytics facades.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimeRange {
    /// Current calendar day
    #[serde(rename = "today")]
    Today,
    /// Last 7 calendar days including today
    #[serde(rename = "7d")]
    Last7Days,
    /// Last 30 calendar days including today
    #[serde(rename = "30d")]
    Last30Days,
    /// Everything ever recorded
    #[serde(rename = "all")]
    All,
}

impl Default for TimeRange {
    fn default() -> Self {
        TimeRange::Last7Days
    }
}

impl TimeRange {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimeRange::Today => "today",
            TimeRange::Last7Days => "7d",
            TimeRange::Last30Days => "30d",
            TimeRange::All => "all",
        }
    }
}

impl std::str::FromStr for TimeRange {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "today" => Ok(TimeRange::Today),
            "7d" => Ok(TimeRange::Last7Days),
            "30d" => Ok(TimeRange::Last30Days),
            "all" => Ok(TimeRange::All),
            _ => Err(format!("unknown time range: {}", s)),
        }
    }
}

impl std::fmt::Display for TimeRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_map_session_duration() {
        let session = MapSession {
            map_id: "dust2".to_string(),
            started_at: Utc.with_ymd_and_hms(2025, 6, 1, 10, 0, 0).unwrap(),
            ended_at: Utc.with_ymd_and_hms(2025, 6, 1, 11, 30, 0).unwrap(),
        };
        assert_eq!(session.duration_ms(), 90 * 60 * 1000);
    }

    #[test]
    fn test_time_range_round_trip() {
        for range in [
            TimeRange::Today,
            TimeRange::Last7Days,
            TimeRange::Last30Days,
            TimeRange::All,
        ] {
            let parsed: TimeRange = range.as_str().parse().unwrap();
            assert_eq!(parsed, range);
        }
        assert!("yesterday".parse::<TimeRange>().is_err());
    }

    #[test]
    fn test_store_data_tolerates_missing_fields() {
        // A minimal blob from an older schema still loads with defaults.
        let data: StoreData = serde_json::from_str("{}").unwrap();
        assert_eq!(data.version, STORE_VERSION);
        assert!(data.active_session.is_none());
        assert!(data.sessions.is_empty());
        assert!(data.daily_totals.is_empty());
    }
}
