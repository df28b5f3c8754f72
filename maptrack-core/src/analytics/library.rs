//! Library view
//!
//! All-time per-map rows for the library screen. Play time comes from the
//! daily buckets (which outlive individual session records), while session
//! counts and first/last played come from the session log when it still has
//! entries for the map.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

use super::display_title;
use crate::timeutil;
use crate::types::StoreData;

/// One row of the all-time library listing.
#[derive(Debug, Clone, Serialize)]
pub struct LibraryRow {
    pub map_id: String,
    pub title: String,
    pub total_play_time_ms: u64,
    pub play_count: u64,
    pub first_played: Option<DateTime<Utc>>,
    pub last_played: Option<DateTime<Utc>>,
}

/// All-time rows, most-played first. Maps that only survive in the daily
/// buckets (their sessions aged out of the log) still get a row, with
/// bucket day boundaries standing in for first/last played.
pub fn library_rows(data: &StoreData) -> Vec<LibraryRow> {
    // Bucket totals are authoritative for play time
    let mut totals: BTreeMap<String, u64> = BTreeMap::new();
    let mut bucket_bounds: BTreeMap<String, (DateTime<Utc>, DateTime<Utc>)> = BTreeMap::new();
    for (key, day_totals) in &data.daily_totals {
        let day = timeutil::parse_day_key(key);
        for (map_id, ms) in day_totals {
            if *ms == 0 {
                continue;
            }
            *totals.entry(map_id.clone()).or_insert(0) += ms;
            if let Some(day) = day {
                bucket_bounds
                    .entry(map_id.clone())
                    .and_modify(|(first, last)| {
                        if day < *first {
                            *first = day;
                        }
                        if day > *last {
                            *last = day;
                        }
                    })
                    .or_insert((day, day));
            }
        }
    }

    // The session log is authoritative for counts and timestamps
    let mut log: BTreeMap<String, (u64, DateTime<Utc>, DateTime<Utc>)> = BTreeMap::new();
    for session in &data.sessions {
        log.entry(session.map_id.clone())
            .and_modify(|(count, first, last)| {
                *count += 1;
                if session.started_at < *first {
                    *first = session.started_at;
                }
                if session.ended_at > *last {
                    *last = session.ended_at;
                }
            })
            .or_insert((1, session.started_at, session.ended_at));
    }

    let mut rows: Vec<LibraryRow> = totals
        .into_iter()
        .map(|(map_id, total_ms)| {
            let (play_count, first_played, last_played) = match log.get(&map_id) {
                Some(&(count, first, last)) => (count, Some(first), Some(last)),
                None => {
                    // Sessions aged out; fall back to bucket day boundaries
                    let bounds = bucket_bounds.get(&map_id).copied();
                    (1, bounds.map(|(f, _)| f), bounds.map(|(_, l)| l))
                }
            };
            LibraryRow {
                title: display_title(data, &map_id),
                total_play_time_ms: total_ms,
                play_count,
                first_played,
                last_played,
                map_id,
            }
        })
        .collect();
    rows.sort_by(|a, b| b.total_play_time_ms.cmp(&a.total_play_time_ms));
    rows
}
