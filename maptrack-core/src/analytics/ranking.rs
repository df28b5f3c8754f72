//! Ranked map view
//!
//! Turns a store snapshot into a ranked list of maps for a reporting
//! window, each row carrying a fixed 7-day momentum trend.
//!
//! Ordering is total play time descending; ties break on map id lexical
//! order (the aggregation iterates a `BTreeMap` and the sort is stable),
//! so equal totals always rank deterministically.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::{aggregate_range, trend_series};
use crate::trend::{classify, DeadzonePolicy, TrendDirection};
use crate::types::{MapMetadata, StoreData, TimeRange};

/// External source of display metadata, consulted before the store's own
/// metadata (e.g. a workshop catalog the overlay keeps elsewhere).
pub trait MetadataResolver {
    fn resolve(&self, map_id: &str) -> Option<MapMetadata>;
}

/// One row of the ranked view.
#[derive(Debug, Clone, Serialize)]
pub struct RankedMap {
    /// 1-based position after sorting
    pub rank: usize,
    pub map_id: String,
    pub title: Option<String>,
    pub thumbnail: Option<String>,
    /// Milliseconds played inside the reporting window
    pub time_played_ms: u64,
    /// In-window days with nonzero play time
    pub play_count: u64,
    /// Start of the most recent in-window day played
    pub last_played: Option<DateTime<Utc>>,
    /// Last 7 calendar days of play time, oldest first - always 7 days
    /// regardless of the reporting window
    pub trend: Vec<u64>,
    pub trend_direction: TrendDirection,
    pub trend_label: String,
}

/// Rank maps by play time within `range`.
///
/// Pure function of the snapshot; metadata comes from `resolver` first,
/// then the store's own metadata. Maps with no in-window play time do not
/// appear.
pub fn top_maps(
    data: &StoreData,
    range: TimeRange,
    now: DateTime<Utc>,
    resolver: Option<&dyn MetadataResolver>,
) -> Vec<RankedMap> {
    let per_map = aggregate_range(data, range, now);

    // BTreeMap iteration is lexical by map id; the stable sort preserves
    // that order for equal totals.
    let mut entries: Vec<_> = per_map.into_iter().collect();
    entries.sort_by(|a, b| b.1.total_ms.cmp(&a.1.total_ms));

    entries
        .into_iter()
        .enumerate()
        .map(|(idx, (map_id, agg))| {
            let meta = resolver
                .and_then(|r| r.resolve(&map_id))
                .or_else(|| data.maps.get(&map_id).cloned());
            let trend = trend_series(data, &map_id, now);
            let classified = classify(&trend, DeadzonePolicy::ranking());

            RankedMap {
                rank: idx + 1,
                map_id,
                title: meta.as_ref().and_then(|m| m.title.clone()),
                thumbnail: meta.as_ref().and_then(|m| m.thumbnail.clone()),
                time_played_ms: agg.total_ms,
                play_count: agg.play_days,
                last_played: agg.last_played,
                trend,
                trend_direction: classified.direction,
                trend_label: classified.label(),
            }
        })
        .collect()
}
