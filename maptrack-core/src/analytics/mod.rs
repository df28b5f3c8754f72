//! Analytics facades for maptrack
//!
//! Three read-only views over a store snapshot:
//! - [`ranking`] - ranked maps with 7-day momentum trends
//! - [`dashboard`] - playtime trend, category breakdown, period
//!   comparison, recent sessions, top 5
//! - [`library`] - one row per ever-played map, range-independent
//!
//! Every facade function is a pure function of a [`StoreData`] snapshot
//! plus an explicit `now`; none of them mutate anything or touch the
//! backend. The facades do not depend on each other - shared aggregation
//! lives in this module.

pub mod dashboard;
pub mod library;
pub mod ranking;

pub use dashboard::{
    category_data, comparison_data, dashboard_data, overview_stats, playtime_trend,
    recent_sessions, top5_maps, CategorySlice, ComparisonData, DashboardData, OverviewStats,
    PeriodSummary, PlaytimeTrend, RecentSession, TopMapRow,
};
pub use library::{library_rows, LibraryRow};
pub use ranking::{top_maps, MetadataResolver, RankedMap};

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

use crate::timeutil;
use crate::types::{StoreData, TimeRange};

/// Per-map rollup over a reporting window.
#[derive(Debug, Default, Clone)]
pub(crate) struct MapAgg {
    /// Accumulated milliseconds inside the window
    pub total_ms: u64,
    /// Number of in-window days with nonzero play time
    pub play_days: u64,
    /// Start of the most recent in-window day with nonzero play time
    pub last_played: Option<DateTime<Utc>>,
}

/// Roll the day buckets inside `range` up per map.
///
/// Day keys that fail to parse are skipped; persisted data may pre-date
/// schema changes and a bad key must not abort the whole aggregation.
pub(crate) fn aggregate_range(
    data: &StoreData,
    range: TimeRange,
    now: DateTime<Utc>,
) -> BTreeMap<String, MapAgg> {
    let start = timeutil::range_start(range, now);
    let mut per_map: BTreeMap<String, MapAgg> = BTreeMap::new();

    for (key, day_totals) in &data.daily_totals {
        let Some(day) = timeutil::parse_day_key(key) else {
            continue;
        };
        if day < start {
            continue;
        }
        for (map_id, &ms) in day_totals {
            if ms == 0 {
                continue;
            }
            let agg = per_map.entry(map_id.clone()).or_default();
            agg.total_ms += ms;
            agg.play_days += 1;
            agg.last_played = Some(agg.last_played.map_or(day, |prev| prev.max(day)));
        }
    }

    per_map
}

/// Sum play time across all maps for day buckets in `[start, end)`.
pub(crate) fn sum_window(data: &StoreData, start: DateTime<Utc>, end: DateTime<Utc>) -> u64 {
    data.daily_totals
        .iter()
        .filter_map(|(key, day_totals)| {
            let day = timeutil::parse_day_key(key)?;
            if day >= start && day < end {
                Some(day_totals.values().sum::<u64>())
            } else {
                None
            }
        })
        .sum()
}

/// Fixed 7-day trend series for one map, oldest to newest.
///
/// Always 7 days regardless of the reporting window: it represents
/// short-term momentum, not the selected range.
pub(crate) fn trend_series(data: &StoreData, map_id: &str, now: DateTime<Utc>) -> Vec<u64> {
    timeutil::last_n_day_keys(now, 7)
        .iter()
        .map(|key| {
            data.daily_totals
                .get(key)
                .and_then(|day| day.get(map_id))
                .copied()
                .unwrap_or(0)
        })
        .collect()
}

/// Display title for a map: stored metadata title, falling back to the id.
pub(crate) fn display_title(data: &StoreData, map_id: &str) -> String {
    data.maps
        .get(map_id)
        .and_then(|m| m.title.clone())
        .unwrap_or_else(|| map_id.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(y: i32, mo: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, 12, 0, 0).unwrap()
    }

    fn store_with(buckets: &[(&str, &str, u64)]) -> StoreData {
        let mut data = StoreData::default();
        for (day, map, ms) in buckets {
            data.daily_totals
                .entry(day.to_string())
                .or_default()
                .insert(map.to_string(), *ms);
        }
        data
    }

    #[test]
    fn test_aggregate_range_filters_and_counts() {
        let now = at(2025, 6, 10);
        let data = store_with(&[
            ("2025-06-10", "dust2", 1000),
            ("2025-06-09", "dust2", 2000),
            ("2025-06-01", "dust2", 4000), // outside 7d
            ("2025-06-10", "mirage", 500),
        ]);

        let agg = aggregate_range(&data, TimeRange::Last7Days, now);
        assert_eq!(agg["dust2"].total_ms, 3000);
        assert_eq!(agg["dust2"].play_days, 2);
        assert_eq!(
            agg["dust2"].last_played,
            timeutil::parse_day_key("2025-06-10")
        );
        assert_eq!(agg["mirage"].total_ms, 500);

        let all = aggregate_range(&data, TimeRange::All, now);
        assert_eq!(all["dust2"].total_ms, 7000);
        assert_eq!(all["dust2"].play_days, 3);
    }

    #[test]
    fn test_aggregate_range_skips_malformed_day_keys() {
        let data = store_with(&[("2025-06-10", "dust2", 1000), ("corrupt", "dust2", 9999)]);
        let agg = aggregate_range(&data, TimeRange::All, at(2025, 6, 10));
        assert_eq!(agg["dust2"].total_ms, 1000);
    }

    #[test]
    fn test_trend_series_is_always_seven_days() {
        let now = at(2025, 6, 10);
        let data = store_with(&[
            ("2025-06-10", "dust2", 100),
            ("2025-06-04", "dust2", 700),
            ("2025-06-03", "dust2", 999), // 8 days ago, outside the window
        ]);

        let series = trend_series(&data, "dust2", now);
        assert_eq!(series, vec![700, 0, 0, 0, 0, 0, 100]);
    }

    #[test]
    fn test_sum_window_half_open() {
        let data = store_with(&[
            ("2025-06-09", "dust2", 100),
            ("2025-06-10", "dust2", 200),
            ("2025-06-11", "dust2", 400),
        ]);
        let start = timeutil::parse_day_key("2025-06-09").unwrap();
        let end = timeutil::parse_day_key("2025-06-11").unwrap();
        assert_eq!(sum_window(&data, start, end), 300);
    }
}
