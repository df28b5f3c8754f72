//! Dashboard view models
//!
//! Range-parameterized aggregates for the overlay's dashboard: a playtime
//! trend series at range-appropriate granularity, a category breakdown, a
//! current-vs-previous-period comparison, recent sessions and a top-5
//! list, plus overall stats. All pure functions of a snapshot.

use chrono::{DateTime, Datelike, Duration, NaiveDate, Timelike, Utc};
use serde::Serialize;

use super::{aggregate_range, display_title, sum_window};
use crate::format::format_time_ago;
use crate::timeutil;
use crate::trend::{classify, DeadzonePolicy, TrendDirection};
use crate::types::{StoreData, TimeRange};

/// How many maps become pseudo-categories before the rest fold into
/// "Other". No true category taxonomy exists yet.
const CATEGORY_LIMIT: usize = 5;

/// Default row count for the recent-sessions list.
pub const RECENT_SESSIONS_LIMIT: usize = 10;

/// Three-hour bucket labels for the intra-day trend.
const TODAY_BUCKET_LABELS: [&str; 6] = ["12am", "3am", "6am", "9am", "12pm", "3pm"];

const MONTH_ABBREV: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

// ============================================
// View models
// ============================================

/// Labeled playtime series; `labels` and `minutes` are parallel arrays.
#[derive(Debug, Clone, Serialize)]
pub struct PlaytimeTrend {
    pub labels: Vec<String>,
    pub minutes: Vec<u64>,
}

/// One slice of the category breakdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategorySlice {
    pub name: String,
    pub minutes: u64,
}

/// Aggregate numbers for one comparison period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PeriodSummary {
    pub label: String,
    pub total_minutes: u64,
    pub session_count: u64,
    pub avg_session_minutes: u64,
}

/// Current period vs the immediately preceding period of equal length.
///
/// `change_pct` is `None` when the previous period has no play time; the
/// UI then shows only the direction icon.
#[derive(Debug, Clone, Serialize)]
pub struct ComparisonData {
    pub current: PeriodSummary,
    pub previous: PeriodSummary,
    pub direction: TrendDirection,
    pub change_pct: Option<f64>,
}

/// One row of the recent-sessions list.
#[derive(Debug, Clone, Serialize)]
pub struct RecentSession {
    pub map_id: String,
    pub title: String,
    pub started_at: DateTime<Utc>,
    pub duration_minutes: u64,
    pub time_ago: String,
}

/// One row of the top-5 list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TopMapRow {
    pub map_id: String,
    pub title: String,
    pub minutes: u64,
}

/// Range-independent headline numbers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OverviewStats {
    pub total_play_time_ms: u64,
    pub maps_played: u64,
    pub session_count: u64,
    pub avg_session_minutes: u64,
}

/// Everything the dashboard renders for one reporting window.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardData {
    pub playtime_trend: PlaytimeTrend,
    pub categories: Vec<CategorySlice>,
    pub comparison: ComparisonData,
    pub recent_sessions: Vec<RecentSession>,
    pub top_maps: Vec<TopMapRow>,
}

// ============================================
// Playtime trend
// ============================================

/// Playtime series bucketed to range-appropriate granularity.
///
/// - `today`: 6 three-hour buckets filled with a cumulative estimate of
///   today's total (not a true intra-day histogram; the store only keeps
///   day-granular buckets)
/// - `7d`: one bucket per calendar day
/// - `30d`: 4 weekly buckets
/// - `all`: 4 monthly buckets, current month and the 3 preceding
pub fn playtime_trend(data: &StoreData, range: TimeRange, now: DateTime<Utc>) -> PlaytimeTrend {
    match range {
        TimeRange::Today => today_trend(data, now),
        TimeRange::Last7Days => daily_trend(data, now),
        TimeRange::Last30Days => weekly_trend(data, now),
        TimeRange::All => monthly_trend(data, now),
    }
}

fn today_trend(data: &StoreData, now: DateTime<Utc>) -> PlaytimeTrend {
    let total_minutes = sum_window(
        data,
        timeutil::start_of_day(now),
        timeutil::next_day_start(now),
    ) / 60_000;

    // Elapsed three-hour buckets get a cumulative ramp toward the day's
    // total; future buckets stay zero.
    let elapsed = ((now.hour() / 3) as usize + 1).min(TODAY_BUCKET_LABELS.len());
    let minutes = (0..TODAY_BUCKET_LABELS.len())
        .map(|i| {
            if i < elapsed {
                total_minutes * (i as u64 + 1) / elapsed as u64
            } else {
                0
            }
        })
        .collect();

    PlaytimeTrend {
        labels: TODAY_BUCKET_LABELS.iter().map(|s| s.to_string()).collect(),
        minutes,
    }
}

fn daily_trend(data: &StoreData, now: DateTime<Utc>) -> PlaytimeTrend {
    let keys = timeutil::last_n_day_keys(now, 7);
    let labels = keys
        .iter()
        .map(|key| {
            timeutil::parse_day_key(key)
                .map(|day| day.format("%a").to_string())
                .unwrap_or_else(|| key.clone())
        })
        .collect();
    let minutes = keys
        .iter()
        .map(|key| {
            data.daily_totals
                .get(key)
                .map(|day| day.values().sum::<u64>())
                .unwrap_or(0)
                / 60_000
        })
        .collect();

    PlaytimeTrend { labels, minutes }
}

fn weekly_trend(data: &StoreData, now: DateTime<Utc>) -> PlaytimeTrend {
    let start = timeutil::range_start(TimeRange::Last30Days, now);
    let mut labels = Vec::with_capacity(4);
    let mut minutes = Vec::with_capacity(4);

    for week in 0..4 {
        let bucket_start = start + Duration::days(week * 7);
        // The last bucket absorbs the remainder of the 30-day window
        let bucket_end = if week == 3 {
            start + Duration::days(30)
        } else {
            start + Duration::days((week + 1) * 7)
        };
        labels.push(format!("Week {}", week + 1));
        minutes.push(sum_window(data, bucket_start, bucket_end) / 60_000);
    }

    PlaytimeTrend { labels, minutes }
}

fn monthly_trend(data: &StoreData, now: DateTime<Utc>) -> PlaytimeTrend {
    // Current month and the 3 preceding, oldest first
    let mut months = Vec::with_capacity(4);
    let (mut year, mut month) = (now.year(), now.month());
    for _ in 0..4 {
        months.push((year, month));
        (year, month) = if month == 1 { (year - 1, 12) } else { (year, month - 1) };
    }
    months.reverse();

    let mut labels = Vec::with_capacity(4);
    let mut minutes = Vec::with_capacity(4);
    for &(y, m) in &months {
        let start = month_start(y, m);
        let end = if m == 12 {
            month_start(y + 1, 1)
        } else {
            month_start(y, m + 1)
        };
        labels.push(MONTH_ABBREV[(m - 1) as usize].to_string());
        minutes.push(sum_window(data, start, end) / 60_000);
    }

    PlaytimeTrend { labels, minutes }
}

fn month_start(year: i32, month: u32) -> DateTime<Utc> {
    // from_ymd_opt cannot fail for day 1 of a valid month
    NaiveDate::from_ymd_opt(year, month, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
        .and_utc()
}

// ============================================
// Categories
// ============================================

/// Per-map totals as pseudo-categories: top 5 maps by in-range play time,
/// everything else folded into "Other".
pub fn category_data(data: &StoreData, range: TimeRange, now: DateTime<Utc>) -> Vec<CategorySlice> {
    let per_map = aggregate_range(data, range, now);

    let mut entries: Vec<_> = per_map
        .into_iter()
        .filter(|(_, agg)| agg.total_ms > 0)
        .collect();
    entries.sort_by(|a, b| b.1.total_ms.cmp(&a.1.total_ms));

    let mut slices: Vec<CategorySlice> = entries
        .iter()
        .take(CATEGORY_LIMIT)
        .map(|(map_id, agg)| CategorySlice {
            name: display_title(data, map_id),
            minutes: agg.total_ms / 60_000,
        })
        .collect();

    if entries.len() > CATEGORY_LIMIT {
        let other_ms: u64 = entries[CATEGORY_LIMIT..]
            .iter()
            .map(|(_, agg)| agg.total_ms)
            .sum();
        slices.push(CategorySlice {
            name: "Other".to_string(),
            minutes: other_ms / 60_000,
        });
    }

    slices
}

// ============================================
// Period comparison
// ============================================

/// Current window vs the immediately preceding window of equal length.
///
/// `all` has no previous period: it reports zeros labeled "N/A" with a
/// flat direction and no percentage.
pub fn comparison_data(data: &StoreData, range: TimeRange, now: DateTime<Utc>) -> ComparisonData {
    if range == TimeRange::All {
        let (current, _) = period_summary(
            data,
            "All Time",
            DateTime::<Utc>::UNIX_EPOCH,
            timeutil::next_day_start(now),
        );
        return ComparisonData {
            current,
            previous: PeriodSummary {
                label: "N/A".to_string(),
                total_minutes: 0,
                session_count: 0,
                avg_session_minutes: 0,
            },
            direction: TrendDirection::Flat,
            change_pct: None,
        };
    }

    let (current_label, previous_label) = match range {
        TimeRange::Today => ("Today", "Yesterday"),
        TimeRange::Last7Days => ("This Week", "Last Week"),
        TimeRange::Last30Days => ("This Month", "Last Month"),
        TimeRange::All => unreachable!(),
    };
    // range_days is always Some for non-All ranges
    let days = timeutil::range_days(range).unwrap_or(1);

    let current_start = timeutil::range_start(range, now);
    let current_end = timeutil::next_day_start(now);
    let previous_start = current_start - Duration::days(days);

    let (current, current_ms) = period_summary(data, current_label, current_start, current_end);
    let (previous, previous_ms) =
        period_summary(data, previous_label, previous_start, current_start);

    let trend = classify(&[previous_ms, current_ms], DeadzonePolicy::detail());

    ComparisonData {
        current,
        previous,
        direction: trend.direction,
        change_pct: trend.change_pct,
    }
}

fn period_summary(
    data: &StoreData,
    label: &str,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> (PeriodSummary, u64) {
    let total_ms = sum_window(data, start, end);
    let session_count = data
        .sessions
        .iter()
        .filter(|s| s.started_at >= start && s.started_at < end)
        .count() as u64;

    let total_minutes = total_ms / 60_000;
    let avg_session_minutes = if session_count == 0 {
        0
    } else {
        ((total_minutes as f64) / (session_count as f64)).round() as u64
    };

    (
        PeriodSummary {
            label: label.to_string(),
            total_minutes,
            session_count,
            avg_session_minutes,
        },
        total_ms,
    )
}

// ============================================
// Recent sessions / top 5 / overview
// ============================================

/// Completed sessions starting inside the window, newest first.
pub fn recent_sessions(
    data: &StoreData,
    range: TimeRange,
    now: DateTime<Utc>,
    limit: usize,
) -> Vec<RecentSession> {
    let start = timeutil::range_start(range, now);

    let mut sessions: Vec<_> = data
        .sessions
        .iter()
        .filter(|s| s.started_at >= start)
        .collect();
    sessions.sort_by(|a, b| b.started_at.cmp(&a.started_at));

    sessions
        .into_iter()
        .take(limit)
        .map(|s| RecentSession {
            map_id: s.map_id.clone(),
            title: display_title(data, &s.map_id),
            started_at: s.started_at,
            duration_minutes: s.duration_ms() / 60_000,
            time_ago: format_time_ago(s.started_at, now),
        })
        .collect()
}

/// The 5 most-played maps inside the window.
pub fn top5_maps(data: &StoreData, range: TimeRange, now: DateTime<Utc>) -> Vec<TopMapRow> {
    let per_map = aggregate_range(data, range, now);

    let mut entries: Vec<_> = per_map.into_iter().collect();
    entries.sort_by(|a, b| b.1.total_ms.cmp(&a.1.total_ms));

    entries
        .into_iter()
        .take(5)
        .map(|(map_id, agg)| TopMapRow {
            title: display_title(data, &map_id),
            minutes: agg.total_ms / 60_000,
            map_id,
        })
        .collect()
}

/// Grand totals across all history.
pub fn overview_stats(data: &StoreData) -> OverviewStats {
    let total_play_time_ms: u64 = data
        .daily_totals
        .values()
        .flat_map(|day| day.values())
        .sum();
    let maps_played = data
        .daily_totals
        .values()
        .flat_map(|day| day.keys())
        .collect::<std::collections::BTreeSet<_>>()
        .len() as u64;
    let session_count = data.sessions.len() as u64;
    let avg_session_minutes = if session_count == 0 {
        0
    } else {
        total_play_time_ms / 60_000 / session_count
    };

    OverviewStats {
        total_play_time_ms,
        maps_played,
        session_count,
        avg_session_minutes,
    }
}

/// Everything the dashboard needs for one window, in one call.
pub fn dashboard_data(data: &StoreData, range: TimeRange, now: DateTime<Utc>) -> DashboardData {
    DashboardData {
        playtime_trend: playtime_trend(data, range, now),
        categories: category_data(data, range, now),
        comparison: comparison_data(data, range, now),
        recent_sessions: recent_sessions(data, range, now, RECENT_SESSIONS_LIMIT),
        top_maps: top5_maps(data, range, now),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MapSession;
    use chrono::TimeZone;

    fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap()
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

    fn add_session(data: &mut StoreData, map: &str, start: DateTime<Utc>, minutes: i64) {
        data.sessions.push(MapSession {
            map_id: map.to_string(),
            started_at: start,
            ended_at: start + Duration::minutes(minutes),
        });
    }

    #[test]
    fn test_today_trend_cumulative_ramp() {
        let now = at(2025, 6, 10, 13, 0); // bucket index 4 ("12pm")
        let data = store_with(&[("2025-06-10", "dust2", 100 * 60_000)]);

        let trend = playtime_trend(&data, TimeRange::Today, now);
        assert_eq!(trend.labels.len(), 6);
        assert_eq!(trend.minutes.len(), 6);
        // 5 elapsed buckets ramp toward the 100 minute total
        assert_eq!(trend.minutes[4], 100);
        assert_eq!(trend.minutes[5], 0);
        assert!(trend.minutes.windows(2).take(4).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn test_daily_trend_seven_buckets() {
        let now = at(2025, 6, 10, 12, 0);
        let data = store_with(&[
            ("2025-06-10", "dust2", 30 * 60_000),
            ("2025-06-09", "dust2", 60 * 60_000),
            ("2025-06-03", "dust2", 99 * 60_000), // 8 days ago, excluded
        ]);

        let trend = playtime_trend(&data, TimeRange::Last7Days, now);
        assert_eq!(trend.minutes, vec![0, 0, 0, 0, 0, 60, 30]);
        assert_eq!(trend.labels[6], "Tue"); // 2025-06-10 is a Tuesday
    }

    #[test]
    fn test_weekly_trend_four_buckets_cover_window() {
        let now = at(2025, 6, 30, 12, 0);
        // One hour on each day of the 30-day window
        let mut data = StoreData::default();
        for offset in 0..30 {
            let day = now - Duration::days(offset);
            data.daily_totals
                .entry(timeutil::day_key(day))
                .or_default()
                .insert("dust2".to_string(), 60 * 60_000);
        }

        let trend = playtime_trend(&data, TimeRange::Last30Days, now);
        assert_eq!(trend.labels, vec!["Week 1", "Week 2", "Week 3", "Week 4"]);
        // 7+7+7+9 days, nothing dropped
        assert_eq!(trend.minutes, vec![420, 420, 420, 540]);
        assert_eq!(trend.minutes.iter().sum::<u64>(), 30 * 60);
    }

    #[test]
    fn test_monthly_trend_current_and_three_preceding() {
        let now = at(2025, 6, 10, 12, 0);
        let data = store_with(&[
            ("2025-06-05", "dust2", 60 * 60_000),
            ("2025-04-20", "dust2", 120 * 60_000),
            ("2024-12-25", "dust2", 999 * 60_000), // outside the 4 months
        ]);

        let trend = playtime_trend(&data, TimeRange::All, now);
        assert_eq!(trend.labels, vec!["Mar", "Apr", "May", "Jun"]);
        assert_eq!(trend.minutes, vec![0, 120, 0, 60]);
    }

    #[test]
    fn test_monthly_trend_crosses_year_boundary() {
        let now = at(2025, 2, 10, 12, 0);
        let trend = playtime_trend(&StoreData::default(), TimeRange::All, now);
        assert_eq!(trend.labels, vec!["Nov", "Dec", "Jan", "Feb"]);
    }

    #[test]
    fn test_category_data_folds_other() {
        let now = at(2025, 6, 10, 12, 0);
        let data = store_with(&[
            ("2025-06-10", "a", 60 * 60_000),
            ("2025-06-10", "b", 50 * 60_000),
            ("2025-06-10", "c", 40 * 60_000),
            ("2025-06-10", "d", 30 * 60_000),
            ("2025-06-10", "e", 20 * 60_000),
            ("2025-06-10", "f", 10 * 60_000),
            ("2025-06-10", "g", 5 * 60_000),
        ]);

        let slices = category_data(&data, TimeRange::Today, now);
        assert_eq!(slices.len(), 6);
        assert_eq!(slices[0].name, "a");
        assert_eq!(slices[5].name, "Other");
        assert_eq!(slices[5].minutes, 15);
    }

    #[test]
    fn test_category_data_no_other_at_five_or_fewer() {
        let now = at(2025, 6, 10, 12, 0);
        let data = store_with(&[
            ("2025-06-10", "a", 60 * 60_000),
            ("2025-06-10", "b", 50 * 60_000),
        ]);

        let slices = category_data(&data, TimeRange::Today, now);
        assert_eq!(slices.len(), 2);
        assert!(slices.iter().all(|s| s.name != "Other"));
    }

    #[test]
    fn test_comparison_today_with_empty_yesterday() {
        let now = at(2025, 6, 10, 12, 0);
        let mut data = store_with(&[("2025-06-10", "dust2", 30 * 60_000)]);
        add_session(&mut data, "dust2", at(2025, 6, 10, 10, 0), 30);

        let cmp = comparison_data(&data, TimeRange::Today, now);
        assert_eq!(cmp.current.label, "Today");
        assert_eq!(cmp.current.total_minutes, 30);
        assert_eq!(cmp.current.session_count, 1);
        assert_eq!(cmp.current.avg_session_minutes, 30);
        assert_eq!(cmp.previous.label, "Yesterday");
        assert_eq!(cmp.previous.total_minutes, 0);
        // No previous data: direction icon only, no percentage
        assert_eq!(cmp.change_pct, None);
        assert_eq!(cmp.direction, TrendDirection::New);
    }

    #[test]
    fn test_comparison_week_over_week() {
        let now = at(2025, 6, 10, 12, 0);
        let mut data = store_with(&[
            ("2025-06-10", "dust2", 120 * 60_000), // this week
            ("2025-06-01", "dust2", 60 * 60_000),  // previous week window
        ]);
        add_session(&mut data, "dust2", at(2025, 6, 10, 8, 0), 120);
        add_session(&mut data, "dust2", at(2025, 6, 1, 8, 0), 60);

        let cmp = comparison_data(&data, TimeRange::Last7Days, now);
        assert_eq!(cmp.current.total_minutes, 120);
        assert_eq!(cmp.previous.total_minutes, 60);
        assert_eq!(cmp.direction, TrendDirection::Up);
        assert_eq!(cmp.change_pct, Some(100.0));
    }

    #[test]
    fn test_comparison_all_has_no_previous_period() {
        let now = at(2025, 6, 10, 12, 0);
        let data = store_with(&[("2025-06-10", "dust2", 30 * 60_000)]);

        let cmp = comparison_data(&data, TimeRange::All, now);
        assert_eq!(cmp.current.label, "All Time");
        assert_eq!(cmp.current.total_minutes, 30);
        assert_eq!(cmp.previous.label, "N/A");
        assert_eq!(cmp.previous.total_minutes, 0);
        assert_eq!(cmp.change_pct, None);
        assert_eq!(cmp.direction, TrendDirection::Flat);
    }

    #[test]
    fn test_recent_sessions_ordering_and_limit() {
        let now = at(2025, 6, 10, 12, 0);
        let mut data = StoreData::default();
        for i in 0..12 {
            add_session(&mut data, "dust2", now - Duration::hours(i + 1), 30);
        }
        // Outside the window
        add_session(&mut data, "mirage", now - Duration::days(40), 30);

        let rows = recent_sessions(&data, TimeRange::Last30Days, now, 10);
        assert_eq!(rows.len(), 10);
        assert!(rows.windows(2).all(|w| w[0].started_at >= w[1].started_at));
        assert_eq!(rows[0].time_ago, "1 hour ago");
        assert!(rows.iter().all(|r| r.map_id == "dust2"));
    }

    #[test]
    fn test_top5_truncates() {
        let now = at(2025, 6, 10, 12, 0);
        let data = store_with(&[
            ("2025-06-10", "a", 60 * 60_000),
            ("2025-06-10", "b", 50 * 60_000),
            ("2025-06-10", "c", 40 * 60_000),
            ("2025-06-10", "d", 30 * 60_000),
            ("2025-06-10", "e", 20 * 60_000),
            ("2025-06-10", "f", 10 * 60_000),
        ]);

        let rows = top5_maps(&data, TimeRange::Today, now);
        assert_eq!(rows.len(), 5);
        assert_eq!(rows[0].map_id, "a");
        assert_eq!(rows[4].map_id, "e");
    }

    #[test]
    fn test_overview_stats_guard_against_empty() {
        let stats = overview_stats(&StoreData::default());
        assert_eq!(stats.total_play_time_ms, 0);
        assert_eq!(stats.maps_played, 0);
        assert_eq!(stats.avg_session_minutes, 0);
    }

    #[test]
    fn test_overview_stats_totals() {
        let mut data = store_with(&[
            ("2025-06-10", "dust2", 60 * 60_000),
            ("2025-06-09", "mirage", 30 * 60_000),
        ]);
        add_session(&mut data, "dust2", at(2025, 6, 10, 8, 0), 60);
        add_session(&mut data, "mirage", at(2025, 6, 9, 8, 0), 30);

        let stats = overview_stats(&data);
        assert_eq!(stats.total_play_time_ms, 90 * 60_000);
        assert_eq!(stats.maps_played, 2);
        assert_eq!(stats.session_count, 2);
        assert_eq!(stats.avg_session_minutes, 45);
    }
}
