//! maptrack-stats - playtime stats CLI
//!
//! Inspect the maptrack session store from a terminal: ranked maps, the
//! dashboard aggregates, the all-time library, or overall totals.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use maptrack_core::analytics::{
    dashboard_data, library_rows, overview_stats, top_maps, DashboardData, LibraryRow,
    OverviewStats, RankedMap,
};
use maptrack_core::format::{format_duration_ms, format_time_ago};
use maptrack_core::protocol::{DashboardResponse, LibraryResponse, TopMapsResponse};
use maptrack_core::store::SessionStore;
use maptrack_core::{Config, SqliteBackend, TimeRange};

#[derive(Parser, Debug)]
#[command(name = "maptrack-stats")]
#[command(about = "Playtime stats from the maptrack session store")]
#[command(version)]
struct Args {
    /// Reporting window (today, 7d, 30d, all)
    #[arg(long, default_value = "7d")]
    range: TimeRange,

    /// What to show (top, dashboard, library, overview)
    #[arg(long, default_value = "top")]
    view: String,

    /// Emit JSON instead of formatted text
    #[arg(long)]
    json: bool,

    /// Path to the store database (default: the standard data directory)
    #[arg(long)]
    db: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = Config::load().context("failed to load configuration")?;
    let _log_guard = maptrack_core::logging::init(&config.logging).ok();

    let db_path = args.db.unwrap_or_else(Config::database_path);
    let backend = Arc::new(SqliteBackend::open(&db_path).context("failed to open database")?);
    let store = SessionStore::init(backend, config.store.clone()).await;
    store.recover();

    let data = store.snapshot();
    let now = Utc::now();

    match args.view.as_str() {
        "top" => {
            let maps = top_maps(&data, args.range, now, None);
            if args.json {
                print_json(&TopMapsResponse {
                    range: args.range,
                    maps,
                })?;
            } else {
                print_top(args.range, &maps);
            }
        }
        "dashboard" => {
            let dash = dashboard_data(&data, args.range, now);
            if args.json {
                print_json(&DashboardResponse {
                    range: args.range,
                    data: dash,
                })?;
            } else {
                print_dashboard(args.range, &dash);
            }
        }
        "library" => {
            let rows = library_rows(&data);
            if args.json {
                print_json(&LibraryResponse { rows })?;
            } else {
                print_library(&rows);
            }
        }
        "overview" => {
            let stats = overview_stats(&data);
            if args.json {
                print_json(&stats)?;
            } else {
                print_overview(&stats);
            }
        }
        other => anyhow::bail!(
            "Unknown view: {}. Use 'top', 'dashboard', 'library' or 'overview'",
            other
        ),
    }

    Ok(())
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_top(range: TimeRange, maps: &[RankedMap]) {
    println!();
    println!("TOP MAPS ({})", range);
    if maps.is_empty() {
        println!("   No play time recorded for this period.");
        println!();
        return;
    }
    for map in maps {
        println!(
            "   {:>2}. {:<28} {:>10}  {}",
            map.rank,
            map.title.as_deref().unwrap_or(&map.map_id),
            format_duration_ms(map.time_played_ms),
            map.trend_label
        );
    }
    println!();
}

fn print_dashboard(range: TimeRange, dash: &DashboardData) {
    println!();
    println!("DASHBOARD ({})", range);

    let cmp = &dash.comparison;
    let change = match cmp.change_pct {
        Some(pct) if pct >= 0.0 => format!(" (+{:.0}%)", pct),
        Some(pct) => format!(" ({:.0}%)", pct),
        None => String::new(),
    };
    println!(
        "   {}: {}m across {} sessions vs {}: {}m{}",
        cmp.current.label,
        cmp.current.total_minutes,
        cmp.current.session_count,
        cmp.previous.label,
        cmp.previous.total_minutes,
        change
    );
    println!();

    println!("   Trend:");
    for (label, minutes) in dash
        .playtime_trend
        .labels
        .iter()
        .zip(&dash.playtime_trend.minutes)
    {
        println!("      {:<8} {:>6}m", label, minutes);
    }
    println!();

    if !dash.top_maps.is_empty() {
        println!("   Top maps:");
        for row in &dash.top_maps {
            println!("      {:<28} {:>6}m", row.title, row.minutes);
        }
        println!();
    }

    if !dash.recent_sessions.is_empty() {
        println!("   Recent sessions:");
        for session in &dash.recent_sessions {
            println!(
                "      {:<28} {:>6}m  {}",
                session.title, session.duration_minutes, session.time_ago
            );
        }
        println!();
    }
}

fn print_library(rows: &[LibraryRow]) {
    println!();
    println!("LIBRARY");
    if rows.is_empty() {
        println!("   No maps played yet.");
        println!();
        return;
    }
    let now = Utc::now();
    for row in rows {
        let last = row
            .last_played
            .map(|t| format_time_ago(t, now))
            .unwrap_or_else(|| "unknown".to_string());
        println!(
            "   {:<28} {:>10}  {:>4} session{}  last played {}",
            row.title,
            format_duration_ms(row.total_play_time_ms),
            row.play_count,
            if row.play_count == 1 { "" } else { "s" },
            last
        );
    }
    println!();
}

fn print_overview(stats: &OverviewStats) {
    println!();
    println!("OVERVIEW");
    println!(
        "   Total play time: {}",
        format_duration_ms(stats.total_play_time_ms)
    );
    println!("   Maps played:     {}", stats.maps_played);
    println!("   Sessions:        {}", stats.session_count);
    println!("   Avg session:     {}m", stats.avg_session_minutes);
    println!();
}
