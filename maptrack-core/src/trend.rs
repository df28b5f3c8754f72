//! Trend classification
//!
//! Turns a short numeric series (daily play-time totals) into a direction
//! and percentage change, with hysteresis so tiny fluctuations read as
//! flat. Two deadzone conventions are in use: the ranking view compares
//! absolute milliseconds, the per-map detail view compares percentages and
//! labels a series that starts from zero as `NEW`.

use serde::{Deserialize, Serialize};

/// Absolute deadzone used by the ranking view: 2 minutes.
pub const RANKING_DEADZONE_MS: u64 = 2 * 60 * 1000;

/// Percentage deadzone used by the per-map detail view: 2%.
pub const DETAIL_DEADZONE_PCT: f64 = 2.0;

/// Direction of a trend series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    Up,
    Down,
    Flat,
    /// Activity appeared where there was none (percentage policy only)
    New,
}

impl TrendDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrendDirection::Up => "up",
            TrendDirection::Down => "down",
            TrendDirection::Flat => "flat",
            TrendDirection::New => "new",
        }
    }
}

/// Which deadzone convention to apply when classifying.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DeadzonePolicy {
    /// Flat while `|last - first|` is under the given milliseconds
    AbsoluteMs(u64),
    /// Flat while the percentage change is under the given threshold;
    /// reports `New` when the series starts at zero
    Percent(f64),
}

impl DeadzonePolicy {
    /// Policy used by the ranking view.
    pub fn ranking() -> Self {
        DeadzonePolicy::AbsoluteMs(RANKING_DEADZONE_MS)
    }

    /// Policy used by the per-map detail view.
    pub fn detail() -> Self {
        DeadzonePolicy::Percent(DETAIL_DEADZONE_PCT)
    }
}

/// Classified trend: direction plus the percentage change when one is
/// defined (it is not when the series starts at zero).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trend {
    pub direction: TrendDirection,
    pub change_pct: Option<f64>,
}

impl Trend {
    /// Display label: `NEW`, a signed percentage, or an em dash when no
    /// percentage is defined.
    pub fn label(&self) -> String {
        match (self.direction, self.change_pct) {
            (TrendDirection::New, _) => "NEW".to_string(),
            (_, Some(pct)) if pct >= 0.0 => format!("+{:.0}%", pct),
            (_, Some(pct)) => format!("{:.0}%", pct),
            (_, None) => "\u{2014}".to_string(),
        }
    }
}

/// Classify a series by comparing its first and last values.
///
/// An empty or single-element series classifies as flat. Under the
/// absolute policy a series that starts at zero and ends positive is
/// always `Up`: growth from nothing is momentum no matter how small.
pub fn classify(series: &[u64], policy: DeadzonePolicy) -> Trend {
    let first = series.first().copied().unwrap_or(0);
    let last = series.last().copied().unwrap_or(0);
    let delta = last as i64 - first as i64;

    let change_pct = if first > 0 {
        Some((delta as f64 / first as f64) * 100.0)
    } else {
        None
    };

    match policy {
        DeadzonePolicy::AbsoluteMs(deadzone_ms) => {
            let direction = if first == 0 && last > 0 {
                TrendDirection::Up
            } else if delta.unsigned_abs() < deadzone_ms {
                TrendDirection::Flat
            } else if delta > 0 {
                TrendDirection::Up
            } else {
                TrendDirection::Down
            };
            Trend {
                direction,
                change_pct,
            }
        }
        DeadzonePolicy::Percent(deadzone_pct) => {
            if first == 0 {
                let direction = if last > 0 {
                    TrendDirection::New
                } else {
                    TrendDirection::Flat
                };
                return Trend {
                    direction,
                    change_pct: None,
                };
            }
            // first > 0, so change_pct is defined
            let pct = change_pct.unwrap_or(0.0);
            let direction = if pct.abs() < deadzone_pct {
                TrendDirection::Flat
            } else if pct > 0.0 {
                TrendDirection::Up
            } else {
                TrendDirection::Down
            };
            Trend {
                direction,
                change_pct,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absolute_deadzone_flat() {
        // 1ms change is far inside the 2 minute deadzone
        let trend = classify(&[100, 101], DeadzonePolicy::ranking());
        assert_eq!(trend.direction, TrendDirection::Flat);
    }

    #[test]
    fn test_absolute_growth_from_zero_is_up() {
        let trend = classify(&[0, 100_000], DeadzonePolicy::ranking());
        assert_eq!(trend.direction, TrendDirection::Up);
        assert_eq!(trend.change_pct, None);
    }

    #[test]
    fn test_absolute_up_and_down() {
        let up = classify(&[60_000, 600_000], DeadzonePolicy::ranking());
        assert_eq!(up.direction, TrendDirection::Up);
        assert_eq!(up.change_pct, Some(900.0));

        let down = classify(&[600_000, 60_000], DeadzonePolicy::ranking());
        assert_eq!(down.direction, TrendDirection::Down);
    }

    #[test]
    fn test_percent_policy_new() {
        let trend = classify(&[0, 50_000], DeadzonePolicy::detail());
        assert_eq!(trend.direction, TrendDirection::New);
        assert_eq!(trend.change_pct, None);
        assert_eq!(trend.label(), "NEW");
    }

    #[test]
    fn test_percent_policy_deadzone() {
        // +1% sits inside the 2% deadzone
        let flat = classify(&[100_000, 101_000], DeadzonePolicy::detail());
        assert_eq!(flat.direction, TrendDirection::Flat);

        let up = classify(&[100_000, 150_000], DeadzonePolicy::detail());
        assert_eq!(up.direction, TrendDirection::Up);
        assert_eq!(up.label(), "+50%");
    }

    #[test]
    fn test_empty_and_single_series_are_flat() {
        assert_eq!(classify(&[], DeadzonePolicy::ranking()).direction, TrendDirection::Flat);
        assert_eq!(
            classify(&[5_000], DeadzonePolicy::detail()).direction,
            TrendDirection::Flat
        );
    }

    #[test]
    fn test_all_zero_series_is_flat_not_new() {
        let trend = classify(&[0, 0, 0], DeadzonePolicy::detail());
        assert_eq!(trend.direction, TrendDirection::Flat);
    }
}
