//! Reporting windows offered by the dashboard date picker.
//!
//! Windows run from UTC midnight of the first day up to "now" and are
//! applied upstream in the grouped count fetch.

use crate::store::TimeWindow;
use chrono::{DateTime, Datelike, Duration, NaiveTime, TimeZone, Utc};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateRangePreset {
    Last7,
    ThisWeek,
    ThisMonth,
    Last30,
}

impl DateRangePreset {
    /// Parse a picker key. Unknown keys fall back to `Last7`.
    pub fn parse(key: &str) -> Self {
        match key {
            "thisWeek" => DateRangePreset::ThisWeek,
            "thisMonth" => DateRangePreset::ThisMonth,
            "last30" => DateRangePreset::Last30,
            _ => DateRangePreset::Last7,
        }
    }

    pub fn key(&self) -> &'static str {
        match self {
            DateRangePreset::Last7 => "last7",
            DateRangePreset::ThisWeek => "thisWeek",
            DateRangePreset::ThisMonth => "thisMonth",
            DateRangePreset::Last30 => "last30",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            DateRangePreset::Last7 => "Last 7 days",
            DateRangePreset::ThisWeek => "This week",
            DateRangePreset::ThisMonth => "This month",
            DateRangePreset::Last30 => "Last 30 days",
        }
    }

    /// Resolve the preset against `now`.
    pub fn window(&self, now: DateTime<Utc>) -> TimeWindow {
        let first_day = match self {
            DateRangePreset::Last7 => now - Duration::days(7),
            DateRangePreset::Last30 => now - Duration::days(30),
            DateRangePreset::ThisWeek => {
                now - Duration::days(i64::from(now.weekday().num_days_from_sunday()))
            }
            DateRangePreset::ThisMonth => {
                now - Duration::days(i64::from(now.day0()))
            }
        };
        TimeWindow {
            from: start_of_day(first_day),
            to: now,
        }
    }
}

fn start_of_day(at: DateTime<Utc>) -> DateTime<Utc> {
    Utc.from_utc_datetime(&at.date_naive().and_time(NaiveTime::MIN))
}

/// Label for a picker key, with the same fallback as `DateRangePreset::parse`.
pub fn date_range_label(key: &str) -> &'static str {
    DateRangePreset::parse(key).label()
}

/// Window for a picker key relative to `now`; unknown keys mean `last7`.
pub fn compute_date_range(key: &str, now: DateTime<Utc>) -> TimeWindow {
    DateRangePreset::parse(key).window(now)
}
