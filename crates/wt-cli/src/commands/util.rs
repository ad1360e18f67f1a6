//! Shared utilities for CLI commands.

use anyhow::{Context, Result, bail};
use chrono::{
    DateTime, Datelike, Duration, Local, LocalResult, Months, NaiveDate, NaiveTime, TimeZone, Utc,
};

/// A reporting period in local calendar terms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Period {
    Today,
    /// Monday through Sunday of the current week.
    Week,
    Month,
    /// `from` through `to`, both inclusive.
    Custom { from: NaiveDate, to: NaiveDate },
}

impl Period {
    /// Human label for report headers.
    pub fn describe(self, today: NaiveDate) -> String {
        match self {
            Self::Today => today.format("%A, %b %-d, %Y").to_string(),
            Self::Week => format!("Week of {}", monday_of(today).format("%b %-d, %Y")),
            Self::Month => today.format("%B %Y").to_string(),
            Self::Custom { from, to } => format!("{from} to {to}"),
        }
    }
}

/// Converts a local date at midnight to UTC.
/// Handles DST ambiguity by picking the earlier time.
pub fn local_midnight_to_utc(local_date: NaiveDate) -> DateTime<Utc> {
    let midnight = local_date.and_time(NaiveTime::MIN);
    match Local.from_local_datetime(&midnight) {
        LocalResult::Single(dt) | LocalResult::Ambiguous(dt, _) => dt.with_timezone(&Utc),
        // Midnight skipped by a DST jump: the day starts an hour later.
        LocalResult::None => Local
            .from_local_datetime(&(midnight + Duration::hours(1)))
            .earliest()
            .map_or_else(|| midnight.and_utc(), |dt| dt.with_timezone(&Utc)),
    }
}

fn monday_of(date: NaiveDate) -> NaiveDate {
    date - Duration::days(i64::from(date.weekday().num_days_from_monday()))
}

/// Half-open UTC bounds `[start, end)` of a period, relative to `today`.
pub fn period_bounds(period: Period, today: NaiveDate) -> Result<(DateTime<Utc>, DateTime<Utc>)> {
    let (first_day, end_day) = match period {
        Period::Today => (today, today + Duration::days(1)),
        Period::Week => {
            let monday = monday_of(today);
            (monday, monday + Duration::days(7))
        }
        Period::Month => {
            let first = today.with_day(1).context("invalid month start")?;
            let next = first
                .checked_add_months(Months::new(1))
                .context("month out of range")?;
            (first, next)
        }
        Period::Custom { from, to } => {
            if to < from {
                bail!("invalid range: --to {to} is before --from {from}");
            }
            (from, to + Duration::days(1))
        }
    };

    let start = local_midnight_to_utc(first_day);
    let end = local_midnight_to_utc(end_day);
    if end <= start {
        bail!("invalid range: end must be after start");
    }
    Ok((start, end))
}

/// Formats seconds as `Xh Ym`, `Xm`, or `Xs` under a minute.
pub fn format_duration(seconds: i64) -> String {
    if seconds <= 0 {
        return "0m".to_string();
    }
    if seconds < 60 {
        return format!("{seconds}s");
    }
    let total_minutes = seconds / 60;
    let hours = total_minutes / 60;
    let minutes = total_minutes % 60;

    if hours >= 1 {
        format!("{hours}h {minutes}m")
    } else {
        format!("{minutes}m")
    }
}

/// Formats seconds as `HH:MM:SS`.
pub fn format_hms(seconds: i64) -> String {
    let seconds = seconds.max(0);
    format!(
        "{:02}:{:02}:{:02}",
        seconds / 3600,
        (seconds % 3600) / 60,
        seconds % 60
    )
}

#[allow(clippy::cast_precision_loss)]
pub fn hours(seconds: i64) -> f64 {
    seconds as f64 / 3600.0
}

/// Generates a 10-character progress bar.
/// Values <5% of max get a single block for visibility.
#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
pub fn progress_bar(value: i64, max: i64) -> String {
    if max <= 0 {
        return "░░░░░░░░░░".to_string();
    }

    let ratio = value as f64 / max as f64;
    let filled = if ratio < 0.05 && value > 0 {
        1
    } else {
        (ratio * 10.0).round().clamp(0.0, 10.0) as usize
    };

    let empty = 10 - filled;
    format!("{}{}", "█".repeat(filled), "░".repeat(empty))
}
