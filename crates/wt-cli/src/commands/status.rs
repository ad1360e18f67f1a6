//! Status command: database location, latest and current activity, and today's totals.

use std::io::Write;
use std::path::Path;

use anyhow::Result;
use chrono::{Local, NaiveDate};
use wt_core::classify;
use wt_db::Database;

use super::agent::{CURRENT_ACTIVITY_KEY, LAST_STARTED_KEY, LAST_STOPPED_KEY, LiveActivity};
use super::util::{Period, format_duration, period_bounds};

fn display_name(app_name: &str, label: &str) -> String {
    if label == app_name {
        app_name.to_string()
    } else {
        format!("{app_name} ({label})")
    }
}

pub fn run<W: Write>(
    writer: &mut W,
    db: &Database,
    database_path: &Path,
    today: NaiveDate,
) -> Result<()> {
    writeln!(writer, "Window-time tracker status")?;
    writeln!(writer, "Database: {}", database_path.display())?;
    writeln!(writer, "Activities: {}", db.activity_count()?)?;

    match db.latest_activity()? {
        Some(activity) => {
            let name = display_name(&activity.app_name, activity.label());
            writeln!(
                writer,
                "Latest: {name}, {} to {} ({})",
                activity.start_time.with_timezone(&Local).format("%Y-%m-%d %H:%M"),
                activity.end_time.with_timezone(&Local).format("%H:%M"),
                format_duration(activity.duration_seconds)
            )?;
        }
        None => writeln!(writer, "Latest: no activity recorded")?,
    }

    // Published by a running `wt run`; unreadable values are treated as absent.
    let live = db
        .setting(CURRENT_ACTIVITY_KEY)?
        .and_then(|value| serde_json::from_str::<LiveActivity>(&value).ok());
    match live {
        Some(live) => {
            let label = classify(&live.app_name, &live.window_title);
            writeln!(
                writer,
                "Current: {}, since {}",
                display_name(&live.app_name, &label),
                live.since.with_timezone(&Local).format("%H:%M")
            )?;
        }
        None => writeln!(writer, "Current: not tracking")?,
    }

    for (label, key) in [("started", LAST_STARTED_KEY), ("stopped", LAST_STOPPED_KEY)] {
        let value = db.setting(key)?.unwrap_or_else(|| "never".to_string());
        writeln!(writer, "Tracker last {label}: {value}")?;
    }

    let (start, end) = period_bounds(Period::Today, today)?;
    let active: i64 = db.stats_by_label(start, end)?.values().sum();
    let idle = db.idle_seconds(start, end)?;
    writeln!(
        writer,
        "Today: {} active, {} idle",
        format_duration(active),
        format_duration(idle)
    )?;

    Ok(())
}
