//! Export command: activities or per-application totals as CSV or JSON.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate, SecondsFormat};
use serde::Serialize;
use wt_core::Activity;
use wt_db::Database;

use super::util::{format_hms, hours, period_bounds};
use crate::{ExportFormat, ExportPeriod};

/// Label of the summary row in aggregated exports.
pub const TOTAL_LABEL: &str = "TOTAL";

/// One row of an aggregated export.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregatedStat {
    pub app_name: String,
    pub total_seconds: i64,
    /// `HH:MM:SS`.
    pub duration: String,
    pub total_hours: f64,
}

impl AggregatedStat {
    fn new(app_name: String, total_seconds: i64) -> Self {
        Self {
            app_name,
            total_seconds,
            duration: format_hms(total_seconds),
            total_hours: hours(total_seconds),
        }
    }
}

#[derive(Debug, Serialize)]
struct AggregatedExport<'a> {
    applications: &'a [AggregatedStat],
    total: &'a AggregatedStat,
}

/// Per-app rows sorted by time spent (longest first), and the total row.
pub fn aggregate(stats: BTreeMap<String, i64>) -> (Vec<AggregatedStat>, AggregatedStat) {
    let total_seconds = stats.values().sum();
    let mut rows: Vec<AggregatedStat> = stats
        .into_iter()
        .map(|(app_name, seconds)| AggregatedStat::new(app_name, seconds))
        .collect();
    rows.sort_by(|a, b| {
        b.total_seconds
            .cmp(&a.total_seconds)
            .then_with(|| a.app_name.cmp(&b.app_name))
    });
    (rows, AggregatedStat::new(TOTAL_LABEL.to_string(), total_seconds))
}

pub fn write_activities_csv<W: Write>(writer: W, activities: &[Activity]) -> Result<()> {
    let mut csv = csv::Writer::from_writer(writer);
    csv.write_record([
        "ID",
        "App Name",
        "Enriched Name",
        "Window Title",
        "Process Path",
        "Start Time",
        "End Time",
        "Duration (seconds)",
        "Is Idle",
    ])?;
    for activity in activities {
        csv.write_record([
            activity.id.to_string(),
            activity.app_name.clone(),
            activity.enriched_name.clone().unwrap_or_default(),
            activity.window_title.clone(),
            activity.process_path.clone(),
            activity.start_time.to_rfc3339_opts(SecondsFormat::Secs, true),
            activity.end_time.to_rfc3339_opts(SecondsFormat::Secs, true),
            activity.duration_seconds.to_string(),
            activity.is_idle.to_string(),
        ])?;
    }
    csv.flush()?;
    Ok(())
}

pub fn write_activities_json<W: Write>(mut writer: W, activities: &[Activity]) -> Result<()> {
    serde_json::to_writer_pretty(&mut writer, activities)?;
    writeln!(writer)?;
    writer.flush()?;
    Ok(())
}

/// Writes aggregated rows; the TOTAL row is only added when there is data.
pub fn write_aggregated_csv<W: Write>(
    writer: W,
    rows: &[AggregatedStat],
    total: &AggregatedStat,
) -> Result<()> {
    let mut csv = csv::Writer::from_writer(writer);
    csv.write_record([
        "Application",
        "Duration (HH:MM:SS)",
        "Total Hours",
        "Total Seconds",
    ])?;
    let total_row = (!rows.is_empty()).then_some(total);
    for row in rows.iter().chain(total_row) {
        csv.write_record([
            row.app_name.clone(),
            row.duration.clone(),
            format!("{:.2}", row.total_hours),
            row.total_seconds.to_string(),
        ])?;
    }
    csv.flush()?;
    Ok(())
}

pub fn write_aggregated_json<W: Write>(
    mut writer: W,
    rows: &[AggregatedStat],
    total: &AggregatedStat,
) -> Result<()> {
    let export = AggregatedExport {
        applications: rows,
        total,
    };
    serde_json::to_writer_pretty(&mut writer, &export)?;
    writeln!(writer)?;
    writer.flush()?;
    Ok(())
}

/// `wt_<period>_<YYYYMMDD>.<ext>` in the current directory.
pub fn default_output_path(period: ExportPeriod, format: ExportFormat, today: NaiveDate) -> PathBuf {
    PathBuf::from(format!(
        "wt_{}_{}.{}",
        period.as_str(),
        today.format("%Y%m%d"),
        format.extension()
    ))
}

/// Runs the export command.
pub fn run(
    db: &Database,
    period: ExportPeriod,
    format: ExportFormat,
    aggregated: bool,
    output: Option<&Path>,
) -> Result<()> {
    let today = Local::now().date_naive();
    let (start, end) = period_bounds(period.period(), today)?;
    let path = output.map_or_else(|| default_output_path(period, format, today), Path::to_path_buf);

    let to_stdout = path.as_os_str() == "-";
    let writer: Box<dyn Write> = if to_stdout {
        Box::new(io::stdout().lock())
    } else {
        let file = File::create(&path)
            .with_context(|| format!("failed to create {}", path.display()))?;
        Box::new(BufWriter::new(file))
    };

    let count = if aggregated {
        let (rows, total) = aggregate(db.stats_by_label(start, end)?);
        match format {
            ExportFormat::Csv => write_aggregated_csv(writer, &rows, &total)?,
            ExportFormat::Json => write_aggregated_json(writer, &rows, &total)?,
        }
        rows.len()
    } else {
        let activities = db.activities_in_range(start, end)?;
        match format {
            ExportFormat::Csv => write_activities_csv(writer, &activities)?,
            ExportFormat::Json => write_activities_json(writer, &activities)?,
        }
        activities.len()
    };

    tracing::info!(count, aggregated, path = %path.display(), "export written");
    if !to_stdout {
        eprintln!("Exported {count} rows to {}", path.display());
    }
    Ok(())
}
