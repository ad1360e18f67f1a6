//! Report command for generating time reports.
//!
//! This module implements `wt report` over a period (--today, --week,
//! --month, or --from/--to) with human-readable or JSON output.

use std::collections::BTreeMap;
use std::fmt::Write;

use anyhow::Result;
use chrono::{DateTime, Duration, Local, NaiveDate, Utc};
use serde::Serialize;
use wt_db::Database;

use super::util::{Period, format_duration, period_bounds, progress_bar};

const NAME_WIDTH: usize = 28;

/// Total time for one application, split by enriched label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppTotal {
    pub app_name: String,
    pub total_seconds: i64,
    pub labels: Vec<LabelTotal>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LabelTotal {
    pub label: String,
    pub total_seconds: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DayTotal {
    pub date: NaiveDate,
    pub total_seconds: i64,
}

/// Computed report data.
#[derive(Debug)]
pub struct ReportData {
    pub generated_at: DateTime<Utc>,
    pub period_start: DateTime<Utc>,
    pub period_end: DateTime<Utc>,
    pub description: String,
    pub timezone: String,
    pub apps: Vec<AppTotal>,
    pub hourly: [i64; 24],
    pub daily: Vec<DayTotal>,
    pub idle_seconds: i64,
}

impl ReportData {
    pub fn active_seconds(&self) -> i64 {
        self.apps.iter().map(|app| app.total_seconds).sum()
    }
}

/// Orders applications and their labels by time spent, longest first.
pub fn app_totals(grouped: BTreeMap<String, BTreeMap<String, i64>>) -> Vec<AppTotal> {
    let mut apps: Vec<AppTotal> = grouped
        .into_iter()
        .map(|(app_name, labels)| {
            let mut labels: Vec<LabelTotal> = labels
                .into_iter()
                .map(|(label, total_seconds)| LabelTotal {
                    label,
                    total_seconds,
                })
                .collect();
            labels.sort_by(|a, b| {
                b.total_seconds
                    .cmp(&a.total_seconds)
                    .then_with(|| a.label.cmp(&b.label))
            });
            AppTotal {
                total_seconds: labels.iter().map(|l| l.total_seconds).sum(),
                app_name,
                labels,
            }
        })
        .collect();
    apps.sort_by(|a, b| {
        b.total_seconds
            .cmp(&a.total_seconds)
            .then_with(|| a.app_name.cmp(&b.app_name))
    });
    apps
}

/// Generates report data from the database.
pub fn generate_report_data(
    db: &Database,
    period: Period,
    today: NaiveDate,
    generated_at: DateTime<Utc>,
) -> Result<ReportData> {
    let (period_start, period_end) = period_bounds(period, today)?;
    tracing::debug!(%period_start, %period_end, "generating report");

    let apps = app_totals(db.grouped_stats(period_start, period_end)?);
    let hourly = db.hourly_stats(period_start, period_end)?;
    let first_day = period_start.with_timezone(&Local).date_naive();
    let daily = (0_i64..)
        .zip(db.daily_stats(period_start, period_end)?)
        .map(|(offset, total_seconds)| DayTotal {
            date: first_day + Duration::days(offset),
            total_seconds,
        })
        .collect();
    let idle_seconds = db.idle_seconds(period_start, period_end)?;

    Ok(ReportData {
        generated_at,
        period_start,
        period_end,
        description: period.describe(today),
        timezone: iana_time_zone::get_timezone().unwrap_or_else(|_| "UTC".to_string()),
        apps,
        hourly,
        daily,
        idle_seconds,
    })
}

fn clip(name: &str, width: usize) -> String {
    if name.chars().count() <= width {
        return name.to_string();
    }
    let mut clipped: String = name.chars().take(width - 1).collect();
    clipped.push('…');
    clipped
}

/// Formats the human-readable report output.
pub fn format_report(data: &ReportData) -> Result<String> {
    let mut output = String::new();

    writeln!(output, "TIME REPORT: {}", data.description)?;

    if data.apps.is_empty() {
        writeln!(output)?;
        writeln!(output, "No activity recorded for this period.")?;
        writeln!(output)?;
        writeln!(output, "Hint: Run 'wt run' to start tracking.")?;
        return Ok(output);
    }

    let max_app = data.apps.iter().map(|a| a.total_seconds).max().unwrap_or(0);
    writeln!(output)?;
    writeln!(output, "BY APPLICATION")?;
    writeln!(output, "──────────────")?;
    for app in &data.apps {
        writeln!(
            output,
            "{:<NAME_WIDTH$} {:>7}  {}",
            clip(&app.app_name, NAME_WIDTH),
            format_duration(app.total_seconds),
            progress_bar(app.total_seconds, max_app)
        )?;
        let only_app_name = matches!(app.labels.as_slice(), [only] if only.label == app.app_name);
        if only_app_name {
            continue;
        }
        for label in &app.labels {
            writeln!(
                output,
                "  {:<width$} {:>7}",
                clip(&label.label, NAME_WIDTH - 2),
                format_duration(label.total_seconds),
                width = NAME_WIDTH - 2
            )?;
        }
    }

    let max_hour = data.hourly.iter().copied().max().unwrap_or(0);
    writeln!(output)?;
    writeln!(output, "BY HOUR")?;
    writeln!(output, "───────")?;
    for (hour, seconds) in data.hourly.iter().enumerate() {
        if *seconds > 0 {
            writeln!(
                output,
                "{hour:02}:00  {:>7}  {}",
                format_duration(*seconds),
                progress_bar(*seconds, max_hour)
            )?;
        }
    }

    if data.daily.len() > 1 {
        let max_day = data.daily.iter().map(|d| d.total_seconds).max().unwrap_or(0);
        writeln!(output)?;
        writeln!(output, "BY DAY")?;
        writeln!(output, "──────")?;
        for day in &data.daily {
            writeln!(
                output,
                "{}  {:>7}  {}",
                day.date.format("%a %b %d"),
                format_duration(day.total_seconds),
                progress_bar(day.total_seconds, max_day)
            )?;
        }
    }

    writeln!(output)?;
    writeln!(output, "SUMMARY")?;
    writeln!(output, "───────")?;
    writeln!(output, "Active time:  {}", format_duration(data.active_seconds()))?;
    writeln!(output, "Idle time:    {}", format_duration(data.idle_seconds))?;

    Ok(output)
}

// ========== JSON Output ==========

/// JSON report structure.
#[derive(Debug, Serialize)]
pub struct JsonReport<'a> {
    pub generated_at: String,
    pub timezone: &'a str,
    pub period: JsonPeriod<'a>,
    pub applications: &'a [AppTotal],
    pub hourly: [i64; 24],
    pub daily: &'a [DayTotal],
    pub totals: JsonTotals,
}

#[derive(Debug, Serialize)]
pub struct JsonPeriod<'a> {
    pub start: String,
    /// Last day of the period, inclusive.
    pub end: String,
    pub description: &'a str,
}

#[derive(Debug, Serialize)]
pub struct JsonTotals {
    pub active_seconds: i64,
    pub idle_seconds: i64,
}

/// Formats report data as JSON.
pub fn format_report_json(data: &ReportData) -> Result<String> {
    let local_start = data.period_start.with_timezone(&Local);
    let local_end = data.period_end.with_timezone(&Local);
    let end_date = local_end.date_naive() - Duration::days(1);

    let report = JsonReport {
        generated_at: data.generated_at.to_rfc3339(),
        timezone: &data.timezone,
        period: JsonPeriod {
            start: local_start.date_naive().format("%Y-%m-%d").to_string(),
            end: end_date.format("%Y-%m-%d").to_string(),
            description: &data.description,
        },
        applications: &data.apps,
        hourly: data.hourly,
        daily: &data.daily,
        totals: JsonTotals {
            active_seconds: data.active_seconds(),
            idle_seconds: data.idle_seconds,
        },
    };

    Ok(serde_json::to_string_pretty(&report)?)
}

// ========== Public Interface ==========

/// Runs the report command.
pub fn run(db: &Database, period: Period, json: bool) -> Result<()> {
    let generated_at = Utc::now();
    let today = Local::now().date_naive();
    let data = generate_report_data(db, period, today, generated_at)?;

    if json {
        println!("{}", format_report_json(&data)?);
    } else {
        print!("{}", format_report(&data)?);
    }

    Ok(())
}
