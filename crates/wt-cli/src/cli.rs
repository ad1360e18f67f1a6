//! Command-line argument definitions.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::commands::util::Period;

/// Window-time tracker.
///
/// Samples the foreground window and idle state at a fixed interval, records
/// contiguous activity segments, and reports where the time went.
#[derive(Debug, Parser)]
#[command(name = "wt", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run the tracker in the foreground until interrupted.
    Run {
        /// Seconds between samples (overrides config).
        #[arg(long, value_name = "SECS", value_parser = clap::value_parser!(u64).range(1..))]
        interval: Option<u64>,

        /// Seconds without input before the user counts as idle (overrides config).
        #[arg(long, value_name = "SECS", value_parser = clap::value_parser!(u64).range(1..))]
        idle_threshold: Option<u64>,
    },

    /// Show database and tracking status.
    Status,

    /// Show a time report for a period.
    Report {
        #[command(flatten)]
        range: RangeArgs,

        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Export activities to CSV or JSON.
    Export {
        /// Period to export.
        #[arg(long, value_enum, default_value_t = ExportPeriod::Today)]
        period: ExportPeriod,

        /// Output format.
        #[arg(long, value_enum, default_value_t = ExportFormat::Csv)]
        format: ExportFormat,

        /// Export per-application totals instead of individual activities.
        #[arg(long)]
        aggregated: bool,

        /// Output file; `-` writes to stdout. Defaults to `wt_<period>_<date>.<format>`.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Recompute enriched names of stored activities.
    Reclassify,

    /// Read and write persisted settings.
    #[command(subcommand)]
    Settings(SettingsAction),
}

/// Report period selection. Defaults to today.
#[derive(Debug, Clone, Default, Args)]
pub struct RangeArgs {
    /// Report on today.
    #[arg(long, conflicts_with_all = ["week", "month", "from"])]
    pub today: bool,

    /// Report on the current week (Monday to Sunday).
    #[arg(long, conflicts_with_all = ["month", "from"])]
    pub week: bool,

    /// Report on the current month.
    #[arg(long, conflicts_with = "from")]
    pub month: bool,

    /// First day of a custom range.
    #[arg(long, value_name = "YYYY-MM-DD", requires = "to")]
    pub from: Option<NaiveDate>,

    /// Last day (inclusive) of a custom range.
    #[arg(long, value_name = "YYYY-MM-DD", requires = "from")]
    pub to: Option<NaiveDate>,
}

impl RangeArgs {
    pub fn period(&self) -> Period {
        match (self.from, self.to) {
            (Some(from), Some(to)) => Period::Custom { from, to },
            _ if self.week => Period::Week,
            _ if self.month => Period::Month,
            _ => Period::Today,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ExportPeriod {
    Today,
    Week,
    Month,
}

impl ExportPeriod {
    pub const fn period(self) -> Period {
        match self {
            Self::Today => Period::Today,
            Self::Week => Period::Week,
            Self::Month => Period::Month,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Today => "today",
            Self::Week => "week",
            Self::Month => "month",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ExportFormat {
    Csv,
    Json,
}

impl ExportFormat {
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Json => "json",
        }
    }
}

/// Settings operations.
#[derive(Debug, Subcommand)]
pub enum SettingsAction {
    /// List all settings.
    List,
    /// Print one setting.
    Get { key: String },
    /// Set a setting.
    Set { key: String, value: String },
}
