//! Window-time tracker CLI library.
//!
//! This crate provides the `wt` command-line interface: the tracker loop and
//! the reporting commands over its database.

mod cli;
pub mod commands;
mod config;

pub use cli::{Cli, Commands, ExportFormat, ExportPeriod, RangeArgs, SettingsAction};
pub use config::Config;
