//! CLI subcommand implementations.

pub mod agent;
pub mod export;
pub mod reclassify;
pub mod report;
pub mod settings;
pub mod status;
pub mod util;
