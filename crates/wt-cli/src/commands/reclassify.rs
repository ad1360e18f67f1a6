//! Re-run the classifier over stored activities.

use anyhow::{Context, Result};
use wt_core::classify;
use wt_db::Database;

/// Recomputes enriched names and returns how many rows changed.
pub fn run(db: &mut Database) -> Result<usize> {
    let total = db.activity_count()?;
    let updated = db
        .rewrite_enriched_names(classify)
        .context("failed to reclassify activities")?;
    tracing::info!(total, updated, "reclassified activities");
    println!("Reclassified {updated} of {total} activities.");
    Ok(updated)
}
