//! `wt settings`: read and write persisted key/value settings.

use std::io::Write;

use anyhow::Result;
use wt_db::Database;

pub fn list<W: Write>(writer: &mut W, db: &Database) -> Result<()> {
    let settings = db.list_settings()?;
    if settings.is_empty() {
        writeln!(writer, "No settings stored.")?;
        return Ok(());
    }
    for setting in settings {
        writeln!(writer, "{} = {}", setting.key, setting.value)?;
    }
    Ok(())
}

pub fn get<W: Write>(writer: &mut W, db: &Database, key: &str) -> Result<()> {
    match db.setting(key)? {
        Some(value) => writeln!(writer, "{value}")?,
        None => anyhow::bail!("setting not found: {key}"),
    }
    Ok(())
}

pub fn set(db: &mut Database, key: &str, value: &str) -> Result<()> {
    db.set_setting(key, value)?;
    tracing::debug!(key, value, "setting updated");
    Ok(())
}
