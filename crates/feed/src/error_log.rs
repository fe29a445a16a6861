//! Persistent log of failed writes, for support and manual re-runs.

use rusqlite::{params, Connection};

use crate::error::Result;
use crate::model::ErrorLogEntry;

/// Append an error row. Never fails the caller: a logging failure is only
/// reported through `log`.
pub fn log_error(conn: &Connection, context: &str, message: &str) {
    log::error!("{context}: {message}");
    let created_at = crate::parse::now_timestamp();
    if let Err(e) = conn.execute(
        "INSERT INTO error_logs (created_at, context, message) VALUES (?1, ?2, ?3)",
        params![created_at, context, message],
    ) {
        log::warn!("could not persist error log entry: {e}");
    }
}

/// Most recent entries first.
pub fn get_error_logs(conn: &Connection, limit: usize) -> Result<Vec<ErrorLogEntry>> {
    let mut stmt = conn.prepare(
        "SELECT id, created_at, context, message FROM error_logs ORDER BY id DESC LIMIT ?1",
    )?;
    let rows = stmt
        .query_map(params![limit as i64], |row| {
            Ok(ErrorLogEntry {
                id: row.get(0)?,
                created_at: row.get(1)?,
                context: row.get(2)?,
                message: row.get(3)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

/// Delete all entries; returns how many were removed.
pub fn clear_error_logs(conn: &Connection) -> Result<usize> {
    Ok(conn.execute("DELETE FROM error_logs", [])?)
}
