//! User-editable header mappings, one JSON object per report type.
//!
//! A mapping value is a `|`-separated list of header candidates, e.g.
//! `{"current_price": "Current price|Start price"}`. See
//! [`HeaderIndex::resolve_with`](crate::header::HeaderIndex::resolve_with)
//! for how candidates are matched.

use std::collections::BTreeMap;

use rusqlite::{params, Connection, OptionalExtension};

use crate::classify::ReportKind;
use crate::error::{FeedError, Result};

/// Canonical field → candidate header list.
pub type FieldMapping = BTreeMap<String, String>;

/// Stored mapping for a report type; empty when none is stored.
pub fn get_mapping(conn: &Connection, kind: ReportKind) -> Result<FieldMapping> {
    let json: Option<String> = conn
        .query_row(
            "SELECT mapping_json FROM import_mappings WHERE report_type = ?1",
            params![kind.as_str()],
            |row| row.get(0),
        )
        .optional()?;

    match json {
        Some(text) => Ok(serde_json::from_str(&text)?),
        None => Ok(FieldMapping::new()),
    }
}

/// Replace the stored mapping for a report type.
///
/// Blank candidate lists are dropped; a mapping with nothing left is
/// rejected so a stray save cannot wipe the defaults.
pub fn update_mapping(conn: &Connection, kind: ReportKind, mapping: &FieldMapping) -> Result<()> {
    if kind == ReportKind::Unknown {
        return Err(FeedError::Validation("cannot store a mapping for unknown reports".into()));
    }

    let cleaned: FieldMapping = mapping
        .iter()
        .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
        .filter(|(k, v)| !k.is_empty() && !v.is_empty())
        .collect();
    if cleaned.is_empty() {
        return Err(FeedError::Validation("mapping has no non-empty entries".into()));
    }

    let json = serde_json::to_string(&cleaned)?;
    conn.execute(
        "INSERT INTO import_mappings (report_type, mapping_json) VALUES (?1, ?2)
         ON CONFLICT(report_type) DO UPDATE SET mapping_json = excluded.mapping_json",
        params![kind.as_str(), json],
    )?;
    Ok(())
}
