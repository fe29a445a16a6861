//! Append-only audit trail of user edits.

use rusqlite::{params, Connection};

use crate::error::Result;
use crate::model::EditLogEntry;

pub const ENTITY_INVENTORY_ITEM: &str = "inventory_item";
pub const ENTITY_SALES_ORDER_ITEM: &str = "sales_order_item";

/// Blank and NULL compare equal; everything else compares trimmed.
fn normalized(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// True when `old` → `new` is an actual change.
pub fn is_change(old: Option<&str>, new: Option<&str>) -> bool {
    normalized(old) != normalized(new)
}

/// Append one entry for a changed field. Returns `false` (and writes
/// nothing) when old and new are equal under [`is_change`].
pub fn record_field_change(
    conn: &Connection,
    entity_type: &str,
    entity_pk: &str,
    field: &str,
    old: Option<&str>,
    new: Option<&str>,
    edited_by: Option<&str>,
) -> Result<bool> {
    if !is_change(old, new) {
        return Ok(false);
    }

    let edited_at = crate::parse::now_timestamp();
    conn.execute(
        "INSERT INTO edit_log (entity_type, entity_pk, field, old_value, new_value, edited_at, edited_by)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![entity_type, entity_pk, field, old, new, edited_at, edited_by],
    )?;
    log::debug!("edit_log {entity_type}:{entity_pk} {field} {old:?} -> {new:?}");
    Ok(true)
}

/// Entries for one entity, oldest first.
pub fn get_edit_log(conn: &Connection, entity_type: &str, entity_pk: &str) -> Result<Vec<EditLogEntry>> {
    let mut stmt = conn.prepare(
        "SELECT id, entity_type, entity_pk, field, old_value, new_value, edited_at, edited_by
         FROM edit_log WHERE entity_type = ?1 AND entity_pk = ?2 ORDER BY id",
    )?;
    let rows = stmt
        .query_map(params![entity_type, entity_pk], |row| {
            Ok(EditLogEntry {
                id: row.get(0)?,
                entity_type: row.get(1)?,
                entity_pk: row.get(2)?,
                field: row.get(3)?,
                old_value: row.get(4)?,
                new_value: row.get(5)?,
                edited_at: row.get(6)?,
                edited_by: row.get(7)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}
