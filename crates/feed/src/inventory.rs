//! Active-listings snapshot → `inventory_items`.

use std::collections::BTreeMap;
use std::path::Path;

use csv::StringRecord;
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::classify::ReportKind;
use crate::edit_log::{record_field_change, ENTITY_INVENTORY_ITEM};
use crate::error::{FeedError, Result};
use crate::error_log::log_error;
use crate::header::HeaderIndex;
use crate::mappings::{get_mapping, FieldMapping};
use crate::model::{
    InventoryFeedFields, InventoryFeedRecord, InventoryImportSummary, InventoryItem,
    InventoryUserField, InventoryUserFields, RowIssue, UpsertOutcome,
};
use crate::parse::{
    clean_str, is_invalid_decimal, is_iso_datetime, now_timestamp, parse_datetime, parse_decimal, parse_int,
};
use crate::reader::{read_feed, FeedFile};

/// Actor recorded when an import fills an empty user-owned field.
pub const FEED_ACTOR: &str = "feed_import";

const ITEM_COLUMNS: &str = "item_number, title, custom_sku, current_price, available_quantity, \
     ebay_category1_name, ebay_category1_number, condition, listing_site, start_date, end_date, \
     status, last_sync_at";

fn item_from_row(row: &Row<'_>) -> rusqlite::Result<InventoryItem> {
    Ok(InventoryItem {
        item_number: row.get(0)?,
        title: row.get(1)?,
        custom_sku: row.get(2)?,
        current_price: row.get(3)?,
        available_quantity: row.get(4)?,
        ebay_category1_name: row.get(5)?,
        ebay_category1_number: row.get(6)?,
        condition: row.get(7)?,
        listing_site: row.get(8)?,
        start_date: row.get(9)?,
        end_date: row.get(10)?,
        status: row.get(11)?,
        last_sync_at: row.get(12)?,
    })
}

// ---------------------------------------------------------------------------
// Row → record
// ---------------------------------------------------------------------------

/// Build a feed record from one CSV row. Missing item number or title
/// skips the row; unparseable price/quantity/dates only add warnings.
pub fn inventory_record_from_row(
    index: &HeaderIndex,
    record: &StringRecord,
    row: usize,
    issues: &mut Vec<RowIssue>,
) -> Option<InventoryFeedRecord> {
    let item_number = index.cell(record, "item_number");
    let title = index.cell(record, "title");
    if item_number.is_empty() || title.is_empty() {
        issues.push(RowIssue::new(row, "missing required fields for inventory item"));
        return None;
    }

    let price_raw = index.cell(record, "current_price");
    if is_invalid_decimal(price_raw) {
        log::warn!("row {row}: non-numeric price '{price_raw}' for {item_number}");
        issues.push(RowIssue::with_value(
            row,
            "current_price",
            price_raw,
            format!("non-numeric price for {item_number}"),
        ));
    }
    let qty_raw = index.cell(record, "available_quantity");
    if is_invalid_decimal(qty_raw) {
        log::warn!("row {row}: non-numeric quantity '{qty_raw}' for {item_number}");
        issues.push(RowIssue::with_value(
            row,
            "available_quantity",
            qty_raw,
            format!("non-numeric quantity for {item_number}"),
        ));
    }

    let mut date = |field: &str| -> Option<String> {
        let parsed = parse_datetime(index.cell(record, field))?;
        if !is_iso_datetime(&parsed) {
            issues.push(RowIssue::with_value(row, field, &parsed, "unrecognized date kept as text"));
        }
        Some(parsed)
    };
    let start_date = date("start_date");
    let end_date = date("end_date");

    let feed = InventoryFeedFields {
        title: title.to_string(),
        current_price: parse_decimal(price_raw),
        available_quantity: parse_int(qty_raw),
        condition: clean_str(index.cell(record, "condition")),
        listing_site: clean_str(index.cell(record, "listing_site")),
        start_date,
        end_date,
    };
    let user = InventoryUserFields {
        custom_sku: clean_str(index.cell(record, "custom_sku")),
        ebay_category1_name: clean_str(index.cell(record, "ebay_category1_name")),
        ebay_category1_number: clean_str(index.cell(record, "ebay_category1_number")),
    };

    InventoryFeedRecord::new(item_number, feed, user).ok()
}

// ---------------------------------------------------------------------------
// Upsert
// ---------------------------------------------------------------------------

/// Insert or update one listing keyed by `item_number`.
///
/// Feed-owned columns are always replaced, `status` becomes `active` and
/// `last_sync_at` becomes `timestamp`. A user-owned column that already
/// holds a value keeps it; an empty one takes the feed value, and that
/// fill is written to the edit log.
pub fn upsert_inventory_item_from_feed(
    conn: &Connection,
    record: &InventoryFeedRecord,
    timestamp: &str,
) -> Result<UpsertOutcome> {
    if record.item_number.trim().is_empty() {
        return Err(FeedError::Validation("item_number is required".into()));
    }

    let stored: Option<InventoryUserFields> = conn
        .query_row(
            "SELECT custom_sku, ebay_category1_name, ebay_category1_number
             FROM inventory_items WHERE item_number = ?1",
            params![record.item_number],
            |row| {
                Ok(InventoryUserFields {
                    custom_sku: row.get(0)?,
                    ebay_category1_name: row.get(1)?,
                    ebay_category1_number: row.get(2)?,
                })
            },
        )
        .optional()?;

    let feed = &record.feed;
    match stored {
        Some(stored) => {
            let user = InventoryUserFields::preserving(&stored, &record.user);
            conn.execute(
                "UPDATE inventory_items SET
                    title = ?2, custom_sku = ?3, current_price = ?4, available_quantity = ?5,
                    ebay_category1_name = ?6, ebay_category1_number = ?7, condition = ?8,
                    listing_site = ?9, start_date = ?10, end_date = ?11,
                    status = 'active', last_sync_at = ?12
                 WHERE item_number = ?1",
                params![
                    record.item_number,
                    feed.title,
                    user.custom_sku,
                    feed.current_price,
                    feed.available_quantity,
                    user.ebay_category1_name,
                    user.ebay_category1_number,
                    feed.condition,
                    feed.listing_site,
                    feed.start_date,
                    feed.end_date,
                    timestamp,
                ],
            )?;

            let fills = [
                ("custom_sku", &stored.custom_sku, &user.custom_sku),
                ("ebay_category1_name", &stored.ebay_category1_name, &user.ebay_category1_name),
                ("ebay_category1_number", &stored.ebay_category1_number, &user.ebay_category1_number),
            ];
            for (field, old, new) in fills {
                record_field_change(
                    conn,
                    ENTITY_INVENTORY_ITEM,
                    &record.item_number,
                    field,
                    old.as_deref(),
                    new.as_deref(),
                    Some(FEED_ACTOR),
                )?;
            }

            log::debug!("updated inventory item {}", record.item_number);
            Ok(UpsertOutcome::Updated)
        }
        None => {
            conn.execute(
                "INSERT INTO inventory_items (
                    item_number, title, custom_sku, current_price, available_quantity,
                    ebay_category1_name, ebay_category1_number, condition, listing_site,
                    start_date, end_date, status, last_sync_at
                 ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, 'active', ?12)",
                params![
                    record.item_number,
                    feed.title,
                    record.user.custom_sku,
                    feed.current_price,
                    feed.available_quantity,
                    record.user.ebay_category1_name,
                    record.user.ebay_category1_number,
                    feed.condition,
                    feed.listing_site,
                    feed.start_date,
                    feed.end_date,
                    timestamp,
                ],
            )?;
            log::debug!("inserted inventory item {}", record.item_number);
            Ok(UpsertOutcome::Inserted)
        }
    }
}

// ---------------------------------------------------------------------------
// Import entry points
// ---------------------------------------------------------------------------

/// Import an active-listings CSV. One transaction for the whole file.
pub fn import_inventory_from_csv(conn: &mut Connection, path: &Path) -> Result<InventoryImportSummary> {
    let file = read_feed(path)?;
    let mapping = get_mapping(conn, ReportKind::ActiveListings)?;
    import_inventory_feed(conn, &file, &mapping)
}

/// Import an already-read listings file.
pub fn import_inventory_feed(
    conn: &mut Connection,
    file: &FeedFile,
    mapping: &FieldMapping,
) -> Result<InventoryImportSummary> {
    let index = HeaderIndex::resolve_with(&file.headers, ReportKind::ActiveListings, mapping);
    let timestamp = now_timestamp();
    let mut summary = InventoryImportSummary::default();

    let tx = conn.transaction()?;
    for (i, row) in file.rows.iter().enumerate() {
        let row_no = i + 1;
        summary.rows_read += 1;

        let record = match row {
            Ok(record) => record,
            Err(msg) => {
                summary.skipped += 1;
                summary.warnings.push(RowIssue::new(row_no, format!("unreadable row: {msg}")));
                continue;
            }
        };

        let Some(feed_record) = inventory_record_from_row(&index, record, row_no, &mut summary.warnings)
        else {
            summary.skipped += 1;
            continue;
        };

        match upsert_inventory_item_from_feed(&tx, &feed_record, &timestamp) {
            Ok(UpsertOutcome::Inserted) => summary.inserted += 1,
            Ok(UpsertOutcome::Updated) => summary.updated += 1,
            Err(e) => {
                let message = format!("failed to upsert inventory item {} ({e})", feed_record.item_number);
                log_error(&tx, "import_inventory", &message);
                summary.warnings.push(RowIssue::new(row_no, message));
                summary.skipped += 1;
            }
        }
    }
    tx.commit()?;

    log::info!(
        "inventory import {}: {} rows, {} inserted, {} updated, {} skipped",
        file.path.display(),
        summary.rows_read,
        summary.inserted,
        summary.updated,
        summary.skipped
    );
    Ok(summary)
}

// ---------------------------------------------------------------------------
// Queries + user edits
// ---------------------------------------------------------------------------

/// All listings ordered by item number.
pub fn get_inventory_items_v2(conn: &Connection) -> Result<Vec<InventoryItem>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {ITEM_COLUMNS} FROM inventory_items ORDER BY item_number"
    ))?;
    let items = stmt
        .query_map([], item_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(items)
}

pub fn get_inventory_item_v2(conn: &Connection, item_number: &str) -> Result<Option<InventoryItem>> {
    let item = conn
        .query_row(
            &format!("SELECT {ITEM_COLUMNS} FROM inventory_items WHERE item_number = ?1"),
            params![item_number],
            item_from_row,
        )
        .optional()?;
    Ok(item)
}

/// Apply user edits to a listing's user-owned fields.
///
/// Each field whose value actually changes is updated and written to the
/// edit log. Returns `false` when the item does not exist or nothing
/// changed. Failures are written to the error log before being returned.
/// Opens its own transaction, so it must not be called inside one.
pub fn update_inventory_item_user_fields(
    conn: &Connection,
    item_number: &str,
    updates: &BTreeMap<InventoryUserField, Option<String>>,
    edited_by: Option<&str>,
) -> Result<bool> {
    let result = apply_inventory_user_fields(conn, item_number, updates, edited_by);
    if let Err(ref e) = result {
        log_error(conn, "update_inventory_item_user_fields", &format!("{item_number}: {e}"));
    }
    result
}

fn apply_inventory_user_fields(
    conn: &Connection,
    item_number: &str,
    updates: &BTreeMap<InventoryUserField, Option<String>>,
    edited_by: Option<&str>,
) -> Result<bool> {
    let tx = conn.unchecked_transaction()?;
    let Some(item) = get_inventory_item_v2(&tx, item_number)? else {
        return Ok(false);
    };

    let mut changed = false;
    for (field, value) in updates {
        let new = value.as_deref().and_then(clean_str);
        let old = field.get(&item);
        if record_field_change(
            &tx,
            ENTITY_INVENTORY_ITEM,
            item_number,
            field.column(),
            old,
            new.as_deref(),
            edited_by,
        )? {
            tx.execute(
                &format!("UPDATE inventory_items SET {} = ?1 WHERE item_number = ?2", field.column()),
                params![new, item_number],
            )?;
            changed = true;
        }
    }
    tx.commit()?;
    Ok(changed)
}
