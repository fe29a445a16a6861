//! Completed-orders report → `sales_orders`, `sales_order_items`, `shipments`.
//!
//! Two phases: every row is first merged in memory by
//! [`OrderBatch`](crate::accumulate::OrderBatch), then orders, lines and
//! shipments are written in one transaction. Writing after the merge keeps
//! order-level sums (shipping, tax, discounts) correct when an order's rows
//! are spread through the file.

use std::collections::BTreeMap;
use std::path::Path;

use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::accumulate::{OrderBatch, OrderRow};
use crate::classify::ReportKind;
use crate::edit_log::{record_field_change, ENTITY_SALES_ORDER_ITEM};
use crate::error::{FeedError, Result};
use crate::error_log::log_error;
use crate::header::HeaderIndex;
use crate::inventory::FEED_ACTOR;
use crate::mappings::{get_mapping, FieldMapping};
use crate::model::{
    OrderImportSummary, OrderItemUserField, OrderLine, OrderLineUserFields, RowIssue, SalesOrder,
    SalesOrderItem, UpsertOutcome,
};
use crate::parse::clean_str;
use crate::reader::{read_feed, FeedFile};
use crate::shipments::upsert_shipment_from_feed;

const ORDER_COLUMNS: &str = "order_number, sales_record_number, buyer_username, buyer_name, \
     buyer_email, ship_to_name, ship_to_phone, ship_to_address_1, ship_to_address_2, ship_to_city, \
     ship_to_state, ship_to_zip, ship_to_country, order_total, ordered_at, paid_at, \
     shipped_on_date, status, meta_json";

const ITEM_COLUMNS: &str = "id, order_number, transaction_id, item_number, item_title_snapshot, \
     custom_sku, quantity, unit_price, tax_amount, shipping_amount, discount_amount";

fn order_from_row(row: &Row<'_>) -> rusqlite::Result<SalesOrder> {
    Ok(SalesOrder {
        order_number: row.get(0)?,
        sales_record_number: row.get(1)?,
        buyer_username: row.get(2)?,
        buyer_name: row.get(3)?,
        buyer_email: row.get(4)?,
        ship_to_name: row.get(5)?,
        ship_to_phone: row.get(6)?,
        ship_to_address_1: row.get(7)?,
        ship_to_address_2: row.get(8)?,
        ship_to_city: row.get(9)?,
        ship_to_state: row.get(10)?,
        ship_to_zip: row.get(11)?,
        ship_to_country: row.get(12)?,
        order_total: row.get(13)?,
        ordered_at: row.get(14)?,
        paid_at: row.get(15)?,
        shipped_on_date: row.get(16)?,
        status: row.get(17)?,
        meta_json: row.get(18)?,
    })
}

fn item_from_row(row: &Row<'_>) -> rusqlite::Result<SalesOrderItem> {
    Ok(SalesOrderItem {
        id: row.get(0)?,
        order_number: row.get(1)?,
        transaction_id: row.get(2)?,
        item_number: row.get(3)?,
        item_title_snapshot: row.get(4)?,
        custom_sku: row.get(5)?,
        quantity: row.get(6)?,
        unit_price: row.get(7)?,
        tax_amount: row.get(8)?,
        shipping_amount: row.get(9)?,
        discount_amount: row.get(10)?,
    })
}

// ---------------------------------------------------------------------------
// Upserts
// ---------------------------------------------------------------------------

/// Insert or fully replace an order header. Every order column is
/// feed-owned, including `meta_json`.
pub fn upsert_sales_order_from_feed(conn: &Connection, order: &SalesOrder) -> Result<UpsertOutcome> {
    if order.order_number.trim().is_empty() {
        return Err(FeedError::Validation("order_number is required".into()));
    }

    let exists = conn
        .query_row(
            "SELECT 1 FROM sales_orders WHERE order_number = ?1",
            params![order.order_number],
            |_| Ok(()),
        )
        .optional()?
        .is_some();

    conn.execute(
        &format!(
            "INSERT INTO sales_orders ({ORDER_COLUMNS})
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19)
             ON CONFLICT(order_number) DO UPDATE SET
                sales_record_number = excluded.sales_record_number,
                buyer_username = excluded.buyer_username,
                buyer_name = excluded.buyer_name,
                buyer_email = excluded.buyer_email,
                ship_to_name = excluded.ship_to_name,
                ship_to_phone = excluded.ship_to_phone,
                ship_to_address_1 = excluded.ship_to_address_1,
                ship_to_address_2 = excluded.ship_to_address_2,
                ship_to_city = excluded.ship_to_city,
                ship_to_state = excluded.ship_to_state,
                ship_to_zip = excluded.ship_to_zip,
                ship_to_country = excluded.ship_to_country,
                order_total = excluded.order_total,
                ordered_at = excluded.ordered_at,
                paid_at = excluded.paid_at,
                shipped_on_date = excluded.shipped_on_date,
                status = excluded.status,
                meta_json = excluded.meta_json"
        ),
        params![
            order.order_number,
            order.sales_record_number,
            order.buyer_username,
            order.buyer_name,
            order.buyer_email,
            order.ship_to_name,
            order.ship_to_phone,
            order.ship_to_address_1,
            order.ship_to_address_2,
            order.ship_to_city,
            order.ship_to_state,
            order.ship_to_zip,
            order.ship_to_country,
            order.order_total,
            order.ordered_at,
            order.paid_at,
            order.shipped_on_date,
            order.status,
            order.meta_json,
        ],
    )?;

    log::debug!("upserted order {}", order.order_number);
    Ok(if exists { UpsertOutcome::Updated } else { UpsertOutcome::Inserted })
}

/// Insert or update one order line keyed by `(order_number, transaction_id)`.
///
/// Feed-owned columns are replaced. A stored `custom_sku` is kept; an
/// empty one is filled from the feed and the fill is written to the edit
/// log. Returns the outcome and the line's row id.
pub fn upsert_sales_order_item_from_feed(conn: &Connection, line: &OrderLine) -> Result<(UpsertOutcome, i64)> {
    if line.order_number.trim().is_empty() || line.transaction_id.trim().is_empty() {
        return Err(FeedError::Validation("order line needs order_number and transaction_id".into()));
    }

    let stored: Option<(i64, Option<String>)> = conn
        .query_row(
            "SELECT id, custom_sku FROM sales_order_items
             WHERE order_number = ?1 AND transaction_id IS ?2",
            params![line.order_number, line.transaction_id],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()?;

    let feed = &line.feed;
    match stored {
        Some((id, stored_sku)) => {
            let stored_user = OrderLineUserFields { custom_sku: stored_sku };
            let user = OrderLineUserFields::preserving(&stored_user, &line.user);
            conn.execute(
                "UPDATE sales_order_items SET
                    item_number = ?2, item_title_snapshot = ?3, custom_sku = ?4, quantity = ?5,
                    unit_price = ?6, tax_amount = ?7, shipping_amount = ?8, discount_amount = ?9
                 WHERE id = ?1",
                params![
                    id,
                    feed.item_number,
                    feed.item_title_snapshot,
                    user.custom_sku,
                    feed.quantity,
                    feed.unit_price,
                    feed.tax_amount,
                    feed.shipping_amount,
                    feed.discount_amount,
                ],
            )?;
            record_field_change(
                conn,
                ENTITY_SALES_ORDER_ITEM,
                &id.to_string(),
                OrderItemUserField::CustomSku.column(),
                stored_user.custom_sku.as_deref(),
                user.custom_sku.as_deref(),
                Some(FEED_ACTOR),
            )?;
            Ok((UpsertOutcome::Updated, id))
        }
        None => {
            conn.execute(
                "INSERT INTO sales_order_items (
                    order_number, transaction_id, item_number, item_title_snapshot, custom_sku,
                    quantity, unit_price, tax_amount, shipping_amount, discount_amount
                 ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    line.order_number,
                    line.transaction_id,
                    feed.item_number,
                    feed.item_title_snapshot,
                    line.user.custom_sku,
                    feed.quantity,
                    feed.unit_price,
                    feed.tax_amount,
                    feed.shipping_amount,
                    feed.discount_amount,
                ],
            )?;
            Ok((UpsertOutcome::Inserted, conn.last_insert_rowid()))
        }
    }
}

// ---------------------------------------------------------------------------
// Import entry points
// ---------------------------------------------------------------------------

/// Import a completed-orders CSV. One transaction for the whole file.
pub fn import_orders_from_csv(conn: &mut Connection, path: &Path) -> Result<OrderImportSummary> {
    let file = read_feed(path)?;
    let mapping = get_mapping(conn, ReportKind::Orders)?;
    import_orders_feed(conn, &file, &mapping)
}

/// Import an already-read orders file.
pub fn import_orders_feed(conn: &mut Connection, file: &FeedFile, mapping: &FieldMapping) -> Result<OrderImportSummary> {
    let index = HeaderIndex::resolve_with(&file.headers, ReportKind::Orders, mapping);
    let mut summary = OrderImportSummary::default();

    // Phase 1: merge every row in memory.
    let mut batch = OrderBatch::new();
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
        match OrderRow::parse(&index, record, row_no, &mut summary.warnings) {
            Some(parsed) => batch.add(&parsed, row_no),
            None => summary.skipped += 1,
        }
    }

    // Phase 2: write.
    let tx = conn.transaction()?;
    for acc in batch.orders() {
        let row_no = acc.first_row();
        let written = acc
            .to_sales_order()
            .map_err(FeedError::from)
            .and_then(|order| upsert_sales_order_from_feed(&tx, &order));
        if let Err(e) = written {
            let message = format!("failed to upsert order {} ({e})", acc.order_number());
            log_error(&tx, "import_orders", &message);
            summary.warnings.push(RowIssue::new(row_no, message));
            continue;
        }
        summary.orders_upserted += 1;

        for line in acc.lines() {
            match upsert_sales_order_item_from_feed(&tx, line) {
                Ok(_) => summary.order_items_upserted += 1,
                Err(e) => {
                    let message = format!(
                        "failed to upsert line {} of order {} ({e})",
                        line.transaction_id, line.order_number
                    );
                    log_error(&tx, "import_orders", &message);
                    summary.warnings.push(RowIssue::new(row_no, message));
                }
            }
        }
    }
    for (row_no, shipment) in batch.shipments() {
        match upsert_shipment_from_feed(&tx, shipment) {
            Ok(_) => summary.shipments_upserted += 1,
            Err(e) => {
                let message = format!("failed to upsert shipment {} ({e})", shipment.tracking_number);
                log_error(&tx, "import_orders", &message);
                summary.warnings.push(RowIssue::new(*row_no, message));
            }
        }
    }
    tx.commit()?;

    log::info!(
        "orders import {}: {} rows, {} orders, {} lines, {} shipments, {} skipped",
        file.path.display(),
        summary.rows_read,
        summary.orders_upserted,
        summary.order_items_upserted,
        summary.shipments_upserted,
        summary.skipped
    );
    Ok(summary)
}

// ---------------------------------------------------------------------------
// Queries + user edits
// ---------------------------------------------------------------------------

/// All orders, newest first by order date, then by order number.
pub fn get_sales_orders_v2(conn: &Connection) -> Result<Vec<SalesOrder>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {ORDER_COLUMNS} FROM sales_orders ORDER BY ordered_at DESC, order_number"
    ))?;
    let orders = stmt
        .query_map([], order_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(orders)
}

pub fn get_sales_order_v2(conn: &Connection, order_number: &str) -> Result<Option<SalesOrder>> {
    let order = conn
        .query_row(
            &format!("SELECT {ORDER_COLUMNS} FROM sales_orders WHERE order_number = ?1"),
            params![order_number],
            order_from_row,
        )
        .optional()?;
    Ok(order)
}

/// Order lines in insertion order, optionally for a single order.
pub fn get_sales_order_items_v2(conn: &Connection, order_number: Option<&str>) -> Result<Vec<SalesOrderItem>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {ITEM_COLUMNS} FROM sales_order_items
         WHERE ?1 IS NULL OR order_number = ?1
         ORDER BY order_number, id"
    ))?;
    let items = stmt
        .query_map(params![order_number], item_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(items)
}

pub fn get_sales_order_item_v2(conn: &Connection, id: i64) -> Result<Option<SalesOrderItem>> {
    let item = conn
        .query_row(
            &format!("SELECT {ITEM_COLUMNS} FROM sales_order_items WHERE id = ?1"),
            params![id],
            item_from_row,
        )
        .optional()?;
    Ok(item)
}

/// Apply user edits to an order line. Same contract as
/// [`update_inventory_item_user_fields`](crate::inventory::update_inventory_item_user_fields);
/// edit-log entries use the line's row id as the entity key.
pub fn update_sales_order_item_user_fields(
    conn: &Connection,
    order_item_id: i64,
    updates: &BTreeMap<OrderItemUserField, Option<String>>,
    edited_by: Option<&str>,
) -> Result<bool> {
    let result = apply_order_item_user_fields(conn, order_item_id, updates, edited_by);
    if let Err(ref e) = result {
        log_error(conn, "update_sales_order_item_user_fields", &format!("{order_item_id}: {e}"));
    }
    result
}

fn apply_order_item_user_fields(
    conn: &Connection,
    order_item_id: i64,
    updates: &BTreeMap<OrderItemUserField, Option<String>>,
    edited_by: Option<&str>,
) -> Result<bool> {
    let tx = conn.unchecked_transaction()?;
    let Some(item) = get_sales_order_item_v2(&tx, order_item_id)? else {
        return Ok(false);
    };

    let pk = order_item_id.to_string();
    let mut changed = false;
    for (field, value) in updates {
        let new = value.as_deref().and_then(clean_str);
        if record_field_change(
            &tx,
            ENTITY_SALES_ORDER_ITEM,
            &pk,
            field.column(),
            field.get(&item),
            new.as_deref(),
            edited_by,
        )? {
            tx.execute(
                &format!("UPDATE sales_order_items SET {} = ?1 WHERE id = ?2", field.column()),
                params![new, order_item_id],
            )?;
            changed = true;
        }
    }
    tx.commit()?;
    Ok(changed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edit_log::get_edit_log;
    use crate::model::OrderLineFeedFields;
    use crate::reader::parse_feed;
    use crate::schema::open_in_memory;
    use crate::shipments::get_shipments;

    const ORDERS_CSV: &str = "\n\
Order Number,Transaction ID,Item Number,Item Title,Custom label (SKU),Quantity,Sold For,Shipping and handling,Buyer Name,Paid On Date,Tracking Number,Shipping Service\n\
1001,TXN-1,111,Widget,SKU-A,1,$29.99,5.00,Jane Doe,01/06/2025,1Z999,USPS\n\
1001,,112,Gadget,,2,10.00,5.00,,,1Z999,USPS\n\
1002,TXN-9,113,Doohickey,,1,4.00,,Bob,2025-01-07 10:30:00,,\n\
,TXN-X,114,Orphan,,1,1.00,,,,,\n";

    fn import(conn: &mut Connection) -> OrderImportSummary {
        let file = parse_feed(Path::new("orders.csv"), ORDERS_CSV).unwrap();
        import_orders_feed(conn, &file, &FieldMapping::new()).unwrap()
    }

    fn line(order: &str, txn: &str, sku: Option<&str>) -> OrderLine {
        OrderLine {
            order_number: order.into(),
            transaction_id: txn.into(),
            feed: OrderLineFeedFields {
                item_title_snapshot: "Widget".into(),
                quantity: 1,
                ..Default::default()
            },
            user: OrderLineUserFields { custom_sku: sku.map(String::from) },
        }
    }

    #[test]
    fn import_counts_and_skips() {
        let mut conn = open_in_memory().unwrap();
        let summary = import(&mut conn);
        assert_eq!(summary.rows_read, 4);
        assert_eq!(summary.orders_upserted, 2);
        assert_eq!(summary.order_items_upserted, 3);
        assert_eq!(summary.shipments_upserted, 1);
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.warnings[0].row, 4);
    }

    #[test]
    fn blank_transaction_becomes_line_002() {
        let mut conn = open_in_memory().unwrap();
        import(&mut conn);
        let items = get_sales_order_items_v2(&conn, Some("1001")).unwrap();
        let ids: Vec<_> = items.iter().map(|i| i.transaction_id.as_deref().unwrap()).collect();
        assert_eq!(ids, vec!["TXN-1", "line-002"]);
        assert_eq!(items[1].quantity, Some(2));
    }

    #[test]
    fn reimport_is_idempotent() {
        let mut conn = open_in_memory().unwrap();
        import(&mut conn);
        let first_order = get_sales_order_v2(&conn, "1001").unwrap().unwrap();
        let first_items = get_sales_order_items_v2(&conn, None).unwrap();

        import(&mut conn);
        let second_order = get_sales_order_v2(&conn, "1001").unwrap().unwrap();
        assert_eq!(first_order, second_order);
        assert_eq!(first_items, get_sales_order_items_v2(&conn, None).unwrap());
        assert_eq!(get_shipments(&conn, None).unwrap().len(), 1);
        assert_eq!(
            second_order.meta_json.as_deref(),
            Some(r#"{"shipping_amount":10.0}"#)
        );
    }

    #[test]
    fn order_fields_merge_across_rows() {
        let mut conn = open_in_memory().unwrap();
        import(&mut conn);
        let order = get_sales_order_v2(&conn, "1001").unwrap().unwrap();
        assert_eq!(order.buyer_name.as_deref(), Some("Jane Doe"));
        assert_eq!(order.paid_at.as_deref(), Some("2025-01-06T00:00:00"));

        let other = get_sales_order_v2(&conn, "1002").unwrap().unwrap();
        assert_eq!(other.paid_at.as_deref(), Some("2025-01-07T10:30:00"));
        assert_eq!(other.meta_json, None);
    }

    #[test]
    fn user_sku_on_line_survives_reimport() {
        let mut conn = open_in_memory().unwrap();
        import(&mut conn);
        let item = get_sales_order_items_v2(&conn, Some("1001")).unwrap().remove(0);

        let edits = BTreeMap::from([(OrderItemUserField::CustomSku, Some("MY-SKU".to_string()))]);
        assert!(update_sales_order_item_user_fields(&conn, item.id, &edits, Some("sam")).unwrap());
        assert!(!update_sales_order_item_user_fields(&conn, item.id, &edits, Some("sam")).unwrap());

        import(&mut conn);
        let after = get_sales_order_item_v2(&conn, item.id).unwrap().unwrap();
        assert_eq!(after.custom_sku.as_deref(), Some("MY-SKU"));

        let log = get_edit_log(&conn, ENTITY_SALES_ORDER_ITEM, &item.id.to_string()).unwrap();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].old_value.as_deref(), Some("SKU-A"));
        assert_eq!(log[0].new_value.as_deref(), Some("MY-SKU"));
    }

    #[test]
    fn empty_line_sku_is_filled_by_feed() {
        let conn = open_in_memory().unwrap();
        let (first, id) = upsert_sales_order_item_from_feed(&conn, &line("1", "T", None)).unwrap();
        let (second, same_id) = upsert_sales_order_item_from_feed(&conn, &line("1", "T", Some("S"))).unwrap();
        assert_eq!(first, UpsertOutcome::Inserted);
        assert_eq!(second, UpsertOutcome::Updated);
        assert_eq!(id, same_id);

        let item = get_sales_order_item_v2(&conn, id).unwrap().unwrap();
        assert_eq!(item.custom_sku.as_deref(), Some("S"));
        let log = get_edit_log(&conn, ENTITY_SALES_ORDER_ITEM, &id.to_string()).unwrap();
        assert_eq!(log[0].edited_by.as_deref(), Some(FEED_ACTOR));
    }

    #[test]
    fn edit_missing_line_returns_false() {
        let conn = open_in_memory().unwrap();
        let edits = BTreeMap::from([(OrderItemUserField::CustomSku, Some("X".to_string()))]);
        assert!(!update_sales_order_item_user_fields(&conn, 42, &edits, None).unwrap());
    }

    #[test]
    fn blank_order_number_rejected() {
        let conn = open_in_memory().unwrap();
        let err = upsert_sales_order_from_feed(&conn, &SalesOrder::default()).unwrap_err();
        assert!(matches!(err, FeedError::Validation(_)));
    }
}
