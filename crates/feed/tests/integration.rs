use std::collections::BTreeMap;
use std::path::PathBuf;

use rusqlite::Connection;

use resale_feed::compat::{get_listings_compat, get_order_lines_compat};
use resale_feed::edit_log::{get_edit_log, ENTITY_INVENTORY_ITEM};
use resale_feed::error_log::get_error_logs;
use resale_feed::inventory::{get_inventory_item_v2, get_inventory_items_v2};
use resale_feed::mappings::{get_mapping, update_mapping};
use resale_feed::orders::{get_sales_order_items_v2, get_sales_order_v2};
use resale_feed::shipments::get_shipments;
use resale_feed::{
    classify_headers, detect_report, import_csv, import_inventory_from_csv, import_orders_from_csv,
    update_inventory_item_user_fields, FeedError, ImportSummary, InventoryUserField, ReportKind,
};

fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn fresh_db() -> (tempfile::TempDir, Connection) {
    let dir = tempfile::tempdir().unwrap();
    let conn = resale_feed::open(&dir.path().join("reseller.db")).unwrap();
    (dir, conn)
}

fn table_count(conn: &Connection, table: &str) -> i64 {
    conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |r| r.get(0))
        .unwrap()
}

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

#[test]
fn fixtures_classify() {
    let (_dir, conn) = fresh_db();
    let kinds: Vec<ReportKind> = ["active_listings.csv", "orders.csv", "unknown.csv"]
        .iter()
        .map(|f| detect_report(&conn, &fixtures_dir().join(f)).unwrap())
        .collect();
    assert_eq!(kinds, vec![ReportKind::ActiveListings, ReportKind::Orders, ReportKind::Unknown]);
}

#[test]
fn orders_headers_are_never_listings() {
    // An orders export also has an item number and a custom label.
    let headers: Vec<String> = ["Order Number", "Item Number", "Item Title", "Custom Label", "Sold For"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    assert_eq!(classify_headers(&headers), ReportKind::Orders);
}

#[test]
fn unknown_report_is_refused() {
    let (_dir, mut conn) = fresh_db();
    let err = import_csv(&mut conn, &fixtures_dir().join("unknown.csv"), None).unwrap_err();
    match err {
        FeedError::UnknownReport { headers } => assert_eq!(headers, vec!["Date", "Description", "Amount"]),
        other => panic!("unexpected error {other:?}"),
    }
    assert_eq!(table_count(&conn, "inventory_items"), 0);
    assert_eq!(table_count(&conn, "sales_orders"), 0);
    assert_eq!(table_count(&conn, "shipments"), 0);
}

// ---------------------------------------------------------------------------
// Active listings
// ---------------------------------------------------------------------------

#[test]
fn listings_import_summary() {
    let (_dir, mut conn) = fresh_db();
    let summary = import_inventory_from_csv(&mut conn, &fixtures_dir().join("active_listings.csv")).unwrap();

    assert_eq!(summary.rows_read, 5);
    assert_eq!(summary.inserted, 3);
    assert_eq!(summary.updated, 0);
    assert_eq!(summary.skipped, 2);

    let skipped_rows: Vec<usize> = summary
        .warnings
        .iter()
        .filter(|w| w.message.contains("missing required fields"))
        .map(|w| w.row)
        .collect();
    assert_eq!(skipped_rows, vec![4, 5]);
    assert!(summary
        .warnings
        .iter()
        .any(|w| w.row == 3 && w.field.as_deref() == Some("available_quantity")));
}

#[test]
fn listings_values_are_coerced() {
    let (_dir, mut conn) = fresh_db();
    import_inventory_from_csv(&mut conn, &fixtures_dir().join("active_listings.csv")).unwrap();

    let alpha = get_inventory_item_v2(&conn, "110001").unwrap().unwrap();
    assert_eq!(alpha.current_price, Some(19.99));
    assert_eq!(alpha.available_quantity, Some(5));
    assert_eq!(alpha.start_date.as_deref(), Some("2025-01-02T10:15:00"));
    assert_eq!(alpha.ebay_category1_name.as_deref(), Some("Toys"));
    assert_eq!(alpha.status.as_deref(), Some("active"));
    let synced = alpha.last_sync_at.as_deref().unwrap();
    assert!(resale_feed::parse::is_iso_datetime(synced), "{synced}");

    // Blank current price falls back to the start price column.
    let beta = get_inventory_item_v2(&conn, "110002").unwrap().unwrap();
    assert_eq!(beta.title, "Gadget Beta, large");
    assert_eq!(beta.current_price, Some(9.5));
    assert_eq!(beta.start_date.as_deref(), Some("2025-01-03T00:00:00"));
    assert_eq!(beta.custom_sku, None);

    // Unparseable values: number dropped, date kept verbatim.
    let gamma = get_inventory_item_v2(&conn, "110003").unwrap().unwrap();
    assert_eq!(gamma.current_price, None);
    assert_eq!(gamma.available_quantity, None);
    assert_eq!(gamma.start_date.as_deref(), Some("sometime soon"));
}

#[test]
fn listings_reimport_is_idempotent() {
    let (_dir, mut conn) = fresh_db();
    let path = fixtures_dir().join("active_listings.csv");
    import_inventory_from_csv(&mut conn, &path).unwrap();
    let before = get_inventory_items_v2(&conn).unwrap();

    let summary = import_inventory_from_csv(&mut conn, &path).unwrap();
    assert_eq!(summary.inserted, 0);
    assert_eq!(summary.updated, 3);

    let after = get_inventory_items_v2(&conn).unwrap();
    assert_eq!(before.len(), after.len());
    for (b, a) in before.iter().zip(&after) {
        let mut a = a.clone();
        a.last_sync_at = b.last_sync_at.clone();
        assert_eq!(b, &a);
    }
    assert!(get_edit_log(&conn, ENTITY_INVENTORY_ITEM, "110001").unwrap().is_empty());
}

#[test]
fn user_sku_wins_over_feed() {
    let (_dir, mut conn) = fresh_db();
    let path = fixtures_dir().join("active_listings.csv");
    import_inventory_from_csv(&mut conn, &path).unwrap();

    let edits = BTreeMap::from([(InventoryUserField::CustomSku, Some("MY-SKU".to_string()))]);
    assert!(update_inventory_item_user_fields(&conn, "110001", &edits, Some("sam")).unwrap());
    // Same value again: no change, no log entry.
    assert!(!update_inventory_item_user_fields(&conn, "110001", &edits, Some("sam")).unwrap());

    import_inventory_from_csv(&mut conn, &path).unwrap();
    let item = get_inventory_item_v2(&conn, "110001").unwrap().unwrap();
    assert_eq!(item.custom_sku.as_deref(), Some("MY-SKU"));

    let history = get_edit_log(&conn, ENTITY_INVENTORY_ITEM, "110001").unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].field, "custom_sku");
    assert_eq!(history[0].old_value.as_deref(), Some("SKU-A"));
    assert_eq!(history[0].new_value.as_deref(), Some("MY-SKU"));
    assert_eq!(history[0].edited_by.as_deref(), Some("sam"));
}

// ---------------------------------------------------------------------------
// Completed orders
// ---------------------------------------------------------------------------

const ORDER_1001_META: &str =
    r#"{"ebay_collected_tax":0.8,"seller_collected_tax":1.2,"shipping_amount":10.0,"tax_amount":2.0}"#;

#[test]
fn orders_import_merges_rows() {
    let (_dir, mut conn) = fresh_db();
    let summary = import_orders_from_csv(&mut conn, &fixtures_dir().join("orders.csv")).unwrap();
    assert_eq!(summary.rows_read, 4);
    assert_eq!(summary.orders_upserted, 2);
    assert_eq!(summary.order_items_upserted, 3);
    assert_eq!(summary.shipments_upserted, 1);
    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.warnings.len(), 1);
    assert_eq!(summary.warnings[0].row, 4);

    let order = get_sales_order_v2(&conn, "1001").unwrap().unwrap();
    assert_eq!(order.sales_record_number.as_deref(), Some("5001"));
    assert_eq!(order.buyer_username.as_deref(), Some("jdoe"));
    assert_eq!(order.ship_to_city.as_deref(), Some("Springfield"));
    assert_eq!(order.order_total, Some(40.0));
    assert_eq!(order.ordered_at.as_deref(), Some("2025-01-05T00:00:00"));
    assert_eq!(order.paid_at.as_deref(), Some("2025-01-06T00:00:00"));
    assert_eq!(order.shipped_on_date.as_deref(), Some("2025-01-07T00:00:00"));
    assert_eq!(order.meta_json.as_deref(), Some(ORDER_1001_META));

    let lines = get_sales_order_items_v2(&conn, Some("1001")).unwrap();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0].transaction_id.as_deref(), Some("TXN-1"));
    assert_eq!(lines[0].custom_sku.as_deref(), Some("SKU-A"));
    assert_eq!(lines[0].unit_price, Some(19.99));
    assert_eq!(lines[0].tax_amount, Some(1.2));
    assert_eq!(lines[1].transaction_id.as_deref(), Some("line-002"));
    assert_eq!(lines[1].quantity, Some(2));
    assert_eq!(lines[1].tax_amount, Some(0.8));

    let other = get_sales_order_v2(&conn, "1002").unwrap().unwrap();
    assert_eq!(other.ordered_at.as_deref(), Some("2025-01-08T09:30:00"));
    assert_eq!(other.meta_json.as_deref(), Some(r#"{"shipping_amount":0.0}"#));
    let other_lines = get_sales_order_items_v2(&conn, Some("1002")).unwrap();
    assert_eq!(other_lines[0].quantity, Some(1));
}

#[test]
fn orders_reimport_is_idempotent() {
    let (_dir, mut conn) = fresh_db();
    let path = fixtures_dir().join("orders.csv");
    import_orders_from_csv(&mut conn, &path).unwrap();
    let items = get_sales_order_items_v2(&conn, None).unwrap();

    import_orders_from_csv(&mut conn, &path).unwrap();
    import_orders_from_csv(&mut conn, &path).unwrap();

    assert_eq!(table_count(&conn, "sales_orders"), 2);
    assert_eq!(get_sales_order_items_v2(&conn, None).unwrap(), items);
    assert_eq!(
        get_sales_order_v2(&conn, "1001").unwrap().unwrap().meta_json.as_deref(),
        Some(ORDER_1001_META)
    );

    let shipments = get_shipments(&conn, None).unwrap();
    assert_eq!(shipments.len(), 1);
    assert_eq!(shipments[0].tracking_number, "1Z999");
    assert_eq!(shipments[0].order_number, "1001");
    assert_eq!(shipments[0].shipping_service.as_deref(), Some("USPS Ground Advantage"));
    assert_eq!(shipments[0].shipped_on_date.as_deref(), Some("2025-01-07T00:00:00"));
}

// ---------------------------------------------------------------------------
// Dispatch, views, mappings
// ---------------------------------------------------------------------------

#[test]
fn auto_dispatch_then_compat_views() {
    let (_dir, mut conn) = fresh_db();
    let listings = import_csv(&mut conn, &fixtures_dir().join("active_listings.csv"), None).unwrap();
    let orders = import_csv(&mut conn, &fixtures_dir().join("orders.csv"), None).unwrap();
    assert!(matches!(listings, ImportSummary::ActiveListings(_)));
    assert!(matches!(orders, ImportSummary::Orders(_)));
    assert_eq!(orders.rows_read(), 4);

    let flat = get_listings_compat(&conn).unwrap();
    assert_eq!(flat.len(), 3);
    assert_eq!(flat[0].sku.as_deref(), Some("SKU-A"));
    assert_eq!(flat[0].category_number.as_deref(), Some("1000"));

    let lines = get_order_lines_compat(&conn).unwrap();
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[0].buyer_name.as_deref(), Some("Jane Doe"));
    assert_eq!(lines[1].item_title.as_deref(), Some("Gadget Beta"));
    assert_eq!(lines[1].order_total, Some(40.0));
}

#[test]
fn mapping_override_enables_custom_headers() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("shop-export.csv");
    std::fs::write(&path, "Listing Ref,Name,Merchant Ref,Qty\nA-1,Desk Lamp,LAMP-01,3\n").unwrap();

    let mut conn = resale_feed::open(&dir.path().join("reseller.db")).unwrap();
    assert_eq!(detect_report(&conn, &path).unwrap(), ReportKind::Unknown);

    let mut mapping = get_mapping(&conn, ReportKind::ActiveListings).unwrap();
    mapping.insert("item_number".into(), "Listing Ref".into());
    mapping.insert("title".into(), "Name".into());
    mapping.insert("custom_sku".into(), "Custom label (SKU)|Merchant Ref".into());
    mapping.insert("available_quantity".into(), "Qty".into());
    update_mapping(&conn, ReportKind::ActiveListings, &mapping).unwrap();

    assert_eq!(detect_report(&conn, &path).unwrap(), ReportKind::ActiveListings);
    import_csv(&mut conn, &path, None).unwrap();
    let item = get_inventory_item_v2(&conn, "A-1").unwrap().unwrap();
    assert_eq!(item.title, "Desk Lamp");
    assert_eq!(item.custom_sku.as_deref(), Some("LAMP-01"));
    assert_eq!(item.available_quantity, Some(3));
}

#[test]
fn failed_edit_lands_in_error_log() {
    let (_dir, conn) = fresh_db();
    conn.execute_batch("INSERT INTO inventory_items (item_number, title) VALUES ('1', 'Thing');")
        .unwrap();
    // Break the edit log so the audit write fails.
    conn.execute_batch("DROP TABLE edit_log;").unwrap();

    let edits = BTreeMap::from([(InventoryUserField::CustomSku, Some("X".to_string()))]);
    assert!(update_inventory_item_user_fields(&conn, "1", &edits, None).is_err());

    let item = get_inventory_item_v2(&conn, "1").unwrap().unwrap();
    assert_eq!(item.custom_sku, None);
    let errors = get_error_logs(&conn, 10).unwrap();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].context.as_deref(), Some("update_inventory_item_user_fields"));
}
