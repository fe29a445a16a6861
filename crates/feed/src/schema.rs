// Normalized inventory/orders schema on SQLite

use std::path::Path;

use rusqlite::Connection;

use crate::error::Result;

const TABLES: &str = r#"
CREATE TABLE IF NOT EXISTS inventory_items (
    item_number            TEXT PRIMARY KEY,
    title                  TEXT NOT NULL,
    custom_sku             TEXT,
    current_price          NUMERIC,
    available_quantity     INTEGER,
    ebay_category1_name    TEXT,
    ebay_category1_number  TEXT,
    condition              TEXT,
    listing_site           TEXT,
    start_date             TEXT,
    end_date               TEXT,
    status                 TEXT DEFAULT 'active',
    last_sync_at           TEXT
);

CREATE TABLE IF NOT EXISTS sales_orders (
    order_number         TEXT PRIMARY KEY,
    sales_record_number  TEXT,
    buyer_username       TEXT,
    buyer_name           TEXT,
    buyer_email          TEXT,
    ship_to_name         TEXT,
    ship_to_phone        TEXT,
    ship_to_address_1    TEXT,
    ship_to_address_2    TEXT,
    ship_to_city         TEXT,
    ship_to_state        TEXT,
    ship_to_zip          TEXT,
    ship_to_country      TEXT,
    order_total          NUMERIC,
    ordered_at           TEXT,
    paid_at              TEXT,
    shipped_on_date      TEXT,
    status               TEXT,
    meta_json            TEXT
);

CREATE TABLE IF NOT EXISTS sales_order_items (
    id                   INTEGER PRIMARY KEY,
    order_number         TEXT NOT NULL,
    transaction_id       TEXT,
    item_number          TEXT,
    item_title_snapshot  TEXT,
    custom_sku           TEXT,
    quantity             INTEGER,
    unit_price           NUMERIC,
    tax_amount           NUMERIC,
    shipping_amount      NUMERIC,
    discount_amount      NUMERIC,
    FOREIGN KEY(order_number) REFERENCES sales_orders(order_number)
);

CREATE TABLE IF NOT EXISTS shipments (
    id               INTEGER PRIMARY KEY,
    order_number     TEXT NOT NULL,
    shipping_service TEXT,
    tracking_number  TEXT UNIQUE,
    label_cost       NUMERIC,
    shipped_on_date  TEXT,
    FOREIGN KEY(order_number) REFERENCES sales_orders(order_number)
);

CREATE TABLE IF NOT EXISTS edit_log (
    id          INTEGER PRIMARY KEY,
    entity_type TEXT NOT NULL,
    entity_pk   TEXT NOT NULL,
    field       TEXT NOT NULL,
    old_value   TEXT,
    new_value   TEXT,
    edited_at   TEXT DEFAULT CURRENT_TIMESTAMP,
    edited_by   TEXT
);

CREATE TABLE IF NOT EXISTS error_logs (
    id         INTEGER PRIMARY KEY AUTOINCREMENT,
    created_at TEXT NOT NULL,
    context    TEXT,
    message    TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS import_mappings (
    report_type  TEXT PRIMARY KEY,
    mapping_json TEXT NOT NULL
);

CREATE UNIQUE INDEX IF NOT EXISTS ux_order_line
    ON sales_order_items(order_number, COALESCE(transaction_id, CAST(id AS TEXT)));

CREATE INDEX IF NOT EXISTS ix_edit_log_entity
    ON edit_log(entity_type, entity_pk);
"#;

/// Read-only projections in the older flat shape.
const VIEWS: &str = r#"
CREATE VIEW IF NOT EXISTS listings_compat AS
SELECT
    item_number,
    title,
    custom_sku            AS sku,
    current_price         AS price,
    available_quantity    AS quantity,
    ebay_category1_name   AS category_name,
    ebay_category1_number AS category_number,
    status,
    start_date,
    end_date,
    listing_site,
    last_sync_at
FROM inventory_items;

CREATE VIEW IF NOT EXISTS order_lines_compat AS
SELECT
    so.order_number,
    so.sales_record_number,
    soi.id                  AS order_item_id,
    soi.item_number,
    soi.item_title_snapshot AS item_title,
    soi.custom_sku,
    soi.quantity,
    soi.unit_price,
    soi.tax_amount,
    soi.shipping_amount,
    soi.discount_amount,
    so.buyer_username,
    so.buyer_name,
    so.order_total,
    so.paid_at,
    so.shipped_on_date,
    so.status
FROM sales_order_items soi
JOIN sales_orders so ON so.order_number = soi.order_number;
"#;

const DEFAULT_MAPPINGS: &str = r#"
INSERT OR IGNORE INTO import_mappings (report_type, mapping_json)
VALUES ('active_listings', '{"current_price":"Current price|Start price","custom_sku":"Custom label (SKU)"}');
INSERT OR IGNORE INTO import_mappings (report_type, mapping_json)
VALUES ('orders', '{"ordered_at":"Order Date|Sale Date","unit_price":"Sold For|Total Price|Sale Price"}');
"#;

/// Columns that were added after the first release of each table.
/// Older databases get them through `ALTER TABLE ... ADD COLUMN`.
const ADDITIVE_COLUMNS: &[(&str, &str, &str)] = &[
    ("inventory_items", "listing_site", "TEXT"),
    ("inventory_items", "last_sync_at", "TEXT"),
    ("sales_orders", "meta_json", "TEXT"),
    ("sales_orders", "shipped_on_date", "TEXT"),
    ("sales_order_items", "discount_amount", "NUMERIC"),
    ("shipments", "label_cost", "NUMERIC"),
];

/// Open (or create) a database file and bring its schema up to date.
pub fn open(path: &Path) -> Result<Connection> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|e| crate::error::FeedError::Io {
                path: parent.to_path_buf(),
                message: e.to_string(),
            })?;
        }
    }
    let conn = Connection::open(path)?;
    ensure_schema(&conn)?;
    Ok(conn)
}

/// In-memory database with the full schema. Used by tests.
pub fn open_in_memory() -> Result<Connection> {
    let conn = Connection::open_in_memory()?;
    ensure_schema(&conn)?;
    Ok(conn)
}

/// Create tables, indexes and views if missing; add missing columns.
/// Idempotent, never drops anything.
///
/// Order links from lines and shipments are informational only: a line or
/// shipment may land before its order header, and the compatibility views
/// join them away until it does.
pub fn ensure_schema(conn: &Connection) -> Result<()> {
    conn.pragma_update(None, "foreign_keys", false)?;
    conn.execute_batch(TABLES)?;
    ensure_columns(conn)?;
    conn.execute_batch(VIEWS)?;
    conn.execute_batch(DEFAULT_MAPPINGS)?;
    Ok(())
}

fn ensure_columns(conn: &Connection) -> Result<()> {
    for (table, column, ddl) in ADDITIVE_COLUMNS {
        let existing = table_columns(conn, table)?;
        if !existing.iter().any(|c| c == column) {
            log::info!("adding column {table}.{column}");
            conn.execute_batch(&format!("ALTER TABLE {table} ADD COLUMN {column} {ddl}"))?;
        }
    }
    Ok(())
}

/// Column names of a table, in declaration order.
pub fn table_columns(conn: &Connection, table: &str) -> Result<Vec<String>> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table})"))?;
    let names = stmt
        .query_map([], |row| row.get::<_, String>(1))?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_is_idempotent() {
        let conn = open_in_memory().unwrap();
        ensure_schema(&conn).unwrap();
        ensure_schema(&conn).unwrap();

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM import_mappings", [], |r| r.get(0))
            .unwrap();
        assert_eq!(count, 2);
    }

    #[test]
    fn views_exist() {
        let conn = open_in_memory().unwrap();
        let views: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type = 'view' ORDER BY name")
            .unwrap()
            .query_map([], |r| r.get(0))
            .unwrap()
            .collect::<rusqlite::Result<_>>()
            .unwrap();
        assert_eq!(views, vec!["listings_compat", "order_lines_compat"]);
    }

    #[test]
    fn old_table_gains_missing_columns() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE inventory_items (
                item_number TEXT PRIMARY KEY,
                title TEXT NOT NULL,
                custom_sku TEXT,
                current_price NUMERIC,
                available_quantity INTEGER,
                ebay_category1_name TEXT,
                ebay_category1_number TEXT,
                condition TEXT,
                start_date TEXT,
                end_date TEXT,
                status TEXT
            );",
        )
        .unwrap();
        let before = table_columns(&conn, "inventory_items").unwrap();
        assert!(!before.contains(&"last_sync_at".to_string()));

        ensure_schema(&conn).unwrap();
        let after = table_columns(&conn, "inventory_items").unwrap();
        assert!(after.contains(&"last_sync_at".to_string()));
        assert!(after.contains(&"listing_site".to_string()));
        assert_eq!(&after[..2], &["item_number".to_string(), "title".to_string()]);
    }

    #[test]
    fn order_links_are_not_enforced() {
        let conn = open_in_memory().unwrap();
        let enforced: i64 = conn.query_row("PRAGMA foreign_keys", [], |r| r.get(0)).unwrap();
        assert_eq!(enforced, 0);

        let line = crate::model::OrderLine {
            order_number: "9999".into(),
            transaction_id: "T1".into(),
            feed: crate::model::OrderLineFeedFields {
                item_title_snapshot: "Orphan".into(),
                quantity: 1,
                ..Default::default()
            },
            user: Default::default(),
        };
        crate::orders::upsert_sales_order_item_from_feed(&conn, &line).unwrap();
        let shipment = crate::model::ShipmentRecord {
            tracking_number: "1Z000".into(),
            order_number: "9999".into(),
            shipping_service: None,
            label_cost: None,
            shipped_on_date: None,
        };
        crate::shipments::upsert_shipment_from_feed(&conn, &shipment).unwrap();

        assert_eq!(crate::orders::get_sales_order_items_v2(&conn, Some("9999")).unwrap().len(), 1);
        assert_eq!(crate::shipments::get_shipments(&conn, Some("9999")).unwrap().len(), 1);
        assert!(crate::compat::get_order_lines_compat(&conn).unwrap().is_empty());
    }

    #[test]
    fn file_database_reopens() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("reseller.db");
        drop(open(&path).unwrap());
        let conn = open(&path).unwrap();
        let cols = table_columns(&conn, "sales_orders").unwrap();
        assert!(cols.contains(&"meta_json".to_string()));
    }
}
