// Readers for the flat compatibility views

use rusqlite::Connection;
use serde::Serialize;

use crate::error::Result;

/// One row of `listings_compat`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ListingCompat {
    pub item_number: String,
    pub title: String,
    pub sku: Option<String>,
    pub price: Option<f64>,
    pub quantity: Option<i64>,
    pub category_name: Option<String>,
    pub category_number: Option<String>,
    pub status: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub listing_site: Option<String>,
    pub last_sync_at: Option<String>,
}

/// One row of `order_lines_compat`: a line joined with its order header.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderLineCompat {
    pub order_number: String,
    pub sales_record_number: Option<String>,
    pub order_item_id: i64,
    pub item_number: Option<String>,
    pub item_title: Option<String>,
    pub custom_sku: Option<String>,
    pub quantity: Option<i64>,
    pub unit_price: Option<f64>,
    pub tax_amount: Option<f64>,
    pub shipping_amount: Option<f64>,
    pub discount_amount: Option<f64>,
    pub buyer_username: Option<String>,
    pub buyer_name: Option<String>,
    pub order_total: Option<f64>,
    pub paid_at: Option<String>,
    pub shipped_on_date: Option<String>,
    pub status: Option<String>,
}

pub fn get_listings_compat(conn: &Connection) -> Result<Vec<ListingCompat>> {
    let mut stmt = conn.prepare(
        "SELECT item_number, title, sku, price, quantity, category_name, category_number,
                status, start_date, end_date, listing_site, last_sync_at
         FROM listings_compat ORDER BY item_number",
    )?;
    let rows = stmt
        .query_map([], |row| {
            Ok(ListingCompat {
                item_number: row.get(0)?,
                title: row.get(1)?,
                sku: row.get(2)?,
                price: row.get(3)?,
                quantity: row.get(4)?,
                category_name: row.get(5)?,
                category_number: row.get(6)?,
                status: row.get(7)?,
                start_date: row.get(8)?,
                end_date: row.get(9)?,
                listing_site: row.get(10)?,
                last_sync_at: row.get(11)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

pub fn get_order_lines_compat(conn: &Connection) -> Result<Vec<OrderLineCompat>> {
    let mut stmt = conn.prepare(
        "SELECT order_number, sales_record_number, order_item_id, item_number, item_title,
                custom_sku, quantity, unit_price, tax_amount, shipping_amount, discount_amount,
                buyer_username, buyer_name, order_total, paid_at, shipped_on_date, status
         FROM order_lines_compat ORDER BY order_number, order_item_id",
    )?;
    let rows = stmt
        .query_map([], |row| {
            Ok(OrderLineCompat {
                order_number: row.get(0)?,
                sales_record_number: row.get(1)?,
                order_item_id: row.get(2)?,
                item_number: row.get(3)?,
                item_title: row.get(4)?,
                custom_sku: row.get(5)?,
                quantity: row.get(6)?,
                unit_price: row.get(7)?,
                tax_amount: row.get(8)?,
                shipping_amount: row.get(9)?,
                discount_amount: row.get(10)?,
                buyer_username: row.get(11)?,
                buyer_name: row.get(12)?,
                order_total: row.get(13)?,
                paid_at: row.get(14)?,
                shipped_on_date: row.get(15)?,
                status: row.get(16)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::open_in_memory;

    #[test]
    fn views_project_stored_rows() {
        let conn = open_in_memory().unwrap();
        conn.execute_batch(
            "INSERT INTO inventory_items (item_number, title, custom_sku, current_price, status)
                 VALUES ('1', 'Widget', 'SKU-1', 9.5, 'active');
             INSERT INTO sales_orders (order_number, buyer_name, order_total)
                 VALUES ('1001', 'Jane', 12.0);
             INSERT INTO sales_order_items (order_number, transaction_id, item_title_snapshot, quantity)
                 VALUES ('1001', 'T1', 'Widget', 2);
             INSERT INTO sales_order_items (order_number, transaction_id, item_title_snapshot, quantity)
                 VALUES ('9999', 'T2', 'Orphan', 1);",
        )
        .unwrap();

        let listings = get_listings_compat(&conn).unwrap();
        assert_eq!(listings.len(), 1);
        assert_eq!(listings[0].sku.as_deref(), Some("SKU-1"));
        assert_eq!(listings[0].price, Some(9.5));

        // Lines without an order header drop out of the join.
        let lines = get_order_lines_compat(&conn).unwrap();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].item_title.as_deref(), Some("Widget"));
        assert_eq!(lines[0].buyer_name.as_deref(), Some("Jane"));
        assert_eq!(lines[0].quantity, Some(2));
    }
}
