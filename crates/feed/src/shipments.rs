// Shipments keyed by tracking number

use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::error::{FeedError, Result};
use crate::model::{Shipment, ShipmentRecord, UpsertOutcome};

fn shipment_from_row(row: &Row<'_>) -> rusqlite::Result<Shipment> {
    Ok(Shipment {
        id: row.get(0)?,
        order_number: row.get(1)?,
        shipping_service: row.get(2)?,
        tracking_number: row.get(3)?,
        label_cost: row.get(4)?,
        shipped_on_date: row.get(5)?,
    })
}

/// Insert or replace a shipment. Every column comes from the feed, so a
/// re-sighted tracking number simply takes the latest values.
pub fn upsert_shipment_from_feed(conn: &Connection, record: &ShipmentRecord) -> Result<UpsertOutcome> {
    if record.tracking_number.trim().is_empty() {
        return Err(FeedError::Validation("tracking_number is required".into()));
    }

    let exists = conn
        .query_row(
            "SELECT 1 FROM shipments WHERE tracking_number = ?1",
            params![record.tracking_number],
            |_| Ok(()),
        )
        .optional()?
        .is_some();

    conn.execute(
        "INSERT INTO shipments (order_number, shipping_service, tracking_number, label_cost, shipped_on_date)
         VALUES (?1, ?2, ?3, ?4, ?5)
         ON CONFLICT(tracking_number) DO UPDATE SET
            order_number = excluded.order_number,
            shipping_service = excluded.shipping_service,
            label_cost = excluded.label_cost,
            shipped_on_date = excluded.shipped_on_date",
        params![
            record.order_number,
            record.shipping_service,
            record.tracking_number,
            record.label_cost,
            record.shipped_on_date,
        ],
    )?;

    Ok(if exists { UpsertOutcome::Updated } else { UpsertOutcome::Inserted })
}

/// Shipments, optionally for a single order.
pub fn get_shipments(conn: &Connection, order_number: Option<&str>) -> Result<Vec<Shipment>> {
    let mut stmt = conn.prepare(
        "SELECT id, order_number, shipping_service, tracking_number, label_cost, shipped_on_date
         FROM shipments
         WHERE ?1 IS NULL OR order_number = ?1
         ORDER BY order_number, id",
    )?;
    let rows = stmt
        .query_map(params![order_number], shipment_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::open_in_memory;

    fn shipment(tracking: &str, order: &str, service: Option<&str>) -> ShipmentRecord {
        ShipmentRecord {
            tracking_number: tracking.into(),
            order_number: order.into(),
            shipping_service: service.map(String::from),
            label_cost: Some(4.5),
            shipped_on_date: None,
        }
    }

    #[test]
    fn tracking_number_is_unique() {
        let conn = open_in_memory().unwrap();
        let a = upsert_shipment_from_feed(&conn, &shipment("1Z999", "1001", Some("USPS"))).unwrap();
        let b = upsert_shipment_from_feed(&conn, &shipment("1Z999", "1001", Some("UPS Ground"))).unwrap();
        assert_eq!(a, UpsertOutcome::Inserted);
        assert_eq!(b, UpsertOutcome::Updated);

        let all = get_shipments(&conn, None).unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].shipping_service.as_deref(), Some("UPS Ground"));
    }

    #[test]
    fn filter_by_order() {
        let conn = open_in_memory().unwrap();
        upsert_shipment_from_feed(&conn, &shipment("A", "1", None)).unwrap();
        upsert_shipment_from_feed(&conn, &shipment("B", "2", None)).unwrap();
        assert_eq!(get_shipments(&conn, Some("2")).unwrap()[0].tracking_number, "B");
        assert_eq!(get_shipments(&conn, None).unwrap().len(), 2);
        assert!(get_shipments(&conn, Some("3")).unwrap().is_empty());
    }

    #[test]
    fn blank_tracking_rejected() {
        let conn = open_in_memory().unwrap();
        let err = upsert_shipment_from_feed(&conn, &shipment(" ", "1", None)).unwrap_err();
        assert!(matches!(err, FeedError::Validation(_)));
    }
}
