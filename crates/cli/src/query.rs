// Read-only commands: inventory, orders, history, errors

use rusqlite::Connection;
use serde::Serialize;

use resale_feed::compat::{get_listings_compat, get_order_lines_compat};
use resale_feed::edit_log::get_edit_log;
use resale_feed::error_log::{clear_error_logs, get_error_logs};
use resale_feed::inventory::{get_inventory_item_v2, get_inventory_items_v2};
use resale_feed::model::{SalesOrder, SalesOrderItem, Shipment};
use resale_feed::orders::{get_sales_order_items_v2, get_sales_order_v2, get_sales_orders_v2};
use resale_feed::shipments::get_shipments;

use crate::{print_json, CliError};

fn opt<T: ToString>(v: &Option<T>) -> String {
    v.as_ref().map(|x| x.to_string()).unwrap_or_else(|| "-".to_string())
}

fn money(v: Option<f64>) -> String {
    v.map(|x| format!("{x:.2}")).unwrap_or_else(|| "-".to_string())
}

// ============================================================================
// inventory
// ============================================================================

pub fn cmd_inventory_list(conn: &Connection, json: bool, compat: bool) -> Result<(), CliError> {
    if compat {
        let rows = get_listings_compat(conn)?;
        return if json {
            print_json(&rows)
        } else {
            for r in &rows {
                println!("{}\t{}\t{}\t{}\t{}", r.item_number, opt(&r.sku), money(r.price), opt(&r.quantity), r.title);
            }
            Ok(())
        };
    }

    let items = get_inventory_items_v2(conn)?;
    if json {
        return print_json(&items);
    }
    for item in &items {
        println!(
            "{}\t{}\t{}\t{}\t{}",
            item.item_number,
            opt(&item.custom_sku),
            money(item.current_price),
            opt(&item.available_quantity),
            item.title
        );
    }
    Ok(())
}

pub fn cmd_inventory_show(conn: &Connection, item_number: &str, json: bool) -> Result<(), CliError> {
    let item = get_inventory_item_v2(conn, item_number)?
        .ok_or_else(|| CliError::not_found(format!("no listing with item number {item_number}")))?;
    if json {
        return print_json(&item);
    }
    println!("item_number:           {}", item.item_number);
    println!("title:                 {}", item.title);
    println!("custom_sku:            {}", opt(&item.custom_sku));
    println!("current_price:         {}", money(item.current_price));
    println!("available_quantity:    {}", opt(&item.available_quantity));
    println!("ebay_category1_name:   {}", opt(&item.ebay_category1_name));
    println!("ebay_category1_number: {}", opt(&item.ebay_category1_number));
    println!("condition:             {}", opt(&item.condition));
    println!("listing_site:          {}", opt(&item.listing_site));
    println!("start_date:            {}", opt(&item.start_date));
    println!("end_date:              {}", opt(&item.end_date));
    println!("status:                {}", opt(&item.status));
    println!("last_sync_at:          {}", opt(&item.last_sync_at));
    Ok(())
}

// ============================================================================
// orders
// ============================================================================

pub fn cmd_orders_list(conn: &Connection, json: bool) -> Result<(), CliError> {
    let orders = get_sales_orders_v2(conn)?;
    if json {
        return print_json(&orders);
    }
    for o in &orders {
        println!(
            "{}\t{}\t{}\t{}",
            o.order_number,
            opt(&o.ordered_at),
            money(o.order_total),
            opt(&o.buyer_username.clone().or_else(|| o.buyer_name.clone()))
        );
    }
    Ok(())
}

#[derive(Serialize)]
struct OrderDetail {
    order: SalesOrder,
    items: Vec<SalesOrderItem>,
    shipments: Vec<Shipment>,
}

pub fn cmd_order_show(conn: &Connection, order_number: &str, json: bool) -> Result<(), CliError> {
    let order = get_sales_order_v2(conn, order_number)?
        .ok_or_else(|| CliError::not_found(format!("no order {order_number}")))?;
    let detail = OrderDetail {
        items: get_sales_order_items_v2(conn, Some(order_number))?,
        shipments: get_shipments(conn, Some(order_number))?,
        order,
    };
    if json {
        return print_json(&detail);
    }

    let o = &detail.order;
    println!("order {}  ({})", o.order_number, opt(&o.status));
    println!("  buyer:   {} {}", opt(&o.buyer_username), opt(&o.buyer_name));
    println!("  ship to: {}, {} {}", opt(&o.ship_to_name), opt(&o.ship_to_city), opt(&o.ship_to_zip));
    println!("  total:   {}", money(o.order_total));
    println!("  ordered: {}  paid: {}  shipped: {}", opt(&o.ordered_at), opt(&o.paid_at), opt(&o.shipped_on_date));
    if let Some(meta) = &o.meta_json {
        println!("  meta:    {meta}");
    }
    for i in &detail.items {
        println!(
            "  line {:>5}  {}  x{}  {}  {}  sku={}",
            i.id,
            opt(&i.transaction_id),
            opt(&i.quantity),
            money(i.unit_price),
            opt(&i.item_title_snapshot),
            opt(&i.custom_sku)
        );
    }
    for s in &detail.shipments {
        println!("  shipment {}  {}  {}", s.tracking_number, opt(&s.shipping_service), money(s.label_cost));
    }
    Ok(())
}

pub fn cmd_order_items(conn: &Connection, order: Option<&str>, json: bool, compat: bool) -> Result<(), CliError> {
    if compat {
        let rows: Vec<_> = get_order_lines_compat(conn)?
            .into_iter()
            .filter(|r| order.map_or(true, |o| r.order_number == o))
            .collect();
        return if json {
            print_json(&rows)
        } else {
            for r in &rows {
                println!(
                    "{}\t{}\t{}\t{}\t{}",
                    r.order_item_id,
                    r.order_number,
                    opt(&r.custom_sku),
                    money(r.unit_price),
                    opt(&r.item_title)
                );
            }
            Ok(())
        };
    }

    let items = get_sales_order_items_v2(conn, order)?;
    if json {
        return print_json(&items);
    }
    for i in &items {
        println!(
            "{}\t{}\t{}\t{}\t{}\t{}",
            i.id,
            i.order_number,
            opt(&i.transaction_id),
            opt(&i.custom_sku),
            money(i.unit_price),
            opt(&i.item_title_snapshot)
        );
    }
    Ok(())
}

pub fn cmd_shipments(conn: &Connection, order: Option<&str>, json: bool) -> Result<(), CliError> {
    let shipments = get_shipments(conn, order)?;
    if json {
        return print_json(&shipments);
    }
    for s in &shipments {
        println!(
            "{}\t{}\t{}\t{}\t{}",
            s.tracking_number,
            s.order_number,
            opt(&s.shipping_service),
            money(s.label_cost),
            opt(&s.shipped_on_date)
        );
    }
    Ok(())
}

// ============================================================================
// history + errors
// ============================================================================

pub fn cmd_history(conn: &Connection, entity_type: &str, entity_pk: &str, json: bool) -> Result<(), CliError> {
    let entries = get_edit_log(conn, entity_type, entity_pk)?;
    if json {
        return print_json(&entries);
    }
    if entries.is_empty() {
        println!("no edits recorded for {entity_type} {entity_pk}");
    }
    for e in &entries {
        println!(
            "{}  {}  {}: {} -> {}",
            opt(&e.edited_at),
            opt(&e.edited_by),
            e.field,
            opt(&e.old_value),
            opt(&e.new_value)
        );
    }
    Ok(())
}

pub fn cmd_errors_list(conn: &Connection, limit: usize, json: bool) -> Result<(), CliError> {
    let entries = get_error_logs(conn, limit)?;
    if json {
        return print_json(&entries);
    }
    for e in &entries {
        println!("{}  [{}]  {}", e.created_at, opt(&e.context), e.message);
    }
    Ok(())
}

pub fn cmd_errors_clear(conn: &Connection) -> Result<(), CliError> {
    let removed = clear_error_logs(conn)?;
    println!("removed {removed} error log entr{}", if removed == 1 { "y" } else { "ies" });
    Ok(())
}
