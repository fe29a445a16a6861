// User-field edits and header mapping commands

use std::collections::BTreeMap;
use std::str::FromStr;

use rusqlite::Connection;

use resale_feed::mappings::{get_mapping, update_mapping, FieldMapping};
use resale_feed::{
    update_inventory_item_user_fields, update_sales_order_item_user_fields, FeedError, InventoryUserField,
    OrderItemUserField, ReportKind,
};

use crate::{print_json, CliError};

/// Split `field=value`. An empty value means "clear".
fn split_assignment(raw: &str) -> Result<(&str, Option<String>), CliError> {
    let (field, value) = raw
        .split_once('=')
        .ok_or_else(|| CliError::args(format!("expected field=value, got '{raw}'")))?;
    let value = value.trim();
    Ok((field.trim(), (!value.is_empty()).then(|| value.to_string())))
}

/// Parse repeated `--set` values into typed field updates.
pub fn parse_updates<F>(sets: &[String]) -> Result<BTreeMap<F, Option<String>>, CliError>
where
    F: FromStr<Err = FeedError> + Ord,
{
    let mut updates = BTreeMap::new();
    for raw in sets {
        let (field, value) = split_assignment(raw)?;
        let field = F::from_str(field)?;
        updates.insert(field, value);
    }
    Ok(updates)
}

fn report_edit(changed: bool, what: &str) {
    if changed {
        println!("updated {what}");
    } else {
        println!("no changes to {what}");
    }
}

pub fn cmd_edit_inventory(
    conn: &Connection,
    item_number: &str,
    sets: &[String],
    edited_by: Option<&str>,
) -> Result<(), CliError> {
    let updates: BTreeMap<InventoryUserField, _> = parse_updates(sets)?;
    if resale_feed::inventory::get_inventory_item_v2(conn, item_number)?.is_none() {
        return Err(CliError::not_found(format!("no listing with item number {item_number}")));
    }
    let changed = update_inventory_item_user_fields(conn, item_number, &updates, edited_by)?;
    report_edit(changed, &format!("item {item_number}"));
    Ok(())
}

pub fn cmd_edit_order_item(
    conn: &Connection,
    id: i64,
    sets: &[String],
    edited_by: Option<&str>,
) -> Result<(), CliError> {
    let updates: BTreeMap<OrderItemUserField, _> = parse_updates(sets)?;
    if resale_feed::orders::get_sales_order_item_v2(conn, id)?.is_none() {
        return Err(CliError::not_found(format!("no order line with id {id}")));
    }
    let changed = update_sales_order_item_user_fields(conn, id, &updates, edited_by)?;
    report_edit(changed, &format!("order line {id}"));
    Ok(())
}

pub fn cmd_mapping_show(conn: &Connection, kind: ReportKind) -> Result<(), CliError> {
    print_json(&get_mapping(conn, kind)?)
}

pub fn cmd_mapping_set(conn: &Connection, kind: ReportKind, entries: &[String]) -> Result<(), CliError> {
    let mut mapping = FieldMapping::new();
    for raw in entries {
        let (field, candidates) = split_assignment(raw)?;
        let candidates = candidates
            .ok_or_else(|| CliError::args(format!("'{field}' needs at least one header candidate")))?;
        mapping.insert(field.to_string(), candidates);
    }
    update_mapping(conn, kind, &mapping)?;
    println!("stored {} mapping with {} field(s)", kind, mapping.len());
    Ok(())
}
