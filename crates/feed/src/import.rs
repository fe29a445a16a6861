//! Single entry point: read a report, detect its type, dispatch.

use std::path::Path;

use rusqlite::Connection;

use crate::classify::{classify_with, ReportKind};
use crate::error::{FeedError, Result};
use crate::inventory::import_inventory_feed;
use crate::mappings::get_mapping;
use crate::model::ImportSummary;
use crate::orders::import_orders_feed;
use crate::reader::read_feed;

/// Detect the report type of a file without importing it.
pub fn detect_report(conn: &Connection, path: &Path) -> Result<ReportKind> {
    let file = read_feed(path)?;
    let listings = get_mapping(conn, ReportKind::ActiveListings)?;
    let orders = get_mapping(conn, ReportKind::Orders)?;
    Ok(classify_with(&file.headers, &listings, &orders))
}

/// Import a marketplace CSV.
///
/// The type comes from `kind` when given, otherwise from the header row.
/// A file that is neither report is refused before anything is written.
pub fn import_csv(conn: &mut Connection, path: &Path, kind: Option<ReportKind>) -> Result<ImportSummary> {
    let file = read_feed(path)?;
    let listings = get_mapping(conn, ReportKind::ActiveListings)?;
    let orders = get_mapping(conn, ReportKind::Orders)?;

    let kind = kind.unwrap_or_else(|| classify_with(&file.headers, &listings, &orders));
    log::info!("importing {} as {kind}", path.display());

    match kind {
        ReportKind::ActiveListings => Ok(ImportSummary::ActiveListings(import_inventory_feed(conn, &file, &listings)?)),
        ReportKind::Orders => Ok(ImportSummary::Orders(import_orders_feed(conn, &file, &orders)?)),
        ReportKind::Unknown => {
            log::warn!("refusing {}: unrecognized headers {:?}", path.display(), file.headers);
            Err(FeedError::UnknownReport { headers: file.headers })
        }
    }
}
