//! `resale-feed`: marketplace CSV reconciliation into a normalized SQLite store.
//!
//! Reads active-listings snapshots and completed-orders reports, detects
//! which is which from the header row, and upserts them into inventory,
//! order, order-line and shipment tables. Feed-owned columns follow the
//! latest file; user-owned columns keep what the user typed, and every
//! user edit lands in an append-only edit log.

pub mod accumulate;
pub mod classify;
pub mod compat;
pub mod edit_log;
pub mod error;
pub mod error_log;
pub mod header;
pub mod import;
pub mod inventory;
pub mod mappings;
pub mod model;
pub mod orders;
pub mod parse;
pub mod reader;
pub mod schema;
pub mod shipments;

pub use classify::{classify_headers, ReportKind};
pub use error::{FeedError, Result};
pub use import::{detect_report, import_csv};
pub use inventory::{import_inventory_from_csv, update_inventory_item_user_fields};
pub use model::{ImportSummary, InventoryUserField, OrderItemUserField, RowIssue};
pub use orders::{import_orders_from_csv, update_sales_order_item_user_fields};
pub use schema::{open, open_in_memory};
