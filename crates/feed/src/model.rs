use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::error::FeedError;

// ---------------------------------------------------------------------------
// Feed records (parser → reconciler)
// ---------------------------------------------------------------------------

/// Listing fields the marketplace export owns. Replaced on every import.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct InventoryFeedFields {
    pub title: String,
    pub current_price: Option<f64>,
    pub available_quantity: Option<i64>,
    pub condition: Option<String>,
    pub listing_site: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

/// Listing fields the user edits. A feed only fills them while empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct InventoryUserFields {
    pub custom_sku: Option<String>,
    pub ebay_category1_name: Option<String>,
    pub ebay_category1_number: Option<String>,
}

impl InventoryUserFields {
    /// Keep each stored value that is non-empty; otherwise take the incoming one.
    pub fn preserving(stored: &Self, incoming: &Self) -> Self {
        Self {
            custom_sku: keep_user_value(&stored.custom_sku, &incoming.custom_sku),
            ebay_category1_name: keep_user_value(
                &stored.ebay_category1_name,
                &incoming.ebay_category1_name,
            ),
            ebay_category1_number: keep_user_value(
                &stored.ebay_category1_number,
                &incoming.ebay_category1_number,
            ),
        }
    }
}

/// One parsed row of an active-listings snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InventoryFeedRecord {
    pub item_number: String,
    pub feed: InventoryFeedFields,
    pub user: InventoryUserFields,
}

impl InventoryFeedRecord {
    /// Build a record; blank `item_number` is rejected.
    pub fn new(
        item_number: &str,
        feed: InventoryFeedFields,
        user: InventoryUserFields,
    ) -> Result<Self, FeedError> {
        let item_number = item_number.trim();
        if item_number.is_empty() {
            return Err(FeedError::Validation("item_number is required".into()));
        }
        Ok(Self {
            item_number: item_number.to_string(),
            feed,
            user,
        })
    }
}

/// Order-line fields the export owns.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct OrderLineFeedFields {
    pub item_number: Option<String>,
    pub item_title_snapshot: String,
    pub quantity: i64,
    pub unit_price: Option<f64>,
    pub tax_amount: Option<f64>,
    pub shipping_amount: Option<f64>,
    pub discount_amount: Option<f64>,
}

/// Order-line fields the user edits.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct OrderLineUserFields {
    pub custom_sku: Option<String>,
}

impl OrderLineUserFields {
    pub fn preserving(stored: &Self, incoming: &Self) -> Self {
        Self {
            custom_sku: keep_user_value(&stored.custom_sku, &incoming.custom_sku),
        }
    }
}

/// One order line derived from a completed-orders row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderLine {
    pub order_number: String,
    pub transaction_id: String,
    pub feed: OrderLineFeedFields,
    pub user: OrderLineUserFields,
}

/// A tracking number sighted while walking order rows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShipmentRecord {
    pub tracking_number: String,
    pub order_number: String,
    pub shipping_service: Option<String>,
    pub label_cost: Option<f64>,
    pub shipped_on_date: Option<String>,
}

fn keep_user_value(stored: &Option<String>, incoming: &Option<String>) -> Option<String> {
    match stored.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => stored.clone(),
        _ => incoming.clone(),
    }
}

// ---------------------------------------------------------------------------
// Stored rows (query results)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InventoryItem {
    pub item_number: String,
    pub title: String,
    pub custom_sku: Option<String>,
    pub current_price: Option<f64>,
    pub available_quantity: Option<i64>,
    pub ebay_category1_name: Option<String>,
    pub ebay_category1_number: Option<String>,
    pub condition: Option<String>,
    pub listing_site: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub status: Option<String>,
    pub last_sync_at: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SalesOrder {
    pub order_number: String,
    pub sales_record_number: Option<String>,
    pub buyer_username: Option<String>,
    pub buyer_name: Option<String>,
    pub buyer_email: Option<String>,
    pub ship_to_name: Option<String>,
    pub ship_to_phone: Option<String>,
    pub ship_to_address_1: Option<String>,
    pub ship_to_address_2: Option<String>,
    pub ship_to_city: Option<String>,
    pub ship_to_state: Option<String>,
    pub ship_to_zip: Option<String>,
    pub ship_to_country: Option<String>,
    pub order_total: Option<f64>,
    pub ordered_at: Option<String>,
    pub paid_at: Option<String>,
    pub shipped_on_date: Option<String>,
    pub status: Option<String>,
    pub meta_json: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SalesOrderItem {
    pub id: i64,
    pub order_number: String,
    pub transaction_id: Option<String>,
    pub item_number: Option<String>,
    pub item_title_snapshot: Option<String>,
    pub custom_sku: Option<String>,
    pub quantity: Option<i64>,
    pub unit_price: Option<f64>,
    pub tax_amount: Option<f64>,
    pub shipping_amount: Option<f64>,
    pub discount_amount: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Shipment {
    pub id: i64,
    pub order_number: String,
    pub shipping_service: Option<String>,
    pub tracking_number: String,
    pub label_cost: Option<f64>,
    pub shipped_on_date: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EditLogEntry {
    pub id: i64,
    pub entity_type: String,
    pub entity_pk: String,
    pub field: String,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
    pub edited_at: Option<String>,
    pub edited_by: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorLogEntry {
    pub id: i64,
    pub created_at: String,
    pub context: Option<String>,
    pub message: String,
}

// ---------------------------------------------------------------------------
// User-editable field names
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum InventoryUserField {
    CustomSku,
    EbayCategory1Name,
    EbayCategory1Number,
}

impl InventoryUserField {
    pub const ALL: [Self; 3] = [Self::CustomSku, Self::EbayCategory1Name, Self::EbayCategory1Number];

    pub fn column(&self) -> &'static str {
        match self {
            Self::CustomSku => "custom_sku",
            Self::EbayCategory1Name => "ebay_category1_name",
            Self::EbayCategory1Number => "ebay_category1_number",
        }
    }

    pub fn get<'a>(&self, item: &'a InventoryItem) -> Option<&'a str> {
        match self {
            Self::CustomSku => item.custom_sku.as_deref(),
            Self::EbayCategory1Name => item.ebay_category1_name.as_deref(),
            Self::EbayCategory1Number => item.ebay_category1_number.as_deref(),
        }
    }
}

impl fmt::Display for InventoryUserField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}

impl FromStr for InventoryUserField {
    type Err = FeedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|f| f.column() == s.trim())
            .ok_or_else(|| FeedError::UnknownField {
                entity: "inventory_item",
                field: s.to_string(),
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum OrderItemUserField {
    CustomSku,
}

impl OrderItemUserField {
    pub fn column(&self) -> &'static str {
        match self {
            Self::CustomSku => "custom_sku",
        }
    }

    pub fn get<'a>(&self, item: &'a SalesOrderItem) -> Option<&'a str> {
        match self {
            Self::CustomSku => item.custom_sku.as_deref(),
        }
    }
}

impl fmt::Display for OrderItemUserField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}

impl FromStr for OrderItemUserField {
    type Err = FeedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "custom_sku" => Ok(Self::CustomSku),
            other => Err(FeedError::UnknownField {
                entity: "sales_order_item",
                field: other.to_string(),
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// Upsert outcomes + import summaries
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UpsertOutcome {
    Inserted,
    Updated,
}

/// A row-level problem, with enough context to fix the source file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RowIssue {
    /// 1-based data row number (the header row is not counted).
    pub row: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    pub message: String,
}

impl RowIssue {
    pub fn new(row: usize, message: impl Into<String>) -> Self {
        Self {
            row,
            field: None,
            value: None,
            message: message.into(),
        }
    }

    pub fn with_value(row: usize, field: &str, value: &str, message: impl Into<String>) -> Self {
        Self {
            row,
            field: Some(field.to_string()),
            value: Some(value.to_string()),
            message: message.into(),
        }
    }
}

impl fmt::Display for RowIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Row {}: {}", self.row, self.message)?;
        if let (Some(field), Some(value)) = (&self.field, &self.value) {
            write!(f, " ({field}='{value}')")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct InventoryImportSummary {
    pub rows_read: usize,
    pub inserted: usize,
    pub updated: usize,
    pub skipped: usize,
    pub warnings: Vec<RowIssue>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct OrderImportSummary {
    pub rows_read: usize,
    pub orders_upserted: usize,
    pub order_items_upserted: usize,
    pub shipments_upserted: usize,
    pub skipped: usize,
    pub warnings: Vec<RowIssue>,
}

/// Result of an auto-dispatched import.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "report", rename_all = "snake_case")]
pub enum ImportSummary {
    ActiveListings(InventoryImportSummary),
    Orders(OrderImportSummary),
}

impl ImportSummary {
    pub fn warnings(&self) -> &[RowIssue] {
        match self {
            Self::ActiveListings(s) => &s.warnings,
            Self::Orders(s) => &s.warnings,
        }
    }

    pub fn rows_read(&self) -> usize {
        match self {
            Self::ActiveListings(s) => s.rows_read,
            Self::Orders(s) => s.rows_read,
        }
    }
}
