//! In-memory merge of completed-order rows, before any database write.
//!
//! One export row is one order line, but order-level data (buyer, totals,
//! dates, fees) is repeated or scattered across the rows of an order. The
//! batch folds every row of a file into one accumulator per order number,
//! in first-seen order. Meta sums start from zero for every batch, so
//! importing the same file twice yields the same totals.

use std::collections::{BTreeMap, HashMap};

use csv::StringRecord;

use crate::header::HeaderIndex;
use crate::model::{OrderLine, OrderLineFeedFields, OrderLineUserFields, RowIssue, SalesOrder, ShipmentRecord};
use crate::parse::{clean_str, is_invalid_decimal, is_iso_datetime, parse_datetime, parse_decimal, parse_int};

/// Order-level text fields merged "last non-empty wins".
const ORDER_TEXT_FIELDS: &[&str] = &[
    "sales_record_number",
    "buyer_username",
    "buyer_name",
    "buyer_email",
    "ship_to_name",
    "ship_to_phone",
    "ship_to_address_1",
    "ship_to_address_2",
    "ship_to_city",
    "ship_to_state",
    "ship_to_zip",
    "ship_to_country",
    "status",
];

/// Money columns that must parse when present; a bad value only warns.
const MONEY_FIELDS: &[&str] = &[
    "order_total",
    "unit_price",
    "tax_amount",
    "seller_collected_tax",
    "ebay_collected_tax",
    "shipping_amount",
    "discount_amount",
    "label_cost",
];

const DATE_FIELDS: &[&str] = &["ordered_at", "paid_at", "shipped_on_date"];

// ---------------------------------------------------------------------------
// Parsed row
// ---------------------------------------------------------------------------

/// One completed-orders row with every cell coerced.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OrderRow {
    pub order_number: String,
    /// Order-level text fields by canonical name, only those present.
    pub order_text: BTreeMap<&'static str, String>,
    pub order_total: Option<f64>,
    pub ordered_at: Option<String>,
    pub paid_at: Option<String>,
    pub shipped_on_date: Option<String>,
    pub transaction_id: Option<String>,
    pub item_number: Option<String>,
    pub item_title: Option<String>,
    pub custom_sku: Option<String>,
    pub quantity: Option<i64>,
    pub unit_price: Option<f64>,
    pub tax_amount: Option<f64>,
    pub seller_collected_tax: Option<f64>,
    pub ebay_collected_tax: Option<f64>,
    pub shipping_amount: Option<f64>,
    pub discount_amount: Option<f64>,
    pub shipping_service: Option<String>,
    pub tracking_number: Option<String>,
    pub label_cost: Option<f64>,
}

impl OrderRow {
    /// Coerce a CSV row. A blank order number skips the row; any other
    /// unparseable value is dropped with a warning.
    pub fn parse(index: &HeaderIndex, record: &StringRecord, row: usize, issues: &mut Vec<RowIssue>) -> Option<Self> {
        let Some(order_number) = clean_str(index.cell(record, "order_number")) else {
            issues.push(RowIssue::new(row, "missing order number"));
            return None;
        };

        for field in MONEY_FIELDS {
            let raw = index.cell(record, field);
            if is_invalid_decimal(raw) {
                log::warn!("row {row}: non-numeric {field} '{raw}' for order {order_number}");
                issues.push(RowIssue::with_value(row, field, raw, "non-numeric value ignored"));
            }
        }
        let qty_raw = index.cell(record, "quantity");
        if is_invalid_decimal(qty_raw) {
            issues.push(RowIssue::with_value(row, "quantity", qty_raw, "non-numeric quantity, using 1"));
        }

        let mut dates: [Option<String>; 3] = Default::default();
        for (slot, field) in dates.iter_mut().zip(DATE_FIELDS) {
            *slot = parse_datetime(index.cell(record, field));
            if let Some(text) = slot.as_deref().filter(|t| !is_iso_datetime(t)) {
                issues.push(RowIssue::with_value(row, field, text, "unrecognized date kept as text"));
            }
        }
        let [ordered_at, paid_at, shipped_on_date] = dates;

        let order_text = ORDER_TEXT_FIELDS
            .iter()
            .filter_map(|f| clean_str(index.cell(record, f)).map(|v| (*f, v)))
            .collect();

        let money = |field: &str| parse_decimal(index.cell(record, field));
        let text = |field: &str| clean_str(index.cell(record, field));

        Some(Self {
            order_number,
            order_text,
            order_total: money("order_total"),
            ordered_at,
            paid_at,
            shipped_on_date,
            transaction_id: text("transaction_id"),
            item_number: text("item_number"),
            item_title: text("item_title"),
            custom_sku: text("custom_sku"),
            quantity: parse_int(qty_raw),
            unit_price: money("unit_price"),
            tax_amount: money("tax_amount"),
            seller_collected_tax: money("seller_collected_tax"),
            ebay_collected_tax: money("ebay_collected_tax"),
            shipping_amount: money("shipping_amount"),
            discount_amount: money("discount_amount"),
            shipping_service: text("shipping_service"),
            tracking_number: text("tracking_number"),
            label_cost: money("label_cost"),
        })
    }

    /// Line tax: the single tax column, or else the sum of the split
    /// seller/marketplace columns. `None` when none of them parsed.
    pub fn line_tax(&self) -> Option<f64> {
        if self.tax_amount.is_some() {
            return self.tax_amount;
        }
        match (self.seller_collected_tax, self.ebay_collected_tax) {
            (None, None) => None,
            (a, b) => Some(round_cents(a.unwrap_or(0.0) + b.unwrap_or(0.0))),
        }
    }
}

fn round_cents(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

// ---------------------------------------------------------------------------
// Per-order accumulator
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct OrderAccumulator {
    order: SalesOrder,
    meta: BTreeMap<String, f64>,
    lines: Vec<OrderLine>,
    line_pos: HashMap<String, usize>,
    rows_merged: usize,
    first_row: usize,
}

impl OrderAccumulator {
    pub fn new(order_number: &str, first_row: usize) -> Self {
        Self {
            order: SalesOrder {
                order_number: order_number.to_string(),
                ..Default::default()
            },
            meta: BTreeMap::new(),
            lines: Vec::new(),
            line_pos: HashMap::new(),
            rows_merged: 0,
            first_row,
        }
    }

    pub fn order_number(&self) -> &str {
        &self.order.order_number
    }

    /// Data row number where this order first appeared.
    pub fn first_row(&self) -> usize {
        self.first_row
    }

    pub fn rows_merged(&self) -> usize {
        self.rows_merged
    }

    /// Fold one row into the order and append its line.
    pub fn merge(&mut self, row: &OrderRow) {
        self.rows_merged += 1;

        for (field, value) in &row.order_text {
            if let Some(slot) = self.text_slot(field) {
                *slot = Some(value.clone());
            }
        }
        if row.order_total.is_some() {
            self.order.order_total = row.order_total;
        }
        if row.ordered_at.is_some() {
            self.order.ordered_at = row.ordered_at.clone();
        }
        if row.paid_at.is_some() {
            self.order.paid_at = row.paid_at.clone();
        }
        if row.shipped_on_date.is_some() {
            self.order.shipped_on_date = row.shipped_on_date.clone();
        }

        let line_tax = row.line_tax();
        self.add_meta("shipping_amount", row.shipping_amount);
        self.add_meta("tax_amount", line_tax);
        self.add_meta("discount_amount", row.discount_amount);
        self.add_meta("seller_collected_tax", row.seller_collected_tax);
        self.add_meta("ebay_collected_tax", row.ebay_collected_tax);

        let transaction_id = row
            .transaction_id
            .clone()
            .unwrap_or_else(|| format!("line-{:03}", self.rows_merged));
        let line = OrderLine {
            order_number: self.order.order_number.clone(),
            transaction_id: transaction_id.clone(),
            feed: OrderLineFeedFields {
                item_number: row.item_number.clone(),
                item_title_snapshot: row.item_title.clone().unwrap_or_default(),
                quantity: row.quantity.unwrap_or(1),
                unit_price: row.unit_price,
                tax_amount: line_tax,
                shipping_amount: row.shipping_amount,
                discount_amount: row.discount_amount,
            },
            user: OrderLineUserFields {
                custom_sku: row.custom_sku.clone(),
            },
        };

        match self.line_pos.get(&transaction_id) {
            Some(&pos) => self.lines[pos] = line,
            None => {
                self.line_pos.insert(transaction_id, self.lines.len());
                self.lines.push(line);
            }
        }
    }

    fn text_slot(&mut self, field: &str) -> Option<&mut Option<String>> {
        let o = &mut self.order;
        Some(match field {
            "sales_record_number" => &mut o.sales_record_number,
            "buyer_username" => &mut o.buyer_username,
            "buyer_name" => &mut o.buyer_name,
            "buyer_email" => &mut o.buyer_email,
            "ship_to_name" => &mut o.ship_to_name,
            "ship_to_phone" => &mut o.ship_to_phone,
            "ship_to_address_1" => &mut o.ship_to_address_1,
            "ship_to_address_2" => &mut o.ship_to_address_2,
            "ship_to_city" => &mut o.ship_to_city,
            "ship_to_state" => &mut o.ship_to_state,
            "ship_to_zip" => &mut o.ship_to_zip,
            "ship_to_country" => &mut o.ship_to_country,
            "status" => &mut o.status,
            _ => return None,
        })
    }

    fn add_meta(&mut self, key: &str, value: Option<f64>) {
        if let Some(v) = value {
            let total = self.meta.entry(key.to_string()).or_insert(0.0);
            *total = round_cents(*total + v);
        }
    }

    /// Aggregated meta values, sorted by key.
    pub fn meta(&self) -> &BTreeMap<String, f64> {
        &self.meta
    }

    pub fn lines(&self) -> &[OrderLine] {
        &self.lines
    }

    /// The merged order row with `meta_json` filled in (`None` when no
    /// meta value was seen).
    pub fn to_sales_order(&self) -> Result<SalesOrder, serde_json::Error> {
        let mut order = self.order.clone();
        order.meta_json = if self.meta.is_empty() {
            None
        } else {
            Some(serde_json::to_string(&self.meta)?)
        };
        Ok(order)
    }
}

// ---------------------------------------------------------------------------
// Whole-file batch
// ---------------------------------------------------------------------------

/// Every order, line and shipment sighted in one import run.
#[derive(Debug, Default)]
pub struct OrderBatch {
    orders: Vec<OrderAccumulator>,
    order_pos: HashMap<String, usize>,
    shipments: Vec<(usize, ShipmentRecord)>,
    shipment_pos: HashMap<String, usize>,
}

impl OrderBatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge a parsed row. `row_no` is kept for error reporting.
    pub fn add(&mut self, row: &OrderRow, row_no: usize) {
        let pos = match self.order_pos.get(&row.order_number) {
            Some(&pos) => pos,
            None => {
                self.order_pos.insert(row.order_number.clone(), self.orders.len());
                self.orders.push(OrderAccumulator::new(&row.order_number, row_no));
                self.orders.len() - 1
            }
        };
        self.orders[pos].merge(row);

        if let Some(tracking_number) = &row.tracking_number {
            let shipment = ShipmentRecord {
                tracking_number: tracking_number.clone(),
                order_number: row.order_number.clone(),
                shipping_service: row.shipping_service.clone(),
                label_cost: row.label_cost,
                shipped_on_date: row.shipped_on_date.clone(),
            };
            match self.shipment_pos.get(tracking_number) {
                Some(&pos) => self.shipments[pos] = (row_no, shipment),
                None => {
                    self.shipment_pos.insert(tracking_number.clone(), self.shipments.len());
                    self.shipments.push((row_no, shipment));
                }
            }
        }
    }

    pub fn orders(&self) -> &[OrderAccumulator] {
        &self.orders
    }

    /// Shipments with the row number that last set them.
    pub fn shipments(&self) -> &[(usize, ShipmentRecord)] {
        &self.shipments
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }
}
