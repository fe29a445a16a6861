//! Vendor header spellings → canonical field names.

use std::collections::BTreeMap;

use csv::StringRecord;

use crate::classify::ReportKind;
use crate::mappings::FieldMapping;

// ---------------------------------------------------------------------------
// Static alias tables (keys are normalized headers)
// ---------------------------------------------------------------------------

const LISTING_ALIASES: &[(&str, &str)] = &[
    ("item_id", "item_number"),
    ("itemid", "item_number"),
    ("item_number", "item_number"),
    ("title", "title"),
    ("item_title", "title"),
    ("custom_label", "custom_sku"),
    ("custom_label_sku", "custom_sku"),
    ("sku", "custom_sku"),
    ("custom_sku", "custom_sku"),
    ("current_price", "current_price"),
    ("price", "current_price"),
    ("start_price", "current_price"),
    ("available_quantity", "available_quantity"),
    ("quantity", "available_quantity"),
    ("quantity_available", "available_quantity"),
    ("ebay_category_1_name", "ebay_category1_name"),
    ("ebay_category1_name", "ebay_category1_name"),
    ("category_name", "ebay_category1_name"),
    ("ebay_category_1_number", "ebay_category1_number"),
    ("ebay_category1_number", "ebay_category1_number"),
    ("category_number", "ebay_category1_number"),
    ("category_id", "ebay_category1_number"),
    ("condition", "condition"),
    ("listing_site", "listing_site"),
    ("site", "listing_site"),
    ("start_date", "start_date"),
    ("start_time", "start_date"),
    ("end_date", "end_date"),
    ("end_time", "end_date"),
    ("status", "status"),
];

const ORDER_ALIASES: &[(&str, &str)] = &[
    ("order_number", "order_number"),
    ("order_id", "order_number"),
    ("sales_record_number", "sales_record_number"),
    ("salesrecordnumber", "sales_record_number"),
    ("buyer_username", "buyer_username"),
    ("buyer_user_id", "buyer_username"),
    ("buyerid", "buyer_username"),
    ("buyer_name", "buyer_name"),
    ("buyer_fullname", "buyer_name"),
    ("buyer_email", "buyer_email"),
    ("email", "buyer_email"),
    ("ship_to_name", "ship_to_name"),
    ("shipping_name", "ship_to_name"),
    ("ship_to_phone", "ship_to_phone"),
    ("buyer_phone", "ship_to_phone"),
    ("ship_to_address_1", "ship_to_address_1"),
    ("ship_to_address_2", "ship_to_address_2"),
    ("ship_to_city", "ship_to_city"),
    ("ship_to_state", "ship_to_state"),
    ("ship_to_zip", "ship_to_zip"),
    ("ship_to_postal_code", "ship_to_zip"),
    ("ship_to_country", "ship_to_country"),
    ("order_total", "order_total"),
    ("order_amount", "order_total"),
    ("total_amount", "order_total"),
    ("order_date", "ordered_at"),
    ("sale_date", "ordered_at"),
    ("sold_date", "ordered_at"),
    ("sold_on", "ordered_at"),
    ("paid_on_date", "paid_at"),
    ("paid_date", "paid_at"),
    ("paid_on", "paid_at"),
    ("shipped_on_date", "shipped_on_date"),
    ("ship_date", "shipped_on_date"),
    ("status", "status"),
    ("order_status", "status"),
    ("transaction_id", "transaction_id"),
    ("item_id", "item_number"),
    ("item_number", "item_number"),
    ("listing_id", "item_number"),
    ("item_title", "item_title"),
    ("title", "item_title"),
    ("custom_label", "custom_sku"),
    ("custom_label_sku", "custom_sku"),
    ("sku", "custom_sku"),
    ("quantity", "quantity"),
    ("qty", "quantity"),
    ("sold_for", "unit_price"),
    ("sale_price", "unit_price"),
    ("total_price", "unit_price"),
    ("item_total", "unit_price"),
    ("price", "unit_price"),
    ("item_price", "unit_price"),
    ("tax", "tax_amount"),
    ("tax_amount", "tax_amount"),
    ("seller_collected_tax", "seller_collected_tax"),
    ("ebay_collected_tax", "ebay_collected_tax"),
    ("shipping_and_handling", "shipping_amount"),
    ("shipping", "shipping_amount"),
    ("shipping_amount", "shipping_amount"),
    ("shipping_price", "shipping_amount"),
    ("discount", "discount_amount"),
    ("discount_amount", "discount_amount"),
    ("promotion_discount", "discount_amount"),
    ("shipping_service", "shipping_service"),
    ("service", "shipping_service"),
    ("carrier", "shipping_service"),
    ("tracking_number", "tracking_number"),
    ("tracking_id", "tracking_number"),
    ("tracking", "tracking_number"),
    ("label_cost", "label_cost"),
    ("postage", "label_cost"),
];

// ---------------------------------------------------------------------------
// Normalization
// ---------------------------------------------------------------------------

/// Lowercase, collapse every run of non-alphanumerics to `_`, trim `_`.
///
/// `"Custom label (SKU)"` → `"custom_label_sku"`.
pub fn normalize_header(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut pending_sep = false;
    for ch in raw.trim().trim_start_matches('\u{feff}').chars() {
        if ch.is_ascii_alphanumeric() {
            if pending_sep && !out.is_empty() {
                out.push('_');
            }
            pending_sep = false;
            out.push(ch.to_ascii_lowercase());
        } else {
            pending_sep = true;
        }
    }
    out
}

fn aliases(kind: ReportKind) -> &'static [(&'static str, &'static str)] {
    match kind {
        ReportKind::ActiveListings => LISTING_ALIASES,
        ReportKind::Orders => ORDER_ALIASES,
        ReportKind::Unknown => &[],
    }
}

/// Canonical field for a raw header under a report kind, or the
/// normalized header itself when no alias exists.
pub fn canonical_field(kind: ReportKind, raw: &str) -> String {
    let normalized = normalize_header(raw);
    aliases(kind)
        .iter()
        .find(|(alias, _)| *alias == normalized)
        .map(|(_, canonical)| (*canonical).to_string())
        .unwrap_or(normalized)
}

// ---------------------------------------------------------------------------
// Resolved header index
// ---------------------------------------------------------------------------

/// Column positions for each canonical field, in priority order.
///
/// A field can be fed by several columns (e.g. both "Current price" and
/// "Start price"); [`HeaderIndex::get`] returns the first non-blank one.
#[derive(Debug, Clone)]
pub struct HeaderIndex {
    headers: Vec<String>,
    columns: BTreeMap<String, Vec<usize>>,
}

impl HeaderIndex {
    /// Resolve with the static alias table only.
    pub fn resolve(headers: &[String], kind: ReportKind) -> Self {
        Self::resolve_with(headers, kind, &FieldMapping::new())
    }

    /// Resolve with user mapping overrides taking priority.
    ///
    /// Each mapping value is a `|`-separated candidate list. Candidates are
    /// matched exactly first, then by normalized form. Columns claimed by a
    /// mapping are not re-resolved through the alias table; every other
    /// column is appended after the mapped ones.
    pub fn resolve_with(headers: &[String], kind: ReportKind, mapping: &FieldMapping) -> Self {
        let headers: Vec<String> = headers
            .iter()
            .map(|h| h.trim().trim_start_matches('\u{feff}').to_string())
            .collect();
        let mut claimed = vec![false; headers.len()];
        let mut columns: BTreeMap<String, Vec<usize>> = BTreeMap::new();

        for (field, candidates) in mapping {
            for candidate in candidates.split('|').map(str::trim).filter(|c| !c.is_empty()) {
                let exact = (0..headers.len()).find(|&i| !claimed[i] && headers[i] == candidate);
                let found = exact.or_else(|| {
                    let wanted = normalize_header(candidate);
                    (0..headers.len())
                        .find(|&i| !claimed[i] && normalize_header(&headers[i]) == wanted)
                });
                if let Some(i) = found {
                    claimed[i] = true;
                    columns.entry(field.clone()).or_default().push(i);
                }
            }
        }

        for (i, header) in headers.iter().enumerate() {
            if claimed[i] || header.is_empty() {
                continue;
            }
            columns.entry(canonical_field(kind, header)).or_default().push(i);
        }

        Self { headers, columns }
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn has(&self, field: &str) -> bool {
        self.columns.contains_key(field)
    }

    /// Canonical field names present, sorted.
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(String::as_str)
    }

    /// First non-blank cell for `field`, trimmed.
    pub fn get<'r>(&self, record: &'r StringRecord, field: &str) -> Option<&'r str> {
        self.columns
            .get(field)?
            .iter()
            .filter_map(|&i| record.get(i))
            .map(str::trim)
            .find(|v| !v.is_empty())
    }

    /// Like [`get`](Self::get) but blank when absent.
    pub fn cell<'r>(&self, record: &'r StringRecord, field: &str) -> &'r str {
        self.get(record, field).unwrap_or("")
    }
}
