use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::header::HeaderIndex;
use crate::mappings::FieldMapping;

/// Which marketplace report a CSV file is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportKind {
    ActiveListings,
    Orders,
    Unknown,
}

impl ReportKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ActiveListings => "active_listings",
            Self::Orders => "orders",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ReportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReportKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "active_listings" | "listings" | "inventory" => Ok(Self::ActiveListings),
            "orders" | "completed_orders" | "sold" => Ok(Self::Orders),
            other => Err(format!("unknown report type '{other}'")),
        }
    }
}

/// Fields that must all resolve for a header row to count as an orders report.
const ORDER_SIGNATURE: &[&str] = &["order_number", "item_title", "unit_price"];

/// Fields that must all resolve for a header row to count as a listings snapshot.
const LISTING_SIGNATURE: &[&str] = &["item_number", "custom_sku"];

/// Detect the report type from a header row using the built-in aliases.
pub fn classify_headers(headers: &[String]) -> ReportKind {
    classify_with(headers, &FieldMapping::new(), &FieldMapping::new())
}

/// Detect the report type, honoring per-report mapping overrides.
///
/// Orders are tested first: an orders export also carries an item number
/// and a SKU, so the listings signature alone would misfire on it.
pub fn classify_with(
    headers: &[String],
    listings_mapping: &FieldMapping,
    orders_mapping: &FieldMapping,
) -> ReportKind {
    let orders = HeaderIndex::resolve_with(headers, ReportKind::Orders, orders_mapping);
    if ORDER_SIGNATURE.iter().all(|f| orders.has(f)) {
        return ReportKind::Orders;
    }

    let listings = HeaderIndex::resolve_with(headers, ReportKind::ActiveListings, listings_mapping);
    if LISTING_SIGNATURE.iter().all(|f| listings.has(f)) {
        return ReportKind::ActiveListings;
    }

    ReportKind::Unknown
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn listings_signature() {
        let h = headers(&["Item Number", "Title", "Custom label (SKU)"]);
        assert_eq!(classify_headers(&h), ReportKind::ActiveListings);
    }

    #[test]
    fn orders_signature() {
        let h = headers(&["Order Number", "Item Title", "Sold For"]);
        assert_eq!(classify_headers(&h), ReportKind::Orders);
    }

    #[test]
    fn full_orders_export_is_not_mistaken_for_listings() {
        let h = headers(&[
            "Order Number",
            "Item Number",
            "Item Title",
            "Custom Label (SKU)",
            "Quantity",
            "Sold For",
        ]);
        assert_eq!(classify_headers(&h), ReportKind::Orders);
    }

    #[test]
    fn neither_is_unknown() {
        let h = headers(&["Date", "Description", "Amount"]);
        assert_eq!(classify_headers(&h), ReportKind::Unknown);
        let h = headers(&["Item Number", "Title"]);
        assert_eq!(classify_headers(&h), ReportKind::Unknown);
    }

    #[test]
    fn mapping_override_can_complete_a_signature() {
        let h = headers(&["Listing", "Seller Ref"]);
        assert_eq!(classify_headers(&h), ReportKind::Unknown);

        let mut listings = FieldMapping::new();
        listings.insert("item_number".into(), "Listing".into());
        listings.insert("custom_sku".into(), "Seller Ref".into());
        assert_eq!(classify_with(&h, &listings, &FieldMapping::new()), ReportKind::ActiveListings);
    }

    #[test]
    fn parse_kind_names() {
        assert_eq!("active-listings".parse::<ReportKind>(), Ok(ReportKind::ActiveListings));
        assert_eq!("Orders".parse::<ReportKind>(), Ok(ReportKind::Orders));
        assert!("expenses".parse::<ReportKind>().is_err());
        assert_eq!(ReportKind::ActiveListings.to_string(), "active_listings");
    }
}
