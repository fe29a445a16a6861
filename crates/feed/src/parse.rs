//! Permissive cell coercion.
//!
//! Marketplace exports are hand-edited, re-saved by spreadsheets and drift
//! between report versions, so none of these parsers fail: an unparseable
//! number is treated as absent, and an unparseable date is kept verbatim.

use chrono::{NaiveDate, NaiveDateTime};

/// Output shape for every parsed timestamp.
pub const ISO_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Formats tried in order; the first that parses wins.
const DATETIME_FORMATS: &[&str] = &[
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y"];

/// Current UTC time in [`ISO_FORMAT`]. Stamps sync, edit and error rows alike.
pub fn now_timestamp() -> String {
    chrono::Utc::now().format(ISO_FORMAT).to_string()
}

const CURRENCY_SYMBOLS: &[char] = &['$', '€', '£', '¥'];

/// Trim a cell; blank becomes `None`. Never yields `Some("")`.
pub fn clean_str(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Parse a money or plain decimal cell.
///
/// Strips currency symbols, an alphabetic currency prefix (`US $12.00`,
/// `USD 12.00`) and thousands separators. Blank and unparseable input both
/// return `None`; callers that care about the difference check the raw
/// cell themselves (see [`is_invalid_decimal`]).
pub fn parse_decimal(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    let (negative, body) = match trimmed.strip_prefix('-') {
        Some(rest) => (true, rest.trim_start()),
        None => (false, trimmed),
    };

    // Alphabetic prefix only counts as a currency code when a symbol or
    // space follows it; "abc" must stay unparseable.
    let after_code = body.trim_start_matches(|c: char| c.is_ascii_alphabetic());
    let body = if after_code.len() != body.len()
        && after_code.starts_with(|c: char| c.is_whitespace() || CURRENCY_SYMBOLS.contains(&c))
    {
        after_code
    } else {
        body
    };

    let cleaned: String = body
        .chars()
        .filter(|c| !c.is_whitespace() && *c != ',' && !CURRENCY_SYMBOLS.contains(c))
        .collect();

    let value: f64 = cleaned.parse().ok()?;
    if !value.is_finite() {
        return None;
    }
    Some(if negative { -value } else { value })
}

/// Parse an integer cell by way of [`parse_decimal`], so `"5.0"` and
/// `"1,200"` both work. Fractions truncate toward zero.
pub fn parse_int(raw: &str) -> Option<i64> {
    parse_decimal(raw).map(|v| v.trunc() as i64)
}

/// Parse a free-text date/time into `YYYY-MM-DDTHH:MM:SS`.
///
/// Returns `None` only for blank input. When no known format matches, the
/// trimmed original comes back unchanged.
pub fn parse_datetime(raw: &str) -> Option<String> {
    let text = raw.trim();
    if text.is_empty() {
        return None;
    }

    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(text, fmt) {
            return Some(dt.format(ISO_FORMAT).to_string());
        }
    }
    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(text, fmt) {
            if let Some(dt) = d.and_hms_opt(0, 0, 0) {
                return Some(dt.format(ISO_FORMAT).to_string());
            }
        }
    }

    log::debug!("keeping unrecognized date text '{text}'");
    Some(text.to_string())
}

/// True when the cell has content but [`parse_decimal`] rejects it.
pub fn is_invalid_decimal(raw: &str) -> bool {
    !raw.trim().is_empty() && parse_decimal(raw).is_none()
}

/// True when a value produced by [`parse_datetime`] is in canonical form.
pub fn is_iso_datetime(value: &str) -> bool {
    NaiveDateTime::parse_from_str(value, ISO_FORMAT).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn now_timestamp_is_second_precision_utc() {
        let stamp = now_timestamp();
        assert_eq!(stamp.len(), 19);
        assert!(is_iso_datetime(&stamp));
        assert!(!stamp.contains('+'));
        assert!(!stamp.contains('.'));
    }

    #[test]
    fn decimal_strips_symbols_and_separators() {
        assert_eq!(parse_decimal("$1,234.56"), Some(1234.56));
        assert_eq!(parse_decimal("  19.99 "), Some(19.99));
        assert_eq!(parse_decimal("US $12.50"), Some(12.5));
        assert_eq!(parse_decimal("USD 7"), Some(7.0));
        assert_eq!(parse_decimal("-$3.00"), Some(-3.0));
        assert_eq!(parse_decimal("£0.99"), Some(0.99));
    }

    #[test]
    fn decimal_blank_is_absent_not_zero() {
        assert_eq!(parse_decimal(""), None);
        assert_eq!(parse_decimal("   "), None);
    }

    #[test]
    fn decimal_garbage_is_absent() {
        assert_eq!(parse_decimal("abc"), None);
        assert_eq!(parse_decimal("12abc"), None);
        assert_eq!(parse_decimal("NaN"), None);
        assert!(is_invalid_decimal("abc"));
        assert!(!is_invalid_decimal(""));
        assert!(!is_invalid_decimal("1.00"));
    }

    #[test]
    fn int_goes_through_decimal() {
        assert_eq!(parse_int("5.0"), Some(5));
        assert_eq!(parse_int("1,200"), Some(1200));
        assert_eq!(parse_int("2.9"), Some(2));
        assert_eq!(parse_int(""), None);
        assert_eq!(parse_int("many"), None);
    }

    #[test]
    fn datetime_known_formats() {
        assert_eq!(parse_datetime("01/01/2025 10:30").as_deref(), Some("2025-01-01T10:30:00"));
        assert_eq!(parse_datetime("01/05/2025 13:00:15").as_deref(), Some("2025-01-05T13:00:15"));
        assert_eq!(parse_datetime("2025-03-04 08:09:10").as_deref(), Some("2025-03-04T08:09:10"));
        assert_eq!(parse_datetime("2025-03-04").as_deref(), Some("2025-03-04T00:00:00"));
        assert_eq!(parse_datetime("12/31/2025").as_deref(), Some("2025-12-31T00:00:00"));
    }

    #[test]
    fn datetime_iso_is_stable() {
        let once = parse_datetime("01/06/2025").unwrap();
        assert_eq!(parse_datetime(&once).as_deref(), Some(once.as_str()));
    }

    #[test]
    fn datetime_fallback_keeps_text() {
        assert_eq!(parse_datetime("not a date").as_deref(), Some("not a date"));
        assert_eq!(parse_datetime("  Jan 5th  ").as_deref(), Some("Jan 5th"));
        assert_eq!(parse_datetime(""), None);
        assert!(!is_iso_datetime("not a date"));
    }

    #[test]
    fn clean_str_never_empty() {
        assert_eq!(clean_str("  x "), Some("x".to_string()));
        assert_eq!(clean_str(" \t "), None);
    }

    proptest! {
        #[test]
        fn datetime_never_loses_content(s in "\\PC{0,40}") {
            match parse_datetime(&s) {
                None => prop_assert!(s.trim().is_empty()),
                Some(out) => prop_assert!(!out.is_empty()),
            }
        }

        #[test]
        fn decimal_reads_formatted_cents(cents in 0i64..100_000_000) {
            let whole = cents / 100;
            let frac = cents % 100;
            let mut grouped = String::new();
            let digits = whole.to_string();
            for (i, ch) in digits.chars().enumerate() {
                if i > 0 && (digits.len() - i) % 3 == 0 {
                    grouped.push(',');
                }
                grouped.push(ch);
            }
            let text = format!("${grouped}.{frac:02}");
            let parsed = parse_decimal(&text).unwrap();
            prop_assert!((parsed - cents as f64 / 100.0).abs() < 1e-6);
        }
    }
}
