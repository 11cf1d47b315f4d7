//! # Schema Model
//!
//! Declarative description of the expected table: one [`ColumnSpec`] per
//! column (logical type, nullability, constraints, PII category, canonical
//! case) plus table-scope unique keys. Loaded once per run from
//! `scrubkit.toml` or the built-in customer schema, and immutable afterwards.

pub mod customers;
pub mod types;

use chrono::NaiveDate;

pub use types::{
    CaseStyle, CharClass, ColumnSpec, Constraint, LogicalType, PiiCategory, SchemaModel,
    UniqueKey,
};

/// Canonical rendering every date is normalized to.
pub const CANONICAL_DATE_FORMAT: &str = "%Y-%m-%d";

/// Accepted date input formats, in priority order.
///
/// Month-first wins over day-first: `05/10/1975` is May 10th. The day-first
/// form only applies when the month-first parse fails (day > 12).
pub const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y", "%d/%m/%Y", "%Y/%m/%d", "%m-%d-%Y"];

/// Parse a date against the accepted formats.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(trimmed, fmt).ok())
}

/// Parse only the canonical `YYYY-MM-DD` form.
pub fn parse_canonical_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), CANONICAL_DATE_FORMAT).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_date_formats() {
        let expected = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        assert_eq!(parse_date("2024-01-15"), Some(expected));
        assert_eq!(parse_date("01/15/2024"), Some(expected));
        assert_eq!(parse_date("15/01/2024"), Some(expected));
        assert_eq!(parse_date("2024/01/15"), Some(expected));
        assert_eq!(parse_date("01-15-2024"), Some(expected));
    }

    #[test]
    fn test_parse_date_prefers_month_first() {
        assert_eq!(
            parse_date("05/10/1975"),
            NaiveDate::from_ymd_opt(1975, 5, 10)
        );
    }

    #[test]
    fn test_parse_date_rejects_garbage() {
        assert_eq!(parse_date("invalid_date"), None);
        assert_eq!(parse_date(""), None);
        assert_eq!(parse_date("2024-13-45"), None);
    }

    #[test]
    fn test_canonical_parse_is_strict() {
        assert!(parse_canonical_date("1985-03-15").is_some());
        assert!(parse_canonical_date("03/15/1985").is_none());
    }
}
