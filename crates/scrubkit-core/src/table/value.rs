use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::schema::{parse_canonical_date, LogicalType, CANONICAL_DATE_FORMAT};

/// Bounds of the f64 values that convert to i64 without saturating.
const I64_LOW: f64 = -9_223_372_036_854_775_808.0;
const I64_HIGH: f64 = 9_223_372_036_854_775_808.0;

/// A typed cell value.
///
/// The variant is decided once, when a raw CSV cell is loaded against its
/// column's logical type. A cell that does not parse as its declared type is
/// kept as `Text` holding the raw string, so the Validator can report it and
/// the Cleaner can try to repair it. No stage re-infers types ad hoc.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Missing,
    Integer(i64),
    Decimal(f64),
    Text(String),
    Date(NaiveDate),
}

impl Value {
    /// Type a raw cell for a column of `logical_type`.
    pub fn from_raw(raw: &str, logical_type: LogicalType) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Value::Missing;
        }
        match logical_type {
            LogicalType::Integer => trimmed
                .parse::<i64>()
                .map(Value::Integer)
                .unwrap_or_else(|_| Value::Text(raw.to_string())),
            LogicalType::Decimal => match trimmed.parse::<f64>() {
                Ok(f) if f.is_finite() => Value::Decimal(f),
                _ => Value::Text(raw.to_string()),
            },
            // Only the canonical form is typed here; other renderings are the
            // Cleaner's job so the rewrite shows up in the correction log.
            LogicalType::Date => parse_canonical_date(trimmed)
                .map(Value::Date)
                .unwrap_or_else(|| Value::Text(raw.to_string())),
            LogicalType::String | LogicalType::Categorical => Value::Text(raw.to_string()),
        }
    }

    /// Does the variant conform to the column's logical type?
    pub fn conforms_to(&self, logical_type: LogicalType) -> bool {
        match (self, logical_type) {
            (Value::Missing, _) => true,
            (Value::Integer(_), LogicalType::Integer) => true,
            (Value::Integer(_) | Value::Decimal(_), LogicalType::Decimal) => true,
            (Value::Date(_), LogicalType::Date) => true,
            (Value::Text(_), LogicalType::String | LogicalType::Categorical) => true,
            _ => false,
        }
    }

    /// Convert to a CSV-friendly string.
    pub fn render(&self) -> String {
        match self {
            Value::Missing => String::new(),
            Value::Integer(i) => i.to_string(),
            Value::Decimal(f) => f.to_string(),
            Value::Text(s) => s.clone(),
            Value::Date(d) => d.format(CANONICAL_DATE_FORMAT).to_string(),
        }
    }

    /// Get a string representation for uniqueness tracking.
    ///
    /// Numerics compare by value, so `7` (integer) and `7.0` (decimal) collide.
    pub fn unique_key(&self) -> String {
        match self {
            Value::Missing => "__MISSING__".to_string(),
            Value::Integer(i) => format!("n:{}", i),
            // Whole decimals inside the i64 range share the integer form.
            Value::Decimal(f) if f.fract() == 0.0 && (I64_LOW..I64_HIGH).contains(f) => {
                format!("n:{}", *f as i64)
            }
            Value::Decimal(f) => format!("n:{}", f),
            Value::Text(s) => format!("s:{}", s.trim()),
            Value::Date(d) => format!("d:{}", d),
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Value::Missing)
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Integer(i) => Some(*i as f64),
            Value::Decimal(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Value::Date(d) => Some(*d),
            _ => None,
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Missing => write!(f, "<missing>"),
            other => write!(f, "{}", other.render()),
        }
    }
}
