//! # Masking
//!
//! Produces an analytics-safe copy of a cleaned table. Every value in a
//! PII-declared column goes through its category's rule; every other column
//! is copied bit-for-bit. Rules are one-way and shape-preserving, and never
//! fail: a value a rule cannot interpret falls back to the category sentinel.

use serde::{Deserialize, Serialize};

use crate::pii::detectors::replace_embedded_emails;
use crate::pii::{detect, MatchKind, PiiResult};
use crate::schema::{parse_date, PiiCategory};
use crate::table::{Record, Table, Value};

pub const ADDRESS_SENTINEL: &str = "[MASKED ADDRESS]";
pub const EMAIL_SENTINEL: &str = "***@***";
pub const PHONE_SENTINEL: &str = "***-***-****";
pub const DOB_SENTINEL: &str = "****-**-**";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaskedTable {
    pub table: Table,
    /// Number of values rewritten.
    pub masked_values: usize,
    /// Columns the masking rules applied to, in table order.
    pub masked_columns: Vec<String>,
}

/// Mask every PII column of `table` using the category map in `pii`.
pub fn mask(table: &Table, pii: &PiiResult) -> MaskedTable {
    let masked_columns: Vec<String> = table
        .columns()
        .iter()
        .filter(|c| pii.category_of(c).is_some())
        .cloned()
        .collect();

    let mut out = Table::new(table.columns().to_vec());
    let mut masked_values = 0;

    for record in table.rows() {
        let mut masked = Record::with_capacity(record.len());
        for (column, value) in record {
            let next = match pii.category_of(column) {
                Some(category) if !value.is_missing() => {
                    masked_values += 1;
                    Value::Text(mask_value(category, value))
                }
                _ => value.clone(),
            };
            masked.insert(column.clone(), next);
        }
        out.push(masked);
    }

    tracing::info!(
        rows = out.len(),
        values = masked_values,
        columns = masked_columns.len(),
        "masking complete"
    );

    MaskedTable {
        table: out,
        masked_values,
        masked_columns,
    }
}

/// Apply `category`'s masking rule to a non-missing value.
pub fn mask_value(category: PiiCategory, value: &Value) -> String {
    let text = value.render();
    match category {
        PiiCategory::Name => mask_name(&text),
        PiiCategory::Email => match detect(PiiCategory::Email, value) {
            // Free text around an embedded address is kept; only the address is masked.
            Some(MatchKind::Substring(_)) => replace_embedded_emails(&text, mask_email),
            _ => mask_email(&text),
        },
        PiiCategory::Phone => mask_phone(&text),
        PiiCategory::Address => ADDRESS_SENTINEL.to_string(),
        PiiCategory::DateOfBirth => mask_dob(value),
    }
}

/// `John` → `J***`; every whitespace-separated part is masked on its own.
pub fn mask_name(name: &str) -> String {
    let parts: Vec<String> = name
        .split_whitespace()
        .map(|part| {
            let mut chars = part.chars();
            match (chars.next(), chars.next()) {
                (Some(first), Some(_)) => format!("{}***", first),
                _ => "*".to_string(),
            }
        })
        .collect();
    if parts.is_empty() {
        return "*".to_string();
    }
    parts.join(" ")
}

/// `john.doe@gmail.com` → `j***@gmail.com`. Splits on the last `@`, so the
/// output always carries exactly one.
pub fn mask_email(email: &str) -> String {
    let email = email.trim();
    let Some((local, domain)) = email.rsplit_once('@') else {
        return EMAIL_SENTINEL.to_string();
    };
    let domain = if domain.is_empty() { "***" } else { domain };
    match local.chars().next() {
        Some(first) if first != '@' => format!("{}***@{}", first, domain),
        _ => format!("***@{}", domain),
    }
}

/// Keep the last four digits; earlier digits become `*`, separators stay.
pub fn mask_phone(phone: &str) -> String {
    let total = phone.chars().filter(|c| c.is_ascii_digit()).count();
    if total == 0 {
        return PHONE_SENTINEL.to_string();
    }
    let keep_from = total.saturating_sub(4);
    let mut seen = 0;
    phone
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_digit() {
                seen += 1;
                if seen > keep_from {
                    c
                } else {
                    '*'
                }
            } else {
                c
            }
        })
        .collect()
}

/// `1985-03-15` → `1985-**-**`.
pub fn mask_dob(value: &Value) -> String {
    let date = match value {
        Value::Date(d) => Some(*d),
        other => parse_date(&other.render()),
    };
    match date {
        Some(d) => format!("{}-**-**", d.format("%Y")),
        None => DOB_SENTINEL.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pii::classify_pii;
    use crate::schema::customers::customer_schema;
    use chrono::NaiveDate;

    #[test]
    fn test_mask_name() {
        assert_eq!(mask_name("John"), "J***");
        assert_eq!(mask_name("Mary Ann"), "M*** A***");
        assert_eq!(mask_name("J"), "*");
        assert_eq!(mask_name("   "), "*");
    }

    #[test]
    fn test_mask_email() {
        assert_eq!(mask_email("john.doe@gmail.com"), "j***@gmail.com");
        assert_eq!(mask_email("a@b.co"), "a***@b.co");
        assert_eq!(mask_email("no-at-sign"), EMAIL_SENTINEL);
        assert_eq!(mask_email("odd@name@example.com"), "o***@example.com");
        assert_eq!(mask_email("@example.com"), "***@example.com");
        for raw in ["x@y@z", "@", "a@", "plain"] {
            assert_eq!(
                mask_email(raw).matches('@').count(),
                1,
                "'{}' must mask to exactly one @",
                raw
            );
        }
    }

    #[test]
    fn test_embedded_email_masks_only_the_address() {
        let value = Value::Text("contact: bob@example.com please".into());
        assert_eq!(
            mask_value(PiiCategory::Email, &value),
            "contact: b***@example.com please"
        );
        let plain = Value::Text("bob@example.com".into());
        assert_eq!(mask_value(PiiCategory::Email, &plain), "b***@example.com");
    }

    #[test]
    fn test_mask_phone() {
        assert_eq!(mask_phone("555-234-5678"), "***-***-5678");
        assert_eq!(mask_phone("(555) 234-5678"), "(***) ***-5678");
        assert_eq!(mask_phone("555-1234"), "***-1234");
        assert_eq!(mask_phone("12"), "12");
        assert_eq!(mask_phone("n/a"), PHONE_SENTINEL);
    }

    #[test]
    fn test_mask_dob() {
        let d = Value::Date(NaiveDate::from_ymd_opt(1985, 3, 15).unwrap());
        assert_eq!(mask_dob(&d), "1985-**-**");
        assert_eq!(mask_dob(&Value::Text("05/10/1975".into())), "1975-**-**");
        assert_eq!(mask_dob(&Value::Text("invalid_date".into())), DOB_SENTINEL);
    }

    #[test]
    fn test_mask_preserves_shape_and_business_fields() {
        let schema = customer_schema();
        let mut table = Table::for_schema(&schema);
        let mut record = Record::new();
        record.insert("customer_id".into(), Value::Integer(3));
        record.insert("first_name".into(), Value::Text("Unknown".into()));
        record.insert("last_name".into(), Value::Text("Johnson".into()));
        record.insert("email".into(), Value::Text("bob@example.com".into()));
        record.insert("phone".into(), Value::Text("555-234-5678".into()));
        record.insert(
            "date_of_birth".into(),
            Value::Date(NaiveDate::from_ymd_opt(1988, 11, 8).unwrap()),
        );
        record.insert("address".into(), Value::Missing);
        record.insert("income".into(), Value::Decimal(0.0));
        record.insert("account_status".into(), Value::Text("suspended".into()));
        record.insert(
            "created_date".into(),
            Value::Date(NaiveDate::from_ymd_opt(2024, 1, 12).unwrap()),
        );
        table.push(record);

        let pii = classify_pii(&table, &schema);
        let masked = mask(&table, &pii);
        let t = &masked.table;

        assert_eq!(t.len(), table.len());
        assert_eq!(t.column_count(), table.column_count());
        assert_eq!(t.get(0, "phone"), Some(&Value::Text("***-***-5678".into())));
        assert_eq!(t.get(0, "email"), Some(&Value::Text("b***@example.com".into())));
        assert_eq!(t.get(0, "first_name"), Some(&Value::Text("U***".into())));
        assert_eq!(t.get(0, "date_of_birth"), Some(&Value::Text("1988-**-**".into())));
        assert_eq!(t.get(0, "address"), Some(&Value::Missing), "missing stays missing");
        for business in ["customer_id", "income", "account_status", "created_date"] {
            assert_eq!(
                t.get(0, business),
                table.get(0, business),
                "{} must pass through unchanged",
                business
            );
        }
        assert_eq!(masked.masked_values, 5);
        assert_eq!(masked.masked_columns.len(), 6);
    }
}
