//! # Profiling
//!
//! Summarizes the raw table before anything touches it: completeness,
//! cardinality, type conformance and how many values the Cleaner would
//! rewrite, per column.

use std::collections::HashMap;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::clean::canonical_phone;
use crate::schema::{parse_date, ColumnSpec, LogicalType, PiiCategory, SchemaModel};
use crate::table::{Table, Value};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnProfile {
    pub name: String,
    pub logical_type: LogicalType,
    pub non_missing: usize,
    /// Non-missing share of rows, 0–100.
    pub completeness: f64,
    pub distinct: usize,
    /// Non-missing values minus distinct values.
    pub duplicates: usize,
    /// Values already typed as the column's logical type.
    pub conforming: usize,
    /// Values the Cleaner would rewrite into canonical form.
    pub non_canonical: usize,
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl ColumnProfile {
    pub fn missing(&self, total_rows: usize) -> usize {
        total_rows - self.non_missing
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableProfile {
    pub row_count: usize,
    pub column_count: usize,
    pub columns: IndexMap<String, ColumnProfile>,
}

impl TableProfile {
    pub fn column(&self, name: &str) -> Option<&ColumnProfile> {
        self.columns.get(name)
    }

    /// Total values that deviate from canonical form, across columns.
    pub fn non_canonical_total(&self) -> usize {
        self.columns.values().map(|c| c.non_canonical).sum()
    }
}

/// Profile every column of `table`. Columns the schema does not declare are
/// profiled as strings.
pub fn profile(table: &Table, schema: &SchemaModel) -> TableProfile {
    let row_count = table.len();
    let mut columns = IndexMap::new();

    for name in table.columns() {
        let fallback;
        let spec = match schema.column(name) {
            Some(spec) => spec,
            None => {
                fallback = ColumnSpec::new(name.clone(), LogicalType::String);
                &fallback
            }
        };
        columns.insert(name.clone(), profile_column(table, spec, row_count));
    }

    let profile = TableProfile {
        row_count,
        column_count: table.column_count(),
        columns,
    };
    tracing::info!(
        rows = profile.row_count,
        columns = profile.column_count,
        non_canonical = profile.non_canonical_total(),
        "profiling complete"
    );
    profile
}

fn profile_column(table: &Table, spec: &ColumnSpec, row_count: usize) -> ColumnProfile {
    let mut non_missing = 0;
    let mut conforming = 0;
    let mut non_canonical = 0;
    let mut counts: HashMap<String, usize> = HashMap::new();
    let mut min: Option<f64> = None;
    let mut max: Option<f64> = None;

    for value in table.column_values(&spec.name) {
        if value.is_missing() {
            continue;
        }
        non_missing += 1;
        *counts.entry(value.unique_key()).or_insert(0) += 1;

        if value.conforms_to(spec.logical_type) {
            conforming += 1;
        }
        if let Some(n) = value.as_f64() {
            min = Some(min.map_or(n, |m| m.min(n)));
            max = Some(max.map_or(n, |m| m.max(n)));
        }
        if is_non_canonical(spec, value) {
            non_canonical += 1;
        }
    }

    let distinct = counts.len();
    ColumnProfile {
        name: spec.name.clone(),
        logical_type: spec.logical_type,
        non_missing,
        completeness: if row_count == 0 {
            0.0
        } else {
            non_missing as f64 / row_count as f64 * 100.0
        },
        distinct,
        duplicates: non_missing - distinct,
        conforming,
        non_canonical,
        min,
        max,
    }
}

/// Would a normalization rule rewrite this value?
fn is_non_canonical(spec: &ColumnSpec, value: &Value) -> bool {
    let Value::Text(raw) = value else {
        return false;
    };
    let text = raw.trim();
    if text != raw {
        return true;
    }
    match spec.logical_type {
        LogicalType::Date => parse_date(text).is_some(),
        LogicalType::Integer | LogicalType::Decimal => false,
        LogicalType::String | LogicalType::Categorical => {
            let phone = spec.pii == Some(PiiCategory::Phone)
                && canonical_phone(text).is_some_and(|p| p != text);
            let case = spec.case.is_some_and(|style| style.apply(text) != text);
            phone || case
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::customers::customer_schema;

    fn sample() -> Table {
        let schema = customer_schema();
        let header: Vec<String> = schema.column_names().map(str::to_string).collect();
        let rows = vec![
            vec![
                "1",
                "John",
                "Doe",
                "john@example.com",
                "555-123-4567",
                "1985-03-15",
                "123 Main St",
                "75000",
                "active",
                "2024-01-10",
            ],
            vec![
                "2",
                "jane",
                "Smith",
                "jane@example.com",
                "555.987.6543",
                "1990-07-22",
                "456 Oak Ave",
                "95000",
                "active",
                "2024-01-11",
            ],
            vec![
                "2",
                "",
                "Johnson",
                "bob@example.com",
                "(555) 234-5678",
                "05/10/1975",
                "",
                "",
                "suspended",
                "2024-01-12",
            ],
        ];
        let rows = rows
            .into_iter()
            .map(|r| r.into_iter().map(str::to_string).collect())
            .collect();
        Table::from_raw_rows(&schema, &header, rows, 2).unwrap()
    }

    #[test]
    fn test_completeness_and_duplicates() {
        let p = profile(&sample(), &customer_schema());
        assert_eq!(p.row_count, 3);
        assert_eq!(p.column_count, 10);

        let first = p.column("first_name").unwrap();
        assert_eq!(first.non_missing, 2);
        assert!((first.completeness - 200.0 / 3.0).abs() < 1e-9);
        assert_eq!(first.missing(p.row_count), 1);

        let id = p.column("customer_id").unwrap();
        assert_eq!(id.distinct, 2);
        assert_eq!(id.duplicates, 1);
    }

    #[test]
    fn test_non_canonical_counts() {
        let p = profile(&sample(), &customer_schema());
        assert_eq!(p.column("phone").unwrap().non_canonical, 2);
        assert_eq!(p.column("first_name").unwrap().non_canonical, 1);
        assert_eq!(p.column("date_of_birth").unwrap().non_canonical, 1);
        assert_eq!(p.column("date_of_birth").unwrap().conforming, 2);
        assert_eq!(p.non_canonical_total(), 4);
    }

    #[test]
    fn test_numeric_min_max() {
        let p = profile(&sample(), &customer_schema());
        let income = p.column("income").unwrap();
        assert_eq!(income.min, Some(75000.0));
        assert_eq!(income.max, Some(95000.0));
        assert_eq!(p.column("email").unwrap().min, None);
    }

    #[test]
    fn test_empty_table() {
        let schema = customer_schema();
        let p = profile(&Table::for_schema(&schema), &schema);
        assert_eq!(p.row_count, 0);
        assert!(p.columns.values().all(|c| c.completeness == 0.0));
    }
}
