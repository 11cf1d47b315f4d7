//! # Schema Validation
//!
//! Evaluates a [`Table`] against a [`SchemaModel`] and returns every
//! constraint failure as a [`Violation`]. Bad data never makes this fail: a
//! violation is data. The only `Err` is a malformed schema.
//!
//! Violations are ordered by row index, then column declaration order, then
//! constraint declaration order, so two runs over the same input produce
//! byte-identical reports.

pub mod column;
pub mod unique;

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{Result, ScrubKitError};
use crate::schema::SchemaModel;
use crate::table::{Table, Value};

use column::ColumnChecker;
use unique::UniqueTracker;

/// The rule a violation broke.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rule {
    Type,
    Nullability,
    Range,
    Length,
    CharClass,
    Pattern,
    AllowedValues,
    DateParse,
    Plausibility,
    Unique,
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Rule::Type => "type",
            Rule::Nullability => "nullability",
            Rule::Range => "range",
            Rule::Length => "length",
            Rule::CharClass => "char_class",
            Rule::Pattern => "pattern",
            Rule::AllowedValues => "allowed_values",
            Rule::DateParse => "date_parse",
            Rule::Plausibility => "plausibility",
            Rule::Unique => "unique",
        };
        write!(f, "{}", s)
    }
}

/// A single constraint failure tied to one row/column pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Violation {
    pub row_index: usize,
    pub column: String,
    pub rule: Rule,
    pub observed: Value,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub total_rows: usize,
    pub pass_count: usize,
    pub fail_count: usize,
    pub violations: Vec<Violation>,
}

impl ValidationResult {
    pub fn pass_rate(&self) -> f64 {
        if self.total_rows == 0 {
            return 0.0;
        }
        self.pass_count as f64 / self.total_rows as f64 * 100.0
    }

    pub fn is_clean(&self) -> bool {
        self.fail_count == 0
    }

    pub fn violations_for(&self, row: usize) -> impl Iterator<Item = &Violation> {
        self.violations.iter().filter(move |v| v.row_index == row)
    }

    /// Violation counts per rule, in first-seen order.
    pub fn counts_by_rule(&self) -> IndexMap<Rule, usize> {
        let mut counts = IndexMap::new();
        for v in &self.violations {
            *counts.entry(v.rule).or_insert(0) += 1;
        }
        counts
    }
}

/// Validate every record of `table` against `schema`.
pub fn validate(table: &Table, schema: &SchemaModel) -> Result<ValidationResult> {
    schema.check()?;

    for column in table.columns() {
        schema.require_column(column, "input table")?;
    }

    let checkers = schema
        .columns
        .values()
        .map(ColumnChecker::compile)
        .collect::<Result<Vec<_>>>()?;

    // Each key reports against its earliest-declared column.
    let keys: Vec<(usize, &[String])> = schema
        .unique_keys
        .iter()
        .map(|key| {
            let anchor = key
                .columns
                .iter()
                .filter_map(|c| schema.position(c))
                .min()
                .ok_or_else(|| ScrubKitError::Config {
                    message: "unique key with no declared columns".to_string(),
                })?;
            Ok((anchor, key.columns.as_slice()))
        })
        .collect::<Result<Vec<_>>>()?;

    let mut tracker = UniqueTracker::new();
    for (_, columns) in &keys {
        tracker.register_constraint(columns);
    }

    let as_of = schema.reference_date();
    let mut violations = Vec::new();
    let mut fail_count = 0;

    for (row_index, record) in table.rows().iter().enumerate() {
        let mut row_violations: Vec<(usize, Violation)> = Vec::new();

        for (position, checker) in checkers.iter().enumerate() {
            let name = checker.spec.name.as_str();
            let value = record.get(name).unwrap_or(&Value::Missing);
            for (rule, reason) in checker.check(value, as_of) {
                row_violations.push((
                    position,
                    Violation {
                        row_index,
                        column: name.to_string(),
                        rule,
                        observed: value.clone(),
                        reason,
                    },
                ));
            }
        }

        for (anchor, columns) in &keys {
            let values: Vec<&Value> = columns
                .iter()
                .map(|c| record.get(c).unwrap_or(&Value::Missing))
                .collect();
            if let Some(first) = tracker.observe(columns, &values, row_index) {
                let anchor_name = schema
                    .columns
                    .get_index(*anchor)
                    .map(|(name, _)| name.clone())
                    .unwrap_or_default();
                let observed = record.get(&anchor_name).cloned().unwrap_or(Value::Missing);
                row_violations.push((
                    *anchor,
                    Violation {
                        row_index,
                        column: anchor_name,
                        rule: Rule::Unique,
                        observed,
                        reason: format!(
                            "duplicate of row {} on key ({})",
                            first,
                            columns.join(", ")
                        ),
                    },
                ));
            }
        }

        if !row_violations.is_empty() {
            fail_count += 1;
            // Stable: keeps constraint order within a column.
            row_violations.sort_by_key(|(position, _)| *position);
            violations.extend(row_violations.into_iter().map(|(_, v)| v));
        }
    }

    let result = ValidationResult {
        total_rows: table.len(),
        pass_count: table.len() - fail_count,
        fail_count,
        violations,
    };

    tracing::info!(
        rows = result.total_rows,
        passed = result.pass_count,
        failed = result.fail_count,
        violations = result.violations.len(),
        "validation complete"
    );

    Ok(result)
}
