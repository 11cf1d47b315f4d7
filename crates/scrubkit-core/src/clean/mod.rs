//! # Cleaning
//!
//! Repairs format violations and applies the missing-value policy, producing
//! a new [`Table`] and an audit log of every action. Normalization rules are
//! deterministic and column-local, and every rule's output already satisfies
//! its own precondition, so cleaning a cleaned table changes nothing.
//!
//! Values that cannot be repaired (an unparseable date, a non-numeric income)
//! are left in place and logged as `Unresolved`; the re-validation pass still
//! reports them. The same goes for a key repair that would duplicate another
//! row's key.

pub mod policy;

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::schema::{parse_date, ColumnSpec, LogicalType, PiiCategory, SchemaModel};
use crate::table::{Record, Table, Value};
use crate::validate::{validate, ValidationResult};

pub use policy::{MissingPolicies, MissingPolicy};

/// The normalization step an audit entry came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CleanRule {
    Trim,
    PhoneFormat,
    DateFormat,
    Numeric,
    Case,
    MissingValue,
}

impl fmt::Display for CleanRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CleanRule::Trim => "trim",
            CleanRule::PhoneFormat => "phone_format",
            CleanRule::DateFormat => "date_format",
            CleanRule::Numeric => "numeric",
            CleanRule::Case => "case",
            CleanRule::MissingValue => "missing_value",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// The value was rewritten or filled.
    Applied,
    /// The record was removed by a `drop` policy.
    Dropped,
    /// A missing value was left missing under a `flag` policy.
    Flagged,
    /// The value could not be repaired and was left as is.
    Unresolved,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Outcome::Applied => "applied",
            Outcome::Dropped => "dropped",
            Outcome::Flagged => "flagged",
            Outcome::Unresolved => "unresolved",
        };
        write!(f, "{}", s)
    }
}

/// One audit entry. `row_index` refers to the input table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Correction {
    pub row_index: usize,
    pub column: String,
    pub original: Value,
    pub new: Value,
    pub rule: CleanRule,
    pub outcome: Outcome,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CleanResult {
    pub table: Table,
    /// Repairs that changed the data: rewrites, fills and drops.
    pub corrections: Vec<Correction>,
    /// Flagged missing values and unrepairable values, left untouched.
    pub unresolved: Vec<Correction>,
    pub rows_dropped: usize,
}

impl CleanResult {
    /// Every audit entry, ordered by row then column.
    pub fn log(&self) -> Vec<&Correction> {
        let position = |c: &Correction| {
            self.table
                .columns()
                .iter()
                .position(|col| *col == c.column)
                .unwrap_or(usize::MAX)
        };
        let mut entries: Vec<&Correction> =
            self.corrections.iter().chain(self.unresolved.iter()).collect();
        entries.sort_by_key(|c| (c.row_index, position(c)));
        entries
    }

    /// Applied corrections per rule, for summaries.
    pub fn counts_by_rule(&self) -> indexmap::IndexMap<CleanRule, usize> {
        let mut counts = indexmap::IndexMap::new();
        for c in &self.corrections {
            *counts.entry(c.rule).or_insert(0) += 1;
        }
        counts
    }
}

/// Failing-row counts before and after cleaning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Convergence {
    pub before: usize,
    pub after: usize,
}

impl Convergence {
    pub fn between(before: &ValidationResult, after: &ValidationResult) -> Self {
        Self {
            before: before.fail_count,
            after: after.fail_count,
        }
    }

    pub fn converged(&self) -> bool {
        self.after <= self.before
    }
}

/// Clean `table` against `schema` under `policies`.
pub fn clean(
    table: &Table,
    schema: &SchemaModel,
    policies: &MissingPolicies,
) -> Result<CleanResult> {
    schema.check()?;
    policies.check(schema)?;
    for column in table.columns() {
        schema.require_column(column, "input table")?;
    }

    let mut pending = Vec::with_capacity(table.len());
    for (row_index, record) in table.rows().iter().enumerate() {
        pending.push(clean_record(row_index, record, schema, policies));
    }
    guard_unique_keys(table, schema, &mut pending);

    let mut cleaned = Table::new(table.columns().to_vec());
    let mut corrections = Vec::new();
    let mut unresolved = Vec::new();
    let mut rows_dropped = 0;

    for row in pending {
        match row.record {
            Some(record) => cleaned.push(record),
            None => rows_dropped += 1,
        }

        for c in row.log {
            match c.outcome {
                Outcome::Applied | Outcome::Dropped => {
                    tracing::debug!(
                        row = c.row_index,
                        column = %c.column,
                        rule = %c.rule,
                        "{} -> {}",
                        c.original,
                        c.new
                    );
                    corrections.push(c);
                }
                Outcome::Unresolved => {
                    tracing::warn!(
                        row = c.row_index,
                        column = %c.column,
                        rule = %c.rule,
                        "could not repair '{}'",
                        c.original
                    );
                    unresolved.push(c);
                }
                Outcome::Flagged => unresolved.push(c),
            }
        }
    }

    tracing::info!(
        rows_in = table.len(),
        rows_out = cleaned.len(),
        dropped = rows_dropped,
        corrections = corrections.len(),
        unresolved = unresolved.len(),
        "cleaning complete"
    );

    Ok(CleanResult {
        table: cleaned,
        corrections,
        unresolved,
        rows_dropped,
    })
}

/// Clean, then re-validate to confirm the failing-row count did not grow.
pub fn clean_verified(
    table: &Table,
    schema: &SchemaModel,
    policies: &MissingPolicies,
) -> Result<(CleanResult, Convergence)> {
    let before = validate(table, schema)?;
    let result = clean(table, schema, policies)?;
    let after = validate(&result.table, schema)?;
    let convergence = Convergence::between(&before, &after);
    if !convergence.converged() {
        tracing::warn!(
            before = convergence.before,
            after = convergence.after,
            "cleaning increased the number of failing rows"
        );
    }
    Ok((result, convergence))
}

/// One input record after cleaning. `record` is `None` when it was dropped.
struct PendingRow {
    row_index: usize,
    record: Option<Record>,
    log: Vec<Correction>,
}

fn clean_record(
    row_index: usize,
    record: &Record,
    schema: &SchemaModel,
    policies: &MissingPolicies,
) -> PendingRow {
    let mut log = Vec::new();
    let mut out = Record::with_capacity(record.len());
    let mut dropped = false;

    for (column, value) in record {
        let Some(spec) = schema.column(column) else {
            out.insert(column.clone(), value.clone());
            continue;
        };
        let mut entry = |original: &Value, new: &Value, rule: CleanRule, outcome: Outcome| {
            log.push(Correction {
                row_index,
                column: column.clone(),
                original: original.clone(),
                new: new.clone(),
                rule,
                outcome,
            });
        };

        let mut current = normalize(spec, value, &mut entry);
        if current.is_missing() {
            match policies.get(column) {
                MissingPolicy::Drop => {
                    entry(&current, &Value::Missing, CleanRule::MissingValue, Outcome::Dropped);
                    dropped = true;
                }
                MissingPolicy::Flag => {
                    entry(&current, &current, CleanRule::MissingValue, Outcome::Flagged);
                }
                fill => {
                    if let Some(fill_value) = fill.fill_value() {
                        // Normalize silently so a second pass has nothing to add.
                        let filled = normalize(
                            spec,
                            &fill_value,
                            &mut |_: &Value, _: &Value, _: CleanRule, _: Outcome| {},
                        );
                        entry(&current, &filled, CleanRule::MissingValue, Outcome::Applied);
                        current = filled;
                    }
                }
            }
        }
        out.insert(column.clone(), current);
    }

    if dropped {
        // A dropped record keeps only its drop entries.
        log.retain(|c| c.outcome == Outcome::Dropped);
    }
    PendingRow {
        row_index,
        record: (!dropped).then_some(out),
        log,
    }
}

/// Undo key-column repairs whose result collides with another row's key.
///
/// A repaired key must not turn a passing row into a duplicate. Any row whose
/// key changed and now shares its value with another kept row gets its key
/// columns back as they were, logged as `Unresolved`. Reverting can expose a
/// new collision on another key, so this runs until nothing changes.
fn guard_unique_keys(input: &Table, schema: &SchemaModel, pending: &mut [PendingRow]) {
    loop {
        let mut reverted = false;
        for key in &schema.unique_keys {
            let mut holders: HashMap<Vec<String>, usize> = HashMap::new();
            for record in pending.iter().filter_map(|row| row.record.as_ref()) {
                if let Some(tuple) = key_tuple(&key.columns, record) {
                    *holders.entry(tuple).or_insert(0) += 1;
                }
            }

            for row in pending.iter_mut() {
                let Some(record) = row.record.as_mut() else {
                    continue;
                };
                let Some(original) = input.rows().get(row.row_index) else {
                    continue;
                };
                let changed: Vec<&String> = key
                    .columns
                    .iter()
                    .filter(|c| record.get(c.as_str()) != original.get(c.as_str()))
                    .collect();
                if changed.is_empty() {
                    continue;
                }
                let shared = key_tuple(&key.columns, record)
                    .and_then(|tuple| holders.get(&tuple).copied())
                    .is_some_and(|n| n > 1);
                if !shared {
                    continue;
                }

                for column in changed {
                    let raw = original.get(column).cloned().unwrap_or(Value::Missing);
                    let rule = row
                        .log
                        .iter()
                        .rev()
                        .find(|c| c.column == *column && c.outcome == Outcome::Applied)
                        .map(|c| c.rule)
                        .unwrap_or(CleanRule::Trim);
                    row.log.retain(|c| {
                        c.column != *column
                            || !matches!(c.outcome, Outcome::Applied | Outcome::Unresolved)
                    });
                    row.log.push(Correction {
                        row_index: row.row_index,
                        column: column.clone(),
                        original: raw.clone(),
                        new: raw.clone(),
                        rule,
                        outcome: Outcome::Unresolved,
                    });
                    record.insert(column.clone(), raw);
                }
                reverted = true;
            }
        }
        if !reverted {
            break;
        }
    }
}

/// Per-component uniqueness keys, or `None` when a component is missing.
fn key_tuple(columns: &[String], record: &Record) -> Option<Vec<String>> {
    columns
        .iter()
        .map(|c| {
            record
                .get(c)
                .filter(|v| !v.is_missing())
                .map(Value::unique_key)
        })
        .collect()
}

/// Apply every normalization rule that fits `spec` to one value, reporting
/// each step through `record`. Blank text comes back as `Missing`.
fn normalize<F>(spec: &ColumnSpec, value: &Value, record: &mut F) -> Value
where
    F: FnMut(&Value, &Value, CleanRule, Outcome),
{
    let Value::Text(raw) = value else {
        return value.clone();
    };

    let trimmed = raw.trim();
    let mut current = if trimmed.is_empty() {
        Value::Missing
    } else {
        Value::Text(trimmed.to_string())
    };
    if current != *value {
        record(value, &current, CleanRule::Trim, Outcome::Applied);
    }
    let Value::Text(text) = current.clone() else {
        return current;
    };

    match spec.logical_type {
        LogicalType::Integer | LogicalType::Decimal => {
            let stripped: String = text
                .chars()
                .filter(|c| !matches!(c, '$' | ',') && !c.is_whitespace())
                .collect();
            let parsed = Value::from_raw(&stripped, spec.logical_type);
            if parsed.as_f64().is_some() {
                record(&current, &parsed, CleanRule::Numeric, Outcome::Applied);
                current = parsed;
            } else {
                record(&current, &current, CleanRule::Numeric, Outcome::Unresolved);
            }
        }
        LogicalType::Date => match parse_date(&text) {
            Some(date) => {
                let parsed = Value::Date(date);
                record(&current, &parsed, CleanRule::DateFormat, Outcome::Applied);
                current = parsed;
            }
            None => record(&current, &current, CleanRule::DateFormat, Outcome::Unresolved),
        },
        LogicalType::String | LogicalType::Categorical => {
            if spec.pii == Some(PiiCategory::Phone) {
                if let Some(phone) = canonical_phone(&text) {
                    if phone != text {
                        let next = Value::Text(phone);
                        record(&current, &next, CleanRule::PhoneFormat, Outcome::Applied);
                        current = next;
                    }
                }
            }
            if let (Some(style), Value::Text(s)) = (spec.case, &current) {
                let cased = style.apply(s);
                if cased != *s {
                    let next = Value::Text(cased);
                    record(&current, &next, CleanRule::Case, Outcome::Applied);
                    current = next;
                }
            }
        }
    }
    current
}

/// `XXX-XXX-XXXX` when exactly ten digits remain after stripping, else `None`.
pub fn canonical_phone(raw: &str) -> Option<String> {
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.len() != 10 {
        return None;
    }
    Some(format!("{}-{}-{}", &digits[0..3], &digits[3..6], &digits[6..10]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::customers::customer_schema;
    use chrono::NaiveDate;

    fn schema() -> SchemaModel {
        let mut s = customer_schema();
        s.as_of = NaiveDate::from_ymd_opt(2025, 6, 1);
        s
    }

    fn table(rows: &[[&str; 10]]) -> Table {
        let schema = schema();
        let header: Vec<String> = schema.column_names().map(str::to_string).collect();
        let rows = rows
            .iter()
            .map(|r| r.iter().map(|c| c.to_string()).collect())
            .collect();
        Table::from_raw_rows(&schema, &header, rows, 2).unwrap()
    }

    fn policies() -> MissingPolicies {
        MissingPolicies::defaults_for(&schema())
    }

    const MESSY: [&str; 10] = [
        "3",
        "",
        "johnson",
        " BOB@Example.com ",
        "(555) 234-5678",
        "05/10/1975",
        "",
        "",
        "SUSPENDED",
        "01/15/2024",
    ];

    #[test]
    fn test_canonical_phone() {
        assert_eq!(canonical_phone("(555) 234-5678").as_deref(), Some("555-234-5678"));
        assert_eq!(canonical_phone("555.987.6543").as_deref(), Some("555-987-6543"));
        assert_eq!(canonical_phone("5554356789").as_deref(), Some("555-435-6789"));
        assert_eq!(canonical_phone("555-1234"), None);
        assert_eq!(canonical_phone("1-555-234-5678"), None);
    }

    #[test]
    fn test_clean_repairs_messy_row() {
        let result = clean(&table(&[MESSY]), &schema(), &policies()).unwrap();
        let t = &result.table;
        assert_eq!(t.get(0, "first_name"), Some(&Value::Text("Unknown".into())));
        assert_eq!(t.get(0, "last_name"), Some(&Value::Text("Johnson".into())));
        assert_eq!(t.get(0, "email"), Some(&Value::Text("bob@example.com".into())));
        assert_eq!(t.get(0, "phone"), Some(&Value::Text("555-234-5678".into())));
        assert_eq!(
            t.get(0, "date_of_birth"),
            Some(&Value::Date(NaiveDate::from_ymd_opt(1975, 5, 10).unwrap()))
        );
        assert_eq!(t.get(0, "income"), Some(&Value::Decimal(0.0)));
        assert_eq!(t.get(0, "account_status"), Some(&Value::Text("suspended".into())));
        assert_eq!(
            t.get(0, "created_date"),
            Some(&Value::Date(NaiveDate::from_ymd_opt(2024, 1, 15).unwrap()))
        );
        assert_eq!(t.get(0, "address"), Some(&Value::Missing));

        let flagged: Vec<&str> = result
            .unresolved
            .iter()
            .filter(|c| c.outcome == Outcome::Flagged)
            .map(|c| c.column.as_str())
            .collect();
        assert_eq!(flagged, vec!["address"]);
    }

    #[test]
    fn test_clean_is_idempotent() {
        let first = clean(&table(&[MESSY]), &schema(), &policies()).unwrap();
        assert!(!first.corrections.is_empty());
        let second = clean(&first.table, &schema(), &policies()).unwrap();
        assert!(
            second.corrections.is_empty(),
            "second pass made changes: {:?}",
            second.corrections
        );
        assert_eq!(first.table, second.table);
    }

    #[test]
    fn test_invalid_date_is_unresolved_and_kept() {
        let mut row = MESSY;
        row[5] = "invalid_date";
        let result = clean(&table(&[row]), &schema(), &policies()).unwrap();

        assert_eq!(
            result.table.get(0, "date_of_birth"),
            Some(&Value::Text("invalid_date".into()))
        );
        let entry = result
            .unresolved
            .iter()
            .find(|c| c.column == "date_of_birth")
            .expect("date_of_birth should be logged");
        assert_eq!(entry.outcome, Outcome::Unresolved);
        assert_eq!(entry.rule, CleanRule::DateFormat);
        assert!(result
            .corrections
            .iter()
            .all(|c| c.column != "date_of_birth"));
    }

    #[test]
    fn test_numeric_text_is_repaired() {
        let mut row = MESSY;
        row[7] = "$75,000";
        let result = clean(&table(&[row]), &schema(), &policies()).unwrap();
        assert_eq!(result.table.get(0, "income"), Some(&Value::Decimal(75000.0)));

        row[7] = "lots";
        let result = clean(&table(&[row]), &schema(), &policies()).unwrap();
        assert_eq!(result.table.get(0, "income"), Some(&Value::Text("lots".into())));
        assert!(result
            .unresolved
            .iter()
            .any(|c| c.column == "income" && c.rule == CleanRule::Numeric));
    }

    #[test]
    fn test_short_phone_is_left_alone() {
        let mut row = MESSY;
        row[4] = "555-1234";
        let result = clean(&table(&[row]), &schema(), &policies()).unwrap();
        assert_eq!(result.table.get(0, "phone"), Some(&Value::Text("555-1234".into())));
        assert!(result.log().iter().all(|c| c.column != "phone"));
    }

    #[test]
    fn test_drop_policy_removes_record() {
        let mut policies = policies();
        policies.set("address", MissingPolicy::Drop);
        let mut kept = MESSY;
        kept[0] = "4";
        kept[6] = "1 Main St";
        let result = clean(&table(&[MESSY, kept]), &schema(), &policies).unwrap();

        assert_eq!(result.rows_dropped, 1);
        assert_eq!(result.table.len(), 1);
        assert_eq!(result.table.get(0, "customer_id"), Some(&Value::Integer(4)));
        let row0: Vec<&Correction> = result
            .log()
            .into_iter()
            .filter(|c| c.row_index == 0)
            .collect();
        assert_eq!(row0.len(), 1);
        assert_eq!(row0[0].outcome, Outcome::Dropped);
    }

    #[test]
    fn test_log_is_ordered_by_row_then_column() {
        let result = clean(&table(&[MESSY, MESSY]), &schema(), &policies()).unwrap();
        let positions: Vec<(usize, usize)> = result
            .log()
            .iter()
            .map(|c| (c.row_index, schema().position(&c.column).unwrap()))
            .collect();
        let mut sorted = positions.clone();
        sorted.sort();
        assert_eq!(positions, sorted);
    }

    #[test]
    fn test_key_repair_that_would_duplicate_is_reverted() {
        let mut repaired = MESSY;
        repaired[0] = "$1";
        repaired[1] = "R2D2";
        let mut existing = MESSY;
        existing[0] = "1";

        let input = table(&[repaired, existing]);
        let result = clean(&input, &schema(), &policies()).unwrap();
        assert_eq!(
            result.table.get(0, "customer_id"),
            Some(&Value::Text("$1".into())),
            "the repair would have copied row 1's key"
        );
        assert_eq!(result.table.get(1, "customer_id"), Some(&Value::Integer(1)));

        let entry = result
            .unresolved
            .iter()
            .find(|c| c.row_index == 0 && c.column == "customer_id")
            .expect("reverted key is logged");
        assert_eq!(entry.outcome, Outcome::Unresolved);
        assert_eq!(entry.rule, CleanRule::Numeric);
        assert!(result.corrections.iter().all(|c| c.column != "customer_id"));

        let (_, convergence) = clean_verified(&input, &schema(), &policies()).unwrap();
        assert!(convergence.converged(), "{:?}", convergence);
    }

    #[test]
    fn test_key_repair_without_collision_is_kept() {
        let mut row = MESSY;
        row[0] = "$7";
        let result = clean(&table(&[row, MESSY]), &schema(), &policies()).unwrap();
        assert_eq!(result.table.get(0, "customer_id"), Some(&Value::Integer(7)));
    }

    #[test]
    fn test_clean_verified_converges() {
        let (result, convergence) =
            clean_verified(&table(&[MESSY]), &schema(), &policies()).unwrap();
        assert_eq!(convergence.before, 1);
        assert_eq!(convergence.after, 0, "unexpected leftovers: {:?}", result.unresolved);
        assert!(convergence.converged());
    }
}
