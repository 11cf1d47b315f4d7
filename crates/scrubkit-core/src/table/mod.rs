//! # Table Data Model
//!
//! A [`Record`] is an ordered mapping of column name to typed [`Value`]; a
//! [`Table`] is an ordered sequence of records sharing one column list.
//! Every pipeline stage builds a new `Table` instead of writing through the
//! previous stage's snapshot, so raw, cleaned and masked states can be
//! compared side by side after a run.

pub mod value;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{Result, ScrubKitError};
use crate::schema::SchemaModel;

pub use value::Value;

/// One row: column name → typed value, in column order.
pub type Record = IndexMap<String, Value>;

static MISSING: Value = Value::Missing;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Record>,
}

impl Table {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// An empty table with the schema's declared columns.
    pub fn for_schema(schema: &SchemaModel) -> Self {
        Self::new(schema.column_names().map(str::to_string).collect())
    }

    /// Build a typed table from string cells.
    ///
    /// The header must list exactly the schema's columns in declaration order.
    /// Short rows are padded with `Missing`; rows with extra cells are rejected.
    /// `first_line` is the 1-based line number of the first data row, used in
    /// error messages.
    pub fn from_raw_rows(
        schema: &SchemaModel,
        header: &[String],
        rows: Vec<Vec<String>>,
        first_line: usize,
    ) -> Result<Self> {
        let expected: Vec<&str> = schema.column_names().collect();
        let found: Vec<&str> = header.iter().map(|h| h.trim()).collect();
        if expected != found {
            return Err(ScrubKitError::HeaderMismatch {
                expected: expected.join(","),
                found: found.join(","),
            });
        }

        let mut table = Self::for_schema(schema);
        for (i, cells) in rows.into_iter().enumerate() {
            if cells.len() > expected.len() {
                return Err(ScrubKitError::Input {
                    line: first_line + i,
                    message: format!(
                        "row has {} cells but the schema declares {} columns",
                        cells.len(),
                        expected.len()
                    ),
                });
            }
            let mut record = Record::with_capacity(expected.len());
            for (idx, spec) in schema.columns.values().enumerate() {
                let value = cells
                    .get(idx)
                    .map(|raw| Value::from_raw(raw, spec.logical_type))
                    .unwrap_or(Value::Missing);
                record.insert(spec.name.clone(), value);
            }
            table.rows.push(record);
        }
        Ok(table)
    }

    pub fn push(&mut self, record: Record) {
        self.rows.push(record);
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Record] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn get(&self, row: usize, column: &str) -> Option<&Value> {
        self.rows.get(row).and_then(|r| r.get(column))
    }

    /// Values of one column, in row order. Absent cells read as `Missing`.
    pub fn column_values<'a>(&'a self, column: &'a str) -> impl Iterator<Item = &'a Value> + 'a {
        self.rows
            .iter()
            .map(move |r| r.get(column).unwrap_or(&MISSING))
    }
}
