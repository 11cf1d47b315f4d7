//! # PII Classification
//!
//! Locates personally-identifiable values in the columns the schema declares
//! as PII. Email and phone detection is structural (regex / digit count);
//! name, address and date-of-birth detection is column-semantic: a non-empty
//! value of the right shape in a PII-declared column counts as exposure.
//!
//! Classification is risk assessment, not gatekeeping, so it never fails on
//! data. The result feeds both the PII report and the Masker.

pub mod detectors;

use std::collections::BTreeSet;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::schema::{PiiCategory, SchemaModel};
use crate::table::Table;

pub use detectors::{detect, MatchKind};

/// Rows with at least this many distinct PII categories are high-risk.
pub const HIGH_RISK_CATEGORY_COUNT: usize = 3;

/// One detected PII value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PiiMatch {
    pub row_index: usize,
    pub column: String,
    pub category: PiiCategory,
    pub kind: MatchKind,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CategoryStats {
    /// Rows with at least one match in this category.
    pub matched_count: usize,
    pub percentage: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ExposureRisk {
    Critical,
    High,
    Low,
}

impl std::fmt::Display for ExposureRisk {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExposureRisk::Critical => write!(f, "CRITICAL"),
            ExposureRisk::High => write!(f, "HIGH"),
            ExposureRisk::Low => write!(f, "LOW"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PiiResult {
    pub total_rows: usize,
    /// Every category appears, matched or not, in `PiiCategory::ALL` order.
    pub per_category: IndexMap<PiiCategory, CategoryStats>,
    /// Ordered by row, then column declaration order.
    pub matches: Vec<PiiMatch>,
    /// Column → declared category, for every PII column in the schema.
    pub columns: IndexMap<String, PiiCategory>,
    pub high_risk_rows: Vec<usize>,
    pub risk: ExposureRisk,
}

impl PiiResult {
    pub fn category_of(&self, column: &str) -> Option<PiiCategory> {
        self.columns.get(column).copied()
    }

    pub fn stats(&self, category: PiiCategory) -> CategoryStats {
        self.per_category.get(&category).copied().unwrap_or_default()
    }

    pub fn matches_in(&self, column: &str) -> impl Iterator<Item = &PiiMatch> {
        let column = column.to_string();
        self.matches.iter().filter(move |m| m.column == column)
    }
}

/// Classify every PII-declared column of `table`.
pub fn classify_pii(table: &Table, schema: &SchemaModel) -> PiiResult {
    let columns: IndexMap<String, PiiCategory> = schema
        .pii_columns()
        .map(|(spec, category)| (spec.name.clone(), category))
        .collect();

    let mut matches = Vec::new();
    let mut rows_per_category: IndexMap<PiiCategory, usize> =
        PiiCategory::ALL.iter().map(|c| (*c, 0)).collect();
    let mut high_risk_rows = Vec::new();

    for (row_index, record) in table.rows().iter().enumerate() {
        let mut seen: BTreeSet<PiiCategory> = BTreeSet::new();
        for (column, category) in &columns {
            let Some(value) = record.get(column) else {
                continue;
            };
            if let Some(kind) = detect(*category, value) {
                seen.insert(*category);
                matches.push(PiiMatch {
                    row_index,
                    column: column.clone(),
                    category: *category,
                    kind,
                });
            }
        }
        for category in &seen {
            if let Some(count) = rows_per_category.get_mut(category) {
                *count += 1;
            }
        }
        if seen.len() >= HIGH_RISK_CATEGORY_COUNT {
            high_risk_rows.push(row_index);
        }
    }

    let total_rows = table.len();
    let per_category = rows_per_category
        .into_iter()
        .map(|(category, matched_count)| {
            let percentage = if total_rows == 0 {
                0.0
            } else {
                matched_count as f64 / total_rows as f64 * 100.0
            };
            (
                category,
                CategoryStats {
                    matched_count,
                    percentage,
                },
            )
        })
        .collect();

    let risk = if total_rows > 0 && high_risk_rows.len() * 2 > total_rows {
        ExposureRisk::Critical
    } else if !matches.is_empty() {
        ExposureRisk::High
    } else {
        ExposureRisk::Low
    };

    tracing::info!(
        rows = total_rows,
        matches = matches.len(),
        high_risk = high_risk_rows.len(),
        risk = %risk,
        "PII classification complete"
    );

    PiiResult {
        total_rows,
        per_category,
        matches,
        columns,
        high_risk_rows,
        risk,
    }
}
