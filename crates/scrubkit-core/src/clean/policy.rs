use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{Result, ScrubKitError};
use crate::schema::{LogicalType, SchemaModel};
use crate::table::Value;

/// What the Cleaner does with a missing value in one column.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingPolicy {
    /// Delete the whole record.
    Drop,
    /// Substitute a sentinel string.
    FillPlaceholder(String),
    /// Substitute a typed default (e.g. zero income).
    FillDefault(Value),
    /// Leave it missing, but note it in the audit log.
    #[default]
    Flag,
}

impl MissingPolicy {
    /// Parse `drop`, `flag` or `fill:<value>` for a column of `logical_type`.
    ///
    /// A fill value that types cleanly for a non-text column becomes a
    /// `FillDefault`; anything else is kept as a placeholder string.
    pub fn parse(raw: &str, logical_type: LogicalType) -> Option<Self> {
        let raw = raw.trim();
        match raw.to_lowercase().as_str() {
            "drop" => return Some(MissingPolicy::Drop),
            "flag" => return Some(MissingPolicy::Flag),
            _ => {}
        }
        let (prefix, value) = raw.split_once(':')?;
        if !prefix.trim().eq_ignore_ascii_case("fill") {
            return None;
        }
        let value = value.trim();
        if value.is_empty() {
            return None;
        }
        if logical_type.is_textual() {
            return Some(MissingPolicy::FillPlaceholder(value.to_string()));
        }
        match Value::from_raw(value, logical_type) {
            Value::Text(s) => Some(MissingPolicy::FillPlaceholder(s)),
            typed => Some(MissingPolicy::FillDefault(typed)),
        }
    }

    /// The value a fill policy substitutes, typed for the column.
    pub fn fill_value(&self) -> Option<Value> {
        match self {
            MissingPolicy::FillPlaceholder(s) => Some(Value::Text(s.clone())),
            MissingPolicy::FillDefault(v) => Some(v.clone()),
            MissingPolicy::Drop | MissingPolicy::Flag => None,
        }
    }
}

impl fmt::Display for MissingPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MissingPolicy::Drop => write!(f, "drop"),
            MissingPolicy::FillPlaceholder(s) => write!(f, "fill:{}", s),
            MissingPolicy::FillDefault(v) => write!(f, "fill:{}", v.render()),
            MissingPolicy::Flag => write!(f, "flag"),
        }
    }
}

/// Per-column missing-value policies. Total: a column without an explicit
/// entry gets [`MissingPolicy::Flag`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MissingPolicies {
    policies: IndexMap<String, MissingPolicy>,
}

static FLAG: MissingPolicy = MissingPolicy::Flag;

impl MissingPolicies {
    pub fn new() -> Self {
        Self::default()
    }

    /// `first_name`/`last_name` fill with `Unknown`, `income` fills with zero,
    /// everything else is flagged. Entries for undeclared columns are skipped.
    pub fn defaults_for(schema: &SchemaModel) -> Self {
        let mut policies = Self::new();
        for (column, raw) in [
            ("first_name", "fill:Unknown"),
            ("last_name", "fill:Unknown"),
            ("income", "fill:0"),
        ] {
            if let Some(spec) = schema.column(column) {
                if let Some(policy) = MissingPolicy::parse(raw, spec.logical_type) {
                    policies.set(column, policy);
                }
            }
        }
        policies
    }

    pub fn set(&mut self, column: impl Into<String>, policy: MissingPolicy) {
        self.policies.insert(column.into(), policy);
    }

    /// Parse and set `raw` for a declared column.
    pub fn set_raw(&mut self, schema: &SchemaModel, column: &str, raw: &str) -> Result<()> {
        let spec = schema.require_column(column, "missing-value policy")?;
        let policy =
            MissingPolicy::parse(raw, spec.logical_type).ok_or_else(|| ScrubKitError::Config {
                message: format!(
                    "column '{}': unrecognized missing-value policy '{}' (expected drop, flag or fill:<value>)",
                    column, raw
                ),
            })?;
        self.set(column, policy);
        Ok(())
    }

    pub fn get(&self, column: &str) -> &MissingPolicy {
        self.policies.get(column).unwrap_or(&FLAG)
    }

    /// Explicit entries, in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &MissingPolicy)> {
        self.policies.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Every policy must name a declared column.
    pub fn check(&self, schema: &SchemaModel) -> Result<()> {
        for column in self.policies.keys() {
            schema.require_column(column, "missing-value policy")?;
        }
        Ok(())
    }
}
