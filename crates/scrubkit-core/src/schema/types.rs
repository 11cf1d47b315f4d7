use chrono::NaiveDate;
use indexmap::IndexMap;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Result, ScrubKitError};

/// Declarative description of the expected table: columns in declaration
/// order, table-scope unique keys, and the reference date used for
/// plausibility checks.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchemaModel {
    pub columns: IndexMap<String, ColumnSpec>,
    pub unique_keys: Vec<UniqueKey>,
    /// Reference date for age/future checks. `None` means "today".
    pub as_of: Option<NaiveDate>,
}

impl SchemaModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a column. Re-declaring a name replaces the spec but keeps its position.
    pub fn add_column(&mut self, spec: ColumnSpec) {
        self.columns.insert(spec.name.clone(), spec);
    }

    pub fn add_unique_key(&mut self, columns: &[&str]) {
        self.unique_keys.push(UniqueKey {
            name: None,
            columns: columns.iter().map(|c| c.to_string()).collect(),
        });
    }

    pub fn column(&self, name: &str) -> Option<&ColumnSpec> {
        self.columns.get(name)
    }

    /// Declaration index of a column, used to order violations.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.columns.get_index_of(name)
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(|k| k.as_str())
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Columns that carry a PII category, in declaration order.
    pub fn pii_columns(&self) -> impl Iterator<Item = (&ColumnSpec, PiiCategory)> {
        self.columns
            .values()
            .filter_map(|spec| spec.pii.map(|category| (spec, category)))
    }

    pub fn reference_date(&self) -> NaiveDate {
        self.as_of
            .unwrap_or_else(|| chrono::Local::now().date_naive())
    }

    /// Reject schemas that cannot be evaluated.
    ///
    /// A malformed schema is the only condition that aborts a run, so every
    /// stage calls this before touching data.
    pub fn check(&self) -> Result<()> {
        if self.columns.is_empty() {
            return Err(ScrubKitError::Config {
                message: "schema declares no columns".to_string(),
            });
        }

        let mut seen_keys: Vec<Vec<&str>> = Vec::with_capacity(self.unique_keys.len());
        for key in &self.unique_keys {
            if key.columns.is_empty() {
                return Err(ScrubKitError::Config {
                    message: "unique key with an empty column list".to_string(),
                });
            }
            for col in &key.columns {
                self.require_column(col, "unique key")?;
            }

            // Column order does not change what a key means.
            let mut members: Vec<&str> = key.columns.iter().map(String::as_str).collect();
            members.sort_unstable();
            members.dedup();
            if seen_keys.contains(&members) {
                return Err(ScrubKitError::Config {
                    message: format!("unique key ({}) is declared twice", key.columns.join(", ")),
                });
            }
            seen_keys.push(members);
        }

        for spec in self.columns.values() {
            spec.check()?;
        }
        Ok(())
    }

    /// Fail with `UnknownColumn` unless `name` is declared.
    pub fn require_column(&self, name: &str, context: &str) -> Result<&ColumnSpec> {
        self.columns
            .get(name)
            .ok_or_else(|| ScrubKitError::UnknownColumn {
                column: name.to_string(),
                context: context.to_string(),
                declared: self.column_names().collect::<Vec<_>>().join(", "),
            })
    }

    /// Stable hash of the schema, so two runs can be compared for schema identity.
    pub fn fingerprint(&self) -> String {
        use sha2::{Digest, Sha256};
        let serialized = serde_json::to_string(self).unwrap_or_default();
        let mut hasher = Sha256::new();
        hasher.update(serialized.as_bytes());
        format!("{:x}", hasher.finalize())
    }
}

/// Rule set and logical type for one column.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnSpec {
    pub name: String,
    pub logical_type: LogicalType,
    pub nullable: bool,
    pub constraints: Vec<Constraint>,
    pub pii: Option<PiiCategory>,
    /// Canonical case the Cleaner re-renders text values into.
    pub case: Option<CaseStyle>,
}

impl ColumnSpec {
    pub fn new(name: impl Into<String>, logical_type: LogicalType) -> Self {
        Self {
            name: name.into(),
            logical_type,
            nullable: true,
            constraints: Vec::new(),
            pii: None,
            case: None,
        }
    }

    pub fn required(mut self) -> Self {
        self.nullable = false;
        self
    }

    pub fn with(mut self, constraint: Constraint) -> Self {
        self.constraints.push(constraint);
        self
    }

    pub fn pii(mut self, category: PiiCategory) -> Self {
        self.pii = Some(category);
        self
    }

    pub fn case(mut self, style: CaseStyle) -> Self {
        self.case = Some(style);
        self
    }

    /// Allowed values of a categorical column, if declared.
    pub fn allowed_values(&self) -> Option<&[String]> {
        self.constraints.iter().find_map(|c| match c {
            Constraint::AllowedValues(values) => Some(values.as_slice()),
            _ => None,
        })
    }

    fn check(&self) -> Result<()> {
        for constraint in &self.constraints {
            if !constraint.applies_to(self.logical_type) {
                return Err(self.unsupported(constraint.name()));
            }
            match constraint {
                Constraint::Range {
                    min: Some(min),
                    max: Some(max),
                } if min > max => {
                    return Err(ScrubKitError::Config {
                        message: format!("column '{}': range min {} > max {}", self.name, min, max),
                    });
                }
                Constraint::Length {
                    min: Some(min),
                    max: Some(max),
                } if min > max => {
                    return Err(ScrubKitError::Config {
                        message: format!(
                            "column '{}': length min {} > max {}",
                            self.name, min, max
                        ),
                    });
                }
                Constraint::Pattern(source) => {
                    Regex::new(source).map_err(|e| ScrubKitError::Config {
                        message: format!(
                            "column '{}': invalid pattern '{}': {}",
                            self.name, source, e
                        ),
                    })?;
                }
                _ => {}
            }
        }

        if self.logical_type == LogicalType::Categorical && self.allowed_values().is_none() {
            return Err(ScrubKitError::Config {
                message: format!(
                    "column '{}': categorical columns need an allowed-value set",
                    self.name
                ),
            });
        }

        if self.case.is_some() && !self.logical_type.is_textual() {
            return Err(self.unsupported("case"));
        }

        Ok(())
    }

    fn unsupported(&self, constraint: &str) -> ScrubKitError {
        ScrubKitError::UnsupportedConstraint {
            column: self.name.clone(),
            constraint: constraint.to_string(),
            logical_type: self.logical_type.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogicalType {
    Integer,
    Decimal,
    String,
    Date,
    Categorical,
}

impl LogicalType {
    pub fn is_numeric(&self) -> bool {
        matches!(self, LogicalType::Integer | LogicalType::Decimal)
    }

    pub fn is_textual(&self) -> bool {
        matches!(self, LogicalType::String | LogicalType::Categorical)
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "integer" | "int" => Some(LogicalType::Integer),
            "decimal" | "numeric" | "float" => Some(LogicalType::Decimal),
            "string" | "text" => Some(LogicalType::String),
            "date" => Some(LogicalType::Date),
            "categorical" | "enum" => Some(LogicalType::Categorical),
            _ => None,
        }
    }
}

impl fmt::Display for LogicalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogicalType::Integer => write!(f, "integer"),
            LogicalType::Decimal => write!(f, "decimal"),
            LogicalType::String => write!(f, "string"),
            LogicalType::Date => write!(f, "date"),
            LogicalType::Categorical => write!(f, "categorical"),
        }
    }
}

/// A single-value predicate. Uniqueness is table-scoped and lives in
/// [`UniqueKey`] instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Constraint {
    /// Inclusive numeric bounds.
    Range { min: Option<f64>, max: Option<f64> },
    /// Inclusive character-count bounds.
    Length {
        min: Option<usize>,
        max: Option<usize>,
    },
    /// Full-value regex match.
    Pattern(String),
    CharClass(CharClass),
    AllowedValues(Vec<String>),
    /// Date implies an age of at most `years` at the reference date.
    MaxAge { years: u32 },
    /// Date is not after the reference date.
    NotInFuture,
}

impl Constraint {
    pub fn name(&self) -> &'static str {
        match self {
            Constraint::Range { .. } => "range",
            Constraint::Length { .. } => "length",
            Constraint::Pattern(_) => "pattern",
            Constraint::CharClass(_) => "char_class",
            Constraint::AllowedValues(_) => "allowed_values",
            Constraint::MaxAge { .. } => "max_age",
            Constraint::NotInFuture => "not_in_future",
        }
    }

    pub fn applies_to(&self, logical_type: LogicalType) -> bool {
        match self {
            Constraint::Range { .. } => logical_type.is_numeric(),
            Constraint::Length { .. } | Constraint::Pattern(_) | Constraint::CharClass(_) => {
                logical_type.is_textual()
            }
            Constraint::AllowedValues(_) => logical_type.is_textual(),
            Constraint::MaxAge { .. } | Constraint::NotInFuture => {
                logical_type == LogicalType::Date
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CharClass {
    /// Letters, with interior spaces, hyphens and apostrophes ("Mary-Ann", "O'Neil").
    Alphabetic,
    Numeric,
    Alphanumeric,
}

impl CharClass {
    pub fn matches(&self, s: &str) -> bool {
        if s.is_empty() {
            return false;
        }
        match self {
            CharClass::Alphabetic => {
                s.chars().any(char::is_alphabetic)
                    && s
                        .chars()
                        .all(|c| c.is_alphabetic() || matches!(c, ' ' | '-' | '\''))
            }
            CharClass::Numeric => s.chars().all(|c| c.is_ascii_digit()),
            CharClass::Alphanumeric => s.chars().all(char::is_alphanumeric),
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "alphabetic" | "alpha" => Some(CharClass::Alphabetic),
            "numeric" | "digits" => Some(CharClass::Numeric),
            "alphanumeric" | "alnum" => Some(CharClass::Alphanumeric),
            _ => None,
        }
    }
}

impl fmt::Display for CharClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CharClass::Alphabetic => write!(f, "alphabetic"),
            CharClass::Numeric => write!(f, "numeric"),
            CharClass::Alphanumeric => write!(f, "alphanumeric"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PiiCategory {
    Name,
    Email,
    Phone,
    Address,
    DateOfBirth,
}

impl PiiCategory {
    pub const ALL: [PiiCategory; 5] = [
        PiiCategory::Name,
        PiiCategory::Email,
        PiiCategory::Phone,
        PiiCategory::Address,
        PiiCategory::DateOfBirth,
    ];

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "name" => Some(PiiCategory::Name),
            "email" => Some(PiiCategory::Email),
            "phone" => Some(PiiCategory::Phone),
            "address" => Some(PiiCategory::Address),
            "date_of_birth" | "dob" => Some(PiiCategory::DateOfBirth),
            _ => None,
        }
    }
}

impl fmt::Display for PiiCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PiiCategory::Name => write!(f, "name"),
            PiiCategory::Email => write!(f, "email"),
            PiiCategory::Phone => write!(f, "phone"),
            PiiCategory::Address => write!(f, "address"),
            PiiCategory::DateOfBirth => write!(f, "date_of_birth"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaseStyle {
    Title,
    Lower,
    Upper,
}

impl CaseStyle {
    /// Re-render `s` in this case without adding or removing characters.
    ///
    /// A character whose case mapping is more than one character (`ß`, `ﬁ`)
    /// is kept as is, so applying a style twice changes nothing.
    pub fn apply(&self, s: &str) -> String {
        match self {
            CaseStyle::Lower => s.chars().map(lower_char).collect(),
            CaseStyle::Upper => s.chars().map(upper_char).collect(),
            CaseStyle::Title => {
                // First letter of every alphabetic run is upper, the rest lower.
                let mut out = String::with_capacity(s.len());
                let mut prev_alpha = false;
                for ch in s.chars() {
                    if ch.is_alphabetic() {
                        out.push(if prev_alpha { lower_char(ch) } else { upper_char(ch) });
                        prev_alpha = true;
                    } else {
                        out.push(ch);
                        prev_alpha = false;
                    }
                }
                out
            }
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "title" => Some(CaseStyle::Title),
            "lower" => Some(CaseStyle::Lower),
            "upper" => Some(CaseStyle::Upper),
            _ => None,
        }
    }
}

fn upper_char(ch: char) -> char {
    single_char(ch.to_uppercase(), ch)
}

fn lower_char(ch: char) -> char {
    single_char(ch.to_lowercase(), ch)
}

fn single_char(mut mapped: impl Iterator<Item = char>, original: char) -> char {
    match (mapped.next(), mapped.next()) {
        (Some(c), None) => c,
        _ => original,
    }
}

impl fmt::Display for CaseStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaseStyle::Title => write!(f, "title"),
            CaseStyle::Lower => write!(f, "lower"),
            CaseStyle::Upper => write!(f, "upper"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UniqueKey {
    pub name: Option<String>,
    pub columns: Vec<String>,
}
