//! # Configuration File Parser
//!
//! Reads and parses `scrubkit.toml`, the optional configuration file that
//! declares the schema and missing-value policies for a run. Supports:
//!
//! - `[paths]`: default input CSV and output directory
//! - `[schema]`: reference date and unique keys
//! - `[columns.<name>]`: per-column type, constraints, PII category and policy
//! - `[missing]`: missing-value policies by column
//!
//! When no `[columns]` are declared, the built-in customer schema is used and
//! the other sections still apply on top of it.
//!
//! Example `scrubkit.toml`:
//!
//! ```toml
//! [paths]
//! input_csv = "data/customers_raw.csv"
//! output_dir = "output"
//!
//! [schema]
//! as_of = "2025-06-01"
//! unique = ["customer_id", ["first_name", "last_name", "date_of_birth"]]
//!
//! [columns.customer_id]
//! type = "integer"
//! nullable = false
//! min = 1
//!
//! [columns.email]
//! type = "string"
//! pattern = '^[a-z0-9._%+-]+@[a-z0-9.-]+\.[a-z]{2,}$'
//! pii = "email"
//! case = "lower"
//!
//! [columns.tier]
//! type = "categorical"
//! allowed = ["gold", "silver"]
//! missing = "fill:silver"
//!
//! [missing]
//! email = "flag"
//! ```

use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::Deserialize;

use crate::clean::{MissingPolicies, MissingPolicy};
use crate::error::{Result, ScrubKitError};
use crate::schema::customers::customer_schema;
use crate::schema::{
    parse_canonical_date, CaseStyle, CharClass, ColumnSpec, Constraint, LogicalType, PiiCategory,
    SchemaModel,
};

/// Default config file name.
pub const CONFIG_FILE_NAME: &str = "scrubkit.toml";

/// Top-level scrubkit.toml structure.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ScrubKitConfig {
    pub paths: PathsConfig,
    pub schema: SchemaConfig,
    /// Column declarations, in file order.
    pub columns: IndexMap<String, ColumnConfig>,
    /// Missing-value policies keyed by column name.
    pub missing: IndexMap<String, String>,

    /// Absolute path to the directory containing scrubkit.toml.
    ///
    /// Populated by `read_config()` so relative `[paths]` resolve against the
    /// config file's location, not the CWD.
    #[serde(skip)]
    pub config_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    pub input_csv: Option<String>,
    pub output_dir: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SchemaConfig {
    /// Reference date (`YYYY-MM-DD`) for age and future-date checks.
    pub as_of: Option<String>,
    /// Unique keys. Replaces the built-in keys when non-empty.
    pub unique: Vec<KeyColumns>,
}

/// A unique key: one column name, or a list for a composite key.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum KeyColumns {
    Single(String),
    Composite(Vec<String>),
}

impl KeyColumns {
    pub fn columns(&self) -> Vec<&str> {
        match self {
            KeyColumns::Single(c) => vec![c.as_str()],
            KeyColumns::Composite(cs) => cs.iter().map(String::as_str).collect(),
        }
    }
}

/// One `[columns.<name>]` entry.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ColumnConfig {
    #[serde(rename = "type")]
    pub logical_type: Option<String>,
    pub nullable: Option<bool>,
    pub pii: Option<String>,
    pub case: Option<String>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub min_length: Option<usize>,
    pub max_length: Option<usize>,
    pub pattern: Option<String>,
    pub char_class: Option<String>,
    pub allowed: Option<Vec<String>>,
    pub max_age_years: Option<u32>,
    pub not_in_future: Option<bool>,
    /// `drop`, `flag` or `fill:<value>`.
    pub missing: Option<String>,
}

/// Read and parse a scrubkit.toml file from the given directory.
///
/// Returns `None` if the file doesn't exist (config is optional).
/// Returns an error if the file exists but can't be parsed.
pub fn read_config(dir: &Path) -> Result<Option<ScrubKitConfig>> {
    let path = dir.join(CONFIG_FILE_NAME);
    if !path.exists() {
        return Ok(None);
    }
    read_config_file(&path).map(Some)
}

/// Read and parse an explicit config file path.
pub fn read_config_file(path: &Path) -> Result<ScrubKitConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| ScrubKitError::Config {
        message: format!("Failed to read {}: {}", path.display(), e),
    })?;

    let mut config: ScrubKitConfig =
        toml::from_str(&content).map_err(|e| ScrubKitError::Config {
            message: format!("Failed to parse {}: {}", path.display(), e),
        })?;

    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    config.config_dir = Some(std::fs::canonicalize(dir).unwrap_or_else(|_| dir.to_path_buf()));

    config.validate()?;
    Ok(config)
}

impl ScrubKitConfig {
    /// Validate semantic constraints that serde cannot enforce.
    ///
    /// Catches unknown type/category/case names, inverted bounds and
    /// malformed policies before any data is read.
    pub fn validate(&self) -> Result<()> {
        if let Some(ref as_of) = self.schema.as_of {
            if parse_canonical_date(as_of).is_none() {
                return Err(ScrubKitError::Config {
                    message: format!("[schema] as_of '{}' is not a YYYY-MM-DD date", as_of),
                });
            }
        }

        for key in &self.schema.unique {
            if key.columns().is_empty() {
                return Err(ScrubKitError::Config {
                    message: "[schema] unique contains an empty key".to_string(),
                });
            }
        }

        for (name, column) in &self.columns {
            column.spec(name)?;
            if let Some(ref raw) = column.missing {
                if self.missing.contains_key(name) {
                    tracing::warn!(
                        "scrubkit.toml: [missing] {} is overridden by [columns.{}] missing = '{}'. Ignoring.",
                        name,
                        name,
                        raw
                    );
                }
            }
        }
        Ok(())
    }

    /// Build the Schema Model this config describes.
    pub fn schema_model(&self) -> Result<SchemaModel> {
        let mut schema = if self.columns.is_empty() {
            customer_schema()
        } else {
            let mut schema = SchemaModel::new();
            for (name, column) in &self.columns {
                schema.add_column(column.spec(name)?);
            }
            schema
        };

        if let Some(ref as_of) = self.schema.as_of {
            schema.as_of = parse_canonical_date(as_of);
        }
        if !self.schema.unique.is_empty() {
            schema.unique_keys.clear();
            for key in &self.schema.unique {
                schema.add_unique_key(&key.columns());
            }
        }

        schema.check()?;
        Ok(schema)
    }

    /// Missing-value policies for `schema`: built-in defaults, then
    /// `[missing]`, then per-column `missing` entries.
    pub fn missing_policies(&self, schema: &SchemaModel) -> Result<MissingPolicies> {
        let mut policies = MissingPolicies::defaults_for(schema);
        for (column, raw) in &self.missing {
            policies.set_raw(schema, column, raw)?;
        }
        for (column, config) in &self.columns {
            if let Some(ref raw) = config.missing {
                policies.set_raw(schema, column, raw)?;
            }
        }
        Ok(policies)
    }

    pub fn input_csv(&self) -> Option<PathBuf> {
        self.paths.input_csv.as_deref().map(|p| self.resolve(p))
    }

    pub fn output_dir(&self) -> Option<PathBuf> {
        self.paths.output_dir.as_deref().map(|p| self.resolve(p))
    }

    fn resolve(&self, path: &str) -> PathBuf {
        let path = Path::new(path);
        match self.config_dir {
            Some(ref dir) if path.is_relative() => dir.join(path),
            _ => path.to_path_buf(),
        }
    }
}

impl ColumnConfig {
    /// Translate this entry into a [`ColumnSpec`]. Does not check that the
    /// constraints fit the type; `SchemaModel::check` does that.
    pub fn spec(&self, name: &str) -> Result<ColumnSpec> {
        let invalid = |field: &str, value: &str, expected: &str| ScrubKitError::Config {
            message: format!(
                "[columns.{}] {} = '{}' is not recognized (expected {})",
                name, field, value, expected
            ),
        };

        let raw_type = self.logical_type.as_deref().ok_or_else(|| ScrubKitError::Config {
            message: format!("[columns.{}] is missing a type", name),
        })?;
        let logical_type = LogicalType::parse(raw_type).ok_or_else(|| {
            invalid("type", raw_type, "integer, decimal, string, date or categorical")
        })?;

        let mut spec = ColumnSpec::new(name, logical_type);
        spec.nullable = self.nullable.unwrap_or(true);

        if let Some(ref raw) = self.pii {
            spec.pii = Some(PiiCategory::parse(raw).ok_or_else(|| {
                invalid("pii", raw, "name, email, phone, address or date_of_birth")
            })?);
        }
        if let Some(ref raw) = self.case {
            spec.case = Some(
                CaseStyle::parse(raw).ok_or_else(|| invalid("case", raw, "title, lower or upper"))?,
            );
        }

        if self.min.is_some() || self.max.is_some() {
            spec.constraints.push(Constraint::Range {
                min: self.min,
                max: self.max,
            });
        }
        if self.min_length.is_some() || self.max_length.is_some() {
            spec.constraints.push(Constraint::Length {
                min: self.min_length,
                max: self.max_length,
            });
        }
        if let Some(ref raw) = self.char_class {
            let class = CharClass::parse(raw)
                .ok_or_else(|| invalid("char_class", raw, "alphabetic, numeric or alphanumeric"))?;
            spec.constraints.push(Constraint::CharClass(class));
        }
        if let Some(ref pattern) = self.pattern {
            spec.constraints.push(Constraint::Pattern(pattern.clone()));
        }
        if let Some(ref allowed) = self.allowed {
            spec.constraints
                .push(Constraint::AllowedValues(allowed.clone()));
        }
        if let Some(years) = self.max_age_years {
            spec.constraints.push(Constraint::MaxAge { years });
        }
        if self.not_in_future == Some(true) {
            spec.constraints.push(Constraint::NotInFuture);
        }

        if let Some(ref raw) = self.missing {
            if MissingPolicy::parse(raw, logical_type).is_none() {
                return Err(invalid("missing", raw, "drop, flag or fill:<value>"));
            }
        }

        Ok(spec)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::Value;

    #[test]
    fn test_parse_full_config() {
        let toml = r#"
[paths]
input_csv = "data/customers_raw.csv"
output_dir = "output"

[schema]
as_of = "2025-06-01"
unique = ["id", ["name", "joined"]]

[columns.id]
type = "integer"
nullable = false
min = 1

[columns.name]
type = "string"
min_length = 2
max_length = 50
char_class = "alphabetic"
pii = "name"
case = "title"
missing = "fill:Unknown"

[columns.joined]
type = "date"
not_in_future = true

[columns.tier]
type = "categorical"
allowed = ["gold", "silver"]

[missing]
tier = "drop"
"#;

        let config: ScrubKitConfig = toml::from_str(toml).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.paths.output_dir.as_deref(), Some("output"));
        assert_eq!(
            config.schema.unique,
            vec![
                KeyColumns::Single("id".to_string()),
                KeyColumns::Composite(vec!["name".to_string(), "joined".to_string()]),
            ]
        );

        let schema = config.schema_model().unwrap();
        let names: Vec<&str> = schema.column_names().collect();
        assert_eq!(names, vec!["id", "name", "joined", "tier"], "file order is kept");
        assert!(!schema.column("id").unwrap().nullable);
        assert_eq!(schema.column("name").unwrap().pii, Some(PiiCategory::Name));
        assert_eq!(schema.unique_keys.len(), 2);
        assert_eq!(
            schema.as_of,
            chrono::NaiveDate::from_ymd_opt(2025, 6, 1)
        );

        let policies = config.missing_policies(&schema).unwrap();
        assert_eq!(
            policies.get("name"),
            &MissingPolicy::FillPlaceholder("Unknown".to_string())
        );
        assert_eq!(policies.get("tier"), &MissingPolicy::Drop);
        assert_eq!(policies.get("joined"), &MissingPolicy::Flag);
    }

    #[test]
    fn test_parse_empty_config_uses_builtin_schema() {
        let config: ScrubKitConfig = toml::from_str("").unwrap();
        assert!(config.columns.is_empty());

        let schema = config.schema_model().unwrap();
        assert_eq!(schema.column_count(), 10);

        let policies = config.missing_policies(&schema).unwrap();
        assert_eq!(
            policies.get("income"),
            &MissingPolicy::FillDefault(Value::Decimal(0.0))
        );
    }

    #[test]
    fn test_missing_section_applies_to_builtin_schema() {
        let toml = r#"
[missing]
address = "drop"
"#;
        let config: ScrubKitConfig = toml::from_str(toml).unwrap();
        let schema = config.schema_model().unwrap();
        let policies = config.missing_policies(&schema).unwrap();
        assert_eq!(policies.get("address"), &MissingPolicy::Drop);
    }

    #[test]
    fn test_policy_for_unknown_column_fails() {
        let toml = r#"
[missing]
ghost = "drop"
"#;
        let config: ScrubKitConfig = toml::from_str(toml).unwrap();
        let schema = config.schema_model().unwrap();
        let err = config.missing_policies(&schema).unwrap_err();
        assert!(
            matches!(err, ScrubKitError::UnknownColumn { ref column, .. } if column == "ghost"),
            "unexpected error: {}",
            err
        );
    }

    #[test]
    fn test_unknown_type_fails_validation() {
        let toml = r#"
[columns.id]
type = "uuid"
"#;
        let config: ScrubKitConfig = toml::from_str(toml).unwrap();
        let msg = format!("{}", config.validate().unwrap_err());
        assert!(msg.contains("columns.id"), "Error should name the column: {}", msg);
        assert!(msg.contains("uuid"), "Error should quote the value: {}", msg);
    }

    #[test]
    fn test_column_without_type_fails() {
        let toml = r#"
[columns.id]
nullable = false
"#;
        let config: ScrubKitConfig = toml::from_str(toml).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_range_on_string_is_unsupported() {
        let toml = r#"
[columns.name]
type = "string"
min = 3
"#;
        let config: ScrubKitConfig = toml::from_str(toml).unwrap();
        assert!(config.validate().is_ok(), "shape is fine, semantics are not");
        let err = config.schema_model().unwrap_err();
        assert!(matches!(err, ScrubKitError::UnsupportedConstraint { .. }));
    }

    #[test]
    fn test_unique_on_undeclared_column_fails() {
        let toml = r#"
[schema]
unique = ["nope"]
"#;
        let config: ScrubKitConfig = toml::from_str(toml).unwrap();
        assert!(matches!(
            config.schema_model(),
            Err(ScrubKitError::UnknownColumn { .. })
        ));
    }

    #[test]
    fn test_repeated_unique_key_fails() {
        let toml = r#"
[schema]
unique = ["customer_id", "customer_id"]
"#;
        let config: ScrubKitConfig = toml::from_str(toml).unwrap();
        assert!(matches!(
            config.schema_model(),
            Err(ScrubKitError::Config { .. })
        ));
    }

    #[test]
    fn test_bad_as_of_fails() {
        let toml = r#"
[schema]
as_of = "June 1st"
"#;
        let config: ScrubKitConfig = toml::from_str(toml).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_bad_missing_policy_fails() {
        let toml = r#"
[columns.id]
type = "integer"
missing = "explode"
"#;
        let config: ScrubKitConfig = toml::from_str(toml).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_read_config_nonexistent() {
        let result = read_config(Path::new("/nonexistent/dir"));
        assert!(result.is_ok());
        assert!(result.unwrap().is_none());
    }

    #[test]
    fn test_read_config_from_disk_resolves_paths() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILE_NAME),
            r#"
[paths]
input_csv = "data/raw.csv"
output_dir = "/tmp/scrubkit-out"
"#,
        )
        .unwrap();

        let config = read_config(dir.path()).unwrap().unwrap();
        let expected = std::fs::canonicalize(dir.path()).unwrap();
        assert_eq!(config.config_dir.as_deref(), Some(expected.as_path()));
        assert_eq!(config.input_csv(), Some(expected.join("data/raw.csv")));
        assert_eq!(config.output_dir(), Some(PathBuf::from("/tmp/scrubkit-out")));
    }

    #[test]
    fn test_read_config_invalid_toml() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE_NAME), "this is not valid [[[toml").unwrap();
        assert!(read_config(dir.path()).is_err());
    }
}
