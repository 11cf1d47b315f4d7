pub mod pii;
pub mod run;
pub mod schema;
pub mod validate;

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};

use scrubkit_core::clean::MissingPolicies;
use scrubkit_core::config::{read_config, read_config_file, ScrubKitConfig};
use scrubkit_core::io::read_table;
use scrubkit_core::schema::SchemaModel;
use scrubkit_core::table::Table;

/// Config, schema and policies for one invocation.
pub struct Setup {
    pub config: Option<ScrubKitConfig>,
    pub schema: SchemaModel,
    pub policies: MissingPolicies,
}

/// Load an explicit config file, or ./scrubkit.toml when present, and build
/// the schema and policies from it (built-in defaults without one).
pub fn load_setup(config_path: Option<&Path>) -> Result<Setup> {
    let config = match config_path {
        Some(path) => Some(
            read_config_file(path)
                .with_context(|| format!("Failed to load config {}", path.display()))?,
        ),
        None => read_config(Path::new("."))?,
    };

    let config_ref = config.as_ref();
    let default_config = ScrubKitConfig::default();
    let effective = config_ref.unwrap_or(&default_config);
    let schema = effective.schema_model()?;
    let policies = effective.missing_policies(&schema)?;

    Ok(Setup {
        config,
        schema,
        policies,
    })
}

/// CLI flag first, then `[paths] input_csv`.
pub fn resolve_input(explicit: Option<&Path>, config: Option<&ScrubKitConfig>) -> Result<PathBuf> {
    if let Some(path) = explicit {
        return Ok(path.to_path_buf());
    }
    if let Some(path) = config.and_then(|c| c.input_csv()) {
        return Ok(path);
    }
    bail!("No input CSV given. Pass --input, set SCRUBKIT_INPUT, or add [paths] input_csv to scrubkit.toml.")
}

pub fn load_table(path: &Path, schema: &SchemaModel) -> Result<Table> {
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let mut reader = BufReader::new(file);
    let table = read_table(&mut reader, schema)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    tracing::info!(rows = table.len(), path = %path.display(), "loaded input");
    Ok(table)
}
