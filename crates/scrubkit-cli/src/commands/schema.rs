use anyhow::{Context, Result};
use comfy_table::{Cell, Table as ComfyTable};

use crate::args::{SchemaArgs, TableFormat};
use crate::report::describe_constraint;

use super::load_setup;

/// Print the effective schema: built-in or from scrubkit.toml, with the
/// missing-value policy each column ends up with.
pub fn run(args: &SchemaArgs) -> Result<()> {
    let setup = load_setup(args.config.as_deref())?;
    let schema = &setup.schema;
    let fingerprint = schema.fingerprint();

    match args.format {
        TableFormat::Json => {
            let policies: serde_json::Map<String, serde_json::Value> = setup
                .policies
                .iter()
                .map(|(col, policy)| (col.to_string(), policy.to_string().into()))
                .collect();
            let json = serde_json::json!({
                "fingerprint": fingerprint,
                "schema": schema,
                "missing": policies,
            });
            let json = serde_json::to_string_pretty(&json).context("Failed to serialize schema")?;
            println!("{}", json);
        }
        TableFormat::Table => {
            let source = if setup.config.as_ref().is_some_and(|c| !c.columns.is_empty()) {
                "scrubkit.toml"
            } else {
                "built-in customer schema"
            };
            println!("━━━ {} ({} columns) ━━━", source, schema.column_count());

            let mut t = ComfyTable::new();
            t.set_header(vec![
                "Column",
                "Type",
                "Nullable",
                "PII",
                "Case",
                "Constraints",
                "Missing",
            ]);
            for spec in schema.columns.values() {
                let constraints = spec
                    .constraints
                    .iter()
                    .map(describe_constraint)
                    .collect::<Vec<_>>()
                    .join("; ");
                t.add_row(vec![
                    Cell::new(&spec.name),
                    Cell::new(spec.logical_type.to_string()),
                    Cell::new(if spec.nullable { "YES" } else { "NO" }),
                    Cell::new(spec.pii.map(|c| c.to_string()).unwrap_or_default()),
                    Cell::new(spec.case.map(|c| c.to_string()).unwrap_or_default()),
                    Cell::new(constraints),
                    Cell::new(setup.policies.get(&spec.name).to_string()),
                ]);
            }
            println!("{}", t);

            for key in &schema.unique_keys {
                println!("Unique: ({})", key.columns.join(", "));
            }
            if let Some(as_of) = schema.as_of {
                println!("Reference date: {}", as_of);
            }
            println!("Fingerprint: {}", &fingerprint[..16]);
        }
    }
    Ok(())
}
