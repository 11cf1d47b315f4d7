use anyhow::{Context, Result};
use comfy_table::{Cell, Table as ComfyTable};

use scrubkit_core::pii::{classify_pii, PiiResult};
use scrubkit_core::schema::PiiCategory;

use crate::args::{PiiArgs, TableFormat};

use super::{load_setup, load_table, resolve_input};

/// Report PII coverage per category over the input as-is.
pub fn run(args: &PiiArgs) -> Result<()> {
    let setup = load_setup(args.config.as_deref())?;
    let input = resolve_input(args.input.as_deref(), setup.config.as_ref())?;
    let table = load_table(&input, &setup.schema)?;

    let result = classify_pii(&table, &setup.schema);

    match args.format {
        TableFormat::Json => {
            let json =
                serde_json::to_string_pretty(&result).context("Failed to serialize PII result")?;
            println!("{}", json);
        }
        TableFormat::Table => {
            let mut t = ComfyTable::new();
            t.set_header(vec!["Category", "Columns", "Rows matched", "Coverage"]);
            for (category, stats) in &result.per_category {
                t.add_row(vec![
                    Cell::new(category.to_string()),
                    Cell::new(columns_for(&result, *category)),
                    Cell::new(format!("{}/{}", stats.matched_count, result.total_rows)),
                    Cell::new(format!("{:.1}%", stats.percentage)),
                ]);
            }
            println!("{}", t);
            println!(
                "\nHigh-risk rows: {}  Exposure risk: {}",
                result.high_risk_rows.len(),
                result.risk
            );
        }
    }
    Ok(())
}

fn columns_for(result: &PiiResult, category: PiiCategory) -> String {
    result
        .columns
        .iter()
        .filter(|(_, c)| **c == category)
        .map(|(name, _)| name.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}
