use anyhow::{Context, Result};
use comfy_table::{Cell, Table as ComfyTable};

use scrubkit_core::validate::validate;

use crate::args::{TableFormat, ValidateArgs};

use super::{load_setup, load_table, resolve_input};

/// Validate the input as-is and print every violation.
///
/// Exits 1 when any row fails, so the command can gate a CI step.
pub fn run(args: &ValidateArgs) -> Result<()> {
    let setup = load_setup(args.config.as_deref())?;
    let input = resolve_input(args.input.as_deref(), setup.config.as_ref())?;
    let table = load_table(&input, &setup.schema)?;

    let result = validate(&table, &setup.schema)?;

    match args.format {
        TableFormat::Json => {
            let json = serde_json::to_string_pretty(&result)
                .context("Failed to serialize validation result")?;
            println!("{}", json);
        }
        TableFormat::Table => {
            if result.violations.is_empty() {
                println!("✓ {} rows, no violations", result.total_rows);
                return Ok(());
            }

            let mut t = ComfyTable::new();
            t.set_header(vec!["Row", "Column", "Rule", "Value", "Reason"]);
            for v in result.violations.iter().take(args.limit) {
                t.add_row(vec![
                    Cell::new(v.row_index + 1),
                    Cell::new(&v.column),
                    Cell::new(v.rule.to_string()),
                    Cell::new(v.observed.to_string()),
                    Cell::new(&v.reason),
                ]);
            }
            println!("{}", t);

            if result.violations.len() > args.limit {
                println!(
                    "... {} more violations (raise --limit to see them)",
                    result.violations.len() - args.limit
                );
            }
            println!(
                "\n{} of {} rows passed ({:.1}%), {} violations",
                result.pass_count,
                result.total_rows,
                result.pass_rate(),
                result.violations.len()
            );
        }
    }

    if !result.is_clean() {
        std::process::exit(1);
    }
    Ok(())
}
