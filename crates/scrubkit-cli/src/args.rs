use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser, Debug)]
#[command(
    name = "scrubkit",
    about = "Validate, clean, and mask PII in tabular customer data",
    version,
    after_help = "Examples:\n  scrubkit run --input data/customers_raw.csv --output-dir output\n  scrubkit run                               # paths from scrubkit.toml\n  scrubkit validate --input data/customers_raw.csv\n  scrubkit pii --input data/customers_raw.csv\n  scrubkit schema --config scrubkit.toml"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Profile, validate, clean, classify and mask a dataset, writing every report
    Run(RunArgs),

    /// Validate a dataset against the schema without changing it
    Validate(ValidateArgs),

    /// Report PII exposure per category
    Pii(PiiArgs),

    /// Print the effective schema
    Schema(SchemaArgs),
}

#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Raw input CSV
    /// Falls back to SCRUBKIT_INPUT or [paths] input_csv in scrubkit.toml
    #[arg(short, long, env = "SCRUBKIT_INPUT")]
    pub input: Option<PathBuf>,

    /// Directory the cleaned/masked CSVs and reports are written to
    #[arg(short, long, env = "SCRUBKIT_OUTPUT_DIR")]
    pub output_dir: Option<PathBuf>,

    /// Config file (default: ./scrubkit.toml if present)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Report format for the run summary
    #[arg(long, default_value = "text")]
    pub format: ReportFormat,

    /// Rows shown before/after in masked_sample.txt
    #[arg(long, default_value = "2")]
    pub sample_rows: usize,
}

#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Input CSV
    #[arg(short, long, env = "SCRUBKIT_INPUT")]
    pub input: Option<PathBuf>,

    /// Config file (default: ./scrubkit.toml if present)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Maximum number of violations to print
    #[arg(long, default_value = "50")]
    pub limit: usize,

    /// Output format
    #[arg(long, default_value = "table")]
    pub format: TableFormat,
}

#[derive(Parser, Debug)]
pub struct PiiArgs {
    /// Input CSV
    #[arg(short, long, env = "SCRUBKIT_INPUT")]
    pub input: Option<PathBuf>,

    /// Config file (default: ./scrubkit.toml if present)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(long, default_value = "table")]
    pub format: TableFormat,
}

#[derive(Parser, Debug)]
pub struct SchemaArgs {
    /// Config file (default: ./scrubkit.toml if present)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(long, default_value = "table")]
    pub format: TableFormat,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum ReportFormat {
    Text,
    Json,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum TableFormat {
    Table,
    Json,
}
