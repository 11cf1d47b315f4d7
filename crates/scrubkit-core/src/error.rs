//! # Error Types
//!
//! Defines `ScrubKitError`, the unified error enum for every failure that can
//! abort a ScrubKit run. Bad data is never an error: constraint failures,
//! unparseable values and unrepairable cells travel as structured results
//! (violations, corrections, PII matches). Only a malformed schema or a broken
//! I/O boundary ends up here.

use thiserror::Error;

/// All errors that can occur in ScrubKit operations.
#[derive(Error, Debug)]
pub enum ScrubKitError {
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Schema references unknown column '{column}' in {context}\n  Declared columns: {declared}")]
    UnknownColumn {
        column: String,
        context: String,
        declared: String,
    },

    #[error("Unsupported constraint on column '{column}': {constraint} cannot apply to a {logical_type} column")]
    UnsupportedConstraint {
        column: String,
        constraint: String,
        logical_type: String,
    },

    #[error("Input header does not match the schema\n  Expected: {expected}\n  Found:    {found}")]
    HeaderMismatch { expected: String, found: String },

    #[error("Input error at line {line}: {message}")]
    Input { line: usize, message: String },

    #[error("Read error: {message}: {source}")]
    Read {
        message: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Output error: {message}: {source}")]
    Output {
        message: String,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, ScrubKitError>;
