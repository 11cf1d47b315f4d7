//! Boundary adapters between tables and persistent formats.

pub mod csv;

pub use self::csv::{read_table, write_table};
