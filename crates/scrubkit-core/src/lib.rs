pub mod clean;
pub mod config;
pub mod error;
pub mod io;
pub mod mask;
pub mod pii;
pub mod pipeline;
pub mod profile;
pub mod schema;
pub mod table;
pub mod validate;

// Re-export key types for convenience
pub use clean::{clean, CleanResult, MissingPolicies, MissingPolicy};
pub use error::{Result, ScrubKitError};
pub use mask::{mask, MaskedTable};
pub use pii::{classify_pii, PiiResult};
pub use pipeline::{Pipeline, PipelineReport};
pub use schema::SchemaModel;
pub use table::{Record, Table, Value};
pub use validate::{validate, ValidationResult};
