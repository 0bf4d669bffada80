//! Lifecycles CLI — ingest temporal partitions and report flows, facets and events.

pub mod config;
pub mod error;
pub mod report;

pub use config::resolve_model_path;
pub use error::{CliError, CliResult};
pub use report::AttributeSource;
