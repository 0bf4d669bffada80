//! Error types for the command-line front end.

use lifecycles::LifecycleError;

/// All errors that can occur while running a command.
#[derive(thiserror::Error, Debug)]
pub enum CliError {
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid JSON input: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Unknown element in attribute '{attribute}': {element}")]
    UnknownElement { attribute: String, element: String },
}

pub type CliResult<T> = Result<T, CliError>;
