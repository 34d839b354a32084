//! Action error types

use thiserror::Error;

/// Errors that can occur during action execution
#[derive(Debug, Error)]
pub enum ActionError {
    #[error("Missing argument: {name}")]
    MissingArgument { name: &'static str },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{0}")]
    Failed(String),
}
