//! Store and domain errors

use mcp_common::{internal_error, not_found, IntoMcpError, McpError};
use std::path::PathBuf;

pub type TodoResult<T> = Result<T, TodoError>;

#[derive(Debug, thiserror::Error)]
pub enum TodoError {
    #[error("Todo with ID {0} not found")]
    NotFound(String),

    #[error("Failed to access store at {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Store at {path:?} is not a valid todo document: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to encode todo document: {0}")]
    Encode(#[from] serde_json::Error),
}

impl IntoMcpError for TodoError {
    fn into_mcp_error(self) -> McpError {
        match self {
            TodoError::NotFound(_) => not_found(self.to_string()),
            other => {
                tracing::error!(error = %other, "Todo store failure");
                internal_error(other.to_string())
            }
        }
    }
}
