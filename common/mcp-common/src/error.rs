//! Error handling utilities for MCP servers
//!
//! Every failure that reaches a client is an [`McpError`] whose code is drawn
//! from the fixed [`ErrorKind`] enumeration. Helpers here build those errors,
//! convert library errors into them, and strip internal detail before an
//! error leaves the process.

use rmcp::model::ErrorCode;
use rmcp::ErrorData as McpError;
use serde_json::json;

/// Type alias for MCP tool results
pub type McpResult<T> = Result<T, McpError>;

/// JSON-RPC code used for requests that do not resolve to an active session.
pub const INVALID_SESSION: ErrorCode = ErrorCode(-32000);

/// Message shown to clients in place of internal error detail.
pub const GENERIC_INTERNAL_MESSAGE: &str = "Internal error";

/// The error taxonomy surfaced to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Missing, unknown, or closed session id
    InvalidSession,
    /// Malformed JSON
    ParseError,
    /// Well-formed JSON that is not an acceptable request
    InvalidRequest,
    /// Operation or method name that nothing is registered under
    UnknownOperation,
    /// Arguments rejected by an input contract
    InvalidArguments,
    /// Referenced domain entity does not exist
    NotFound,
    /// Unexpected failure in storage or handler logic
    InternalError,
}

impl ErrorKind {
    pub fn code(self) -> ErrorCode {
        match self {
            ErrorKind::InvalidSession => INVALID_SESSION,
            ErrorKind::ParseError => ErrorCode::PARSE_ERROR,
            ErrorKind::InvalidRequest => ErrorCode::INVALID_REQUEST,
            ErrorKind::UnknownOperation => ErrorCode::METHOD_NOT_FOUND,
            ErrorKind::InvalidArguments => ErrorCode::INVALID_PARAMS,
            ErrorKind::NotFound => ErrorCode::RESOURCE_NOT_FOUND,
            ErrorKind::InternalError => ErrorCode::INTERNAL_ERROR,
        }
    }

    /// Classify an error by its code. Unrecognized codes count as internal.
    pub fn of(error: &McpError) -> Self {
        match error.code {
            c if c == INVALID_SESSION => ErrorKind::InvalidSession,
            c if c == ErrorCode::PARSE_ERROR => ErrorKind::ParseError,
            c if c == ErrorCode::INVALID_REQUEST => ErrorKind::InvalidRequest,
            c if c == ErrorCode::METHOD_NOT_FOUND => ErrorKind::UnknownOperation,
            c if c == ErrorCode::INVALID_PARAMS => ErrorKind::InvalidArguments,
            c if c == ErrorCode::RESOURCE_NOT_FOUND => ErrorKind::NotFound,
            _ => ErrorKind::InternalError,
        }
    }

    pub fn error(self, message: impl Into<String>) -> McpError {
        McpError::new(self.code(), message.into(), None)
    }
}

/// Trait for converting errors into MCP-compatible errors
///
/// Implement this trait for library error types so handlers can use
/// [`ResultExt::to_mcp_err`] instead of hand-written `map_err` calls.
///
/// # Example
///
/// ```rust,ignore
/// use mcp_common::{IntoMcpError, not_found, internal_error};
///
/// impl IntoMcpError for StoreError {
///     fn into_mcp_error(self) -> McpError {
///         match self {
///             StoreError::Missing(id) => not_found(format!("No record {id}")),
///             other => internal_error(other.to_string()),
///         }
///     }
/// }
/// ```
pub trait IntoMcpError {
    /// Convert this error into an MCP error
    fn into_mcp_error(self) -> McpError;
}

impl IntoMcpError for std::io::Error {
    fn into_mcp_error(self) -> McpError {
        internal_error(format!("IO error: {}", self))
    }
}

impl IntoMcpError for serde_json::Error {
    fn into_mcp_error(self) -> McpError {
        internal_error(format!("JSON error: {}", self))
    }
}

impl IntoMcpError for anyhow::Error {
    fn into_mcp_error(self) -> McpError {
        internal_error(format!("{:#}", self))
    }
}

/// Extension trait for Result types to convert to MCP errors
pub trait ResultExt<T> {
    /// Convert the error to an MCP error
    fn to_mcp_err(self) -> Result<T, McpError>;
}

impl<T, E: IntoMcpError> ResultExt<T> for Result<T, E> {
    fn to_mcp_err(self) -> Result<T, McpError> {
        self.map_err(|e| e.into_mcp_error())
    }
}

/// Create an internal error with a message
///
/// The message is server-side detail; [`sanitize`] replaces it before the
/// error is sent unless detail exposure is enabled.
pub fn internal_error(message: impl Into<String>) -> McpError {
    ErrorKind::InternalError.error(message)
}

/// Create an invalid params error with a message
pub fn invalid_params(message: impl Into<String>) -> McpError {
    ErrorKind::InvalidArguments.error(message)
}

/// Create a not-found error for a missing domain entity or resource
pub fn not_found(message: impl Into<String>) -> McpError {
    ErrorKind::NotFound.error(message)
}

/// Create the error returned for an operation name with no registration
pub fn unknown_operation(name: &str) -> McpError {
    ErrorKind::UnknownOperation.error(format!("Unknown operation: {}", name))
}

/// Create the error returned for a missing, unknown, or closed session
pub fn invalid_session(message: impl Into<String>) -> McpError {
    ErrorKind::InvalidSession.error(message)
}

/// Create an invalid request error
pub fn invalid_request(message: impl Into<String>) -> McpError {
    ErrorKind::InvalidRequest.error(message)
}

/// Prepare an error for the wire.
///
/// Internal errors lose their message (and any data) unless `expose_detail`
/// is set, in which case the original message moves to `data.detail`. All
/// other kinds pass through untouched.
pub fn sanitize(error: McpError, expose_detail: bool) -> McpError {
    if ErrorKind::of(&error) != ErrorKind::InternalError {
        return error;
    }
    let data = expose_detail.then(|| json!({ "detail": error.message }));
    McpError::new(error.code, GENERIC_INTERNAL_MESSAGE, data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_result_ext() {
        let result: Result<(), std::io::Error> =
            Err(std::io::Error::new(std::io::ErrorKind::NotFound, "not found"));
        let err = result.to_mcp_err().unwrap_err();
        assert_eq!(ErrorKind::of(&err), ErrorKind::InternalError);
        assert!(err.message.contains("not found"));
    }

    #[test]
    fn test_kind_round_trips_through_code() {
        for kind in [
            ErrorKind::InvalidSession,
            ErrorKind::ParseError,
            ErrorKind::InvalidRequest,
            ErrorKind::UnknownOperation,
            ErrorKind::InvalidArguments,
            ErrorKind::NotFound,
            ErrorKind::InternalError,
        ] {
            assert_eq!(ErrorKind::of(&kind.error("x")), kind);
        }
    }

    #[test]
    fn test_unknown_operation_names_the_operation() {
        let err = unknown_operation("frobnicate");
        assert_eq!(err.code, ErrorCode::METHOD_NOT_FOUND);
        assert!(err.message.contains("frobnicate"));
    }

    #[test]
    fn test_sanitize_hides_internal_detail() {
        let err = sanitize(internal_error("disk on fire at /var/db.json"), false);
        assert_eq!(err.message, GENERIC_INTERNAL_MESSAGE);
        assert!(err.data.is_none());
    }

    #[test]
    fn test_sanitize_exposes_detail_in_dev_mode() {
        let err = sanitize(internal_error("disk on fire"), true);
        assert_eq!(err.message, GENERIC_INTERNAL_MESSAGE);
        assert_eq!(err.data.unwrap()["detail"], "disk on fire");
    }

    #[test]
    fn test_sanitize_keeps_client_errors() {
        let err = sanitize(invalid_params("title must be a string"), false);
        assert_eq!(err.message, "title must be a string");
    }
}
