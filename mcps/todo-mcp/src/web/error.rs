//! Transport-level error responses
//!
//! Every rejection on the HTTP surface is a JSON-RPC error envelope with an
//! HTTP status chosen by the kind of failure.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use mcp_common::{
    internal_error, invalid_request, invalid_session, ErrorKind, JsonRpcResponse, McpError,
    RequestId,
};

#[derive(Debug, Clone)]
pub struct ApiError {
    pub status: StatusCode,
    pub id: Option<RequestId>,
    pub error: McpError,
}

impl ApiError {
    pub fn new(status: StatusCode, error: McpError) -> Self {
        Self {
            status,
            id: None,
            error,
        }
    }

    /// Correlate with the request that caused it
    pub fn with_id(mut self, id: Option<RequestId>) -> Self {
        self.id = id;
        self
    }

    pub fn invalid_session(message: &str) -> Self {
        Self::new(StatusCode::BAD_REQUEST, invalid_session(message))
    }

    pub fn parse_error(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, ErrorKind::ParseError.error(message))
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, invalid_request(message))
    }

    pub fn not_acceptable(message: &str) -> Self {
        Self::new(StatusCode::NOT_ACCEPTABLE, invalid_request(message))
    }

    pub fn unsupported_media_type() -> Self {
        Self::new(
            StatusCode::UNSUPPORTED_MEDIA_TYPE,
            invalid_request("Unsupported Media Type: Content-Type must be application/json"),
        )
    }

    pub fn conflict(message: &str) -> Self {
        Self::new(StatusCode::CONFLICT, invalid_request(message))
    }

    pub fn route_not_found() -> Self {
        Self::new(StatusCode::NOT_FOUND, invalid_request("Not Found"))
    }

    /// Last-resort failure; the detail stays in the logs
    pub fn internal() -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            internal_error(mcp_common::error::GENERIC_INTERNAL_MESSAGE),
        )
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!(status = %self.status, message = %self.error.message, "Request failed");
        } else {
            tracing::debug!(status = %self.status, message = %self.error.message, "Request rejected");
        }
        (self.status, Json(JsonRpcResponse::failure(self.id, self.error))).into_response()
    }
}
