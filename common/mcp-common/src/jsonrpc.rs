//! JSON-RPC 2.0 wire types for MCP over HTTP
//!
//! Inbound bodies decode into a [`ClientMessage`]; everything the server
//! writes back (replies and notifications) is a [`ServerMessage`].

use std::fmt;

use rmcp::model::ServerCapabilities;
use rmcp::ErrorData as McpError;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

pub const JSONRPC_VERSION: &str = "2.0";

/// Newest protocol revision this server speaks.
pub const LATEST_PROTOCOL_VERSION: &str = "2025-06-18";

/// Revisions accepted during initialization, newest first.
pub const SUPPORTED_PROTOCOL_VERSIONS: &[&str] = &["2025-06-18", "2025-03-26", "2024-11-05"];

pub const METHOD_INITIALIZE: &str = "initialize";

/// Correlation identifier of a request
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestId {
    Number(i64),
    String(String),
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestId::Number(n) => write!(f, "{}", n),
            RequestId::String(s) => f.write_str(s),
        }
    }
}

// ============================================================================
// Inbound
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("Parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Batched JSON-RPC messages are not supported")]
    Batch,

    #[error("Invalid JSON-RPC message: {0}")]
    Invalid(&'static str),
}

impl DecodeError {
    /// Malformed JSON is a parse error; everything else is a well-formed but
    /// unacceptable request.
    pub fn is_parse_error(&self) -> bool {
        matches!(self, DecodeError::Json(_))
    }
}

#[derive(Debug, Deserialize)]
struct RawMessage {
    jsonrpc: String,
    #[serde(default)]
    id: Option<RequestId>,
    #[serde(default)]
    method: Option<String>,
    #[serde(default)]
    params: Option<Value>,
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<Value>,
}

/// A request expecting a correlated reply
#[derive(Debug, Clone, PartialEq)]
pub struct JsonRpcRequest {
    pub id: RequestId,
    pub method: String,
    pub params: Option<Value>,
}

/// A decoded inbound message
#[derive(Debug, Clone, PartialEq)]
pub enum ClientMessage {
    Request(JsonRpcRequest),
    Notification {
        method: String,
        params: Option<Value>,
    },
    /// A client's reply to a server-initiated request
    Response { id: Option<RequestId> },
}

impl ClientMessage {
    pub fn decode(bytes: &[u8]) -> Result<Self, DecodeError> {
        let value: Value = serde_json::from_slice(bytes)?;
        if value.is_array() {
            return Err(DecodeError::Batch);
        }
        let raw: RawMessage =
            serde_json::from_value(value).map_err(|_| DecodeError::Invalid("not a JSON-RPC object"))?;
        if raw.jsonrpc != JSONRPC_VERSION {
            return Err(DecodeError::Invalid("jsonrpc must be \"2.0\""));
        }

        match (raw.id, raw.method) {
            (Some(id), Some(method)) => Ok(ClientMessage::Request(JsonRpcRequest {
                id,
                method,
                params: raw.params,
            })),
            (None, Some(method)) => Ok(ClientMessage::Notification {
                method,
                params: raw.params,
            }),
            (id, None) if raw.result.is_some() || raw.error.is_some() => {
                Ok(ClientMessage::Response { id })
            }
            _ => Err(DecodeError::Invalid("missing method")),
        }
    }

    /// Initialization is recognized by shape: a request (with an id) whose
    /// method is `initialize`.
    pub fn is_initialize_request(&self) -> bool {
        matches!(self, ClientMessage::Request(req) if req.method == METHOD_INITIALIZE)
    }

    pub fn request_id(&self) -> Option<&RequestId> {
        match self {
            ClientMessage::Request(req) => Some(&req.id),
            ClientMessage::Response { id } => id.as_ref(),
            ClientMessage::Notification { .. } => None,
        }
    }
}

// ============================================================================
// Outbound
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: &'static str,
    pub id: Option<RequestId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<McpError>,
}

impl JsonRpcResponse {
    pub fn success(id: RequestId, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            id: Some(id),
            result: Some(result),
            error: None,
        }
    }

    pub fn failure(id: Option<RequestId>, error: McpError) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            id,
            result: None,
            error: Some(error),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcNotification {
    pub jsonrpc: &'static str,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl JsonRpcNotification {
    pub fn new(method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            method: method.into(),
            params,
        }
    }

    /// `notifications/message` carrying a log record for the client
    pub fn log_message(level: LogLevel, logger: &str, data: Value) -> Self {
        Self::new(
            "notifications/message",
            Some(json!({ "level": level, "logger": logger, "data": data })),
        )
    }
}

/// Anything the server writes to a client channel
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ServerMessage {
    Response(JsonRpcResponse),
    Notification(JsonRpcNotification),
}

impl ServerMessage {
    pub fn reply(id: RequestId, outcome: Result<Value, McpError>) -> Self {
        match outcome {
            Ok(result) => ServerMessage::Response(JsonRpcResponse::success(id, result)),
            Err(error) => ServerMessage::Response(JsonRpcResponse::failure(Some(id), error)),
        }
    }

    pub fn is_response(&self) -> bool {
        matches!(self, ServerMessage::Response(_))
    }
}

/// Client-facing log severity, ordered from least to most severe
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    #[default]
    Info,
    Notice,
    Warning,
    Error,
    Critical,
    Alert,
    Emergency,
}

// ============================================================================
// Lifecycle
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientInfo {
    pub name: String,
    #[serde(default)]
    pub version: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeParams {
    pub protocol_version: String,
    #[serde(default)]
    pub capabilities: Value,
    pub client_info: ClientInfo,
}

#[derive(Debug, Clone, Serialize)]
pub struct ServerIdentity {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub version: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeResult {
    pub protocol_version: String,
    pub capabilities: ServerCapabilities,
    pub server_info: ServerIdentity,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
}

/// Echo the client's revision when supported, otherwise offer the latest.
pub fn negotiate_protocol_version(requested: &str) -> &'static str {
    SUPPORTED_PROTOCOL_VERSIONS
        .iter()
        .copied()
        .find(|v| *v == requested)
        .unwrap_or(LATEST_PROTOCOL_VERSION)
}
