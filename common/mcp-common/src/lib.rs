//! MCP Common - Shared plumbing for session-oriented MCP servers
//!
//! This crate provides the protocol pieces a server builds on:
//!
//! - **Wire types**: JSON-RPC 2.0 messages, lifecycle payloads and log levels
//! - **Contracts**: declared input parameters checked before handlers run
//! - **Registries**: operations (tools), prompts and resources
//! - **Results**: Helper functions for creating `CallToolResult` responses
//! - **Errors**: the client-facing error taxonomy and sanitization
//! - **Initialization**: shared tracing setup
//!
//! # Example
//!
//! ```rust,ignore
//! use mcp_common::{handler_fn, structured_success, FieldType, InputContract, OperationRegistry};
//!
//! let mut operations = OperationRegistry::new();
//! operations.register_operation(
//!     "createTodo",
//!     "Create a new todo item",
//!     InputContract::new().required("title", FieldType::String, "Todo title"),
//!     None,
//!     handler_fn(|args, _ctx| async move { structured_success("Created", &args.into_inner()) }),
//! )?;
//! ```

pub mod contract;
pub mod error;
pub mod init;
pub mod jsonrpc;
pub mod registry;
pub mod resource;
pub mod result;

// Re-export commonly used items at crate root
pub use contract::{
    ContractViolation, FieldType, InputContract, OutputContract, ValidatedArguments,
};
pub use error::{
    internal_error, invalid_params, invalid_request, invalid_session, not_found, sanitize,
    unknown_operation, ErrorKind, IntoMcpError, McpResult, ResultExt,
};
pub use init::init_tracing;
pub use jsonrpc::{
    ClientMessage, DecodeError, InitializeParams, InitializeResult, JsonRpcNotification,
    JsonRpcRequest, JsonRpcResponse, LogLevel, RequestId, ServerIdentity, ServerMessage,
};
pub use registry::{
    handler_fn, InvocationContext, NotificationSink, OperationRegistry, PromptArgument,
    PromptDescriptor, PromptHandler, PromptMessage, PromptRegistry, PromptResult, RegistryError,
    Role, ToolDescriptor, ToolHandler,
};
pub use resource::{
    ResourceContents, ResourceDescriptor, ResourceReader, ResourceRegistry,
    ResourceTemplateDescriptor,
};
pub use result::structured_success;

// Re-export rmcp types that are commonly needed
pub use rmcp::{
    model::{CallToolResult, Content, ServerCapabilities},
    ErrorData as McpError,
};
