//! Todo MCP Library
//!
//! A todo list exposed as MCP tools, resources and a prompt, served over the
//! streamable HTTP transport with per-client sessions.
//!
//! # Usage as Library
//!
//! ```rust,ignore
//! use todo_mcp::{repository::TodoRepository, TodoMcpServer};
//!
//! let repository = TodoRepository::new("db.json");
//! repository.init().await?;
//! let server = TodoMcpServer::new(repository)?;
//! ```
//!
//! - Todos persist in a single JSON document, rewritten atomically
//! - Each client session gets its own reply channels and log level

pub mod config;
pub mod error;
pub mod handlers;
pub mod params;
pub mod repository;
pub mod resources;
pub mod server;
pub mod session;
#[cfg(test)]
pub mod tests;
pub mod types;
pub mod web;

// Re-export main server type
pub use server::TodoMcpServer;

// Re-export parameter types for direct API usage
pub use params::*;
