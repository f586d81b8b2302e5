//! Todo MCP - todo list management over streamable HTTP
//!
//! Serves `/mcp` on the configured address and persists todos to a JSON file.

use std::sync::Arc;

use clap::Parser;
use todo_mcp::config::{Cli, ServerConfig};
use todo_mcp::repository::TodoRepository;
use todo_mcp::session::{spawn_idle_sweeper, SessionRegistry};
use todo_mcp::web::{self, AppState};
use todo_mcp::TodoMcpServer;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    mcp_common::init_tracing(&["todo_mcp", "mcp_common", "tower_http"])?;

    let config = ServerConfig::resolve(Cli::parse())?;

    tracing::info!("Starting Todo MCP server");

    let repository = TodoRepository::new(config.db_path.clone());
    repository.init().await?;
    tracing::info!("Todo store at {}", config.db_path.display());

    let server = Arc::new(TodoMcpServer::new(repository)?);
    let sessions = Arc::new(SessionRegistry::new());

    if let Some(timeout) = config.session_idle {
        spawn_idle_sweeper(sessions.clone(), timeout);
    }

    let state = AppState::new(sessions, server, config.http);
    web::serve(config.bind, state).await
}
