//! Tracing initialization shared by MCP server binaries

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize tracing/logging for an MCP server
///
/// Logs go to stderr with:
/// - Environment-based filtering via RUST_LOG
/// - Default level `info` for every crate named in `crates`
/// - ANSI colors only when stderr is a terminal
///
/// Set `LOG_FORMAT=json` for structured JSON output (useful for production/log aggregation).
///
/// # Example
///
/// ```rust,ignore
/// mcp_common::init_tracing(&["todo_mcp", "mcp_common", "tower_http"])?;
/// ```
pub fn init_tracing(crates: &[&str]) -> anyhow::Result<()> {
    let mut filter = EnvFilter::from_default_env();
    for name in crates {
        filter = filter.add_directive(format!("{}=info", name).parse()?);
    }

    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(filter);

    if use_json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_writer(std::io::stderr),
            )
            .try_init()?;
    } else {
        use std::io::IsTerminal;
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_ansi(std::io::stderr().is_terminal()),
            )
            .try_init()?;
    }

    Ok(())
}
