//! Streamable HTTP transport
//!
//! One endpoint, `/mcp`, carries the whole protocol: POST delivers client
//! messages, GET opens the standalone server stream, DELETE ends the session.

pub mod error;
pub mod logging;
pub mod router;
pub mod state;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use axum::{
    body::Body,
    http::{header::HeaderName, Response},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::session::{CloseReason, SessionRegistry};
use error::ApiError;
pub use state::AppState;

/// Build the router with all routes and middleware
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
        .expose_headers([
            HeaderName::from_static(router::SESSION_ID_HEADER),
            HeaderName::from_static(logging::REQUEST_ID_HEADER),
        ]);

    Router::new()
        .route(
            "/mcp",
            post(router::post_message)
                .get(router::open_stream)
                .delete(router::terminate_session),
        )
        .route("/health", get(health))
        .fallback(fallback)
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(logging::make_span)
                .on_request(logging::on_request)
                .on_response(logging::on_response),
        )
        .layer(cors)
        .layer(axum::middleware::from_fn(logging::assign_request_id))
        .with_state(state)
}

/// Bind and serve until Ctrl-C
pub async fn serve(bind: SocketAddr, state: AppState) -> Result<()> {
    let sessions = state.sessions.clone();
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(bind).await?;
    tracing::info!("Todo MCP server listening on http://{}/mcp", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(sessions))
        .await?;

    tracing::info!("Todo MCP server stopped");
    Ok(())
}

/// Open streams never finish on their own, so sessions close before draining
async fn shutdown_signal(sessions: Arc<SessionRegistry>) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        return;
    }
    let closed = sessions.close_all(CloseReason::Shutdown);
    tracing::info!(closed, "Shutting down");
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

async fn fallback() -> ApiError {
    ApiError::route_not_found()
}

fn panic_response(panic: Box<dyn std::any::Any + Send + 'static>) -> Response<Body> {
    let detail = panic
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| panic.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    tracing::error!(panic = %detail, "Handler panicked");
    ApiError::internal().into_response()
}
