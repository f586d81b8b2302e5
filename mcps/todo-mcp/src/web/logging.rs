//! HTTP request logging
//!
//! [`assign_request_id`] tags each request with the client's
//! `mcp-request-id` (or a generated one) and echoes it on the response. The
//! `TraceLayer` hooks below open one span per request carrying that id and
//! record status and latency when the response is ready.

use std::time::Duration;

use axum::{
    body::Body,
    extract::Request,
    http::{HeaderValue, Response},
    middleware::Next,
};
use tracing::Span;

pub const REQUEST_ID_HEADER: &str = "mcp-request-id";

/// Correlation tag for one HTTP request
#[derive(Debug, Clone)]
pub struct RequestTag(pub String);

pub async fn assign_request_id(mut request: Request, next: Next) -> Response<Body> {
    let tag = request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| uuid::Uuid::new_v4().simple().to_string()[..8].to_string());

    request.extensions_mut().insert(RequestTag(tag.clone()));
    let mut response = next.run(request).await;
    if let Ok(value) = HeaderValue::from_str(&tag) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}

pub fn make_span(request: &Request) -> Span {
    let tag = request
        .extensions()
        .get::<RequestTag>()
        .map(|t| t.0.as_str())
        .unwrap_or("-");
    let session_id = request
        .headers()
        .get(crate::web::router::SESSION_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("-");

    tracing::info_span!(
        "http",
        request_id = %tag,
        method = %request.method(),
        path = %request.uri().path(),
        session_id = %session_id,
    )
}

pub fn on_request(_request: &Request, _span: &Span) {
    tracing::debug!("Request started");
}

pub fn on_response(response: &Response<Body>, latency: Duration, _span: &Span) {
    let status = response.status();
    let latency_ms = latency.as_millis() as u64;
    if status.is_server_error() {
        tracing::error!(status = status.as_u16(), latency_ms, "Request completed with errors");
    } else if status.is_client_error() {
        tracing::warn!(status = status.as_u16(), latency_ms, "Request rejected");
    } else {
        tracing::info!(status = status.as_u16(), latency_ms, "Request completed");
    }
}
