//! Request routing for the `/mcp` endpoint
//!
//! Every inbound message is classified by HTTP verb and session header into
//! one of three outcomes: continue an existing session, start a new one, or
//! reject. [`route`] makes that decision without side effects; the handlers
//! below act on it.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    Json,
};
use mcp_common::{ClientMessage, DecodeError, JsonRpcRequest, ServerMessage};
use serde_json::json;
use tokio::sync::{mpsc, oneshot};
use tokio_stream::{wrappers::UnboundedReceiverStream, Stream, StreamExt};

use super::error::ApiError;
use super::state::AppState;
use crate::config::{AcceptPolicy, HttpOptions};
use crate::session::{
    CloseReason, Delivery, ProtocolSession, Session, SessionError, SessionRegistry,
};

pub const SESSION_ID_HEADER: &str = "mcp-session-id";

const JSON_MIME: &str = "application/json";
const EVENT_STREAM_MIME: &str = "text/event-stream";

const NO_VALID_SESSION: &str = "Bad Request: No valid session ID provided";
const INVALID_OR_MISSING_SESSION: &str = "Invalid or missing session ID";

/// What the client is trying to do, by HTTP verb
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MethodKind {
    /// POST: deliver a message
    Send,
    /// GET: open the standalone stream
    OpenStream,
    /// DELETE: end the session
    Terminate,
}

#[derive(Debug)]
pub enum Route {
    Continue(Arc<Session>),
    Initialize,
    Reject(ApiError),
}

impl Route {
    /// For verbs that can only address an existing session
    fn into_session(self) -> Result<Arc<Session>, ApiError> {
        match self {
            Route::Continue(session) => Ok(session),
            Route::Initialize => Err(ApiError::invalid_session(INVALID_OR_MISSING_SESSION)),
            Route::Reject(error) => Err(error),
        }
    }
}

/// Decide how to handle a message. Creates no state.
pub fn route(
    registry: &SessionRegistry,
    kind: MethodKind,
    session_id: Option<&str>,
    is_initialize: bool,
) -> Route {
    let rejection = || {
        ApiError::invalid_session(match kind {
            MethodKind::Send => NO_VALID_SESSION,
            MethodKind::OpenStream | MethodKind::Terminate => INVALID_OR_MISSING_SESSION,
        })
    };

    match session_id {
        Some(id) => match registry.lookup_active(id) {
            Some(session) => Route::Continue(session),
            None => Route::Reject(rejection()),
        },
        None if kind == MethodKind::Send && is_initialize => Route::Initialize,
        None => Route::Reject(rejection()),
    }
}

/// The session header, if sent. An unreadable value still counts as sent.
fn session_header(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(SESSION_ID_HEADER)
        .map(|value| value.to_str().unwrap_or_default())
}

/// Whether the `Accept` header admits `mime`. A missing header admits nothing.
pub fn accepts(headers: &HeaderMap, mime: &str) -> bool {
    let family = mime.split('/').next().unwrap_or(mime);
    headers
        .get_all(header::ACCEPT)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .map(|item| item.split(';').next().unwrap_or_default().trim())
        .any(|item| {
            item == "*/*"
                || item.eq_ignore_ascii_case(mime)
                || item
                    .strip_suffix("/*")
                    .is_some_and(|t| t.eq_ignore_ascii_case(family))
        })
}

fn is_json_content(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(';').next())
        .is_some_and(|mime| mime.trim().eq_ignore_ascii_case(JSON_MIME))
}

/// Reply over SSE unless the server prefers JSON and the client takes it
fn wants_sse(headers: &HeaderMap, options: &HttpOptions) -> bool {
    accepts(headers, EVENT_STREAM_MIME)
        && (!options.json_response || !accepts(headers, JSON_MIME))
}

fn with_session_header(mut response: Response, session_id: &str) -> Response {
    if let Ok(value) = HeaderValue::from_str(session_id) {
        response.headers_mut().insert(SESSION_ID_HEADER, value);
    }
    response
}

fn session_rejection(error: SessionError) -> ApiError {
    match error {
        SessionError::NotActive => ApiError::invalid_session(NO_VALID_SESSION),
        SessionError::DuplicateRequest(_) => ApiError::invalid_request(error.to_string()),
        SessionError::StreamAlreadyOpen => {
            ApiError::conflict("Conflict: Only one SSE stream is allowed per session")
        }
    }
}

fn sse_response<S>(messages: S, keep_alive: Duration) -> Response
where
    S: Stream<Item = ServerMessage> + Send + 'static,
{
    let events = messages.map(|message| Event::default().event("message").json_data(message));
    Sse::new(events)
        .keep_alive(KeepAlive::new().interval(keep_alive))
        .into_response()
}

fn reply_once(headers: &HeaderMap, options: &HttpOptions, reply: ServerMessage) -> Response {
    if wants_sse(headers, options) {
        sse_response(tokio_stream::once(reply), options.keep_alive)
    } else {
        Json(reply).into_response()
    }
}

// ============================================================================
// POST /mcp
// ============================================================================

pub async fn post_message(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    match handle_post(&state, &headers, &body).await {
        Ok(response) => response,
        Err(error) => error.into_response(),
    }
}

async fn handle_post(
    state: &AppState,
    headers: &HeaderMap,
    body: &[u8],
) -> Result<Response, ApiError> {
    if !is_json_content(headers) {
        return Err(ApiError::unsupported_media_type());
    }
    if state.options.accept_policy == AcceptPolicy::Strict
        && !(accepts(headers, JSON_MIME) && accepts(headers, EVENT_STREAM_MIME))
    {
        return Err(ApiError::not_acceptable(
            "Not Acceptable: Client must accept both application/json and text/event-stream",
        ));
    }

    let session_id = session_header(headers);
    let message = ClientMessage::decode(body)
        .map_err(|error| reject_undecodable(state, session_id, error))?;
    let request_id = message.request_id().cloned();

    match route(
        &state.sessions,
        MethodKind::Send,
        session_id,
        message.is_initialize_request(),
    ) {
        Route::Reject(error) => Err(error.with_id(request_id)),
        Route::Initialize => {
            let ClientMessage::Request(request) = message else {
                return Err(ApiError::invalid_session(NO_VALID_SESSION));
            };
            let (proto, reply) = ProtocolSession::initialize(
                state.sessions.clone(),
                state.server.clone(),
                &request,
                state.options.expose_detail,
            )
            .map_err(|error| ApiError::new(StatusCode::BAD_REQUEST, error).with_id(request_id))?;

            let response = reply_once(headers, &state.options, reply);
            Ok(with_session_header(response, proto.id()))
        }
        Route::Continue(session) => {
            let proto = ProtocolSession::new(
                session,
                state.sessions.clone(),
                state.server.clone(),
                state.options.expose_detail,
            );
            let response = match message {
                ClientMessage::Notification { method, params } => {
                    proto.handle_notification(&method, params);
                    StatusCode::ACCEPTED.into_response()
                }
                ClientMessage::Response { .. } => {
                    proto.session().touch();
                    StatusCode::ACCEPTED.into_response()
                }
                ClientMessage::Request(request) => {
                    dispatch_request(state, headers, &proto, request).await?
                }
            };
            Ok(with_session_header(response, proto.id()))
        }
    }
}

async fn dispatch_request(
    state: &AppState,
    headers: &HeaderMap,
    proto: &ProtocolSession,
    request: JsonRpcRequest,
) -> Result<Response, ApiError> {
    let id = request.id.clone();

    if wants_sse(headers, &state.options) {
        let (tx, rx) = mpsc::unbounded_channel();
        proto
            .dispatch(request, Delivery::Stream(tx))
            .map_err(|error| session_rejection(error).with_id(Some(id)))?;
        return Ok(sse_response(
            UnboundedReceiverStream::new(rx),
            state.options.keep_alive,
        ));
    }

    let (tx, rx) = oneshot::channel();
    proto
        .dispatch(request, Delivery::Reply(tx))
        .map_err(|error| session_rejection(error).with_id(Some(id.clone())))?;
    match rx.await {
        Ok(reply) => Ok(Json(reply).into_response()),
        Err(_) => Err(
            ApiError::invalid_session("Request was cancelled or its session closed")
                .with_id(Some(id)),
        ),
    }
}

/// A message that cannot be decoded ends the session it was sent on
fn reject_undecodable(
    state: &AppState,
    session_id: Option<&str>,
    error: DecodeError,
) -> ApiError {
    if !matches!(error, DecodeError::Batch) {
        if let Some(session) = session_id.and_then(|id| state.sessions.lookup_active(id)) {
            tracing::warn!(session_id = %session.id(), error = %error, "Closing session after protocol error");
            state
                .sessions
                .terminate(session.id(), CloseReason::ProtocolError);
        }
    }

    if error.is_parse_error() {
        ApiError::parse_error(error.to_string())
    } else {
        ApiError::invalid_request(error.to_string())
    }
}

// ============================================================================
// GET /mcp
// ============================================================================

/// Closes the session when its standalone stream is dropped
struct DisconnectGuard {
    registry: Arc<SessionRegistry>,
    session_id: String,
}

impl Drop for DisconnectGuard {
    fn drop(&mut self) {
        if self
            .registry
            .terminate(&self.session_id, CloseReason::Disconnected)
        {
            tracing::info!(session_id = %self.session_id, "Standalone stream disconnected");
        }
    }
}

struct GuardedStream<S> {
    inner: S,
    _guard: DisconnectGuard,
}

impl<S: Stream + Unpin> Stream for GuardedStream<S> {
    type Item = S::Item;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}

pub async fn open_stream(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if state.options.accept_policy == AcceptPolicy::Strict
        && !accepts(&headers, EVENT_STREAM_MIME)
    {
        return ApiError::not_acceptable("Not Acceptable: Client must accept text/event-stream")
            .into_response();
    }

    let session = match route(
        &state.sessions,
        MethodKind::OpenStream,
        session_header(&headers),
        false,
    )
    .into_session()
    {
        Ok(session) => session,
        Err(error) => return error.into_response(),
    };

    let proto = ProtocolSession::new(
        session,
        state.sessions.clone(),
        state.server.clone(),
        state.options.expose_detail,
    );
    let rx = match proto.open_stream() {
        Ok(rx) => rx,
        Err(error) => return session_rejection(error).into_response(),
    };

    let messages = GuardedStream {
        inner: UnboundedReceiverStream::new(rx),
        _guard: DisconnectGuard {
            registry: state.sessions.clone(),
            session_id: proto.id().to_string(),
        },
    };
    with_session_header(
        sse_response(messages, state.options.keep_alive),
        proto.id(),
    )
}

// ============================================================================
// DELETE /mcp
// ============================================================================

pub async fn terminate_session(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let session = match route(
        &state.sessions,
        MethodKind::Terminate,
        session_header(&headers),
        false,
    )
    .into_session()
    {
        Ok(session) => session,
        Err(error) => return error.into_response(),
    };

    let session_id = session.id().to_string();
    state
        .sessions
        .terminate(&session_id, CloseReason::Terminated);
    Json(json!({ "status": "terminated", "sessionId": session_id })).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(accept: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::ACCEPT, HeaderValue::from_str(accept).unwrap());
        headers
    }

    #[test]
    fn test_route_decisions() {
        let registry = SessionRegistry::new();
        let session = registry.create();
        registry.activate(session.id()).unwrap();

        assert!(matches!(
            route(&registry, MethodKind::Send, Some(session.id()), false),
            Route::Continue(_)
        ));
        assert!(matches!(
            route(&registry, MethodKind::Send, None, true),
            Route::Initialize
        ));
        // Initialization never rides on an unknown id
        assert!(matches!(
            route(&registry, MethodKind::Send, Some("stale"), true),
            Route::Reject(_)
        ));
        assert!(matches!(
            route(&registry, MethodKind::Send, None, false),
            Route::Reject(_)
        ));
        assert!(matches!(
            route(&registry, MethodKind::OpenStream, None, true),
            Route::Reject(_)
        ));
        assert!(matches!(
            route(&registry, MethodKind::Terminate, Some(session.id()), false),
            Route::Continue(_)
        ));
        // Routing alone never creates sessions
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_closed_session_is_rejected() {
        let registry = SessionRegistry::new();
        let session = registry.create();
        registry.activate(session.id()).unwrap();
        registry.terminate(session.id(), CloseReason::Terminated);

        match route(&registry, MethodKind::Send, Some(session.id()), false) {
            Route::Reject(error) => {
                assert_eq!(error.status, StatusCode::BAD_REQUEST);
                assert_eq!(error.error.message, NO_VALID_SESSION);
            }
            other => panic!("expected rejection, got {:?}", other),
        }
    }

    #[test]
    fn test_accept_matching() {
        let both = headers("application/json, text/event-stream");
        assert!(accepts(&both, JSON_MIME));
        assert!(accepts(&both, EVENT_STREAM_MIME));

        let wildcard = headers("*/*");
        assert!(accepts(&wildcard, EVENT_STREAM_MIME));

        let family = headers("text/*;q=0.5");
        assert!(accepts(&family, EVENT_STREAM_MIME));
        assert!(!accepts(&family, JSON_MIME));

        assert!(!accepts(&HeaderMap::new(), JSON_MIME));
    }

    #[test]
    fn test_reply_channel_selection() {
        let both = headers("application/json, text/event-stream");
        let mut options = HttpOptions::default();
        assert!(wants_sse(&both, &options));

        options.json_response = true;
        assert!(!wants_sse(&both, &options));
        // A client that only takes SSE still gets SSE
        assert!(wants_sse(&headers("text/event-stream"), &options));
        assert!(!wants_sse(&headers("application/json"), &options));
    }

    #[test]
    fn test_content_type_check() {
        let mut h = HeaderMap::new();
        assert!(!is_json_content(&h));
        h.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json; charset=utf-8"),
        );
        assert!(is_json_content(&h));
    }
}
