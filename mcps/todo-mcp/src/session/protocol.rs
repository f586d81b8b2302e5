//! The protocol side of a session: lifecycle methods and request dispatch

use std::sync::Arc;

use mcp_common::{
    invalid_params, invalid_request, sanitize, ErrorKind, InitializeParams, InvocationContext,
    JsonRpcNotification, JsonRpcRequest, LogLevel, McpError, NotificationSink, RequestId,
    ServerMessage,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::mpsc;

use super::registry::SessionRegistry;
use super::state::{CloseReason, Delivery, Session, SessionError};
use crate::server::TodoMcpServer;

#[derive(Debug, Deserialize)]
struct SetLevelParams {
    level: LogLevel,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CancelledParams {
    request_id: RequestId,
    #[serde(default)]
    reason: Option<String>,
}

/// Short-lived handle tying a session to the registry and the server
#[derive(Clone)]
pub struct ProtocolSession {
    session: Arc<Session>,
    registry: Arc<SessionRegistry>,
    server: Arc<TodoMcpServer>,
    expose_detail: bool,
}

impl ProtocolSession {
    pub fn new(
        session: Arc<Session>,
        registry: Arc<SessionRegistry>,
        server: Arc<TodoMcpServer>,
        expose_detail: bool,
    ) -> Self {
        Self {
            session,
            registry,
            server,
            expose_detail,
        }
    }

    /// Start a new session from an `initialize` request.
    ///
    /// Parameters are validated before anything is created; on success the
    /// session is already active and resolvable by its id.
    pub fn initialize(
        registry: Arc<SessionRegistry>,
        server: Arc<TodoMcpServer>,
        request: &JsonRpcRequest,
        expose_detail: bool,
    ) -> Result<(Self, ServerMessage), McpError> {
        let params: InitializeParams =
            serde_json::from_value(request.params.clone().unwrap_or(Value::Null))
                .map_err(|e| invalid_params(format!("Invalid initialize params: {}", e)))?;

        let result = serde_json::to_value(server.initialize(&params))
            .map_err(|e| sanitize(mcp_common::internal_error(e.to_string()), expose_detail))?;

        let session = registry
            .open(|session| {
                session.record_client(&params.protocol_version, params.client_info.clone())
            })
            .ok_or_else(|| invalid_request("Session could not be activated"))?;

        tracing::info!(
            session_id = %session.id(),
            client = %params.client_info.name,
            protocol_version = %params.protocol_version,
            "Client initialized"
        );

        let reply = ServerMessage::reply(request.id.clone(), Ok(result));
        Ok((
            Self::new(session, registry, server, expose_detail),
            reply,
        ))
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    pub fn id(&self) -> &str {
        self.session.id()
    }

    pub fn handle_notification(&self, method: &str, params: Option<Value>) {
        self.session.touch();
        match method {
            "notifications/initialized" => {
                tracing::debug!(session_id = %self.id(), "Client finished initialization");
            }
            "notifications/cancelled" => {
                match params.map(serde_json::from_value::<CancelledParams>) {
                    Some(Ok(cancel)) => {
                        let dropped = self.session.cancel(&cancel.request_id);
                        tracing::debug!(
                            session_id = %self.id(),
                            request_id = %cancel.request_id,
                            reason = cancel.reason.as_deref().unwrap_or(""),
                            dropped,
                            "Request cancelled by client"
                        );
                    }
                    _ => tracing::debug!(session_id = %self.id(), "Malformed cancellation ignored"),
                }
            }
            other => {
                tracing::debug!(session_id = %self.id(), method = other, "Ignoring notification");
            }
        }
    }

    /// Register `request` as pending and run it.
    ///
    /// Lifecycle methods are answered inline; everything else runs on its
    /// own task so a dropped connection never interrupts a handler.
    pub fn dispatch(&self, request: JsonRpcRequest, delivery: Delivery) -> Result<(), SessionError> {
        self.session.begin_request(request.id.clone(), delivery)?;

        let method = request.method.clone();
        match method.as_str() {
            mcp_common::jsonrpc::METHOD_INITIALIZE => {
                self.finish(
                    &request.id,
                    Err(invalid_request("Session is already initialized")),
                );
            }
            "logging/setLevel" => {
                let outcome = request
                    .params
                    .clone()
                    .ok_or_else(|| invalid_params("Missing params"))
                    .and_then(|p| {
                        serde_json::from_value::<SetLevelParams>(p)
                            .map_err(|e| invalid_params(format!("Invalid params: {}", e)))
                    })
                    .map(|p| {
                        self.session.set_log_level(p.level);
                        json!({})
                    });
                self.finish(&request.id, outcome);
            }
            _ => {
                let this = self.clone();
                tokio::spawn(async move {
                    let ctx = InvocationContext::new(this.id(), request.id.clone()).with_sink(
                        Arc::new(RequestNotifier {
                            session: this.session.clone(),
                            request_id: request.id.clone(),
                        }),
                    );
                    let outcome = this
                        .server
                        .handle_request(&request.method, request.params, ctx)
                        .await;
                    this.finish(&request.id, outcome);
                });
            }
        }
        Ok(())
    }

    fn finish(&self, id: &RequestId, outcome: Result<Value, McpError>) {
        let outcome = outcome.map_err(|error| {
            if ErrorKind::of(&error) == ErrorKind::InternalError {
                tracing::error!(
                    session_id = %self.id(),
                    request_id = %id,
                    error = %error.message,
                    "Request failed"
                );
            }
            sanitize(error, self.expose_detail)
        });

        if !self.session.complete(id, ServerMessage::reply(id.clone(), outcome)) {
            tracing::debug!(
                session_id = %self.id(),
                request_id = %id,
                "Reply dropped: request cancelled or session closed"
            );
        }
    }

    /// Open the standalone server-push stream
    pub fn open_stream(&self) -> Result<mpsc::UnboundedReceiver<ServerMessage>, SessionError> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.session.attach_stream(tx)?;
        tracing::debug!(session_id = %self.id(), "Standalone stream opened");
        Ok(rx)
    }

    pub fn terminate(&self, reason: CloseReason) -> bool {
        self.registry.terminate(self.id(), reason)
    }
}

/// Routes handler log notifications to the request's channel, honoring the
/// session's log level
struct RequestNotifier {
    session: Arc<Session>,
    request_id: RequestId,
}

impl NotificationSink for RequestNotifier {
    fn send_log(&self, level: LogLevel, logger: &str, data: Value) {
        if level < self.session.log_level() {
            return;
        }
        let message =
            ServerMessage::Notification(JsonRpcNotification::log_message(level, logger, data));
        self.session.notify(Some(&self.request_id), message);
    }
}
