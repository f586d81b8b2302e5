//! Per-client session state
//!
//! A [`Session`] owns the delivery channels of one client conversation: the
//! channel chosen for each in-flight request and the optional standalone
//! stream opened with GET. All state sits behind one non-async mutex that is
//! never held across an await, so every transition is atomic.

use std::collections::HashMap;
use std::fmt;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use mcp_common::jsonrpc::ClientInfo;
use mcp_common::{LogLevel, RequestId, ServerMessage};
use parking_lot::Mutex;
use tokio::sync::{mpsc, oneshot};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Uninitialized,
    Active,
    Closed,
}

/// Why a session was closed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    /// Client sent DELETE
    Terminated,
    /// Standalone stream went away
    Disconnected,
    /// Undecodable message on the session
    ProtocolError,
    IdleTimeout,
    Shutdown,
}

impl CloseReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            CloseReason::Terminated => "terminated",
            CloseReason::Disconnected => "disconnected",
            CloseReason::ProtocolError => "protocol_error",
            CloseReason::IdleTimeout => "idle_timeout",
            CloseReason::Shutdown => "shutdown",
        }
    }
}

impl fmt::Display for CloseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("Session is not active")]
    NotActive,

    #[error("Request {0} is already in flight")]
    DuplicateRequest(RequestId),

    #[error("A stream is already open for this session")]
    StreamAlreadyOpen,
}

/// Where the reply to one request goes
#[derive(Debug)]
pub enum Delivery {
    /// Single JSON body; notifications fall through to the standalone stream
    Reply(oneshot::Sender<ServerMessage>),
    /// Per-request SSE stream; notifications first, then the reply
    Stream(mpsc::UnboundedSender<ServerMessage>),
}

#[derive(Debug)]
struct SessionState {
    status: SessionStatus,
    last_activity: Instant,
    log_level: LogLevel,
    pending: HashMap<RequestId, Delivery>,
    stream: Option<mpsc::UnboundedSender<ServerMessage>>,
    protocol_version: Option<String>,
    client_info: Option<ClientInfo>,
}

pub struct Session {
    id: String,
    created_at: DateTime<Utc>,
    state: Mutex<SessionState>,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("status", &self.status())
            .finish()
    }
}

impl Session {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            created_at: Utc::now(),
            state: Mutex::new(SessionState {
                status: SessionStatus::Uninitialized,
                last_activity: Instant::now(),
                log_level: LogLevel::default(),
                pending: HashMap::new(),
                stream: None,
                protocol_version: None,
                client_info: None,
            }),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn status(&self) -> SessionStatus {
        self.state.lock().status
    }

    pub fn is_active(&self) -> bool {
        self.status() == SessionStatus::Active
    }

    /// Remember what the client announced during initialization
    pub fn record_client(&self, protocol_version: &str, client_info: ClientInfo) {
        let mut state = self.state.lock();
        state.protocol_version = Some(protocol_version.to_string());
        state.client_info = Some(client_info);
    }

    pub fn protocol_version(&self) -> Option<String> {
        self.state.lock().protocol_version.clone()
    }

    pub fn client_info(&self) -> Option<ClientInfo> {
        self.state.lock().client_info.clone()
    }

    /// Uninitialized to active. Returns false from any other state.
    pub fn activate(&self) -> bool {
        let mut state = self.state.lock();
        if state.status != SessionStatus::Uninitialized {
            return false;
        }
        state.status = SessionStatus::Active;
        state.last_activity = Instant::now();
        true
    }

    pub fn touch(&self) {
        self.state.lock().last_activity = Instant::now();
    }

    /// Idle means nothing in flight, no open stream and no recent traffic
    pub fn is_idle(&self, timeout: Duration) -> bool {
        let state = self.state.lock();
        state.status == SessionStatus::Active
            && state.pending.is_empty()
            && !stream_is_open(&state.stream)
            && state.last_activity.elapsed() >= timeout
    }

    pub fn log_level(&self) -> LogLevel {
        self.state.lock().log_level
    }

    pub fn set_log_level(&self, level: LogLevel) {
        self.state.lock().log_level = level;
    }

    /// Register an in-flight request and where its reply should go
    pub fn begin_request(&self, id: RequestId, delivery: Delivery) -> Result<(), SessionError> {
        let mut state = self.state.lock();
        if state.status != SessionStatus::Active {
            return Err(SessionError::NotActive);
        }
        if state.pending.contains_key(&id) {
            return Err(SessionError::DuplicateRequest(id));
        }
        state.pending.insert(id, delivery);
        state.last_activity = Instant::now();
        Ok(())
    }

    /// Deliver the final reply for `id`.
    ///
    /// Returns false if the request is no longer pending (cancelled, or the
    /// session closed) or the receiver is gone.
    pub fn complete(&self, id: &RequestId, reply: ServerMessage) -> bool {
        let delivery = {
            let mut state = self.state.lock();
            state.last_activity = Instant::now();
            state.pending.remove(id)
        };
        match delivery {
            Some(Delivery::Reply(tx)) => tx.send(reply).is_ok(),
            // Dropping the sender afterwards ends the per-request stream
            Some(Delivery::Stream(tx)) => tx.send(reply).is_ok(),
            None => false,
        }
    }

    /// Forget a pending request without replying
    pub fn cancel(&self, id: &RequestId) -> bool {
        self.state.lock().pending.remove(id).is_some()
    }

    pub fn pending_count(&self) -> usize {
        self.state.lock().pending.len()
    }

    /// Push a notification to the client.
    ///
    /// Goes to the related request's stream when it has one, otherwise to
    /// the standalone stream. Returns false when there is nowhere to send it.
    pub fn notify(&self, related: Option<&RequestId>, message: ServerMessage) -> bool {
        let state = self.state.lock();
        if state.status != SessionStatus::Active {
            return false;
        }
        if let Some(Delivery::Stream(tx)) = related.and_then(|id| state.pending.get(id)) {
            return tx.send(message).is_ok();
        }
        match &state.stream {
            Some(tx) => tx.send(message).is_ok(),
            None => false,
        }
    }

    /// Open the standalone server-push stream. Only one may be open.
    pub fn attach_stream(
        &self,
        tx: mpsc::UnboundedSender<ServerMessage>,
    ) -> Result<(), SessionError> {
        let mut state = self.state.lock();
        if state.status != SessionStatus::Active {
            return Err(SessionError::NotActive);
        }
        if stream_is_open(&state.stream) {
            return Err(SessionError::StreamAlreadyOpen);
        }
        state.stream = Some(tx);
        state.last_activity = Instant::now();
        Ok(())
    }

    pub fn has_stream(&self) -> bool {
        stream_is_open(&self.state.lock().stream)
    }

    /// Enter the terminal state, dropping every delivery channel.
    ///
    /// Returns false if the session was already closed.
    pub fn close(&self) -> bool {
        let (pending, stream) = {
            let mut state = self.state.lock();
            if state.status == SessionStatus::Closed {
                return false;
            }
            state.status = SessionStatus::Closed;
            (std::mem::take(&mut state.pending), state.stream.take())
        };
        // Dropped outside the lock: ends SSE streams and wakes JSON waiters
        drop(pending);
        drop(stream);
        true
    }
}

fn stream_is_open(stream: &Option<mpsc::UnboundedSender<ServerMessage>>) -> bool {
    stream.as_ref().is_some_and(|tx| !tx.is_closed())
}
