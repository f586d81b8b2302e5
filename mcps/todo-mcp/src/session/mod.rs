//! Session layer: one state machine per connected client
//!
//! - [`SessionRegistry`] owns every live session and all lifecycle transitions
//! - [`Session`] holds the delivery channels of one conversation
//! - [`ProtocolSession`] answers lifecycle methods and dispatches requests

pub mod protocol;
pub mod registry;
pub mod state;

pub use protocol::ProtocolSession;
pub use registry::{spawn_idle_sweeper, SessionRegistry};
pub use state::{CloseReason, Delivery, Session, SessionError, SessionStatus};
