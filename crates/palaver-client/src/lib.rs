//! Session core for the palaver conversation client.
//!
//! Keeps one conversation view synchronized with a broker over a
//! frame-based pub/sub protocol. The core follows the Sans-IO, action-based
//! pattern: [`ConversationSession`] receives events ([`SessionEvent`]),
//! processes them through pure state machine logic, and returns actions
//! ([`SessionAction`]) for the caller to execute.
//!
//! # Components
//!
//! - [`ConversationSession`]: top-level session state machine
//! - [`ConnectionMachine`]: connection lifecycle (health, handshake deadline)
//! - [`SubscriptionRouter`]: per-destination dispatch table
//!
//! # Transport (optional)
//!
//! With the `transport` feature enabled, this crate also provides:
//! - [`transport::ConnectedTransport`]: WebSocket transport handle
//! - [`transport::connect`]: connect to a broker

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod connection;
mod error;
mod router;
mod session;

#[cfg(feature = "transport")]
pub mod transport;

pub use connection::{
    ConnectionConfig, ConnectionMachine, ConnectionState, DEFAULT_HANDSHAKE_DEADLINE,
};
pub use error::SessionError;
pub use palaver_proto::ConversationId;
pub use router::SubscriptionRouter;
pub use session::{ConversationSession, PresenceStatus, SessionAction, SessionEvent};
