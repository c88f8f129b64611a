//! Error types for the session core.
//!
//! Nothing here is fatal to the process. Envelope-level failures
//! (`palaver_proto::EnvelopeError`) are dropped with a logged warning and
//! never surface as a `SessionError`; the variants below are the failures a
//! caller can actually observe.

use thiserror::Error;

use crate::connection::ConnectionState;

/// Errors returned by [`crate::ConversationSession::handle`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// Operation not legal in the current connection state.
    #[error("invalid state transition: cannot {operation} from {state:?}")]
    InvalidState {
        /// State when the operation was attempted.
        state: ConnectionState,
        /// Operation that was attempted.
        operation: &'static str,
    },

    /// A send was rejected locally, before any frame was produced.
    #[error("send rejected: {reason}")]
    SendRejected {
        /// Why the send never left the client.
        reason: &'static str,
    },

    /// Outbound body failed to serialize.
    #[error("outbound body encoding failed: {reason}")]
    Encode {
        /// Serializer diagnostic.
        reason: String,
    },
}
