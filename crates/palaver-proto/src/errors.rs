//! Error types for the wire protocol.
//!
//! Frame-level and envelope-level failures are kept separate: a malformed
//! frame is a transport concern, while a malformed envelope body is dropped
//! by the dispatcher without touching the connection.

use thiserror::Error;

/// Errors produced by the broker frame codec.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Input contained no frame at all.
    #[error("empty frame")]
    EmptyFrame,

    /// Command line did not match any known frame command.
    #[error("unknown command: {0}")]
    UnknownCommand(String),

    /// Header line was not a `name:value` pair or used an invalid escape.
    #[error("malformed header line: {line}")]
    MalformedHeader {
        /// The offending header line.
        line: String,
    },

    /// Frame was missing the blank line separating headers from the body.
    #[error("frame missing header/body separator")]
    Truncated,
}

/// Errors produced while classifying an inbound envelope.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EnvelopeError {
    /// Body failed to parse as an envelope of the declared kind.
    #[error("envelope decode failed: {reason}")]
    Decode {
        /// Parser diagnostic.
        reason: String,
    },

    /// The `messageType` discriminant named a kind this client does not know.
    #[error("unknown envelope kind: {kind}")]
    UnknownKind {
        /// The discriminant value as received.
        kind: String,
    },
}
