//! Wire protocol for the palaver conversation client.
//!
//! The broker speaks a STOMP-style frame protocol over a bidirectional
//! socket. This crate owns the two layers of that contract:
//!
//! - [`BrokerFrame`]: the text frame codec (command, headers, body).
//! - [`Envelope`]: the JSON body of broker `MESSAGE` frames, classified by
//!   its `messageType` discriminant into message batches, fragment batches,
//!   and side-channel notices.
//!
//! Frame headers are routing metadata only; payload decoding happens after
//! routing, so a body that fails to parse never takes the connection down.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod destinations;
mod envelope;
mod errors;
mod frame;

pub use envelope::{
    ActivityKind, ActivityNotice, AuthorKind, ChatBody, ConversationId, Envelope, FragmentPatch,
    MessageRecord, PatchAction,
};
pub use errors::{EnvelopeError, ProtocolError};
pub use frame::{BrokerFrame, Command};
