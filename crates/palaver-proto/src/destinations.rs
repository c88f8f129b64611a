//! Fixed broker destinations used by a conversation session.
//!
//! The broker resolves the `/user` prefix to the authenticated session, so
//! both queue names are personal to the connection that subscribes to them.

/// Personal queue carrying message and fragment envelopes.
pub const MESSAGE_QUEUE: &str = "/user/queue/messages";

/// Personal side-channel queue carrying presence and activity notices.
pub const SIDE_CHANNEL_QUEUE: &str = "/user/queue/assistants";

/// Application destination the Join frame is sent to on connect.
pub const JOIN: &str = "/app/chat.join";

/// Application destination user messages are sent to.
pub const SEND: &str = "/app/chat.send";
