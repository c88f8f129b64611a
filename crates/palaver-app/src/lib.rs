//! Application layer for the palaver conversation client.
//!
//! Pure state machines and a generic runtime for view and protocol
//! orchestration, enabling deterministic scripted testing with the same
//! code that runs in production.
//!
//! # Components
//!
//! - [`ChatApp`]: view state machine (status, send gating, merges)
//! - [`ConversationView`]: the rendered conversation region model
//! - [`ViewObserver`]: view-change observation and scroll scheduling
//! - [`Bridge`]: protocol bridge (translates app actions to session events)
//! - [`Driver`]: trait for platform-specific I/O
//! - [`Runtime`]: generic orchestration loop over a `Driver`

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod app;
mod bridge;
mod driver;
mod merge;
mod observer;
mod runtime;
mod state;

pub use app::{AppAction, AppEvent, ChatApp};
pub use bridge::Bridge;
pub use driver::{Driver, UserInput};
pub use merge::{merge_fragments, merge_messages};
pub use observer::ViewObserver;
pub use runtime::{Runtime, RuntimeConfig};
pub use state::{Attribution, ConversationView, MessageEntry, NodeContent, ViewNode};
