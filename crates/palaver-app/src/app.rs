//! Application state machine.
//!
//! [`ChatApp`] manages the interactive state of the conversation view,
//! decoupled from I/O and protocol mechanics: it consumes [`AppEvent`]
//! inputs and produces [`AppAction`] instructions for the runtime to
//! execute.
//!
//! # Responsibilities
//!
//! - Owns the [`ConversationView`] and runs the merge stages against it.
//! - Tracks the status indicator and gates the send control: the control
//!   is wired only while the session is online, which is what guarantees
//!   Join precedes every user Send.
//! - Owns the [`ViewObserver`] that schedules scroll-to-latest actions.

use palaver_client::PresenceStatus;
use palaver_proto::{ActivityNotice, FragmentPatch, MessageRecord};

use crate::{
    merge::{merge_fragments, merge_messages},
    observer::ViewObserver,
    state::ConversationView,
};

/// Events processed by the app state machine, translated from the session
/// by the bridge.
#[derive(Debug, Clone)]
pub enum AppEvent {
    /// Connection health changed.
    Status(PresenceStatus),

    /// A batch of message records arrived, in order.
    MessageBatch(Vec<MessageRecord>),

    /// A batch of fragment patches arrived, in order.
    FragmentBatch(Vec<FragmentPatch>),

    /// Assistant activity notice.
    Activity(ActivityNotice),

    /// The server closed the conversation.
    ConversationClosed,

    /// Error surfaced to the status line.
    Error {
        /// Error description.
        message: String,
    },
}

/// Actions the app produces for the runtime to execute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppAction {
    /// Re-render the view.
    Render,

    /// Forward user text to the session's send path.
    Submit {
        /// Raw input text.
        content: String,
    },

    /// Quit the application.
    Quit,
}

/// Interactive state for one conversation view.
#[derive(Debug, Clone, Default)]
pub struct ChatApp {
    view: ConversationView,
    observer: ViewObserver,
    online: bool,
    send_enabled: bool,
    status_message: Option<String>,
}

impl ChatApp {
    /// Create an app showing an empty, offline view.
    pub fn new() -> Self {
        Self::default()
    }

    /// Process an event and return actions.
    pub fn handle(&mut self, event: AppEvent) -> Vec<AppAction> {
        match event {
            AppEvent::Status(PresenceStatus::Online) => {
                self.online = true;
                self.send_enabled = true;
                // The view region exists by now; watch it for mutations
                self.observer.start();
                vec![AppAction::Render]
            }
            AppEvent::Status(PresenceStatus::Offline) => {
                self.online = false;
                self.send_enabled = false;
                vec![AppAction::Render]
            }
            AppEvent::MessageBatch(records) => {
                merge_messages(&mut self.view, records, &mut self.observer);
                vec![AppAction::Render]
            }
            AppEvent::FragmentBatch(patches) => {
                merge_fragments(&mut self.view, &patches, &mut self.observer);
                vec![AppAction::Render]
            }
            AppEvent::Activity(notice) => {
                if self.view.set_activity(Some(notice.text().to_string())) {
                    self.observer.notify();
                    vec![AppAction::Render]
                } else {
                    vec![]
                }
            }
            AppEvent::ConversationClosed => {
                self.send_enabled = false;
                self.status_message = Some("Conversation closed".to_string());
                vec![AppAction::Render]
            }
            AppEvent::Error { message } => {
                self.status_message = Some(message);
                vec![AppAction::Render]
            }
        }
    }

    /// Send control handler. Inactive until the session is online, so input
    /// submitted early produces no action at all.
    pub fn submit_input(&mut self, raw: &str) -> Vec<AppAction> {
        if !self.send_enabled {
            tracing::debug!("send control inactive, ignoring input");
            return vec![];
        }
        vec![AppAction::Submit { content: raw.to_string() }]
    }

    /// Quit the application.
    pub fn quit(&self) -> Vec<AppAction> {
        vec![AppAction::Quit]
    }

    /// Drain pending view-change notifications into at most one scroll per
    /// dispatch cycle.
    pub fn take_scroll(&mut self) -> bool {
        self.observer.take_scroll()
    }

    /// Stop observing the view. Called on teardown, before the transport is
    /// released.
    pub fn teardown(&mut self) {
        self.observer.stop();
    }

    /// Whether the status indicator shows online.
    pub fn is_online(&self) -> bool {
        self.online
    }

    /// Whether the send control is currently wired.
    pub fn send_enabled(&self) -> bool {
        self.send_enabled
    }

    /// The rendered conversation region.
    pub fn view(&self) -> &ConversationView {
        &self.view
    }

    /// Transient status line. `None` if nothing to show.
    pub fn status_message(&self) -> Option<&str> {
        self.status_message.as_deref()
    }
}
