//! Session-to-application translation layer.
//!
//! The [`Bridge`] wraps the Sans-IO [`ConversationSession`] and adapts it
//! to the application lifecycle: app actions become session events, session
//! actions become app events, and outgoing frames accumulate for the driver
//! to send in the next I/O cycle.

use std::time::Instant;

use palaver_client::{
    ConnectionConfig, ConversationId, ConversationSession, SessionAction, SessionError,
    SessionEvent,
};
use palaver_proto::BrokerFrame;

use crate::AppEvent;

/// Bridge between the app layer and the session protocol logic.
pub struct Bridge {
    session: ConversationSession,
    /// Frames pending transmission to the broker.
    outgoing: Vec<BrokerFrame>,
}

impl Bridge {
    /// Create a bridge owning a fresh session for `conversation_id`.
    pub fn new(conversation_id: ConversationId, config: ConnectionConfig) -> Self {
        Self { session: ConversationSession::new(conversation_id, config), outgoing: Vec::new() }
    }

    /// Conversation the session is bound to.
    pub fn conversation_id(&self) -> ConversationId {
        self.session.conversation_id()
    }

    /// Whether the session accepts sends.
    pub fn is_connected(&self) -> bool {
        self.session.is_connected()
    }

    /// Transport is up; start the broker handshake.
    pub fn open(&mut self, now: Instant) -> Vec<AppEvent> {
        self.drive(SessionEvent::Open { now })
    }

    /// Handle a frame received from the broker.
    pub fn handle_frame(&mut self, frame: BrokerFrame) -> Vec<AppEvent> {
        self.drive(SessionEvent::FrameReceived(frame))
    }

    /// Forward user text to the session's send path.
    pub fn submit(&mut self, content: String) -> Vec<AppEvent> {
        self.drive(SessionEvent::Submit { content })
    }

    /// Process a time tick.
    pub fn handle_tick(&mut self, now: Instant) -> Vec<AppEvent> {
        self.drive(SessionEvent::Tick { now })
    }

    /// The transport dropped underneath the session.
    pub fn transport_closed(&mut self, reason: impl Into<String>) -> Vec<AppEvent> {
        self.drive(SessionEvent::TransportClosed { reason: reason.into() })
    }

    /// Tear the session down.
    pub fn close(&mut self) -> Vec<AppEvent> {
        self.drive(SessionEvent::Close)
    }

    /// Take all pending outgoing frames.
    pub fn take_outgoing(&mut self) -> Vec<BrokerFrame> {
        std::mem::take(&mut self.outgoing)
    }

    fn drive(&mut self, event: SessionEvent) -> Vec<AppEvent> {
        match self.session.handle(event) {
            Ok(actions) => self.translate(actions),
            // Rejected sends never made it to the wire; log and move on
            Err(error @ SessionError::SendRejected { .. }) => {
                tracing::warn!(%error, "send rejected");
                vec![]
            }
            Err(error) => vec![AppEvent::Error { message: error.to_string() }],
        }
    }

    fn translate(&mut self, actions: Vec<SessionAction>) -> Vec<AppEvent> {
        let mut events = Vec::new();
        for action in actions {
            match action {
                SessionAction::Transmit(frame) => self.outgoing.push(frame),
                SessionAction::MergeMessages(records) => {
                    events.push(AppEvent::MessageBatch(records));
                }
                SessionAction::MergeFragments(patches) => {
                    events.push(AppEvent::FragmentBatch(patches));
                }
                SessionAction::Status(status) => events.push(AppEvent::Status(status)),
                SessionAction::Activity(notice) => events.push(AppEvent::Activity(notice)),
                SessionAction::ConversationClosed => events.push(AppEvent::ConversationClosed),
            }
        }
        events
    }
}

#[cfg(test)]
mod tests {
    use palaver_client::PresenceStatus;
    use palaver_proto::{Command, destinations};

    use super::*;

    fn opened_bridge() -> Bridge {
        let mut bridge = Bridge::new(42, ConnectionConfig::default());
        let _ = bridge.open(Instant::now());
        let _ = bridge.take_outgoing();
        bridge
    }

    #[test]
    fn open_buffers_connect_frame() {
        let mut bridge = Bridge::new(42, ConnectionConfig::default());
        let events = bridge.open(Instant::now());

        assert!(events.is_empty());
        let frames = bridge.take_outgoing();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].command, Command::Connect);
    }

    #[test]
    fn handshake_produces_online_event_and_join_frame() {
        let mut bridge = opened_bridge();
        let events = bridge.handle_frame(BrokerFrame::connected());

        assert!(
            events
                .iter()
                .any(|e| matches!(e, AppEvent::Status(PresenceStatus::Online)))
        );
        let frames = bridge.take_outgoing();
        assert!(frames.iter().any(|f| f.destination() == Some(destinations::JOIN)));
    }

    #[test]
    fn rejected_send_produces_no_frame_and_no_event() {
        let mut bridge = opened_bridge();
        let events = bridge.submit("hello".to_string());

        assert!(events.is_empty());
        assert!(bridge.take_outgoing().is_empty());
    }

    #[test]
    fn connected_send_buffers_frame() {
        let mut bridge = opened_bridge();
        let _ = bridge.handle_frame(BrokerFrame::connected());
        let _ = bridge.take_outgoing();

        let events = bridge.submit("hello".to_string());
        assert!(events.is_empty());

        let frames = bridge.take_outgoing();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].destination(), Some(destinations::SEND));
    }

    #[test]
    fn broker_error_produces_offline_event() {
        let mut bridge = opened_bridge();
        let events = bridge.handle_frame(BrokerFrame::error("nope"));

        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], AppEvent::Status(PresenceStatus::Offline)));
    }
}
