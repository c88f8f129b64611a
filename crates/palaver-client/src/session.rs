//! Conversation session state machine.
//!
//! [`ConversationSession`] is the Sans-IO core of the client: it consumes
//! [`SessionEvent`] inputs and returns [`SessionAction`] instructions for
//! the caller to execute, with no I/O of its own. One session binds one
//! open conversation view to one broker connection, the two queue
//! subscriptions, and the connection state machine, for its whole lifetime.
//!
//! # Ordering guarantees
//!
//! - Actions are returned in the order they must be executed; the Join
//!   frame is emitted in the handshake batch, so it precedes every Send of
//!   the same session.
//! - Envelopes from one subscription are dispatched in receipt order and
//!   batches are never reordered; the two subscriptions are unordered
//!   relative to each other.

use std::{
    ops::Sub,
    time::{Duration, Instant},
};

use palaver_proto::{
    ActivityNotice, BrokerFrame, ChatBody, Command, ConversationId, Envelope, EnvelopeError,
    FragmentPatch, MessageRecord, destinations,
};

use crate::{
    connection::{ConnectionConfig, ConnectionMachine, ConnectionState},
    error::SessionError,
    router::SubscriptionRouter,
};

/// Subscription id for the personal message queue.
const MESSAGE_SUBSCRIPTION_ID: &str = "sub-0";

/// Subscription id for the side-channel queue.
const SIDE_CHANNEL_SUBSCRIPTION_ID: &str = "sub-1";

/// Connection health as shown by the status indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresenceStatus {
    /// Handshake completed, connection live.
    Online,
    /// Not connected (never connected, failed, or torn down).
    Offline,
}

/// Which merge path a subscribed queue feeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum QueueBinding {
    /// Personal message queue: message and fragment batches.
    Messages,
    /// Side channel: presence and activity notices, never rendered.
    SideChannel,
}

/// Events the caller feeds into the session.
///
/// The caller is responsible for running the transport, delivering inbound
/// frames, forwarding user input, and driving time via ticks. Generic over
/// `I` (instant type) to keep deadline handling testable.
#[derive(Debug, Clone)]
pub enum SessionEvent<I = Instant> {
    /// Transport is up; begin the broker handshake.
    Open {
        /// Current time, used to arm the handshake deadline.
        now: I,
    },

    /// Frame received from the broker.
    FrameReceived(BrokerFrame),

    /// User submitted text from the send control.
    Submit {
        /// Raw input, trimmed by the session before transmission.
        content: String,
    },

    /// Periodic tick for deadline detection.
    Tick {
        /// Current time.
        now: I,
    },

    /// The transport dropped underneath the session.
    TransportClosed {
        /// Transport diagnostic.
        reason: String,
    },

    /// Session teardown (view unmount).
    Close,
}

/// Actions the session produces for the caller to execute, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionAction {
    /// Transmit a frame to the broker.
    Transmit(BrokerFrame),

    /// Merge a batch of message records into the view, preserving order.
    MergeMessages(Vec<MessageRecord>),

    /// Apply a batch of fragment patches to the view, preserving order.
    MergeFragments(Vec<FragmentPatch>),

    /// Connection health changed.
    Status(PresenceStatus),

    /// Assistant activity notice.
    Activity(ActivityNotice),

    /// The server closed the conversation; the send control should be
    /// disabled. The transport stays up.
    ConversationClosed,
}

/// State machine binding one conversation view to its broker connection.
#[derive(Debug)]
pub struct ConversationSession<I = Instant>
where
    I: Copy + Ord + Sub<Output = Duration>,
{
    conversation_id: ConversationId,
    connection: ConnectionMachine<I>,
    router: SubscriptionRouter<QueueBinding>,
}

impl<I> ConversationSession<I>
where
    I: Copy + Ord + Sub<Output = Duration>,
{
    /// Create a session for `conversation_id`. No connection is opened
    /// until the caller feeds [`SessionEvent::Open`].
    pub fn new(conversation_id: ConversationId, config: ConnectionConfig) -> Self {
        Self {
            conversation_id,
            connection: ConnectionMachine::new(config),
            router: SubscriptionRouter::new(),
        }
    }

    /// Conversation this session is bound to.
    pub fn conversation_id(&self) -> ConversationId {
        self.conversation_id
    }

    /// Current connection state.
    pub fn state(&self) -> ConnectionState {
        self.connection.state()
    }

    /// Whether sends are currently accepted.
    pub fn is_connected(&self) -> bool {
        self.connection.is_connected()
    }

    /// Number of live subscriptions (two while connected, zero otherwise).
    pub fn subscription_count(&self) -> usize {
        self.router.len()
    }

    /// Process an event and return the resulting actions.
    pub fn handle(&mut self, event: SessionEvent<I>) -> Result<Vec<SessionAction>, SessionError> {
        match event {
            SessionEvent::Open { now } => self.handle_open(now),
            SessionEvent::FrameReceived(frame) => self.handle_frame(frame),
            SessionEvent::Submit { content } => self.handle_submit(&content),
            SessionEvent::Tick { now } => Ok(self.handle_tick(now)),
            SessionEvent::TransportClosed { reason } => {
                Ok(self.handle_transport_closed(&reason))
            }
            SessionEvent::Close => Ok(self.handle_close()),
        }
    }

    fn handle_open(&mut self, now: I) -> Result<Vec<SessionAction>, SessionError> {
        let epoch = self.connection.open(now)?;
        tracing::debug!(conversation_id = self.conversation_id, epoch, "opening broker connection");
        Ok(vec![SessionAction::Transmit(BrokerFrame::connect())])
    }

    fn handle_frame(&mut self, frame: BrokerFrame) -> Result<Vec<SessionAction>, SessionError> {
        match frame.command {
            Command::Connected => self.handle_connected(),
            Command::Message => Ok(self.dispatch(&frame)),
            Command::Error => Ok(self.handle_broker_error(&frame)),
            other => {
                tracing::warn!(command = %other, "dropping unexpected frame");
                Ok(vec![])
            }
        }
    }

    /// Handshake acknowledged: register both queue subscriptions and emit
    /// the subscribe frames, the Join frame, and the online status, in that
    /// order. Runs at most once per attempt epoch, so exactly one Join is
    /// transmitted per successful handshake.
    fn handle_connected(&mut self) -> Result<Vec<SessionAction>, SessionError> {
        self.connection.handshake_complete()?;

        self.router.subscribe(destinations::MESSAGE_QUEUE, QueueBinding::Messages);
        self.router.subscribe(destinations::SIDE_CHANNEL_QUEUE, QueueBinding::SideChannel);

        let join_body = self.chat_body(String::new())?;

        Ok(vec![
            SessionAction::Transmit(BrokerFrame::subscribe(
                MESSAGE_SUBSCRIPTION_ID,
                destinations::MESSAGE_QUEUE,
            )),
            SessionAction::Transmit(BrokerFrame::subscribe(
                SIDE_CHANNEL_SUBSCRIPTION_ID,
                destinations::SIDE_CHANNEL_QUEUE,
            )),
            SessionAction::Transmit(BrokerFrame::send_to(destinations::JOIN, join_body)),
            SessionAction::Status(PresenceStatus::Online),
        ])
    }

    /// Route a `MESSAGE` frame by destination, decode its envelope, and
    /// classify it onto a merge path. Every failure here is a drop with a
    /// logged warning; the connection stays up.
    fn dispatch(&mut self, frame: &BrokerFrame) -> Vec<SessionAction> {
        let Some(destination) = frame.destination() else {
            tracing::warn!("dropping MESSAGE frame without destination");
            return vec![];
        };
        let Some(&binding) = self.router.route(destination) else {
            tracing::warn!(destination, "dropping frame for unsubscribed destination");
            return vec![];
        };

        match Envelope::decode(&frame.body) {
            Ok(envelope) => self.classify(binding, envelope),
            Err(EnvelopeError::UnknownKind { kind }) => {
                tracing::warn!(%kind, "dropping envelope of unknown kind");
                vec![]
            }
            Err(EnvelopeError::Decode { reason }) => {
                tracing::warn!(%reason, "dropping undecodable envelope");
                vec![]
            }
        }
    }

    fn classify(&mut self, binding: QueueBinding, envelope: Envelope) -> Vec<SessionAction> {
        match (binding, envelope) {
            (QueueBinding::Messages, Envelope::Messages(records)) => {
                vec![SessionAction::MergeMessages(records)]
            }
            (QueueBinding::Messages, Envelope::Fragments(patches)) => {
                vec![SessionAction::MergeFragments(patches)]
            }
            (_, Envelope::Activity(notice)) => vec![SessionAction::Activity(notice)],
            (_, Envelope::Closed) => {
                tracing::info!(
                    conversation_id = self.conversation_id,
                    "server closed the conversation"
                );
                vec![SessionAction::ConversationClosed]
            }
            (QueueBinding::SideChannel, _) => {
                tracing::debug!("side-channel envelope consumed");
                vec![]
            }
        }
    }

    fn handle_broker_error(&mut self, frame: &BrokerFrame) -> Vec<SessionAction> {
        let detail = frame.header("message").unwrap_or("unspecified");
        if self.connection.state() == ConnectionState::Connecting {
            tracing::warn!(detail, "handshake failed");
        } else {
            tracing::warn!(detail, "broker error, closing connection");
        }
        self.shutdown()
    }

    fn handle_tick(&mut self, now: I) -> Vec<SessionAction> {
        if let Some(elapsed) = self.connection.check_deadline(now) {
            tracing::warn!(?elapsed, "handshake deadline exceeded");
            return self.shutdown();
        }
        vec![]
    }

    fn handle_transport_closed(&mut self, reason: &str) -> Vec<SessionAction> {
        if self.connection.state() == ConnectionState::Closed {
            return vec![];
        }
        tracing::warn!(reason, "transport closed");
        self.shutdown()
    }

    /// Deliberate teardown. A polite DISCONNECT goes out first when the
    /// handshake had completed; the router is always cleared before the
    /// caller releases the transport.
    fn handle_close(&mut self) -> Vec<SessionAction> {
        let was_connected = self.connection.is_connected();
        let mut actions = self.shutdown();
        if was_connected {
            actions.insert(0, SessionAction::Transmit(BrokerFrame::disconnect()));
        }
        actions
    }

    /// `submit()` precondition checks and transmission.
    ///
    /// # Errors
    ///
    /// `SessionError::SendRejected` while not `Connected` or when the
    /// content is empty after trimming. No frame is produced in either
    /// case.
    fn handle_submit(&mut self, content: &str) -> Result<Vec<SessionAction>, SessionError> {
        if !self.connection.is_connected() {
            return Err(SessionError::SendRejected { reason: "not connected" });
        }
        let trimmed = content.trim();
        if trimmed.is_empty() {
            return Err(SessionError::SendRejected { reason: "empty content" });
        }

        let body = self.chat_body(trimmed.to_string())?;
        Ok(vec![SessionAction::Transmit(BrokerFrame::send_to(destinations::SEND, body))])
    }

    /// Common close path: transitions to `Closed`, clears the router so
    /// nothing dispatches against a torn-down view, and flips the status
    /// indicator unless it already happened.
    fn shutdown(&mut self) -> Vec<SessionAction> {
        let was_closed = self.connection.state() == ConnectionState::Closed;
        self.connection.close();
        self.router.unsubscribe_all();
        if was_closed { vec![] } else { vec![SessionAction::Status(PresenceStatus::Offline)] }
    }

    fn chat_body(&self, content: String) -> Result<String, SessionError> {
        serde_json::to_string(&ChatBody { conversation_id: self.conversation_id, content })
            .map_err(|e| SessionError::Encode { reason: e.to_string() })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use palaver_proto::{AuthorKind, PatchAction};

    use super::*;

    fn session() -> ConversationSession {
        ConversationSession::new(42, ConnectionConfig::default())
    }

    fn connected_session() -> ConversationSession {
        let mut session = session();
        session.handle(SessionEvent::Open { now: Instant::now() }).unwrap();
        session.handle(SessionEvent::FrameReceived(BrokerFrame::connected())).unwrap();
        session
    }

    fn message_frame(body: &str) -> BrokerFrame {
        BrokerFrame::message(destinations::MESSAGE_QUEUE, "sub-0", body)
    }

    #[test]
    fn open_transmits_connect() {
        let mut session = session();
        let actions = session.handle(SessionEvent::Open { now: Instant::now() }).unwrap();

        assert_eq!(session.state(), ConnectionState::Connecting);
        match actions.as_slice() {
            [SessionAction::Transmit(frame)] => assert_eq!(frame.command, Command::Connect),
            other => panic!("expected single CONNECT, got {other:?}"),
        }
    }

    #[test]
    fn handshake_subscribes_joins_and_goes_online() {
        let mut session = session();
        session.handle(SessionEvent::Open { now: Instant::now() }).unwrap();
        let actions =
            session.handle(SessionEvent::FrameReceived(BrokerFrame::connected())).unwrap();

        assert!(session.is_connected());
        assert_eq!(session.subscription_count(), 2);

        let [sub_messages, sub_side, join, status] = actions.as_slice() else {
            panic!("expected four actions, got {actions:?}");
        };
        match (sub_messages, sub_side) {
            (SessionAction::Transmit(a), SessionAction::Transmit(b)) => {
                assert_eq!(a.command, Command::Subscribe);
                assert_eq!(a.destination(), Some(destinations::MESSAGE_QUEUE));
                assert_eq!(b.command, Command::Subscribe);
                assert_eq!(b.destination(), Some(destinations::SIDE_CHANNEL_QUEUE));
            }
            other => panic!("expected two SUBSCRIBEs, got {other:?}"),
        }
        match join {
            SessionAction::Transmit(frame) => {
                assert_eq!(frame.command, Command::Send);
                assert_eq!(frame.destination(), Some(destinations::JOIN));
                assert_eq!(frame.body, r#"{"conversation_id":42,"content":""}"#);
            }
            other => panic!("expected Join SEND, got {other:?}"),
        }
        assert_eq!(*status, SessionAction::Status(PresenceStatus::Online));
    }

    #[test]
    fn duplicate_connected_frame_is_an_invalid_transition() {
        let mut session = connected_session();
        let result = session.handle(SessionEvent::FrameReceived(BrokerFrame::connected()));
        assert!(matches!(result, Err(SessionError::InvalidState { .. })));
    }

    #[test]
    fn submit_while_not_connected_produces_no_frame() {
        let mut session = session();
        let result = session.handle(SessionEvent::Submit { content: "hi".to_string() });
        assert_eq!(result, Err(SessionError::SendRejected { reason: "not connected" }));

        session.handle(SessionEvent::Open { now: Instant::now() }).unwrap();
        let result = session.handle(SessionEvent::Submit { content: "hi".to_string() });
        assert_eq!(result, Err(SessionError::SendRejected { reason: "not connected" }));
    }

    #[test]
    fn submit_empty_after_trim_is_rejected() {
        let mut session = connected_session();
        let result = session.handle(SessionEvent::Submit { content: "   \n".to_string() });
        assert_eq!(result, Err(SessionError::SendRejected { reason: "empty content" }));
    }

    #[test]
    fn submit_transmits_trimmed_content() {
        let mut session = connected_session();
        let actions =
            session.handle(SessionEvent::Submit { content: "  hello there ".to_string() }).unwrap();

        match actions.as_slice() {
            [SessionAction::Transmit(frame)] => {
                assert_eq!(frame.command, Command::Send);
                assert_eq!(frame.destination(), Some(destinations::SEND));
                assert_eq!(frame.body, r#"{"conversation_id":42,"content":"hello there"}"#);
            }
            other => panic!("expected single SEND, got {other:?}"),
        }
    }

    #[test]
    fn message_batch_routes_to_message_merge_in_order() {
        let mut session = connected_session();
        let body = r#"{
            "messageType": "MESSAGE",
            "payload": [
                {"id": 1, "authorKind": "USER", "authorName": "alice",
                 "content": "hi", "timestamp": "2026-03-01T10:00:00Z"},
                {"id": 2, "authorKind": "ASSISTANT", "authorName": "sage",
                 "content": "hello", "timestamp": "2026-03-01T10:00:01Z"}
            ]
        }"#;

        let actions = session.handle(SessionEvent::FrameReceived(message_frame(body))).unwrap();

        let [SessionAction::MergeMessages(records)] = actions.as_slice() else {
            panic!("expected MergeMessages, got {actions:?}");
        };
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].author_kind, AuthorKind::User);
        assert_eq!(records[1].content, "hello");
    }

    #[test]
    fn single_fragment_routes_as_batch_of_one() {
        let mut session = connected_session();
        let body = r#"{
            "messageType": "FRAGMENT",
            "payload": {"action": "append", "target": "m-1", "markup": "<p>x</p>"}
        }"#;

        let actions = session.handle(SessionEvent::FrameReceived(message_frame(body))).unwrap();

        let [SessionAction::MergeFragments(patches)] = actions.as_slice() else {
            panic!("expected MergeFragments, got {actions:?}");
        };
        assert_eq!(patches.len(), 1);
        assert_eq!(patches[0].action, PatchAction::Append);
    }

    #[test]
    fn undecodable_envelope_is_dropped_without_closing() {
        let mut session = connected_session();
        let actions =
            session.handle(SessionEvent::FrameReceived(message_frame("not json"))).unwrap();

        assert!(actions.is_empty());
        assert!(session.is_connected());
    }

    #[test]
    fn unknown_envelope_kind_is_dropped_without_closing() {
        let mut session = connected_session();
        let body = r#"{"messageType": "NOTE", "payload": null}"#;
        let actions = session.handle(SessionEvent::FrameReceived(message_frame(body))).unwrap();

        assert!(actions.is_empty());
        assert!(session.is_connected());
    }

    #[test]
    fn unsubscribed_destination_is_dropped() {
        let mut session = connected_session();
        let frame = BrokerFrame::message("/user/queue/other", "sub-9", "{}");
        let actions = session.handle(SessionEvent::FrameReceived(frame)).unwrap();

        assert!(actions.is_empty());
    }

    #[test]
    fn side_channel_activity_surfaces_notice() {
        let mut session = connected_session();
        let frame = BrokerFrame::message(
            destinations::SIDE_CHANNEL_QUEUE,
            "sub-1",
            r#"{"messageType": "THINKING", "payload": "sage is thinking"}"#,
        );

        let actions = session.handle(SessionEvent::FrameReceived(frame)).unwrap();
        let [SessionAction::Activity(notice)] = actions.as_slice() else {
            panic!("expected Activity, got {actions:?}");
        };
        assert_eq!(notice.text(), "sage is thinking");
    }

    #[test]
    fn side_channel_message_batch_is_consumed_silently() {
        let mut session = connected_session();
        let frame = BrokerFrame::message(
            destinations::SIDE_CHANNEL_QUEUE,
            "sub-1",
            r#"{"messageType": "MESSAGE", "payload": []}"#,
        );

        let actions = session.handle(SessionEvent::FrameReceived(frame)).unwrap();
        assert!(actions.is_empty());
    }

    #[test]
    fn closed_envelope_disables_conversation_but_not_transport() {
        let mut session = connected_session();
        let body = r#"{"messageType": "CLOSED", "payload": null}"#;
        let actions = session.handle(SessionEvent::FrameReceived(message_frame(body))).unwrap();

        assert_eq!(actions, vec![SessionAction::ConversationClosed]);
        assert!(session.is_connected());
    }

    #[test]
    fn broker_error_during_handshake_goes_offline() {
        let mut session = session();
        session.handle(SessionEvent::Open { now: Instant::now() }).unwrap();

        let actions = session
            .handle(SessionEvent::FrameReceived(BrokerFrame::error("no such user")))
            .unwrap();

        assert_eq!(actions, vec![SessionAction::Status(PresenceStatus::Offline)]);
        assert_eq!(session.state(), ConnectionState::Closed);
        assert_eq!(session.subscription_count(), 0);
    }

    #[test]
    fn handshake_deadline_closes_the_attempt() {
        let mut session = session();
        let t0 = Instant::now();
        session.handle(SessionEvent::Open { now: t0 }).unwrap();

        let actions = session
            .handle(SessionEvent::Tick { now: t0 + Duration::from_secs(31) })
            .unwrap();

        assert_eq!(actions, vec![SessionAction::Status(PresenceStatus::Offline)]);
        assert_eq!(session.state(), ConnectionState::Closed);
    }

    #[test]
    fn tick_within_deadline_is_quiet() {
        let mut session = session();
        let t0 = Instant::now();
        session.handle(SessionEvent::Open { now: t0 }).unwrap();

        let actions =
            session.handle(SessionEvent::Tick { now: t0 + Duration::from_secs(5) }).unwrap();
        assert!(actions.is_empty());
        assert_eq!(session.state(), ConnectionState::Connecting);
    }

    #[test]
    fn close_transmits_disconnect_and_clears_subscriptions() {
        let mut session = connected_session();
        let actions = session.handle(SessionEvent::Close).unwrap();

        let [SessionAction::Transmit(frame), SessionAction::Status(PresenceStatus::Offline)] =
            actions.as_slice()
        else {
            panic!("expected DISCONNECT then offline, got {actions:?}");
        };
        assert_eq!(frame.command, Command::Disconnect);
        assert_eq!(session.subscription_count(), 0);
        assert_eq!(session.state(), ConnectionState::Closed);
    }

    #[test]
    fn close_before_handshake_skips_disconnect() {
        let mut session = session();
        session.handle(SessionEvent::Open { now: Instant::now() }).unwrap();
        let actions = session.handle(SessionEvent::Close).unwrap();

        assert_eq!(actions, vec![SessionAction::Status(PresenceStatus::Offline)]);
    }

    #[test]
    fn transport_closed_after_close_is_quiet() {
        let mut session = connected_session();
        session.handle(SessionEvent::Close).unwrap();

        let actions = session
            .handle(SessionEvent::TransportClosed { reason: "socket gone".to_string() })
            .unwrap();
        assert!(actions.is_empty());
    }

    #[test]
    fn exactly_one_join_per_handshake_and_join_precedes_sends() {
        let mut session = session();
        session.handle(SessionEvent::Open { now: Instant::now() }).unwrap();

        let mut transmitted = Vec::new();
        for action in
            session.handle(SessionEvent::FrameReceived(BrokerFrame::connected())).unwrap()
        {
            if let SessionAction::Transmit(frame) = action {
                transmitted.push(frame);
            }
        }
        for action in
            session.handle(SessionEvent::Submit { content: "hi".to_string() }).unwrap()
        {
            if let SessionAction::Transmit(frame) = action {
                transmitted.push(frame);
            }
        }

        let join_positions: Vec<usize> = transmitted
            .iter()
            .enumerate()
            .filter(|(_, f)| f.destination() == Some(destinations::JOIN))
            .map(|(i, _)| i)
            .collect();
        let send_positions: Vec<usize> = transmitted
            .iter()
            .enumerate()
            .filter(|(_, f)| f.destination() == Some(destinations::SEND))
            .map(|(i, _)| i)
            .collect();

        assert_eq!(join_positions.len(), 1);
        assert!(send_positions.iter().all(|&s| s > join_positions[0]));
    }
}
