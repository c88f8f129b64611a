//! Connection lifecycle state machine.
//!
//! Tracks the health of one broker connection attempt and exposes
//! transitions to the session. Pure state, no I/O; time is passed into the
//! methods that need it so the machine works with both real and shifted
//! instants in tests.
//!
//! # State machine
//!
//! ```text
//! ┌──────────────┐  open()   ┌────────────┐  CONNECTED   ┌───────────┐
//! │ Disconnected │──────────>│ Connecting │─────────────>│ Connected │
//! └──────────────┘           └────────────┘              └───────────┘
//!                                  │ error / deadline          │ error / close()
//!                                  ↓                           ↓
//!                             ┌────────┐                  ┌────────┐
//!                             │ Closed │<── open() starts │ Closed │
//!                             └────────┘    a fresh epoch └────────┘
//! ```
//!
//! Transitions are monotonic within one attempt epoch; `open()` on a closed
//! machine begins a new epoch rather than reviving the old one.

use std::{
    ops::Sub,
    time::{Duration, Instant},
};

use crate::error::SessionError;

/// Time allowed for the broker handshake to complete.
pub const DEFAULT_HANDSHAKE_DEADLINE: Duration = Duration::from_secs(30);

/// Connection state, read by the UI status indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Initial state, no attempt started.
    Disconnected,
    /// CONNECT sent, waiting for the broker acknowledgement.
    Connecting,
    /// Handshake acknowledged; sends are accepted.
    Connected,
    /// Terminal per attempt (graceful teardown or failure).
    Closed,
}

/// Connection configuration.
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Deadline for completing the handshake once `open()` is called.
    pub handshake_deadline: Duration,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self { handshake_deadline: DEFAULT_HANDSHAKE_DEADLINE }
    }
}

/// Lifecycle state machine for one conversation session's connection.
///
/// Generic over `I` (instant type) so deadline checks are testable with
/// shifted instants.
#[derive(Debug, Clone)]
pub struct ConnectionMachine<I = Instant>
where
    I: Copy + Ord + Sub<Output = Duration>,
{
    state: ConnectionState,
    config: ConnectionConfig,
    /// Attempt counter. Bumped by `open()`; never reused.
    epoch: u64,
    /// When the current attempt entered `Connecting`.
    attempt_started: Option<I>,
}

impl<I> ConnectionMachine<I>
where
    I: Copy + Ord + Sub<Output = Duration>,
{
    /// Create a machine in [`ConnectionState::Disconnected`].
    pub fn new(config: ConnectionConfig) -> Self {
        Self { state: ConnectionState::Disconnected, config, epoch: 0, attempt_started: None }
    }

    /// Current state.
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Attempt epoch. Zero until the first `open()`.
    pub fn attempt_epoch(&self) -> u64 {
        self.epoch
    }

    /// Whether sends are currently accepted.
    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }

    /// Begin a connection attempt.
    ///
    /// Allowed from `Disconnected` and `Closed` (a fresh epoch); an attempt
    /// is already live in every other state.
    ///
    /// # Errors
    ///
    /// `SessionError::InvalidState` from `Connecting` or `Connected`.
    pub fn open(&mut self, now: I) -> Result<u64, SessionError> {
        match self.state {
            ConnectionState::Disconnected | ConnectionState::Closed => {
                self.epoch = self.epoch.saturating_add(1);
                self.state = ConnectionState::Connecting;
                self.attempt_started = Some(now);
                Ok(self.epoch)
            }
            state => Err(SessionError::InvalidState { state, operation: "open" }),
        }
    }

    /// Record a successful broker handshake.
    ///
    /// # Errors
    ///
    /// `SessionError::InvalidState` unless the machine is `Connecting`.
    pub fn handshake_complete(&mut self) -> Result<(), SessionError> {
        if self.state != ConnectionState::Connecting {
            return Err(SessionError::InvalidState {
                state: self.state,
                operation: "complete handshake",
            });
        }
        self.state = ConnectionState::Connected;
        self.attempt_started = None;
        Ok(())
    }

    /// Elapsed time past the handshake deadline, if exceeded.
    ///
    /// Only a `Connecting` machine has a deadline; every other state
    /// returns `None`.
    pub fn check_deadline(&self, now: I) -> Option<Duration> {
        if self.state != ConnectionState::Connecting {
            return None;
        }
        let started = self.attempt_started?;
        let elapsed = now - started;
        (elapsed > self.config.handshake_deadline).then_some(elapsed)
    }

    /// Close the connection. Idempotent, legal from any state.
    pub fn close(&mut self) {
        self.state = ConnectionState::Closed;
        self.attempt_started = None;
    }
}
