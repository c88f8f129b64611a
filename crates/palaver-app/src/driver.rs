//! Driver trait for abstracting I/O operations.
//!
//! The [`Driver`] trait decouples the application runtime from specific I/O
//! implementations. Each frontend implements the trait to provide
//! platform-specific input, rendering, and transport, while the generic
//! [`crate::Runtime`] handles all orchestration, so the same orchestration
//! code runs in production and in scripted tests.

use std::future::Future;

use palaver_proto::BrokerFrame;

use crate::ChatApp;

/// User intents produced by the platform input layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserInput {
    /// Text submitted through the send control.
    Submit(String),
    /// Quit request.
    Quit,
}

/// Abstracts I/O operations for the application runtime.
///
/// # Implementations
///
/// - **CLI**: line-oriented terminal input, WebSocket transport
/// - **Scripted**: queued inputs and frames for deterministic tests
pub trait Driver: Send {
    /// Platform-specific error type.
    type Error: std::error::Error + Send + 'static;

    /// Poll for the next user input. `None` when nothing is ready.
    fn poll_input(&mut self) -> impl Future<Output = Result<Option<UserInput>, Self::Error>> + Send;

    /// Send a frame to the broker.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection is closed or the send fails.
    fn send_frame(&mut self, frame: BrokerFrame)
    -> impl Future<Output = Result<(), Self::Error>> + Send;

    /// Receive a frame from the broker. `None` when nothing is ready.
    fn recv_frame(&mut self) -> impl Future<Output = Option<BrokerFrame>> + Send;

    /// Establish the transport connection.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be established.
    fn connect(&mut self, url: &str) -> impl Future<Output = Result<(), Self::Error>> + Send;

    /// Whether the transport is currently up.
    fn is_connected(&self) -> bool;

    /// Render the application state.
    ///
    /// # Errors
    ///
    /// Returns an error if rendering fails.
    fn render(&mut self, app: &ChatApp) -> Result<(), Self::Error>;

    /// Scroll the rendered conversation region to its latest entry.
    fn scroll_to_latest(&mut self);

    /// Release the transport and clean up resources.
    fn stop(&mut self);
}
