//! Generic runtime for application orchestration.
//!
//! The runtime drives the dispatch loop, coordinating between:
//! - [`ChatApp`]: view state machine
//! - [`Bridge`]: protocol bridge to the session
//! - [`Driver`]: platform-specific I/O
//!
//! Everything downstream of the driver runs on this single logical thread:
//! classification, merges, and view mutation never overlap each other or an
//! outbound send. At the end of each dispatch cycle the runtime drains the
//! view observer into at most one scroll action.

use std::time::Instant;

use palaver_client::{ConnectionConfig, ConversationId};

use crate::{AppAction, AppEvent, Bridge, ChatApp, Driver, UserInput};

/// Runtime configuration.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Conversation to open.
    pub conversation_id: ConversationId,
    /// Broker URL handed to the driver's transport.
    pub broker_url: String,
}

/// Generic orchestration loop over a [`Driver`].
pub struct Runtime<D: Driver> {
    driver: D,
    app: ChatApp,
    bridge: Bridge,
    broker_url: String,
    transport_was_up: bool,
}

impl<D: Driver> Runtime<D> {
    /// Create a runtime for one conversation session.
    pub fn new(driver: D, config: RuntimeConfig) -> Self {
        Self {
            driver,
            app: ChatApp::new(),
            bridge: Bridge::new(config.conversation_id, ConnectionConfig::default()),
            broker_url: config.broker_url,
            transport_was_up: false,
        }
    }

    /// Run the dispatch loop until the user quits.
    ///
    /// # Errors
    ///
    /// Returns an error if the driver encounters an I/O error.
    pub async fn run(mut self) -> Result<(), D::Error> {
        self.driver.render(&self.app)?;
        self.connect().await?;

        loop {
            if self.process_cycle().await? {
                break;
            }
        }

        self.teardown().await
    }

    /// Establish the transport and start the broker handshake.
    ///
    /// A failed connect is the handshake-failure path: the session goes
    /// offline and stays recoverable only by a fresh session, per contract.
    async fn connect(&mut self) -> Result<(), D::Error> {
        match self.driver.connect(&self.broker_url).await {
            Ok(()) => {
                self.transport_was_up = true;
                let events = self.bridge.open(Instant::now());
                self.flush_outgoing().await?;
                let _ = self.process_events(events).await?;
            }
            Err(error) => {
                tracing::warn!(%error, "transport connect failed");
                let events = self.bridge.transport_closed(error.to_string());
                let _ = self.process_events(events).await?;
            }
        }
        Ok(())
    }

    /// One dispatch cycle. Returns `true` when the application should quit.
    async fn process_cycle(&mut self) -> Result<bool, D::Error> {
        if let Some(input) = self.driver.poll_input().await? {
            let actions = match input {
                UserInput::Submit(text) => self.app.submit_input(&text),
                UserInput::Quit => self.app.quit(),
            };
            if self.process_actions(actions).await? {
                return Ok(true);
            }
        }

        if self.driver.is_connected() {
            if let Some(frame) = self.driver.recv_frame().await {
                let events = self.bridge.handle_frame(frame);
                self.flush_outgoing().await?;
                if self.process_events(events).await? {
                    return Ok(true);
                }
            }
        } else if self.transport_was_up {
            self.transport_was_up = false;
            let events = self.bridge.transport_closed("transport dropped");
            if self.process_events(events).await? {
                return Ok(true);
            }
        }

        let events = self.bridge.handle_tick(Instant::now());
        if self.process_events(events).await? {
            return Ok(true);
        }

        // However many merges landed this cycle, scroll at most once
        if self.app.take_scroll() {
            self.driver.scroll_to_latest();
        }

        Ok(false)
    }

    /// Feed events through the app and execute the resulting actions.
    ///
    /// Returns `true` when the application should quit.
    async fn process_events(&mut self, events: Vec<AppEvent>) -> Result<bool, D::Error> {
        let mut actions = Vec::new();
        for event in events {
            actions.extend(self.app.handle(event));
        }
        self.process_actions(actions).await
    }

    /// Execute app actions, iterating until the queue drains.
    ///
    /// Returns `true` when the application should quit.
    async fn process_actions(&mut self, initial: Vec<AppAction>) -> Result<bool, D::Error> {
        let mut pending = initial;
        while !pending.is_empty() {
            let actions = std::mem::take(&mut pending);
            for action in actions {
                match action {
                    AppAction::Render => self.driver.render(&self.app)?,
                    AppAction::Quit => return Ok(true),
                    AppAction::Submit { content } => {
                        let events = self.bridge.submit(content);
                        self.flush_outgoing().await?;
                        for event in events {
                            pending.extend(self.app.handle(event));
                        }
                    }
                }
            }
        }
        Ok(false)
    }

    /// Tear the session down: the observer stops and the router clears
    /// before the transport is released, so nothing fires against a
    /// torn-down view.
    async fn teardown(&mut self) -> Result<(), D::Error> {
        self.app.teardown();
        let events = self.bridge.close();
        if self.driver.is_connected() {
            self.flush_outgoing().await?;
        } else {
            let _ = self.bridge.take_outgoing();
        }
        let _ = self.process_events(events).await?;
        self.driver.stop();
        Ok(())
    }

    /// Send all pending outgoing frames to the broker.
    async fn flush_outgoing(&mut self) -> Result<(), D::Error> {
        for frame in self.bridge.take_outgoing() {
            self.driver.send_frame(frame).await?;
        }
        Ok(())
    }

    /// The app state (for assertions and rendering).
    pub fn app(&self) -> &ChatApp {
        &self.app
    }
}
