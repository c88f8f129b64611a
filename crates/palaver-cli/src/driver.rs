//! Line-oriented terminal driver.
//!
//! Implements [`Driver`] over the WebSocket transport: stdin lines become
//! send-control submissions (`/quit` to exit), and newly merged view
//! entries are printed as they land. Rendering is incremental; a terminal
//! is already "scrolled to latest" by printing, so the scroll action only
//! needs to exist, not move anything.

use std::time::Duration;

use palaver_app::{Attribution, ChatApp, Driver, UserInput};
use palaver_client::transport::{self, ConnectedTransport, TransportError};
use palaver_proto::BrokerFrame;
use thiserror::Error;
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    sync::mpsc,
};

/// How long one dispatch cycle waits for user input before moving on.
const INPUT_POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Terminal driver errors.
#[derive(Debug, Error)]
pub enum DriverError {
    /// Transport-level failure.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The broker channel is gone.
    #[error("broker channel closed")]
    ChannelClosed,
}

/// Driver wiring stdin, stdout, and the WebSocket transport together.
pub struct TerminalDriver {
    transport: Option<ConnectedTransport>,
    transport_alive: bool,
    input: mpsc::Receiver<String>,
    printed_entries: usize,
    shown_activity: Option<String>,
    shown_status: Option<bool>,
    shown_note: Option<String>,
}

impl TerminalDriver {
    /// Create a driver and start the background stdin reader.
    pub fn new() -> Self {
        let (line_tx, line_rx) = mpsc::channel(16);
        tokio::spawn(async move {
            let mut lines = BufReader::new(tokio::io::stdin()).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                if line_tx.send(line).await.is_err() {
                    break;
                }
            }
        });

        Self {
            transport: None,
            transport_alive: false,
            input: line_rx,
            printed_entries: 0,
            shown_activity: None,
            shown_status: None,
            shown_note: None,
        }
    }
}

impl Default for TerminalDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl Driver for TerminalDriver {
    type Error = DriverError;

    async fn poll_input(&mut self) -> Result<Option<UserInput>, Self::Error> {
        match tokio::time::timeout(INPUT_POLL_INTERVAL, self.input.recv()).await {
            Ok(Some(line)) if line.trim() == "/quit" => Ok(Some(UserInput::Quit)),
            Ok(Some(line)) => Ok(Some(UserInput::Submit(line))),
            // Stdin closed: treat as a quit request
            Ok(None) => Ok(Some(UserInput::Quit)),
            Err(_) => Ok(None),
        }
    }

    async fn send_frame(&mut self, frame: BrokerFrame) -> Result<(), Self::Error> {
        let transport = self.transport.as_ref().ok_or(DriverError::ChannelClosed)?;
        transport.to_broker.send(frame).await.map_err(|_| DriverError::ChannelClosed)
    }

    async fn recv_frame(&mut self) -> Option<BrokerFrame> {
        let transport = self.transport.as_mut()?;
        match transport.from_broker.try_recv() {
            Ok(frame) => Some(frame),
            Err(mpsc::error::TryRecvError::Empty) => None,
            Err(mpsc::error::TryRecvError::Disconnected) => {
                self.transport_alive = false;
                None
            }
        }
    }

    async fn connect(&mut self, url: &str) -> Result<(), Self::Error> {
        let transport = transport::connect(url).await?;
        self.transport = Some(transport);
        self.transport_alive = true;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.transport.is_some() && self.transport_alive
    }

    fn render(&mut self, app: &ChatApp) -> Result<(), Self::Error> {
        let online = app.is_online();
        if self.shown_status != Some(online) {
            self.shown_status = Some(online);
            println!("[{}]", if online { "connected" } else { "disconnected" });
        }

        let entries: Vec<_> = app.view().messages().collect();
        for entry in entries.iter().skip(self.printed_entries) {
            match &entry.attribution {
                Attribution::Own => println!("you: {}", entry.content),
                Attribution::Participant { name } => println!("{name}: {}", entry.content),
            }
        }
        self.printed_entries = entries.len();

        let activity = app.view().activity().map(str::to_string);
        if activity != self.shown_activity {
            if let Some(text) = &activity {
                println!("({text})");
            }
            self.shown_activity = activity;
        }

        let note = app.status_message().map(str::to_string);
        if note != self.shown_note {
            if let Some(text) = &note {
                println!("* {text}");
            }
            self.shown_note = note;
        }

        Ok(())
    }

    fn scroll_to_latest(&mut self) {
        // Printing is already append-only; latest output is the bottom
    }

    fn stop(&mut self) {
        if let Some(transport) = self.transport.take() {
            transport.stop();
        }
        self.transport_alive = false;
    }
}
