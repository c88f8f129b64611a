//! WebSocket transport for the session.
//!
//! Provides [`ConnectedTransport`], which handles WebSocket I/O for broker
//! frames. This is a thin layer that just sends and receives frames over
//! text messages - protocol logic remains in the Sans-IO
//! [`crate::ConversationSession`].

use futures::{SinkExt, StreamExt};
use palaver_proto::BrokerFrame;
use thiserror::Error;
use tokio::{net::TcpStream, sync::mpsc};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};

/// Transport errors.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Connection could not be established.
    #[error("connection failed: {0}")]
    Connect(String),

    /// Socket failed mid-stream.
    #[error("stream error: {0}")]
    Stream(String),
}

/// Handle to a live broker connection.
///
/// Frames are exchanged via the channels; an internal task owns the socket.
/// When the socket drops, `from_broker` closes, which the runtime turns
/// into a transport-closed event for the session.
pub struct ConnectedTransport {
    /// Send frames to the broker.
    pub to_broker: mpsc::Sender<BrokerFrame>,
    /// Receive frames from the broker.
    pub from_broker: mpsc::Receiver<BrokerFrame>,
    /// Abort handle for the connection task.
    abort_handle: tokio::task::AbortHandle,
}

impl ConnectedTransport {
    /// Stop the connection task.
    pub fn stop(&self) {
        self.abort_handle.abort();
    }
}

/// Connect to a broker over WebSocket.
///
/// # Errors
///
/// `TransportError::Connect` if the socket cannot be established.
pub async fn connect(url: &str) -> Result<ConnectedTransport, TransportError> {
    let (socket, _response) =
        connect_async(url).await.map_err(|e| TransportError::Connect(e.to_string()))?;

    let (to_broker_tx, to_broker_rx) = mpsc::channel::<BrokerFrame>(32);
    let (from_broker_tx, from_broker_rx) = mpsc::channel::<BrokerFrame>(32);

    let handle = tokio::spawn(run_connection(socket, to_broker_rx, from_broker_tx));

    Ok(ConnectedTransport {
        to_broker: to_broker_tx,
        from_broker: from_broker_rx,
        abort_handle: handle.abort_handle(),
    })
}

/// Run the connection, bridging between the channels and the socket.
async fn run_connection(
    socket: WebSocketStream<MaybeTlsStream<TcpStream>>,
    mut outbound: mpsc::Receiver<BrokerFrame>,
    inbound: mpsc::Sender<BrokerFrame>,
) {
    let (mut sink, mut stream) = socket.split();

    let send_task = tokio::spawn(async move {
        while let Some(frame) = outbound.recv().await {
            if sink.send(Message::Text(frame.encode())).await.is_err() {
                break;
            }
        }
        let _ = sink.send(Message::Close(None)).await;
    });

    while let Some(message) = stream.next().await {
        match message {
            Ok(Message::Text(text)) => {
                // Bare newlines are broker heart-beats, not frames
                if text.trim_matches(['\n', '\r']).is_empty() {
                    continue;
                }
                match BrokerFrame::decode(&text) {
                    Ok(frame) => {
                        if inbound.send(frame).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => tracing::warn!(error = %e, "dropping undecodable frame"),
                }
            }
            Ok(Message::Binary(_)) => {
                tracing::warn!("dropping unexpected binary message");
            }
            Ok(Message::Close(_)) | Err(_) => break,
            Ok(_) => {} // Ping/Pong handled by tungstenite
        }
    }

    send_task.abort();
}
