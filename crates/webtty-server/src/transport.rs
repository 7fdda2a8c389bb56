//! WebSocket implementation of the session transport.
//!
//! Frame mapping:
//! - binary frames carry raw terminal bytes in both directions
//! - text frames carry the JSON control envelope (resize)
//! - a close frame is an orderly disconnect

use axum::extract::ws::{Message, WebSocket};
use tracing::debug;

use webtty_core::error::{Error, Result};
use webtty_core::protocol::{ClientEvent, ServerEvent, Transport, decode_client_text};

/// [`Transport`] over an upgraded WebSocket.
pub struct WsTransport {
    socket: WebSocket,
    closed: bool,
}

impl WsTransport {
    pub fn new(socket: WebSocket) -> Self {
        Self {
            socket,
            closed: false,
        }
    }
}

impl Transport for WsTransport {
    async fn send(&mut self, event: ServerEvent) -> Result<()> {
        let ServerEvent::Data(data) = event;
        self.socket
            .send(Message::Binary(data))
            .await
            .map_err(|e| Error::Transport {
                message: format!("websocket send failed: {}", e),
            })
    }

    async fn recv(&mut self) -> Result<ClientEvent> {
        loop {
            match self.socket.recv().await {
                Some(Ok(Message::Binary(data))) => return Ok(ClientEvent::Input(data)),
                // Malformed envelopes propagate as recoverable errors; the
                // caller drops them without ending the session.
                Some(Ok(Message::Text(text))) => return decode_client_text(&text),
                Some(Ok(Message::Close(_))) => return Ok(ClientEvent::Disconnect),
                Some(Ok(Message::Ping(_) | Message::Pong(_))) => continue,
                Some(Err(e)) => {
                    debug!(error = %e, "WebSocket receive error");
                    return Err(Error::ConnectionClosed);
                }
                None => return Err(Error::ConnectionClosed),
            }
        }
    }

    async fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        let _ = self.socket.send(Message::Close(None)).await;
    }
}
