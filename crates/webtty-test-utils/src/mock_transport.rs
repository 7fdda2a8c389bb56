//! Mock transport for testing without a real WebSocket.
//!
//! Provides in-memory channels implementing the [`Transport`] trait, so
//! session and bridge logic can be exercised without any network.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::mpsc;

use webtty_core::error::{Error, Result};
use webtty_core::protocol::{ClientEvent, ServerEvent, Transport};

/// Server-side half of a mock connection.
#[derive(Debug)]
pub struct MockTransport {
    incoming_rx: mpsc::Receiver<ClientEvent>,
    outgoing_tx: mpsc::UnboundedSender<ServerEvent>,
    close_count: Arc<AtomicUsize>,
    closed: bool,
}

/// Client-side driver for a mock connection.
///
/// Dropping `event_tx` simulates network-level connection loss; sending
/// [`ClientEvent::Disconnect`] simulates an orderly client close.
#[derive(Debug)]
pub struct MockClient {
    pub event_tx: mpsc::Sender<ClientEvent>,
    pub data_rx: mpsc::UnboundedReceiver<ServerEvent>,
    close_count: Arc<AtomicUsize>,
}

impl MockClient {
    /// Send raw input bytes to the server.
    pub async fn send_input(&self, data: &[u8]) {
        let _ = self.event_tx.send(ClientEvent::Input(data.to_vec())).await;
    }

    /// Send a resize event to the server.
    pub async fn send_resize(&self, cols: u16, rows: u16) {
        let _ = self.event_tx.send(ClientEvent::Resize { cols, rows }).await;
    }

    /// Send an orderly disconnect.
    pub async fn disconnect(&self) {
        let _ = self.event_tx.send(ClientEvent::Disconnect).await;
    }

    /// Receive the next data event from the server, if any.
    pub async fn recv_data(&mut self) -> Option<Vec<u8>> {
        self.data_rx.recv().await.map(|ServerEvent::Data(d)| d)
    }

    /// How many times the server closed this transport.
    pub fn close_count(&self) -> usize {
        self.close_count.load(Ordering::SeqCst)
    }
}

impl Transport for MockTransport {
    async fn send(&mut self, event: ServerEvent) -> Result<()> {
        if self.closed {
            return Err(Error::ConnectionClosed);
        }
        self.outgoing_tx
            .send(event)
            .map_err(|_| Error::ConnectionClosed)
    }

    async fn recv(&mut self) -> Result<ClientEvent> {
        if self.closed {
            return Err(Error::ConnectionClosed);
        }
        self.incoming_rx.recv().await.ok_or(Error::ConnectionClosed)
    }

    async fn close(&mut self) {
        self.closed = true;
        self.close_count.fetch_add(1, Ordering::SeqCst);
    }
}

/// Create a connected mock transport pair (server half, client driver).
pub fn mock_transport_pair() -> (MockTransport, MockClient) {
    let (event_tx, incoming_rx) = mpsc::channel(64);
    let (outgoing_tx, data_rx) = mpsc::unbounded_channel();
    let close_count = Arc::new(AtomicUsize::new(0));

    let transport = MockTransport {
        incoming_rx,
        outgoing_tx,
        close_count: Arc::clone(&close_count),
        closed: false,
    };
    let client = MockClient {
        event_tx,
        data_rx,
        close_count,
    };

    (transport, client)
}

// =============================================================================
// Tests
// =============================================================================
