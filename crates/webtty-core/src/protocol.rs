//! Transport event model and frame codec.
//!
//! The browser client and the server exchange two kinds of traffic over one
//! persistent channel:
//! - raw terminal bytes (keystrokes up, process output down), carried as
//!   binary frames without any envelope, and
//! - structured control events (currently only `resize`), carried as a small
//!   JSON envelope in text frames.
//!
//! Byte order is preserved within each direction; no ordering is guaranteed
//! between directions.
//!
//! This module also defines the two seams the session machinery is generic
//! over: [`Transport`] (the connected channel) and [`ProcessIo`] (the
//! supervised process). Real implementations live in the server crate; test
//! doubles live in webtty-test-utils.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Event received from the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientEvent {
    /// Raw bytes destined for the process stdin.
    Input(Vec<u8>),
    /// Pseudo-terminal dimension change.
    Resize { cols: u16, rows: u16 },
    /// Peer-initiated termination.
    Disconnect,
}

/// Event sent to the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerEvent {
    /// Raw process output bytes.
    Data(Vec<u8>),
}

/// JSON envelope for structured client events.
///
/// Dimensions are decoded as `i64` so that non-positive values can be
/// rejected explicitly instead of wrapping at the u16 boundary.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "lowercase")]
enum Envelope {
    Resize { cols: i64, rows: i64 },
}

/// Decode a text frame into a client event.
///
/// Malformed payloads (unknown event, non-numeric or non-positive
/// dimensions) yield [`Error::MalformedEvent`], which the bridge drops
/// without terminating the session.
pub fn decode_client_text(text: &str) -> Result<ClientEvent> {
    let envelope: Envelope = serde_json::from_str(text).map_err(|e| Error::MalformedEvent {
        message: format!("invalid event envelope: {}", e),
    })?;

    match envelope {
        Envelope::Resize { cols, rows } => {
            if cols < 1 || rows < 1 || cols > u16::MAX as i64 || rows > u16::MAX as i64 {
                return Err(Error::MalformedEvent {
                    message: format!("resize dimensions out of range: {}x{}", cols, rows),
                });
            }
            Ok(ClientEvent::Resize {
                cols: cols as u16,
                rows: rows as u16,
            })
        }
    }
}

/// Encode a resize event as a text frame.
///
/// Used by clients and test drivers; the server only decodes.
pub fn encode_resize(cols: u16, rows: u16) -> String {
    serde_json::to_string(&Envelope::Resize {
        cols: cols as i64,
        rows: rows as i64,
    })
    .expect("resize envelope serializes")
}

/// The connected channel a session duplexes with.
///
/// `recv` resolves with [`Error::ConnectionClosed`] once the peer is gone;
/// recoverable decode failures surface as [`Error::MalformedEvent`].
/// `close` must be safe to call more than once.
pub trait Transport: Send {
    fn send(&mut self, event: ServerEvent) -> impl std::future::Future<Output = Result<()>> + Send;
    fn recv(&mut self) -> impl std::future::Future<Output = Result<ClientEvent>> + Send;
    fn close(&mut self) -> impl std::future::Future<Output = ()> + Send;
}

/// The supervised process a session feeds and drains.
///
/// `recv_output` returns `None` once the process side is finished (exit or
/// relay teardown); `resize` must be idempotent and safe against concurrent
/// writes.
pub trait ProcessIo: Send {
    fn send_input(
        &mut self,
        data: Vec<u8>,
    ) -> impl std::future::Future<Output = Result<()>> + Send;
    fn recv_output(&mut self) -> impl std::future::Future<Output = Option<Vec<u8>>> + Send;
    fn resize(&self, cols: u16, rows: u16) -> Result<()>;
}

// =============================================================================
// Tests
// =============================================================================
