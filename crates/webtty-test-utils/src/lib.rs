//! Test utilities for webtty.
//!
//! Provides in-memory doubles for the two seams the session machinery is
//! generic over:
//! - [`mock_transport`]: a channel-backed [`webtty_core::protocol::Transport`]
//! - [`fake_pty`]: a scripted [`webtty_core::protocol::ProcessIo`]

pub mod fake_pty;
pub mod mock_transport;

pub use fake_pty::{FakePty, FakePtyDriver};
pub use mock_transport::{MockClient, MockTransport, mock_transport_pair};
