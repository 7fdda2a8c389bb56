//! webtty server: bridges a shell behind a PTY to browser terminals over
//! a persistent WebSocket.
//!
//! Module map:
//! - [`pty`]: process supervision on a pseudo-terminal
//! - [`bridge`]: the transport <-> process relay loop
//! - [`session`]: lifecycle orchestration from upgrade to teardown
//! - [`transport`]: the WebSocket [`webtty_core::protocol::Transport`]
//! - [`gauge`]: active-connection accounting
//! - [`http`]: routes, upgrade handling, metrics and health endpoints
//! - [`html`]: the bootstrap page
//! - [`cli`]: command-line surface

pub mod bridge;
pub mod cli;
pub mod gauge;
pub mod html;
pub mod http;
pub mod pty;
pub mod session;
pub mod transport;
