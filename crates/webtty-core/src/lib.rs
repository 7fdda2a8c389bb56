//! webtty-core: Shared library for the webtty session protocol.
//!
//! This crate provides:
//! - Transport event model and WebSocket frame codec
//! - Signed-URL verification
//! - Command resolution (local shell vs. SSH invocation)
//! - Configuration types with startup validation
//! - Logging setup

pub mod command;
pub mod config;
pub mod constants;
pub mod error;
pub mod logging;
pub mod protocol;
pub mod signature;

pub use error::{Error, Result};
pub use logging::{LogFormat, init_logging};
