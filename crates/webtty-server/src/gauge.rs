//! Connection accounting.
//!
//! One global gauge tracks concurrently active sessions. Pairing of
//! increment and decrement is enforced with an RAII guard so that no exit
//! path (verification failure, spawn failure, process exit, disconnect,
//! panic unwinding through the session) can leak a count.

use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use metrics::{decrement_gauge, increment_gauge};
use tracing::debug;

const GAUGE_NAME: &str = "webtty_connections";

/// Counter of currently active sessions.
#[derive(Debug, Default)]
pub struct ConnectionGauge {
    active: AtomicI64,
}

impl ConnectionGauge {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Register a new connection. The returned guard decrements on drop.
    ///
    /// The recorder sees a delta, not a read-back absolute, so concurrent
    /// open/close pairs cannot publish stale values out of order.
    pub fn acquire(self: &Arc<Self>) -> ConnectionGuard {
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        increment_gauge!(GAUGE_NAME, 1.0);
        debug!(active = now, "Connection opened");
        ConnectionGuard {
            gauge: Arc::clone(self),
        }
    }

    /// Current number of active sessions.
    pub fn active(&self) -> i64 {
        self.active.load(Ordering::SeqCst)
    }
}

/// RAII handle for one active connection.
pub struct ConnectionGuard {
    gauge: Arc<ConnectionGauge>,
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        let now = self.gauge.active.fetch_sub(1, Ordering::SeqCst) - 1;
        decrement_gauge!(GAUGE_NAME, 1.0);
        debug!(active = now, "Connection closed");
    }
}

// =============================================================================
// Tests
// =============================================================================
