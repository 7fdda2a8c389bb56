//! Protocol and runtime constants.

use std::time::Duration;

/// Default terminal width before the client reports its real size.
pub const DEFAULT_COLS: u16 = 80;

/// Default terminal height before the client reports its real size.
pub const DEFAULT_ROWS: u16 = 24;

/// Capacity of the per-direction relay channels between PTY and transport.
pub const RELAY_CHANNEL_CAPACITY: usize = 256;

/// Read buffer size for PTY output chunks.
pub const PTY_READ_BUF_SIZE: usize = 4096;

/// How long to wait for a killed process to exit before escalating
/// from SIGTERM to SIGKILL.
pub const KILL_GRACE_PERIOD: Duration = Duration::from_secs(2);

/// Polling interval while waiting for a child to be reaped.
pub const EXIT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Query parameter carrying the signed-URL token.
pub const SIGNATURE_PARAM: &str = "signed";

/// Default HTTP base path; the WebSocket endpoint hangs off this.
pub const DEFAULT_BASE_PATH: &str = "/tty";

/// Default SSH port when a remote target is configured.
pub const DEFAULT_SSH_PORT: u16 = 22;

/// Default local command when neither SSH target nor override is set.
pub const DEFAULT_COMMAND: &str = "bash";
