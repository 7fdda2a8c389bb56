//! Session lifecycle.
//!
//! A session is born when a client's channel upgrade completes and dies
//! when the process exits or the client leaves. The lifecycle is a strict
//! phase progression; each phase can fail the session forward into
//! teardown, never backward.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use tracing::{debug, info, warn};

use webtty_core::command::{self, CommandSpec};
use webtty_core::config::{ServerOptions, SshTarget};
use webtty_core::constants::{DEFAULT_COLS, DEFAULT_ROWS, KILL_GRACE_PERIOD};
use webtty_core::protocol::Transport;
use webtty_core::signature;

use crate::bridge::{self, CloseReason};
use crate::gauge::ConnectionGauge;
use crate::pty::{ExitStatus, PtyProcess, PtySession};

static NEXT_SESSION_ID: AtomicU64 = AtomicU64::new(1);

/// Lifecycle phase. Strictly forward; no phase is ever revisited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SessionPhase {
    Connecting,
    Authenticating,
    Resolving,
    Spawning,
    Streaming,
    Closing,
    Closed,
}

/// Per-connection state. Never shared between sessions.
struct Session {
    id: u64,
    phase: SessionPhase,
    created_at: Instant,
}

impl Session {
    fn new() -> Self {
        Self {
            id: NEXT_SESSION_ID.fetch_add(1, Ordering::Relaxed),
            phase: SessionPhase::Connecting,
            created_at: Instant::now(),
        }
    }

    fn advance(&mut self, phase: SessionPhase) {
        debug_assert!(phase > self.phase);
        debug!(session = self.id, from = ?self.phase, to = ?phase, "Session phase");
        self.phase = phase;
    }
}

/// Shared server state handed to every session.
#[derive(Clone)]
pub struct ServerContext {
    pub options: Arc<ServerOptions>,
    pub ssh: Arc<SshTarget>,
    pub gauge: Arc<ConnectionGauge>,
}

impl ServerContext {
    pub fn new(options: ServerOptions, ssh: SshTarget) -> Self {
        Self {
            options: Arc::new(options),
            ssh: Arc::new(ssh),
            gauge: ConnectionGauge::new(),
        }
    }

    /// Resolve the command a fresh session will run.
    pub fn resolve_command(&self) -> CommandSpec {
        command::resolve(
            &self.ssh,
            self.options.override_command.as_deref(),
            self.options.force_ssh,
            &self.options.default_command,
        )
    }
}

/// How a session ended, for logging and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// Signature verification rejected the connection before any spawn.
    Unverified,
    /// The resolved command failed to start.
    SpawnFailed,
    /// The process exited; carries the reaped status when available.
    ProcessExit(Option<ExitStatus>),
    /// The client went away first.
    Disconnect,
}

/// Drive one session from accepted transport to teardown.
///
/// The connection is counted for its entire lifetime, including failed
/// verification and failed spawn. The transport is closed exactly once on
/// every path.
pub async fn run<T: Transport>(
    mut transport: T,
    referer: Option<String>,
    ctx: ServerContext,
) -> SessionEnd {
    let mut session = Session::new();
    let id = session.id;
    let _guard = ctx.gauge.acquire();

    session.advance(SessionPhase::Authenticating);
    if let Err(e) = signature::verify(referer.as_deref(), ctx.options.signing_secret.as_deref()) {
        warn!(session = id, error = %e, "Rejecting unverified connection");
        session.advance(SessionPhase::Closing);
        transport.close().await;
        session.advance(SessionPhase::Closed);
        return SessionEnd::Unverified;
    }

    session.advance(SessionPhase::Resolving);
    let spec = ctx.resolve_command();
    debug!(session = id, command = %spec, "Command resolved");

    session.advance(SessionPhase::Spawning);
    let pty = match PtyProcess::spawn(&spec, DEFAULT_COLS, DEFAULT_ROWS, &[]) {
        Ok(pty) => Arc::new(pty),
        Err(e) => {
            warn!(session = id, command = %spec, error = %e, "Failed to start session process");
            session.advance(SessionPhase::Closing);
            transport.close().await;
            session.advance(SessionPhase::Closed);
            return SessionEnd::SpawnFailed;
        }
    };

    session.advance(SessionPhase::Streaming);
    info!(session = id, command = %spec, pid = %pty.pid(), "Session streaming");

    let mut process = PtySession::start(Arc::clone(&pty));
    let reason = bridge::run(&mut transport, &mut process).await;
    session.advance(SessionPhase::Closing);

    let end = match reason {
        CloseReason::Disconnect => {
            // Client left; the process gets SIGTERM, then SIGKILL if it
            // ignores the grace period.
            if let Err(e) = pty.kill() {
                warn!(session = id, error = %e, "Failed to terminate session process");
            }
            if pty.wait_exit(KILL_GRACE_PERIOD).await.is_none() {
                warn!(session = id, "Process ignored SIGTERM, escalating");
                let _ = pty.kill_force();
                pty.wait_exit(KILL_GRACE_PERIOD).await;
            }
            SessionEnd::Disconnect
        }
        CloseReason::ProcessExit => {
            let status = pty.wait_exit(KILL_GRACE_PERIOD).await;
            SessionEnd::ProcessExit(status)
        }
    };

    transport.close().await;
    session.advance(SessionPhase::Closed);
    info!(
        session = id,
        end = ?end,
        elapsed_ms = session.created_at.elapsed().as_millis() as u64,
        "Session closed"
    );
    end
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use webtty_test_utils::mock_transport_pair;

    fn signed_ctx(secret: &str) -> ServerContext {
        let options = ServerOptions {
            signing_secret: Some(secret.to_string()),
            default_command: "/bin/sh".to_string(),
            ..Default::default()
        };
        ServerContext::new(options, SshTarget::default())
    }

    #[tokio::test]
    async fn unverified_session_closes_before_spawn() {
        let ctx = signed_ctx("s3cret");
        let (transport, client) = mock_transport_pair();

        let end = run(transport, Some("http://host/tty".to_string()), ctx.clone()).await;

        assert_eq!(end, SessionEnd::Unverified);
        assert_eq!(client.close_count(), 1);
        assert_eq!(ctx.gauge.active(), 0);
    }

    #[tokio::test]
    async fn verified_referer_passes_gate() {
        let secret = "s3cret";
        let url = signature::sign("http://host/tty?user=bob", secret).unwrap();
        let ctx = signed_ctx(secret);
        let (transport, client) = mock_transport_pair();

        // The command spawns for real; disconnect immediately so the
        // session tears the process down.
        client.disconnect().await;
        let end = run(transport, Some(url), ctx.clone()).await;

        assert_ne!(end, SessionEnd::Unverified);
        assert_eq!(client.close_count(), 1);
        assert_eq!(ctx.gauge.active(), 0);
    }

    #[tokio::test]
    async fn spawn_failure_counts_and_closes() {
        let options = ServerOptions {
            default_command: "/nonexistent\0binary".to_string(),
            ..Default::default()
        };
        let ctx = ServerContext::new(options, SshTarget::default());
        let (transport, client) = mock_transport_pair();

        let end = run(transport, None, ctx.clone()).await;

        assert_eq!(end, SessionEnd::SpawnFailed);
        assert_eq!(client.close_count(), 1);
        assert_eq!(ctx.gauge.active(), 0);
    }

    #[tokio::test]
    async fn process_exit_reaps_status() {
        let options = ServerOptions {
            default_command: "/bin/sh -c exit".to_string(),
            ..Default::default()
        };
        let ctx = ServerContext::new(options, SshTarget::default());
        let (transport, client) = mock_transport_pair();

        let end = run(transport, None, ctx.clone()).await;

        assert!(matches!(end, SessionEnd::ProcessExit(_)));
        assert_eq!(client.close_count(), 1);
        assert_eq!(ctx.gauge.active(), 0);
    }

    #[test]
    fn phases_are_strictly_ordered() {
        assert!(SessionPhase::Connecting < SessionPhase::Authenticating);
        assert!(SessionPhase::Authenticating < SessionPhase::Resolving);
        assert!(SessionPhase::Resolving < SessionPhase::Spawning);
        assert!(SessionPhase::Spawning < SessionPhase::Streaming);
        assert!(SessionPhase::Streaming < SessionPhase::Closing);
        assert!(SessionPhase::Closing < SessionPhase::Closed);
    }

    #[test]
    fn session_ids_are_unique() {
        let a = NEXT_SESSION_ID.fetch_add(1, Ordering::Relaxed);
        let b = NEXT_SESSION_ID.fetch_add(1, Ordering::Relaxed);
        assert!(b > a);
    }
}
