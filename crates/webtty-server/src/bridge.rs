//! Bidirectional relay between a transport and a process.
//!
//! A single select loop duplexes the two directions: client input and
//! resize events flow to the process, process output flows to the client.
//! The loop is the sole decider of why a session's streaming phase ended.

use tracing::{debug, warn};

use webtty_core::protocol::{ClientEvent, ProcessIo, ServerEvent, Transport};

/// Why the streaming phase ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    /// The process finished (or its output side went away).
    ProcessExit,
    /// The client disconnected or the transport failed.
    Disconnect,
}

/// Pump both directions until one side ends.
///
/// Recoverable transport errors (malformed control events) are logged and
/// dropped without affecting the byte streams. Resize failures are logged
/// and the session continues.
pub async fn run<T, P>(transport: &mut T, process: &mut P) -> CloseReason
where
    T: Transport,
    P: ProcessIo,
{
    loop {
        tokio::select! {
            output = process.recv_output() => {
                match output {
                    Some(data) => {
                        if let Err(e) = transport.send(ServerEvent::Data(data)).await {
                            debug!(error = %e, "Transport send failed");
                            return CloseReason::Disconnect;
                        }
                    }
                    None => return CloseReason::ProcessExit,
                }
            }
            event = transport.recv() => {
                match event {
                    Ok(ClientEvent::Input(data)) => {
                        if let Err(e) = process.send_input(data).await {
                            debug!(error = %e, "Process input failed");
                            return CloseReason::ProcessExit;
                        }
                    }
                    Ok(ClientEvent::Resize { cols, rows }) => {
                        if let Err(e) = process.resize(cols, rows) {
                            warn!(error = %e, cols, rows, "Resize failed");
                        }
                    }
                    Ok(ClientEvent::Disconnect) => return CloseReason::Disconnect,
                    Err(e) if e.is_recoverable() => {
                        warn!(error = %e, "Dropping malformed client event");
                    }
                    Err(e) => {
                        debug!(error = %e, "Transport receive failed");
                        return CloseReason::Disconnect;
                    }
                }
            }
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use webtty_test_utils::{FakePty, mock_transport_pair};

    #[tokio::test]
    async fn output_flows_to_client() {
        let (mut transport, mut client) = mock_transport_pair();
        let (mut pty, mut driver) = FakePty::new();

        driver.write_output(b"$ ").await;

        let handle = tokio::spawn(async move {
            let reason = run(&mut transport, &mut pty).await;
            (reason, transport)
        });

        assert_eq!(client.recv_data().await.unwrap(), b"$ ");

        driver.exit();
        let (reason, _) = handle.await.unwrap();
        assert_eq!(reason, CloseReason::ProcessExit);
    }

    #[tokio::test]
    async fn input_and_resize_flow_to_process() {
        let (mut transport, client) = mock_transport_pair();
        let (mut pty, driver) = FakePty::new();

        client.send_input(b"ls\r").await;
        client.send_resize(120, 40).await;
        client.disconnect().await;

        let reason = run(&mut transport, &mut pty).await;
        assert_eq!(reason, CloseReason::Disconnect);

        assert_eq!(driver.read_input(), b"ls\r");
        assert_eq!(driver.resize_calls(), vec![(120, 40)]);
    }

    #[tokio::test]
    async fn connection_loss_ends_loop() {
        let (mut transport, client) = mock_transport_pair();
        let (mut pty, _driver) = FakePty::new();

        drop(client.event_tx);

        let reason = run(&mut transport, &mut pty).await;
        assert_eq!(reason, CloseReason::Disconnect);
    }

    #[tokio::test]
    async fn process_exit_ends_loop() {
        let (mut transport, _client) = mock_transport_pair();
        let (mut pty, mut driver) = FakePty::new();

        driver.exit();

        let reason = run(&mut transport, &mut pty).await;
        assert_eq!(reason, CloseReason::ProcessExit);
    }
}
