//! End-to-end session behavior over a mock transport with real processes.
//!
//! Covers the accounting, teardown, and reconnect guarantees that cut
//! across the session, bridge, and gauge modules.

use webtty_core::config::{ServerOptions, SshTarget};
use webtty_core::logging::init_test_logging;
use webtty_server::session::{self, ServerContext, SessionEnd};
use webtty_test_utils::mock_transport_pair;

fn ctx_with_command(command: &str) -> ServerContext {
    let options = ServerOptions {
        default_command: command.to_string(),
        ..Default::default()
    };
    ServerContext::new(options, SshTarget::default())
}

#[tokio::test]
async fn process_exit_closes_transport_exactly_once() {
    init_test_logging();
    let ctx = ctx_with_command("/bin/sh -c exit");
    let (transport, client) = mock_transport_pair();

    let end = session::run(transport, None, ctx.clone()).await;

    assert!(matches!(end, SessionEnd::ProcessExit(_)));
    assert_eq!(client.close_count(), 1);
    assert_eq!(ctx.gauge.active(), 0);
}

#[tokio::test]
async fn client_disconnect_tears_down_process() {
    init_test_logging();
    let ctx = ctx_with_command("/bin/sh");
    let (transport, client) = mock_transport_pair();

    client.disconnect().await;
    let end = session::run(transport, None, ctx.clone()).await;

    assert_eq!(end, SessionEnd::Disconnect);
    assert_eq!(client.close_count(), 1);
    assert_eq!(ctx.gauge.active(), 0);
}

#[tokio::test]
async fn process_output_reaches_client() {
    init_test_logging();
    let ctx = ctx_with_command("/bin/echo hello");
    let (transport, mut client) = mock_transport_pair();

    let handle = tokio::spawn(session::run(transport, None, ctx.clone()));

    let mut seen = Vec::new();
    while let Some(chunk) = client.recv_data().await {
        seen.extend_from_slice(&chunk);
        if seen.windows(5).any(|w| w == b"hello") {
            break;
        }
    }
    assert!(seen.windows(5).any(|w| w == b"hello"));

    let end = handle.await.unwrap();
    assert!(matches!(end, SessionEnd::ProcessExit(_)));
    assert_eq!(client.close_count(), 1);
}

#[tokio::test]
async fn gauge_tracks_concurrent_sessions() {
    init_test_logging();
    let ctx = ctx_with_command("/bin/sh");

    let mut handles = Vec::new();
    let mut clients = Vec::new();
    for _ in 0..4 {
        let (transport, client) = mock_transport_pair();
        handles.push(tokio::spawn(session::run(transport, None, ctx.clone())));
        clients.push(client);
    }

    // All four sessions counted while streaming.
    for _ in 0..100 {
        if ctx.gauge.active() == 4 {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    }
    assert_eq!(ctx.gauge.active(), 4);

    for client in &clients {
        client.disconnect().await;
    }
    for handle in handles {
        assert_eq!(handle.await.unwrap(), SessionEnd::Disconnect);
    }

    assert_eq!(ctx.gauge.active(), 0);
    for client in &clients {
        assert_eq!(client.close_count(), 1);
    }
}

#[tokio::test]
async fn reconnect_gets_a_fresh_process() {
    init_test_logging();
    // Each connection asks its shell for its pid; two connections must
    // be served by different processes.
    let ctx = ctx_with_command("/bin/sh");

    let mut pids = Vec::new();
    for _ in 0..2 {
        let (transport, mut client) = mock_transport_pair();
        let handle = tokio::spawn(session::run(transport, None, ctx.clone()));

        // The shell prints its pid and exits; the session then closes on
        // its own, so draining to end of stream cannot race the prompt.
        client.send_input(b"echo pid:$$; exit\r").await;

        let seen = tokio::time::timeout(std::time::Duration::from_secs(10), async {
            let mut seen = String::new();
            while let Some(data) = client.recv_data().await {
                seen.push_str(&String::from_utf8_lossy(&data));
            }
            seen
        })
        .await
        .expect("session did not close in time");

        // The line echo repeats "pid:$$" verbatim; only the expanded,
        // all-digit form counts.
        pids.push(extract_pid(&seen).expect("pid line missing from output"));

        assert!(matches!(
            handle.await.unwrap(),
            SessionEnd::ProcessExit(_)
        ));
    }

    assert_eq!(pids.len(), 2);
    assert_ne!(pids[0], pids[1]);
    assert_eq!(ctx.gauge.active(), 0);
}

fn extract_pid(output: &str) -> Option<String> {
    output
        .lines()
        .filter_map(|line| line.split("pid:").nth(1))
        .map(str::trim)
        .find(|rest| !rest.is_empty() && rest.chars().all(|c| c.is_ascii_digit()))
        .map(String::from)
}

#[tokio::test]
async fn input_reaches_the_process() {
    init_test_logging();
    let ctx = ctx_with_command("/bin/sh -c cat");
    let (transport, mut client) = mock_transport_pair();

    let handle = tokio::spawn(session::run(transport, None, ctx.clone()));

    client.send_input(b"marker\r").await;

    let mut seen = Vec::new();
    loop {
        let chunk = tokio::time::timeout(
            std::time::Duration::from_secs(5),
            client.recv_data(),
        )
        .await;
        match chunk {
            Ok(Some(data)) => {
                seen.extend_from_slice(&data);
                if seen.windows(6).any(|w| w == b"marker") {
                    break;
                }
            }
            _ => break,
        }
    }
    assert!(seen.windows(6).any(|w| w == b"marker"));

    client.disconnect().await;
    let end = handle.await.unwrap();
    assert_eq!(end, SessionEnd::Disconnect);
    assert_eq!(client.close_count(), 1);
}
