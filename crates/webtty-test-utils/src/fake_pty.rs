//! Fake PTY-backed process for testing without real child processes.
//!
//! Implements [`ProcessIo`] over in-memory state so bridge and session
//! behavior (resize handling, exit propagation, teardown) can be driven
//! programmatically.

use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;

use webtty_core::error::Result;
use webtty_core::protocol::ProcessIo;

/// A fake process attached to a fake pseudo-terminal.
#[derive(Debug)]
pub struct FakePty {
    input: Arc<Mutex<Vec<u8>>>,
    output_rx: mpsc::Receiver<Vec<u8>>,
    dims: Arc<Mutex<(u16, u16)>>,
    resize_calls: Arc<Mutex<Vec<(u16, u16)>>>,
}

/// Test-side driver for a [`FakePty`].
#[derive(Debug)]
pub struct FakePtyDriver {
    output_tx: Option<mpsc::Sender<Vec<u8>>>,
    input: Arc<Mutex<Vec<u8>>>,
    dims: Arc<Mutex<(u16, u16)>>,
    resize_calls: Arc<Mutex<Vec<(u16, u16)>>>,
}

impl FakePty {
    /// Create a fake process with default dimensions (80x24).
    pub fn new() -> (Self, FakePtyDriver) {
        Self::with_size(80, 24)
    }

    /// Create a fake process with the given dimensions.
    pub fn with_size(cols: u16, rows: u16) -> (Self, FakePtyDriver) {
        let (output_tx, output_rx) = mpsc::channel(64);
        let input = Arc::new(Mutex::new(Vec::new()));
        let dims = Arc::new(Mutex::new((cols, rows)));
        let resize_calls = Arc::new(Mutex::new(Vec::new()));

        let pty = Self {
            input: Arc::clone(&input),
            output_rx,
            dims: Arc::clone(&dims),
            resize_calls: Arc::clone(&resize_calls),
        };
        let driver = FakePtyDriver {
            output_tx: Some(output_tx),
            input,
            dims,
            resize_calls,
        };

        (pty, driver)
    }
}

impl ProcessIo for FakePty {
    async fn send_input(&mut self, data: Vec<u8>) -> Result<()> {
        self.input.lock().unwrap().extend_from_slice(&data);
        Ok(())
    }

    async fn recv_output(&mut self) -> Option<Vec<u8>> {
        self.output_rx.recv().await
    }

    fn resize(&self, cols: u16, rows: u16) -> Result<()> {
        *self.dims.lock().unwrap() = (cols, rows);
        self.resize_calls.lock().unwrap().push((cols, rows));
        Ok(())
    }
}

impl FakePtyDriver {
    /// Emit a chunk of process output.
    pub async fn write_output(&self, data: &[u8]) {
        if let Some(tx) = &self.output_tx {
            let _ = tx.send(data.to_vec()).await;
        }
    }

    /// Simulate process exit: no further output will be produced.
    pub fn exit(&mut self) {
        self.output_tx.take();
    }

    /// Drain everything the process received on stdin so far.
    pub fn read_input(&self) -> Vec<u8> {
        std::mem::take(&mut *self.input.lock().unwrap())
    }

    /// Current terminal dimensions.
    pub fn size(&self) -> (u16, u16) {
        *self.dims.lock().unwrap()
    }

    /// All resize calls seen, in order.
    pub fn resize_calls(&self) -> Vec<(u16, u16)> {
        self.resize_calls.lock().unwrap().clone()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fake_pty_input_capture() {
        let (mut pty, driver) = FakePty::new();

        pty.send_input(b"echo hi\r".to_vec()).await.unwrap();
        assert_eq!(driver.read_input(), b"echo hi\r");
        assert!(driver.read_input().is_empty());
    }

    #[tokio::test]
    async fn fake_pty_output_until_exit() {
        let (mut pty, mut driver) = FakePty::new();

        driver.write_output(b"out").await;
        assert_eq!(pty.recv_output().await.unwrap(), b"out");

        driver.exit();
        assert!(pty.recv_output().await.is_none());
    }

    #[tokio::test]
    async fn fake_pty_resize_is_idempotent() {
        let (pty, driver) = FakePty::new();

        pty.resize(24, 80).unwrap();
        pty.resize(24, 80).unwrap();

        assert_eq!(driver.size(), (24, 80));
        assert_eq!(driver.resize_calls(), vec![(24, 80), (24, 80)]);
    }
}
