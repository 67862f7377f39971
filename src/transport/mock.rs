//! Scripted transport for driving the session in tests.

use super::Transport;
use crate::error::AppResult;
use std::collections::VecDeque;
use std::io::ErrorKind;
use std::sync::{Arc, Mutex};

/// In-memory stand-in for the serial link.
///
/// Reads come from a staged queue; every sent line is logged for test
/// assertions. Clones share their state, so a test can hand one clone to a
/// [`DaqCard`](crate::session::DaqCard) and keep another to stage responses
/// and inspect the sent log.
///
/// Stage an empty line to simulate a read timeout. An exhausted read queue
/// is a hard I/O error rather than an endless stream of timeouts, so a
/// mis-scripted test fails instead of hanging in the retry loop.
#[derive(Clone, Default)]
pub struct MockTransport {
    inner: Arc<Mutex<MockState>>,
}

#[derive(Default)]
struct MockState {
    sent: Vec<String>,
    reads: VecDeque<String>,
    fail_next_read: bool,
    fail_next_send: bool,
}

impl MockTransport {
    /// Create a mock with nothing staged.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue one line for a future `read_line` call.
    pub fn stage_read_line(&self, line: &str) {
        self.lock().reads.push_back(line.to_string());
    }

    /// Queue several lines in order.
    pub fn stage_read_lines<I, S>(&self, lines: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.lock().reads.extend(lines.into_iter().map(Into::into));
    }

    /// Every line sent so far, in order.
    pub fn sent_lines(&self) -> Vec<String> {
        self.lock().sent.clone()
    }

    /// Forget the sent lines recorded so far.
    pub fn clear_sent(&self) {
        self.lock().sent.clear();
    }

    /// Make the next `read_line` fail with an I/O error.
    pub fn inject_read_failure(&self) {
        self.lock().fail_next_read = true;
    }

    /// Make the next `send_line` fail with an I/O error.
    pub fn inject_send_failure(&self) {
        self.lock().fail_next_send = true;
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockState> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl Transport for MockTransport {
    fn send_line(&mut self, line: &str) -> AppResult<()> {
        let mut state = self.lock();
        if std::mem::take(&mut state.fail_next_send) {
            return Err(std::io::Error::new(ErrorKind::BrokenPipe, "injected send failure").into());
        }
        state.sent.push(line.to_string());
        Ok(())
    }

    fn read_line(&mut self) -> AppResult<String> {
        let mut state = self.lock();
        if std::mem::take(&mut state.fail_next_read) {
            return Err(std::io::Error::new(ErrorKind::BrokenPipe, "injected read failure").into());
        }
        state.reads.pop_front().ok_or_else(|| {
            std::io::Error::new(ErrorKind::UnexpectedEof, "mock read queue exhausted").into()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reads_come_back_in_order() {
        let mock = MockTransport::new();
        mock.stage_read_lines(["first", "second"]);

        let mut transport = mock.clone();
        assert_eq!(transport.read_line().unwrap(), "first");
        assert_eq!(transport.read_line().unwrap(), "second");
        assert!(transport.read_line().is_err());
    }

    #[test]
    fn test_sent_lines_are_logged() {
        let mock = MockTransport::new();
        let mut transport = mock.clone();
        transport.send_line("DS").unwrap();
        transport.send_line("CE").unwrap();
        assert_eq!(mock.sent_lines(), vec!["DS", "CE"]);

        mock.clear_sent();
        assert!(mock.sent_lines().is_empty());
    }

    #[test]
    fn test_injected_failures_are_consumed() {
        let mock = MockTransport::new();
        mock.stage_read_line("DS CK=0001");
        mock.inject_read_failure();

        let mut transport = mock.clone();
        assert!(transport.read_line().is_err());
        // The staged line is still there after the one-shot failure.
        assert_eq!(transport.read_line().unwrap(), "DS CK=0001");

        mock.inject_send_failure();
        assert!(transport.send_line("RB").is_err());
        assert!(transport.send_line("RB").is_ok());
    }
}
