//! Transport implementations for the card link.
//!
//! The session needs exactly two operations — send a line, read a line — so
//! that is the whole trait. [`SerialTransport`] talks to real hardware over
//! the `serialport` crate; [`MockTransport`] replays scripted lines so the
//! session and its measurement loop can be exercised without a card.

pub mod mock;
pub mod serial;

pub use mock::MockTransport;
pub use serial::SerialTransport;

use crate::error::AppResult;

/// Line-level I/O to the card.
pub trait Transport {
    /// Send one command line; the transport appends the CR terminator.
    fn send_line(&mut self, line: &str) -> AppResult<()>;

    /// Read one response line, stripped of its line ending.
    ///
    /// A read timeout yields whatever arrived so far — possibly an empty
    /// string — not an error; the caller decides whether a partial line is
    /// usable. Hard I/O failures are errors.
    fn read_line(&mut self) -> AppResult<String>;
}
