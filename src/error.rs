//! Custom error types for the application.
//!
//! This module defines the primary error type, `DaqError`, used across the
//! library and the `muonrate` binary. Using the `thiserror` crate, it gives
//! every failure mode a single home, from serial-port problems to semantic
//! configuration errors.
//!
//! ## Error Hierarchy
//!
//! - **`Connection`**: the serial port could not be opened or configured.
//!   Fatal; there is no point retrying a port that does not exist.
//! - **`Io`**: a read or write on an already-open port failed hard (not a
//!   timeout — timeouts surface as empty reads and are handled inside the
//!   measurement loop).
//! - **`Config`**: semantic errors such as an invalid coincidence trigger
//!   mode or a malformed settings file. Reported immediately, never retried.
//! - **`Cancelled`**: a measurement was aborted through its cancellation
//!   token before the requested runtime elapsed.
//! - **`FeatureNotEnabled`**: functionality (the live plot window) compiled
//!   out via cargo features was requested at runtime.
//!
//! Malformed status lines from the card are deliberately NOT represented
//! here: the measurement loop recovers from them locally by re-reading, so
//! they live in a private codec-level error type instead
//! ([`crate::protocol::FrameError`]).

use thiserror::Error;

/// Convenience alias for results using the application error type.
pub type AppResult<T> = std::result::Result<T, DaqError>;

/// All fatal error conditions the driver can report.
#[derive(Error, Debug)]
pub enum DaqError {
    #[error("Connection error: {0}")]
    Connection(#[from] serialport::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Measurement cancelled")]
    Cancelled,

    #[error("Feature '{0}' is not enabled. Please build with --features {0}")]
    FeatureNotEnabled(String),
}
