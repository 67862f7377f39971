//! Serial driver and trigger-rate monitor for a cosmic-ray muon DAQ card.
//!
//! The card discriminates scintillator pulses on three channels, counts
//! coincidences in a trigger scaler, and answers `DS` polls with its counter
//! registers in hexadecimal. This crate configures the card (per-channel
//! thresholds, two- or three-fold coincidence) and runs timed measurements
//! against the card's free-running 40 ns clock register, correcting for
//! 32-bit counter wraparound — the host clock never enters the timing.
//!
//! ```no_run
//! use muon_daq::{DaqCard, DaqSettings, ThresholdSet, TriggerMode};
//!
//! # fn main() -> muon_daq::AppResult<()> {
//! let settings = DaqSettings::default();
//! let mut card = DaqCard::open(&settings)?;
//! card.set_thresholds(&ThresholdSet::default())?;
//! card.set_trigger(TriggerMode::Threefold)?;
//!
//! let measurement = card.measure(10.0)?;
//! println!(
//!     "{:.2} +- {:.2} Hz",
//!     measurement.rate(),
//!     measurement.rate_error()
//! );
//! # Ok(())
//! # }
//! ```
//!
//! The `muonrate` binary wraps this in a CLI; the `plot` feature (on by
//! default) adds a live rate plot for repeated measurements.

pub mod error;
pub mod measurement;
#[cfg(feature = "plot")]
pub mod plot;
pub mod protocol;
pub mod report;
pub mod session;
pub mod settings;
pub mod transport;

pub use error::{AppResult, DaqError};
pub use measurement::Measurement;
pub use protocol::{Command, CounterFrame, ThresholdSet, TriggerMode};
pub use session::{CancelToken, DaqCard};
pub use settings::{DaqSettings, SerialSettings, TimingSettings};
pub use transport::{MockTransport, SerialTransport, Transport};
