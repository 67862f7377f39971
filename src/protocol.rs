//! Wire protocol for the muon DAQ card.
//!
//! Commands are short ASCII mnemonics; the transport appends the CR
//! terminator. The card answers a `DS` poll with a line of space-delimited
//! counter tokens:
//!
//! ```text
//! DS S0=0000002A S1=00000018 S2=00000011 S3=00000005 S4=0000000C CK=0038E15A
//! ```
//!
//! Each counter token is a two-letter register tag plus `=` followed by the
//! value in hexadecimal, so the numeric payload starts at character offset 3.
//! Tokens of three characters or fewer (command echoes, stray fragments)
//! carry no counter and are skipped, as are tokens whose payload is not
//! valid hex. Channel counters come first, then the trigger counter, and the
//! free-running 40 ns clock register is always last.

use crate::error::DaqError;
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Period of the card's free-running clock counter: one tick every 40 ns.
pub const CLOCK_TICK_SECONDS: f64 = 40e-9;

/// Number of discriminator channels the driver configures.
pub const CHANNELS: usize = 3;

/// Coincidence trigger mode of the card.
///
/// Only two- and three-fold coincidences exist on this hardware; anything
/// else requested over the CLI is a configuration error and is rejected
/// before a single byte reaches the card.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerMode {
    /// Two channels must fire together.
    Twofold,
    /// All three channels must fire together.
    Threefold,
}

impl TryFrom<u8> for TriggerMode {
    type Error = DaqError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            2 => Ok(TriggerMode::Twofold),
            3 => Ok(TriggerMode::Threefold),
            other => Err(DaqError::Config(format!(
                "valid triggers are 2 or 3, got {other}"
            ))),
        }
    }
}

impl fmt::Display for TriggerMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TriggerMode::Twofold => write!(f, "twofold coincidence"),
            TriggerMode::Threefold => write!(f, "threefold coincidence"),
        }
    }
}

/// Discriminator thresholds in millivolts, one per channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThresholdSet {
    /// Threshold per channel, indexed 0..=2.
    pub millivolts: [u32; CHANNELS],
}

impl ThresholdSet {
    /// Thresholds for all three channels.
    pub fn new(t0: u32, t1: u32, t2: u32) -> Self {
        Self {
            millivolts: [t0, t1, t2],
        }
    }

    /// Build a set from up to three values; channels without a value keep
    /// the 200 mV default. More than three values is a configuration error.
    pub fn from_partial(values: &[u32]) -> Result<Self, DaqError> {
        if values.len() > CHANNELS {
            return Err(DaqError::Config(format!(
                "at most {CHANNELS} threshold values (channels 0-2), got {}",
                values.len()
            )));
        }
        let mut set = Self::default();
        set.millivolts[..values.len()].copy_from_slice(values);
        Ok(set)
    }
}

impl Default for ThresholdSet {
    fn default() -> Self {
        Self {
            millivolts: [200; CHANNELS],
        }
    }
}

/// One command understood by the card.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// `TL <channel> <mV>` — set a discriminator threshold.
    SetThreshold {
        /// Channel index, 0..=2.
        channel: u8,
        /// Threshold in millivolts.
        millivolts: u32,
    },
    /// `WC 00 ..` — select the coincidence trigger.
    SetTrigger(TriggerMode),
    /// `RB` — reset all counters to zero.
    ClearCounters,
    /// `DS` — poll the counter registers.
    PollStatus,
    /// `CD` — start a counting run.
    StartCounting,
    /// `CE` — end a counting run.
    StopCounting,
    /// `ST 0` — silence the card's periodic unsolicited status lines.
    SilenceStatusReports,
    /// `VE 0` — disable the veto input.
    DisableVeto,
}

impl Command {
    /// The ASCII line for this command, without the CR terminator.
    pub fn encode(&self) -> String {
        match self {
            Command::SetThreshold {
                channel,
                millivolts,
            } => format!("TL {channel} {millivolts}"),
            Command::SetTrigger(TriggerMode::Threefold) => "WC 00 27".to_string(),
            Command::SetTrigger(TriggerMode::Twofold) => "WC 00 1F".to_string(),
            Command::ClearCounters => "RB".to_string(),
            Command::PollStatus => "DS".to_string(),
            Command::StartCounting => "CD".to_string(),
            Command::StopCounting => "CE".to_string(),
            Command::SilenceStatusReports => "ST 0".to_string(),
            Command::DisableVeto => "VE 0".to_string(),
        }
    }
}

/// Why a status line failed to decode.
///
/// These never leave the measurement loop; the loop answers every one of
/// them the same way, by waiting briefly and reading again.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FrameError {
    /// The line does not start with the `DS` tag (includes empty reads from
    /// a timed-out transport).
    #[error("status line does not carry the DS tag")]
    WrongTag,
    /// Tag is present but the line is too short to hold any counter.
    #[error("status line too short ({0} bytes)")]
    TooShort(usize),
    /// Nothing in the line parsed as a counter token.
    #[error("status line carries no parseable counter tokens")]
    NoCounters,
}

/// Counter registers parsed from one `DS` response, in wire order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CounterFrame {
    counters: Vec<u32>,
}

impl CounterFrame {
    /// Parse a raw status line.
    ///
    /// A valid frame starts with `DS`, is longer than 5 bytes, and yields at
    /// least one counter token. Tokens that do not look like counters are
    /// dropped silently; only a frame with zero counters is an error.
    pub fn decode(line: &str) -> Result<Self, FrameError> {
        if !line.starts_with("DS") {
            return Err(FrameError::WrongTag);
        }
        if line.len() <= 5 {
            return Err(FrameError::TooShort(line.len()));
        }
        let counters: Vec<u32> = line
            .split(' ')
            .filter(|token| token.len() > 3)
            .filter_map(|token| token.get(3..))
            .filter_map(|hex| u32::from_str_radix(hex, 16).ok())
            .collect();
        if counters.is_empty() {
            return Err(FrameError::NoCounters);
        }
        Ok(Self { counters })
    }

    /// All counters in wire order.
    pub fn counters(&self) -> &[u32] {
        &self.counters
    }

    /// A channel counter by index, if the frame carried that many.
    pub fn channel(&self, index: usize) -> Option<u32> {
        self.counters.get(index).copied()
    }

    /// The trigger counter, which sits immediately before the clock
    /// register. `None` if the frame carried fewer than two counters.
    pub fn trigger(&self) -> Option<u32> {
        if self.counters.len() >= 2 {
            self.counters.get(self.counters.len() - 2).copied()
        } else {
            None
        }
    }

    /// The free-running clock register, always the last counter.
    pub fn clock(&self) -> u32 {
        self.counters.last().copied().unwrap_or(0)
    }
}
