//! The DAQ card session and its timed measurement loop.
//!
//! A [`DaqCard`] owns one transport for its whole life; the card holds one
//! polling conversation at a time, so there is never more than one
//! measurement in flight. A measurement run works against the card's
//! free-running 40 ns clock register rather than the host clock: the loop
//! polls `DS`, reads the clock register out of each counter frame, corrects
//! for 32-bit wraparound, and converts the accumulated ticks to seconds.
//!
//! The card intersperses its counter frames with spurious or partial lines.
//! Those are dropped inside the loop: after an unparseable line the loop
//! waits briefly and reads again without re-sending the poll, until a valid
//! frame arrives. With a dead card that would spin forever, which is what
//! [`CancelToken`] is for.

use crate::error::{AppResult, DaqError};
use crate::measurement::Measurement;
use crate::protocol::{Command, CounterFrame, ThresholdSet, TriggerMode, CLOCK_TICK_SECONDS};
use crate::settings::{DaqSettings, TimingSettings};
use crate::transport::{SerialTransport, Transport};
use log::{debug, info};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

/// Cooperative cancellation flag for measurement runs.
///
/// Clones share the flag. Fire it from another thread to make a running
/// [`DaqCard::measure_with_cancel`] stop the card and return
/// [`DaqError::Cancelled`] instead of polling to completion.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    fired: Arc<AtomicBool>,
}

impl CancelToken {
    /// A token that has not fired.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fire the token. Idempotent.
    pub fn cancel(&self) {
        self.fired.store(true, Ordering::SeqCst);
    }

    /// Whether the token has fired.
    pub fn is_cancelled(&self) -> bool {
        self.fired.load(Ordering::SeqCst)
    }
}

/// Accumulator for one measurement run.
///
/// `start_offset` anchors elapsed time to the first observed clock value
/// rather than to card power-on; `0` doubles as its "not yet set" sentinel,
/// so a first reading of exactly 1 stores an offset of 0 and re-arms the
/// sentinel for the next poll (see DESIGN.md). Tick arithmetic stays in
/// exact signed 64-bit integers; only the final conversion to seconds is
/// floating point.
#[derive(Debug, Default)]
struct MeasurementState {
    start_offset: i64,
    last_clock: u32,
    wrap_count: i64,
    elapsed: f64,
}

impl MeasurementState {
    fn new() -> Self {
        Self::default()
    }

    /// Fold one clock register reading into the elapsed time.
    fn observe(&mut self, clock: u32) {
        if clock < self.last_clock {
            // The 32-bit register overflowed and restarted from zero.
            self.wrap_count += 1;
        }
        if self.start_offset == 0 {
            self.start_offset = i64::from(clock) - 1;
        }
        self.last_clock = clock;

        let total_ticks = i64::from(clock) - self.start_offset + self.wrap_count * (1_i64 << 32);
        self.elapsed = total_ticks as f64 * CLOCK_TICK_SECONDS;
    }

    fn elapsed_seconds(&self) -> f64 {
        self.elapsed
    }
}

/// One muon DAQ card on one exclusively-owned transport.
pub struct DaqCard<T: Transport> {
    transport: T,
    timing: TimingSettings,
}

impl DaqCard<SerialTransport> {
    /// Open the configured serial port and initialize the card.
    ///
    /// The card needs a settle period after the port opens before it accepts
    /// commands; after that the periodic status reports and the veto input
    /// are switched off so polls are the only traffic on the line.
    pub fn open(settings: &DaqSettings) -> AppResult<Self> {
        settings.validate()?;
        let transport = SerialTransport::open(&settings.serial)?;
        Self::with_transport(transport, settings.timing)
    }
}

impl<T: Transport> DaqCard<T> {
    /// Run the init sequence over an already-open transport.
    ///
    /// Same settle delay and `ST 0` / `VE 0` commands as [`DaqCard::open`];
    /// tests inject a [`MockTransport`](crate::transport::MockTransport)
    /// with zeroed [`TimingSettings`] here.
    pub fn with_transport(transport: T, timing: TimingSettings) -> AppResult<Self> {
        let mut card = Self { transport, timing };
        thread::sleep(card.timing.settle());
        card.command_delayed(Command::SilenceStatusReports)?;
        card.command_delayed(Command::DisableVeto)?;
        info!("DAQ card initialized");
        Ok(card)
    }

    /// Set the discriminator thresholds, channels 0 through 2 in order.
    ///
    /// The card does not echo thresholds back in a readable form, so there
    /// is no verification beyond the write succeeding.
    pub fn set_thresholds(&mut self, thresholds: &ThresholdSet) -> AppResult<()> {
        for (channel, &millivolts) in thresholds.millivolts.iter().enumerate() {
            info!("Threshold for channel {channel}: {millivolts} mV");
            self.command(Command::SetThreshold {
                channel: channel as u8,
                millivolts,
            })?;
        }
        Ok(())
    }

    /// Select the coincidence trigger.
    pub fn set_trigger(&mut self, mode: TriggerMode) -> AppResult<()> {
        info!("Using {mode}");
        self.command(Command::SetTrigger(mode))
    }

    /// Run one timed measurement, polling until the card's clock register
    /// says `runtime_seconds` have passed.
    ///
    /// Blocks the calling thread for the whole runtime. With a card that
    /// stops answering, this retries forever; use
    /// [`measure_with_cancel`](DaqCard::measure_with_cancel) when the caller
    /// needs a way out.
    pub fn measure(&mut self, runtime_seconds: f64) -> AppResult<Measurement> {
        self.measure_with_cancel(runtime_seconds, &CancelToken::new())
    }

    /// [`measure`](DaqCard::measure) with a cooperative cancellation token.
    ///
    /// When the token fires, the loop stops the card and returns
    /// [`DaqError::Cancelled`]; the counters gathered so far are discarded.
    pub fn measure_with_cancel(
        &mut self,
        runtime_seconds: f64,
        cancel: &CancelToken,
    ) -> AppResult<Measurement> {
        if runtime_seconds.is_nan() || runtime_seconds <= 0.0 {
            return Err(DaqError::Config(format!(
                "measurement runtime must be positive, got {runtime_seconds}"
            )));
        }

        info!("Starting measurement ({runtime_seconds} s runtime)");
        self.command_delayed(Command::StartCounting)?;
        self.command_delayed(Command::ClearCounters)?;

        let outcome = self.poll_until_elapsed(runtime_seconds, cancel);
        // Stop the run even on the way out of a cancellation or I/O error.
        let stopped = self.command_delayed(Command::StopCounting);
        let (elapsed, counters) = outcome?;
        stopped?;

        info!("Measurement finished after {elapsed:.2} s");
        Ok(Measurement::new(elapsed, counters))
    }

    /// Poll `DS` until the accumulated clock ticks cover the runtime.
    /// Returns the final elapsed time and the last counter frame.
    fn poll_until_elapsed(
        &mut self,
        runtime_seconds: f64,
        cancel: &CancelToken,
    ) -> AppResult<(f64, CounterFrame)> {
        let mut state = MeasurementState::new();
        let frame = loop {
            if cancel.is_cancelled() {
                return Err(DaqError::Cancelled);
            }
            self.command(Command::PollStatus)?;
            let frame = self.read_frame(cancel)?;
            state.observe(frame.clock());
            if state.elapsed_seconds() >= runtime_seconds {
                break frame;
            }
        };
        Ok((state.elapsed_seconds(), frame))
    }

    /// Read lines until one decodes as a counter frame.
    ///
    /// Unparseable lines (spurious output, partial reads, timeouts) are
    /// dropped after a short pause without re-sending the poll command.
    fn read_frame(&mut self, cancel: &CancelToken) -> AppResult<CounterFrame> {
        loop {
            if cancel.is_cancelled() {
                return Err(DaqError::Cancelled);
            }
            let line = self.transport.read_line()?;
            match CounterFrame::decode(&line) {
                Ok(frame) => return Ok(frame),
                Err(err) => {
                    debug!("Dropping unparseable status line ({err}): {line:?}");
                    thread::sleep(self.timing.retry_delay());
                }
            }
        }
    }

    fn command(&mut self, command: Command) -> AppResult<()> {
        self.transport.send_line(&command.encode())
    }

    /// Send a command and give the card its settle time before the next one.
    fn command_delayed(&mut self, command: Command) -> AppResult<()> {
        self.command(command)?;
        thread::sleep(self.timing.command_delay());
        Ok(())
    }
}
