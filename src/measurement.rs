//! Completed measurement results and their derived statistics.

use crate::protocol::CounterFrame;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// One finished counting run.
///
/// Carries the elapsed time computed from the card's 40 ns clock register
/// and the final counter frame. The trigger statistics assume Poisson
/// counting, so the error on `n` events is `sqrt(n)`.
#[derive(Debug, Clone, Serialize)]
pub struct Measurement {
    /// Wall time covered by the run, from the card's own clock.
    pub elapsed_seconds: f64,
    /// Counter registers at the end of the run.
    pub counters: CounterFrame,
    /// When the run finished, host clock.
    pub completed_at: DateTime<Utc>,
}

impl Measurement {
    /// Wrap a finished run, stamping it with the current time.
    pub fn new(elapsed_seconds: f64, counters: CounterFrame) -> Self {
        Self {
            elapsed_seconds,
            counters,
            completed_at: Utc::now(),
        }
    }

    /// Events on the coincidence trigger. A frame too short to carry a
    /// trigger counter counts as zero events.
    pub fn trigger_count(&self) -> u32 {
        self.counters.trigger().unwrap_or(0)
    }

    /// Statistical error on the trigger count.
    pub fn trigger_error(&self) -> f64 {
        f64::from(self.trigger_count()).sqrt()
    }

    /// Trigger rate in Hz.
    pub fn rate(&self) -> f64 {
        f64::from(self.trigger_count()) / self.elapsed_seconds
    }

    /// Error on the trigger rate in Hz.
    pub fn rate_error(&self) -> f64 {
        self.trigger_error() / self.elapsed_seconds
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(line: &str) -> CounterFrame {
        CounterFrame::decode(line).unwrap()
    }

    #[test]
    fn test_poisson_statistics() {
        // Trigger counter 0x19 = 25 events over 10 s.
        let m = Measurement::new(10.0, frame("DS S0=0040 S1=0030 S2=0020 S3=0010 S4=0019 CK=0FFF"));
        assert_eq!(m.trigger_count(), 25);
        assert!((m.trigger_error() - 5.0).abs() < 1e-12);
        assert!((m.rate() - 2.5).abs() < 1e-12);
        assert!((m.rate_error() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_clock_only_frame_counts_zero_triggers() {
        let m = Measurement::new(1.0, frame("DS CK=00FF"));
        assert_eq!(m.trigger_count(), 0);
        assert_eq!(m.rate(), 0.0);
    }
}
