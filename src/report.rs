//! Terminal report for a finished measurement.

use crate::measurement::Measurement;
use crate::protocol::CHANNELS;

/// Render the result block the `muonrate` binary prints.
///
/// ```text
/// Result after 10.04 seconds of measurement:
/// Channel 1: 42 events
/// Channel 2: 24 events
/// Channel 3: 17 events
/// Trigger:   12 events   stat. error: 3 events
///
/// Trigger rate: 1.20 +- 0.35 Hz
/// ```
pub fn render(measurement: &Measurement) -> String {
    let mut report = format!(
        "\nResult after {:.2} seconds of measurement:\n",
        measurement.elapsed_seconds
    );
    for index in 0..CHANNELS {
        let events = measurement.counters.channel(index).unwrap_or(0);
        report.push_str(&format!("Channel {}: {} events\n", index + 1, events));
    }
    report.push_str(&format!(
        "Trigger:   {} events   stat. error: {:.0} events\n",
        measurement.trigger_count(),
        measurement.trigger_error()
    ));
    report.push_str(&format!(
        "\nTrigger rate: {:.2} +- {:.2} Hz\n",
        measurement.rate(),
        measurement.rate_error()
    ));
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::CounterFrame;

    #[test]
    fn test_report_layout() {
        let counters = CounterFrame::decode(
            "DS S0=002A S1=0018 S2=0011 S3=0005 S4=000C CK=0EE6B280",
        )
        .unwrap();
        let report = render(&Measurement::new(10.0, counters));

        assert!(report.contains("Result after 10.00 seconds of measurement:"));
        assert!(report.contains("Channel 1: 42 events"));
        assert!(report.contains("Channel 2: 24 events"));
        assert!(report.contains("Channel 3: 17 events"));
        // Trigger counter is 0x0C = 12, sqrt(12) rounds to 3.
        assert!(report.contains("Trigger:   12 events   stat. error: 3 events"));
        assert!(report.contains("Trigger rate: 1.20 +- 0.35 Hz"));
    }
}
