//! Session setup tests over a scripted transport: init sequence, threshold
//! and trigger configuration, and the rendered terminal report.

use muon_daq::{
    report, DaqCard, DaqError, Measurement, MockTransport, ThresholdSet, TimingSettings,
    TriggerMode,
};
use muon_daq::protocol::CounterFrame;

fn instant_timing() -> TimingSettings {
    TimingSettings {
        settle_ms: 0,
        command_delay_ms: 0,
        retry_delay_ms: 0,
    }
}

#[test]
fn init_silences_reports_and_disables_veto() {
    let mock = MockTransport::new();
    DaqCard::with_transport(mock.clone(), instant_timing()).unwrap();

    assert_eq!(mock.sent_lines(), vec!["ST 0", "VE 0"]);
}

#[test]
fn thresholds_go_out_in_channel_order() {
    let mock = MockTransport::new();
    let mut card = DaqCard::with_transport(mock.clone(), instant_timing()).unwrap();
    mock.clear_sent();

    card.set_thresholds(&ThresholdSet::new(110, 120, 130)).unwrap();

    assert_eq!(mock.sent_lines(), vec!["TL 0 110", "TL 1 120", "TL 2 130"]);
}

#[test]
fn repeated_threshold_writes_encode_identically() {
    let mock = MockTransport::new();
    let mut card = DaqCard::with_transport(mock.clone(), instant_timing()).unwrap();
    mock.clear_sent();

    let thresholds = ThresholdSet::default();
    card.set_thresholds(&thresholds).unwrap();
    let first = mock.sent_lines();
    mock.clear_sent();
    card.set_thresholds(&thresholds).unwrap();

    assert_eq!(first, mock.sent_lines());
    assert_eq!(first, vec!["TL 0 200", "TL 1 200", "TL 2 200"]);
}

#[test]
fn trigger_modes_select_the_coincidence_registers() {
    let mock = MockTransport::new();
    let mut card = DaqCard::with_transport(mock.clone(), instant_timing()).unwrap();
    mock.clear_sent();

    card.set_trigger(TriggerMode::Threefold).unwrap();
    card.set_trigger(TriggerMode::Twofold).unwrap();

    assert_eq!(mock.sent_lines(), vec!["WC 00 27", "WC 00 1F"]);
}

#[test]
fn invalid_trigger_is_rejected_before_any_transport_write() {
    let err = TriggerMode::try_from(1).unwrap_err();
    assert!(matches!(err, DaqError::Config(_)));

    // No card, no transport: the rejection happens in pure code, so a
    // CLI layer can refuse the mode without touching the port.
    let mock = MockTransport::new();
    assert!(mock.sent_lines().is_empty());
}

#[test]
fn send_failures_surface_as_io_errors() {
    let mock = MockTransport::new();
    let mut card = DaqCard::with_transport(mock.clone(), instant_timing()).unwrap();
    mock.inject_send_failure();

    let err = card.set_trigger(TriggerMode::Twofold).unwrap_err();
    assert!(matches!(err, DaqError::Io(_)));
}

#[test]
fn report_prints_counts_rate_and_poisson_error() {
    // 0x10 = 16 trigger events over 8 s: rate 2 Hz, error sqrt(16)/8 Hz.
    let counters =
        CounterFrame::decode("DS S0=0040 S1=0030 S2=0020 S3=0008 S4=0010 CK=0BEBC200").unwrap();
    let rendered = report::render(&Measurement::new(8.0, counters));

    assert!(rendered.contains("Result after 8.00 seconds of measurement:"));
    assert!(rendered.contains("Channel 1: 64 events"));
    assert!(rendered.contains("Channel 2: 48 events"));
    assert!(rendered.contains("Channel 3: 32 events"));
    assert!(rendered.contains("Trigger:   16 events   stat. error: 4 events"));
    assert!(rendered.contains("Trigger rate: 2.00 +- 0.50 Hz"));
}
