//! `muonrate` — measure cosmic-ray muon trigger rates with a serial DAQ card.
//!
//! Configures the card's discriminator thresholds and coincidence trigger,
//! then runs one timed measurement and prints the counts and the trigger
//! rate. With `--graphical` it instead opens a live plot and keeps
//! measuring until the window is closed.
//!
//! ```bash
//! muonrate -d /dev/ttyUSB0 -T 3 -t 60 -s 110 120 130
//! RUST_LOG=debug muonrate -g
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use muon_daq::{report, DaqCard, DaqSettings, SerialTransport, ThresholdSet, TriggerMode};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "muonrate")]
#[command(about = "Measure cosmic-ray muon trigger rates with a serial DAQ card")]
struct Cli {
    /// Serial device the DAQ card is attached to; overrides the settings
    /// file [default: /dev/ttyUSB0]
    #[arg(short = 'd', long)]
    device: Option<String>,

    /// Coincidence trigger: 2 or 3 channels firing together
    #[arg(short = 'T', long, default_value_t = 3)]
    trigger: u8,

    /// Runtime of one measurement in seconds
    #[arg(short = 't', long, default_value_t = 10.0)]
    time: f64,

    /// Threshold voltages in mV for channels 0-2; channels beyond the
    /// given values keep the card default of 200 mV
    #[arg(short = 's', long = "thresholds", num_args = 0..=3, default_values_t = [100, 100, 100])]
    thresholds: Vec<u32>,

    /// Open a live plot and keep measuring until the window is closed
    #[arg(short = 'g', long)]
    graphical: bool,

    /// TOML settings file with serial and timing overrides
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    // Reject bad configuration before the serial port is touched.
    let mode = TriggerMode::try_from(cli.trigger)?;
    let thresholds = ThresholdSet::from_partial(&cli.thresholds)?;

    let mut settings = match &cli.config {
        Some(path) => DaqSettings::load_from(path)
            .with_context(|| format!("cannot load settings from '{}'", path.display()))?,
        None => DaqSettings::default(),
    };
    if let Some(device) = cli.device {
        settings.serial.port = device;
    }

    let mut card = DaqCard::open(&settings)
        .with_context(|| format!("cannot reach the DAQ card on '{}'", settings.serial.port))?;
    card.set_thresholds(&thresholds)?;
    card.set_trigger(mode)?;

    if cli.graphical {
        run_live_plot(card, cli.time)
    } else {
        let measurement = card.measure(cli.time)?;
        print!("{}", report::render(&measurement));
        Ok(())
    }
}

#[cfg(feature = "plot")]
fn run_live_plot(card: DaqCard<SerialTransport>, runtime_seconds: f64) -> Result<()> {
    muon_daq::plot::run(card, runtime_seconds)
        .map_err(|err| anyhow::anyhow!("live plot window failed: {err}"))
}

#[cfg(not(feature = "plot"))]
fn run_live_plot(_card: DaqCard<SerialTransport>, _runtime_seconds: f64) -> Result<()> {
    Err(muon_daq::DaqError::FeatureNotEnabled("plot".to_string()).into())
}
