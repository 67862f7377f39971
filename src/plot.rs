//! Live trigger-rate plot for the `-g` / `--graphical` mode.
//!
//! The session keeps its single-threaded, blocking character: a worker
//! thread owns the card and runs one measurement after another, shipping a
//! rate sample per run over an mpsc channel. The egui side only drains the
//! channel and draws. Closing the window fires the worker's cancellation
//! token, so a half-finished run ends promptly instead of being waited out.

use crate::measurement::Measurement;
use crate::session::{CancelToken, DaqCard};
use crate::transport::Transport;
use eframe::egui;
use egui_plot::{Line, Plot, PlotBounds, PlotPoints, Points};
use log::{info, warn};
use std::sync::mpsc;
use std::thread;

/// Trigger rate of one measurement, by measurement index.
#[derive(Debug, Clone, Copy)]
pub struct RateSample {
    /// 1-based measurement index.
    pub index: usize,
    /// Trigger rate in Hz.
    pub rate: f64,
    /// Poisson error on the rate in Hz.
    pub error: f64,
}

impl RateSample {
    fn new(index: usize, measurement: &Measurement) -> Self {
        Self {
            index,
            rate: measurement.rate(),
            error: measurement.rate_error(),
        }
    }
}

/// Open the plot window and measure until it is closed.
///
/// Each measurement runs for `runtime_seconds` on the card's clock; its
/// rate is appended to the plot with a vertical error bar. A worker error
/// (card unplugged, cancellation) stops the series and shows up in the
/// status line, leaving the samples gathered so far on screen.
pub fn run<T>(card: DaqCard<T>, runtime_seconds: f64) -> eframe::Result<()>
where
    T: Transport + Send + 'static,
{
    let cancel = CancelToken::new();
    let (sample_tx, sample_rx) = mpsc::channel();
    spawn_measurement_worker(card, runtime_seconds, cancel.clone(), sample_tx);

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([800.0, 500.0])
            .with_title("Muon trigger rate"),
        ..Default::default()
    };
    eframe::run_native(
        "Muon trigger rate",
        options,
        Box::new(move |_cc| {
            Ok(Box::new(RatePlotApp::new(sample_rx, cancel, runtime_seconds)))
        }),
    )
}

fn spawn_measurement_worker<T>(
    mut card: DaqCard<T>,
    runtime_seconds: f64,
    cancel: CancelToken,
    samples: mpsc::Sender<Result<RateSample, String>>,
) where
    T: Transport + Send + 'static,
{
    thread::spawn(move || {
        for index in 1.. {
            match card.measure_with_cancel(runtime_seconds, &cancel) {
                Ok(measurement) => {
                    let sample = RateSample::new(index, &measurement);
                    info!(
                        "Measurement {index}: {:.2} +- {:.2} Hz",
                        sample.rate, sample.error
                    );
                    if samples.send(Ok(sample)).is_err() {
                        // Window gone, nobody is listening any more.
                        break;
                    }
                }
                Err(err) => {
                    warn!("Measurement worker stopping: {err}");
                    let _ = samples.send(Err(err.to_string()));
                    break;
                }
            }
        }
    });
}

struct RatePlotApp {
    samples_rx: mpsc::Receiver<Result<RateSample, String>>,
    cancel: CancelToken,
    samples: Vec<RateSample>,
    max_rate: f64,
    status_line: String,
}

impl RatePlotApp {
    fn new(
        samples_rx: mpsc::Receiver<Result<RateSample, String>>,
        cancel: CancelToken,
        runtime_seconds: f64,
    ) -> Self {
        Self {
            samples_rx,
            cancel,
            samples: Vec::new(),
            max_rate: 0.0,
            status_line: format!("Measuring ({runtime_seconds} s per point)..."),
        }
    }

    fn drain_samples(&mut self) {
        while let Ok(event) = self.samples_rx.try_recv() {
            match event {
                Ok(sample) => {
                    self.max_rate = self.max_rate.max(sample.rate + sample.error);
                    self.status_line = format!(
                        "Measurement {}: {:.2} +- {:.2} Hz",
                        sample.index, sample.rate, sample.error
                    );
                    self.samples.push(sample);
                }
                Err(message) => {
                    self.status_line = format!("Measurement stopped: {message}");
                }
            }
        }
    }
}

impl eframe::App for RatePlotApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.drain_samples();

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.heading("Muon trigger rate");
            ui.label(&self.status_line);

            let upper = if self.max_rate > 0.0 {
                self.max_rate * 1.2
            } else {
                1.0
            };
            Plot::new("trigger_rate")
                .x_axis_label("measurement")
                .y_axis_label("trigger rate / Hz")
                .show(ui, |plot_ui| {
                    plot_ui.set_plot_bounds(PlotBounds::from_min_max(
                        [0.0, 0.0],
                        [self.samples.len() as f64 + 1.0, upper],
                    ));
                    for sample in &self.samples {
                        let x = sample.index as f64;
                        plot_ui.line(Line::new(PlotPoints::from(vec![
                            [x, sample.rate - sample.error],
                            [x, sample.rate + sample.error],
                        ])));
                    }
                    plot_ui.points(
                        Points::new(PlotPoints::from_iter(
                            self.samples.iter().map(|s| [s.index as f64, s.rate]),
                        ))
                        .radius(3.0),
                    );
                });
        });

        // Keep draining the channel even while the window is idle.
        ctx.request_repaint();
    }
}

impl Drop for RatePlotApp {
    fn drop(&mut self) {
        // Window closed; abort any half-finished measurement.
        self.cancel.cancel();
    }
}
