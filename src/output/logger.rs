//! Logging consumers.
//!
//! [`StatsLogger`] appends per-channel window statistics to a CSV file and
//! [`TraceLogger`] reports them through `tracing`.

use crate::output::stats::window_stats;
use crate::playback::{Frame, StepConsumer};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use csv::Writer;
use serde::Serialize;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use tracing::{info, warn};

#[derive(Debug, Serialize)]
struct StatsRow<'a> {
    tick: u64,
    sim_time: f64,
    window_time: f64,
    wall_time: DateTime<Utc>,
    channel: &'a str,
    mean: f64,
    min: f64,
    max: f64,
    rms: f64,
}

/// Writes one CSV row per channel and tick
pub struct StatsLogger<W: Write> {
    writer: Writer<W>,
    channels: Vec<String>,
    rows: u64,
}

impl StatsLogger<File> {
    pub fn create(path: &Path, channels: &[String]) -> Result<Self> {
        let writer = Writer::from_path(path)
            .with_context(|| format!("Failed to create {}", path.display()))?;
        Ok(Self::from_writer(writer, channels))
    }
}

impl<W: Write> StatsLogger<W> {
    pub fn new(inner: W, channels: &[String]) -> Self {
        Self::from_writer(Writer::from_writer(inner), channels)
    }

    fn from_writer(writer: Writer<W>, channels: &[String]) -> Self {
        Self {
            writer,
            channels: channels.to_vec(),
            rows: 0,
        }
    }

    /// Rows written so far
    pub fn rows(&self) -> u64 {
        self.rows
    }

    /// Flush and hand back the underlying writer
    pub fn into_inner(self) -> Result<W> {
        self.writer
            .into_inner()
            .map_err(|e| anyhow::anyhow!("Failed to flush stats log: {}", e.error()))
    }
}

impl<W: Write> StepConsumer for StatsLogger<W> {
    fn name(&self) -> &str {
        "stats-logger"
    }

    fn on_step(&mut self, frame: &Frame<'_>) -> Result<()> {
        let wall_time = Utc::now();

        for (idx, stats) in window_stats(frame.window).into_iter().enumerate() {
            let channel = self.channels.get(idx).map(String::as_str).unwrap_or("?");
            self.writer.serialize(StatsRow {
                tick: frame.tick,
                sim_time: frame.sim_time,
                window_time: frame.window_time(),
                wall_time,
                channel,
                mean: stats.mean,
                min: stats.min,
                max: stats.max,
                rms: stats.rms,
            })?;
            self.rows += 1;
        }

        self.writer.flush()?;
        Ok(())
    }

    fn on_reset(&mut self) {
        if let Err(e) = self.writer.flush() {
            warn!("Failed to flush stats log on reset: {}", e);
        }
    }
}

/// Logs channel means through `tracing` every `every` ticks
pub struct TraceLogger {
    channels: Vec<String>,
    every: u64,
}

impl TraceLogger {
    pub fn new(channels: &[String], every: u64) -> Self {
        Self {
            channels: channels.to_vec(),
            every: every.max(1),
        }
    }
}

impl StepConsumer for TraceLogger {
    fn name(&self) -> &str {
        "trace-logger"
    }

    fn on_start(&mut self, start: f64) -> Result<()> {
        info!("Playback from {:.3}s over {} channels", start, self.channels.len());
        Ok(())
    }

    fn on_step(&mut self, frame: &Frame<'_>) -> Result<()> {
        if frame.tick % self.every != 0 {
            return Ok(());
        }

        let means = window_stats(frame.window)
            .iter()
            .zip(&self.channels)
            .map(|(stats, name)| format!("{}: {:.3}", name, stats.mean))
            .collect::<Vec<_>>()
            .join(", ");

        info!("t={:.2}s [{}]", frame.sim_time, means);
        Ok(())
    }
}
