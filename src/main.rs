//! veegs - paced playback of multichannel recordings
//!
//! Loads a CSV recording and plays it back window by window, logging channel
//! statistics as it goes.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::process;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use veegs::core::Dataset;
use veegs::input::load_file;
use veegs::output::{StatsLogger, TraceLogger};
use veegs::playback::{PlaybackEngine, PlaybackEvent};
use veegs::settings::PlaybackSettings;

/// Play back a multichannel recording in simulated time
#[derive(Parser, Debug)]
#[command(name = "veegs")]
#[command(about = "Paced playback of multichannel sample recordings")]
#[command(version)]
struct Args {
    /// Recording to play (CSV, header row names the channels)
    file: PathBuf,

    /// Samples per second (overrides saved settings)
    #[arg(long)]
    sample_rate: Option<u32>,

    /// Samples per window (overrides saved settings)
    #[arg(long)]
    window_size: Option<usize>,

    /// Playback start in seconds
    #[arg(long, default_value = "0")]
    start: f64,

    /// Playback stop in seconds (defaults to the end of the recording)
    #[arg(long)]
    stop: Option<f64>,

    /// Simulated seconds per tick
    #[arg(long)]
    sim_delay: Option<f64>,

    /// Wall-clock seconds per tick
    #[arg(long)]
    rt_delay: Option<f64>,

    /// Write per-tick channel statistics to this CSV file
    #[arg(long)]
    log_csv: Option<PathBuf>,

    /// Log channel means every N ticks
    #[arg(long, default_value = "10")]
    log_every: u64,

    /// Persist the effective settings for later runs
    #[arg(long)]
    save_settings: bool,
}

impl Args {
    fn apply(&self, settings: &mut PlaybackSettings) {
        if let Some(rate) = self.sample_rate {
            settings.sample_rate = rate;
        }
        if let Some(size) = self.window_size {
            settings.window_size = size;
        }
        if let Some(delay) = self.sim_delay {
            settings.sim_delay = delay;
        }
        if let Some(delay) = self.rt_delay {
            settings.rt_delay = delay;
        }
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    if let Err(e) = run(args) {
        error!("{:#}", e);
        process::exit(1);
    }
}

fn run(args: Args) -> Result<()> {
    let mut settings = PlaybackSettings::load();
    args.apply(&mut settings);
    settings.validate().context("Invalid playback settings")?;

    if args.save_settings {
        let path = settings.save().context("Failed to save settings")?;
        info!("Saved settings to {}", path.display());
    }

    let mut table = load_file(&args.file, settings.sample_rate)?;
    table.set_window_size(settings.window_size);

    let channels = table.channel_names().to_vec();
    let stop = args.stop.unwrap_or_else(|| table.duration_secs());

    let mut engine = PlaybackEngine::with_config(table, settings.playback_config());
    let events = engine.subscribe();

    engine.register_consumer(TraceLogger::new(&channels, args.log_every));
    if let Some(path) = &args.log_csv {
        engine.register_consumer(StatsLogger::create(path, &channels)?);
        info!("Logging window statistics to {}", path.display());
    }

    engine.play(args.start, stop)?;
    let ticks = engine.run_until_idle()?;
    let sim_time = engine.sim_time();

    let dropped = events
        .try_iter()
        .filter(|event| matches!(event, PlaybackEvent::ConsumerDropped(_)))
        .count();
    if dropped > 0 {
        warn!("{} consumer(s) failed during playback", dropped);
    }

    engine.stop();
    println!("Played {} ticks covering {:.3}s of simulated time", ticks, sim_time);
    Ok(())
}
