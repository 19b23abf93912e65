pub mod consumer;
pub mod driver;
pub mod engine;
pub mod error;
pub mod events;
pub mod handshake;
pub mod iterator;

pub use consumer::{ConsumerId, ConsumerRegistry, DroppedConsumer, FnConsumer, Frame, StepConsumer};
pub use engine::PlaybackEngine;
pub use error::{PlaybackError, PlaybackResult, RangeFault};
pub use events::PlaybackEvent;
pub use handshake::Handshake;
pub use iterator::StepIterator;

use std::fmt;
use std::time::Duration;

/// Playback state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Stopped,
    Playing,
    Paused,
}

impl fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PlaybackState::Stopped => "stopped",
            PlaybackState::Playing => "playing",
            PlaybackState::Paused => "paused",
        };
        f.write_str(name)
    }
}

/// Playback configuration
///
/// `sim_delay` is the simulated time one tick covers and `rt_delay` the
/// wall-clock time a tick should take; their ratio is the playback speed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaybackConfig {
    pub sim_delay: f64,
    pub rt_delay: f64,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            sim_delay: 0.1,
            rt_delay: 0.1,
        }
    }
}

impl PlaybackConfig {
    pub fn new(sim_delay: f64, rt_delay: f64) -> PlaybackResult<Self> {
        Ok(Self {
            sim_delay: check_delay("sim_delay", sim_delay)?,
            rt_delay: check_delay("rt_delay", rt_delay)?,
        })
    }

    /// Speed multiplier, 1.0 = real time
    pub fn speed(&self) -> f64 {
        self.sim_delay / self.rt_delay
    }

    /// Wall-clock length of one tick
    pub fn rt_duration(&self) -> PlaybackResult<Duration> {
        Duration::try_from_secs_f64(self.rt_delay).map_err(|_| PlaybackError::InvalidSetting {
            name: "rt_delay",
            value: self.rt_delay,
        })
    }

    /// Samples advanced per tick at `sample_rate`, possibly fractional
    pub fn step_size(&self, sample_rate: u32) -> PlaybackResult<f64> {
        let step = self.sim_delay * sample_rate as f64;
        if !step.is_finite() || step < 1.0 {
            return Err(PlaybackError::InvalidSetting {
                name: "sim_delay",
                value: self.sim_delay,
            });
        }
        Ok(step)
    }
}

pub(crate) fn check_delay(name: &'static str, value: f64) -> PlaybackResult<f64> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(PlaybackError::InvalidSetting { name, value })
    }
}
