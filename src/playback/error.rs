use crate::core::DatasetError;
use crate::playback::{ConsumerId, DroppedConsumer, PlaybackState};
use std::fmt;
use thiserror::Error;

/// Why a requested playback range was rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeFault {
    /// Step shorter than one sample, or not finite
    StepTooSmall,
    /// Start or stop time is negative or not a number
    BadTime,
    /// Start is not before stop
    Inverted,
    /// Stop lies beyond the last sample
    OutOfBounds { len: usize },
    /// Not even one full step fits between start and stop
    TooClose,
}

impl fmt::Display for RangeFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RangeFault::StepTooSmall => write!(f, "step size must be at least one sample"),
            RangeFault::BadTime => write!(f, "start and stop must be non-negative seconds"),
            RangeFault::Inverted => write!(f, "start must be before stop"),
            RangeFault::OutOfBounds { len } => write!(f, "outside the dataset ({} samples)", len),
            RangeFault::TooClose => write!(f, "the start and stop points are too close"),
        }
    }
}

#[derive(Debug, Error)]
pub enum PlaybackError {
    #[error("invalid playback range {start}..{stop}: {fault}")]
    InvalidRange { start: usize, stop: usize, fault: RangeFault },

    #[error("no further window is available")]
    Exhausted,

    #[error("consumer {id} ({name}) failed: {reason}")]
    Consumer { id: ConsumerId, name: String, reason: String },

    #[error("tick {got} arrived while expecting tick {expected}")]
    ConcurrencyViolation { expected: u64, got: u64 },

    #[error("{name} must be a positive number of seconds, got {value}")]
    InvalidSetting { name: &'static str, value: f64 },

    #[error("cannot {op} while {state}")]
    InvalidState { op: &'static str, state: PlaybackState },

    #[error("dataset access failed: {0}")]
    Dataset(#[from] DatasetError),

    #[error("failed to spawn playback driver: {0}")]
    WorkerSpawn(#[source] std::io::Error),
}

impl From<DroppedConsumer> for PlaybackError {
    fn from(dropped: DroppedConsumer) -> Self {
        PlaybackError::Consumer {
            id: dropped.id,
            name: dropped.name,
            reason: dropped.reason,
        }
    }
}

pub type PlaybackResult<T> = Result<T, PlaybackError>;
