use std::ops::Range;
use thiserror::Error;

/// Errors raised when addressing samples in a dataset
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DatasetError {
    #[error("sample range {start}..{end} is outside the dataset (length {len})")]
    OutOfRange { start: usize, end: usize, len: usize },

    #[error("step must be at least 1 sample")]
    ZeroStep,

    #[error("row {row} has {got} values, expected {expected} channels")]
    ChannelMismatch { row: usize, expected: usize, got: usize },

    #[error("dataset has no channels")]
    NoChannels,
}

/// A finite, randomly addressable sequence of multichannel samples.
///
/// Index `i` is the sample taken at `i / sample_rate` seconds.
pub trait Dataset {
    /// Number of samples
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Samples per second of recording
    fn sample_rate(&self) -> u32;

    /// Number of samples in one playback window
    fn window_size(&self) -> usize;

    fn channel_names(&self) -> &[String];

    fn channel_count(&self) -> usize {
        self.channel_names().len()
    }

    /// Sample vectors at `range`, taking every `step`-th index.
    fn get(&self, range: Range<usize>, step: usize) -> Result<Vec<&[f64]>, DatasetError>;

    /// The window `[start, start + window_size)`, cut short at the end of the data.
    fn window(&self, start: usize) -> Result<Window<'_>, DatasetError> {
        let len = self.len();
        if start >= len {
            return Err(DatasetError::OutOfRange {
                start,
                end: start + self.window_size(),
                len,
            });
        }
        let end = (start + self.window_size()).min(len);
        Ok(Window::new(start, self.get(start..end, 1)?))
    }

    /// Duration of the whole dataset in seconds
    fn duration_secs(&self) -> f64 {
        if self.sample_rate() == 0 {
            0.0
        } else {
            self.len() as f64 / self.sample_rate() as f64
        }
    }
}

/// A borrowed slice of consecutive samples
#[derive(Debug, Clone)]
pub struct Window<'a> {
    start: usize,
    rows: Vec<&'a [f64]>,
}

impl<'a> Window<'a> {
    pub fn new(start: usize, rows: Vec<&'a [f64]>) -> Self {
        Self { start, rows }
    }

    /// Dataset index of the first sample
    pub fn start(&self) -> usize {
        self.start
    }

    /// Number of samples in the window
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[&'a [f64]] {
        &self.rows
    }

    pub fn channel_count(&self) -> usize {
        self.rows.first().map(|row| row.len()).unwrap_or(0)
    }

    /// Values of a single channel across the window
    pub fn channel(&self, channel: usize) -> impl Iterator<Item = f64> + '_ {
        self.rows.iter().filter_map(move |row| row.get(channel).copied())
    }
}
