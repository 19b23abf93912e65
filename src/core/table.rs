use crate::core::dataset::{Dataset, DatasetError};
use std::ops::Range;

/// In-memory multichannel recording
///
/// Samples are stored row-major: one row per time index, one column per channel.
#[derive(Debug, Clone)]
pub struct SampleTable {
    channels: Vec<String>,
    data: Vec<f64>,
    sample_rate: u32,
    window_size: usize,
}

impl SampleTable {
    /// Create an empty table. The window size defaults to one second of samples.
    pub fn new(channels: Vec<String>, sample_rate: u32) -> Result<Self, DatasetError> {
        if channels.is_empty() {
            return Err(DatasetError::NoChannels);
        }
        Ok(Self {
            channels,
            data: Vec::new(),
            sample_rate,
            window_size: sample_rate.max(1) as usize,
        })
    }

    /// Build a table from complete rows
    pub fn from_rows<I, R>(channels: Vec<String>, sample_rate: u32, rows: I) -> Result<Self, DatasetError>
    where
        I: IntoIterator<Item = R>,
        R: AsRef<[f64]>,
    {
        let mut table = Self::new(channels, sample_rate)?;
        for row in rows {
            table.push_row(row.as_ref())?;
        }
        Ok(table)
    }

    /// Append one sample vector
    pub fn push_row(&mut self, row: &[f64]) -> Result<(), DatasetError> {
        if row.len() != self.channels.len() {
            return Err(DatasetError::ChannelMismatch {
                row: self.len(),
                expected: self.channels.len(),
                got: row.len(),
            });
        }
        self.data.extend_from_slice(row);
        Ok(())
    }

    /// Change the playback window size (clamped to at least one sample)
    pub fn set_window_size(&mut self, window_size: usize) {
        self.window_size = window_size.max(1);
    }

    pub fn set_sample_rate(&mut self, sample_rate: u32) {
        self.sample_rate = sample_rate;
    }

    /// A single sample vector
    pub fn row(&self, index: usize) -> Option<&[f64]> {
        let width = self.channels.len();
        self.data.get(index * width..(index + 1) * width)
    }
}

impl Dataset for SampleTable {
    fn len(&self) -> usize {
        self.data.len() / self.channels.len()
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn window_size(&self) -> usize {
        self.window_size
    }

    fn channel_names(&self) -> &[String] {
        &self.channels
    }

    fn get(&self, range: Range<usize>, step: usize) -> Result<Vec<&[f64]>, DatasetError> {
        if step == 0 {
            return Err(DatasetError::ZeroStep);
        }
        let len = self.len();
        if range.start > range.end || range.end > len {
            return Err(DatasetError::OutOfRange {
                start: range.start,
                end: range.end,
                len,
            });
        }

        let width = self.channels.len();
        Ok(range
            .step_by(step)
            .map(|i| &self.data[i * width..(i + 1) * width])
            .collect())
    }
}
