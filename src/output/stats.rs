use crate::core::Window;
use serde::Serialize;

/// Summary of one channel over one window
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ChannelStats {
    pub mean: f64,
    pub min: f64,
    pub max: f64,
    pub rms: f64,
}

impl ChannelStats {
    /// Statistics of `values`, or `None` when there are none
    pub fn from_values<I: IntoIterator<Item = f64>>(values: I) -> Option<Self> {
        let mut count = 0usize;
        let mut sum = 0.0;
        let mut sum_sq = 0.0;
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;

        for value in values {
            count += 1;
            sum += value;
            sum_sq += value * value;
            min = min.min(value);
            max = max.max(value);
        }

        if count == 0 {
            return None;
        }

        let n = count as f64;
        Some(Self {
            mean: sum / n,
            min,
            max,
            rms: (sum_sq / n).sqrt(),
        })
    }
}

/// Per-channel statistics of a window, in channel order
pub fn window_stats(window: &Window<'_>) -> Vec<ChannelStats> {
    (0..window.channel_count())
        .filter_map(|channel| ChannelStats::from_values(window.channel(channel)))
        .collect()
}
