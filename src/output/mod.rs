pub mod logger;
pub mod stats;

pub use logger::{StatsLogger, TraceLogger};
pub use stats::{window_stats, ChannelStats};
