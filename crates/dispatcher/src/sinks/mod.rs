//! Sink implementations
//!
//! Contains LogSink and StatsSink.

mod log;
mod stats;

pub use self::log::LogSink;
pub use self::stats::{SinkStats, StatsSink, StatsSnapshot};
