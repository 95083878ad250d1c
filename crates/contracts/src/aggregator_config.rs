//! Aggregator configuration contracts that can be shared across crates.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Aggregator configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregatorConfig {
    /// Window policy
    #[serde(default)]
    pub policy: WindowPolicy,

    /// Output channel depth before samples are dropped
    #[serde(default = "default_output_capacity")]
    pub output_capacity: usize,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            policy: WindowPolicy::default(),
            output_capacity: default_output_capacity(),
        }
    }
}

fn default_output_capacity() -> usize {
    64
}

/// Window policy selector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum WindowPolicy {
    /// Distance-based windows: emit once accumulated travel exceeds a threshold
    Stretch(StretchWindowConfig),
    /// Fixed time windows: emit paired motion samples on a timer
    TimeWindow(TimeWindowConfig),
}

impl Default for WindowPolicy {
    fn default() -> Self {
        WindowPolicy::TimeWindow(TimeWindowConfig::default())
    }
}

impl WindowPolicy {
    /// Policy name used in logs and summaries
    #[inline]
    pub fn name(&self) -> &'static str {
        match self {
            WindowPolicy::Stretch(_) => "stretch",
            WindowPolicy::TimeWindow(_) => "time_window",
        }
    }
}

/// Stretch window configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StretchWindowConfig {
    /// Minimum stretch length in meters; emission requires strictly more
    #[serde(default = "default_min_stretch_length_m")]
    pub min_stretch_length_m: f64,
}

impl Default for StretchWindowConfig {
    fn default() -> Self {
        Self {
            min_stretch_length_m: default_min_stretch_length_m(),
        }
    }
}

fn default_min_stretch_length_m() -> f64 {
    20.0
}

/// Time window configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeWindowConfig {
    /// Window length in milliseconds
    #[serde(default = "default_time_span_ms")]
    pub time_span_ms: f64,

    /// Interval between window emissions in milliseconds (None = time_span_ms)
    ///
    /// Smaller than the span gives overlapping windows, larger leaves gaps.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_skip_ms: Option<f64>,

    /// Maximum accel/gyro timestamp divergence for a pair, in milliseconds.
    /// A candidate pair survives only if its skew is strictly below this.
    #[serde(default = "default_max_pair_skew_ms")]
    pub max_pair_skew_ms: f64,

    /// Capacity of the rolling position history
    #[serde(default = "default_position_history_len")]
    pub position_history_len: usize,
}

impl Default for TimeWindowConfig {
    fn default() -> Self {
        Self {
            time_span_ms: default_time_span_ms(),
            time_skip_ms: None,
            max_pair_skew_ms: default_max_pair_skew_ms(),
            position_history_len: default_position_history_len(),
        }
    }
}

fn default_time_span_ms() -> f64 {
    20.0
}

fn default_max_pair_skew_ms() -> f64 {
    10.0
}

fn default_position_history_len() -> usize {
    32
}

impl TimeWindowConfig {
    /// Window length as a `Duration`
    #[inline]
    pub fn span(&self) -> Duration {
        Duration::from_secs_f64(self.time_span_ms / 1000.0)
    }

    /// Emission interval as a `Duration` (skip, falling back to span)
    #[inline]
    pub fn skip(&self) -> Duration {
        Duration::from_secs_f64(self.time_skip_ms.unwrap_or(self.time_span_ms) / 1000.0)
    }

    /// Pair skew threshold converted to sensor-clock nanoseconds
    #[inline]
    pub fn max_pair_skew_nanos(&self) -> i64 {
        (self.max_pair_skew_ms * 1_000_000.0) as i64
    }
}
