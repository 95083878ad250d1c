//! StatsSink - running statistics over combined samples

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use contracts::{CombinedSample, ContractError, DataSink};
use serde::Serialize;
use tracing::{info, instrument};

/// Shared accumulator behind a StatsSink
///
/// The pipeline keeps a clone of the `Arc` so totals survive sink shutdown.
#[derive(Debug, Default)]
pub struct SinkStats {
    samples: AtomicU64,
    motion_samples: AtomicU64,
    with_position: AtomicU64,
    silent: AtomicU64,
    distance_mm: AtomicU64,
}

impl SinkStats {
    fn record(&self, sample: &CombinedSample) {
        self.samples.fetch_add(1, Ordering::Relaxed);
        self.motion_samples
            .fetch_add(sample.motion_len() as u64, Ordering::Relaxed);
        if sample.position.is_some() {
            self.with_position.fetch_add(1, Ordering::Relaxed);
        }
        if sample.is_silent() {
            self.silent.fetch_add(1, Ordering::Relaxed);
        }
        if let Some(distance) = sample.distance_meters {
            // Millimeter resolution keeps the running sum in an atomic
            self.distance_mm
                .fetch_add((distance * 1000.0).round() as u64, Ordering::Relaxed);
        }
    }

    /// Snapshot of the accumulated statistics
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            samples: self.samples.load(Ordering::Relaxed),
            motion_samples: self.motion_samples.load(Ordering::Relaxed),
            with_position: self.with_position.load(Ordering::Relaxed),
            silent: self.silent.load(Ordering::Relaxed),
            total_distance_m: self.distance_mm.load(Ordering::Relaxed) as f64 / 1000.0,
        }
    }
}

/// Snapshot of sink statistics (for reporting)
#[derive(Debug, Clone, Copy, Serialize)]
pub struct StatsSnapshot {
    pub samples: u64,
    pub motion_samples: u64,
    pub with_position: u64,
    pub silent: u64,
    pub total_distance_m: f64,
}

/// Sink that counts samples instead of persisting them
pub struct StatsSink {
    name: String,
    stats: Arc<SinkStats>,
    /// Log a progress line every N samples, 0 disables
    log_every: u64,
}

impl StatsSink {
    /// Create a new StatsSink with the given name
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_log_every(name, 0)
    }

    /// Create a StatsSink that logs progress every `log_every` samples
    pub fn with_log_every(name: impl Into<String>, log_every: u64) -> Self {
        Self {
            name: name.into(),
            stats: Arc::new(SinkStats::default()),
            log_every,
        }
    }

    /// Create from sink params
    ///
    /// Recognized params:
    /// - `log_every`: progress log interval in samples
    pub fn from_params(name: &str, params: &HashMap<String, String>) -> Result<Self, ContractError> {
        let log_every = match params.get("log_every") {
            Some(raw) => raw.parse::<u64>().map_err(|_| {
                ContractError::config_validation("log_every", "must be a non-negative integer")
            })?,
            None => 0,
        };
        Ok(Self::with_log_every(name, log_every))
    }

    /// Shared handle to the accumulated statistics
    pub fn stats(&self) -> Arc<SinkStats> {
        self.stats.clone()
    }
}

impl DataSink for StatsSink {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(name = "stats_sink_write", skip(self, sample), fields(sink = %self.name))]
    async fn write(&mut self, sample: &CombinedSample) -> Result<(), ContractError> {
        self.stats.record(sample);

        let seen = self.stats.samples.load(Ordering::Relaxed);
        if self.log_every > 0 && seen.is_multiple_of(self.log_every) {
            let snapshot = self.stats.snapshot();
            info!(
                sink = %self.name,
                samples = snapshot.samples,
                total_distance_m = snapshot.total_distance_m,
                "StatsSink progress"
            );
        }
        Ok(())
    }

    #[instrument(name = "stats_sink_flush", skip(self))]
    async fn flush(&mut self) -> Result<(), ContractError> {
        Ok(())
    }

    #[instrument(name = "stats_sink_close", skip(self))]
    async fn close(&mut self) -> Result<(), ContractError> {
        let snapshot = self.stats.snapshot();
        info!(
            sink = %self.name,
            samples = snapshot.samples,
            motion_samples = snapshot.motion_samples,
            with_position = snapshot.with_position,
            silent = snapshot.silent,
            total_distance_m = snapshot.total_distance_m,
            "StatsSink closed"
        );
        Ok(())
    }
}
