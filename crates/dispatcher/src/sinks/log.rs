//! LogSink - logs combined sample summary via tracing

use contracts::{CombinedSample, ContractError, DataSink};
use tracing::{debug, info, instrument, warn};

/// Sink that logs sample summaries for debugging
pub struct LogSink {
    name: String,
}

impl LogSink {
    /// Create a new LogSink with the given name
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    fn log_sample_summary(&self, sample: &CombinedSample) {
        info!(
            sink = %self.name,
            emitted_at = sample.emitted_at_millis,
            accelerations = sample.accelerations.len(),
            angular_velocities = sample.angular_velocities.len(),
            has_position = sample.position.is_some(),
            distance_m = ?sample.distance_meters,
            "CombinedSample received"
        );
    }
}

impl DataSink for LogSink {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "log_sink_write",
        skip(self, sample),
        fields(sink = %self.name, emitted_at = sample.emitted_at_millis)
    )]
    async fn write(&mut self, sample: &CombinedSample) -> Result<(), ContractError> {
        self.log_sample_summary(sample);

        // Full payload only at debug level
        match serde_json::to_string(sample) {
            Ok(json) => debug!(sink = %self.name, payload = %json, "sample payload"),
            Err(e) => warn!(sink = %self.name, error = %e, "payload serialization failed"),
        }
        Ok(())
    }

    #[instrument(name = "log_sink_flush", skip(self))]
    async fn flush(&mut self) -> Result<(), ContractError> {
        // Nothing to flush for log sink
        Ok(())
    }

    #[instrument(name = "log_sink_close", skip(self))]
    async fn close(&mut self) -> Result<(), ContractError> {
        info!(sink = %self.name, "LogSink closed");
        Ok(())
    }
}
