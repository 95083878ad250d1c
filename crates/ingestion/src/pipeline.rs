//! Ingestion Pipeline main entry

use std::collections::HashMap;
use std::sync::Arc;

use async_channel::{bounded, Receiver, Sender};
use contracts::{SensorEvent, SensorSource};
use tracing::{debug, info, instrument};

use crate::adapter::StreamAdapter;
use crate::config::{BackpressureConfig, IngestionMetrics};
use crate::error::{IngestionError, Result};
use crate::generic_adapter::GenericStreamAdapter;

/// Ingestion Pipeline
///
/// Manages multiple stream adapters, provides unified event stream output.
/// All registered sources feed the same bounded channel.
pub struct IngestionPipeline {
    /// Registered adapters
    adapters: HashMap<String, Box<dyn StreamAdapter>>,

    /// Shared metrics
    metrics: Arc<IngestionMetrics>,

    /// Event sender (shared by all adapters)
    tx: Sender<SensorEvent>,

    /// Event receiver
    rx: Option<Receiver<SensorEvent>>,

    /// Default backpressure configuration
    default_config: BackpressureConfig,
}

impl IngestionPipeline {
    /// Create new Ingestion Pipeline
    ///
    /// # Arguments
    /// * `channel_capacity` - Channel capacity
    pub fn new(channel_capacity: usize) -> Self {
        let (tx, rx) = bounded(channel_capacity);

        Self {
            adapters: HashMap::new(),
            metrics: Arc::new(IngestionMetrics::new()),
            tx,
            rx: Some(rx),
            default_config: BackpressureConfig {
                channel_capacity,
                ..Default::default()
            },
        }
    }

    /// Create with custom backpressure configuration
    pub fn with_config(config: BackpressureConfig) -> Self {
        let (tx, rx) = bounded(config.channel_capacity);

        Self {
            adapters: HashMap::new(),
            metrics: Arc::new(IngestionMetrics::new()),
            tx,
            rx: Some(rx),
            default_config: config,
        }
    }

    /// Register a sensor data source
    ///
    /// # Arguments
    /// * `source_id` - Source configuration ID, must be unique
    /// * `source` - Data source implementing `SensorSource` trait
    /// * `config` - Optional backpressure configuration
    ///
    /// # Errors
    /// Returns `IngestionError::AlreadyRegistered` when the ID is taken.
    #[instrument(
        name = "ingestion_register_source",
        skip(self, source, config),
        fields(source_id = %source_id)
    )]
    pub fn register_source(
        &mut self,
        source_id: String,
        source: Box<dyn SensorSource>,
        config: Option<BackpressureConfig>,
    ) -> Result<()> {
        if self.adapters.contains_key(&source_id) {
            return Err(IngestionError::AlreadyRegistered { source_id });
        }

        let adapter = GenericStreamAdapter::new(
            source_id.clone(),
            source,
            config.unwrap_or_else(|| self.default_config.clone()),
        );
        debug!(source_id = %source_id, kind = %adapter.kind(), "registered stream source");
        self.adapters.insert(source_id, Box::new(adapter));
        Ok(())
    }

    /// Start all registered sources
    #[instrument(name = "ingestion_start_all", skip(self))]
    pub fn start_all(&self) {
        info!(count = self.adapters.len(), "starting all stream adapters");
        for (source_id, adapter) in &self.adapters {
            self.start_adapter(source_id, adapter.as_ref());
        }
    }

    /// Stop all sources
    #[instrument(name = "ingestion_stop_all", skip(self))]
    pub fn stop_all(&self) {
        info!(count = self.adapters.len(), "stopping all stream adapters");
        for (source_id, adapter) in &self.adapters {
            self.stop_adapter(source_id, adapter.as_ref());
        }
    }

    fn start_adapter(&self, source_id: &str, adapter: &dyn StreamAdapter) {
        if !adapter.is_listening() {
            debug!(source_id = %source_id, "starting adapter");
            adapter.start(self.tx.clone(), self.metrics.clone());
        }
    }

    fn stop_adapter(&self, source_id: &str, adapter: &dyn StreamAdapter) {
        if adapter.is_listening() {
            debug!(source_id = %source_id, "stopping adapter");
            adapter.stop();
        }
    }

    /// Get event stream receiver
    ///
    /// Note: Can only be called once, subsequent calls return None
    pub fn take_receiver(&mut self) -> Option<Receiver<SensorEvent>> {
        self.rx.take()
    }

    /// Get metrics reference
    pub fn metrics(&self) -> Arc<IngestionMetrics> {
        self.metrics.clone()
    }

    /// Get registered source count
    pub fn source_count(&self) -> usize {
        self.adapters.len()
    }

    /// Check if specified source is listening
    pub fn is_source_listening(&self, source_id: &str) -> bool {
        self.adapters
            .get(source_id)
            .map(|a| a.is_listening())
            .unwrap_or(false)
    }
}

impl Drop for IngestionPipeline {
    fn drop(&mut self) {
        self.stop_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockSensorSource;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_pipeline_creation() {
        let pipeline = IngestionPipeline::new(100);
        assert_eq!(pipeline.source_count(), 0);
    }

    #[test]
    fn test_take_receiver_once() {
        let mut pipeline = IngestionPipeline::new(100);
        assert!(pipeline.take_receiver().is_some());
        assert!(pipeline.take_receiver().is_none());
    }

    #[test]
    fn test_duplicate_registration_is_rejected() {
        let mut pipeline = IngestionPipeline::new(100);

        let first = MockSensorSource::accelerometer("accel_main", 100.0);
        let second = MockSensorSource::accelerometer("accel_main", 100.0);

        pipeline
            .register_source("accel_main".to_string(), Box::new(first), None)
            .unwrap();

        let err = pipeline
            .register_source("accel_main".to_string(), Box::new(second), None)
            .unwrap_err();
        assert!(matches!(
            err,
            IngestionError::AlreadyRegistered { source_id } if source_id == "accel_main"
        ));
        assert_eq!(pipeline.source_count(), 1);
    }

    #[test]
    fn test_pipeline_forwards_mock_events() {
        let mut pipeline = IngestionPipeline::new(100);

        let source = MockSensorSource::accelerometer("accel_main", 200.0);
        pipeline
            .register_source("accel_main".to_string(), Box::new(source), None)
            .unwrap();

        let rx = pipeline.take_receiver().unwrap();
        pipeline.start_all();
        assert!(pipeline.is_source_listening("accel_main"));

        thread::sleep(Duration::from_millis(100));
        pipeline.stop_all();

        let mut received = 0;
        while rx.try_recv().is_ok() {
            received += 1;
        }
        assert!(received > 0, "expected forwarded events, got none");
        assert!(pipeline.metrics().snapshot().events_received >= received);
    }
}
