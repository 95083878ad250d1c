//! Pipeline orchestrator - coordinates all components.
//!
//! Wires mock sensor sources through the ingestion pipeline into the
//! aggregation worker, then forwards combined samples to the dispatcher.

use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use contracts::{CombinedSample, PipelineBlueprint, SourceConfig, StreamKind};
use ingestion::{BackpressureConfig, IngestionPipeline, MockSensorSource};
use observability::record_combined_sample;
use tokio::sync::mpsc;
use tracing::{info, warn};
use window_engine::AggregatorHandle;

use super::PipelineStats;

/// Pipeline configuration
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// The pipeline blueprint configuration
    pub blueprint: PipelineBlueprint,

    /// Maximum number of combined samples to produce (None = unlimited)
    pub max_samples: Option<u64>,

    /// Pipeline timeout (None = no timeout)
    pub timeout: Option<Duration>,

    /// Metrics server port (None = disabled)
    pub metrics_port: Option<u16>,
}

/// Main pipeline orchestrator
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    /// Create a new pipeline with the given configuration
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// Run the pipeline to completion
    pub async fn run(self) -> Result<PipelineStats> {
        let start_time = Instant::now();
        let blueprint = &self.config.blueprint;

        // Initialize Metrics (optional)
        if let Some(port) = self.config.metrics_port {
            observability::init_metrics_only(port)?;
            info!("Metrics endpoint available on port {}", port);
        }

        // Setup Ingestion Pipeline
        info!("Setting up ingestion pipeline...");
        let mut ingestion = IngestionPipeline::new(blueprint.pipeline.channel_capacity);

        for source_config in &blueprint.sources {
            let source = build_mock_source(source_config);
            let backpressure = BackpressureConfig::new(
                blueprint.pipeline.channel_capacity,
                source_config.drop_policy,
            );
            ingestion
                .register_source(
                    source_config.id.clone(),
                    Box::new(source),
                    Some(backpressure),
                )
                .with_context(|| format!("Failed to register source '{}'", source_config.id))?;
        }

        let active_sources = ingestion.source_count();
        info!(active_sources, "Ingestion pipeline configured");

        // Setup Aggregation Worker
        info!(
            policy = blueprint.aggregator.policy.name(),
            "Spawning aggregation worker..."
        );
        let (aggregator, mut output_rx) = AggregatorHandle::spawn(blueprint.aggregator.clone());

        // Setup Dispatcher
        info!("Setting up dispatcher...");
        let (dispatch_tx, dispatch_rx) =
            mpsc::channel::<CombinedSample>(blueprint.aggregator.output_capacity);

        if blueprint.sinks.is_empty() {
            warn!("No sinks configured - combined samples will be dropped");
        }

        let dispatcher = dispatcher::create_dispatcher(blueprint.sinks.clone(), dispatch_rx)
            .await
            .context("Failed to create dispatcher")?;

        let active_sinks = blueprint.sinks.len();
        let dispatcher_handle = dispatcher.spawn();

        info!(active_sinks, "Dispatcher started");

        // Start Pipeline
        info!("Starting sensor data ingestion...");
        ingestion.start_all();
        let ingestion_rx = ingestion
            .take_receiver()
            .context("Failed to get ingestion receiver")?;

        let max_samples = self.config.max_samples;
        info!(max_samples = ?max_samples, "Pipeline running");

        let mut stats = PipelineStats {
            active_sources,
            active_sinks,
            ..Default::default()
        };

        // Pipeline processing loop. Feeds sensor events into the worker and
        // forwards combined samples to the dispatcher. Runs until a channel
        // closes, the sample limit is reached, or the timeout elapses.
        let run_loop = async {
            loop {
                tokio::select! {
                    event = ingestion_rx.recv() => {
                        let Ok(event) = event else {
                            warn!("Ingestion channel closed");
                            break;
                        };
                        stats.events_received += 1;
                        if !aggregator.push_event(event) {
                            warn!("Aggregation worker stopped accepting events");
                            break;
                        }
                    }
                    maybe_sample = output_rx.recv() => {
                        let Some(sample) = maybe_sample else {
                            warn!("Aggregator output closed");
                            break;
                        };
                        stats.samples_combined += 1;

                        record_combined_sample(&sample);
                        stats.combined_metrics.update(&sample);

                        info!(
                            emitted_at = sample.emitted_at_millis,
                            motion = sample.motion_len(),
                            position = sample.position.is_some(),
                            distance_m = ?sample.distance_meters,
                            "Combined sample produced"
                        );

                        if dispatch_tx.send(sample).await.is_err() {
                            warn!("Dispatcher channel closed");
                            break;
                        }

                        // Check max samples limit
                        if let Some(max) = max_samples {
                            if stats.samples_combined >= max {
                                info!(samples = stats.samples_combined, "Reached max samples limit");
                                break;
                            }
                        }
                    }
                }
            }
        };

        // Run with optional timeout
        match self.config.timeout {
            Some(limit) => {
                if tokio::time::timeout(limit, run_loop).await.is_err() {
                    info!(
                        timeout_secs = limit.as_secs(),
                        "Run window elapsed, stopping pipeline"
                    );
                }
            }
            None => run_loop.await,
        }

        // Shutdown
        info!("Shutting down pipeline...");
        ingestion.stop_all();
        aggregator.dispose().await;
        drop(dispatch_tx);

        // Wait for dispatcher to flush
        let _ = tokio::time::timeout(Duration::from_secs(5), dispatcher_handle).await;

        stats.events_dropped = ingestion.metrics().snapshot().events_dropped;
        stats.duration = start_time.elapsed();

        info!(
            duration_secs = stats.duration.as_secs_f64(),
            sps = format!("{:.2}", stats.samples_per_second()),
            "Pipeline shutdown complete"
        );

        Ok(stats)
    }
}

/// Build a mock sensor source matching a blueprint source entry
fn build_mock_source(config: &SourceConfig) -> MockSensorSource {
    match config.kind {
        StreamKind::Acceleration => MockSensorSource::accelerometer(&config.id, config.frequency_hz),
        StreamKind::AngularVelocity => MockSensorSource::gyroscope(&config.id, config.frequency_hz),
        StreamKind::Position => MockSensorSource::gps(&config.id, config.frequency_hz),
    }
}
