//! Stretch Pipeline Example
//!
//! Demonstrates reading a single configuration file, wiring mock sensors,
//! aggregating by traveled distance, and fanning out via the dispatcher.
//!
//! Run with: cargo run --bin stretch_pipeline [config_path]

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use config_loader::ConfigLoader;
use contracts::{SourceConfig, StreamKind, WindowPolicy};
use dispatcher::create_dispatcher;
use ingestion::{IngestionPipeline, MockSensorSource};
use tokio::sync::mpsc;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;
use window_engine::AggregatorHandle;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting Stretch Pipeline Demo");

    let config_path = resolve_config_path();
    info!(path = %config_path.display(), "Loading unified config file");
    let blueprint = ConfigLoader::load_from_path(config_path.as_path())?;
    info!(pipeline = %blueprint.pipeline.name, "Blueprint loaded");

    if matches!(blueprint.aggregator.policy, WindowPolicy::TimeWindow(_)) {
        warn!("Config selects the time window policy; set mode = \"stretch\" to see stretches");
    }

    // ==== Stage 1: Create Dispatcher with sinks from config ====
    let (dispatch_tx, dispatch_rx) = mpsc::channel(100);
    let dispatcher = create_dispatcher(blueprint.sinks.clone(), dispatch_rx).await?;
    let dispatcher_handle = dispatcher.spawn();

    // ==== Stage 2: Start Mock Sources described by config ====
    let mut ingestion = IngestionPipeline::new(blueprint.pipeline.channel_capacity);
    for source_config in &blueprint.sources {
        ingestion.register_source(
            source_config.id.clone(),
            Box::new(build_source(source_config)),
            None,
        )?;
    }
    info!(
        source_count = ingestion.source_count(),
        "Starting mock sensor streams"
    );

    let events = ingestion.take_receiver().unwrap();
    ingestion.start_all();

    // ==== Stage 3: Spawn Aggregation Worker ====
    let (aggregator, mut output_rx) = AggregatorHandle::spawn(blueprint.aggregator.clone());
    let aggregator = Arc::new(aggregator);

    let feeder_aggregator = aggregator.clone();
    let feeder = tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            if !feeder_aggregator.push_event(event) {
                break;
            }
        }
    });

    // ==== Stage 4: Run Pipeline ====
    let target_stretches = 20u64;
    info!(target_stretches, "Running pipeline");

    let pipeline_handle = tokio::spawn(async move {
        let mut emitted = 0u64;

        while let Some(sample) = output_rx.recv().await {
            emitted += 1;
            observability::record_combined_sample(&sample);
            info!(
                distance_m = format!("{:.1}", sample.distance_meters.unwrap_or(0.0)),
                motion_samples = sample.motion_len(),
                emitted_at = sample.emitted_at_millis,
                "Stretch produced"
            );

            if dispatch_tx.send(sample).await.is_err() {
                break;
            }

            if emitted >= target_stretches {
                break;
            }
        }

        emitted
    });

    // Wait for pipeline with timeout
    let result = tokio::time::timeout(Duration::from_secs(10), pipeline_handle).await;

    // ==== Stage 5: Graceful Shutdown ====
    info!("Shutting down...");

    ingestion.stop_all();
    aggregator.dispose().await;
    drop(ingestion);

    let _ = tokio::time::timeout(Duration::from_secs(2), dispatcher_handle).await;
    let _ = tokio::time::timeout(Duration::from_secs(2), feeder).await;

    match result {
        Ok(Ok(count)) => info!(stretches = count, "Pipeline completed successfully"),
        Ok(Err(e)) => info!("Pipeline task error: {:?}", e),
        Err(_) => info!("Pipeline timed out"),
    }

    info!("Stretch Pipeline Demo finished");
    Ok(())
}

fn resolve_config_path() -> PathBuf {
    std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("demos/stretch.toml"))
}

fn build_source(config: &SourceConfig) -> MockSensorSource {
    match config.kind {
        StreamKind::Acceleration => {
            MockSensorSource::accelerometer(&config.id, config.frequency_hz)
        }
        StreamKind::AngularVelocity => MockSensorSource::gyroscope(&config.id, config.frequency_hz),
        StreamKind::Position => MockSensorSource::gps(&config.id, config.frequency_hz),
    }
}
