//! Mock Pipeline Example
//!
//! Demonstrates the time window policy end to end with mock sensor sources.
//! This example runs without any real sensor hardware.
//!
//! Run with: cargo run --bin mock_pipeline [config_path]

use std::sync::Arc;
use std::time::Duration;

use config_loader::ConfigLoader;
use contracts::{
    AggregatorConfig, ConfigVersion, DropPolicy, PipelineBlueprint, PipelineSettings,
    SourceConfig, StreamKind, TimeWindowConfig, WindowPolicy,
};
use ingestion::{IngestionPipeline, MockSensorSource};
use window_engine::AggregatorHandle;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    tracing::info!("Starting Mock Pipeline Demo");

    // ==== Stage 1: Use default config or load from file ====
    let blueprint = if let Some(path) = std::env::args().nth(1) {
        tracing::info!(path = %path, "Loading blueprint config");
        ConfigLoader::load_from_path(std::path::Path::new(&path))?
    } else {
        // Create a minimal test blueprint
        create_test_blueprint()
    };

    // ==== Stage 2: Setup Ingestion Pipeline ====
    tracing::info!("Setting up ingestion pipeline...");
    let mut ingestion = IngestionPipeline::new(blueprint.pipeline.channel_capacity);

    for source_config in &blueprint.sources {
        let source = build_source(source_config);
        ingestion.register_source(source_config.id.clone(), Box::new(source), None)?;
        tracing::info!(
            source_id = %source_config.id,
            kind = %source_config.kind,
            frequency_hz = source_config.frequency_hz,
            "Registered source"
        );
    }

    tracing::info!(
        source_count = ingestion.source_count(),
        "Ingestion pipeline configured"
    );

    // ==== Stage 3: Spawn Aggregation Worker ====
    tracing::info!("Configuring aggregator...");
    let (aggregator, mut output_rx) = AggregatorHandle::spawn(blueprint.aggregator.clone());
    let aggregator = Arc::new(aggregator);

    // ==== Stage 4: Start Pipeline ====
    tracing::info!("Starting pipeline...");
    let events = ingestion.take_receiver().unwrap();
    ingestion.start_all();

    let feeder_aggregator = aggregator.clone();
    let feeder = tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            if !feeder_aggregator.push_event(event) {
                break;
            }
        }
    });

    let target_windows = 50u64;
    tracing::info!("Running pipeline, target: {} combined windows", target_windows);

    let consumer_handle = tokio::spawn(async move {
        let mut window_count = 0u64;

        while let Some(sample) = output_rx.recv().await {
            window_count += 1;
            tracing::info!(
                motion_samples = sample.motion_len(),
                has_position = sample.position.is_some(),
                emitted_at = sample.emitted_at_millis,
                "Combined window produced"
            );

            if window_count >= target_windows {
                break;
            }
        }
        window_count
    });

    // Wait for pipeline or timeout
    let result = tokio::time::timeout(Duration::from_secs(30), consumer_handle).await;

    // ==== Stage 5: Cleanup ====
    tracing::info!("Shutting down and cleaning up...");
    ingestion.stop_all();
    aggregator.dispose().await;
    drop(ingestion);
    let _ = tokio::time::timeout(Duration::from_secs(2), feeder).await;

    match result {
        Ok(Ok(count)) => tracing::info!(windows = count, "Pipeline completed successfully"),
        Ok(Err(e)) => tracing::warn!("Pipeline error: {:?}", e),
        Err(_) => tracing::warn!("Pipeline timed out"),
    }

    Ok(())
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

fn create_test_blueprint() -> PipelineBlueprint {
    PipelineBlueprint {
        version: ConfigVersion::V1,
        pipeline: PipelineSettings {
            name: "mock_demo".to_string(),
            channel_capacity: 256,
        },
        sources: vec![
            SourceConfig {
                id: "imu_accel".to_string(),
                kind: StreamKind::Acceleration,
                frequency_hz: 100.0,
                drop_policy: DropPolicy::DropNewest,
            },
            SourceConfig {
                id: "imu_gyro".to_string(),
                kind: StreamKind::AngularVelocity,
                frequency_hz: 100.0,
                drop_policy: DropPolicy::DropNewest,
            },
            SourceConfig {
                id: "gps_main".to_string(),
                kind: StreamKind::Position,
                frequency_hz: 10.0,
                drop_policy: DropPolicy::DropNewest,
            },
        ],
        aggregator: AggregatorConfig {
            policy: WindowPolicy::TimeWindow(TimeWindowConfig::default()),
            output_capacity: 64,
        },
        sinks: vec![],
    }
}
