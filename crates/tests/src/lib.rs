//! # Integration Tests
//!
//! 集成测试与端到端测试。
//!
//! 负责：
//! - 合约冒烟测试
//! - 模拟 e2e 测试（mock 源 → 聚合 → 分发）
//! - 蓝图驱动的管道组装

#[cfg(test)]
mod contract_tests {
    #[test]
    fn test_contracts_compile() {
        // 验证 contracts crate 可编译
        let _ = contracts::ConfigVersion::V1;
        assert_eq!(contracts::StreamKind::ALL.len(), 3);
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use config_loader::{ConfigFormat, ConfigLoader};
    use contracts::{
        AggregatorConfig, PositionFix, SourceConfig, StreamKind, TimeWindowConfig, WindowPolicy,
    };
    use dispatcher::{create_dispatcher, Dispatcher, SinkHandle, StatsSink};
    use ingestion::{IngestionPipeline, MockSensorSource};
    use tokio::sync::mpsc;
    use tokio::time::timeout;
    use window_engine::AggregatorHandle;

    /// Blueprint-sourced mock source, mirroring how the CLI builds them
    fn build_source(config: &SourceConfig) -> MockSensorSource {
        match config.kind {
            StreamKind::Acceleration => {
                MockSensorSource::accelerometer(&config.id, config.frequency_hz)
            }
            StreamKind::AngularVelocity => {
                MockSensorSource::gyroscope(&config.id, config.frequency_hz)
            }
            StreamKind::Position => MockSensorSource::gps(&config.id, config.frequency_hz),
        }
    }

    /// End-to-end: MockSensorSource -> IngestionPipeline -> AggregatorHandle -> Dispatcher
    ///
    /// 验证完整的数据流：
    /// 1. MockSensorSource 按频率生成三路样本
    /// 2. 时间窗口聚合产出 CombinedSample
    /// 3. Dispatcher 将样本送入 StatsSink
    #[tokio::test]
    async fn test_e2e_time_window_pipeline() {
        let mut ingestion = IngestionPipeline::new(256);
        ingestion
            .register_source(
                "imu_accel".to_string(),
                Box::new(MockSensorSource::accelerometer("imu_accel", 200.0)),
                None,
            )
            .unwrap();
        ingestion
            .register_source(
                "imu_gyro".to_string(),
                Box::new(MockSensorSource::gyroscope("imu_gyro", 200.0)),
                None,
            )
            .unwrap();
        ingestion
            .register_source(
                "gps_main".to_string(),
                Box::new(MockSensorSource::gps("gps_main", 50.0)),
                None,
            )
            .unwrap();

        let events = ingestion.take_receiver().unwrap();

        let (aggregator, output_rx) = AggregatorHandle::spawn(AggregatorConfig {
            policy: WindowPolicy::TimeWindow(TimeWindowConfig::default()),
            output_capacity: 64,
        });
        let aggregator = Arc::new(aggregator);

        // Stats sink stays observable through its shared accumulator
        let sink = StatsSink::new("e2e_stats");
        let stats = sink.stats();
        let dispatcher = Dispatcher::with_handles(vec![SinkHandle::spawn(sink, 100)], output_rx);
        let dispatcher_handle = dispatcher.spawn();

        let feeder_aggregator = aggregator.clone();
        let feeder = tokio::spawn(async move {
            let mut forwarded = 0u64;
            while let Ok(event) = events.recv().await {
                if !feeder_aggregator.push_event(event) {
                    break;
                }
                forwarded += 1;
            }
            forwarded
        });

        ingestion.start_all();
        assert!(ingestion.is_source_listening("imu_accel"));

        // Wait until the sink has seen a handful of combined samples
        let target = 5u64;
        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        while stats.snapshot().samples < target && tokio::time::Instant::now() < deadline {
            tokio::time::sleep(Duration::from_millis(25)).await;
        }

        ingestion.stop_all();
        aggregator.dispose().await;
        // Dropping the pipeline closes the funnel so the feeder can end
        drop(ingestion);

        // Worker gone -> output closed -> dispatcher drains and shuts down
        timeout(Duration::from_secs(2), dispatcher_handle)
            .await
            .expect("dispatcher shuts down after output closes")
            .unwrap();
        let forwarded = timeout(Duration::from_secs(2), feeder)
            .await
            .expect("feeder ends once the funnel closes")
            .unwrap();
        assert!(forwarded > 0, "no events made it into the aggregator");

        let snapshot = stats.snapshot();
        assert!(
            snapshot.samples >= target,
            "expected at least {target} combined samples, got {}",
            snapshot.samples
        );
        assert!(snapshot.motion_samples >= snapshot.samples);
        assert_eq!(snapshot.silent, 0, "empty windows must never be dispatched");
        assert!(snapshot.with_position >= 1);
        // Time window samples never carry a distance
        assert_eq!(snapshot.total_distance_m, 0.0);
    }

    /// Disposal mid-stream: sources keep producing, yet pushes are rejected
    /// and the output channel closes promptly.
    #[tokio::test]
    async fn test_e2e_disposal_mid_stream() {
        let mut ingestion = IngestionPipeline::new(128);
        ingestion
            .register_source(
                "imu_accel".to_string(),
                Box::new(MockSensorSource::accelerometer("imu_accel", 400.0)),
                None,
            )
            .unwrap();
        ingestion
            .register_source(
                "imu_gyro".to_string(),
                Box::new(MockSensorSource::gyroscope("imu_gyro", 400.0)),
                None,
            )
            .unwrap();

        let events = ingestion.take_receiver().unwrap();
        let (aggregator, mut output_rx) = AggregatorHandle::spawn(AggregatorConfig {
            policy: WindowPolicy::TimeWindow(TimeWindowConfig::default()),
            output_capacity: 16,
        });
        let aggregator = Arc::new(aggregator);

        let feeder_aggregator = aggregator.clone();
        let feeder = tokio::spawn(async move {
            while let Ok(event) = events.recv().await {
                if !feeder_aggregator.push_event(event) {
                    break;
                }
            }
        });

        ingestion.start_all();

        // First combined sample proves the pipeline is live
        let first = timeout(Duration::from_secs(5), output_rx.recv())
            .await
            .expect("a window closes within five seconds")
            .expect("output open");
        assert!(!first.accelerations.is_empty());

        // Dispose while both sources are still producing
        aggregator.dispose().await;
        assert!(aggregator.is_disposed());
        assert!(!aggregator.push_position(PositionFix {
            latitude: 40.0,
            longitude: -74.0,
            accuracy: 5.0,
            speed: 0.0,
            timestamp_millis: 0,
        }));

        // In-flight samples may drain, but the channel must close right after
        let drained = timeout(Duration::from_secs(1), async {
            let mut left = 0u32;
            while output_rx.recv().await.is_some() {
                left += 1;
            }
            left
        })
        .await
        .expect("output closes after disposal");
        assert!(drained <= 16, "more samples than the output could buffer");

        ingestion.stop_all();
        drop(ingestion);
        let _ = timeout(Duration::from_secs(2), feeder).await;
    }

    const STRETCH_BLUEPRINT: &str = r#"
[pipeline]
name = "stretch_e2e"
channel_capacity = 128

[[sources]]
id = "imu_accel"
kind = "acceleration"
frequency_hz = 200.0

[[sources]]
id = "imu_gyro"
kind = "angular_velocity"
frequency_hz = 200.0

[[sources]]
id = "gps_main"
kind = "position"
frequency_hz = 100.0

[aggregator]
output_capacity = 32

[aggregator.policy]
mode = "stretch"
min_stretch_length_m = 15.0

[[sinks]]
name = "combined_log"
sink_type = "log"
queue_capacity = 50

[[sinks]]
name = "ride_stats"
sink_type = "stats"
"#;

    /// 蓝图驱动：从 TOML 配置组装完整管道（stretch 策略）
    ///
    /// Sources, aggregator and sinks all come from the parsed blueprint;
    /// the test only wires the pieces the way the CLI orchestrator does.
    #[tokio::test]
    async fn test_e2e_blueprint_driven_stretch_pipeline() {
        let blueprint = ConfigLoader::load_from_str(STRETCH_BLUEPRINT, ConfigFormat::Toml)
            .expect("blueprint parses and validates");

        let mut ingestion = IngestionPipeline::new(blueprint.pipeline.channel_capacity);
        for source in &blueprint.sources {
            ingestion
                .register_source(source.id.clone(), Box::new(build_source(source)), None)
                .unwrap();
        }
        assert_eq!(ingestion.source_count(), 3);

        let events = ingestion.take_receiver().unwrap();
        let (aggregator, mut output_rx) = AggregatorHandle::spawn(blueprint.aggregator.clone());
        let aggregator = Arc::new(aggregator);

        // Tap the output so emissions stay observable on their way to the sinks
        let (dispatch_tx, dispatch_rx) = mpsc::channel(32);
        let emitted = Arc::new(AtomicU64::new(0));
        let emitted_in_tap = emitted.clone();
        let tap = tokio::spawn(async move {
            let mut min_distance = f64::MAX;
            while let Some(sample) = output_rx.recv().await {
                observability::record_combined_sample(&sample);
                let distance = sample
                    .distance_meters
                    .expect("stretch samples carry a distance");
                min_distance = min_distance.min(distance);
                emitted_in_tap.fetch_add(1, Ordering::SeqCst);
                if dispatch_tx.send(sample).await.is_err() {
                    break;
                }
            }
            min_distance
        });

        let dispatcher = create_dispatcher(blueprint.sinks.clone(), dispatch_rx)
            .await
            .expect("sinks build from the blueprint");
        let dispatcher_handle = dispatcher.spawn();

        let feeder_aggregator = aggregator.clone();
        let feeder = tokio::spawn(async move {
            while let Ok(event) = events.recv().await {
                if !feeder_aggregator.push_event(event) {
                    break;
                }
            }
        });

        ingestion.start_all();

        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        while emitted.load(Ordering::SeqCst) < 3 && tokio::time::Instant::now() < deadline {
            tokio::time::sleep(Duration::from_millis(25)).await;
        }

        ingestion.stop_all();
        aggregator.dispose().await;
        drop(ingestion);

        let min_distance = timeout(Duration::from_secs(2), tap)
            .await
            .expect("tap ends when the output closes")
            .unwrap();
        timeout(Duration::from_secs(2), dispatcher_handle)
            .await
            .expect("dispatcher drains after the tap closes")
            .unwrap();
        let _ = timeout(Duration::from_secs(2), feeder).await;

        assert!(
            emitted.load(Ordering::SeqCst) >= 3,
            "expected at least three stretch emissions"
        );
        assert!(
            min_distance > 15.0,
            "every stretch must exceed the threshold, shortest was {min_distance}"
        );
    }
}
