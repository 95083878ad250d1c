//! Mock 传感器源
//!
//! 无真实传感器环境下的数据源，实现 `SensorSource` trait，
//! 在后台线程按指定频率生成样本。三路流共享同一单调时钟起点，
//! 保证 accel/gyro 时间戳可配对。

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use std::thread;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use contracts::{
    AccelerationSample, AngularVelocitySample, PositionFix, SensorEvent, SensorEventCallback,
    SensorSource, StreamKind,
};
use tracing::{debug, trace};

/// Meters per degree of longitude at the equator
const METERS_PER_DEGREE: f64 = 111_194.9;

/// 进程级传感器时钟起点
fn sensor_clock_epoch() -> Instant {
    static EPOCH: OnceLock<Instant> = OnceLock::new();
    *EPOCH.get_or_init(Instant::now)
}

/// 当前传感器时钟读数（单调纳秒）
fn monotonic_nanos() -> i64 {
    sensor_clock_epoch().elapsed().as_nanos() as i64
}

/// 当前墙钟读数（epoch 毫秒）
fn wall_clock_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as i64)
        .unwrap_or(0)
}

/// Mock 传感器源配置
#[derive(Debug, Clone)]
pub struct MockSourceConfig {
    /// 发送频率 (Hz)
    pub frequency_hz: f64,

    /// 运动样本摆动幅度（仅运动流）
    pub motion_amplitude: f32,

    /// 轨迹起点纬度（仅 Position）
    pub start_latitude: f64,

    /// 轨迹起点经度（仅 Position）
    pub start_longitude: f64,

    /// 每个 fix 的经度步长（度，仅 Position）
    pub longitude_step_deg: f64,
}

impl Default for MockSourceConfig {
    fn default() -> Self {
        Self {
            frequency_hz: 50.0,
            motion_amplitude: 0.5,
            start_latitude: 40.0,
            start_longitude: -74.0,
            longitude_step_deg: 0.0001,
        }
    }
}

/// Mock 传感器源
///
/// 按流类别生成模拟数据：运动流输出平滑正弦摆动，
/// 定位流沿赤道平行线匀速直行。
pub struct MockSensorSource {
    source_id: String,
    kind: StreamKind,
    config: MockSourceConfig,
    listening: Arc<AtomicBool>,
}

impl MockSensorSource {
    /// 创建新的 Mock 源
    pub fn new(source_id: String, kind: StreamKind, config: MockSourceConfig) -> Self {
        Self {
            source_id,
            kind,
            config,
            listening: Arc::new(AtomicBool::new(false)),
        }
    }

    /// 创建加速度计源
    pub fn accelerometer(source_id: &str, frequency_hz: f64) -> Self {
        Self::new(
            source_id.to_string(),
            StreamKind::Acceleration,
            MockSourceConfig {
                frequency_hz,
                ..Default::default()
            },
        )
    }

    /// 创建陀螺仪源
    pub fn gyroscope(source_id: &str, frequency_hz: f64) -> Self {
        Self::new(
            source_id.to_string(),
            StreamKind::AngularVelocity,
            MockSourceConfig {
                frequency_hz,
                ..Default::default()
            },
        )
    }

    /// 创建定位源
    pub fn gps(source_id: &str, frequency_hz: f64) -> Self {
        Self::new(
            source_id.to_string(),
            StreamKind::Position,
            MockSourceConfig {
                frequency_hz,
                ..Default::default()
            },
        )
    }

    /// 生成模拟样本
    fn generate_event(config: &MockSourceConfig, kind: StreamKind, sequence: u64) -> SensorEvent {
        match kind {
            StreamKind::Acceleration => {
                let nanos = monotonic_nanos();
                let phase = nanos as f32 / 1e9;
                SensorEvent::Acceleration(AccelerationSample {
                    x: config.motion_amplitude * phase.sin(),
                    y: config.motion_amplitude * (phase * 0.5).cos(),
                    z: 9.81,
                    timestamp_nanos: nanos,
                })
            }
            StreamKind::AngularVelocity => {
                let nanos = monotonic_nanos();
                let phase = nanos as f32 / 1e9;
                SensorEvent::AngularVelocity(AngularVelocitySample {
                    x: 0.0,
                    y: 0.0,
                    z: config.motion_amplitude * 0.2 * (phase * 0.25).sin(),
                    timestamp_nanos: nanos,
                })
            }
            StreamKind::Position => {
                let speed =
                    (config.longitude_step_deg * METERS_PER_DEGREE * config.frequency_hz) as f32;
                SensorEvent::Position(PositionFix {
                    latitude: config.start_latitude,
                    longitude: config.start_longitude
                        + sequence as f64 * config.longitude_step_deg,
                    accuracy: 5.0,
                    speed,
                    timestamp_millis: wall_clock_millis(),
                })
            }
        }
    }
}

impl SensorSource for MockSensorSource {
    fn source_id(&self) -> &str {
        &self.source_id
    }

    fn kind(&self) -> StreamKind {
        self.kind
    }

    fn listen(&self, callback: SensorEventCallback) {
        // Idempotent: if already listening, don't start again
        if self.listening.swap(true, Ordering::SeqCst) {
            return;
        }

        let source_id = self.source_id.clone();
        let kind = self.kind;
        let config = self.config.clone();
        let listening = self.listening.clone();

        let interval = Duration::from_secs_f64(1.0 / config.frequency_hz.max(0.001));

        thread::spawn(move || {
            let mut sequence: u64 = 0;

            debug!(
                source_id = %source_id,
                kind = %kind,
                frequency_hz = config.frequency_hz,
                "mock source started"
            );

            while listening.load(Ordering::Relaxed) {
                let event = Self::generate_event(&config, kind, sequence);
                sequence += 1;

                callback(event);

                trace!(source_id = %source_id, sequence, "mock event sent");

                thread::sleep(interval);
            }

            debug!(source_id = %source_id, "mock source stopped");
        });
    }

    fn stop(&self) {
        self.listening.store(false, Ordering::SeqCst);
    }

    fn is_listening(&self) -> bool {
        self.listening.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU64;
    use std::sync::Mutex;

    #[test]
    fn test_mock_accelerometer_emits_monotonic_samples() {
        let source = MockSensorSource::accelerometer("test_accel", 200.0);

        let timestamps = Arc::new(Mutex::new(Vec::new()));
        let sink = timestamps.clone();

        source.listen(Arc::new(move |event| {
            if let SensorEvent::Acceleration(sample) = event {
                sink.lock().unwrap().push(sample.timestamp_nanos);
            } else {
                panic!("accelerometer source emitted a foreign event");
            }
        }));

        thread::sleep(Duration::from_millis(50));
        source.stop();
        assert!(!source.is_listening());

        let seen = timestamps.lock().unwrap();
        assert!(seen.len() > 1);
        assert!(seen.windows(2).all(|pair| pair[0] <= pair[1]));
    }

    #[test]
    fn test_mock_gps_walks_straight_track() {
        let source = MockSensorSource::gps("test_gps", 200.0);

        let fixes = Arc::new(Mutex::new(Vec::new()));
        let sink = fixes.clone();

        source.listen(Arc::new(move |event| {
            if let SensorEvent::Position(fix) = event {
                sink.lock().unwrap().push(fix);
            }
        }));

        thread::sleep(Duration::from_millis(50));
        source.stop();

        let seen = fixes.lock().unwrap();
        assert!(seen.len() > 1);

        // Constant latitude, longitude advancing one step per fix
        let step = MockSourceConfig::default().longitude_step_deg;
        for (i, fix) in seen.iter().enumerate() {
            assert_eq!(fix.latitude, 40.0);
            let expected = -74.0 + i as f64 * step;
            assert!((fix.longitude - expected).abs() < 1e-12);
        }
    }

    #[test]
    fn test_listen_is_idempotent() {
        let source = MockSensorSource::gyroscope("test_gyro", 100.0);

        let count = Arc::new(AtomicU64::new(0));
        let count_clone = count.clone();

        source.listen(Arc::new(move |_| {
            count_clone.fetch_add(1, Ordering::Relaxed);
        }));
        // Second listen must not spawn another generator
        source.listen(Arc::new(|_| panic!("second callback must never run")));

        thread::sleep(Duration::from_millis(30));
        source.stop();

        assert!(count.load(Ordering::Relaxed) > 0);
    }

    #[test]
    fn test_motion_sources_share_the_sensor_clock() {
        let accel = MockSensorSource::accelerometer("clock_accel", 100.0);
        let gyro = MockSensorSource::gyroscope("clock_gyro", 100.0);

        let spread = Arc::new(Mutex::new((None, None)));

        let for_accel = spread.clone();
        accel.listen(Arc::new(move |event| {
            if let SensorEvent::Acceleration(sample) = event {
                for_accel.lock().unwrap().0.get_or_insert(sample.timestamp_nanos);
            }
        }));
        let for_gyro = spread.clone();
        gyro.listen(Arc::new(move |event| {
            if let SensorEvent::AngularVelocity(sample) = event {
                for_gyro.lock().unwrap().1.get_or_insert(sample.timestamp_nanos);
            }
        }));

        thread::sleep(Duration::from_millis(50));
        accel.stop();
        gyro.stop();

        let (first_accel, first_gyro) = *spread.lock().unwrap();
        let first_accel = first_accel.expect("accelerometer emitted");
        let first_gyro = first_gyro.expect("gyroscope emitted");

        // Same clock domain: first readings land within a coarse bound
        assert!((first_accel - first_gyro).abs() < 1_000_000_000);
    }
}
