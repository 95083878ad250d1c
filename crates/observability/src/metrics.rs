//! Pipeline 指标收集模块
//!
//! 基于 CombinedSample 收集和统计聚合管道的运行指标。

use contracts::CombinedSample;
use metrics::{counter, gauge, histogram};

/// 从 CombinedSample 记录指标
///
/// 每次聚合器产生输出时调用此函数来记录指标。
///
/// # Example
///
/// ```ignore
/// use observability::metrics::record_combined_sample;
///
/// while let Some(sample) = output.recv().await {
///     record_combined_sample(&sample);
///     // ...
/// }
/// ```
pub fn record_combined_sample(sample: &CombinedSample) {
    // 样本计数器
    counter!("roadsync_samples_total").increment(1);

    // 最近一次输出时间 (用于检测停滞)
    gauge!("roadsync_last_emitted_at_millis").set(sample.emitted_at_millis as f64);

    // 每窗口运动样本数
    histogram!("roadsync_sample_motion_count").record(sample.motion_len() as f64);

    // 里程 (仅 stretch 策略填充)
    if let Some(distance) = sample.distance_meters {
        histogram!("roadsync_sample_distance_m").record(distance);
    }

    // 定位命中率
    if sample.position.is_some() {
        counter!("roadsync_samples_with_position_total").increment(1);
    } else {
        counter!("roadsync_samples_without_position_total").increment(1);
    }

    // 静默窗口
    if sample.is_silent() {
        counter!("roadsync_silent_samples_total").increment(1);
    }
}

/// 记录传感器事件接收
pub fn record_event_received(source_id: &str, kind: &str) {
    counter!(
        "roadsync_events_received_total",
        "source_id" => source_id.to_string(),
        "kind" => kind.to_string()
    )
    .increment(1);
}

/// 记录样本分发
pub fn record_sample_dispatched(sink_name: &str, success: bool) {
    let status = if success { "success" } else { "failure" };
    counter!(
        "roadsync_samples_dispatched_total",
        "sink" => sink_name.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

/// 记录输出队列深度
pub fn record_output_depth(depth: usize) {
    gauge!("roadsync_output_queue_depth").set(depth as f64);
}

/// 合并流指标聚合器
///
/// 在内存中聚合指标，便于统计和输出摘要。
#[derive(Debug, Clone, Default)]
pub struct CombinedMetricsAggregator {
    /// 总样本数
    pub total_samples: u64,

    /// 静默样本数 (无运动数据)
    pub silent_samples: u64,

    /// 带定位的样本数
    pub samples_with_position: u64,

    /// 累计里程 (米)
    pub total_distance_m: f64,

    /// 每窗口运动样本数统计
    pub motion_stats: RunningStats,

    /// 单窗口里程统计
    pub distance_stats: RunningStats,

    /// 输出间隔统计 (毫秒)
    pub interval_stats: RunningStats,

    last_emitted_at: Option<i64>,
}

impl CombinedMetricsAggregator {
    /// 创建新的聚合器
    pub fn new() -> Self {
        Self::default()
    }

    /// 更新聚合统计
    pub fn update(&mut self, sample: &CombinedSample) {
        self.total_samples += 1;

        if sample.is_silent() {
            self.silent_samples += 1;
        }
        if sample.position.is_some() {
            self.samples_with_position += 1;
        }

        self.motion_stats.push(sample.motion_len() as f64);

        if let Some(distance) = sample.distance_meters {
            self.total_distance_m += distance;
            self.distance_stats.push(distance);
        }

        if let Some(previous) = self.last_emitted_at {
            self.interval_stats
                .push((sample.emitted_at_millis - previous) as f64);
        }
        self.last_emitted_at = Some(sample.emitted_at_millis);
    }

    /// 生成摘要报告
    pub fn summary(&self) -> MetricsSummary {
        MetricsSummary {
            total_samples: self.total_samples,
            silent_samples: self.silent_samples,
            samples_with_position: self.samples_with_position,
            silent_rate: if self.total_samples > 0 {
                self.silent_samples as f64 / self.total_samples as f64 * 100.0
            } else {
                0.0
            },
            position_rate: if self.total_samples > 0 {
                self.samples_with_position as f64 / self.total_samples as f64 * 100.0
            } else {
                0.0
            },
            total_distance_m: self.total_distance_m,
            motion_per_window: StatsSummary::from(&self.motion_stats),
            distance_m: StatsSummary::from(&self.distance_stats),
            emit_interval_ms: StatsSummary::from(&self.interval_stats),
        }
    }

    /// 重置统计
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// 指标摘要
#[derive(Debug, Clone, Default)]
pub struct MetricsSummary {
    pub total_samples: u64,
    pub silent_samples: u64,
    pub samples_with_position: u64,
    pub silent_rate: f64,
    pub position_rate: f64,
    pub total_distance_m: f64,
    pub motion_per_window: StatsSummary,
    pub distance_m: StatsSummary,
    pub emit_interval_ms: StatsSummary,
}

impl std::fmt::Display for MetricsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Combined Stream Summary ===")?;
        writeln!(f, "Total samples: {}", self.total_samples)?;
        writeln!(
            f,
            "Silent samples: {} ({:.2}%)",
            self.silent_samples, self.silent_rate
        )?;
        writeln!(
            f,
            "Samples with position: {} ({:.2}%)",
            self.samples_with_position, self.position_rate
        )?;
        writeln!(f, "Total distance (m): {:.1}", self.total_distance_m)?;
        writeln!(f, "Motion samples per window: {}", self.motion_per_window)?;
        writeln!(f, "Stretch distance (m): {}", self.distance_m)?;
        writeln!(f, "Emit interval (ms): {}", self.emit_interval_ms)?;

        Ok(())
    }
}

/// 统计摘要
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count(),
            min: stats.min(),
            max: stats.max(),
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.3}, max={:.3}, mean={:.3}, std={:.3} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// 在线统计计算器 (Welford's algorithm)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    /// 添加新值
    pub fn push(&mut self, value: f64) {
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);

            let delta = value - self.mean;
            self.mean += delta / self.count as f64;
            let delta2 = value - self.mean;
            self.m2 += delta * delta2;
        }
    }

    /// 样本数量
    pub fn count(&self) -> u64 {
        self.count
    }

    /// 均值
    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// 方差
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    /// 标准差
    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    /// 最小值
    pub fn min(&self) -> f64 {
        self.min
    }

    /// 最大值
    pub fn max(&self) -> f64 {
        self.max
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{AccelerationSample, PositionFix};

    fn make_sample(distance: Option<f64>, emitted_at: i64) -> CombinedSample {
        CombinedSample {
            accelerations: vec![AccelerationSample {
                x: 0.1,
                y: 0.0,
                z: 9.8,
                timestamp_nanos: 1_000_000,
            }],
            angular_velocities: Vec::new(),
            position: Some(PositionFix {
                latitude: 40.0,
                longitude: -74.0,
                accuracy: 5.0,
                speed: 1.0,
                timestamp_millis: emitted_at,
            }),
            distance_meters: distance,
            emitted_at_millis: emitted_at,
        }
    }

    #[test]
    fn test_running_stats() {
        let mut stats = RunningStats::default();

        stats.push(1.0);
        stats.push(2.0);
        stats.push(3.0);
        stats.push(4.0);
        stats.push(5.0);

        assert_eq!(stats.count(), 5);
        assert!((stats.mean() - 3.0).abs() < 1e-10);
        assert!((stats.min() - 1.0).abs() < 1e-10);
        assert!((stats.max() - 5.0).abs() < 1e-10);
        assert!((stats.variance() - 2.5).abs() < 1e-10);
    }

    #[test]
    fn test_aggregator_update() {
        let mut aggregator = CombinedMetricsAggregator::new();

        aggregator.update(&make_sample(Some(25.0), 1_000));
        aggregator.update(&make_sample(Some(21.5), 1_400));

        assert_eq!(aggregator.total_samples, 2);
        assert_eq!(aggregator.silent_samples, 0);
        assert_eq!(aggregator.samples_with_position, 2);
        assert!((aggregator.total_distance_m - 46.5).abs() < 1e-9);

        // One interval between two samples
        assert_eq!(aggregator.interval_stats.count(), 1);
        assert!((aggregator.interval_stats.mean() - 400.0).abs() < 1e-9);
    }

    #[test]
    fn test_summary_display() {
        let mut aggregator = CombinedMetricsAggregator::new();
        aggregator.update(&make_sample(Some(25.0), 1_000));

        let output = format!("{}", aggregator.summary());
        assert!(output.contains("Total samples: 1"));
        assert!(output.contains("100.00%"));
        assert!(output.contains("Total distance (m): 25.0"));
        // No intervals yet
        assert!(output.contains("Emit interval (ms): N/A"));
    }
}
