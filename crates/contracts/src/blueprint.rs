//! PipelineBlueprint - Config Loader 输出
//!
//! 描述完整的管道配置：输入源、聚合策略、通道容量、输出路由。

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use validator::Validate;

use crate::AggregatorConfig;

/// 配置版本
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// 完整的管道配置蓝图
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct PipelineBlueprint {
    /// 配置版本
    #[serde(default)]
    pub version: ConfigVersion,

    /// 管道全局设置
    #[validate(nested)]
    pub pipeline: PipelineSettings,

    /// 输入源定义列表
    #[validate(nested)]
    pub sources: Vec<SourceConfig>,

    /// 聚合器配置
    #[serde(default)]
    pub aggregator: AggregatorConfig,

    /// 输出路由配置
    #[serde(default)]
    pub sinks: Vec<SinkConfig>,
}

/// 管道全局设置
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct PipelineSettings {
    /// 管道名称 (e.g., "urban_loop")
    #[validate(length(min = 1, message = "pipeline name cannot be empty"))]
    pub name: String,

    /// ingestion 汇聚通道容量
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

fn default_channel_capacity() -> usize {
    256
}

/// 输入流类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamKind {
    /// 线性加速度
    Acceleration,
    /// 角速度（陀螺仪）
    AngularVelocity,
    /// 定位
    Position,
}

impl StreamKind {
    /// 指标标签用的静态名称
    #[inline]
    pub fn as_str(&self) -> &'static str {
        match self {
            StreamKind::Acceleration => "acceleration",
            StreamKind::AngularVelocity => "angular_velocity",
            StreamKind::Position => "position",
        }
    }

    /// 三类流的固定枚举顺序
    pub const ALL: [StreamKind; 3] = [
        StreamKind::Acceleration,
        StreamKind::AngularVelocity,
        StreamKind::Position,
    ];
}

impl std::fmt::Display for StreamKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 输入源配置
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SourceConfig {
    /// 唯一标识符
    #[validate(length(min = 1, message = "source id cannot be empty"))]
    pub id: String,

    /// 输入流类别
    pub kind: StreamKind,

    /// 采样频率 (Hz)，必须 > 0
    #[validate(range(exclusive_min = 0.0, message = "frequency_hz must be > 0"))]
    pub frequency_hz: f64,

    /// 背压满时的丢弃策略
    #[serde(default)]
    pub drop_policy: DropPolicy,
}

/// 背压策略（汇聚通道满时）
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DropPolicy {
    /// 丢弃最新的样本
    #[default]
    DropNewest,
    /// 阻塞源线程直至通道有空位
    Block,
}

/// Sink 输出配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SinkConfig {
    /// Sink 名称
    pub name: String,

    /// Sink 类型
    pub sink_type: SinkType,

    /// 队列容量
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// 类型特定参数
    #[serde(default)]
    pub params: HashMap<String, String>,
}

fn default_queue_capacity() -> usize {
    100
}

/// Sink 类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SinkType {
    /// 日志输出
    Log,
    /// 内存统计
    Stats,
}

impl PipelineBlueprint {
    /// Find the configured source for one of the three streams
    pub fn source_of(&self, kind: StreamKind) -> Option<&SourceConfig> {
        self.sources.iter().find(|source| source.kind == kind)
    }

    /// Count configured sources per stream kind
    pub fn source_count_of(&self, kind: StreamKind) -> usize {
        self.sources
            .iter()
            .filter(|source| source.kind == kind)
            .count()
    }
}
