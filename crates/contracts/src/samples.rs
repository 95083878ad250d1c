//! SensorEvent - Ingestion 输出
//!
//! 三路输入流的原始样本结构。

use serde::{Deserialize, Serialize};

use crate::StreamKind;

/// 线性加速度样本 (m/s²)
///
/// 时间戳来自传感器时钟：设备启动以来的单调纳秒数。
/// 与位置时间戳（epoch 毫秒）不可直接比较。
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AccelerationSample {
    /// X 轴加速度 (m/s²)
    pub x: f32,

    /// Y 轴加速度 (m/s²)
    pub y: f32,

    /// Z 轴加速度 (m/s²)
    pub z: f32,

    /// 传感器时钟时间戳（单调纳秒）
    pub timestamp_nanos: i64,
}

/// 角速度样本 (rad/s)
///
/// 与 [`AccelerationSample`] 共享传感器时钟。
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AngularVelocitySample {
    /// 绕 X 轴角速度 (rad/s)
    pub x: f32,

    /// 绕 Y 轴角速度 (rad/s)
    pub y: f32,

    /// 绕 Z 轴角速度 (rad/s)
    pub z: f32,

    /// 传感器时钟时间戳（单调纳秒）
    pub timestamp_nanos: i64,
}

/// 定位样本
///
/// 时间戳为墙钟 epoch 毫秒，与运动样本的传感器时钟不同源。
/// 字段不做校验：NaN 或负 accuracy 原样透传。
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PositionFix {
    /// 纬度（度）
    pub latitude: f64,

    /// 经度（度）
    pub longitude: f64,

    /// 水平精度估计（米）
    pub accuracy: f32,

    /// 地速 (m/s)
    pub speed: f32,

    /// 墙钟时间戳（epoch 毫秒）
    pub timestamp_millis: i64,
}

/// 传感器事件
///
/// ingestion 层的统一线缆类型，三路流在一个通道上复用。
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum SensorEvent {
    /// 加速度计样本
    Acceleration(AccelerationSample),

    /// 陀螺仪样本
    AngularVelocity(AngularVelocitySample),

    /// 定位样本
    Position(PositionFix),
}

impl SensorEvent {
    /// 事件所属的流
    #[inline]
    pub fn kind(&self) -> StreamKind {
        match self {
            SensorEvent::Acceleration(_) => StreamKind::Acceleration,
            SensorEvent::AngularVelocity(_) => StreamKind::AngularVelocity,
            SensorEvent::Position(_) => StreamKind::Position,
        }
    }
}
