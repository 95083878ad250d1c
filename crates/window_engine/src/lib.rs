//! # Window Engine
//!
//! 三路输入流的窗口聚合引擎。
//!
//! 负责：
//! - Stretch 窗口：按累计行驶里程切分
//! - Time 窗口：按固定节拍配对 accel/gyro
//! - 位置历史回溯（最近墙钟时间匹配）
//! - 输出 `CombinedSample`
//!
//! ## 使用示例
//!
//! ```ignore
//! use window_engine::{AggregatorConfig, AggregatorHandle};
//!
//! let (handle, mut output) = AggregatorHandle::spawn(AggregatorConfig::default());
//!
//! // Push events as they arrive
//! handle.push_event(event);
//!
//! while let Some(sample) = output.recv().await {
//!     // Handle combined sample
//! }
//!
//! handle.dispose().await;
//! ```

mod engine;
mod geo;
mod position_history;
mod stretch;
mod time_window;

pub use engine::AggregatorHandle;
pub use geo::haversine_distance;
pub use position_history::PositionHistory;
pub use stretch::StretchAccumulator;
pub use time_window::TimeWindowAccumulator;

// Re-export contracts types
pub use contracts::{
    AggregatorConfig, CombinedSample, StretchWindowConfig, TimeWindowConfig, WindowPolicy,
};
