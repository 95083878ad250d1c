//! 流适配器 trait

use std::sync::Arc;

use async_channel::{Sender, TrySendError};
use contracts::{DropPolicy, SensorEvent, StreamKind};
use tracing::trace;

use crate::config::IngestionMetrics;

/// 流适配器 trait
///
/// 每路输入流实现此 trait，负责：
/// 1. 注册数据源回调
/// 2. 将样本封装为 `SensorEvent`
/// 3. 发送到汇聚通道（处理背压）
pub trait StreamAdapter: Send + Sync {
    /// 获取源 ID
    fn source_id(&self) -> &str;

    /// 获取流类别
    fn kind(&self) -> StreamKind;

    /// 启动数据采集
    ///
    /// # Arguments
    /// * `tx` - 事件发送通道
    /// * `metrics` - 共享的 ingestion 指标
    fn start(&self, tx: Sender<SensorEvent>, metrics: Arc<IngestionMetrics>);

    /// 停止数据采集
    fn stop(&self);

    /// 检查是否正在监听
    fn is_listening(&self) -> bool;
}

/// Send event, handling backpressure policy
#[inline]
pub(crate) fn send_event(
    tx: &Sender<SensorEvent>,
    event: SensorEvent,
    metrics: &Arc<IngestionMetrics>,
    source_id: &str,
    drop_policy: DropPolicy,
) {
    match tx.try_send(event) {
        Ok(()) => {
            metrics.update_queue_len(tx.len());
            trace!(source_id = %source_id, "event sent");
        }
        Err(TrySendError::Full(event)) => match drop_policy {
            DropPolicy::DropNewest => {
                metrics.record_dropped();
                trace!(source_id = %source_id, kind = %event.kind(), "event dropped (channel full)");
            }
            DropPolicy::Block => {
                // Callbacks run on the source's own thread, never inside the async runtime
                if tx.send_blocking(event).is_ok() {
                    metrics.update_queue_len(tx.len());
                    trace!(source_id = %source_id, "event sent after blocking");
                } else {
                    tracing::warn!(source_id = %source_id, "channel closed");
                }
            }
        },
        Err(TrySendError::Closed(_)) => {
            tracing::warn!(source_id = %source_id, "channel closed");
        }
    }
}
