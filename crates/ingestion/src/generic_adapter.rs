//! 通用流适配器
//!
//! 基于 `SensorSource` trait 的统一适配器实现。
//! 让 IngestionPipeline 以统一方式处理 Mock 与平台数据源。

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_channel::Sender;
use contracts::{SensorEvent, SensorEventCallback, SensorSource, StreamKind};
use tracing::{debug, trace};

use crate::adapter::{send_event, StreamAdapter};
use crate::config::{BackpressureConfig, IngestionMetrics};

/// 通用流适配器
///
/// 将 `SensorSource` trait 适配为 `StreamAdapter`。
/// 数据源与汇聚通道之间的唯一桥梁。
pub struct GenericStreamAdapter {
    source_id: String,
    source: Box<dyn SensorSource>,
    config: BackpressureConfig,
    listening: Arc<AtomicBool>,
}

impl GenericStreamAdapter {
    /// 创建新的通用适配器
    pub fn new(source_id: String, source: Box<dyn SensorSource>, config: BackpressureConfig) -> Self {
        Self {
            source_id,
            source,
            config,
            listening: Arc::new(AtomicBool::new(false)),
        }
    }
}

impl StreamAdapter for GenericStreamAdapter {
    fn source_id(&self) -> &str {
        &self.source_id
    }

    fn kind(&self) -> StreamKind {
        self.source.kind()
    }

    fn start(&self, tx: Sender<SensorEvent>, metrics: Arc<IngestionMetrics>) {
        if self.listening.swap(true, Ordering::SeqCst) {
            return;
        }

        let source_id = self.source_id.clone();
        let drop_policy = self.config.drop_policy;
        let listening = self.listening.clone();

        debug!(source_id = %source_id, kind = %self.kind(), "starting stream adapter");

        let callback: SensorEventCallback = Arc::new(move |event| {
            if !listening.load(Ordering::Relaxed) {
                return;
            }

            metrics.record_received();
            trace!(source_id = %source_id, "stream adapter received event");
            send_event(&tx, event, &metrics, &source_id, drop_policy);
        });

        self.source.listen(callback);
    }

    fn stop(&self) {
        if self.listening.swap(false, Ordering::SeqCst) {
            debug!(source_id = %self.source_id, "stopping stream adapter");
            self.source.stop();
        }
    }

    fn is_listening(&self) -> bool {
        self.listening.load(Ordering::Relaxed)
    }
}
