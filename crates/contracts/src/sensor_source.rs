//! SensorSource trait - Sensor data source abstraction
//!
//! Defines a unified interface for push-based sensor streams, decoupling
//! adapters from concrete sensor implementations. Synthetic generators and
//! platform-backed sources are handled through the same API.

use std::sync::Arc;

use crate::{SensorEvent, StreamKind};

/// Sensor event callback type
///
/// When a source produces a sample, it sends it as a `SensorEvent` through
/// this callback. Uses `Arc` to allow callback sharing across contexts.
pub type SensorEventCallback = Arc<dyn Fn(SensorEvent) + Send + Sync>;

/// Sensor data source trait
///
/// Abstracts the common behavior of the three input streams. All sources
/// implement this trait for use by the ingestion pipeline.
///
/// # Example
///
/// ```ignore
/// let source: Box<dyn SensorSource> = build_source();
/// source.listen(Arc::new(|event| {
///     println!("received: {:?}", event.kind());
/// }));
/// // ... consume events ...
/// source.stop();
/// ```
pub trait SensorSource: Send + Sync {
    /// Get source ID
    fn source_id(&self) -> &str;

    /// Which of the three streams this source feeds
    fn kind(&self) -> StreamKind;

    /// Register data callback
    ///
    /// The source invokes the callback once per produced sample, in
    /// production order. If already listening, repeated calls are idempotent
    /// (no second callback gets registered).
    fn listen(&self, callback: SensorEventCallback);

    /// Stop producing
    ///
    /// After return the source stops invoking the callback. Callbacks
    /// already in flight may still land.
    fn stop(&self);

    /// Check if currently listening
    fn is_listening(&self) -> bool;
}
