//! # Ingestion Pipeline
//!
//! Sensor stream ingestion module.
//!
//! Responsibilities:
//! - Register sensor data sources (supports Mock and platform-backed)
//! - Bridge push callbacks into a unified `SensorEvent` stream
//! - Backpressure management and drop policy
//! - Send to downstream via async-channel
//!
//! ## Usage Example
//!
//! ```ignore
//! use ingestion::{IngestionPipeline, BackpressureConfig};
//! use contracts::SensorSource;
//!
//! let mut pipeline = IngestionPipeline::new(100);
//!
//! // Any SensorSource implementation plugs in the same way
//! let source: Box<dyn SensorSource> = platform.accelerometer_source();
//! pipeline.register_source("accel_main".to_string(), source, None)?;
//!
//! pipeline.start_all();
//! let rx = pipeline.take_receiver().unwrap();
//! while let Ok(event) = rx.recv().await {
//!     // Feed the event into the aggregator
//! }
//! ```
//!
//! ## Mock Testing
//!
//! ```ignore
//! use ingestion::MockSensorSource;
//!
//! let source = MockSensorSource::accelerometer("test_accel", 50.0);
//! pipeline.register_source("test_accel".to_string(), Box::new(source), None)?;
//! ```

mod adapter;
mod config;
mod error;
mod generic_adapter;
mod mock;
mod pipeline;

// Re-exports
pub use adapter::StreamAdapter;
pub use config::{BackpressureConfig, DropPolicy, IngestionMetrics, MetricsSnapshot};
pub use contracts::SensorEvent;
pub use error::{IngestionError, Result};
pub use generic_adapter::GenericStreamAdapter;
pub use mock::{MockSensorSource, MockSourceConfig};
pub use pipeline::IngestionPipeline;
