//! # Contracts
//!
//! Frozen interface contracts (ICD), defining inter-module data structures and traits.
//! All business crates can only depend on this crate, reverse dependencies are prohibited.
//!
//! ## Time Model
//! - Motion samples (acceleration / angular velocity) carry a monotonic clock (nanoseconds, i64)
//! - Position fixes carry wall-clock time (epoch milliseconds, i64)
//! - The two clocks are never compared directly; pairing across them is nearest-in-time
//!   at the moment of emission

mod aggregator_config;
mod blueprint;
mod combined;
mod error;
mod samples;
mod sensor_source;
mod sink;

pub use aggregator_config::*;
pub use blueprint::*;
pub use combined::*;
pub use error::*;
pub use samples::*;
pub use sensor_source::{SensorEventCallback, SensorSource};
pub use sink::*;
