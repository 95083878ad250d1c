//! Pipeline orchestration: blueprint in, combined samples out.

mod orchestrator;
mod stats;

pub use orchestrator::{Pipeline, PipelineConfig};
pub use stats::PipelineStats;
