//! Pipeline statistics and metrics.

use std::time::Duration;

use observability::CombinedMetricsAggregator;

/// Statistics from a pipeline run
#[derive(Debug, Clone, Default)]
pub struct PipelineStats {
    /// Total combined samples produced
    pub samples_combined: u64,

    /// Total sensor events received from sources
    pub events_received: u64,

    /// Total sensor events dropped under ingestion backpressure
    pub events_dropped: u64,

    /// Total duration of the pipeline run
    pub duration: Duration,

    /// Number of sources that were active
    pub active_sources: usize,

    /// Number of sinks that received data
    pub active_sinks: usize,

    /// Combined stream metrics aggregator
    pub combined_metrics: CombinedMetricsAggregator,
}

impl PipelineStats {
    /// Calculate combined samples per second throughput
    pub fn samples_per_second(&self) -> f64 {
        if self.duration.as_secs_f64() > 0.0 {
            self.samples_combined as f64 / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }

    /// Calculate ingestion drop rate as percentage
    #[allow(dead_code)]
    pub fn drop_rate(&self) -> f64 {
        let total = self.events_received + self.events_dropped;
        if total > 0 {
            (self.events_dropped as f64 / total as f64) * 100.0
        } else {
            0.0
        }
    }

    /// Print detailed summary
    pub fn print_summary(&self) {
        println!("\n╔══════════════════════════════════════════════════════════════╗");
        println!("║                    Pipeline Statistics                        ║");
        println!("╚══════════════════════════════════════════════════════════════╝\n");

        println!("📊 Overview");
        println!("   ├─ Duration: {:.2}s", self.duration.as_secs_f64());
        println!("   ├─ Combined samples: {}", self.samples_combined);
        println!("   ├─ Events received: {}", self.events_received);
        println!("   ├─ Events dropped: {}", self.events_dropped);
        println!("   ├─ Samples/s: {:.2}", self.samples_per_second());
        println!("   ├─ Active sources: {}", self.active_sources);
        println!("   └─ Active sinks: {}", self.active_sinks);

        let summary = self.combined_metrics.summary();

        println!("\n📈 Combined Stream Metrics");
        println!(
            "   ├─ Silent samples: {} ({:.2}%)",
            summary.silent_samples, summary.silent_rate
        );
        println!(
            "   ├─ Samples with position: {} ({:.2}%)",
            summary.samples_with_position, summary.position_rate
        );
        println!("   ├─ Total distance (m): {:.1}", summary.total_distance_m);
        println!("   ├─ Motion samples per window: {}", summary.motion_per_window);
        println!("   ├─ Stretch distance (m): {}", summary.distance_m);
        println!("   └─ Emit interval (ms): {}", summary.emit_interval_ms);

        println!();
    }
}
