//! `run` command implementation.

use anyhow::{Context, Result};
use std::time::Duration;
use tracing::{info, warn};

use crate::cli::RunArgs;
use crate::pipeline::{Pipeline, PipelineConfig};

/// Execute the `run` command
pub async fn run_pipeline(args: &RunArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration");

    // Validate config path
    if !args.config.exists() {
        anyhow::bail!("Configuration file not found: {}", args.config.display());
    }

    // Load and parse configuration
    let blueprint = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    info!(
        pipeline = %blueprint.pipeline.name,
        policy = blueprint.aggregator.policy.name(),
        sources = blueprint.sources.len(),
        sinks = blueprint.sinks.len(),
        "Configuration loaded"
    );

    // Dry run - just validate and exit
    if args.dry_run {
        info!("Dry run mode - configuration is valid, exiting");
        print_config_summary(&blueprint);
        return Ok(());
    }

    // Build pipeline configuration
    let pipeline_config = PipelineConfig {
        blueprint,
        max_samples: if args.max_samples == 0 {
            None
        } else {
            Some(args.max_samples)
        },
        timeout: if args.timeout == 0 {
            None
        } else {
            Some(Duration::from_secs(args.timeout))
        },
        metrics_port: if args.metrics_port == 0 {
            None
        } else {
            Some(args.metrics_port)
        },
    };

    // Create and run pipeline
    let pipeline = Pipeline::new(pipeline_config);

    // Setup graceful shutdown handler
    let shutdown_signal = setup_shutdown_signal();

    info!("Starting pipeline...");

    // Run pipeline with shutdown signal
    tokio::select! {
        result = pipeline.run() => {
            match result {
                Ok(stats) => {
                    info!(
                        samples_combined = stats.samples_combined,
                        events_received = stats.events_received,
                        duration_secs = stats.duration.as_secs_f64(),
                        sps = format!("{:.2}", stats.samples_per_second()),
                        "Pipeline completed successfully"
                    );

                    // Print detailed statistics
                    stats.print_summary();
                }
                Err(e) => {
                    return Err(e).context("Pipeline execution failed");
                }
            }
        }
        _ = shutdown_signal => {
            warn!("Received shutdown signal, stopping pipeline...");
        }
    }

    info!("Roadsync finished");
    Ok(())
}

/// Setup Ctrl+C and SIGTERM signal handlers
async fn setup_shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// Print configuration summary for dry-run mode
fn print_config_summary(blueprint: &contracts::PipelineBlueprint) {
    use contracts::WindowPolicy;

    println!("\n=== Configuration Summary ===\n");
    println!("Pipeline:");
    println!("  Name: {}", blueprint.pipeline.name);
    println!("  Channel capacity: {}", blueprint.pipeline.channel_capacity);

    println!("\nSources ({}):", blueprint.sources.len());
    for source in &blueprint.sources {
        println!(
            "  - {} ({}) @ {} Hz",
            source.id,
            source.kind.as_str(),
            source.frequency_hz
        );
    }

    println!("\nAggregator:");
    println!("  Policy: {}", blueprint.aggregator.policy.name());
    match &blueprint.aggregator.policy {
        WindowPolicy::Stretch(stretch) => {
            println!("  Min stretch length: {} m", stretch.min_stretch_length_m);
        }
        WindowPolicy::TimeWindow(window) => {
            println!("  Time span: {} ms", window.time_span_ms);
            match window.time_skip_ms {
                Some(skip) => println!("  Time skip: {} ms", skip),
                None => println!("  Time skip: = span (back-to-back windows)"),
            }
            println!("  Max pair skew: {} ms", window.max_pair_skew_ms);
            println!("  Position history: {} fixes", window.position_history_len);
        }
    }
    println!("  Output capacity: {}", blueprint.aggregator.output_capacity);

    if !blueprint.sinks.is_empty() {
        println!("\nSinks ({}):", blueprint.sinks.len());
        for sink in &blueprint.sinks {
            println!("  - {} ({:?})", sink.name, sink.sink_type);
        }
    }

    println!();
}
