//! `info` command implementation.

use anyhow::{Context, Result};
use contracts::WindowPolicy;
use serde::Serialize;
use tracing::info;

use crate::cli::InfoArgs;

/// Configuration info for JSON output
#[derive(Serialize)]
struct ConfigInfo {
    version: String,
    pipeline: PipelineInfo,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    sources: Vec<SourceInfo>,
    aggregator: AggregatorInfo,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    sinks: Vec<SinkInfo>,
}

#[derive(Serialize)]
struct PipelineInfo {
    name: String,
    channel_capacity: usize,
}

#[derive(Serialize)]
struct SourceInfo {
    id: String,
    kind: String,
    frequency_hz: f64,
    drop_policy: String,
}

#[derive(Serialize)]
struct AggregatorInfo {
    policy: String,
    output_capacity: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    min_stretch_length_m: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    time_span_ms: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    time_skip_ms: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_pair_skew_ms: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    position_history_len: Option<usize>,
}

#[derive(Serialize)]
struct SinkInfo {
    name: String,
    sink_type: String,
    queue_capacity: usize,
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration info");

    if !args.config.exists() {
        anyhow::bail!("Configuration file not found: {}", args.config.display());
    }

    let blueprint = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    if args.json {
        let info = build_config_info(&blueprint, args);
        let json =
            serde_json::to_string_pretty(&info).context("Failed to serialize config info")?;
        println!("{}", json);
    } else {
        print_config_info(&blueprint, args);
    }

    Ok(())
}

fn build_config_info(blueprint: &contracts::PipelineBlueprint, args: &InfoArgs) -> ConfigInfo {
    let sources = if args.sources {
        blueprint
            .sources
            .iter()
            .map(|s| SourceInfo {
                id: s.id.clone(),
                kind: s.kind.as_str().to_string(),
                frequency_hz: s.frequency_hz,
                drop_policy: format!("{:?}", s.drop_policy),
            })
            .collect()
    } else {
        Vec::new()
    };

    let aggregator = match &blueprint.aggregator.policy {
        WindowPolicy::Stretch(stretch) => AggregatorInfo {
            policy: "stretch".to_string(),
            output_capacity: blueprint.aggregator.output_capacity,
            min_stretch_length_m: Some(stretch.min_stretch_length_m),
            time_span_ms: None,
            time_skip_ms: None,
            max_pair_skew_ms: None,
            position_history_len: None,
        },
        WindowPolicy::TimeWindow(window) => AggregatorInfo {
            policy: "time_window".to_string(),
            output_capacity: blueprint.aggregator.output_capacity,
            min_stretch_length_m: None,
            time_span_ms: Some(window.time_span_ms),
            time_skip_ms: window.time_skip_ms,
            max_pair_skew_ms: Some(window.max_pair_skew_ms),
            position_history_len: Some(window.position_history_len),
        },
    };

    let sinks = if args.sinks {
        blueprint
            .sinks
            .iter()
            .map(|s| SinkInfo {
                name: s.name.clone(),
                sink_type: format!("{:?}", s.sink_type),
                queue_capacity: s.queue_capacity,
            })
            .collect()
    } else {
        Vec::new()
    };

    ConfigInfo {
        version: format!("{:?}", blueprint.version),
        pipeline: PipelineInfo {
            name: blueprint.pipeline.name.clone(),
            channel_capacity: blueprint.pipeline.channel_capacity,
        },
        sources,
        aggregator,
        sinks,
    }
}

fn print_config_info(blueprint: &contracts::PipelineBlueprint, args: &InfoArgs) {
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║                   Roadsync Configuration                      ║");
    println!("╚══════════════════════════════════════════════════════════════╝\n");

    // Pipeline info
    println!("📍 Pipeline");
    println!("   ├─ Version: {:?}", blueprint.version);
    println!("   ├─ Name: {}", blueprint.pipeline.name);
    println!(
        "   └─ Channel capacity: {}",
        blueprint.pipeline.channel_capacity
    );

    // Sources
    println!("\n📡 Sources ({})", blueprint.sources.len());
    for (i, source) in blueprint.sources.iter().enumerate() {
        let is_last = i == blueprint.sources.len() - 1;
        let prefix = if is_last { "└─" } else { "├─" };

        if args.sources {
            println!(
                "   {} {} ({}, {} Hz, {:?})",
                prefix,
                source.id,
                source.kind.as_str(),
                source.frequency_hz,
                source.drop_policy
            );
        } else {
            println!("   {} {} ({})", prefix, source.id, source.kind.as_str());
        }
    }

    // Aggregator
    println!("\n⚙️  Aggregator");
    match &blueprint.aggregator.policy {
        WindowPolicy::Stretch(stretch) => {
            println!("   ├─ Policy: stretch");
            println!(
                "   ├─ Min stretch length: {} m",
                stretch.min_stretch_length_m
            );
        }
        WindowPolicy::TimeWindow(window) => {
            println!("   ├─ Policy: time_window");
            println!("   ├─ Time span: {} ms", window.time_span_ms);
            match window.time_skip_ms {
                Some(skip) => println!("   ├─ Time skip: {} ms", skip),
                None => println!("   ├─ Time skip: = span"),
            }
            println!("   ├─ Max pair skew: {} ms", window.max_pair_skew_ms);
            println!(
                "   ├─ Position history: {} fixes",
                window.position_history_len
            );
        }
    }
    println!(
        "   └─ Output capacity: {}",
        blueprint.aggregator.output_capacity
    );

    // Sinks
    if !blueprint.sinks.is_empty() {
        println!("\n📤 Sinks ({})", blueprint.sinks.len());
        for (i, sink) in blueprint.sinks.iter().enumerate() {
            let is_last = i == blueprint.sinks.len() - 1;
            let prefix = if is_last { "└─" } else { "├─" };
            if args.sinks {
                println!(
                    "   {} {} ({:?}, queue {})",
                    prefix, sink.name, sink.sink_type, sink.queue_capacity
                );
            } else {
                println!("   {} {} ({:?})", prefix, sink.name, sink.sink_type);
            }
        }
    }

    println!();
}
