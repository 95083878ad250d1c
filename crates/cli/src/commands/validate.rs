//! `validate` command implementation.

use anyhow::{Context, Result};
use contracts::{DropPolicy, WindowPolicy};
use serde::Serialize;
use tracing::info;

use crate::cli::ValidateArgs;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warnings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ConfigSummary>,
}

#[derive(Serialize)]
struct ConfigSummary {
    version: String,
    pipeline: String,
    policy: String,
    source_count: usize,
    sink_count: usize,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.display(), "Validating configuration");

    let result = validate_config(args);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{}", json);
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        anyhow::bail!("Configuration validation failed")
    }
}

fn validate_config(args: &ValidateArgs) -> ValidationResult {
    let config_path = args.config.display().to_string();

    // Check file exists
    if !args.config.exists() {
        return ValidationResult {
            valid: false,
            config_path,
            error: Some(format!("File not found: {}", args.config.display())),
            warnings: None,
            summary: None,
        };
    }

    // Try to load and validate
    match config_loader::ConfigLoader::load_from_path(&args.config) {
        Ok(blueprint) => {
            let warnings = collect_warnings(&blueprint);

            ValidationResult {
                valid: true,
                config_path,
                error: None,
                warnings: if warnings.is_empty() {
                    None
                } else {
                    Some(warnings)
                },
                summary: Some(ConfigSummary {
                    version: format!("{:?}", blueprint.version),
                    pipeline: blueprint.pipeline.name.clone(),
                    policy: blueprint.aggregator.policy.name().to_string(),
                    source_count: blueprint.sources.len(),
                    sink_count: blueprint.sinks.len(),
                }),
            }
        }
        Err(e) => ValidationResult {
            valid: false,
            config_path,
            error: Some(e.to_string()),
            warnings: None,
            summary: None,
        },
    }
}

/// Collect configuration warnings (non-fatal issues)
fn collect_warnings(blueprint: &contracts::PipelineBlueprint) -> Vec<String> {
    let mut warnings = Vec::new();

    // Check for empty sinks
    if blueprint.sinks.is_empty() {
        warnings.push("No sinks configured - combined samples will be dropped".to_string());
    }

    // Gap windows silently discard pairs that arrive between emissions
    if let WindowPolicy::TimeWindow(ref window) = blueprint.aggregator.policy {
        if let Some(skip) = window.time_skip_ms {
            if skip > window.time_span_ms {
                warnings.push(format!(
                    "time_skip_ms ({}) exceeds time_span_ms ({}) - pairs arriving between windows will be dropped",
                    skip, window.time_span_ms
                ));
            }
        }
    }

    // Blocking backpressure stalls the sensor thread when the channel fills
    for source in &blueprint.sources {
        if source.drop_policy == DropPolicy::Block {
            warnings.push(format!(
                "Source '{}' uses blocking backpressure - a full channel will stall its sensor thread",
                source.id
            ));
        }
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Configuration is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Version: {}", summary.version);
            println!("  Pipeline: {}", summary.pipeline);
            println!("  Policy: {}", summary.policy);
            println!("  Sources: {}", summary.source_count);
            println!("  Sinks: {}", summary.sink_count);
        }

        if let Some(ref warnings) = result.warnings {
            println!("\n⚠ Warnings:");
            for warning in warnings {
                println!("  - {}", warning);
            }
        }
    } else {
        println!("✗ Configuration is invalid: {}", result.config_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {}", error);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;
    use crate::cli::ValidateArgs;

    fn args_for(path: &std::path::Path, json: bool) -> ValidateArgs {
        ValidateArgs {
            config: path.to_path_buf(),
            json,
        }
    }

    #[test]
    fn test_valid_config_passes() {
        let mut file = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .unwrap();
        write!(
            file,
            r#"
            [pipeline]
            name = "validate_test"

            [[sources]]
            id = "accel_main"
            kind = "acceleration"
            frequency_hz = 100.0

            [[sources]]
            id = "gyro_main"
            kind = "angular_velocity"
            frequency_hz = 100.0

            [[sources]]
            id = "gps_main"
            kind = "position"
            frequency_hz = 1.0

            [aggregator.policy]
            mode = "time_window"
            time_span_ms = 20.0
            "#
        )
        .unwrap();

        let result = validate_config(&args_for(file.path(), false));
        assert!(result.valid, "expected valid config: {:?}", result.error);

        let summary = result.summary.unwrap();
        assert_eq!(summary.pipeline, "validate_test");
        assert_eq!(summary.policy, "time_window");
        assert_eq!(summary.source_count, 3);
        assert_eq!(summary.sink_count, 0);

        // No sinks configured should surface as a warning
        let warnings = result.warnings.unwrap();
        assert!(warnings.iter().any(|w| w.contains("No sinks")));
    }

    #[test]
    fn test_missing_file_fails() {
        let result = validate_config(&args_for(
            std::path::Path::new("/nonexistent/roadsync.toml"),
            false,
        ));
        assert!(!result.valid);
        assert!(result.error.unwrap().contains("File not found"));
    }

    #[test]
    fn test_invalid_config_reports_error() {
        let mut file = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .unwrap();
        // Duplicate source ids are rejected by the validator
        write!(
            file,
            r#"
            [pipeline]
            name = "dup_test"

            [[sources]]
            id = "accel_main"
            kind = "acceleration"
            frequency_hz = 100.0

            [[sources]]
            id = "accel_main"
            kind = "angular_velocity"
            frequency_hz = 100.0

            [[sources]]
            id = "gps_main"
            kind = "position"
            frequency_hz = 1.0
            "#
        )
        .unwrap();

        let result = validate_config(&args_for(file.path(), false));
        assert!(!result.valid);
        assert!(result.error.is_some());
    }

    #[test]
    fn test_gap_window_warns() {
        let mut file = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .unwrap();
        write!(
            file,
            r#"
            [pipeline]
            name = "gap_test"

            [[sources]]
            id = "accel_main"
            kind = "acceleration"
            frequency_hz = 100.0

            [[sources]]
            id = "gyro_main"
            kind = "angular_velocity"
            frequency_hz = 100.0

            [[sources]]
            id = "gps_main"
            kind = "position"
            frequency_hz = 1.0

            [aggregator.policy]
            mode = "time_window"
            time_span_ms = 20.0
            time_skip_ms = 40.0

            [[sinks]]
            name = "log_main"
            sink_type = "log"
            "#
        )
        .unwrap();

        let result = validate_config(&args_for(file.path(), false));
        assert!(result.valid);
        let warnings = result.warnings.unwrap();
        assert!(warnings.iter().any(|w| w.contains("time_skip_ms")));
    }
}
