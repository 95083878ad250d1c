//! 配置解析模块
//!
//! 支持 TOML (主要) 和 JSON (可选) 格式。

use contracts::{ContractError, PipelineBlueprint};

/// 配置文件格式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// TOML 格式 (推荐)
    Toml,
    /// JSON 格式
    Json,
}

impl ConfigFormat {
    /// 从文件扩展名推断格式
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "toml" => Some(Self::Toml),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// 解析 TOML 格式配置
pub fn parse_toml(content: &str) -> Result<PipelineBlueprint, ContractError> {
    toml::from_str(content).map_err(|e| ContractError::ConfigParse {
        message: format!("TOML parse error: {e}"),
        source: Some(Box::new(e)),
    })
}

/// 解析 JSON 格式配置
pub fn parse_json(content: &str) -> Result<PipelineBlueprint, ContractError> {
    serde_json::from_str(content).map_err(|e| ContractError::ConfigParse {
        message: format!("JSON parse error: {e}"),
        source: Some(Box::new(e)),
    })
}

/// 根据格式解析配置
pub fn parse(content: &str, format: ConfigFormat) -> Result<PipelineBlueprint, ContractError> {
    match format {
        ConfigFormat::Toml => parse_toml(content),
        ConfigFormat::Json => parse_json(content),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{StreamKind, WindowPolicy};

    #[test]
    fn test_parse_toml_minimal() {
        let content = r#"
[pipeline]
name = "urban_loop"

[[sources]]
id = "imu_accel"
kind = "acceleration"
frequency_hz = 100.0

[[sources]]
id = "imu_gyro"
kind = "angular_velocity"
frequency_hz = 100.0

[[sources]]
id = "gps_main"
kind = "position"
frequency_hz = 1.0

[aggregator.policy]
mode = "stretch"
min_stretch_length_m = 20.0

[[sinks]]
name = "combined_log"
sink_type = "log"
"#;
        let result = parse_toml(content);
        assert!(result.is_ok(), "Failed: {:?}", result.err());
        let bp = result.unwrap();
        assert_eq!(bp.pipeline.name, "urban_loop");
        assert_eq!(bp.sources.len(), 3);
        assert_eq!(bp.pipeline.channel_capacity, 256);
        assert!(matches!(bp.aggregator.policy, WindowPolicy::Stretch(_)));
    }

    #[test]
    fn test_parse_json_minimal() {
        let content = r#"{
            "pipeline": { "name": "urban_loop" },
            "sources": [
                { "id": "imu_accel", "kind": "acceleration", "frequency_hz": 100.0 },
                { "id": "imu_gyro", "kind": "angular_velocity", "frequency_hz": 100.0 },
                { "id": "gps_main", "kind": "position", "frequency_hz": 1.0 }
            ],
            "aggregator": {
                "policy": { "mode": "time_window", "time_span_ms": 20.0 }
            },
            "sinks": [{ "name": "combined_log", "sink_type": "log" }]
        }"#;
        let result = parse_json(content);
        assert!(result.is_ok(), "Failed: {:?}", result.err());
        let bp = result.unwrap();
        assert_eq!(bp.source_count_of(StreamKind::Position), 1);
    }

    #[test]
    fn test_parse_toml_syntax_error() {
        let content = "invalid toml [[[";
        let result = parse_toml(content);
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert!(matches!(err, ContractError::ConfigParse { .. }));
    }

    #[test]
    fn test_aggregator_section_is_optional() {
        let content = r#"
[pipeline]
name = "bare"

[[sources]]
id = "imu_accel"
kind = "acceleration"
frequency_hz = 100.0
"#;
        let bp = parse_toml(content).unwrap();
        // Missing section falls back to the default time window policy
        assert!(matches!(bp.aggregator.policy, WindowPolicy::TimeWindow(_)));
        assert!(bp.sinks.is_empty());
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(
            ConfigFormat::from_extension("toml"),
            Some(ConfigFormat::Toml)
        );
        assert_eq!(
            ConfigFormat::from_extension("TOML"),
            Some(ConfigFormat::Toml)
        );
        assert_eq!(
            ConfigFormat::from_extension("json"),
            Some(ConfigFormat::Json)
        );
        assert_eq!(ConfigFormat::from_extension("yaml"), None);
    }
}
