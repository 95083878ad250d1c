//! 配置校验模块
//!
//! 校验规则：
//! - 字段级约束 (derive 校验：pipeline.name 非空、source id 非空、frequency_hz > 0)
//! - source id 全局唯一
//! - 三类输入流各恰好一个源
//! - 聚合器窗口参数合法
//! - sink 名称非空且唯一

use std::collections::HashSet;

use contracts::{ContractError, PipelineBlueprint, StreamKind, WindowPolicy};
use validator::{Validate, ValidationErrors, ValidationErrorsKind};

/// 校验 PipelineBlueprint 配置
///
/// 返回第一个遇到的错误，或 Ok(())。
pub fn validate(blueprint: &PipelineBlueprint) -> Result<(), ContractError> {
    validate_fields(blueprint)?;
    validate_source_ids(blueprint)?;
    validate_stream_coverage(blueprint)?;
    validate_aggregator(blueprint)?;
    validate_sinks(blueprint)?;
    Ok(())
}

/// 字段级 derive 校验
fn validate_fields(blueprint: &PipelineBlueprint) -> Result<(), ContractError> {
    blueprint
        .validate()
        .map_err(|errors| match first_error("", &errors) {
            Some((field, message)) => ContractError::config_validation(field, message),
            None => ContractError::config_validation("blueprint", "validation failed"),
        })
}

/// 深度优先取第一条 derive 校验错误
fn first_error(prefix: &str, errors: &ValidationErrors) -> Option<(String, String)> {
    for (field, kind) in errors.errors() {
        let path = if prefix.is_empty() {
            field.to_string()
        } else {
            format!("{prefix}.{field}")
        };

        match kind {
            ValidationErrorsKind::Field(list) => {
                if let Some(error) = list.first() {
                    let message = error
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| error.code.to_string());
                    return Some((path, message));
                }
            }
            ValidationErrorsKind::Struct(nested) => {
                if let Some(found) = first_error(&path, nested) {
                    return Some(found);
                }
            }
            ValidationErrorsKind::List(items) => {
                for (index, nested) in items {
                    if let Some(found) = first_error(&format!("{path}[{index}]"), nested) {
                        return Some(found);
                    }
                }
            }
        }
    }
    None
}

/// 校验 source id 唯一性 (全局)
fn validate_source_ids(blueprint: &PipelineBlueprint) -> Result<(), ContractError> {
    let mut seen = HashSet::new();
    for source in &blueprint.sources {
        if !seen.insert(&source.id) {
            return Err(ContractError::config_validation(
                format!("sources[id={}]", source.id),
                "duplicate source id",
            ));
        }
    }
    Ok(())
}

/// 校验流覆盖：三类输入流各恰好一个源
fn validate_stream_coverage(blueprint: &PipelineBlueprint) -> Result<(), ContractError> {
    for kind in StreamKind::ALL {
        match blueprint.source_count_of(kind) {
            0 => {
                return Err(ContractError::config_validation(
                    "sources",
                    format!("no source configured for stream '{kind}'"),
                ));
            }
            1 => {}
            n => {
                return Err(ContractError::config_validation(
                    "sources",
                    format!("stream '{kind}' configured {n} times, expected exactly one"),
                ));
            }
        }
    }
    Ok(())
}

/// 校验聚合器参数
fn validate_aggregator(blueprint: &PipelineBlueprint) -> Result<(), ContractError> {
    let aggregator = &blueprint.aggregator;

    if aggregator.output_capacity == 0 {
        return Err(ContractError::config_validation(
            "aggregator.output_capacity",
            "output_capacity must be >= 1",
        ));
    }

    match &aggregator.policy {
        WindowPolicy::Stretch(config) => {
            // `!(x >= 0.0)` also rejects NaN
            if !(config.min_stretch_length_m >= 0.0) {
                return Err(ContractError::config_validation(
                    "aggregator.policy.min_stretch_length_m",
                    format!(
                        "min_stretch_length_m must be >= 0, got {}",
                        config.min_stretch_length_m
                    ),
                ));
            }
        }
        WindowPolicy::TimeWindow(config) => {
            if !(config.time_span_ms > 0.0) {
                return Err(ContractError::config_validation(
                    "aggregator.policy.time_span_ms",
                    format!("time_span_ms must be > 0, got {}", config.time_span_ms),
                ));
            }
            if let Some(skip) = config.time_skip_ms {
                if !(skip > 0.0) {
                    return Err(ContractError::config_validation(
                        "aggregator.policy.time_skip_ms",
                        format!("time_skip_ms must be > 0, got {skip}"),
                    ));
                }
            }
            if !(config.max_pair_skew_ms >= 0.0) {
                return Err(ContractError::config_validation(
                    "aggregator.policy.max_pair_skew_ms",
                    format!(
                        "max_pair_skew_ms must be >= 0, got {}",
                        config.max_pair_skew_ms
                    ),
                ));
            }
            if config.position_history_len == 0 {
                return Err(ContractError::config_validation(
                    "aggregator.policy.position_history_len",
                    "position_history_len must be >= 1",
                ));
            }
        }
    }

    Ok(())
}

/// 校验 sink 配置
fn validate_sinks(blueprint: &PipelineBlueprint) -> Result<(), ContractError> {
    let mut seen = HashSet::new();
    for (idx, sink) in blueprint.sinks.iter().enumerate() {
        if sink.name.is_empty() {
            return Err(ContractError::config_validation(
                format!("sinks[{idx}].name"),
                "sink name cannot be empty",
            ));
        }
        if !seen.insert(&sink.name) {
            return Err(ContractError::config_validation(
                format!("sinks[{idx}].name"),
                format!("duplicate sink name '{}'", sink.name),
            ));
        }
    }
    Ok(())
}
