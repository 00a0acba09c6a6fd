//! 配置校验模块
//!
//! 校验规则：
//! - host 为合法 IP 地址
//! - poll_interval_ms > 0
//! - stop_timeout_ms >= poll_interval_ms
//! - sink 名称非空且唯一
//! - file sink 必须提供 path 参数

use std::collections::HashSet;

use contracts::{ContractError, SessionSettings, SinkType};

/// 校验 SessionSettings 配置
///
/// 返回第一个遇到的错误，或 Ok(())。
pub fn validate(settings: &SessionSettings) -> Result<(), ContractError> {
    validate_bind_address(settings)?;
    validate_timing(settings)?;
    validate_sinks(settings)?;
    Ok(())
}

/// 校验监听地址
fn validate_bind_address(settings: &SessionSettings) -> Result<(), ContractError> {
    settings.bind_addr().map(|_| ())
}

/// 校验轮询与停止超时
fn validate_timing(settings: &SessionSettings) -> Result<(), ContractError> {
    if settings.poll_interval_ms == 0 {
        return Err(ContractError::config_validation(
            "poll_interval_ms",
            "poll_interval_ms must be > 0",
        ));
    }

    // 停止等待至少覆盖一个轮询周期
    if settings.stop_timeout_ms < settings.poll_interval_ms {
        return Err(ContractError::config_validation(
            "stop_timeout_ms / poll_interval_ms",
            format!(
                "stop_timeout_ms ({}) must be >= poll_interval_ms ({})",
                settings.stop_timeout_ms, settings.poll_interval_ms
            ),
        ));
    }

    Ok(())
}

/// 校验 sink 配置
fn validate_sinks(settings: &SessionSettings) -> Result<(), ContractError> {
    let mut seen = HashSet::new();
    for (idx, sink) in settings.sinks.iter().enumerate() {
        if sink.name.is_empty() {
            return Err(ContractError::config_validation(
                format!("sinks[{}].name", idx),
                "sink name cannot be empty",
            ));
        }
        if !seen.insert(&sink.name) {
            return Err(ContractError::config_validation(
                format!("sinks[name={}]", sink.name),
                "duplicate sink name",
            ));
        }
        if sink.queue_capacity == 0 {
            return Err(ContractError::config_validation(
                format!("sinks[{}].queue_capacity", sink.name),
                "queue_capacity must be > 0",
            ));
        }
        if sink.sink_type == SinkType::File && !sink.params.contains_key("path") {
            return Err(ContractError::config_validation(
                format!("sinks[{}].params.path", sink.name),
                "file sink requires a 'path' parameter",
            ));
        }
    }
    Ok(())
}
