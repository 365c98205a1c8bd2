//! easylua Config - Pure configuration data structures
//!
//! This crate contains only data structures, no logic or global state.
//! It serves as the shared configuration vocabulary across all easylua crates.
//!
//! 配置可以直接在代码中构造，也可以从 JSON 读取（缺失字段取默认值）。

use serde::{Deserialize, Serialize};

/// Configuration for a single interpreter state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StateConfig {
    /// Whether to open the interpreter's standard libraries on creation
    pub open_standard_libs: bool,
    /// Stack limits enforced by the marshaller
    pub limits: LimitConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Configuration for stack limits
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitConfig {
    /// 栈上允许的最大槽位数（超过即视为栈溢出）
    pub max_stack_slots: usize,
}

/// Log level, mirrored here so the config crate stays dependency-free
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

/// Configuration for logging
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// 最低输出级别
    pub level: LogLevel,
    /// 是否输出到标准错误
    pub stderr: bool,
    /// 环形缓冲区容量（None 表示不启用）
    pub ring_buffer: Option<usize>,
}

impl StateConfig {
    /// 从 JSON 字符串解析配置
    pub fn from_json(source: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(source)
    }

    /// 序列化为格式化的 JSON 字符串
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

impl LogLevel {
    /// Get the string name of the level
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl Default for StateConfig {
    fn default() -> Self {
        Self {
            open_standard_libs: true,
            limits: LimitConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for LimitConfig {
    fn default() -> Self {
        // 与 Lua 5.4 的 LUAI_MAXSTACK 保持一致
        Self {
            max_stack_slots: 1_000_000,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Warn,
            stderr: false,
            ring_buffer: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_state_config() {
        let cfg = StateConfig::default();
        assert!(cfg.open_standard_libs);
        assert_eq!(cfg.limits.max_stack_slots, 1_000_000);
        assert_eq!(cfg.logging.level, LogLevel::Warn);
        assert!(!cfg.logging.stderr);
        assert_eq!(cfg.logging.ring_buffer, None);
    }

    #[test]
    fn test_from_json_partial() {
        let cfg = StateConfig::from_json(r#"{ "open_standard_libs": false }"#).unwrap();
        assert!(!cfg.open_standard_libs);
        // 缺失字段使用默认值
        assert_eq!(cfg.limits, LimitConfig::default());
        assert_eq!(cfg.logging, LoggingConfig::default());
    }

    #[test]
    fn test_from_json_nested() {
        let cfg = StateConfig::from_json(
            r#"{
                "limits": { "max_stack_slots": 64 },
                "logging": { "level": "debug", "ring_buffer": 128 }
            }"#,
        )
        .unwrap();
        assert_eq!(cfg.limits.max_stack_slots, 64);
        assert_eq!(cfg.logging.level, LogLevel::Debug);
        assert_eq!(cfg.logging.ring_buffer, Some(128));
        assert!(cfg.open_standard_libs);
    }

    #[test]
    fn test_from_json_rejects_unknown_level() {
        let result = StateConfig::from_json(r#"{ "logging": { "level": "loud" } }"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_json_round_trip() {
        let mut cfg = StateConfig::default();
        cfg.logging.level = LogLevel::Trace;
        cfg.limits.max_stack_slots = 200;

        let json = cfg.to_json().unwrap();
        assert!(json.contains("\"trace\""));
        assert_eq!(StateConfig::from_json(&json).unwrap(), cfg);
    }

    #[test]
    fn test_log_level_as_str() {
        assert_eq!(LogLevel::Trace.as_str(), "trace");
        assert_eq!(LogLevel::Error.as_str(), "error");
        assert!(LogLevel::Debug < LogLevel::Warn);
    }
}
