//! 状态创建选项
//!
//! 包含创建选项 StateOptions 和进程级默认值（供 `State::new()` 使用）

use crate::error::{Error, Result};
use easylua_config::{LogLevel, LoggingConfig, StateConfig};
use easylua_log::{Level, LogConfig, LogRingBuffer, Logger};
use once_cell::sync::OnceCell;
use std::sync::Arc;

/// Options used to create a `State`
#[derive(Clone)]
pub struct StateOptions {
    /// Pure configuration data
    pub config: StateConfig,
    /// Logger shared by every view of the state
    pub logger: Arc<Logger>,
    /// Ring buffer attached to the logger, if the configuration asked for one
    pub ring_buffer: Option<Arc<LogRingBuffer>>,
}

impl std::fmt::Debug for StateOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateOptions")
            .field("config", &self.config)
            .field("ring_buffer", &self.ring_buffer.is_some())
            .finish()
    }
}

impl Default for StateOptions {
    /// 默认配置：日志器级别与 `config.logging` 一致，没有输出目标
    fn default() -> Self {
        Self::from_config(StateConfig::default())
    }
}

impl StateOptions {
    /// 按配置构建日志器
    pub fn from_config(config: StateConfig) -> Self {
        let (logger, ring_buffer) = log_config(&config.logging).init();
        Self {
            config,
            logger,
            ring_buffer,
        }
    }

    pub fn with_logger(mut self, logger: Arc<Logger>) -> Self {
        self.logger = logger;
        self.ring_buffer = None;
        self
    }
}

fn log_config(logging: &LoggingConfig) -> LogConfig {
    let mut config = LogConfig::new(level(logging.level));
    if logging.stderr {
        config = config.with_stderr();
    }
    if let Some(capacity) = logging.ring_buffer {
        config = config.with_ring_buffer(capacity);
    }
    config
}

/// 配置层的级别 -> 日志器级别
pub fn level(level: LogLevel) -> Level {
    match level {
        LogLevel::Trace => Level::Trace,
        LogLevel::Debug => Level::Debug,
        LogLevel::Info => Level::Info,
        LogLevel::Warn => Level::Warn,
        LogLevel::Error => Level::Error,
    }
}

// Process-wide defaults for State::new()
static DEFAULTS: OnceCell<StateOptions> = OnceCell::new();

/// Initialize process-wide defaults (only the first call wins)
pub fn init_defaults(options: StateOptions) -> Result<()> {
    DEFAULTS.set(options).map_err(|_| {
        Error::invalid_argument("options", "default state options are already initialized")
    })
}

/// Get process-wide defaults, if initialized
pub fn defaults() -> Option<&'static StateOptions> {
    DEFAULTS.get()
}

/// Check if defaults are initialized
pub fn is_initialized() -> bool {
    DEFAULTS.get().is_some()
}
