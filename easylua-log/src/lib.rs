//! easylua-log - 结构化日志系统
//!
//! 为 easylua 的栈编组与引用管理设计的轻量日志：
//! - **显式传递**：没有全局 logger，`Arc<Logger>` 随 `StateView` 一起传递
//! - **惰性格式化**：级别未启用时宏不会格式化消息
//! - **可转储**：环形缓冲区保留最近 N 条记录，测试中用来断言日志输出
//!
//! # 快速开始
//!
//! ```
//! use easylua_log::{LogConfig, Level, debug};
//!
//! let (logger, ring) = LogConfig::new(Level::Debug).with_ring_buffer(100).init();
//! debug!(logger, "state opened");
//! assert_eq!(ring.unwrap().len(), 1);
//! ```

mod config;
mod logger;
mod macros;
mod record;
mod ring_buffer;
mod span;

pub use config::{LogConfig, OutputConfig};
pub use logger::{LogSink, Logger, SpanGuard, StderrSink, StdoutSink};
pub use record::{Level, Record};
pub use ring_buffer::{LogRingBuffer, RingBufferStats};
pub use span::{Span, SpanId};

// 宏通过 #[macro_export] 自动导出到 crate 根：
// trace!, debug!, info!, warn!, error!, log!
