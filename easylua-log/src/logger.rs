//! 日志器实现

use crate::record::{Level, Record};
use crate::span::{Span, SpanId};
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

/// 日志输出目标trait
pub trait LogSink: Send + Sync {
    fn write(&self, record: &Record);
}

/// 日志器配置和状态
pub struct Logger {
    /// 当前日志级别（原子存储）
    level: AtomicU8,
    sinks: Mutex<Vec<Box<dyn LogSink>>>,
    /// Span栈（用于跟踪嵌套调用）
    span_stack: Mutex<Vec<Span>>,
    next_span_id: AtomicU64,
}

/// 锁中毒时继续使用内部数据：日志不应该让调用方 panic
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl Logger {
    pub fn new(level: Level) -> Arc<Self> {
        Arc::new(Logger {
            level: AtomicU8::new(level as u8),
            sinks: Mutex::new(Vec::new()),
            span_stack: Mutex::new(Vec::new()),
            next_span_id: AtomicU64::new(1),
        })
    }

    /// 添加输出目标（构建器风格）
    pub fn with_sink<S: LogSink + 'static>(self: Arc<Self>, sink: S) -> Arc<Self> {
        self.add_sink(sink);
        self
    }

    /// 添加输出目标
    pub fn add_sink<S: LogSink + 'static>(&self, sink: S) {
        lock(&self.sinks).push(Box::new(sink));
    }

    /// 动态设置日志级别
    pub fn set_level(&self, level: Level) {
        self.level.store(level as u8, Ordering::Relaxed);
    }

    pub fn level(&self) -> Level {
        Level::from_u8(self.level.load(Ordering::Relaxed)).unwrap_or(Level::Info)
    }

    /// 检查指定级别是否启用
    pub fn is_enabled(&self, level: Level) -> bool {
        level >= self.level()
    }

    /// 记录日志（宏的落点）
    #[inline(never)]
    pub fn log(&self, level: Level, target: &'static str, message: impl Into<String>) {
        if !self.is_enabled(level) {
            return;
        }

        let mut record = Record::new(level, target, message);

        if let Some(span) = lock(&self.span_stack).last() {
            record = record.with_span(span.id.0);
        }

        for sink in lock(&self.sinks).iter() {
            sink.write(&record);
        }
    }

    /// 进入一个新的span，返回守卫对象
    pub fn enter_span(self: &Arc<Self>, name: &'static str) -> SpanGuard {
        let id = SpanId(self.next_span_id.fetch_add(1, Ordering::Relaxed));
        lock(&self.span_stack).push(Span::new(id, name));

        SpanGuard {
            logger: Arc::clone(self),
        }
    }

    pub fn span_depth(&self) -> usize {
        lock(&self.span_stack).len()
    }

    /// 当前最内层 span 的名称
    pub fn current_span(&self) -> Option<&'static str> {
        lock(&self.span_stack).last().map(|span| span.name)
    }

    /// 创建不输出任何内容的日志器（Error 级别且没有 sink）
    pub fn noop() -> Arc<Self> {
        Self::new(Level::Error)
    }
}

impl std::fmt::Debug for Logger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Logger")
            .field("level", &self.level())
            .field("sinks", &lock(&self.sinks).len())
            .field("span_depth", &self.span_depth())
            .finish()
    }
}

/// Span守卫，退出时自动弹出span栈
pub struct SpanGuard {
    logger: Arc<Logger>,
}

impl Drop for SpanGuard {
    fn drop(&mut self) {
        lock(&self.logger.span_stack).pop();
    }
}

// 为Arc<Logger>实现LogSink，支持链式日志器
impl LogSink for Arc<Logger> {
    fn write(&self, record: &Record) {
        self.log(record.level, record.target, record.message.clone());
    }
}

/// 标准输出sink
pub struct StdoutSink;

impl LogSink for StdoutSink {
    fn write(&self, record: &Record) {
        println!("{}", record.format());
    }
}

/// 标准错误sink
pub struct StderrSink;

impl LogSink for StderrSink {
    fn write(&self, record: &Record) {
        eprintln!("{}", record.format());
    }
}
