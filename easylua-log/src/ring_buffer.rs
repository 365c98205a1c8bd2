//! 日志专用环形缓冲区

use crate::logger::LogSink;
use crate::record::Record;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

/// 环形缓冲区统计信息
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct RingBufferStats {
    pub record_count: usize,
    /// 因缓冲区满而丢弃的记录数
    pub dropped_count: usize,
    pub capacity: usize,
}

/// 日志环形缓冲区
///
/// 缓冲区满时，新记录覆盖最旧的记录（FIFO）
pub struct LogRingBuffer {
    inner: Mutex<VecDeque<Record>>,
    capacity: usize,
    dropped: AtomicUsize,
}

impl LogRingBuffer {
    pub fn new(capacity: usize) -> Arc<Self> {
        Arc::new(LogRingBuffer {
            inner: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
            dropped: AtomicUsize::new(0),
        })
    }

    fn records(&self) -> MutexGuard<'_, VecDeque<Record>> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn push(&self, record: Record) {
        if self.capacity == 0 {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            return;
        }

        let mut inner = self.records();
        if inner.len() >= self.capacity {
            inner.pop_front();
            self.dropped.fetch_add(1, Ordering::Relaxed);
        }
        inner.push_back(record);
    }

    /// 获取当前所有记录（按时间顺序）
    pub fn dump_records(&self) -> Vec<Record> {
        self.records().iter().cloned().collect()
    }

    /// 将日志转储为多行字符串
    pub fn dump(&self) -> String {
        self.records()
            .iter()
            .map(Record::format)
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// 是否存在包含指定文本的记录
    pub fn contains(&self, needle: &str) -> bool {
        self.records().iter().any(|r| r.message.contains(needle))
    }

    pub fn clear(&self) {
        self.records().clear();
        self.dropped.store(0, Ordering::Relaxed);
    }

    pub fn stats(&self) -> RingBufferStats {
        RingBufferStats {
            record_count: self.len(),
            dropped_count: self.dropped.load(Ordering::Relaxed),
            capacity: self.capacity,
        }
    }

    pub fn len(&self) -> usize {
        self.records().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl LogSink for LogRingBuffer {
    fn write(&self, record: &Record) {
        self.push(record.clone());
    }
}

impl LogSink for Arc<LogRingBuffer> {
    fn write(&self, record: &Record) {
        self.push(record.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Level;

    fn record(message: &str) -> Record {
        Record::new(Level::Info, "test", message)
    }

    #[test]
    fn test_push_and_dump() {
        let ring = LogRingBuffer::new(3);
        ring.write(&record("a"));
        ring.write(&record("b"));

        let records = ring.dump_records();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].message, "a");
        assert_eq!(records[1].message, "b");
    }

    #[test]
    fn test_overwrite_oldest() {
        let ring = LogRingBuffer::new(2);
        ring.write(&record("1"));
        ring.write(&record("2"));
        ring.write(&record("3"));

        let records = ring.dump_records();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].message, "2");
        assert_eq!(records[1].message, "3");
        assert_eq!(ring.stats().dropped_count, 1);
    }

    #[test]
    fn test_zero_capacity_drops_everything() {
        let ring = LogRingBuffer::new(0);
        ring.write(&record("x"));
        assert!(ring.is_empty());
        assert_eq!(ring.stats().dropped_count, 1);
    }

    #[test]
    fn test_clear_resets_stats() {
        let ring = LogRingBuffer::new(1);
        ring.write(&record("1"));
        ring.write(&record("2"));
        ring.clear();

        assert_eq!(
            ring.stats(),
            RingBufferStats {
                record_count: 0,
                dropped_count: 0,
                capacity: 1,
            }
        );
    }

    #[test]
    fn test_dump_and_contains() {
        let ring = LogRingBuffer::new(10);
        ring.write(&record("first line"));
        ring.write(&record("second line"));

        let dump = ring.dump();
        assert_eq!(dump.lines().count(), 2);
        assert!(ring.contains("second"));
        assert!(!ring.contains("third"));
    }
}
