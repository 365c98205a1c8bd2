//! 测试辅助工具
//!
//! 提供集成测试共用的状态构造与日志捕获

#![allow(dead_code)]

use easylua_core::{State, StateOptions};
use easylua_log::{Level, LogRingBuffer, Logger};
use std::sync::Arc;

/// 创建打开了标准库的新状态
pub fn new_state() -> State {
    State::with_options(StateOptions::default()).expect("interpreter state")
}

/// 创建状态，并把指定级别以上的日志捕获到环形缓冲区
pub fn logged_state(level: Level) -> (State, Arc<LogRingBuffer>) {
    let ring = LogRingBuffer::new(256);
    let logger = Logger::new(level).with_sink(ring.clone());
    let state = State::with_options(StateOptions::default().with_logger(logger))
        .expect("interpreter state");
    (state, ring)
}

/// 运行脚本，失败时带上诊断信息 panic
pub fn run(state: &State, code: &str) {
    let outcome = state.run(code);
    assert!(outcome.is_ok(), "script failed: {outcome}");
}

/// 在临时目录写入脚本文件，返回路径
pub fn write_script(name: &str, code: &str) -> std::path::PathBuf {
    let dir = std::env::temp_dir().join(format!("easylua-tests-{}", std::process::id()));
    std::fs::create_dir_all(&dir).expect("temp dir");
    let path = dir.join(name);
    std::fs::write(&path, code).expect("write script");
    path
}
