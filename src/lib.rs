//! easylua - typed Lua stack marshalling and reference lifetimes
//!
//! Facade over the workspace crates:
//!
//! ```text
//! easylua-config  - pure configuration data (serde)
//! easylua-log     - structured logging with explicit Arc<Logger> passing
//! easylua-core    - marshaller, references, calls, globals, scripts
//! ```
//!
//! # Quick Start
//!
//! ```
//! use easylua::{Function, State};
//!
//! let state = State::new().unwrap();
//! assert!(state.run("function add(a, b) return a + b end").is_ok());
//!
//! let add: Function = state.get_global("add").unwrap();
//! let sum: i32 = add.call((1, 2)).unwrap().get().unwrap();
//! assert_eq!(sum, 3);
//! ```

pub use easylua_core::*;

/// 配置数据（纯数据结构）
pub mod config {
    pub use easylua_config::*;
    pub use easylua_core::config::{defaults, init_defaults, is_initialized, StateOptions};
}

/// 日志系统
pub mod log {
    pub use easylua_log::*;
}
