//! easylua Core - typed marshalling over an embedded Lua 5.4 interpreter
//!
//! Bridges host Rust values and the interpreter's shared evaluation stack:
//! - `stack`: bidirectional conversion between stack positions and host types
//! - `reference`: stack-slot references and registry-anchored references
//! - `function`: protected calls returning scoped, lazily-typed results
//! - `global` / `script`: named globals and script loading
//!
//! The interpreter itself is consumed as a black box through `mlua-sys`.
//! Configuration is passed explicitly via `StateOptions`; a process-wide
//! default can be installed once with `config::init_defaults`.

pub mod config;
pub mod error;
pub mod function;
pub mod global;
pub mod kind;
mod raw;
pub mod reference;
pub mod script;
pub mod stack;
pub mod state;

// Re-export common types
pub use config::StateOptions;
pub use error::{Error, Result};
pub use function::{call, CallResult};
pub use global::Global;
pub use kind::ValueKind;
pub use reference::{Function, Reference, RegistryRef, StackFunction, StackRef, Table};
pub use script::{LoadOutcome, LoadStatus};
pub use stack::{
    pop_value, read, read_tuple, set, write, write_multi, FromStack, FromStackMulti, Nil, ToStack,
    ToStackMulti,
};
pub use state::{State, StateView};

// Re-export config types from easylua-config
pub use easylua_config::{LimitConfig, LogLevel, LoggingConfig, StateConfig};
