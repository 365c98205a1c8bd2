//! 错误类型
//!
//! 所有可失败的操作都返回 `Result<T>`；加载/运行脚本的结果是值
//! （见 `script::LoadOutcome`），不走这里。

use crate::kind::ValueKind;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// easylua 错误类型
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// 参数不合法：空状态指针、索引 0、位置上没有值、路径或名称非法
    #[error("invalid argument `{argument}`: {reason}")]
    InvalidArgument {
        argument: &'static str,
        reason: String,
    },

    /// 位置上的值类型与宿主类型要求不一致
    #[error("type mismatch at stack index {index}: expected {expected}, got {actual}")]
    TypeMismatch {
        index: i32,
        actual: ValueKind,
        expected: ValueKind,
    },

    /// 整数无法放入目标类型
    #[error("value {value} does not fit in {target}")]
    OutOfRange { value: String, target: &'static str },

    /// 受保护调用失败，或者调用结果数量不足
    #[error("call failed: {0}")]
    Call(String),

    /// 运行时错误（无效的注册表引用、栈空间耗尽）
    #[error("runtime error: {0}")]
    Runtime(String),

    /// 无法创建解释器
    #[error("out of memory: {0}")]
    OutOfMemory(String),
}

impl Error {
    pub(crate) fn invalid_argument(argument: &'static str, reason: impl Into<String>) -> Self {
        Error::InvalidArgument {
            argument,
            reason: reason.into(),
        }
    }

    pub(crate) fn out_of_range(value: impl ToString, target: &'static str) -> Self {
        Error::OutOfRange {
            value: value.to_string(),
            target,
        }
    }

    /// 获取错误类别的稳定短名称
    pub fn kind_name(&self) -> &'static str {
        match self {
            Error::InvalidArgument { .. } => "invalid_argument",
            Error::TypeMismatch { .. } => "type_mismatch",
            Error::OutOfRange { .. } => "out_of_range",
            Error::Call(_) => "call",
            Error::Runtime(_) => "runtime",
            Error::OutOfMemory(_) => "out_of_memory",
        }
    }
}
