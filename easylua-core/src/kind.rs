//! 值类型标签

use std::fmt;

/// 解释器值的类型标签
///
/// 数字按照解释器的整数子类型拆分为 `Integer` 和 `Float`；
/// 轻量 userdata 归入 `Userdata`。"该位置没有值" 不是一种类型，
/// 用 `Option<ValueKind>::None` 表示。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Nil,
    Boolean,
    Integer,
    Float,
    String,
    Function,
    Table,
    Userdata,
    Thread,
    Other,
}

impl ValueKind {
    pub const fn name(&self) -> &'static str {
        match self {
            ValueKind::Nil => "nil",
            ValueKind::Boolean => "boolean",
            ValueKind::Integer => "integer",
            ValueKind::Float => "float",
            ValueKind::String => "string",
            ValueKind::Function => "function",
            ValueKind::Table => "table",
            ValueKind::Userdata => "userdata",
            ValueKind::Thread => "thread",
            ValueKind::Other => "other",
        }
    }

    pub const fn is_number(&self) -> bool {
        matches!(self, ValueKind::Integer | ValueKind::Float)
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
