//! Reference Model
//!
//! 宿主持有的解释器值有两种引用方式：
//! - [`StackRef`]：记录值所在的绝对栈位置，没有注册表开销，析构无副作用；
//!   只在该位置的值没有被弹出之前有效。
//! - [`RegistryRef`]：把值锚定到注册表槽位，跨调用存活；每个实例至多持有
//!   一个槽位，析构时释放。克隆会锚定一份独立的副本。
//!
//! 两者都以 `'lua` 借用 `StateView`，因此不能比状态活得更久。

use crate::error::{Error, Result};
use crate::function::{self, CallResult};
use crate::kind::ValueKind;
use crate::raw::LUA_NOREF;
use crate::stack::{FromStack, ToStack, ToStackMulti};
use crate::state::StateView;
use easylua_log::{trace, warn};
use std::fmt;

/// 对解释器值的引用
pub trait Reference<'lua> {
    fn state(&self) -> &'lua StateView;

    /// 构造时记录的类型
    fn kind(&self) -> ValueKind;

    /// 把被引用的值压入栈顶
    fn push(&self) -> Result<()>;
}

// ===== StackRef =====

/// 栈位置引用
#[derive(Clone, Copy)]
pub struct StackRef<'lua> {
    state: &'lua StateView,
    index: i32,
    kind: ValueKind,
}

impl<'lua> StackRef<'lua> {
    /// 引用 `index` 处类型为 `expected` 的值
    pub fn new(state: &'lua StateView, index: i32, expected: ValueKind) -> Result<Self> {
        let kind = state.expect_kind(index, expected)?;
        Ok(Self::at(state, index, kind))
    }

    /// 引用 `index` 处任意类型的值
    pub fn any(state: &'lua StateView, index: i32) -> Result<Self> {
        let kind = state.checked_kind(index)?;
        Ok(Self::at(state, index, kind))
    }

    fn at(state: &'lua StateView, index: i32, kind: ValueKind) -> Self {
        StackRef {
            state,
            index: state.absolute(index),
            kind,
        }
    }

    /// 绝对栈位置
    pub fn index(&self) -> i32 {
        self.index
    }
}

impl<'lua> Reference<'lua> for StackRef<'lua> {
    fn state(&self) -> &'lua StateView {
        self.state
    }

    fn kind(&self) -> ValueKind {
        self.kind
    }

    fn push(&self) -> Result<()> {
        self.state.checked_kind(self.index)?;
        self.state.ensure_slots(1)?;
        self.state.raw().push_copy(self.index);
        Ok(())
    }
}

impl fmt::Debug for StackRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StackRef")
            .field("index", &self.index)
            .field("kind", &self.kind)
            .finish()
    }
}

// ===== RegistryRef =====

/// 注册表锚定引用
pub struct RegistryRef<'lua> {
    state: &'lua StateView,
    slot: i32,
    kind: ValueKind,
}

impl<'lua> RegistryRef<'lua> {
    /// 锚定 `index` 处类型为 `expected` 的值；值仍留在原位置
    pub fn new(state: &'lua StateView, index: i32, expected: ValueKind) -> Result<Self> {
        let kind = state.expect_kind(index, expected)?;
        Self::anchor_copy(state, index, kind)
    }

    /// 锚定 `index` 处任意类型的值
    pub fn any(state: &'lua StateView, index: i32) -> Result<Self> {
        let kind = state.checked_kind(index)?;
        Self::anchor_copy(state, index, kind)
    }

    /// 锚定栈顶值并将其弹出；类型不符时同样弹出
    pub fn anchor_top(state: &'lua StateView, expected: ValueKind) -> Result<Self> {
        let kind = state.checked_kind(-1)?;
        if kind != expected {
            state.pop(1);
            return Err(Error::TypeMismatch {
                index: -1,
                actual: kind,
                expected,
            });
        }
        Ok(Self::anchor(state, kind))
    }

    /// 锚定并弹出任意类型的栈顶值
    pub fn anchor_top_any(state: &'lua StateView) -> Result<Self> {
        let kind = state.checked_kind(-1)?;
        Ok(Self::anchor(state, kind))
    }

    /// 不持有槽位的空引用
    pub fn empty(state: &'lua StateView) -> Self {
        RegistryRef {
            state,
            slot: LUA_NOREF,
            kind: ValueKind::Nil,
        }
    }

    fn anchor_copy(state: &'lua StateView, index: i32, kind: ValueKind) -> Result<Self> {
        state.ensure_slots(1)?;
        state.raw().push_copy(index);
        Ok(Self::anchor(state, kind))
    }

    /// 栈顶是一个类型为 `kind` 的值
    fn anchor(state: &'lua StateView, kind: ValueKind) -> Self {
        let slot = state.raw().reference_top();
        trace!(state.logger(), "anchored {} in registry slot {}", kind, slot);
        RegistryRef { state, slot, kind }
    }

    /// 是否持有槽位
    pub fn is_valid(&self) -> bool {
        self.slot != LUA_NOREF
    }

    /// 当前槽位（空引用返回 `LUA_NOREF`）
    pub fn slot(&self) -> i32 {
        self.slot
    }

    /// 释放槽位；可重复调用
    pub fn release(&mut self) {
        if !self.is_valid() {
            return;
        }
        self.state.raw().unreference(self.slot);
        trace!(self.state.logger(), "released registry slot {}", self.slot);
        self.slot = LUA_NOREF;
    }

    /// 转移槽位，原引用变为空
    pub fn take(&mut self) -> Self {
        let taken = RegistryRef {
            state: self.state,
            slot: self.slot,
            kind: self.kind,
        };
        self.slot = LUA_NOREF;
        taken
    }
}

impl<'lua> Reference<'lua> for RegistryRef<'lua> {
    fn state(&self) -> &'lua StateView {
        self.state
    }

    fn kind(&self) -> ValueKind {
        self.kind
    }

    fn push(&self) -> Result<()> {
        if !self.is_valid() {
            return Err(Error::Runtime(
                "cannot push a registry reference that is not valid".into(),
            ));
        }
        self.state.ensure_slots(1)?;
        self.state.raw().push_registry(self.slot);
        Ok(())
    }
}

impl Clone for RegistryRef<'_> {
    fn clone(&self) -> Self {
        if !self.is_valid() {
            return RegistryRef::empty(self.state);
        }
        if let Err(err) = self.push() {
            warn!(
                self.state.logger(),
                "cannot clone registry slot {}: {}", self.slot, err
            );
            return RegistryRef::empty(self.state);
        }
        RegistryRef::anchor(self.state, self.kind)
    }
}

impl Drop for RegistryRef<'_> {
    fn drop(&mut self) {
        self.release();
    }
}

impl fmt::Debug for RegistryRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistryRef")
            .field("slot", &self.slot)
            .field("kind", &self.kind)
            .finish()
    }
}

// ===== 类型化包装 =====

/// 栈上的函数
#[derive(Clone, Copy, Debug)]
pub struct StackFunction<'lua>(StackRef<'lua>);

impl<'lua> StackFunction<'lua> {
    pub fn new(state: &'lua StateView, index: i32) -> Result<Self> {
        StackRef::new(state, index, ValueKind::Function).map(StackFunction)
    }

    pub fn call<A: ToStackMulti>(&self, args: A) -> Result<CallResult<'lua>> {
        function::call(self, args)
    }

    pub fn index(&self) -> i32 {
        self.0.index()
    }
}

/// 锚定在注册表中的函数，可以在产生它的调用返回后继续调用
#[derive(Clone, Debug)]
pub struct Function<'lua>(RegistryRef<'lua>);

impl<'lua> Function<'lua> {
    pub fn new(state: &'lua StateView, index: i32) -> Result<Self> {
        RegistryRef::new(state, index, ValueKind::Function).map(Function)
    }

    /// 锚定并弹出栈顶函数
    pub fn anchor_top(state: &'lua StateView) -> Result<Self> {
        RegistryRef::anchor_top(state, ValueKind::Function).map(Function)
    }

    pub fn call<A: ToStackMulti>(&self, args: A) -> Result<CallResult<'lua>> {
        function::call(self, args)
    }

    pub fn is_valid(&self) -> bool {
        self.0.is_valid()
    }

    pub fn into_inner(self) -> RegistryRef<'lua> {
        self.0
    }
}

impl<'lua> TryFrom<RegistryRef<'lua>> for Function<'lua> {
    type Error = Error;

    fn try_from(reference: RegistryRef<'lua>) -> Result<Self> {
        if reference.kind() != ValueKind::Function {
            return Err(Error::Runtime(format!(
                "registry reference holds a {} value, expected a {}",
                reference.kind(),
                ValueKind::Function
            )));
        }
        Ok(Function(reference))
    }
}

/// 锚定在注册表中的表
#[derive(Clone, Debug)]
pub struct Table<'lua>(RegistryRef<'lua>);

impl<'lua> Table<'lua> {
    pub fn new(state: &'lua StateView, index: i32) -> Result<Self> {
        RegistryRef::new(state, index, ValueKind::Table).map(Table)
    }

    /// 锚定并弹出栈顶表
    pub fn anchor_top(state: &'lua StateView) -> Result<Self> {
        RegistryRef::anchor_top(state, ValueKind::Table).map(Table)
    }

    pub fn is_valid(&self) -> bool {
        self.0.is_valid()
    }

    pub fn into_inner(self) -> RegistryRef<'lua> {
        self.0
    }
}

macro_rules! delegate_reference {
    ($($wrapper:ident),*) => {
        $(
            impl<'lua> Reference<'lua> for $wrapper<'lua> {
                fn state(&self) -> &'lua StateView {
                    self.0.state()
                }

                fn kind(&self) -> ValueKind {
                    self.0.kind()
                }

                fn push(&self) -> Result<()> {
                    self.0.push()
                }
            }
        )*
    };
}

delegate_reference!(StackFunction, Function, Table);

// ===== 编组 =====

macro_rules! impl_reference_marshalling {
    ($($ty:ident => $ctor:expr),* $(,)?) => {
        $(
            impl ToStack for &$ty<'_> {
                fn to_stack(self, _state: &StateView) -> Result<()> {
                    Reference::push(self)
                }
            }

            impl<'lua> FromStack<'lua> for $ty<'lua> {
                fn read(state: &'lua StateView, index: i32) -> Result<Self> {
                    $ctor(state, index)
                }
            }
        )*
    };
}

impl_reference_marshalling! {
    StackRef => StackRef::any,
    RegistryRef => RegistryRef::any,
    StackFunction => StackFunction::new,
    Function => Function::new,
    Table => Table::new,
}
