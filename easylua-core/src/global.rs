//! Global Binding Facade
//!
//! 按名称读写全局变量。读取时先压入全局值，转换后在所有退出路径上弹出；
//! 未定义的全局变量读作 nil。读写都在受保护调用中进行，`__index`/`__newindex`
//! 元方法抛出的错误以 `Error::Call` 返回。

use crate::error::{Error, Result};
use crate::kind::ValueKind;
use crate::stack::{FromStack, ToStack};
use crate::state::{PopGuard, StateView};
use std::ffi::{CStr, CString};

/// 全局变量名 -> C 字符串
pub(crate) fn global_name(name: &str) -> Result<CString> {
    CString::new(name).map_err(|_| {
        Error::invalid_argument("name", format!("global name {name:?} contains a NUL byte"))
    })
}

/// 受保护地压入全局值；元方法出错时栈高度不变
pub(crate) fn push_global(state: &StateView, name: &CStr) -> Result<()> {
    state.ensure_slots(3)?;
    let status = state.raw().get_global(name);
    state.protected(status)
}

fn read_global<'lua, T: FromStack<'lua>>(state: &'lua StateView, name: &str) -> Result<T> {
    let name = global_name(name)?;
    push_global(state, &name)?;
    let _guard = PopGuard::new(state, 1);
    T::read(state, -1)
}

fn write_global<T: ToStack>(state: &StateView, name: &str, value: T) -> Result<()> {
    let name = global_name(name)?;
    state.ensure_slots(3)?;
    value.to_stack(state)?;
    let status = state.raw().set_global(&name);
    state.protected(status)
}

/// 全局变量代理，不持有任何解释器状态
#[derive(Clone, Copy, Debug)]
pub struct Global<'lua> {
    state: &'lua StateView,
    name: &'lua str,
}

impl<'lua> Global<'lua> {
    pub fn name(&self) -> &str {
        self.name
    }

    /// 读取并转换
    pub fn get<T: FromStack<'lua>>(&self) -> Result<T> {
        read_global(self.state, self.name)
    }

    /// 赋值
    pub fn set<T: ToStack>(&self, value: T) -> Result<()> {
        write_global(self.state, self.name, value)
    }

    /// 当前值的类型（未定义为 `Nil`）
    pub fn kind(&self) -> Result<ValueKind> {
        let name = global_name(self.name)?;
        push_global(self.state, &name)?;
        let _guard = PopGuard::new(self.state, 1);
        self.state.checked_kind(-1)
    }

    pub fn is_defined(&self) -> Result<bool> {
        Ok(self.kind()? != ValueKind::Nil)
    }
}

impl StateView {
    /// 全局变量代理
    pub fn global<'lua>(&'lua self, name: &'lua str) -> Global<'lua> {
        Global { state: self, name }
    }

    pub fn get_global<'lua, T: FromStack<'lua>>(&'lua self, name: &str) -> Result<T> {
        read_global(self, name)
    }

    pub fn set_global<T: ToStack>(&self, name: &str, value: T) -> Result<()> {
        write_global(self, name, value)
    }
}
