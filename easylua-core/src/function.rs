//! Invocation Protocol
//!
//! 以受保护模式调用一个可调用值。调用成功时返回 [`CallResult`]，它拥有
//! 调用留在栈上的全部返回值，析构时恰好弹出这些值。

use crate::error::{Error, Result};
use crate::kind::ValueKind;
use crate::reference::Reference;
use crate::stack::{FromStack, FromStackMulti, ToStackMulti};
use crate::state::StateView;
use easylua_log::{debug, warn};
use mlua_sys as ffi;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::rc::{Rc, Weak};

/// 调用 `callable`，参数从左到右压栈
pub fn call<'lua, F, A>(callable: &F, args: A) -> Result<CallResult<'lua>>
where
    F: Reference<'lua> + ?Sized,
    A: ToStackMulti,
{
    let state = callable.state();
    callable.push()?;
    invoke(state, args)
}

/// 栈顶已经是被调用的值
pub(crate) fn invoke<A: ToStackMulti>(state: &StateView, args: A) -> Result<CallResult<'_>> {
    let _span = state.logger().enter_span("call");

    let actual = state.checked_kind(-1)?;
    if actual != ValueKind::Function {
        state.pop(1);
        return Err(Error::TypeMismatch {
            index: -1,
            actual,
            expected: ValueKind::Function,
        });
    }

    let before = state.top();
    let nargs = match args.to_stack_multi(state) {
        Ok(nargs) => nargs,
        Err(err) => {
            state.pop(1);
            return Err(err);
        }
    };

    debug!(state.logger(), "calling function with {} arguments", nargs);
    let status = state.raw().pcall(nargs, ffi::LUA_MULTRET);
    if status != ffi::LUA_OK {
        let message = state.error_message(-1);
        state.pop(1);
        debug!(state.logger(), "call failed (status {}): {}", status, message);
        return Err(Error::Call(message));
    }

    let count = 1 + state.top() - before;
    debug!(state.logger(), "call returned {} results", count);
    Ok(CallResult {
        state,
        id: state.results().open(before, count),
        count,
    })
}

/// 一次调用的返回值
///
/// 第一个返回值位于结果块的起始位置。转换都是只读查看，同一组结果可以
/// 反复转换成不同的形状。
#[must_use = "dropping a CallResult pops its values immediately"]
pub struct CallResult<'lua> {
    state: &'lua StateView,
    id: u64,
    count: i32,
}

impl<'lua> CallResult<'lua> {
    /// 第一个返回值的绝对位置
    fn base(&self) -> i32 {
        self.state
            .results()
            .base(self.id)
            .unwrap_or_else(|| self.state.top() - self.count + 1)
    }

    /// 读取第一个返回值
    pub fn get<T: FromStack<'lua>>(&self) -> Result<T> {
        if self.count == 0 {
            return Err(Error::Call("no results to convert".into()));
        }
        T::read(self.state, self.base())
    }

    /// 从左到右读取前 N 个返回值
    pub fn get_tuple<T: FromStackMulti<'lua>>(&self) -> Result<T> {
        let wanted = T::COUNT;
        if wanted == 0 {
            return T::read_multi(self.state, self.base());
        }
        if self.count == 0 {
            return Err(Error::Call("no results to convert".into()));
        }
        if wanted > self.count {
            return Err(Error::Call(format!(
                "call produced {} results, {} requested",
                self.count, wanted
            )));
        }
        T::read_multi(self.state, self.base())
    }

    /// 第 `n` 个返回值的类型（从 0 开始）
    pub fn kind(&self, n: i32) -> Option<ValueKind> {
        if n < 0 || n >= self.count {
            return None;
        }
        self.state.kind_at(self.base() + n)
    }

    pub fn len(&self) -> usize {
        usize::try_from(self.count).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}

impl Drop for CallResult<'_> {
    fn drop(&mut self) {
        let Some(base) = self.state.results().close(self.id) else {
            return;
        };
        if self.count == 0 {
            return;
        }

        let raw = self.state.raw();
        let top = raw.top();
        let last = base + self.count - 1;

        if last == top {
            raw.pop(self.count);
        } else if last < top {
            warn!(
                self.state.logger(),
                "call results at {}..={} dropped below {} newer values",
                base,
                last,
                top - last
            );
            raw.rotate(base, -self.count);
            raw.pop(self.count);
        } else {
            warn!(
                self.state.logger(),
                "call results at {}..={} were already popped (stack height {})",
                base,
                last,
                top
            );
            if top >= base {
                raw.set_top(base - 1);
            }
        }
    }
}

/// 仍然存活的结果块（按创建顺序，也就是栈上从低到高）
///
/// 结果块不按创建的逆序析构时，后面块的位置整体下移，这里同步修正。
/// 账本属于解释器栈而不是视图：同一线程上包装同一个 `lua_State` 的所有
/// 视图通过 [`ResultLedger::for_state`] 共享一个账本。
#[derive(Debug, Default)]
pub(crate) struct ResultLedger {
    blocks: RefCell<Vec<ResultBlock>>,
    next_id: Cell<u64>,
}

#[derive(Clone, Copy, Debug)]
struct ResultBlock {
    id: u64,
    base: i32,
    count: i32,
}

thread_local! {
    static LEDGERS: RefCell<HashMap<usize, Weak<ResultLedger>>> = RefCell::new(HashMap::new());
}

impl ResultLedger {
    /// 取得（或创建）解释器栈对应的账本
    pub(crate) fn for_state(ptr: *mut ffi::lua_State) -> Rc<ResultLedger> {
        LEDGERS.with(|ledgers| {
            let mut ledgers = ledgers.borrow_mut();
            ledgers.retain(|_, ledger| ledger.strong_count() > 0);
            let key = ptr as usize;
            if let Some(ledger) = ledgers.get(&key).and_then(Weak::upgrade) {
                return ledger;
            }
            let ledger = Rc::new(ResultLedger::default());
            ledgers.insert(key, Rc::downgrade(&ledger));
            ledger
        })
    }

    /// 解释器关闭后，地址可能被新的解释器复用
    pub(crate) fn forget(ptr: *mut ffi::lua_State) {
        LEDGERS.with(|ledgers| {
            ledgers.borrow_mut().remove(&(ptr as usize));
        });
    }

    fn open(&self, base: i32, count: i32) -> u64 {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        self.blocks
            .borrow_mut()
            .push(ResultBlock { id, base, count });
        id
    }

    fn base(&self, id: u64) -> Option<i32> {
        self.blocks
            .borrow()
            .iter()
            .find(|block| block.id == id)
            .map(|block| block.base)
    }

    /// 移除结果块，返回它关闭前的起始位置
    fn close(&self, id: u64) -> Option<i32> {
        let mut blocks = self.blocks.borrow_mut();
        let position = blocks.iter().position(|block| block.id == id)?;
        let closed = blocks.remove(position);
        for block in blocks.iter_mut().skip(position) {
            block.base -= closed.count;
        }
        Some(closed.base)
    }

    /// 存活的结果块数量
    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.blocks.borrow().len()
    }
}

impl fmt::Debug for CallResult<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallResult")
            .field("base", &self.base())
            .field("count", &self.count)
            .finish()
    }
}

impl StateView {
    /// 调用全局函数 `name`
    pub fn call<A: ToStackMulti>(&self, name: &str, args: A) -> Result<CallResult<'_>> {
        let name = crate::global::global_name(name)?;
        crate::global::push_global(self, &name)?;
        invoke(self, args)
    }
}
