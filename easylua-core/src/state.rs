//! 解释器状态：拥有型 `State` 与非拥有型 `StateView`

use crate::config::{self, StateOptions};
use crate::error::{Error, Result};
use crate::function::ResultLedger;
use crate::kind::ValueKind;
use crate::raw::RawState;
use easylua_config::LimitConfig;
use easylua_log::{debug, info, Logger};
use mlua_sys as ffi;
use std::fmt;
use std::ops::Deref;
use std::rc::Rc;
use std::sync::Arc;

/// 非拥有的解释器句柄
///
/// 所有引用、调用结果都以 `&'lua StateView` 借用它，因此在编译期就不能
/// 活得比状态更久。视图不可克隆，只通过引用共享；包装同一个解释器的
/// 多个视图共享同一份调用结果记录。
pub struct StateView {
    raw: RawState,
    logger: Arc<Logger>,
    limits: LimitConfig,
    results: Rc<ResultLedger>,
}

impl StateView {
    /// 包装一个由别处创建的解释器（例如宿主程序自带的 `lua_State`）
    ///
    /// # Safety
    /// `ptr` 必须指向一个存活的 `lua_State`，并且在视图存活期间保持有效。
    pub unsafe fn from_raw(ptr: *mut ffi::lua_State) -> Result<Self> {
        let raw = RawState::from_ptr(ptr)
            .ok_or_else(|| Error::invalid_argument("state", "null interpreter state"))?;

        Ok(StateView {
            raw,
            logger: Logger::noop(),
            limits: LimitConfig::default(),
            results: ResultLedger::for_state(ptr),
        })
    }

    /// 替换日志器
    pub fn with_logger(mut self, logger: Arc<Logger>) -> Self {
        self.logger = logger;
        self
    }

    /// 替换栈限制
    pub fn with_limits(mut self, limits: LimitConfig) -> Self {
        self.limits = limits;
        self
    }

    /// 当前栈高度
    pub fn top(&self) -> i32 {
        self.raw.top()
    }

    /// 弹出最多 `count` 个值（不会越过栈底）
    pub fn pop(&self, count: i32) {
        self.raw.pop(count.min(self.top()));
    }

    /// 位置上的值类型；没有值（包括索引 0 和越界位置）时返回 None
    pub fn kind_at(&self, index: i32) -> Option<ValueKind> {
        let kind = match self.raw.type_at(index) {
            ffi::LUA_TNONE => return None,
            ffi::LUA_TNIL => ValueKind::Nil,
            ffi::LUA_TBOOLEAN => ValueKind::Boolean,
            ffi::LUA_TNUMBER if self.raw.is_integer(index) => ValueKind::Integer,
            ffi::LUA_TNUMBER => ValueKind::Float,
            ffi::LUA_TSTRING => ValueKind::String,
            ffi::LUA_TFUNCTION => ValueKind::Function,
            ffi::LUA_TTABLE => ValueKind::Table,
            ffi::LUA_TUSERDATA | ffi::LUA_TLIGHTUSERDATA => ValueKind::Userdata,
            ffi::LUA_TTHREAD => ValueKind::Thread,
            _ => ValueKind::Other,
        };
        Some(kind)
    }

    pub fn as_ptr(&self) -> *mut ffi::lua_State {
        self.raw.as_ptr()
    }

    pub fn logger(&self) -> &Arc<Logger> {
        &self.logger
    }

    pub fn limits(&self) -> &LimitConfig {
        &self.limits
    }

    pub(crate) fn raw(&self) -> RawState {
        self.raw
    }

    /// 仍然存活的调用结果块
    pub(crate) fn results(&self) -> &ResultLedger {
        &self.results
    }

    /// 位置上必须有值
    pub(crate) fn checked_kind(&self, index: i32) -> Result<ValueKind> {
        if index == 0 {
            return Err(Error::invalid_argument(
                "index",
                "stack index 0 is never valid",
            ));
        }
        self.kind_at(index).ok_or_else(|| {
            Error::invalid_argument(
                "index",
                format!("no value at stack index {index} (stack height {})", self.top()),
            )
        })
    }

    /// 位置上必须是指定类型的值
    pub(crate) fn expect_kind(&self, index: i32, expected: ValueKind) -> Result<ValueKind> {
        let actual = self.checked_kind(index)?;
        if actual != expected {
            return Err(Error::TypeMismatch {
                index,
                actual,
                expected,
            });
        }
        Ok(actual)
    }

    /// 栈内位置 -> 绝对位置（位置必须有值）
    pub(crate) fn absolute(&self, index: i32) -> i32 {
        self.raw.abs_index(index)
    }

    /// 确保还能再压入 `extra` 个值
    pub(crate) fn ensure_slots(&self, extra: i32) -> Result<()> {
        let wanted = usize::try_from(self.top()).unwrap_or(0) + usize::try_from(extra).unwrap_or(0);
        if wanted > self.limits.max_stack_slots || !self.raw.check_stack(extra) {
            return Err(Error::Runtime("stack overflow".into()));
        }
        Ok(())
    }

    /// 受保护调用的状态码 -> Result；失败时弹出错误对象
    pub(crate) fn protected(&self, status: std::ffi::c_int) -> Result<()> {
        if status == ffi::LUA_OK {
            return Ok(());
        }
        let message = self.error_message(-1);
        self.pop(1);
        Err(Error::Call(message))
    }

    /// 把位置上的错误对象描述为字符串
    pub(crate) fn error_message(&self, index: i32) -> String {
        let raw = self.raw;
        match self.kind_at(index) {
            Some(ValueKind::String) => raw
                .to_bytes(index)
                .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
                .unwrap_or_default(),
            Some(ValueKind::Integer) => raw.to_integer(index).unwrap_or_default().to_string(),
            Some(ValueKind::Float) => raw.to_number(index).unwrap_or_default().to_string(),
            Some(kind) => format!("error object is a {kind} value"),
            None => String::from("no error object"),
        }
    }
}

impl fmt::Debug for StateView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateView")
            .field("ptr", &self.raw.as_ptr())
            .field("top", &self.top())
            .field("limits", &self.limits)
            .finish()
    }
}

/// 作用域结束时弹出固定数量的值
pub(crate) struct PopGuard<'a> {
    state: &'a StateView,
    count: i32,
}

impl<'a> PopGuard<'a> {
    pub(crate) fn new(state: &'a StateView, count: i32) -> Self {
        PopGuard { state, count }
    }
}

impl Drop for PopGuard<'_> {
    fn drop(&mut self) {
        self.state.pop(self.count);
    }
}

/// 拥有解释器的状态，离开作用域时关闭解释器
///
/// ```
/// use easylua_core::State;
///
/// let state = State::new().unwrap();
/// state.set_global("answer", 42).unwrap();
/// assert_eq!(state.get_global::<i64>("answer").unwrap(), 42);
/// ```
pub struct State {
    view: StateView,
}

impl State {
    /// 使用进程级默认选项（未初始化时使用 `StateOptions::default()`）
    pub fn new() -> Result<Self> {
        let options = config::defaults().cloned().unwrap_or_default();
        Self::with_options(options)
    }

    pub fn with_options(options: StateOptions) -> Result<Self> {
        let raw = RawState::open()
            .ok_or_else(|| Error::OutOfMemory("cannot allocate interpreter state".into()))?;

        let StateOptions { config, logger, .. } = options;
        if config.open_standard_libs {
            raw.open_libs();
        }

        info!(
            logger,
            "interpreter state opened (standard libs: {})", config.open_standard_libs
        );

        Ok(State {
            view: StateView {
                raw,
                logger,
                limits: config.limits,
                results: ResultLedger::for_state(raw.as_ptr()),
            },
        })
    }
}

impl Deref for State {
    type Target = StateView;

    fn deref(&self) -> &StateView {
        &self.view
    }
}

impl fmt::Debug for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("State").field(&self.view).finish()
    }
}

impl Drop for State {
    fn drop(&mut self) {
        debug!(
            self.view.logger,
            "closing interpreter state ({} values left on the stack)",
            self.view.top()
        );
        ResultLedger::forget(self.view.raw.as_ptr());
        // SAFETY: 所有借用视图的对象都已在此之前释放（'lua 生命周期保证）
        unsafe { self.view.raw.close() }
    }
}
