//! 脚本加载与运行
//!
//! 加载/运行的结果是值（[`LoadOutcome`]）而不是错误：脚本本身写错属于
//! 正常的业务结果。只有宿主侧参数不合法（空路径、路径含 NUL）才返回
//! `Error`。所有路径在返回前都会恢复栈高度（`load_function` 成功时除外，
//! 它把代码块锚定到注册表后同样不留下任何值）。

use crate::error::{Error, Result};
use crate::raw::LUA_ERRFILE;
use crate::reference::Function;
use crate::state::StateView;
use easylua_log::debug;
use mlua_sys as ffi;
use std::borrow::Cow;
use std::ffi::{c_int, CStr, CString};
use std::fmt;
use std::path::Path;

/// 加载/运行状态
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LoadStatus {
    Ok,
    SyntaxError,
    MemoryError,
    FileError,
    RuntimeError,
    UnknownError,
}

impl LoadStatus {
    pub(crate) fn from_code(code: c_int) -> Self {
        match code {
            ffi::LUA_OK => LoadStatus::Ok,
            ffi::LUA_ERRSYNTAX => LoadStatus::SyntaxError,
            ffi::LUA_ERRMEM => LoadStatus::MemoryError,
            LUA_ERRFILE => LoadStatus::FileError,
            ffi::LUA_ERRRUN => LoadStatus::RuntimeError,
            _ => LoadStatus::UnknownError,
        }
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            LoadStatus::Ok => "ok",
            LoadStatus::SyntaxError => "syntax error",
            LoadStatus::MemoryError => "memory error",
            LoadStatus::FileError => "file error",
            LoadStatus::RuntimeError => "runtime error",
            LoadStatus::UnknownError => "unknown error",
        }
    }
}

impl fmt::Display for LoadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 加载/运行结果：状态 + 诊断信息
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoadOutcome {
    pub status: LoadStatus,
    pub message: Option<String>,
}

impl LoadOutcome {
    pub fn ok() -> Self {
        LoadOutcome {
            status: LoadStatus::Ok,
            message: None,
        }
    }

    pub fn failure(status: LoadStatus, message: impl Into<String>) -> Self {
        LoadOutcome {
            status,
            message: Some(message.into()),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == LoadStatus::Ok
    }

    pub fn status(&self) -> LoadStatus {
        self.status
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }
}

impl fmt::Display for LoadOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.message {
            Some(message) => write!(f, "{}: {}", self.status, message),
            None => write!(f, "{}", self.status),
        }
    }
}

/// 代码块名称：与 `luaL_loadstring` 一样使用代码本身，含 NUL 时退化为固定名称
fn chunk_name(code: &str) -> Cow<'static, CStr> {
    match CString::new(code) {
        Ok(name) => Cow::Owned(name),
        Err(_) => Cow::Borrowed(c"=(load)"),
    }
}

fn path_name(path: &Path) -> Result<CString> {
    let text = path
        .to_str()
        .ok_or_else(|| Error::invalid_argument("path", "path is not valid UTF-8"))?;
    if text.is_empty() {
        return Err(Error::invalid_argument("path", "path is empty"));
    }
    CString::new(text)
        .map_err(|_| Error::invalid_argument("path", format!("path {text:?} contains a NUL byte")))
}

impl StateView {
    /// 状态码为 OK 时栈顶是编译好的代码块，否则是错误消息
    fn loaded(&self, code: c_int) -> LoadOutcome {
        let status = LoadStatus::from_code(code);
        if status == LoadStatus::Ok {
            return LoadOutcome::ok();
        }
        let message = self.error_message(-1);
        self.pop(1);
        LoadOutcome::failure(status, message)
    }

    fn load_chunk(&self, code: &str) -> LoadOutcome {
        if self.ensure_slots(1).is_err() {
            return LoadOutcome::failure(LoadStatus::MemoryError, "stack overflow");
        }
        let status = self.raw().load_buffer(code.as_bytes(), &chunk_name(code));
        self.loaded(status)
    }

    fn load_chunk_file(&self, path: &Path) -> Result<LoadOutcome> {
        let name = path_name(path)?;
        if self.ensure_slots(1).is_err() {
            return Ok(LoadOutcome::failure(LoadStatus::MemoryError, "stack overflow"));
        }
        let status = self.raw().load_file(&name);
        Ok(self.loaded(status))
    }

    /// 栈顶是刚加载的代码块：无参数调用并丢弃返回值
    fn run_chunk(&self) -> LoadOutcome {
        let code = self.raw().pcall(0, 0);
        self.loaded(code)
    }

    fn logged(&self, what: &str, outcome: LoadOutcome) -> LoadOutcome {
        debug!(self.logger(), "{} finished: {}", what, outcome);
        outcome
    }

    /// 只编译不运行，栈高度不变
    pub fn load(&self, code: &str) -> LoadOutcome {
        let outcome = self.load_chunk(code);
        if outcome.is_ok() {
            self.pop(1);
        }
        self.logged("load", outcome)
    }

    /// 编译文件，栈高度不变
    pub fn load_file(&self, path: impl AsRef<Path>) -> Result<LoadOutcome> {
        let outcome = self.load_chunk_file(path.as_ref())?;
        if outcome.is_ok() {
            self.pop(1);
        }
        Ok(self.logged("load_file", outcome))
    }

    /// 编译并锚定代码块，之后可以反复调用
    pub fn load_function(&self, code: &str) -> std::result::Result<Function<'_>, LoadOutcome> {
        let outcome = self.logged("load_function", self.load_chunk(code));
        if !outcome.is_ok() {
            return Err(outcome);
        }
        Function::anchor_top(self)
            .map_err(|err| LoadOutcome::failure(LoadStatus::UnknownError, err.to_string()))
    }

    /// 编译并运行
    pub fn run(&self, code: &str) -> LoadOutcome {
        let mut outcome = self.load_chunk(code);
        if outcome.is_ok() {
            outcome = self.run_chunk();
        }
        self.logged("run", outcome)
    }

    /// 编译并运行文件
    pub fn run_file(&self, path: impl AsRef<Path>) -> Result<LoadOutcome> {
        let mut outcome = self.load_chunk_file(path.as_ref())?;
        if outcome.is_ok() {
            outcome = self.run_chunk();
        }
        Ok(self.logged("run_file", outcome))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::State;

    #[test]
    fn test_status_mapping() {
        assert_eq!(LoadStatus::from_code(ffi::LUA_OK), LoadStatus::Ok);
        assert_eq!(LoadStatus::from_code(ffi::LUA_ERRSYNTAX), LoadStatus::SyntaxError);
        assert_eq!(LoadStatus::from_code(ffi::LUA_ERRMEM), LoadStatus::MemoryError);
        assert_eq!(LoadStatus::from_code(LUA_ERRFILE), LoadStatus::FileError);
        assert_eq!(LoadStatus::from_code(ffi::LUA_ERRRUN), LoadStatus::RuntimeError);
        assert_eq!(LoadStatus::from_code(ffi::LUA_ERRERR), LoadStatus::UnknownError);
        assert_eq!(LoadStatus::from_code(99), LoadStatus::UnknownError);
    }

    #[test]
    fn test_load_is_balanced() {
        let state = State::new().unwrap();
        assert!(state.load("return 1").is_ok());
        assert_eq!(state.top(), 0);

        let outcome = state.load("return +");
        assert_eq!(outcome.status(), LoadStatus::SyntaxError);
        assert!(outcome.message().is_some());
        assert_eq!(state.top(), 0);
    }

    #[test]
    fn test_load_does_not_run() {
        let state = State::new().unwrap();
        assert!(state.load("loaded = true").is_ok());
        assert!(!state.global("loaded").is_defined().unwrap());
    }

    #[test]
    fn test_run_reports_runtime_error() {
        let state = State::new().unwrap();
        let outcome = state.run("error('script failed')");
        assert_eq!(outcome.status(), LoadStatus::RuntimeError);
        assert!(outcome.message().unwrap().contains("script failed"));
        assert_eq!(state.top(), 0);
    }

    #[test]
    fn test_run_discards_results() {
        let state = State::new().unwrap();
        assert!(state.run("return 1, 2, 3").is_ok());
        assert_eq!(state.top(), 0);
    }

    #[test]
    fn test_load_function_can_be_called_later() {
        let state = State::new().unwrap();
        let chunk = state.load_function("local a, b = ... return a .. b").unwrap();
        assert_eq!(state.top(), 0);

        let result = chunk.call(("x", "y")).unwrap();
        assert_eq!(result.get::<String>().unwrap(), "xy");
    }

    #[test]
    fn test_load_function_syntax_error() {
        let state = State::new().unwrap();
        let outcome = state.load_function("this is not lua").unwrap_err();
        assert_eq!(outcome.status(), LoadStatus::SyntaxError);
        assert_eq!(state.top(), 0);
    }

    #[test]
    fn test_chunk_name_with_nul() {
        let state = State::new().unwrap();
        let outcome = state.run("error('x')\0");
        assert!(!outcome.is_ok());
        assert_eq!(state.top(), 0);
    }

    #[test]
    fn test_load_file_arguments() {
        let state = State::new().unwrap();
        assert!(matches!(
            state.load_file(""),
            Err(Error::InvalidArgument { argument: "path", .. })
        ));
        assert!(matches!(
            state.run_file("bad\0path.lua"),
            Err(Error::InvalidArgument { .. })
        ));
    }

    #[test]
    fn test_missing_file() {
        let state = State::new().unwrap();
        let outcome = state
            .load_file("/definitely/not/here/easylua_missing.lua")
            .unwrap();
        assert_eq!(outcome.status(), LoadStatus::FileError);
        assert!(outcome.message().unwrap().contains("easylua_missing.lua"));
        assert_eq!(state.top(), 0);
    }

    #[test]
    fn test_outcome_display() {
        assert_eq!(LoadOutcome::ok().to_string(), "ok");
        assert_eq!(
            LoadOutcome::failure(LoadStatus::FileError, "cannot open x").to_string(),
            "file error: cannot open x"
        );
    }
}
