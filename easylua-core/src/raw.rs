//! Interpreter boundary
//!
//! 整个 crate 中唯一直接调用 Lua C API 的模块。`RawState` 只能从有效的
//! `lua_State` 指针构造，之后的方法都是对单个 C API 调用的薄封装。
//! 需要合法栈位置的方法由调用方保证位置有效（见各方法注释）。

use mlua_sys as ffi;
use std::ffi::{c_int, CStr};
use std::ptr::{self, NonNull};

/// 空注册表槽位（`luaL_ref` 的 "未锚定" 值）
pub(crate) const LUA_NOREF: c_int = -2;

/// `luaL_loadfilex` 打不开文件时的状态码
pub(crate) const LUA_ERRFILE: c_int = ffi::LUA_ERRERR + 1;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct RawState(NonNull<ffi::lua_State>);

impl RawState {
    /// # Safety
    /// `ptr` 为空或指向一个存活的 `lua_State`
    pub(crate) unsafe fn from_ptr(ptr: *mut ffi::lua_State) -> Option<Self> {
        NonNull::new(ptr).map(RawState)
    }

    /// 创建新的解释器，分配失败时返回 None
    pub(crate) fn open() -> Option<Self> {
        // SAFETY: luaL_newstate 没有前置条件
        NonNull::new(unsafe { ffi::luaL_newstate() }).map(RawState)
    }

    pub(crate) fn as_ptr(self) -> *mut ffi::lua_State {
        self.0.as_ptr()
    }

    pub(crate) fn open_libs(self) {
        unsafe { ffi::luaL_openlibs(self.as_ptr()) }
    }

    /// 关闭解释器，之后不能再使用任何副本
    pub(crate) unsafe fn close(self) {
        ffi::lua_close(self.as_ptr())
    }

    // ===== 栈高度 =====

    pub(crate) fn top(self) -> i32 {
        unsafe { ffi::lua_gettop(self.as_ptr()) }
    }

    /// `index` 必须在 `[-top, top + 空闲空间]` 之内
    pub(crate) fn set_top(self, index: i32) {
        unsafe { ffi::lua_settop(self.as_ptr(), index) }
    }

    pub(crate) fn pop(self, count: i32) {
        if count > 0 {
            self.set_top(-count - 1);
        }
    }

    pub(crate) fn check_stack(self, extra: i32) -> bool {
        unsafe { ffi::lua_checkstack(self.as_ptr(), extra) != 0 }
    }

    /// 位置是否落在当前栈内（不含伪索引）
    pub(crate) fn is_stack_index(self, index: i32) -> bool {
        let top = i64::from(self.top());
        let index = i64::from(index);
        (index > 0 && index <= top) || (index < 0 && -index <= top)
    }

    /// 栈内位置 -> 类型标签；没有值时返回 `LUA_TNONE`
    ///
    /// 过大的负索引在 C API 中是未定义行为，这里提前拦截
    pub(crate) fn type_at(self, index: i32) -> c_int {
        if !self.is_stack_index(index) {
            return ffi::LUA_TNONE;
        }
        unsafe { ffi::lua_type(self.as_ptr(), index) }
    }

    /// `index` 必须是栈内位置
    pub(crate) fn is_integer(self, index: i32) -> bool {
        unsafe { ffi::lua_isinteger(self.as_ptr(), index) != 0 }
    }

    /// `index` 必须是栈内位置
    pub(crate) fn abs_index(self, index: i32) -> i32 {
        unsafe { ffi::lua_absindex(self.as_ptr(), index) }
    }

    // ===== 压栈（调用方负责预留空间）=====

    pub(crate) fn push_nil(self) {
        unsafe { ffi::lua_pushnil(self.as_ptr()) }
    }

    pub(crate) fn push_boolean(self, value: bool) {
        unsafe { ffi::lua_pushboolean(self.as_ptr(), c_int::from(value)) }
    }

    pub(crate) fn push_integer(self, value: i64) {
        unsafe { ffi::lua_pushinteger(self.as_ptr(), value) }
    }

    pub(crate) fn push_number(self, value: f64) {
        unsafe { ffi::lua_pushnumber(self.as_ptr(), value) }
    }

    pub(crate) fn push_bytes(self, bytes: &[u8]) {
        unsafe {
            ffi::lua_pushlstring(self.as_ptr(), bytes.as_ptr().cast(), bytes.len());
        }
    }

    /// `index` 必须是栈内位置
    pub(crate) fn push_copy(self, index: i32) {
        unsafe { ffi::lua_pushvalue(self.as_ptr(), index) }
    }

    // ===== 读取（位置必须是栈内位置）=====

    pub(crate) fn to_boolean(self, index: i32) -> bool {
        unsafe { ffi::lua_toboolean(self.as_ptr(), index) != 0 }
    }

    pub(crate) fn to_integer(self, index: i32) -> Option<i64> {
        let mut is_num: c_int = 0;
        let value = unsafe { ffi::lua_tointegerx(self.as_ptr(), index, &mut is_num) };
        (is_num != 0).then_some(value)
    }

    pub(crate) fn to_number(self, index: i32) -> Option<f64> {
        let mut is_num: c_int = 0;
        let value = unsafe { ffi::lua_tonumberx(self.as_ptr(), index, &mut is_num) };
        (is_num != 0).then_some(value)
    }

    /// 只对字符串位置调用：数字会被原地转换成字符串
    pub(crate) fn to_bytes(self, index: i32) -> Option<Vec<u8>> {
        let mut len: usize = 0;
        let data = unsafe { ffi::lua_tolstring(self.as_ptr(), index, &mut len) };
        if data.is_null() {
            return None;
        }
        // SAFETY: Lua 保证 data 指向 len 个字节，且在值留在栈上期间有效
        let bytes = unsafe { std::slice::from_raw_parts(data.cast::<u8>(), len) };
        Some(bytes.to_vec())
    }

    // ===== 栈内搬移 =====

    pub(crate) fn copy(self, from: i32, to: i32) {
        unsafe { ffi::lua_copy(self.as_ptr(), from, to) }
    }

    /// 把 `[index, top]` 区间朝栈顶方向旋转 `n` 个位置
    pub(crate) fn rotate(self, index: i32, n: i32) {
        unsafe { ffi::lua_rotate(self.as_ptr(), index, n) }
    }

    // ===== 调用 =====

    /// 栈顶依次是函数和 `nargs` 个参数
    pub(crate) fn pcall(self, nargs: i32, nresults: i32) -> c_int {
        unsafe { ffi::lua_pcall(self.as_ptr(), nargs, nresults, 0) }
    }

    // ===== 注册表 =====

    /// 把栈顶值锚定到注册表并弹出，返回槽位
    pub(crate) fn reference_top(self) -> c_int {
        unsafe { ffi::luaL_ref(self.as_ptr(), ffi::LUA_REGISTRYINDEX) }
    }

    pub(crate) fn unreference(self, slot: c_int) {
        unsafe { ffi::luaL_unref(self.as_ptr(), ffi::LUA_REGISTRYINDEX, slot) }
    }

    /// 压入槽位中的值，返回其类型标签
    pub(crate) fn push_registry(self, slot: c_int) -> c_int {
        unsafe { ffi::lua_rawgeti(self.as_ptr(), ffi::LUA_REGISTRYINDEX, ffi::lua_Integer::from(slot)) }
    }

    // ===== 全局变量 =====

    /// 受保护地压入全局变量：`__index` 元方法抛出的错误不会越过宿主栈帧
    ///
    /// 返回 `LUA_OK` 时栈顶是全局值，否则是错误对象。需要 3 个空闲位置。
    pub(crate) fn get_global(self, name: &CStr) -> c_int {
        unsafe {
            ffi::lua_pushcfunction(self.as_ptr(), get_global_in_lua);
        }
        self.push_bytes(name.to_bytes());
        self.pcall(1, 1)
    }

    /// 受保护地把栈顶值赋给全局变量
    ///
    /// 值总是被弹出；失败时栈顶留下错误对象。需要 2 个空闲位置。
    pub(crate) fn set_global(self, name: &CStr) -> c_int {
        unsafe {
            ffi::lua_pushcfunction(self.as_ptr(), set_global_in_lua);
        }
        self.push_bytes(name.to_bytes());
        // [value, f, name] -> [f, name, value]
        self.rotate(-3, -1);
        self.pcall(2, 0)
    }

    // ===== 加载 =====

    /// 编译代码块；成功时压入函数，失败时压入错误消息
    pub(crate) fn load_buffer(self, code: &[u8], chunk_name: &CStr) -> c_int {
        unsafe {
            ffi::luaL_loadbufferx(
                self.as_ptr(),
                code.as_ptr().cast(),
                code.len(),
                chunk_name.as_ptr(),
                ptr::null(),
            )
        }
    }

    /// 与 `load_buffer` 相同，代码来自文件
    pub(crate) fn load_file(self, path: &CStr) -> c_int {
        unsafe { ffi::luaL_loadfilex(self.as_ptr(), path.as_ptr(), ptr::null()) }
    }
}

/// 栈：[name]；返回全局值
unsafe extern "C-unwind" fn get_global_in_lua(state: *mut ffi::lua_State) -> c_int {
    let name = ffi::lua_tostring(state, 1);
    ffi::lua_getglobal(state, name);
    1
}

/// 栈：[name, value]
unsafe extern "C-unwind" fn set_global_in_lua(state: *mut ffi::lua_State) -> c_int {
    let name = ffi::lua_tostring(state, 1);
    ffi::lua_settop(state, 2);
    ffi::lua_setglobal(state, name);
    0
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Owned(RawState);

    impl Drop for Owned {
        fn drop(&mut self) {
            unsafe { self.0.close() }
        }
    }

    fn open() -> Owned {
        Owned(RawState::open().unwrap())
    }

    #[test]
    fn test_push_and_pop_balance() {
        let lua = open();
        let raw = lua.0;
        assert_eq!(raw.top(), 0);

        raw.push_integer(1);
        raw.push_boolean(true);
        raw.push_bytes(b"abc");
        assert_eq!(raw.top(), 3);

        raw.pop(2);
        assert_eq!(raw.top(), 1);
        raw.pop(0);
        assert_eq!(raw.top(), 1);
    }

    #[test]
    fn test_type_at_guards_out_of_range() {
        let lua = open();
        let raw = lua.0;
        raw.push_nil();

        assert_eq!(raw.type_at(1), ffi::LUA_TNIL);
        assert_eq!(raw.type_at(-1), ffi::LUA_TNIL);
        assert_eq!(raw.type_at(0), ffi::LUA_TNONE);
        assert_eq!(raw.type_at(2), ffi::LUA_TNONE);
        assert_eq!(raw.type_at(-2), ffi::LUA_TNONE);
        assert_eq!(raw.type_at(i32::MIN), ffi::LUA_TNONE);
    }

    #[test]
    fn test_registry_roundtrip() {
        let lua = open();
        let raw = lua.0;

        raw.push_integer(99);
        let slot = raw.reference_top();
        assert_ne!(slot, LUA_NOREF);
        assert_eq!(raw.top(), 0);

        assert_eq!(raw.push_registry(slot), ffi::LUA_TNUMBER);
        assert_eq!(raw.to_integer(-1), Some(99));
        raw.pop(1);
        raw.unreference(slot);
        assert_eq!(raw.top(), 0);
    }

    #[test]
    fn test_rotate_moves_block_to_top() {
        let lua = open();
        let raw = lua.0;
        for value in 1..=4 {
            raw.push_integer(value);
        }

        // [1, 2, 3, 4] -> [1, 4, 2, 3]
        raw.rotate(2, 1);
        let values: Vec<_> = (1..=4).map(|i| raw.to_integer(i).unwrap()).collect();
        assert_eq!(values, vec![1, 4, 2, 3]);
    }

    #[test]
    fn test_load_buffer_status() {
        let lua = open();
        let raw = lua.0;

        assert_eq!(raw.load_buffer(b"return 1", c"=ok"), ffi::LUA_OK);
        assert_eq!(raw.type_at(-1), ffi::LUA_TFUNCTION);
        raw.pop(1);

        assert_eq!(raw.load_buffer(b"return +", c"=bad"), ffi::LUA_ERRSYNTAX);
        assert_eq!(raw.type_at(-1), ffi::LUA_TSTRING);
        raw.pop(1);
    }

    #[test]
    fn test_global_access_is_protected() {
        let lua = open();
        let raw = lua.0;
        raw.open_libs();
        let strict = b"setmetatable(_G, { __index = function(_, k) error('undefined ' .. k) end, \
                       __newindex = function(_, k) error('assign ' .. k) end })";
        assert_eq!(raw.load_buffer(strict, c"=strict"), ffi::LUA_OK);
        assert_eq!(raw.pcall(0, 0), ffi::LUA_OK);

        assert_eq!(raw.get_global(c"missing"), ffi::LUA_ERRRUN);
        assert_eq!(raw.type_at(-1), ffi::LUA_TSTRING);
        raw.pop(1);

        raw.push_integer(1);
        assert_eq!(raw.set_global(c"fresh"), ffi::LUA_ERRRUN);
        assert_eq!(raw.top(), 1);
        raw.pop(1);

        assert_eq!(raw.get_global(c"print"), ffi::LUA_OK);
        assert_eq!(raw.type_at(-1), ffi::LUA_TFUNCTION);
        raw.pop(1);
        assert_eq!(raw.top(), 0);
    }
}
