//! Typed Marshaller
//!
//! 宿主类型与栈上值之间的双向转换：
//! - [`ToStack`]：成功时恰好压入一个值，失败时不压入任何值
//! - [`FromStack`]：只读地查看某个位置，不改变栈高度
//! - [`ToStackMulti`] / [`FromStackMulti`]：参数列表与多返回值（见 `multi`）
//!
//! 数值策略是严格的：宿主整数只能从 `Integer` 读取，宿主浮点只能从
//! `Float` 读取；放不下的整数报 `OutOfRange`。

mod multi;

pub use multi::{FromStackMulti, ToStackMulti};

use crate::error::{Error, Result};
use crate::kind::ValueKind;
use crate::state::StateView;

/// 把宿主值压入栈
pub trait ToStack {
    /// 成功时压入恰好一个值
    fn to_stack(self, state: &StateView) -> Result<()>;
}

/// 从栈上读取宿主值
pub trait FromStack<'lua>: Sized {
    fn read(state: &'lua StateView, index: i32) -> Result<Self>;
}

/// 解释器的 nil
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Nil;

// ===== 单值操作 =====

/// 读取 `index` 处的值
pub fn read<'lua, T: FromStack<'lua>>(state: &'lua StateView, index: i32) -> Result<T> {
    T::read(state, index)
}

/// 压入一个值
pub fn write<T: ToStack>(state: &StateView, value: T) -> Result<()> {
    value.to_stack(state)
}

/// 从左到右压入多个值，返回压入的数量
pub fn write_multi<T: ToStackMulti>(state: &StateView, values: T) -> Result<i32> {
    values.to_stack_multi(state)
}

/// 读取栈顶 N 个值；元组最后一个元素对应栈顶
pub fn read_tuple<'lua, T: FromStackMulti<'lua>>(state: &'lua StateView) -> Result<T> {
    if T::COUNT == 0 {
        return T::read_multi(state, 0);
    }

    let top = state.top();
    if top < T::COUNT {
        return Err(Error::invalid_argument(
            "index",
            format!("stack holds {top} values, {} requested", T::COUNT),
        ));
    }
    T::read_multi(state, top - T::COUNT + 1)
}

/// 读取栈顶值后将其弹出（读取失败时同样弹出）
pub fn pop_value<'lua, T: FromStack<'lua>>(state: &'lua StateView) -> Result<T> {
    if state.top() == 0 {
        return Err(Error::invalid_argument("index", "stack is empty"));
    }
    let value = T::read(state, -1);
    state.pop(1);
    value
}

/// 替换 `index` 处的值；`index == top + 1` 时压入新值
pub fn set<T: ToStack>(state: &StateView, index: i32, value: T) -> Result<()> {
    if index == 0 {
        return Err(Error::invalid_argument(
            "index",
            "stack index 0 is never valid",
        ));
    }

    let top = state.top();
    let absolute = if index > 0 {
        index
    } else {
        top.saturating_add(1).saturating_add(index)
    };

    if index > 0 && absolute == top + 1 {
        return value.to_stack(state);
    }
    if absolute < 1 || absolute > top {
        return Err(Error::invalid_argument(
            "index",
            format!("stack index {index} is out of range (stack height {top})"),
        ));
    }

    value.to_stack(state)?;
    let raw = state.raw();
    raw.copy(-1, absolute);
    raw.pop(1);
    Ok(())
}

// ===== 基本类型 =====

impl ToStack for Nil {
    fn to_stack(self, state: &StateView) -> Result<()> {
        state.ensure_slots(1)?;
        state.raw().push_nil();
        Ok(())
    }
}

impl<'lua> FromStack<'lua> for Nil {
    fn read(state: &'lua StateView, index: i32) -> Result<Self> {
        state.expect_kind(index, ValueKind::Nil)?;
        Ok(Nil)
    }
}

impl ToStack for bool {
    fn to_stack(self, state: &StateView) -> Result<()> {
        state.ensure_slots(1)?;
        state.raw().push_boolean(self);
        Ok(())
    }
}

impl<'lua> FromStack<'lua> for bool {
    fn read(state: &'lua StateView, index: i32) -> Result<Self> {
        state.expect_kind(index, ValueKind::Boolean)?;
        Ok(state.raw().to_boolean(index))
    }
}

macro_rules! impl_integer {
    ($($ty:ty),* $(,)?) => {
        $(
            impl ToStack for $ty {
                fn to_stack(self, state: &StateView) -> Result<()> {
                    let value = i64::try_from(self)
                        .map_err(|_| Error::out_of_range(self, "a Lua integer"))?;
                    state.ensure_slots(1)?;
                    state.raw().push_integer(value);
                    Ok(())
                }
            }

            impl<'lua> FromStack<'lua> for $ty {
                fn read(state: &'lua StateView, index: i32) -> Result<Self> {
                    state.expect_kind(index, ValueKind::Integer)?;
                    let value = state.raw().to_integer(index).ok_or(Error::TypeMismatch {
                        index,
                        actual: ValueKind::Float,
                        expected: ValueKind::Integer,
                    })?;
                    <$ty>::try_from(value).map_err(|_| Error::out_of_range(value, stringify!($ty)))
                }
            }
        )*
    };
}

impl_integer!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);

impl ToStack for f64 {
    fn to_stack(self, state: &StateView) -> Result<()> {
        state.ensure_slots(1)?;
        state.raw().push_number(self);
        Ok(())
    }
}

impl<'lua> FromStack<'lua> for f64 {
    fn read(state: &'lua StateView, index: i32) -> Result<Self> {
        state.expect_kind(index, ValueKind::Float)?;
        Ok(state.raw().to_number(index).unwrap_or(f64::NAN))
    }
}

impl ToStack for f32 {
    fn to_stack(self, state: &StateView) -> Result<()> {
        f64::from(self).to_stack(state)
    }
}

impl<'lua> FromStack<'lua> for f32 {
    fn read(state: &'lua StateView, index: i32) -> Result<Self> {
        let value = f64::read(state, index)?;
        let narrowed = value as f32;
        if value.is_finite() && narrowed.is_infinite() {
            return Err(Error::out_of_range(value, "f32"));
        }
        Ok(narrowed)
    }
}

impl ToStack for &str {
    fn to_stack(self, state: &StateView) -> Result<()> {
        state.ensure_slots(1)?;
        state.raw().push_bytes(self.as_bytes());
        Ok(())
    }
}

impl ToStack for &String {
    fn to_stack(self, state: &StateView) -> Result<()> {
        self.as_str().to_stack(state)
    }
}

impl ToStack for String {
    fn to_stack(self, state: &StateView) -> Result<()> {
        self.as_str().to_stack(state)
    }
}

impl<'lua> FromStack<'lua> for String {
    fn read(state: &'lua StateView, index: i32) -> Result<Self> {
        state.expect_kind(index, ValueKind::String)?;
        let bytes = state.raw().to_bytes(index).unwrap_or_default();
        String::from_utf8(bytes).map_err(|_| {
            Error::Runtime(format!("string at stack index {index} is not valid UTF-8"))
        })
    }
}

impl<T: ToStack> ToStack for Option<T> {
    fn to_stack(self, state: &StateView) -> Result<()> {
        match self {
            Some(value) => value.to_stack(state),
            None => Nil.to_stack(state),
        }
    }
}

impl<'lua, T: FromStack<'lua>> FromStack<'lua> for Option<T> {
    fn read(state: &'lua StateView, index: i32) -> Result<Self> {
        if index == 0 {
            return Err(Error::invalid_argument(
                "index",
                "stack index 0 is never valid",
            ));
        }
        match state.kind_at(index) {
            None | Some(ValueKind::Nil) => Ok(None),
            Some(_) => T::read(state, index).map(Some),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::State;

    #[test]
    fn test_push_exactly_one_value() {
        let state = State::new().unwrap();
        write(&state, 42).unwrap();
        write(&state, 2.5).unwrap();
        write(&state, true).unwrap();
        write(&state, "hi").unwrap();
        write(&state, Nil).unwrap();
        assert_eq!(state.top(), 5);

        assert_eq!(state.kind_at(1), Some(ValueKind::Integer));
        assert_eq!(state.kind_at(2), Some(ValueKind::Float));
        assert_eq!(state.kind_at(3), Some(ValueKind::Boolean));
        assert_eq!(state.kind_at(4), Some(ValueKind::String));
        assert_eq!(state.kind_at(5), Some(ValueKind::Nil));
    }

    #[test]
    fn test_read_is_non_destructive() {
        let state = State::new().unwrap();
        write(&state, 7).unwrap();

        assert_eq!(read::<i32>(&state, -1).unwrap(), 7);
        assert_eq!(read::<i64>(&state, 1).unwrap(), 7);
        assert_eq!(state.top(), 1);
    }

    #[test]
    fn test_read_index_zero_and_missing() {
        let state = State::new().unwrap();
        assert!(matches!(
            read::<i32>(&state, 0),
            Err(Error::InvalidArgument { .. })
        ));
        assert!(matches!(
            read::<i32>(&state, -1),
            Err(Error::InvalidArgument { .. })
        ));
        assert!(matches!(
            read::<i32>(&state, 3),
            Err(Error::InvalidArgument { .. })
        ));
    }

    #[test]
    fn test_strict_numeric_policy() {
        let state = State::new().unwrap();
        write(&state, 3).unwrap();
        write(&state, 3.0).unwrap();

        assert_eq!(
            read::<f64>(&state, 1),
            Err(Error::TypeMismatch {
                index: 1,
                actual: ValueKind::Integer,
                expected: ValueKind::Float,
            })
        );
        assert_eq!(
            read::<i64>(&state, 2),
            Err(Error::TypeMismatch {
                index: 2,
                actual: ValueKind::Float,
                expected: ValueKind::Integer,
            })
        );
    }

    #[test]
    fn test_narrowing_out_of_range() {
        let state = State::new().unwrap();
        write(&state, 300).unwrap();
        write(&state, -1).unwrap();

        assert_eq!(read::<i32>(&state, 1).unwrap(), 300);
        assert_eq!(read::<u8>(&state, 1), Err(Error::out_of_range(300, "u8")));
        assert!(matches!(
            read::<u32>(&state, 2),
            Err(Error::OutOfRange { .. })
        ));
    }

    #[test]
    fn test_push_u64_above_i64_max() {
        let state = State::new().unwrap();
        let result = write(&state, u64::MAX);
        assert!(matches!(result, Err(Error::OutOfRange { .. })));
        assert_eq!(state.top(), 0);

        write(&state, i64::MAX as u64).unwrap();
        assert_eq!(read::<u64>(&state, -1).unwrap(), i64::MAX as u64);
    }

    #[test]
    fn test_f32_roundtrip_and_overflow() {
        let state = State::new().unwrap();
        write(&state, 1.5f32).unwrap();
        write(&state, f64::MAX).unwrap();

        assert_eq!(read::<f32>(&state, 1).unwrap(), 1.5);
        assert!(matches!(
            read::<f32>(&state, 2),
            Err(Error::OutOfRange { .. })
        ));
    }

    #[test]
    fn test_string_variants() {
        let state = State::new().unwrap();
        let owned = String::from("owned");
        write(&state, &owned).unwrap();
        write(&state, owned).unwrap();
        write(&state, "embedded\0nul").unwrap();

        assert_eq!(read::<String>(&state, 1).unwrap(), "owned");
        assert_eq!(read::<String>(&state, 2).unwrap(), "owned");
        assert_eq!(read::<String>(&state, 3).unwrap(), "embedded\0nul");
    }

    #[test]
    fn test_string_does_not_coerce_numbers() {
        let state = State::new().unwrap();
        write(&state, 10).unwrap();
        assert!(matches!(
            read::<String>(&state, -1),
            Err(Error::TypeMismatch { .. })
        ));
        // 读取失败不会把数字原地转换为字符串
        assert_eq!(state.kind_at(-1), Some(ValueKind::Integer));
    }

    #[test]
    fn test_option_reads_nil_and_missing() {
        let state = State::new().unwrap();
        write(&state, None::<i32>).unwrap();
        write(&state, Some(5)).unwrap();

        assert_eq!(read::<Option<i32>>(&state, 1).unwrap(), None);
        assert_eq!(read::<Option<i32>>(&state, 2).unwrap(), Some(5));
        assert_eq!(read::<Option<i32>>(&state, 3).unwrap(), None);
        assert!(read::<Option<i32>>(&state, 0).is_err());
        assert!(matches!(
            read::<Option<String>>(&state, 2),
            Err(Error::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_nil_requires_nil() {
        let state = State::new().unwrap();
        write(&state, false).unwrap();
        assert!(matches!(
            read::<Nil>(&state, -1),
            Err(Error::TypeMismatch { .. })
        ));
        write(&state, Nil).unwrap();
        assert_eq!(read::<Nil>(&state, -1).unwrap(), Nil);
    }

    #[test]
    fn test_pop_value_pops_on_success_and_failure() {
        let state = State::new().unwrap();
        write(&state, "x").unwrap();
        write(&state, 1).unwrap();

        assert_eq!(pop_value::<i32>(&state).unwrap(), 1);
        assert_eq!(state.top(), 1);

        assert!(pop_value::<i32>(&state).is_err());
        assert_eq!(state.top(), 0);

        assert!(matches!(
            pop_value::<i32>(&state),
            Err(Error::InvalidArgument { .. })
        ));
    }

    #[test]
    fn test_set_pushes_then_replaces() {
        let state = State::new().unwrap();
        for (i, value) in [10, 20, 30].into_iter().enumerate() {
            set(&state, i as i32 + 1, value).unwrap();
        }
        assert_eq!(state.top(), 3);

        set(&state, 2, "two").unwrap();
        set(&state, -1, 3.5).unwrap();
        assert_eq!(state.top(), 3);
        assert_eq!(read::<i32>(&state, 1).unwrap(), 10);
        assert_eq!(read::<String>(&state, 2).unwrap(), "two");
        assert_eq!(read::<f64>(&state, 3).unwrap(), 3.5);
    }

    #[test]
    fn test_set_rejects_bad_index() {
        let state = State::new().unwrap();
        assert!(matches!(
            set(&state, 0, 1),
            Err(Error::InvalidArgument { .. })
        ));
        assert!(matches!(
            set(&state, 2, 1),
            Err(Error::InvalidArgument { .. })
        ));
        assert!(matches!(
            set(&state, -1, 1),
            Err(Error::InvalidArgument { .. })
        ));
        assert_eq!(state.top(), 0);
    }

    #[test]
    fn test_read_tuple_reads_top_values() {
        let state = State::new().unwrap();
        write(&state, "below").unwrap();
        write_multi(&state, (1, "two", 3.0)).unwrap();

        let (a, b, c): (i32, String, f64) = read_tuple(&state).unwrap();
        assert_eq!((a, b.as_str(), c), (1, "two", 3.0));
        assert_eq!(state.top(), 4);

        let () = read_tuple(&state).unwrap();
    }

    #[test]
    fn test_read_tuple_on_short_stack() {
        let state = State::new().unwrap();
        write(&state, 1).unwrap();
        assert!(matches!(
            read_tuple::<(i32, i32)>(&state),
            Err(Error::InvalidArgument { .. })
        ));
    }
}
