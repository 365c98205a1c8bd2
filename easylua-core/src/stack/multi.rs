//! 多值编组：参数列表与多返回值

use super::{FromStack, ToStack};
use crate::error::Result;
use crate::state::StateView;

/// 从左到右压入若干值
pub trait ToStackMulti {
    /// 返回压入的数量；失败时已压入的值全部弹出
    fn to_stack_multi(self, state: &StateView) -> Result<i32>;
}

/// 从连续的栈位置读取若干值
pub trait FromStackMulti<'lua>: Sized {
    /// 元组元素个数
    const COUNT: i32;

    /// 依次读取 `first, first + 1, ...`
    fn read_multi(state: &'lua StateView, first: i32) -> Result<Self>;
}

impl<T: ToStack> ToStackMulti for T {
    fn to_stack_multi(self, state: &StateView) -> Result<i32> {
        self.to_stack(state)?;
        Ok(1)
    }
}

impl ToStackMulti for () {
    fn to_stack_multi(self, _state: &StateView) -> Result<i32> {
        Ok(0)
    }
}

impl<'lua> FromStackMulti<'lua> for () {
    const COUNT: i32 = 0;

    fn read_multi(_state: &'lua StateView, _first: i32) -> Result<Self> {
        Ok(())
    }
}

macro_rules! impl_tuple {
    ($($name:ident $var:ident),+) => {
        impl<$($name: ToStack),+> ToStackMulti for ($($name,)+) {
            fn to_stack_multi(self, state: &StateView) -> Result<i32> {
                let ($($var,)+) = self;
                let mut pushed = 0;
                $(
                    if let Err(err) = $var.to_stack(state) {
                        state.pop(pushed);
                        return Err(err);
                    }
                    pushed += 1;
                )+
                Ok(pushed)
            }
        }

        impl<'lua, $($name: FromStack<'lua>),+> FromStackMulti<'lua> for ($($name,)+) {
            const COUNT: i32 = [$(stringify!($name)),+].len() as i32;

            #[allow(unused_assignments)]
            fn read_multi(state: &'lua StateView, first: i32) -> Result<Self> {
                let mut index = first;
                $(
                    let $var = <$name as FromStack<'lua>>::read(state, index)?;
                    index += 1;
                )+
                Ok(($($var,)+))
            }
        }
    };
}

impl_tuple!(A a);
impl_tuple!(A a, B b);
impl_tuple!(A a, B b, C c);
impl_tuple!(A a, B b, C c, D d);
impl_tuple!(A a, B b, C c, D d, E e);
impl_tuple!(A a, B b, C c, D d, E e, F f);
impl_tuple!(A a, B b, C c, D d, E e, F f, G g);
impl_tuple!(A a, B b, C c, D d, E e, F f, G g, H h);
impl_tuple!(A a, B b, C c, D d, E e, F f, G g, H h, I i);
impl_tuple!(A a, B b, C c, D d, E e, F f, G g, H h, I i, J j);
impl_tuple!(A a, B b, C c, D d, E e, F f, G g, H h, I i, J j, K k);
impl_tuple!(A a, B b, C c, D d, E e, F f, G g, H h, I i, J j, K k, L l);
