//! Scalar element types that can be read from and written to engine arrays

use std::fmt;

use bytemuck::Pod;
use snapview_sdk::DType;

/// A plain scalar with a matching [`DType`]
///
/// `Pod` guarantees every bit pattern is valid, so typed slices can be
/// reinterpreted from engine memory without validation.
pub trait Element: Pod + PartialEq + fmt::Debug {
    const DTYPE: DType;
}

macro_rules! impl_element {
    ($($ty:ty => $dtype:ident),* $(,)?) => {
        $(
            impl Element for $ty {
                const DTYPE: DType = DType::$dtype;
            }
        )*
    };
}

impl_element! {
    f32 => F32,
    f64 => F64,
    i32 => I32,
    u32 => U32,
    i64 => I64,
    u64 => U64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_element_dtypes() {
        assert_eq!(<f64 as Element>::DTYPE, DType::F64);
        assert_eq!(<u32 as Element>::DTYPE, DType::U32);
        assert_eq!(std::mem::size_of::<i64>(), <i64 as Element>::DTYPE.size());
    }
}
