//! Defines the arithmetic capabilities required of matrix entries.
//!
//! The core trait is [Scalar]: a type with addition, subtraction, multiplication,
//! division and negation, an additive and a multiplicative identity, and a
//! conversion from small integers. Every scalar can also be promoted to an
//! `f64`, which is the working type of numerically sensitive algorithms such as
//! [Matrix::determinant](crate::tensors::matrix::Matrix::determinant).
//!
//! Implementations are provided for the signed integers and the floating-point
//! primitives.
pub mod float;

use std::{
    fmt::{Debug, Display},
    ops::{Add, AddAssign, Div, Mul, MulAssign, Neg, Sub, SubAssign},
};

/// A number that can be stored in a [Matrix](crate::tensors::matrix::Matrix)
/// and used in row operations and products.
pub trait Scalar:
    Clone
    + PartialEq
    + Debug
    + Display
    + Add<Output = Self>
    + Sub<Output = Self>
    + Mul<Output = Self>
    + Div<Output = Self>
    + Neg<Output = Self>
    + AddAssign
    + SubAssign
    + MulAssign
{
    /// The additive identity.
    fn new_zero() -> Self;
    /// The multiplicative identity.
    fn new_one() -> Self;
    /// Convert a small integer. Values outside the range of the type wrap or round.
    fn new_from_i64(a: i64) -> Self;
    /// Promote to a float, possibly losing precision.
    fn to_f64(&self) -> f64;

    #[inline]
    fn is_zero(&self) -> bool {
        *self == Self::new_zero()
    }
}

macro_rules! impl_scalar_int {
    ($($t:ty),*) => {
        $(
            impl Scalar for $t {
                #[inline(always)]
                fn new_zero() -> Self {
                    0
                }

                #[inline(always)]
                fn new_one() -> Self {
                    1
                }

                #[inline(always)]
                fn new_from_i64(a: i64) -> Self {
                    a as $t
                }

                #[inline(always)]
                fn to_f64(&self) -> f64 {
                    *self as f64
                }
            }
        )*
    };
}

macro_rules! impl_scalar_float {
    ($($t:ty),*) => {
        $(
            impl Scalar for $t {
                #[inline(always)]
                fn new_zero() -> Self {
                    0.
                }

                #[inline(always)]
                fn new_one() -> Self {
                    1.
                }

                #[inline(always)]
                fn new_from_i64(a: i64) -> Self {
                    a as $t
                }

                #[inline(always)]
                fn to_f64(&self) -> f64 {
                    *self as f64
                }
            }
        )*
    };
}

impl_scalar_int!(i8, i16, i32, i64, i128, isize);
impl_scalar_float!(f32, f64);

#[cfg(test)]
mod test {
    use super::Scalar;

    fn sum_of_squares<T: Scalar>(n: i64) -> T {
        let mut r = T::new_zero();
        for i in 1..=n {
            let x = T::new_from_i64(i);
            r += x.clone() * x;
        }
        r
    }

    #[test]
    fn identities() {
        assert_eq!(i32::new_zero(), 0);
        assert_eq!(i32::new_one(), 1);
        assert_eq!(f32::new_one(), 1.);
        assert!(0i64.is_zero());
        assert!(!f64::new_one().is_zero());
    }

    #[test]
    fn generic_arithmetic() {
        assert_eq!(sum_of_squares::<i64>(10), 385);
        assert_eq!(sum_of_squares::<f64>(10), 385.);
        assert_eq!((-7i8).to_f64(), -7.);
    }
}
