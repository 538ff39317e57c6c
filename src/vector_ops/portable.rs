//! `std::simd` family. Needs a nightly toolchain and the `simd` feature.

use std::simd::cmp::{SimdOrd, SimdPartialEq, SimdPartialOrd};
use std::simd::num::SimdFloat;
use std::simd::{f32x4, f64x2, i32x4, i64x2, u32x4, u64x2, StdFloat};

use super::{FloatVector, IntVector, SimdVector, VectorFamily};

#[derive(Debug, Clone, Copy)]
pub struct F32x4(f32x4);

#[derive(Debug, Clone, Copy)]
pub struct F64x2(f64x2);

#[derive(Debug, Clone, Copy)]
pub struct I32x4(i32x4);

#[derive(Debug, Clone, Copy)]
pub struct I64x2(i64x2);

macro_rules! portable_float {
    ($name:ident, $inner:ident, $scalar:ty, $bits:ident, $lanes:expr) => {
        impl $name {
            #[inline(always)]
            fn bits(self) -> $bits {
                self.0.to_bits()
            }

            #[inline(always)]
            fn from_bits(bits: $bits) -> Self {
                Self($inner::from_bits(bits))
            }
        }

        impl SimdVector for $name {
            type Scalar = $scalar;
            const LANES: usize = $lanes;

            #[inline(always)]
            fn splat(value: $scalar) -> Self {
                Self($inner::splat(value))
            }

            #[inline(always)]
            fn load(src: &[$scalar]) -> Self {
                Self($inner::from_slice(src))
            }

            #[inline(always)]
            fn store(self, dst: &mut [$scalar]) {
                self.0.copy_to_slice(&mut dst[..$lanes]);
            }

            #[inline(always)]
            fn add(self, rhs: Self) -> Self {
                Self(self.0 + rhs.0)
            }

            #[inline(always)]
            fn sub(self, rhs: Self) -> Self {
                Self(self.0 - rhs.0)
            }

            #[inline(always)]
            fn and(self, rhs: Self) -> Self {
                Self::from_bits(self.bits() & rhs.bits())
            }

            #[inline(always)]
            fn and_not(self, rhs: Self) -> Self {
                Self::from_bits(!self.bits() & rhs.bits())
            }

            #[inline(always)]
            fn or(self, rhs: Self) -> Self {
                Self::from_bits(self.bits() | rhs.bits())
            }

            #[inline(always)]
            fn xor(self, rhs: Self) -> Self {
                Self::from_bits(self.bits() ^ rhs.bits())
            }

            #[inline(always)]
            fn cmp_eq(self, rhs: Self) -> Self {
                Self::from_bits(self.0.simd_eq(rhs.0).to_int().cast())
            }

            #[inline(always)]
            fn cmp_gt(self, rhs: Self) -> Self {
                Self::from_bits(self.0.simd_gt(rhs.0).to_int().cast())
            }

            #[inline(always)]
            fn cmp_lt(self, rhs: Self) -> Self {
                Self::from_bits(self.0.simd_lt(rhs.0).to_int().cast())
            }

            #[inline(always)]
            fn select(self, other: Self, mask: Self) -> Self {
                let mask = mask.bits().simd_ne($bits::splat(0));
                Self(mask.select(other.0, self.0))
            }
        }

        impl FloatVector for $name {
            #[inline(always)]
            fn one() -> Self {
                Self::splat(1.0)
            }

            #[inline(always)]
            fn mul(self, rhs: Self) -> Self {
                Self(self.0 * rhs.0)
            }

            #[inline(always)]
            fn div(self, rhs: Self) -> Self {
                Self(self.0 / rhs.0)
            }

            #[inline(always)]
            fn min(self, rhs: Self) -> Self {
                Self(self.0.simd_lt(rhs.0).select(self.0, rhs.0))
            }

            #[inline(always)]
            fn max(self, rhs: Self) -> Self {
                Self(self.0.simd_gt(rhs.0).select(self.0, rhs.0))
            }

            #[inline(always)]
            fn sqrt(self) -> Self {
                Self(self.0.sqrt())
            }

            #[inline(always)]
            fn cmp_neq(self, rhs: Self) -> Self {
                Self::from_bits(self.0.simd_ne(rhs.0).to_int().cast())
            }

            #[inline(always)]
            fn reduce_add(self) -> $scalar {
                self.0.reduce_sum()
            }

            fn shuffle<const MASK: i32>(self, other: Self) -> Self {
                let (a, b) = (self.0.to_array(), other.0.to_array());
                let bits = ($lanes as usize).trailing_zeros();
                let mut out = a;
                for (lane, o) in out.iter_mut().enumerate() {
                    let index = ((MASK as u32 >> (lane as u32 * bits)) as usize) & ($lanes - 1);
                    *o = if lane < $lanes / 2 { a[index] } else { b[index] };
                }
                Self($inner::from_array(out))
            }
        }
    };
}

macro_rules! portable_int {
    ($name:ident, $inner:ident, $scalar:ty, $unsigned:ident, $lanes:expr) => {
        impl SimdVector for $name {
            type Scalar = $scalar;
            const LANES: usize = $lanes;

            #[inline(always)]
            fn splat(value: $scalar) -> Self {
                Self($inner::splat(value))
            }

            #[inline(always)]
            fn load(src: &[$scalar]) -> Self {
                Self($inner::from_slice(src))
            }

            #[inline(always)]
            fn store(self, dst: &mut [$scalar]) {
                self.0.copy_to_slice(&mut dst[..$lanes]);
            }

            #[inline(always)]
            fn add(self, rhs: Self) -> Self {
                Self(self.0 + rhs.0)
            }

            #[inline(always)]
            fn sub(self, rhs: Self) -> Self {
                Self(self.0 - rhs.0)
            }

            #[inline(always)]
            fn and(self, rhs: Self) -> Self {
                Self(self.0 & rhs.0)
            }

            #[inline(always)]
            fn and_not(self, rhs: Self) -> Self {
                Self(!self.0 & rhs.0)
            }

            #[inline(always)]
            fn or(self, rhs: Self) -> Self {
                Self(self.0 | rhs.0)
            }

            #[inline(always)]
            fn xor(self, rhs: Self) -> Self {
                Self(self.0 ^ rhs.0)
            }

            #[inline(always)]
            fn cmp_eq(self, rhs: Self) -> Self {
                Self(self.0.simd_eq(rhs.0).to_int().cast())
            }

            #[inline(always)]
            fn cmp_gt(self, rhs: Self) -> Self {
                Self(self.0.simd_gt(rhs.0).to_int().cast())
            }

            #[inline(always)]
            fn cmp_lt(self, rhs: Self) -> Self {
                Self(self.0.simd_lt(rhs.0).to_int().cast())
            }

            #[inline(always)]
            fn select(self, other: Self, mask: Self) -> Self {
                let mask = mask.0.simd_ne($inner::splat(0));
                Self(mask.select(other.0, self.0))
            }
        }

        impl IntVector for $name {
            #[inline(always)]
            fn shift_left<const BITS: i32>(self) -> Self {
                if BITS as u32 >= <$scalar>::BITS {
                    return Self::zero();
                }
                Self(self.0 << $inner::splat(BITS as $scalar))
            }

            #[inline(always)]
            fn shift_right<const BITS: i32>(self) -> Self {
                if BITS as u32 >= <$scalar>::BITS {
                    return Self::zero();
                }
                let bits: $unsigned = self.0.cast();
                Self((bits >> $unsigned::splat(BITS as _)).cast())
            }

            #[inline(always)]
            fn shift_right_arith<const BITS: i32>(self) -> Self {
                let bits = (BITS as u32).min(<$scalar>::BITS - 1);
                Self(self.0 >> $inner::splat(bits as $scalar))
            }

            fn permute<const MASK: i32>(self) -> Self {
                let a = self.0.to_array();
                let bits = ($lanes as usize).trailing_zeros();
                let mut out = a;
                for (lane, o) in out.iter_mut().enumerate() {
                    *o = a[((MASK as u32 >> (lane as u32 * bits)) as usize) & ($lanes - 1)];
                }
                Self($inner::from_array(out))
            }

            #[inline(always)]
            fn min(self, rhs: Self) -> Self {
                Self(self.0.simd_min(rhs.0))
            }

            #[inline(always)]
            fn max(self, rhs: Self) -> Self {
                Self(self.0.simd_max(rhs.0))
            }
        }
    };
}

portable_float!(F32x4, f32x4, f32, u32x4, 4);
portable_float!(F64x2, f64x2, f64, u64x2, 2);
portable_int!(I32x4, i32x4, i32, u32x4, 4);
portable_int!(I64x2, i64x2, i64, u64x2, 2);

/// `std::simd` with four-lane `f32` and two-lane `f64` vectors.
pub struct Portable;

impl VectorFamily for Portable {
    const NAME: &'static str = "portable";
    const VECTORIZED: bool = true;

    type F32 = F32x4;
    type F64 = F64x2;
    type I32 = I32x4;
    type I64 = I64x2;

    fn is_available() -> bool {
        true
    }

    fn f32_from_i32(v: I32x4) -> F32x4 {
        F32x4(v.0.cast())
    }

    fn i32_from_f32_round(v: F32x4) -> I32x4 {
        I32x4(v.0.to_array().map(|x| x.round_ties_even() as i32).into())
    }

    fn i32_from_f32_trunc(v: F32x4) -> I32x4 {
        I32x4(v.0.cast())
    }

    fn f64_from_f32(v: F32x4) -> F64x2 {
        let a = v.0.to_array();
        F64x2(f64x2::from_array([a[0] as f64, a[1] as f64]))
    }

    fn f32_from_f64(v: F64x2) -> F32x4 {
        let a = v.0.to_array();
        F32x4(f32x4::from_array([a[0] as f32, a[1] as f32, 0.0, 0.0]))
    }

    fn f64_from_i32(v: I32x4) -> F64x2 {
        let a = v.0.to_array();
        F64x2(f64x2::from_array([a[0] as f64, a[1] as f64]))
    }

    fn i32_from_f64_round(v: F64x2) -> I32x4 {
        let a = v.0.to_array();
        I32x4(i32x4::from_array([
            a[0].round_ties_even() as i32,
            a[1].round_ties_even() as i32,
            0,
            0,
        ]))
    }

    fn i32_from_f64_trunc(v: F64x2) -> I32x4 {
        let a = v.0.to_array();
        I32x4(i32x4::from_array([a[0] as i32, a[1] as i32, 0, 0]))
    }

    fn i64_from_f64_trunc(v: F64x2) -> I64x2 {
        I64x2(v.0.cast())
    }
}
