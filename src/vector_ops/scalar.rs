//! Array-backed reference family. Runs everywhere and defines the expected
//! lane semantics the hardware families are tested against.

use super::{FloatVector, IntVector, SimdVector, VectorFamily};

/// Bits of `MASK` consumed per output lane for a `lanes`-wide shuffle.
#[inline(always)]
const fn selector_bits(lanes: usize) -> u32 {
    lanes.trailing_zeros()
}

#[inline(always)]
const fn lane_selector(mask: i32, lane: usize, lanes: usize) -> usize {
    ((mask as u32 >> (lane as u32 * selector_bits(lanes))) as usize) & (lanes - 1)
}

macro_rules! scalar_float {
    ($name:ident, $scalar:ty, $bits:ty, $lanes:expr) => {
        #[derive(Debug, Clone, Copy, PartialEq)]
        pub struct $name(pub [$scalar; $lanes]);

        impl $name {
            #[inline(always)]
            fn map(self, f: impl Fn($scalar) -> $scalar) -> Self {
                Self(self.0.map(f))
            }

            #[inline(always)]
            fn zip_with(self, rhs: Self, f: impl Fn($scalar, $scalar) -> $scalar) -> Self {
                let mut out = self.0;
                for (o, r) in out.iter_mut().zip(rhs.0) {
                    *o = f(*o, r);
                }
                Self(out)
            }

            #[inline(always)]
            fn zip_bits(self, rhs: Self, f: impl Fn($bits, $bits) -> $bits) -> Self {
                self.zip_with(rhs, |a, b| <$scalar>::from_bits(f(a.to_bits(), b.to_bits())))
            }

            #[inline(always)]
            fn mask(flag: bool) -> $scalar {
                <$scalar>::from_bits(if flag { <$bits>::MAX } else { 0 })
            }
        }

        impl SimdVector for $name {
            type Scalar = $scalar;
            const LANES: usize = $lanes;

            #[inline(always)]
            fn splat(value: $scalar) -> Self {
                Self([value; $lanes])
            }

            #[inline(always)]
            fn load(src: &[$scalar]) -> Self {
                let mut lanes = [0.0; $lanes];
                lanes.copy_from_slice(&src[..$lanes]);
                Self(lanes)
            }

            #[inline(always)]
            fn store(self, dst: &mut [$scalar]) {
                dst[..$lanes].copy_from_slice(&self.0);
            }

            #[inline(always)]
            fn add(self, rhs: Self) -> Self {
                self.zip_with(rhs, |a, b| a + b)
            }

            #[inline(always)]
            fn sub(self, rhs: Self) -> Self {
                self.zip_with(rhs, |a, b| a - b)
            }

            #[inline(always)]
            fn and(self, rhs: Self) -> Self {
                self.zip_bits(rhs, |a, b| a & b)
            }

            #[inline(always)]
            fn and_not(self, rhs: Self) -> Self {
                self.zip_bits(rhs, |a, b| !a & b)
            }

            #[inline(always)]
            fn or(self, rhs: Self) -> Self {
                self.zip_bits(rhs, |a, b| a | b)
            }

            #[inline(always)]
            fn xor(self, rhs: Self) -> Self {
                self.zip_bits(rhs, |a, b| a ^ b)
            }

            #[inline(always)]
            fn cmp_eq(self, rhs: Self) -> Self {
                self.zip_with(rhs, |a, b| Self::mask(a == b))
            }

            #[inline(always)]
            fn cmp_gt(self, rhs: Self) -> Self {
                self.zip_with(rhs, |a, b| Self::mask(a > b))
            }

            #[inline(always)]
            fn cmp_lt(self, rhs: Self) -> Self {
                self.zip_with(rhs, |a, b| Self::mask(a < b))
            }
        }

        impl FloatVector for $name {
            #[inline(always)]
            fn one() -> Self {
                Self::splat(1.0)
            }

            #[inline(always)]
            fn mul(self, rhs: Self) -> Self {
                self.zip_with(rhs, |a, b| a * b)
            }

            #[inline(always)]
            fn div(self, rhs: Self) -> Self {
                self.zip_with(rhs, |a, b| a / b)
            }

            #[inline(always)]
            fn min(self, rhs: Self) -> Self {
                self.zip_with(rhs, |a, b| if a < b { a } else { b })
            }

            #[inline(always)]
            fn max(self, rhs: Self) -> Self {
                self.zip_with(rhs, |a, b| if a > b { a } else { b })
            }

            #[inline(always)]
            fn sqrt(self) -> Self {
                self.map(<$scalar>::sqrt)
            }

            #[inline(always)]
            fn cmp_neq(self, rhs: Self) -> Self {
                self.zip_with(rhs, |a, b| Self::mask(a != b))
            }

            #[inline(always)]
            fn reduce_add(self) -> $scalar {
                self.0.iter().sum()
            }

            #[inline(always)]
            fn shuffle<const MASK: i32>(self, other: Self) -> Self {
                let mut out = self.0;
                for (lane, o) in out.iter_mut().enumerate() {
                    let src = if lane < $lanes / 2 { &self.0 } else { &other.0 };
                    *o = src[lane_selector(MASK, lane, $lanes)];
                }
                Self(out)
            }
        }
    };
}

macro_rules! scalar_int {
    ($name:ident, $scalar:ty, $unsigned:ty, $lanes:expr) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub struct $name(pub [$scalar; $lanes]);

        impl $name {
            #[inline(always)]
            fn map(self, f: impl Fn($scalar) -> $scalar) -> Self {
                Self(self.0.map(f))
            }

            #[inline(always)]
            fn zip_with(self, rhs: Self, f: impl Fn($scalar, $scalar) -> $scalar) -> Self {
                let mut out = self.0;
                for (o, r) in out.iter_mut().zip(rhs.0) {
                    *o = f(*o, r);
                }
                Self(out)
            }

            #[inline(always)]
            fn mask(flag: bool) -> $scalar {
                if flag {
                    -1
                } else {
                    0
                }
            }
        }

        impl SimdVector for $name {
            type Scalar = $scalar;
            const LANES: usize = $lanes;

            #[inline(always)]
            fn splat(value: $scalar) -> Self {
                Self([value; $lanes])
            }

            #[inline(always)]
            fn load(src: &[$scalar]) -> Self {
                let mut lanes = [0; $lanes];
                lanes.copy_from_slice(&src[..$lanes]);
                Self(lanes)
            }

            #[inline(always)]
            fn store(self, dst: &mut [$scalar]) {
                dst[..$lanes].copy_from_slice(&self.0);
            }

            #[inline(always)]
            fn add(self, rhs: Self) -> Self {
                self.zip_with(rhs, <$scalar>::wrapping_add)
            }

            #[inline(always)]
            fn sub(self, rhs: Self) -> Self {
                self.zip_with(rhs, <$scalar>::wrapping_sub)
            }

            #[inline(always)]
            fn and(self, rhs: Self) -> Self {
                self.zip_with(rhs, |a, b| a & b)
            }

            #[inline(always)]
            fn and_not(self, rhs: Self) -> Self {
                self.zip_with(rhs, |a, b| !a & b)
            }

            #[inline(always)]
            fn or(self, rhs: Self) -> Self {
                self.zip_with(rhs, |a, b| a | b)
            }

            #[inline(always)]
            fn xor(self, rhs: Self) -> Self {
                self.zip_with(rhs, |a, b| a ^ b)
            }

            #[inline(always)]
            fn cmp_eq(self, rhs: Self) -> Self {
                self.zip_with(rhs, |a, b| Self::mask(a == b))
            }

            #[inline(always)]
            fn cmp_gt(self, rhs: Self) -> Self {
                self.zip_with(rhs, |a, b| Self::mask(a > b))
            }

            #[inline(always)]
            fn cmp_lt(self, rhs: Self) -> Self {
                self.zip_with(rhs, |a, b| Self::mask(a < b))
            }
        }

        impl IntVector for $name {
            #[inline(always)]
            fn shift_left<const BITS: i32>(self) -> Self {
                self.map(|a| (a as $unsigned).checked_shl(BITS as u32).unwrap_or(0) as $scalar)
            }

            #[inline(always)]
            fn shift_right<const BITS: i32>(self) -> Self {
                self.map(|a| (a as $unsigned).checked_shr(BITS as u32).unwrap_or(0) as $scalar)
            }

            #[inline(always)]
            fn shift_right_arith<const BITS: i32>(self) -> Self {
                let bits = (BITS as u32).min(<$scalar>::BITS - 1);
                self.map(|a| a >> bits)
            }

            #[inline(always)]
            fn permute<const MASK: i32>(self) -> Self {
                let mut out = self.0;
                for (lane, o) in out.iter_mut().enumerate() {
                    *o = self.0[lane_selector(MASK, lane, $lanes)];
                }
                Self(out)
            }

            #[inline(always)]
            fn min(self, rhs: Self) -> Self {
                self.zip_with(rhs, Ord::min)
            }

            #[inline(always)]
            fn max(self, rhs: Self) -> Self {
                self.zip_with(rhs, Ord::max)
            }
        }
    };
}

scalar_float!(F32x4, f32, u32, 4);
scalar_float!(F64x2, f64, u64, 2);
scalar_int!(I32x4, i32, u32, 4);
scalar_int!(I64x2, i64, u64, 2);

/// The always-available reference family.
pub struct Scalar;

impl VectorFamily for Scalar {
    const NAME: &'static str = "scalar";
    const VECTORIZED: bool = false;

    type F32 = F32x4;
    type F64 = F64x2;
    type I32 = I32x4;
    type I64 = I64x2;

    fn is_available() -> bool {
        true
    }

    #[inline(always)]
    fn f32_from_i32(v: I32x4) -> F32x4 {
        F32x4(v.0.map(|x| x as f32))
    }

    #[inline(always)]
    fn i32_from_f32_round(v: F32x4) -> I32x4 {
        I32x4(v.0.map(|x| x.round_ties_even() as i32))
    }

    #[inline(always)]
    fn i32_from_f32_trunc(v: F32x4) -> I32x4 {
        I32x4(v.0.map(|x| x as i32))
    }

    #[inline(always)]
    fn f64_from_f32(v: F32x4) -> F64x2 {
        F64x2([v.0[0] as f64, v.0[1] as f64])
    }

    #[inline(always)]
    fn f32_from_f64(v: F64x2) -> F32x4 {
        F32x4([v.0[0] as f32, v.0[1] as f32, 0.0, 0.0])
    }

    #[inline(always)]
    fn f64_from_i32(v: I32x4) -> F64x2 {
        F64x2([v.0[0] as f64, v.0[1] as f64])
    }

    #[inline(always)]
    fn i32_from_f64_round(v: F64x2) -> I32x4 {
        I32x4([
            v.0[0].round_ties_even() as i32,
            v.0[1].round_ties_even() as i32,
            0,
            0,
        ])
    }

    #[inline(always)]
    fn i32_from_f64_trunc(v: F64x2) -> I32x4 {
        I32x4([v.0[0] as i32, v.0[1] as i32, 0, 0])
    }

    #[inline(always)]
    fn i64_from_f64_trunc(v: F64x2) -> I64x2 {
        I64x2(v.0.map(|x| x as i64))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn masks_are_all_ones() {
        let m = F32x4::splat(1.0).cmp_eq(F32x4::splat(1.0));
        assert!(m.0.iter().all(|x| x.to_bits() == u32::MAX));
        let m = I64x2::splat(3).cmp_gt(I64x2::splat(2));
        assert_eq!(m.0, [-1, -1]);
    }

    #[test]
    fn oversized_shifts_saturate() {
        let v = I32x4::splat(-8);
        assert_eq!(v.shift_left::<32>().0, [0; 4]);
        assert_eq!(v.shift_right::<32>().0, [0; 4]);
        assert_eq!(v.shift_right_arith::<40>().0, [-1; 4]);
    }

    #[test]
    fn float_min_prefers_second_operand_on_nan() {
        let a = F32x4::splat(f32::NAN);
        let b = F32x4::splat(2.0);
        assert_eq!(a.min(b).0, [2.0; 4]);
        assert_eq!(a.max(b).0, [2.0; 4]);
    }
}
