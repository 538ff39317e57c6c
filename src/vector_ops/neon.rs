//! NEON family for aarch64. Has native bit-select and signed 32-bit min/max.
#![allow(unused_unsafe)]

use std::arch::aarch64::*;

use super::{FloatVector, IntVector, SimdVector, VectorFamily};

#[derive(Debug, Clone, Copy)]
pub struct F32x4(float32x4_t);

#[derive(Debug, Clone, Copy)]
pub struct F64x2(float64x2_t);

#[derive(Debug, Clone, Copy)]
pub struct I32x4(int32x4_t);

#[derive(Debug, Clone, Copy)]
pub struct I64x2(int64x2_t);

#[inline(always)]
fn f32_bits(v: float32x4_t) -> uint32x4_t {
    unsafe { vreinterpretq_u32_f32(v) }
}

#[inline(always)]
fn f32_from_bits(v: uint32x4_t) -> float32x4_t {
    unsafe { vreinterpretq_f32_u32(v) }
}

#[inline(always)]
fn f64_bits(v: float64x2_t) -> uint64x2_t {
    unsafe { vreinterpretq_u64_f64(v) }
}

#[inline(always)]
fn f64_from_bits(v: uint64x2_t) -> float64x2_t {
    unsafe { vreinterpretq_f64_u64(v) }
}

impl SimdVector for F32x4 {
    type Scalar = f32;
    const LANES: usize = 4;

    #[inline(always)]
    fn splat(value: f32) -> Self {
        Self(unsafe { vdupq_n_f32(value) })
    }

    #[inline(always)]
    fn load(src: &[f32]) -> Self {
        assert!(src.len() >= 4);
        // SAFETY: four readable floats checked above.
        Self(unsafe { vld1q_f32(src.as_ptr()) })
    }

    #[inline(always)]
    fn store(self, dst: &mut [f32]) {
        assert!(dst.len() >= 4);
        // SAFETY: four writable floats checked above.
        unsafe { vst1q_f32(dst.as_mut_ptr(), self.0) }
    }

    #[inline(always)]
    fn add(self, rhs: Self) -> Self {
        Self(unsafe { vaddq_f32(self.0, rhs.0) })
    }

    #[inline(always)]
    fn sub(self, rhs: Self) -> Self {
        Self(unsafe { vsubq_f32(self.0, rhs.0) })
    }

    #[inline(always)]
    fn and(self, rhs: Self) -> Self {
        Self(f32_from_bits(unsafe { vandq_u32(f32_bits(self.0), f32_bits(rhs.0)) }))
    }

    #[inline(always)]
    fn and_not(self, rhs: Self) -> Self {
        Self(f32_from_bits(unsafe { vbicq_u32(f32_bits(rhs.0), f32_bits(self.0)) }))
    }

    #[inline(always)]
    fn or(self, rhs: Self) -> Self {
        Self(f32_from_bits(unsafe { vorrq_u32(f32_bits(self.0), f32_bits(rhs.0)) }))
    }

    #[inline(always)]
    fn xor(self, rhs: Self) -> Self {
        Self(f32_from_bits(unsafe { veorq_u32(f32_bits(self.0), f32_bits(rhs.0)) }))
    }

    #[inline(always)]
    fn cmp_eq(self, rhs: Self) -> Self {
        Self(f32_from_bits(unsafe { vceqq_f32(self.0, rhs.0) }))
    }

    #[inline(always)]
    fn cmp_gt(self, rhs: Self) -> Self {
        Self(f32_from_bits(unsafe { vcgtq_f32(self.0, rhs.0) }))
    }

    #[inline(always)]
    fn cmp_lt(self, rhs: Self) -> Self {
        Self(f32_from_bits(unsafe { vcltq_f32(self.0, rhs.0) }))
    }

    #[inline(always)]
    fn select(self, other: Self, mask: Self) -> Self {
        Self(unsafe { vbslq_f32(f32_bits(mask.0), other.0, self.0) })
    }
}

impl FloatVector for F32x4 {
    #[inline(always)]
    fn one() -> Self {
        Self::splat(1.0)
    }

    #[inline(always)]
    fn mul(self, rhs: Self) -> Self {
        Self(unsafe { vmulq_f32(self.0, rhs.0) })
    }

    #[inline(always)]
    fn div(self, rhs: Self) -> Self {
        Self(unsafe { vdivq_f32(self.0, rhs.0) })
    }

    #[inline(always)]
    fn min(self, rhs: Self) -> Self {
        Self(unsafe { vminq_f32(self.0, rhs.0) })
    }

    #[inline(always)]
    fn max(self, rhs: Self) -> Self {
        Self(unsafe { vmaxq_f32(self.0, rhs.0) })
    }

    #[inline(always)]
    fn sqrt(self) -> Self {
        Self(unsafe { vsqrtq_f32(self.0) })
    }

    #[inline(always)]
    fn cmp_neq(self, rhs: Self) -> Self {
        Self(f32_from_bits(unsafe { vmvnq_u32(vceqq_f32(self.0, rhs.0)) }))
    }

    #[inline(always)]
    fn reduce_add(self) -> f32 {
        unsafe { vaddvq_f32(self.0) }
    }

    fn shuffle<const MASK: i32>(self, other: Self) -> Self {
        let (mut a, mut b) = ([0.0f32; 4], [0.0f32; 4]);
        self.store(&mut a);
        other.store(&mut b);
        let pick = |lane: i32| ((MASK >> (2 * lane)) & 3) as usize;
        Self::load(&[a[pick(0)], a[pick(1)], b[pick(2)], b[pick(3)]])
    }
}

impl SimdVector for F64x2 {
    type Scalar = f64;
    const LANES: usize = 2;

    #[inline(always)]
    fn splat(value: f64) -> Self {
        Self(unsafe { vdupq_n_f64(value) })
    }

    #[inline(always)]
    fn load(src: &[f64]) -> Self {
        assert!(src.len() >= 2);
        // SAFETY: two readable doubles checked above.
        Self(unsafe { vld1q_f64(src.as_ptr()) })
    }

    #[inline(always)]
    fn store(self, dst: &mut [f64]) {
        assert!(dst.len() >= 2);
        // SAFETY: two writable doubles checked above.
        unsafe { vst1q_f64(dst.as_mut_ptr(), self.0) }
    }

    #[inline(always)]
    fn add(self, rhs: Self) -> Self {
        Self(unsafe { vaddq_f64(self.0, rhs.0) })
    }

    #[inline(always)]
    fn sub(self, rhs: Self) -> Self {
        Self(unsafe { vsubq_f64(self.0, rhs.0) })
    }

    #[inline(always)]
    fn and(self, rhs: Self) -> Self {
        Self(f64_from_bits(unsafe { vandq_u64(f64_bits(self.0), f64_bits(rhs.0)) }))
    }

    #[inline(always)]
    fn and_not(self, rhs: Self) -> Self {
        Self(f64_from_bits(unsafe { vbicq_u64(f64_bits(rhs.0), f64_bits(self.0)) }))
    }

    #[inline(always)]
    fn or(self, rhs: Self) -> Self {
        Self(f64_from_bits(unsafe { vorrq_u64(f64_bits(self.0), f64_bits(rhs.0)) }))
    }

    #[inline(always)]
    fn xor(self, rhs: Self) -> Self {
        Self(f64_from_bits(unsafe { veorq_u64(f64_bits(self.0), f64_bits(rhs.0)) }))
    }

    #[inline(always)]
    fn cmp_eq(self, rhs: Self) -> Self {
        Self(f64_from_bits(unsafe { vceqq_f64(self.0, rhs.0) }))
    }

    #[inline(always)]
    fn cmp_gt(self, rhs: Self) -> Self {
        Self(f64_from_bits(unsafe { vcgtq_f64(self.0, rhs.0) }))
    }

    #[inline(always)]
    fn cmp_lt(self, rhs: Self) -> Self {
        Self(f64_from_bits(unsafe { vcltq_f64(self.0, rhs.0) }))
    }

    #[inline(always)]
    fn select(self, other: Self, mask: Self) -> Self {
        Self(unsafe { vbslq_f64(f64_bits(mask.0), other.0, self.0) })
    }
}

impl FloatVector for F64x2 {
    #[inline(always)]
    fn one() -> Self {
        Self::splat(1.0)
    }

    #[inline(always)]
    fn mul(self, rhs: Self) -> Self {
        Self(unsafe { vmulq_f64(self.0, rhs.0) })
    }

    #[inline(always)]
    fn div(self, rhs: Self) -> Self {
        Self(unsafe { vdivq_f64(self.0, rhs.0) })
    }

    #[inline(always)]
    fn min(self, rhs: Self) -> Self {
        Self(unsafe { vminq_f64(self.0, rhs.0) })
    }

    #[inline(always)]
    fn max(self, rhs: Self) -> Self {
        Self(unsafe { vmaxq_f64(self.0, rhs.0) })
    }

    #[inline(always)]
    fn sqrt(self) -> Self {
        Self(unsafe { vsqrtq_f64(self.0) })
    }

    #[inline(always)]
    fn cmp_neq(self, rhs: Self) -> Self {
        self.cmp_eq(rhs).xor(Self(f64_from_bits(unsafe { vdupq_n_u64(u64::MAX) })))
    }

    #[inline(always)]
    fn reduce_add(self) -> f64 {
        unsafe { vaddvq_f64(self.0) }
    }

    fn shuffle<const MASK: i32>(self, other: Self) -> Self {
        let (mut a, mut b) = ([0.0f64; 2], [0.0f64; 2]);
        self.store(&mut a);
        other.store(&mut b);
        Self::load(&[a[(MASK & 1) as usize], b[((MASK >> 1) & 1) as usize]])
    }
}

impl SimdVector for I32x4 {
    type Scalar = i32;
    const LANES: usize = 4;

    #[inline(always)]
    fn splat(value: i32) -> Self {
        Self(unsafe { vdupq_n_s32(value) })
    }

    #[inline(always)]
    fn load(src: &[i32]) -> Self {
        assert!(src.len() >= 4);
        // SAFETY: four readable ints checked above.
        Self(unsafe { vld1q_s32(src.as_ptr()) })
    }

    #[inline(always)]
    fn store(self, dst: &mut [i32]) {
        assert!(dst.len() >= 4);
        // SAFETY: four writable ints checked above.
        unsafe { vst1q_s32(dst.as_mut_ptr(), self.0) }
    }

    #[inline(always)]
    fn add(self, rhs: Self) -> Self {
        Self(unsafe { vaddq_s32(self.0, rhs.0) })
    }

    #[inline(always)]
    fn sub(self, rhs: Self) -> Self {
        Self(unsafe { vsubq_s32(self.0, rhs.0) })
    }

    #[inline(always)]
    fn and(self, rhs: Self) -> Self {
        Self(unsafe { vandq_s32(self.0, rhs.0) })
    }

    #[inline(always)]
    fn and_not(self, rhs: Self) -> Self {
        Self(unsafe { vbicq_s32(rhs.0, self.0) })
    }

    #[inline(always)]
    fn or(self, rhs: Self) -> Self {
        Self(unsafe { vorrq_s32(self.0, rhs.0) })
    }

    #[inline(always)]
    fn xor(self, rhs: Self) -> Self {
        Self(unsafe { veorq_s32(self.0, rhs.0) })
    }

    #[inline(always)]
    fn cmp_eq(self, rhs: Self) -> Self {
        Self(unsafe { vreinterpretq_s32_u32(vceqq_s32(self.0, rhs.0)) })
    }

    #[inline(always)]
    fn cmp_gt(self, rhs: Self) -> Self {
        Self(unsafe { vreinterpretq_s32_u32(vcgtq_s32(self.0, rhs.0)) })
    }

    #[inline(always)]
    fn cmp_lt(self, rhs: Self) -> Self {
        Self(unsafe { vreinterpretq_s32_u32(vcltq_s32(self.0, rhs.0)) })
    }

    #[inline(always)]
    fn select(self, other: Self, mask: Self) -> Self {
        Self(unsafe { vbslq_s32(vreinterpretq_u32_s32(mask.0), other.0, self.0) })
    }
}

impl IntVector for I32x4 {
    #[inline(always)]
    fn shift_left<const BITS: i32>(self) -> Self {
        Self(unsafe { vshlq_n_s32::<BITS>(self.0) })
    }

    #[inline(always)]
    fn shift_right<const BITS: i32>(self) -> Self {
        Self(unsafe { vreinterpretq_s32_u32(vshrq_n_u32::<BITS>(vreinterpretq_u32_s32(self.0))) })
    }

    #[inline(always)]
    fn shift_right_arith<const BITS: i32>(self) -> Self {
        Self(unsafe { vshrq_n_s32::<BITS>(self.0) })
    }

    fn permute<const MASK: i32>(self) -> Self {
        let mut a = [0i32; 4];
        self.store(&mut a);
        let pick = |lane: i32| ((MASK >> (2 * lane)) & 3) as usize;
        Self::load(&[a[pick(0)], a[pick(1)], a[pick(2)], a[pick(3)]])
    }

    #[inline(always)]
    fn min(self, rhs: Self) -> Self {
        Self(unsafe { vminq_s32(self.0, rhs.0) })
    }

    #[inline(always)]
    fn max(self, rhs: Self) -> Self {
        Self(unsafe { vmaxq_s32(self.0, rhs.0) })
    }
}

impl SimdVector for I64x2 {
    type Scalar = i64;
    const LANES: usize = 2;

    #[inline(always)]
    fn splat(value: i64) -> Self {
        Self(unsafe { vdupq_n_s64(value) })
    }

    #[inline(always)]
    fn load(src: &[i64]) -> Self {
        assert!(src.len() >= 2);
        // SAFETY: two readable longs checked above.
        Self(unsafe { vld1q_s64(src.as_ptr()) })
    }

    #[inline(always)]
    fn store(self, dst: &mut [i64]) {
        assert!(dst.len() >= 2);
        // SAFETY: two writable longs checked above.
        unsafe { vst1q_s64(dst.as_mut_ptr(), self.0) }
    }

    #[inline(always)]
    fn add(self, rhs: Self) -> Self {
        Self(unsafe { vaddq_s64(self.0, rhs.0) })
    }

    #[inline(always)]
    fn sub(self, rhs: Self) -> Self {
        Self(unsafe { vsubq_s64(self.0, rhs.0) })
    }

    #[inline(always)]
    fn and(self, rhs: Self) -> Self {
        Self(unsafe { vandq_s64(self.0, rhs.0) })
    }

    #[inline(always)]
    fn and_not(self, rhs: Self) -> Self {
        Self(unsafe { vbicq_s64(rhs.0, self.0) })
    }

    #[inline(always)]
    fn or(self, rhs: Self) -> Self {
        Self(unsafe { vorrq_s64(self.0, rhs.0) })
    }

    #[inline(always)]
    fn xor(self, rhs: Self) -> Self {
        Self(unsafe { veorq_s64(self.0, rhs.0) })
    }

    #[inline(always)]
    fn cmp_eq(self, rhs: Self) -> Self {
        Self(unsafe { vreinterpretq_s64_u64(vceqq_s64(self.0, rhs.0)) })
    }

    #[inline(always)]
    fn cmp_gt(self, rhs: Self) -> Self {
        Self(unsafe { vreinterpretq_s64_u64(vcgtq_s64(self.0, rhs.0)) })
    }

    #[inline(always)]
    fn cmp_lt(self, rhs: Self) -> Self {
        Self(unsafe { vreinterpretq_s64_u64(vcltq_s64(self.0, rhs.0)) })
    }

    #[inline(always)]
    fn select(self, other: Self, mask: Self) -> Self {
        Self(unsafe { vbslq_s64(vreinterpretq_u64_s64(mask.0), other.0, self.0) })
    }
}

impl IntVector for I64x2 {
    #[inline(always)]
    fn shift_left<const BITS: i32>(self) -> Self {
        Self(unsafe { vshlq_n_s64::<BITS>(self.0) })
    }

    #[inline(always)]
    fn shift_right<const BITS: i32>(self) -> Self {
        Self(unsafe { vreinterpretq_s64_u64(vshrq_n_u64::<BITS>(vreinterpretq_u64_s64(self.0))) })
    }

    #[inline(always)]
    fn shift_right_arith<const BITS: i32>(self) -> Self {
        Self(unsafe { vshrq_n_s64::<BITS>(self.0) })
    }

    fn permute<const MASK: i32>(self) -> Self {
        let mut a = [0i64; 2];
        self.store(&mut a);
        Self::load(&[a[(MASK & 1) as usize], a[((MASK >> 1) & 1) as usize]])
    }
}

/// Advanced SIMD on aarch64.
pub struct Neon;

impl VectorFamily for Neon {
    const NAME: &'static str = "neon";
    const VECTORIZED: bool = true;

    type F32 = F32x4;
    type F64 = F64x2;
    type I32 = I32x4;
    type I64 = I64x2;

    fn is_available() -> bool {
        std::arch::is_aarch64_feature_detected!("neon")
    }

    #[inline(always)]
    fn f32_from_i32(v: I32x4) -> F32x4 {
        F32x4(unsafe { vcvtq_f32_s32(v.0) })
    }

    #[inline(always)]
    fn i32_from_f32_round(v: F32x4) -> I32x4 {
        I32x4(unsafe { vcvtnq_s32_f32(v.0) })
    }

    #[inline(always)]
    fn i32_from_f32_trunc(v: F32x4) -> I32x4 {
        I32x4(unsafe { vcvtq_s32_f32(v.0) })
    }

    #[inline(always)]
    fn f64_from_f32(v: F32x4) -> F64x2 {
        F64x2(unsafe { vcvt_f64_f32(vget_low_f32(v.0)) })
    }

    #[inline(always)]
    fn f32_from_f64(v: F64x2) -> F32x4 {
        F32x4(unsafe { vcombine_f32(vcvt_f32_f64(v.0), vdup_n_f32(0.0)) })
    }

    #[inline(always)]
    fn f64_from_i32(v: I32x4) -> F64x2 {
        F64x2(unsafe { vcvtq_f64_s64(vmovl_s32(vget_low_s32(v.0))) })
    }

    #[inline(always)]
    fn i32_from_f64_round(v: F64x2) -> I32x4 {
        I32x4(unsafe { vcombine_s32(vqmovn_s64(vcvtnq_s64_f64(v.0)), vdup_n_s32(0)) })
    }

    #[inline(always)]
    fn i32_from_f64_trunc(v: F64x2) -> I32x4 {
        I32x4(unsafe { vcombine_s32(vqmovn_s64(vcvtq_s64_f64(v.0)), vdup_n_s32(0)) })
    }

    #[inline(always)]
    fn i64_from_f64_trunc(v: F64x2) -> I64x2 {
        I64x2(unsafe { vcvtq_s64_f64(v.0) })
    }
}
