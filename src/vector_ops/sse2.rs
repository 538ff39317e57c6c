//! SSE2 family for x86 and x86_64.
//!
//! SSE2 has no signed 32-bit min/max, no masked blend and no 64-bit compares,
//! so those fall back to the trait defaults or to per-lane code.
#![allow(unused_unsafe)]

#[cfg(target_arch = "x86")]
use std::arch::x86::*;
#[cfg(target_arch = "x86_64")]
use std::arch::x86_64::*;

use super::{FloatVector, IntVector, SimdVector, VectorFamily};

#[derive(Debug, Clone, Copy)]
pub struct F32x4(__m128);

#[derive(Debug, Clone, Copy)]
pub struct F64x2(__m128d);

#[derive(Debug, Clone, Copy)]
pub struct I32x4(__m128i);

#[derive(Debug, Clone, Copy)]
pub struct I64x2(__m128i);

impl SimdVector for F32x4 {
    type Scalar = f32;
    const LANES: usize = 4;

    #[inline(always)]
    fn splat(value: f32) -> Self {
        Self(unsafe { _mm_set1_ps(value) })
    }

    #[inline(always)]
    fn zero() -> Self {
        Self(unsafe { _mm_setzero_ps() })
    }

    #[inline(always)]
    fn load(src: &[f32]) -> Self {
        assert!(src.len() >= 4);
        // SAFETY: four readable floats checked above; loadu is unaligned.
        Self(unsafe { _mm_loadu_ps(src.as_ptr()) })
    }

    #[inline(always)]
    fn store(self, dst: &mut [f32]) {
        assert!(dst.len() >= 4);
        // SAFETY: four writable floats checked above.
        unsafe { _mm_storeu_ps(dst.as_mut_ptr(), self.0) }
    }

    #[inline(always)]
    fn add(self, rhs: Self) -> Self {
        Self(unsafe { _mm_add_ps(self.0, rhs.0) })
    }

    #[inline(always)]
    fn sub(self, rhs: Self) -> Self {
        Self(unsafe { _mm_sub_ps(self.0, rhs.0) })
    }

    #[inline(always)]
    fn and(self, rhs: Self) -> Self {
        Self(unsafe { _mm_and_ps(self.0, rhs.0) })
    }

    #[inline(always)]
    fn and_not(self, rhs: Self) -> Self {
        Self(unsafe { _mm_andnot_ps(self.0, rhs.0) })
    }

    #[inline(always)]
    fn or(self, rhs: Self) -> Self {
        Self(unsafe { _mm_or_ps(self.0, rhs.0) })
    }

    #[inline(always)]
    fn xor(self, rhs: Self) -> Self {
        Self(unsafe { _mm_xor_ps(self.0, rhs.0) })
    }

    #[inline(always)]
    fn cmp_eq(self, rhs: Self) -> Self {
        Self(unsafe { _mm_cmpeq_ps(self.0, rhs.0) })
    }

    #[inline(always)]
    fn cmp_gt(self, rhs: Self) -> Self {
        Self(unsafe { _mm_cmpgt_ps(self.0, rhs.0) })
    }

    #[inline(always)]
    fn cmp_lt(self, rhs: Self) -> Self {
        Self(unsafe { _mm_cmplt_ps(self.0, rhs.0) })
    }
}

impl FloatVector for F32x4 {
    #[inline(always)]
    fn one() -> Self {
        Self::splat(1.0)
    }

    #[inline(always)]
    fn mul(self, rhs: Self) -> Self {
        Self(unsafe { _mm_mul_ps(self.0, rhs.0) })
    }

    #[inline(always)]
    fn div(self, rhs: Self) -> Self {
        Self(unsafe { _mm_div_ps(self.0, rhs.0) })
    }

    #[inline(always)]
    fn min(self, rhs: Self) -> Self {
        Self(unsafe { _mm_min_ps(self.0, rhs.0) })
    }

    #[inline(always)]
    fn max(self, rhs: Self) -> Self {
        Self(unsafe { _mm_max_ps(self.0, rhs.0) })
    }

    #[inline(always)]
    fn sqrt(self) -> Self {
        Self(unsafe { _mm_sqrt_ps(self.0) })
    }

    #[inline(always)]
    fn cmp_neq(self, rhs: Self) -> Self {
        Self(unsafe { _mm_cmpneq_ps(self.0, rhs.0) })
    }

    #[inline(always)]
    fn reduce_add(self) -> f32 {
        unsafe {
            let high = _mm_movehl_ps(self.0, self.0);
            let pairs = _mm_add_ps(self.0, high);
            let odd = _mm_shuffle_ps::<0b01>(pairs, pairs);
            _mm_cvtss_f32(_mm_add_ss(pairs, odd))
        }
    }

    #[inline(always)]
    fn shuffle<const MASK: i32>(self, other: Self) -> Self {
        Self(unsafe { _mm_shuffle_ps::<MASK>(self.0, other.0) })
    }
}

impl SimdVector for F64x2 {
    type Scalar = f64;
    const LANES: usize = 2;

    #[inline(always)]
    fn splat(value: f64) -> Self {
        Self(unsafe { _mm_set1_pd(value) })
    }

    #[inline(always)]
    fn zero() -> Self {
        Self(unsafe { _mm_setzero_pd() })
    }

    #[inline(always)]
    fn load(src: &[f64]) -> Self {
        assert!(src.len() >= 2);
        // SAFETY: two readable doubles checked above.
        Self(unsafe { _mm_loadu_pd(src.as_ptr()) })
    }

    #[inline(always)]
    fn store(self, dst: &mut [f64]) {
        assert!(dst.len() >= 2);
        // SAFETY: two writable doubles checked above.
        unsafe { _mm_storeu_pd(dst.as_mut_ptr(), self.0) }
    }

    #[inline(always)]
    fn add(self, rhs: Self) -> Self {
        Self(unsafe { _mm_add_pd(self.0, rhs.0) })
    }

    #[inline(always)]
    fn sub(self, rhs: Self) -> Self {
        Self(unsafe { _mm_sub_pd(self.0, rhs.0) })
    }

    #[inline(always)]
    fn and(self, rhs: Self) -> Self {
        Self(unsafe { _mm_and_pd(self.0, rhs.0) })
    }

    #[inline(always)]
    fn and_not(self, rhs: Self) -> Self {
        Self(unsafe { _mm_andnot_pd(self.0, rhs.0) })
    }

    #[inline(always)]
    fn or(self, rhs: Self) -> Self {
        Self(unsafe { _mm_or_pd(self.0, rhs.0) })
    }

    #[inline(always)]
    fn xor(self, rhs: Self) -> Self {
        Self(unsafe { _mm_xor_pd(self.0, rhs.0) })
    }

    #[inline(always)]
    fn cmp_eq(self, rhs: Self) -> Self {
        Self(unsafe { _mm_cmpeq_pd(self.0, rhs.0) })
    }

    #[inline(always)]
    fn cmp_gt(self, rhs: Self) -> Self {
        Self(unsafe { _mm_cmpgt_pd(self.0, rhs.0) })
    }

    #[inline(always)]
    fn cmp_lt(self, rhs: Self) -> Self {
        Self(unsafe { _mm_cmplt_pd(self.0, rhs.0) })
    }
}

impl FloatVector for F64x2 {
    #[inline(always)]
    fn one() -> Self {
        Self::splat(1.0)
    }

    #[inline(always)]
    fn mul(self, rhs: Self) -> Self {
        Self(unsafe { _mm_mul_pd(self.0, rhs.0) })
    }

    #[inline(always)]
    fn div(self, rhs: Self) -> Self {
        Self(unsafe { _mm_div_pd(self.0, rhs.0) })
    }

    #[inline(always)]
    fn min(self, rhs: Self) -> Self {
        Self(unsafe { _mm_min_pd(self.0, rhs.0) })
    }

    #[inline(always)]
    fn max(self, rhs: Self) -> Self {
        Self(unsafe { _mm_max_pd(self.0, rhs.0) })
    }

    #[inline(always)]
    fn sqrt(self) -> Self {
        Self(unsafe { _mm_sqrt_pd(self.0) })
    }

    #[inline(always)]
    fn cmp_neq(self, rhs: Self) -> Self {
        Self(unsafe { _mm_cmpneq_pd(self.0, rhs.0) })
    }

    #[inline(always)]
    fn reduce_add(self) -> f64 {
        unsafe { _mm_cvtsd_f64(_mm_add_sd(self.0, _mm_unpackhi_pd(self.0, self.0))) }
    }

    #[inline(always)]
    fn shuffle<const MASK: i32>(self, other: Self) -> Self {
        Self(unsafe { _mm_shuffle_pd::<MASK>(self.0, other.0) })
    }
}

impl SimdVector for I32x4 {
    type Scalar = i32;
    const LANES: usize = 4;

    #[inline(always)]
    fn splat(value: i32) -> Self {
        Self(unsafe { _mm_set1_epi32(value) })
    }

    #[inline(always)]
    fn zero() -> Self {
        Self(unsafe { _mm_setzero_si128() })
    }

    #[inline(always)]
    fn load(src: &[i32]) -> Self {
        assert!(src.len() >= 4);
        // SAFETY: sixteen readable bytes checked above.
        Self(unsafe { _mm_loadu_si128(src.as_ptr() as *const __m128i) })
    }

    #[inline(always)]
    fn store(self, dst: &mut [i32]) {
        assert!(dst.len() >= 4);
        // SAFETY: sixteen writable bytes checked above.
        unsafe { _mm_storeu_si128(dst.as_mut_ptr() as *mut __m128i, self.0) }
    }

    #[inline(always)]
    fn add(self, rhs: Self) -> Self {
        Self(unsafe { _mm_add_epi32(self.0, rhs.0) })
    }

    #[inline(always)]
    fn sub(self, rhs: Self) -> Self {
        Self(unsafe { _mm_sub_epi32(self.0, rhs.0) })
    }

    #[inline(always)]
    fn and(self, rhs: Self) -> Self {
        Self(unsafe { _mm_and_si128(self.0, rhs.0) })
    }

    #[inline(always)]
    fn and_not(self, rhs: Self) -> Self {
        Self(unsafe { _mm_andnot_si128(self.0, rhs.0) })
    }

    #[inline(always)]
    fn or(self, rhs: Self) -> Self {
        Self(unsafe { _mm_or_si128(self.0, rhs.0) })
    }

    #[inline(always)]
    fn xor(self, rhs: Self) -> Self {
        Self(unsafe { _mm_xor_si128(self.0, rhs.0) })
    }

    #[inline(always)]
    fn cmp_eq(self, rhs: Self) -> Self {
        Self(unsafe { _mm_cmpeq_epi32(self.0, rhs.0) })
    }

    #[inline(always)]
    fn cmp_gt(self, rhs: Self) -> Self {
        Self(unsafe { _mm_cmpgt_epi32(self.0, rhs.0) })
    }

    #[inline(always)]
    fn cmp_lt(self, rhs: Self) -> Self {
        Self(unsafe { _mm_cmplt_epi32(self.0, rhs.0) })
    }
}

impl IntVector for I32x4 {
    #[inline(always)]
    fn shift_left<const BITS: i32>(self) -> Self {
        Self(unsafe { _mm_slli_epi32::<BITS>(self.0) })
    }

    #[inline(always)]
    fn shift_right<const BITS: i32>(self) -> Self {
        Self(unsafe { _mm_srli_epi32::<BITS>(self.0) })
    }

    #[inline(always)]
    fn shift_right_arith<const BITS: i32>(self) -> Self {
        Self(unsafe { _mm_srai_epi32::<BITS>(self.0) })
    }

    #[inline(always)]
    fn permute<const MASK: i32>(self) -> Self {
        Self(unsafe { _mm_shuffle_epi32::<MASK>(self.0) })
    }
}

impl I64x2 {
    #[inline(always)]
    fn lanes(self) -> [i64; 2] {
        let mut out = [0i64; 2];
        self.store(&mut out);
        out
    }

    #[inline(always)]
    fn from_lanes(lanes: [i64; 2]) -> Self {
        Self::load(&lanes)
    }

    #[inline(always)]
    fn compare(self, rhs: Self, f: impl Fn(i64, i64) -> bool) -> Self {
        let (a, b) = (self.lanes(), rhs.lanes());
        Self::from_lanes([
            if f(a[0], b[0]) { -1 } else { 0 },
            if f(a[1], b[1]) { -1 } else { 0 },
        ])
    }
}

impl SimdVector for I64x2 {
    type Scalar = i64;
    const LANES: usize = 2;

    #[inline(always)]
    fn splat(value: i64) -> Self {
        Self(unsafe { _mm_set1_epi64x(value) })
    }

    #[inline(always)]
    fn zero() -> Self {
        Self(unsafe { _mm_setzero_si128() })
    }

    #[inline(always)]
    fn load(src: &[i64]) -> Self {
        assert!(src.len() >= 2);
        // SAFETY: sixteen readable bytes checked above.
        Self(unsafe { _mm_loadu_si128(src.as_ptr() as *const __m128i) })
    }

    #[inline(always)]
    fn store(self, dst: &mut [i64]) {
        assert!(dst.len() >= 2);
        // SAFETY: sixteen writable bytes checked above.
        unsafe { _mm_storeu_si128(dst.as_mut_ptr() as *mut __m128i, self.0) }
    }

    #[inline(always)]
    fn add(self, rhs: Self) -> Self {
        Self(unsafe { _mm_add_epi64(self.0, rhs.0) })
    }

    #[inline(always)]
    fn sub(self, rhs: Self) -> Self {
        Self(unsafe { _mm_sub_epi64(self.0, rhs.0) })
    }

    #[inline(always)]
    fn and(self, rhs: Self) -> Self {
        Self(unsafe { _mm_and_si128(self.0, rhs.0) })
    }

    #[inline(always)]
    fn and_not(self, rhs: Self) -> Self {
        Self(unsafe { _mm_andnot_si128(self.0, rhs.0) })
    }

    #[inline(always)]
    fn or(self, rhs: Self) -> Self {
        Self(unsafe { _mm_or_si128(self.0, rhs.0) })
    }

    #[inline(always)]
    fn xor(self, rhs: Self) -> Self {
        Self(unsafe { _mm_xor_si128(self.0, rhs.0) })
    }

    fn cmp_eq(self, rhs: Self) -> Self {
        self.compare(rhs, |a, b| a == b)
    }

    fn cmp_gt(self, rhs: Self) -> Self {
        self.compare(rhs, |a, b| a > b)
    }

    fn cmp_lt(self, rhs: Self) -> Self {
        self.compare(rhs, |a, b| a < b)
    }
}

impl IntVector for I64x2 {
    #[inline(always)]
    fn shift_left<const BITS: i32>(self) -> Self {
        Self(unsafe { _mm_slli_epi64::<BITS>(self.0) })
    }

    #[inline(always)]
    fn shift_right<const BITS: i32>(self) -> Self {
        Self(unsafe { _mm_srli_epi64::<BITS>(self.0) })
    }

    fn shift_right_arith<const BITS: i32>(self) -> Self {
        let bits = (BITS as u32).min(63);
        Self::from_lanes(self.lanes().map(|x| x >> bits))
    }

    fn permute<const MASK: i32>(self) -> Self {
        let lanes = self.lanes();
        Self::from_lanes([lanes[(MASK & 1) as usize], lanes[((MASK >> 1) & 1) as usize]])
    }
}

/// SSE2 on x86 and x86_64.
pub struct Sse2;

impl VectorFamily for Sse2 {
    const NAME: &'static str = "sse2";
    const VECTORIZED: bool = true;

    type F32 = F32x4;
    type F64 = F64x2;
    type I32 = I32x4;
    type I64 = I64x2;

    fn is_available() -> bool {
        is_x86_feature_detected!("sse2")
    }

    #[inline(always)]
    fn f32_from_i32(v: I32x4) -> F32x4 {
        F32x4(unsafe { _mm_cvtepi32_ps(v.0) })
    }

    #[inline(always)]
    fn i32_from_f32_round(v: F32x4) -> I32x4 {
        I32x4(unsafe { _mm_cvtps_epi32(v.0) })
    }

    #[inline(always)]
    fn i32_from_f32_trunc(v: F32x4) -> I32x4 {
        I32x4(unsafe { _mm_cvttps_epi32(v.0) })
    }

    #[inline(always)]
    fn f64_from_f32(v: F32x4) -> F64x2 {
        F64x2(unsafe { _mm_cvtps_pd(v.0) })
    }

    #[inline(always)]
    fn f32_from_f64(v: F64x2) -> F32x4 {
        F32x4(unsafe { _mm_cvtpd_ps(v.0) })
    }

    #[inline(always)]
    fn f64_from_i32(v: I32x4) -> F64x2 {
        F64x2(unsafe { _mm_cvtepi32_pd(v.0) })
    }

    #[inline(always)]
    fn i32_from_f64_round(v: F64x2) -> I32x4 {
        I32x4(unsafe { _mm_cvtpd_epi32(v.0) })
    }

    #[inline(always)]
    fn i32_from_f64_trunc(v: F64x2) -> I32x4 {
        I32x4(unsafe { _mm_cvttpd_epi32(v.0) })
    }

    fn i64_from_f64_trunc(v: F64x2) -> I64x2 {
        let mut lanes = [0.0f64; 2];
        v.store(&mut lanes);
        I64x2::from_lanes(lanes.map(|x| x as i64))
    }
}
