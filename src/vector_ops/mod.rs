//! Cross-platform SIMD primitives.
//!
//! Every instruction family exposes the same operation set per element width
//! (`f32`, `f64`, `i32`, `i64`) through the [`SimdVector`], [`FloatVector`]
//! and [`IntVector`] traits. A [`VectorFamily`] bundles the four vector types
//! of one family together with the int/float conversions.
//!
//! Operations that some families lack natively (masked select, signed 32-bit
//! min/max) have default implementations built from and/and_not/or and a
//! greater-than mask. Families with a native instruction override them, and
//! both must agree bit for bit.
//!
//! Backends:
//! - [`scalar::Scalar`]: plain arrays, always available.
//! - `sse2::Sse2`: x86/x86_64 builds with SSE2 enabled.
//! - `neon::Neon`: aarch64 builds with NEON enabled.
//! - `portable::Portable`: `std::simd`, behind the `simd` feature. When the
//!   feature is on it replaces the target family as [`Native`].

use once_cell::sync::Lazy;

pub mod scalar;

#[cfg(all(
    any(target_arch = "x86", target_arch = "x86_64"),
    target_feature = "sse2"
))]
pub mod sse2;

#[cfg(all(target_arch = "aarch64", target_feature = "neon"))]
pub mod neon;

#[cfg(feature = "simd")]
pub mod portable;

/// The family the SIMD kernel runs on.
#[cfg(feature = "simd")]
pub type Native = portable::Portable;

/// The family the SIMD kernel runs on.
#[cfg(all(
    not(feature = "simd"),
    any(target_arch = "x86", target_arch = "x86_64"),
    target_feature = "sse2"
))]
pub type Native = sse2::Sse2;

/// The family the SIMD kernel runs on.
#[cfg(all(
    not(feature = "simd"),
    target_arch = "aarch64",
    target_feature = "neon"
))]
pub type Native = neon::Neon;

/// The family the SIMD kernel runs on.
#[cfg(all(
    not(feature = "simd"),
    not(any(
        all(
            any(target_arch = "x86", target_arch = "x86_64"),
            target_feature = "sse2"
        ),
        all(target_arch = "aarch64", target_feature = "neon")
    ))
))]
pub type Native = scalar::Scalar;

/// Operations shared by every element type.
///
/// Comparisons return a mask vector: all bits set in lanes where the
/// comparison holds, all bits clear elsewhere.
pub trait SimdVector: Copy + Sized + 'static {
    type Scalar: Copy + Default + PartialEq + core::fmt::Debug;

    const LANES: usize;

    fn splat(value: Self::Scalar) -> Self;

    fn zero() -> Self {
        Self::splat(Self::Scalar::default())
    }

    /// Unaligned load of the first `LANES` elements of `src`.
    ///
    /// Panics if `src` is shorter than `LANES`.
    fn load(src: &[Self::Scalar]) -> Self;

    /// Unaligned store into the first `LANES` elements of `dst`.
    ///
    /// Panics if `dst` is shorter than `LANES`.
    fn store(self, dst: &mut [Self::Scalar]);

    fn add(self, rhs: Self) -> Self;
    fn sub(self, rhs: Self) -> Self;

    fn and(self, rhs: Self) -> Self;
    /// `(!self) & rhs`, matching the SSE operand order.
    fn and_not(self, rhs: Self) -> Self;
    fn or(self, rhs: Self) -> Self;
    fn xor(self, rhs: Self) -> Self;

    fn cmp_eq(self, rhs: Self) -> Self;
    fn cmp_gt(self, rhs: Self) -> Self;
    fn cmp_lt(self, rhs: Self) -> Self;

    /// Lanes of `other` where `mask` is set, lanes of `self` elsewhere.
    fn select(self, other: Self, mask: Self) -> Self {
        emulated_select(self, other, mask)
    }
}

/// Floating-point lanes.
pub trait FloatVector: SimdVector {
    /// Every lane set to 1.0.
    fn one() -> Self;

    fn mul(self, rhs: Self) -> Self;
    fn div(self, rhs: Self) -> Self;
    fn min(self, rhs: Self) -> Self;
    fn max(self, rhs: Self) -> Self;
    fn sqrt(self) -> Self;
    fn cmp_neq(self, rhs: Self) -> Self;

    /// Sum of all lanes. Summation order is backend specific.
    fn reduce_add(self) -> Self::Scalar;

    /// Two-operand shuffle with the SSE immediate encoding.
    ///
    /// Four lanes: `[self[m0], self[m1], other[m2], other[m3]]` with two bits
    /// of `MASK` per lane. Two lanes: `[self[bit0], other[bit1]]`.
    fn shuffle<const MASK: i32>(self, other: Self) -> Self;

    /// 1.0 where equal, 0.0 elsewhere.
    fn eq_truth(self, rhs: Self) -> Self {
        Self::one().and(self.cmp_eq(rhs))
    }

    /// 1.0 where not equal, 0.0 elsewhere.
    fn neq_truth(self, rhs: Self) -> Self {
        Self::one().sub(self.cmp_eq(rhs).and(Self::one()))
    }

    /// 1.0 where `self > rhs`, 0.0 elsewhere.
    fn gt_truth(self, rhs: Self) -> Self {
        Self::one().and(self.cmp_gt(rhs))
    }

    /// 1.0 where `self < rhs`, 0.0 elsewhere.
    fn lt_truth(self, rhs: Self) -> Self {
        Self::one().and(self.cmp_lt(rhs))
    }
}

/// Signed integer lanes. Arithmetic wraps.
pub trait IntVector: SimdVector {
    /// Shift every lane left by `BITS`.
    fn shift_left<const BITS: i32>(self) -> Self;
    /// Logical right shift (zero fill).
    fn shift_right<const BITS: i32>(self) -> Self;
    /// Arithmetic right shift (sign fill).
    fn shift_right_arith<const BITS: i32>(self) -> Self;

    /// Single-operand lane permute. Four lanes take two bits of `MASK` per
    /// output lane, two lanes take one bit.
    fn permute<const MASK: i32>(self) -> Self;

    fn min(self, rhs: Self) -> Self {
        emulated_min(self, rhs)
    }

    fn max(self, rhs: Self) -> Self {
        emulated_max(self, rhs)
    }
}

/// One instruction family: its four vector types and the conversions
/// between them.
pub trait VectorFamily: 'static {
    const NAME: &'static str;
    /// False for the scalar reference family.
    const VECTORIZED: bool;

    type F32: FloatVector<Scalar = f32>;
    type F64: FloatVector<Scalar = f64>;
    type I32: IntVector<Scalar = i32>;
    type I64: IntVector<Scalar = i64>;

    /// Runtime check that the running CPU supports this family.
    fn is_available() -> bool;

    fn f32_from_i32(v: Self::I32) -> Self::F32;
    /// Round half to even.
    fn i32_from_f32_round(v: Self::F32) -> Self::I32;
    /// Round toward zero.
    fn i32_from_f32_trunc(v: Self::F32) -> Self::I32;

    /// Widens the low lanes of `v`.
    fn f64_from_f32(v: Self::F32) -> Self::F64;
    /// Narrows into the low lanes; remaining lanes are zero.
    fn f32_from_f64(v: Self::F64) -> Self::F32;

    /// Converts the low lanes of `v`.
    fn f64_from_i32(v: Self::I32) -> Self::F64;
    /// Round half to even into the low lanes; remaining lanes are zero.
    fn i32_from_f64_round(v: Self::F64) -> Self::I32;
    /// Round toward zero into the low lanes; remaining lanes are zero.
    fn i32_from_f64_trunc(v: Self::F64) -> Self::I32;

    fn i64_from_f64_trunc(v: Self::F64) -> Self::I64;
}

/// `mask ? b : a` from and/and_not/or.
#[inline(always)]
pub fn emulated_select<V: SimdVector>(a: V, b: V, mask: V) -> V {
    mask.and_not(a).or(b.and(mask))
}

/// Signed minimum from a greater-than mask.
#[inline(always)]
pub fn emulated_min<V: SimdVector>(a: V, b: V) -> V {
    let t = a.cmp_gt(b);
    t.and(b).or(t.and_not(a))
}

/// Signed maximum from a greater-than mask.
#[inline(always)]
pub fn emulated_max<V: SimdVector>(a: V, b: V) -> V {
    let t = a.cmp_gt(b);
    t.and_not(b).or(t.and(a))
}

static SIMD_AVAILABLE: Lazy<bool> =
    Lazy::new(|| !cfg!(feature = "force-scalar") && Native::VECTORIZED && Native::is_available());

/// Whether the SIMD kernel may be used on this machine.
///
/// Detection runs once per process; later calls read the cached answer.
pub fn simd_available() -> bool {
    *SIMD_AVAILABLE
}

/// Name of the family the SIMD path would use, or `"scalar"`.
pub fn detected_backend() -> &'static str {
    if simd_available() {
        Native::NAME
    } else {
        scalar::Scalar::NAME
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn f32_lanes<V: FloatVector<Scalar = f32>>(v: V) -> [f32; 4] {
        let mut out = [0.0; 4];
        v.store(&mut out);
        out
    }

    fn i32_lanes<V: IntVector<Scalar = i32>>(v: V) -> [i32; 4] {
        let mut out = [0; 4];
        v.store(&mut out);
        out
    }

    fn check_float_family<F: VectorFamily>() {
        let a = F::F32::load(&[1.0, -2.0, 3.5, 0.0]);
        let b = F::F32::load(&[1.0, 4.0, -3.5, 0.0]);

        assert_eq!(f32_lanes(a.add(b)), [2.0, 2.0, 0.0, 0.0]);
        assert_eq!(f32_lanes(a.mul(b)), [1.0, -8.0, -12.25, 0.0]);
        assert_eq!(f32_lanes(a.min(b)), [1.0, -2.0, -3.5, 0.0]);
        assert_eq!(f32_lanes(a.max(b)), [1.0, 4.0, 3.5, 0.0]);
        assert_eq!(f32_lanes(a.eq_truth(b)), [1.0, 0.0, 0.0, 1.0]);
        assert_eq!(f32_lanes(a.neq_truth(b)), [0.0, 1.0, 1.0, 0.0]);
        assert_eq!(f32_lanes(a.gt_truth(b)), [0.0, 0.0, 1.0, 0.0]);
        assert_eq!(f32_lanes(a.lt_truth(b)), [0.0, 1.0, 0.0, 0.0]);
        assert_eq!(a.reduce_add(), 2.5);

        let mask = a.cmp_gt(b);
        assert_eq!(f32_lanes(a.select(b, mask)), [1.0, -2.0, -3.5, 0.0]);
        assert_eq!(
            f32_lanes(a.select(b, mask)),
            f32_lanes(emulated_select(a, b, mask))
        );

        // [a2, a3, b0, b1]
        let shuffled = a.shuffle::<0b01_00_11_10>(b);
        assert_eq!(f32_lanes(shuffled), [3.5, 0.0, 1.0, 4.0]);
    }

    fn check_int_family<F: VectorFamily>() {
        let a = F::I32::load(&[5, -7, i32::MIN, 0]);
        let b = F::I32::load(&[3, 9, i32::MAX, -1]);

        assert_eq!(i32_lanes(a.min(b)), [3, -7, i32::MIN, -1]);
        assert_eq!(i32_lanes(a.max(b)), [5, 9, i32::MAX, 0]);
        assert_eq!(i32_lanes(a.min(b)), i32_lanes(emulated_min(a, b)));
        assert_eq!(i32_lanes(a.max(b)), i32_lanes(emulated_max(a, b)));

        let mask = a.cmp_lt(b);
        assert_eq!(i32_lanes(mask), [0, -1, -1, 0]);
        assert_eq!(i32_lanes(a.select(b, mask)), i32_lanes(emulated_select(a, b, mask)));

        assert_eq!(i32_lanes(a.shift_left::<1>()), [10, -14, 0, 0]);
        assert_eq!(i32_lanes(a.shift_right_arith::<1>()), [2, -4, i32::MIN / 2, 0]);
        assert_eq!(
            i32_lanes(a.shift_right::<28>()),
            [0, ((-7i32 as u32) >> 28) as i32, 8, 0]
        );
        assert_eq!(i32_lanes(a.permute::<0b00_01_10_11>()), [0, i32::MIN, -7, 5]);
    }

    fn check_conversions<F: VectorFamily>() {
        let f = F::F32::load(&[1.5, 2.5, -1.5, -2.7]);
        assert_eq!(i32_lanes(F::i32_from_f32_round(f)), [2, 2, -2, -3]);
        assert_eq!(i32_lanes(F::i32_from_f32_trunc(f)), [1, 2, -1, -2]);

        let i = F::I32::load(&[3, -4, 5, 6]);
        assert_eq!(f32_lanes(F::f32_from_i32(i)), [3.0, -4.0, 5.0, 6.0]);

        let mut wide = [0.0f64; 2];
        F::f64_from_f32(f).store(&mut wide);
        assert_eq!(wide, [1.5, 2.5]);
        F::f64_from_i32(i).store(&mut wide);
        assert_eq!(wide, [3.0, -4.0]);

        let d = F::F64::load(&[0.5, -7.9]);
        assert_eq!(f32_lanes(F::f32_from_f64(d)), [0.5, -7.9f64 as f32, 0.0, 0.0]);
        assert_eq!(i32_lanes(F::i32_from_f64_round(d)), [0, -8, 0, 0]);
        assert_eq!(i32_lanes(F::i32_from_f64_trunc(d)), [0, -7, 0, 0]);

        let mut longs = [0i64; 2];
        F::i64_from_f64_trunc(F::F64::load(&[1.0e12, -3.99])).store(&mut longs);
        assert_eq!(longs, [1_000_000_000_000, -3]);
    }

    fn check_wide_lanes<F: VectorFamily>() {
        let a = F::F64::load(&[2.0, -1.0]);
        let b = F::F64::load(&[2.0, 3.0]);
        let mut out = [0.0f64; 2];
        a.eq_truth(b).store(&mut out);
        assert_eq!(out, [1.0, 0.0]);
        a.shuffle::<0b10>(b).store(&mut out);
        assert_eq!(out, [2.0, 3.0]);
        assert_eq!(a.add(b).reduce_add(), 6.0);

        let x = F::I64::load(&[-5, 1 << 40]);
        let y = F::I64::load(&[4, 1 << 41]);
        let mut longs = [0i64; 2];
        x.min(y).store(&mut longs);
        assert_eq!(longs, [-5, 1 << 40]);
        x.max(y).store(&mut longs);
        assert_eq!(longs, [4, 1 << 41]);
        x.shift_right_arith::<2>().store(&mut longs);
        assert_eq!(longs, [-2, 1 << 38]);
        x.permute::<0b01>().store(&mut longs);
        assert_eq!(longs, [1 << 40, -5]);
    }

    fn check_family<F: VectorFamily>() {
        check_float_family::<F>();
        check_int_family::<F>();
        check_conversions::<F>();
        check_wide_lanes::<F>();
    }

    #[test]
    fn scalar_family_semantics() {
        check_family::<scalar::Scalar>();
    }

    #[test]
    fn native_family_semantics() {
        if Native::is_available() {
            check_family::<Native>();
        }
    }

    #[cfg(feature = "simd")]
    #[test]
    fn portable_family_semantics() {
        check_family::<portable::Portable>();
    }

    #[test]
    fn detection_is_stable() {
        let first = simd_available();
        for _ in 0..4 {
            assert_eq!(simd_available(), first);
        }
        let name = detected_backend();
        assert!(
            ["scalar", "sse2", "neon", "portable"].contains(&name),
            "unexpected backend {name}"
        );
    }

    #[cfg(all(feature = "simd", not(feature = "force-scalar")))]
    #[test]
    fn simd_feature_runs_on_portable() {
        assert_eq!(Native::NAME, "portable");
        assert_eq!(detected_backend(), "portable");
        assert_eq!(crate::kernel::Kernel::select(false).backend(), "portable");
    }
}
