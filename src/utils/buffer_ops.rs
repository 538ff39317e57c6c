use crate::error::{ConvolveError, Result};
use crate::vector_ops::{FloatVector, SimdVector, VectorFamily};

pub type NarrowFn = fn(&[f64], &mut [f32]);
pub type WidenFn = fn(&[f32], &mut [f64]);

/// Allocates `len` zeroed samples, reporting failure instead of aborting.
pub fn try_zeroed(len: usize, what: &'static str) -> Result<Box<[f32]>> {
    let mut samples = Vec::new();
    samples
        .try_reserve_exact(len)
        .map_err(|_| ConvolveError::AllocationFailed { what, samples: len })?;
    samples.resize(len, 0.0);
    Ok(samples.into_boxed_slice())
}

/// Converts `input` to single precision, four samples per step.
pub fn narrow<F: VectorFamily>(input: &[f64], output: &mut [f32]) {
    debug_assert!(input.len() >= output.len());

    let chunks = output.len() / 4;
    let remainder = output.len() % 4;

    for i in 0..chunks {
        let offset = i * 4;
        let low = F::f32_from_f64(F::F64::load(&input[offset..offset + 2]));
        let high = F::f32_from_f64(F::F64::load(&input[offset + 2..offset + 4]));
        // [low0, low1, high0, high1]
        low.shuffle::<0b01_00_01_00>(high)
            .store(&mut output[offset..offset + 4]);
    }

    let start = chunks * 4;
    for i in 0..remainder {
        output[start + i] = input[start + i] as f32;
    }
}

/// Converts `input` to double precision, four samples per step.
pub fn widen<F: VectorFamily>(input: &[f32], output: &mut [f64]) {
    debug_assert!(input.len() >= output.len());

    let chunks = output.len() / 4;
    let remainder = output.len() % 4;

    for i in 0..chunks {
        let offset = i * 4;
        let v = F::F32::load(&input[offset..offset + 4]);
        F::f64_from_f32(v).store(&mut output[offset..offset + 2]);
        F::f64_from_f32(v.shuffle::<0b11_10_11_10>(v)).store(&mut output[offset + 2..offset + 4]);
    }

    let start = chunks * 4;
    for i in 0..remainder {
        output[start + i] = input[start + i] as f64;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vector_ops::{scalar::Scalar, Native};

    #[test]
    fn test_narrow_and_widen() {
        let wide = vec![0.5, -1.25, 3.0, 1.0e-3, 7.5, -2.0, 0.1];
        let mut single = vec![0.0f32; 7];
        let mut back = vec![0.0f64; 7];

        narrow::<Scalar>(&wide, &mut single);
        assert_eq!(single, wide.iter().map(|&x| x as f32).collect::<Vec<_>>());

        widen::<Scalar>(&single, &mut back);
        assert_eq!(back, single.iter().map(|&x| x as f64).collect::<Vec<_>>());
    }

    #[test]
    fn test_native_conversions_match_scalar() {
        let wide: Vec<f64> = (0..37).map(|i| (i as f64 * 0.37).sin() * 1.0e3).collect();
        let mut expected = vec![0.0f32; wide.len()];
        let mut actual = vec![0.0f32; wide.len()];
        narrow::<Scalar>(&wide, &mut expected);
        narrow::<Native>(&wide, &mut actual);
        assert_eq!(expected, actual);

        let mut expected_wide = vec![0.0f64; wide.len()];
        let mut actual_wide = vec![0.0f64; wide.len()];
        widen::<Scalar>(&expected, &mut expected_wide);
        widen::<Native>(&expected, &mut actual_wide);
        assert_eq!(expected_wide, actual_wide);
    }

    #[test]
    fn test_try_zeroed() {
        let buffer = try_zeroed(64, "test").unwrap();
        assert_eq!(buffer.len(), 64);
        assert!(buffer.iter().all(|&x| x == 0.0));

        let err = try_zeroed(usize::MAX / 2, "huge").unwrap_err();
        assert!(matches!(
            err,
            ConvolveError::AllocationFailed { what: "huge", .. }
        ));
    }
}
