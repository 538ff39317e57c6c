//! Block convolution kernels.
//!
//! Both kernels compute, for every output sample `i`,
//!
//! ```text
//! output[i] = sum_j taps[j] * window[i + 1 + j]      j in 0..taps.len()
//! ```
//!
//! where `window` is the history slice returned by
//! [`HistoryRing::ingest`](crate::history::HistoryRing::ingest) with
//! `lookback == taps.len()`. Because the taps are stored reversed this is the
//! causal convolution of the input with the original impulse.
//!
//! `taps.len()` must be a multiple of [`IMPULSE_PADDING`]. An empty tap slice
//! produces silence.

use log::debug;

use crate::impulse::IMPULSE_PADDING;
use crate::utils::{narrow, widen, NarrowFn, WidenFn};
use crate::vector_ops::{self, scalar::Scalar, FloatVector, Native, VectorFamily};

pub type KernelFn = fn(window: &[f32], taps: &[f32], output: &mut [f32]);

/// Reference kernel, eight taps per step.
pub fn convolve_scalar(window: &[f32], taps: &[f32], output: &mut [f32]) {
    debug_assert_eq!(window.len(), taps.len() + output.len());
    debug_assert_eq!(taps.len() % IMPULSE_PADDING, 0);

    let len = taps.len();
    for (i, out) in output.iter_mut().enumerate() {
        let history = &window[i + 1..i + 1 + len];
        let mut accum = 0.0f32;
        for (h, x) in taps.chunks_exact(8).zip(history.chunks_exact(8)) {
            accum += h[0] * x[0];
            accum += h[1] * x[1];
            accum += h[2] * x[2];
            accum += h[3] * x[3];
            accum += h[4] * x[4];
            accum += h[5] * x[5];
            accum += h[6] * x[6];
            accum += h[7] * x[7];
        }
        *out = accum;
    }
}

/// Vector kernel: sixteen taps per step as four 4-lane multiplies into one
/// accumulator, reduced once per output sample. History loads are unaligned.
pub fn convolve_vectorized<V: FloatVector<Scalar = f32>>(
    window: &[f32],
    taps: &[f32],
    output: &mut [f32],
) {
    debug_assert_eq!(V::LANES, 4);
    debug_assert_eq!(window.len(), taps.len() + output.len());
    debug_assert_eq!(taps.len() % IMPULSE_PADDING, 0);

    let len = taps.len();
    for (i, out) in output.iter_mut().enumerate() {
        let history = &window[i + 1..i + 1 + len];
        let mut accum = V::zero();
        for (h, x) in taps.chunks_exact(16).zip(history.chunks_exact(16)) {
            accum = accum.add(V::load(&h[0..4]).mul(V::load(&x[0..4])));
            accum = accum.add(V::load(&h[4..8]).mul(V::load(&x[4..8])));
            accum = accum.add(V::load(&h[8..12]).mul(V::load(&x[8..12])));
            accum = accum.add(V::load(&h[12..16]).mul(V::load(&x[12..16])));
        }
        *out = accum.reduce_add();
    }
}

/// The per-stream choice of kernel and precision converters, fixed at
/// construction.
#[derive(Clone, Copy)]
pub struct Kernel {
    convolve: KernelFn,
    narrow: NarrowFn,
    widen: WidenFn,
    backend: &'static str,
}

impl Kernel {
    /// The vector kernel when the CPU supports it and `force_scalar` is off,
    /// otherwise the scalar kernel.
    pub fn select(force_scalar: bool) -> Self {
        let kernel = if !force_scalar && vector_ops::simd_available() {
            Self::for_family::<Native>()
        } else {
            Self::scalar()
        };
        debug!("convolution kernel: {}", kernel.backend);
        kernel
    }

    pub fn scalar() -> Self {
        Self {
            convolve: convolve_scalar,
            narrow: narrow::<Scalar>,
            widen: widen::<Scalar>,
            backend: Scalar::NAME,
        }
    }

    /// Vector kernel for family `F`. The caller must ensure `F::is_available()`.
    pub fn for_family<F: VectorFamily>() -> Self {
        Self {
            convolve: convolve_vectorized::<F::F32>,
            narrow: narrow::<F>,
            widen: widen::<F>,
            backend: F::NAME,
        }
    }

    /// Name of the family this kernel runs on.
    pub fn backend(&self) -> &'static str {
        self.backend
    }

    #[inline]
    pub fn convolve(&self, window: &[f32], taps: &[f32], output: &mut [f32]) {
        (self.convolve)(window, taps, output)
    }

    #[inline]
    pub fn narrow(&self, input: &[f64], output: &mut [f32]) {
        (self.narrow)(input, output)
    }

    #[inline]
    pub fn widen(&self, input: &[f32], output: &mut [f64]) {
        (self.widen)(input, output)
    }
}

impl std::fmt::Debug for Kernel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Kernel").field("backend", &self.backend).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::impulse::{padded_length, MAX_IMPULSE_LENGTH};
    use no_denormals::no_denormals;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    /// Builds reversed, left-padded taps and a window from a forward impulse
    /// and the samples `x[-padded..block)`.
    fn setup(impulse: &[f32], signal: &[f32], block: usize) -> (Vec<f32>, Vec<f32>) {
        let padded = padded_length(impulse.len());
        let mut taps = vec![0.0; padded];
        for (k, &s) in impulse.iter().rev().enumerate() {
            taps[padded - impulse.len() + k] = s;
        }
        assert_eq!(signal.len(), padded + block);
        (taps, signal.to_vec())
    }

    /// Direct double-precision convolution of the block with the forward
    /// impulse, plus the matching magnitude sum for tolerance scaling.
    fn reference(impulse: &[f32], window: &[f32], block: usize) -> Vec<(f64, f64)> {
        let lookback = window.len() - block;
        (0..block)
            .map(|i| {
                let now = lookback + i;
                impulse.iter().enumerate().fold((0.0, 0.0), |(sum, mag), (k, &h)| {
                    let x = window[now - k] as f64;
                    (sum + h as f64 * x, mag + (h as f64 * x).abs())
                })
            })
            .collect()
    }

    fn random_vec(rng: &mut StdRng, len: usize) -> Vec<f32> {
        (0..len).map(|_| rng.random_range(-1.0..1.0)).collect()
    }

    fn check_against_reference(kernel: KernelFn, seed: u64) {
        let mut rng = StdRng::seed_from_u64(seed);
        for (length, block) in [(1, 1), (7, 16), (16, 64), (33, 32), (300, 128), (1000, 256)] {
            let impulse = random_vec(&mut rng, length);
            let signal = random_vec(&mut rng, padded_length(length) + block);
            let (taps, window) = setup(&impulse, &signal, block);

            let mut output = vec![0.0; block];
            kernel(&window, &taps, &mut output);

            for (i, (&got, (want, mag))) in output.iter().zip(reference(&impulse, &window, block)).enumerate() {
                let tolerance = 1e-5 * mag.max(1.0);
                assert!(
                    (got as f64 - want).abs() <= tolerance,
                    "length {length} block {block} sample {i}: {got} vs {want}"
                );
            }
        }
    }

    #[test]
    fn scalar_kernel_matches_reference() {
        check_against_reference(convolve_scalar, 7);
    }

    #[test]
    fn vector_kernel_matches_reference() {
        check_against_reference(convolve_vectorized::<<Scalar as VectorFamily>::F32>, 11);
        if <Native as VectorFamily>::is_available() {
            check_against_reference(convolve_vectorized::<<Native as VectorFamily>::F32>, 11);
        }
    }

    #[test]
    fn kernels_agree_at_maximum_length() {
        let mut rng = StdRng::seed_from_u64(2044);
        let impulse = random_vec(&mut rng, MAX_IMPULSE_LENGTH);
        let block = 64;
        let signal = random_vec(&mut rng, padded_length(MAX_IMPULSE_LENGTH) + block);
        let (taps, window) = setup(&impulse, &signal, block);

        let mut scalar = vec![0.0; block];
        let mut vector = vec![0.0; block];
        convolve_scalar(&window, &taps, &mut scalar);
        Kernel::select(false).convolve(&window, &taps, &mut vector);

        for ((&s, &v), (_, mag)) in scalar.iter().zip(&vector).zip(reference(&impulse, &window, block)) {
            assert!((s as f64 - v as f64).abs() <= 1e-4 * mag.max(1.0), "{s} vs {v}");
        }
    }

    #[test]
    fn empty_impulse_is_silent() {
        let window = [1.0, 2.0, 3.0, 4.0];
        let mut output = [9.0; 4];
        convolve_scalar(&window, &[], &mut output);
        assert_eq!(output, [0.0; 4]);

        let mut output = [9.0; 4];
        Kernel::select(false).convolve(&window, &[], &mut output);
        assert_eq!(output, [0.0; 4]);
    }

    #[test]
    fn unit_impulse_is_identity() {
        let (taps, window) = setup(&[1.0], &(0..24).map(|i| i as f32).collect::<Vec<_>>(), 8);
        let mut output = [0.0; 8];
        Kernel::select(false).convolve(&window, &taps, &mut output);
        assert_eq!(output, [16.0, 17.0, 18.0, 19.0, 20.0, 21.0, 22.0, 23.0]);
    }

    #[test]
    fn subnormal_input_stays_finite() {
        let mut rng = StdRng::seed_from_u64(3);
        let impulse: Vec<f32> = random_vec(&mut rng, 256).iter().map(|x| x * 1.0e-20).collect();
        let signal: Vec<f32> = (0..256 + 64).map(|i| f32::MIN_POSITIVE * (i % 7) as f32 * 0.1).collect();
        let (taps, window) = setup(&impulse, &signal, 64);

        let mut output = vec![1.0; 64];
        no_denormals(|| Kernel::select(false).convolve(&window, &taps, &mut output));
        assert!(output.iter().all(|x| x.is_finite() && x.abs() < 1.0e-30));
    }

    #[test]
    fn forced_scalar_reports_scalar_backend() {
        assert_eq!(Kernel::select(true).backend(), "scalar");
        assert_eq!(Kernel::scalar().backend(), "scalar");
    }
}
