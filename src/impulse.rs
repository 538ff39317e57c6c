//! Impulse response storage and loading.
//!
//! The stored impulse is time reversed and left padded with zeros up to the
//! next multiple of [`IMPULSE_PADDING`], so the kernel can walk it in whole
//! groups and read history forward:
//!
//! ```text
//! taps:  [ 0 .. 0 | s[L-1] s[L-2] .. s[0] | 0 .. 0 ]
//!          pad      pad_start .. padded     unused
//! ```

use log::warn;

use crate::error::Result;
use crate::source::SampleSource;
use crate::utils::try_zeroed;

/// Stored taps per impulse buffer.
pub const IMPULSE_CAPACITY: usize = 2048;
/// Longest impulse that can be loaded.
pub const MAX_IMPULSE_LENGTH: usize = 2044;
/// Kernel group size; padded lengths are multiples of this.
pub const IMPULSE_PADDING: usize = 16;

/// Smallest multiple of [`IMPULSE_PADDING`] that holds `length` taps.
#[inline]
pub const fn padded_length(length: usize) -> usize {
    length.div_ceil(IMPULSE_PADDING) * IMPULSE_PADDING
}

/// Fixed-capacity, reversed and padded impulse response.
#[derive(Debug, Clone)]
pub struct ImpulseBuffer {
    taps: Box<[f32]>,
    length: usize,
}

impl ImpulseBuffer {
    /// Allocates an empty (all-zero, length 0) impulse buffer.
    pub fn try_new() -> Result<Self> {
        Ok(Self {
            taps: try_zeroed(IMPULSE_CAPACITY, "impulse buffer")?,
            length: 0,
        })
    }

    /// Semantic length in taps.
    pub fn length(&self) -> usize {
        self.length
    }

    pub fn padded_length(&self) -> usize {
        padded_length(self.length)
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// The taps the kernel reads: `padded_length()` reversed samples.
    pub fn taps(&self) -> &[f32] {
        &self.taps[..self.padded_length()]
    }

    /// The whole fixed-capacity storage.
    pub fn storage(&self) -> &[f32] {
        &self.taps
    }

    /// Resets to length 0 with every tap zeroed.
    pub fn clear(&mut self) {
        self.taps.fill(0.0);
        self.length = 0;
    }
}

/// Outcome of [`load_impulse`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadReport {
    /// Taps loaded.
    pub length: usize,
    /// Taps the kernel will read.
    pub padded_length: usize,
    /// 1-based channel actually read after wrapping.
    pub channel: usize,
    /// How many requested samples the source could not provide.
    pub shortfall: Option<usize>,
}

/// Resolves the number of taps to load from a source holding `frames` frames.
///
/// Returns the effective length and, for an explicit request the source can't
/// satisfy, the number of missing samples.
pub fn resolve_length(frames: usize, offset: usize, requested: usize) -> (usize, Option<usize>) {
    let requested = requested.min(MAX_IMPULSE_LENGTH);
    let available = frames.saturating_sub(offset);

    let mut length = available;
    let mut shortfall = None;
    if requested != 0 {
        if requested < available {
            length = requested;
        } else if available < requested {
            shortfall = Some(requested - available);
        }
    }

    (length.min(MAX_IMPULSE_LENGTH), shortfall)
}

/// Copies, reverses and pads one channel of `source` into `target`.
///
/// `channel` is 1-based; values past the channel count wrap around and 0 is
/// treated as 1. `length` 0 loads everything after `offset`, up to
/// [`MAX_IMPULSE_LENGTH`].
pub fn load_impulse<S: SampleSource + ?Sized>(
    target: &mut ImpulseBuffer,
    source: &S,
    offset: usize,
    length: usize,
    channel: usize,
) -> LoadReport {
    let channels = source.channel_count();
    let channel_index = match channels {
        0 => 0,
        n => (channel.max(1) - 1) % n,
    };

    let (length, shortfall) = if channels == 0 {
        (0, None)
    } else {
        resolve_length(source.frame_count(), offset, length)
    };

    if let Some(missing) = shortfall {
        warn!(
            "impulse source is shorter than requested length after offset ({} samples missing)",
            missing
        );
    }

    target.taps.fill(0.0);
    target.length = length;

    let padded = padded_length(length);
    let tail = &mut target.taps[padded - length..padded];
    if length != 0 {
        source.read(channel_index, offset, tail);
        tail.reverse();
    }

    LoadReport {
        length,
        padded_length: padded,
        channel: channel_index + 1,
        shortfall,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::SampleBuffer;

    fn ramp(len: usize) -> Vec<f32> {
        (1..=len).map(|i| i as f32).collect()
    }

    #[test]
    fn padded_length_rounds_up_to_group() {
        assert_eq!(padded_length(0), 0);
        assert_eq!(padded_length(1), 16);
        assert_eq!(padded_length(16), 16);
        assert_eq!(padded_length(17), 32);
        assert_eq!(padded_length(MAX_IMPULSE_LENGTH), IMPULSE_CAPACITY);
    }

    #[test]
    fn stores_reversed_samples_after_left_padding() {
        let source = SampleBuffer::mono(ramp(5), 48_000);
        let mut impulse = ImpulseBuffer::try_new().unwrap();

        let report = load_impulse(&mut impulse, &source, 0, 0, 1);
        assert_eq!(report.length, 5);
        assert_eq!(report.padded_length, 16);
        assert_eq!(report.shortfall, None);

        let pad_start = 16 - 5;
        let taps = impulse.storage();
        assert!(taps[..pad_start].iter().all(|&x| x == 0.0));
        assert_eq!(&taps[pad_start..16], &[5.0, 4.0, 3.0, 2.0, 1.0]);
        assert!(taps[16..].iter().all(|&x| x == 0.0));
    }

    #[test]
    fn padding_invariant_holds_for_every_length() {
        let source = SampleBuffer::mono(ramp(MAX_IMPULSE_LENGTH + 10), 48_000);
        let mut impulse = ImpulseBuffer::try_new().unwrap();

        for length in [1, 2, 15, 16, 17, 100, 1023, 2043, MAX_IMPULSE_LENGTH] {
            let report = load_impulse(&mut impulse, &source, 0, length, 1);
            assert_eq!(report.length, length);
            let padded = report.padded_length;
            assert_eq!(padded % IMPULSE_PADDING, 0);
            assert!(padded >= length && padded < length + IMPULSE_PADDING);

            let pad_start = padded - length;
            for (i, &tap) in impulse.storage().iter().enumerate() {
                if (pad_start..padded).contains(&i) {
                    assert_eq!(tap, (length - (i - pad_start)) as f32);
                } else {
                    assert_eq!(tap, 0.0, "tap {i} outside the impulse for length {length}");
                }
            }
        }
    }

    #[test]
    fn offset_and_length_select_a_window() {
        let source = SampleBuffer::mono(ramp(100), 48_000);
        let mut impulse = ImpulseBuffer::try_new().unwrap();

        let report = load_impulse(&mut impulse, &source, 10, 3, 1);
        assert_eq!(report.length, 3);
        assert_eq!(&impulse.taps()[13..16], &[13.0, 12.0, 11.0]);
    }

    #[test]
    fn offset_past_end_loads_nothing() {
        let source = SampleBuffer::mono(ramp(8), 48_000);
        let mut impulse = ImpulseBuffer::try_new().unwrap();

        let report = load_impulse(&mut impulse, &source, 8, 0, 1);
        assert_eq!(report.length, 0);
        assert_eq!(report.padded_length, 0);
        assert!(impulse.taps().is_empty());

        let report = load_impulse(&mut impulse, &source, 20, 4, 1);
        assert_eq!(report.length, 0);
        assert_eq!(report.shortfall, Some(4));
        assert!(impulse.storage().iter().all(|&x| x == 0.0));
    }

    #[test]
    fn short_source_reports_shortfall_and_loads_what_exists() {
        let source = SampleBuffer::mono(ramp(10), 48_000);
        let mut impulse = ImpulseBuffer::try_new().unwrap();

        let report = load_impulse(&mut impulse, &source, 4, 20, 1);
        assert_eq!(report.length, 6);
        assert_eq!(report.shortfall, Some(14));
    }

    #[test]
    fn long_sources_are_capped() {
        let source = SampleBuffer::mono(ramp(5000), 48_000);
        let mut impulse = ImpulseBuffer::try_new().unwrap();

        let report = load_impulse(&mut impulse, &source, 0, 0, 1);
        assert_eq!(report.length, MAX_IMPULSE_LENGTH);
        assert_eq!(report.padded_length, IMPULSE_CAPACITY);

        let report = load_impulse(&mut impulse, &source, 0, 3000, 1);
        assert_eq!(report.length, MAX_IMPULSE_LENGTH);
        assert_eq!(report.shortfall, None);
    }

    #[test]
    fn channel_wraps_modulo_channel_count() {
        let source =
            SampleBuffer::from_channels(&[vec![1.0, 2.0], vec![10.0, 20.0], vec![100.0, 200.0]], 48_000)
                .unwrap();
        let mut impulse = ImpulseBuffer::try_new().unwrap();

        let report = load_impulse(&mut impulse, &source, 0, 0, 5);
        assert_eq!(report.channel, 2);
        assert_eq!(&impulse.taps()[14..16], &[20.0, 10.0]);

        let report = load_impulse(&mut impulse, &source, 0, 0, 0);
        assert_eq!(report.channel, 1);
    }

    #[test]
    fn empty_sources_load_nothing() {
        let source = SampleBuffer::mono(Vec::new(), 48_000);
        let mut impulse = ImpulseBuffer::try_new().unwrap();
        assert_eq!(load_impulse(&mut impulse, &source, 0, 0, 1).length, 0);

        let source = SampleBuffer::new(crate::source::SampleData::Float32(Vec::new()), 0, 48_000).unwrap();
        let report = load_impulse(&mut impulse, &source, 0, 16, 3);
        assert_eq!(report.length, 0);
        assert_eq!(report.shortfall, None);
    }

    #[test]
    fn reloading_is_bit_identical() {
        let samples: Vec<f32> = (0..777).map(|i| ((i * 7919) % 113) as f32 / 113.0 - 0.5).collect();
        let source = SampleBuffer::mono(samples, 48_000);
        let mut first = ImpulseBuffer::try_new().unwrap();
        let mut second = ImpulseBuffer::try_new().unwrap();

        load_impulse(&mut first, &source, 3, 500, 1);
        load_impulse(&mut second, &source, 3, 500, 1);
        assert_eq!(first.storage(), second.storage());
        assert_eq!(first.length(), second.length());
    }
}
