//! Mirrored input history.
//!
//! Every block is written twice, at `position` and at `position +
//! HISTORY_LENGTH`. The window the kernel needs (the current block plus up to
//! [`IMPULSE_CAPACITY`] samples before it) is therefore always one contiguous
//! slice of the upper half, with no copy at the wrap point.

use crate::error::Result;
use crate::impulse::IMPULSE_CAPACITY;
use crate::utils::try_zeroed;

/// Distinct samples of history kept per stream.
pub const HISTORY_LENGTH: usize = 4096;
/// Largest block the ring can absorb while still serving a full-length
/// impulse window.
pub const MAX_BLOCK_SIZE: usize = HISTORY_LENGTH - IMPULSE_CAPACITY;

/// Whether `size` is a usable block size: a power of two that divides the
/// history length and leaves room for a full impulse.
pub const fn is_valid_block_size(size: usize) -> bool {
    size.is_power_of_two() && size <= MAX_BLOCK_SIZE
}

pub struct HistoryRing {
    samples: Box<[f32]>,
    position: usize,
}

impl HistoryRing {
    /// Allocates a silent history.
    pub fn try_new() -> Result<Self> {
        Ok(Self {
            samples: try_zeroed(2 * HISTORY_LENGTH, "input history")?,
            position: 0,
        })
    }

    /// Where the next block will be written, in `0..HISTORY_LENGTH`.
    pub fn position(&self) -> usize {
        self.position
    }

    /// Forgets all history.
    pub fn reset(&mut self) {
        self.samples.fill(0.0);
        self.position = 0;
    }

    /// Absorbs `block` and returns the window ending at its last sample.
    ///
    /// The window holds `lookback + block.len()` samples; the first
    /// `lookback` are the history that preceded the block.
    ///
    /// `block.len()` must be a valid block size (see [`is_valid_block_size`])
    /// and `lookback` at most [`IMPULSE_CAPACITY`].
    pub fn ingest(&mut self, block: &[f32], lookback: usize) -> &[f32] {
        let len = block.len();
        debug_assert!(is_valid_block_size(len));
        debug_assert!(lookback <= IMPULSE_CAPACITY);

        let start = self.position;
        self.samples[start..start + len].copy_from_slice(block);
        self.samples[HISTORY_LENGTH + start..HISTORY_LENGTH + start + len].copy_from_slice(block);

        self.position += len;
        if self.position >= HISTORY_LENGTH {
            self.position = 0;
        }

        let end = HISTORY_LENGTH + start + len;
        &self.samples[end - len - lookback..end]
    }
}
