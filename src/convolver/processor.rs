use no_denormals::no_denormals;
use rtrb::{Consumer, Producer, PushError};

use crate::config::Precision;
use crate::history::HistoryRing;
use crate::impulse::ImpulseBuffer;
use crate::kernel::Kernel;

/// Buffers owned by a live (non-inert) processor.
pub(super) struct Engine {
    pub(super) history: HistoryRing,
    pub(super) impulse: Box<ImpulseBuffer>,
    /// Narrowed input followed by float output; only for double precision.
    pub(super) scratch: Option<Box<[f32]>>,
    pub(super) kernel: Kernel,
    pub(super) incoming: Consumer<Box<ImpulseBuffer>>,
    pub(super) retired: Producer<Box<ImpulseBuffer>>,
    /// A replaced impulse the retire queue had no room for.
    pub(super) unreturned: Option<Box<ImpulseBuffer>>,
}

impl Engine {
    /// Swaps in the newest published impulse, handing replaced ones back to
    /// the control side. Never frees.
    fn adopt_pending(&mut self) {
        if let Some(old) = self.unreturned.take() {
            if let Err(PushError::Full(old)) = self.retired.push(old) {
                self.unreturned = Some(old);
                return;
            }
        }

        while let Ok(next) = self.incoming.pop() {
            let old = std::mem::replace(&mut self.impulse, next);
            if let Err(PushError::Full(old)) = self.retired.push(old) {
                self.unreturned = Some(old);
                return;
            }
        }
    }

    fn convolve(&mut self, input: &[f32], output: &mut [f32]) {
        let taps = self.impulse.taps();
        let window = self.history.ingest(input, taps.len());
        self.kernel.convolve(window, taps, output);
    }

    /// The input is fully copied into history before any output is written.
    fn convolve_in_place(&mut self, block: &mut [f32]) {
        let taps = self.impulse.taps();
        let window = self.history.ingest(block, taps.len());
        self.kernel.convolve(window, taps, block);
    }

    /// Narrows `input` into scratch and convolves it there. Returns false when
    /// the stream has no scratch (single precision).
    fn convolve_narrowed(&mut self, input: &[f64]) -> bool {
        let block = input.len();
        let Some(scratch) = self.scratch.as_mut() else {
            return false;
        };
        let (narrowed, result) = scratch.split_at_mut(block);
        self.kernel.narrow(input, narrowed);

        let taps = self.impulse.taps();
        let window = self.history.ingest(narrowed, taps.len());
        self.kernel.convolve(window, taps, &mut result[..block]);
        true
    }

    /// Widens the result left by [`convolve_narrowed`](Self::convolve_narrowed).
    fn widen_result(&self, output: &mut [f64]) {
        let block = output.len();
        if let Some(scratch) = self.scratch.as_ref() {
            self.kernel.widen(&scratch[block..2 * block], output);
        }
    }
}

/// The processing half of a stream.
///
/// Every call handles exactly one block of the configured size and never
/// allocates, frees, blocks or logs. Blocks of the wrong size, inert streams
/// and double-precision calls on a single-precision stream produce silence.
pub struct ConvolverProcessor {
    pub(super) engine: Option<Engine>,
    pub(super) block_size: usize,
    pub(super) precision: Precision,
}

impl ConvolverProcessor {
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    pub fn precision(&self) -> Precision {
        self.precision
    }

    /// True when construction failed to allocate; the stream then only
    /// outputs silence.
    pub fn is_inert(&self) -> bool {
        self.engine.is_none()
    }

    /// Kernel family in use, or `None` for an inert stream.
    pub fn backend(&self) -> Option<&'static str> {
        self.engine.as_ref().map(|e| e.kernel.backend())
    }

    /// Length of the impulse currently being applied.
    pub fn impulse_length(&self) -> usize {
        self.engine.as_ref().map_or(0, |e| e.impulse.length())
    }

    /// Forgets all input history.
    pub fn reset(&mut self) {
        if let Some(engine) = self.engine.as_mut() {
            engine.history.reset();
        }
    }

    /// Convolves one single-precision block.
    pub fn process(&mut self, input: &[f32], output: &mut [f32]) {
        let block = self.block_size;
        let Some(engine) = self.engine.as_mut() else {
            output.fill(0.0);
            return;
        };
        if input.len() != block || output.len() != block {
            output.fill(0.0);
            return;
        }

        no_denormals(|| {
            engine.adopt_pending();
            engine.convolve(input, output);
        });
    }

    /// Convolves one single-precision block, replacing the input with the
    /// output.
    pub fn process_in_place(&mut self, block: &mut [f32]) {
        let size = self.block_size;
        let Some(engine) = self.engine.as_mut() else {
            block.fill(0.0);
            return;
        };
        if block.len() != size {
            block.fill(0.0);
            return;
        }

        no_denormals(|| {
            engine.adopt_pending();
            engine.convolve_in_place(block);
        });
    }

    /// Convolves one double-precision block through the float pipeline.
    pub fn process_f64(&mut self, input: &[f64], output: &mut [f64]) {
        let block = self.block_size;
        let Some(engine) = self.engine.as_mut() else {
            output.fill(0.0);
            return;
        };
        if input.len() != block || output.len() != block {
            output.fill(0.0);
            return;
        }

        no_denormals(|| {
            engine.adopt_pending();
            if engine.convolve_narrowed(input) {
                engine.widen_result(output);
            } else {
                output.fill(0.0);
            }
        });
    }

    /// Double-precision counterpart of [`process_in_place`](Self::process_in_place).
    pub fn process_in_place_f64(&mut self, block: &mut [f64]) {
        let size = self.block_size;
        let Some(engine) = self.engine.as_mut() else {
            block.fill(0.0);
            return;
        };
        if block.len() != size {
            block.fill(0.0);
            return;
        }

        no_denormals(|| {
            engine.adopt_pending();
            if engine.convolve_narrowed(block) {
                engine.widen_result(block);
            } else {
                block.fill(0.0);
            }
        });
    }
}
