//! A convolution stream.
//!
//! [`TimeConvolver`] owns one stream's history, impulse and kernel choice. It
//! can be used directly from one thread, or [`split`](TimeConvolver::split)
//! into an [`ImpulseController`] for the control thread and a
//! [`ConvolverProcessor`] for the audio thread. The halves talk through two
//! wait-free single-producer queues: filled impulses travel to the processor,
//! replaced ones travel back to be reused.

mod controller;
mod processor;

pub use controller::ImpulseController;
pub use processor::ConvolverProcessor;

use log::{debug, error};

use crate::config::{ConvolverConfig, KernelPreference, Precision};
use crate::error::Result;
use crate::history::HistoryRing;
use crate::impulse::{ImpulseBuffer, LoadReport};
use crate::kernel::Kernel;
use crate::source::{SampleSource, SourceRegistry};
use crate::utils::try_zeroed;

use controller::Link;
use processor::Engine;

/// Impulse updates that may be queued ahead of the processor.
pub(crate) const HANDOFF_DEPTH: usize = 4;

/// Everything a live stream allocates up front.
struct StreamBuffers {
    history: HistoryRing,
    impulse: Box<ImpulseBuffer>,
    scratch: Option<Box<[f32]>>,
}

impl StreamBuffers {
    fn allocate(config: &ConvolverConfig) -> Result<Self> {
        let scratch = match config.precision {
            Precision::Single => None,
            Precision::Double => Some(try_zeroed(2 * config.block_size, "double precision scratch")?),
        };
        Ok(Self {
            history: HistoryRing::try_new()?,
            impulse: Box::new(ImpulseBuffer::try_new()?),
            scratch,
        })
    }
}

pub struct TimeConvolver {
    controller: ImpulseController,
    processor: ConvolverProcessor,
}

impl TimeConvolver {
    /// Creates a silent stream.
    ///
    /// Invalid configurations are rejected. If the working buffers cannot be
    /// allocated the stream is still returned but is inert: it outputs
    /// silence and refuses every impulse change with
    /// [`ConvolveError::Inert`](crate::error::ConvolveError::Inert).
    pub fn new(config: ConvolverConfig) -> Result<Self> {
        config.validate()?;
        let buffers = StreamBuffers::allocate(&config);
        Ok(Self::assemble(config, buffers))
    }

    fn assemble(config: ConvolverConfig, buffers: Result<StreamBuffers>) -> Self {
        let mut controller = ImpulseController {
            link: None,
            settings: config.impulse.clone().normalized(),
            spares: Vec::new(),
            last_report: None,
            silence_pending: false,
        };
        let mut processor = ConvolverProcessor {
            engine: None,
            block_size: config.block_size,
            precision: config.precision,
        };

        let buffers = match buffers {
            Ok(buffers) => buffers,
            Err(err) => {
                error!("{err}; convolution stream is inert");
                return Self {
                    controller,
                    processor,
                };
            }
        };

        let (to_processor, from_controller) = rtrb::RingBuffer::new(HANDOFF_DEPTH);
        // One extra slot so the processor can always retire everything queued
        // plus the impulse it is replacing.
        let (to_controller, from_processor) = rtrb::RingBuffer::new(HANDOFF_DEPTH + 1);

        let kernel = Kernel::select(config.kernel == KernelPreference::Scalar);
        debug!(
            "convolution stream: block size {}, {:?} precision, {} kernel",
            config.block_size,
            config.precision,
            kernel.backend()
        );

        controller.link = Some(Link {
            outgoing: to_processor,
            returned: from_processor,
        });
        processor.engine = Some(Engine {
            history: buffers.history,
            impulse: buffers.impulse,
            scratch: buffers.scratch,
            kernel,
            incoming: from_controller,
            retired: to_controller,
            unreturned: None,
        });

        Self {
            controller,
            processor,
        }
    }

    /// Separates the control and processing halves.
    pub fn split(self) -> (ImpulseController, ConvolverProcessor) {
        (self.controller, self.processor)
    }

    pub fn controller(&mut self) -> &mut ImpulseController {
        &mut self.controller
    }

    pub fn processor(&mut self) -> &mut ConvolverProcessor {
        &mut self.processor
    }

    pub fn is_inert(&self) -> bool {
        self.processor.is_inert()
    }

    pub fn block_size(&self) -> usize {
        self.processor.block_size()
    }

    pub fn backend(&self) -> Option<&'static str> {
        self.processor.backend()
    }

    pub fn set_source(&mut self, registry: &SourceRegistry, name: &str) -> Result<LoadReport> {
        self.controller.set_source(registry, name)
    }

    pub fn refresh(&mut self, registry: &SourceRegistry) -> Result<LoadReport> {
        self.controller.refresh(registry)
    }

    pub fn load<S: SampleSource + ?Sized>(
        &mut self,
        source: &S,
        offset: usize,
        length: usize,
        channel: usize,
    ) -> Result<LoadReport> {
        self.controller.load(source, offset, length, channel)
    }

    pub fn clear(&mut self) -> Result<LoadReport> {
        self.controller.clear()
    }

    pub fn settle(&mut self) -> Result<bool> {
        self.controller.settle()
    }

    pub fn process(&mut self, input: &[f32], output: &mut [f32]) {
        self.processor.process(input, output)
    }

    pub fn process_in_place(&mut self, block: &mut [f32]) {
        self.processor.process_in_place(block)
    }

    pub fn process_f64(&mut self, input: &[f64], output: &mut [f64]) {
        self.processor.process_f64(input, output)
    }

    pub fn process_in_place_f64(&mut self, block: &mut [f64]) {
        self.processor.process_in_place_f64(block)
    }

    /// Processes a whole signal of any length, zero-padding the final block.
    pub fn process_signal(&mut self, input: &[f32]) -> Vec<f32> {
        let block = self.block_size();
        let mut output = Vec::with_capacity(input.len());
        let mut buffer = vec![0.0; block];

        for chunk in input.chunks(block) {
            buffer[..chunk.len()].copy_from_slice(chunk);
            buffer[chunk.len()..].fill(0.0);
            self.process_in_place(&mut buffer);
            output.extend_from_slice(&buffer[..chunk.len()]);
        }
        output
    }
}

impl std::fmt::Debug for TimeConvolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimeConvolver")
            .field("block_size", &self.processor.block_size)
            .field("precision", &self.processor.precision)
            .field("backend", &self.processor.backend())
            .field("impulse_length", &self.processor.impulse_length())
            .finish()
    }
}
