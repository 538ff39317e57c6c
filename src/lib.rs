#![cfg_attr(feature = "simd", feature(portable_simd))]

pub mod config;
pub mod convolver;
pub mod error;
pub mod history;
pub mod impulse;
pub mod kernel;
pub mod source;
pub mod utils;
pub mod vector_ops;

pub use config::{ConvolverConfig, ImpulseSettings, KernelPreference, Precision};
pub use convolver::{ConvolverProcessor, ImpulseController, TimeConvolver};
pub use error::{ConvolveError, Result};
pub use history::{HistoryRing, HISTORY_LENGTH, MAX_BLOCK_SIZE};
pub use impulse::{
    load_impulse, padded_length, ImpulseBuffer, LoadReport, IMPULSE_CAPACITY, IMPULSE_PADDING,
    MAX_IMPULSE_LENGTH,
};
pub use kernel::Kernel;
pub use source::{SampleBuffer, SampleData, SampleFormat, SampleSource, SourceRegistry};
pub use vector_ops::{detected_backend, simd_available};
