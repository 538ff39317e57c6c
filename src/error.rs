//! Error types for the convolution engine.
//!
//! Only the control path produces these. The processing path never fails: an
//! inert stream or a mis-sized block yields a silent output block instead.

use thiserror::Error;

/// Errors raised while configuring a stream or loading an impulse.
#[derive(Debug, Error)]
pub enum ConvolveError {
    /// Block size does not evenly partition the history ring.
    #[error("invalid block size {size}: must be a power of two between 1 and {max}")]
    InvalidBlockSize {
        /// The rejected block size.
        size: usize,
        /// Largest block size the history ring can serve.
        max: usize,
    },

    /// A working buffer could not be allocated.
    #[error("couldn't allocate {samples} samples for {what}")]
    AllocationFailed {
        /// Which buffer failed.
        what: &'static str,
        /// Requested length in samples.
        samples: usize,
    },

    /// No source is registered under the requested name.
    #[error("{0} is not a valid source")]
    SourceNotFound(String),

    /// The source exists but holds no readable audio.
    #[error("source {name} is invalid: {reason}")]
    SourceInvalid {
        /// Source name, or `<anonymous>` for direct loads.
        name: String,
        /// What is wrong with it.
        reason: &'static str,
    },

    /// The processing side has not yet consumed earlier impulse updates.
    #[error("impulse handoff queue is full; retry after the next audio block")]
    HandoffFull,

    /// The stream failed to allocate at construction and ignores all requests.
    #[error("stream is inert after failed allocation")]
    Inert,

    /// Configuration document could not be parsed.
    #[error("config error: {0}")]
    Config(#[from] serde_json::Error),

    /// WAV decoding failed.
    #[error("wav error: {0}")]
    Wav(#[from] hound::Error),

    /// Underlying I/O failure.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, ConvolveError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_offending_value() {
        let err = ConvolveError::InvalidBlockSize { size: 48, max: 2048 };
        assert_eq!(
            err.to_string(),
            "invalid block size 48: must be a power of two between 1 and 2048"
        );

        let err = ConvolveError::SourceNotFound("room".to_string());
        assert_eq!(err.to_string(), "room is not a valid source");
    }

    #[test]
    fn json_errors_convert() {
        let parse = serde_json::from_str::<u32>("not json").unwrap_err();
        let err: ConvolveError = parse.into();
        assert!(matches!(err, ConvolveError::Config(_)));
    }
}
