use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ConvolveError, Result};
use crate::history::{is_valid_block_size, MAX_BLOCK_SIZE};
use crate::impulse::MAX_IMPULSE_LENGTH;

/// Sample width the host delivers blocks in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Precision {
    #[default]
    Single,
    /// Blocks arrive as `f64`, are narrowed for processing and widened back.
    Double,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum KernelPreference {
    /// Vector kernel when the CPU supports it.
    #[default]
    Auto,
    Scalar,
}

/// Where the impulse response comes from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImpulseSettings {
    /// Registered source name; `None` means no impulse.
    pub source: Option<String>,
    /// First frame read from the source.
    pub offset: usize,
    /// Frames to read; 0 reads to the end of the source. At most
    /// [`MAX_IMPULSE_LENGTH`].
    pub length: usize,
    /// 1-based channel, wrapped by the channel count of the source.
    pub channel: usize,
}

impl Default for ImpulseSettings {
    fn default() -> Self {
        Self {
            source: None,
            offset: 0,
            length: 0,
            channel: 1,
        }
    }
}

impl ImpulseSettings {
    /// Clips `length` to the impulse cap and `channel` to at least 1.
    pub fn normalized(mut self) -> Self {
        self.length = self.length.min(MAX_IMPULSE_LENGTH);
        self.channel = self.channel.max(1);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ConvolverConfig {
    /// Samples per processing call. A power of two up to [`MAX_BLOCK_SIZE`].
    pub block_size: usize,
    pub precision: Precision,
    pub kernel: KernelPreference,
    pub impulse: ImpulseSettings,
}

impl Default for ConvolverConfig {
    fn default() -> Self {
        Self {
            block_size: 64,
            precision: Precision::Single,
            kernel: KernelPreference::Auto,
            impulse: ImpulseSettings::default(),
        }
    }
}

impl ConvolverConfig {
    pub fn with_block_size(mut self, block_size: usize) -> Self {
        self.block_size = block_size;
        self
    }

    pub fn with_precision(mut self, precision: Precision) -> Self {
        self.precision = precision;
        self
    }

    pub fn with_kernel(mut self, kernel: KernelPreference) -> Self {
        self.kernel = kernel;
        self
    }

    pub fn with_impulse(mut self, impulse: ImpulseSettings) -> Self {
        self.impulse = impulse;
        self
    }

    /// Parses a JSON document; missing fields take their defaults.
    pub fn from_json(text: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_json(&std::fs::read_to_string(path)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Rejects settings that would break the history ring.
    pub fn validate(&self) -> Result<()> {
        if !is_valid_block_size(self.block_size) {
            return Err(ConvolveError::InvalidBlockSize {
                size: self.block_size,
                max: MAX_BLOCK_SIZE,
            });
        }
        Ok(())
    }
}
