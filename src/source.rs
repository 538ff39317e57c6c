//! Sample sources that impulse responses are read from.
//!
//! A [`SampleSource`] exposes frames, channels and a storage format and can
//! copy one channel out as `f32`. [`SampleBuffer`] is the owned implementation
//! (interleaved, in one of four storage formats) and [`SourceRegistry`] maps
//! names to shared buffers. Holding the `Arc` returned by the registry keeps a
//! source alive for the duration of a read even if it is replaced or removed
//! in the meantime.

use std::io::Read;
use std::path::Path;
use std::sync::Arc;

use dasp_sample::{Sample, ToSample, I24};
use log::debug;
use rustc_hash::FxHashMap;

use crate::error::{ConvolveError, Result};

/// Storage format of a sample source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleFormat {
    Float32,
    Int16,
    Int24,
    Int32,
}

/// Read access to multichannel audio.
pub trait SampleSource {
    fn frame_count(&self) -> usize;
    fn channel_count(&self) -> usize;
    fn format(&self) -> SampleFormat;

    /// Copies `dst.len()` frames of `channel` starting at frame `offset`,
    /// converted to `f32`.
    ///
    /// Panics if the channel or frame range is out of bounds.
    fn read(&self, channel: usize, offset: usize, dst: &mut [f32]);
}

/// Interleaved sample storage.
#[derive(Debug, Clone, PartialEq)]
pub enum SampleData {
    Float32(Vec<f32>),
    Int16(Vec<i16>),
    Int24(Vec<I24>),
    Int32(Vec<i32>),
}

impl SampleData {
    fn len(&self) -> usize {
        match self {
            SampleData::Float32(v) => v.len(),
            SampleData::Int16(v) => v.len(),
            SampleData::Int24(v) => v.len(),
            SampleData::Int32(v) => v.len(),
        }
    }

    fn format(&self) -> SampleFormat {
        match self {
            SampleData::Float32(_) => SampleFormat::Float32,
            SampleData::Int16(_) => SampleFormat::Int16,
            SampleData::Int24(_) => SampleFormat::Int24,
            SampleData::Int32(_) => SampleFormat::Int32,
        }
    }
}

/// Copies every `stride`-th sample starting at `first` into `dst`.
fn deinterleave<S>(samples: &[S], first: usize, stride: usize, dst: &mut [f32])
where
    S: Sample + ToSample<f32>,
{
    let frames = samples[first..].iter().copied().step_by(stride);
    for (out, sample) in dst.iter_mut().zip(frames) {
        *out = sample.to_sample::<f32>();
    }
}

/// An owned, interleaved multichannel sample buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleBuffer {
    data: SampleData,
    channels: usize,
    sample_rate: u32,
}

impl SampleBuffer {
    /// Wraps interleaved samples.
    ///
    /// The sample count must be a multiple of `channels`. Zero channels are
    /// only accepted for empty data.
    pub fn new(data: SampleData, channels: usize, sample_rate: u32) -> Result<Self> {
        if channels == 0 && data.len() != 0 {
            return Err(ConvolveError::SourceInvalid {
                name: "<anonymous>".to_string(),
                reason: "samples present but channel count is zero",
            });
        }
        if channels != 0 && data.len() % channels != 0 {
            return Err(ConvolveError::SourceInvalid {
                name: "<anonymous>".to_string(),
                reason: "sample count is not a multiple of the channel count",
            });
        }
        Ok(Self {
            data,
            channels,
            sample_rate,
        })
    }

    /// Single channel of float samples.
    pub fn mono(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            data: SampleData::Float32(samples),
            channels: 1,
            sample_rate,
        }
    }

    /// Interleaves equally long planar channels.
    pub fn from_channels(channels: &[Vec<f32>], sample_rate: u32) -> Result<Self> {
        let frames = channels.first().map_or(0, Vec::len);
        if channels.iter().any(|c| c.len() != frames) {
            return Err(ConvolveError::SourceInvalid {
                name: "<anonymous>".to_string(),
                reason: "channels differ in length",
            });
        }
        let mut interleaved = Vec::with_capacity(frames * channels.len());
        for frame in 0..frames {
            interleaved.extend(channels.iter().map(|c| c[frame]));
        }
        Self::new(SampleData::Float32(interleaved), channels.len(), sample_rate)
    }

    /// Decodes a WAV stream. Supports 16, 24 and 32-bit integer and 32-bit
    /// float samples, keeping the storage format of the file.
    pub fn from_wav_reader<R: Read>(reader: R) -> Result<Self> {
        let mut wav = hound::WavReader::new(reader)?;
        let spec = wav.spec();
        debug!(
            "WAV spec: sample_rate={}, channels={}, bits_per_sample={}, sample_format={:?}",
            spec.sample_rate, spec.channels, spec.bits_per_sample, spec.sample_format
        );

        let data = match (spec.bits_per_sample, spec.sample_format) {
            (32, hound::SampleFormat::Float) => {
                SampleData::Float32(wav.samples::<f32>().collect::<std::result::Result<_, _>>()?)
            }
            (16, hound::SampleFormat::Int) => {
                SampleData::Int16(wav.samples::<i16>().collect::<std::result::Result<_, _>>()?)
            }
            (24, hound::SampleFormat::Int) => {
                let raw: Vec<i32> = wav.samples::<i32>().collect::<std::result::Result<_, _>>()?;
                let packed = raw
                    .into_iter()
                    .map(I24::new)
                    .collect::<Option<Vec<_>>>()
                    .ok_or_else(|| ConvolveError::SourceInvalid {
                        name: "<wav>".to_string(),
                        reason: "24-bit sample out of range",
                    })?;
                SampleData::Int24(packed)
            }
            (32, hound::SampleFormat::Int) => {
                SampleData::Int32(wav.samples::<i32>().collect::<std::result::Result<_, _>>()?)
            }
            _ => {
                return Err(ConvolveError::SourceInvalid {
                    name: "<wav>".to_string(),
                    reason: "unsupported WAV sample format",
                })
            }
        };

        Self::new(data, spec.channels as usize, spec.sample_rate)
    }

    pub fn from_wav_bytes(bytes: &[u8]) -> Result<Self> {
        Self::from_wav_reader(std::io::Cursor::new(bytes))
    }

    pub fn from_wav_file(path: impl AsRef<Path>) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        Self::from_wav_reader(std::io::BufReader::new(file))
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn data(&self) -> &SampleData {
        &self.data
    }

    /// One whole channel as `f32`.
    pub fn channel(&self, channel: usize) -> Vec<f32> {
        let mut out = vec![0.0; self.frame_count()];
        self.read(channel, 0, &mut out);
        out
    }
}

impl SampleSource for SampleBuffer {
    fn frame_count(&self) -> usize {
        if self.channels == 0 {
            0
        } else {
            self.data.len() / self.channels
        }
    }

    fn channel_count(&self) -> usize {
        self.channels
    }

    fn format(&self) -> SampleFormat {
        self.data.format()
    }

    fn read(&self, channel: usize, offset: usize, dst: &mut [f32]) {
        assert!(channel < self.channels, "channel {channel} out of range");
        assert!(
            offset + dst.len() <= self.frame_count(),
            "frame range {}..{} out of range",
            offset,
            offset + dst.len()
        );
        if dst.is_empty() {
            return;
        }

        let first = offset * self.channels + channel;
        match &self.data {
            SampleData::Float32(v) => deinterleave(v, first, self.channels, dst),
            SampleData::Int16(v) => deinterleave(v, first, self.channels, dst),
            SampleData::Int24(v) => deinterleave(v, first, self.channels, dst),
            SampleData::Int32(v) => deinterleave(v, first, self.channels, dst),
        }
    }
}

/// Named sample sources.
#[derive(Debug, Default, Clone)]
pub struct SourceRegistry {
    sources: FxHashMap<String, Arc<SampleBuffer>>,
}

impl SourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `buffer` under `name`, returning any source it replaced.
    pub fn insert(&mut self, name: impl Into<String>, buffer: SampleBuffer) -> Option<Arc<SampleBuffer>> {
        self.sources.insert(name.into(), Arc::new(buffer))
    }

    pub fn remove(&mut self, name: &str) -> Option<Arc<SampleBuffer>> {
        self.sources.remove(name)
    }

    /// Pins the named source. The source stays valid until the returned
    /// handle is dropped.
    pub fn get(&self, name: &str) -> Result<Arc<SampleBuffer>> {
        self.sources
            .get(name)
            .cloned()
            .ok_or_else(|| ConvolveError::SourceNotFound(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.sources.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.sources.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn wav_bytes(spec: hound::WavSpec, write: impl FnOnce(&mut hound::WavWriter<&mut std::io::Cursor<Vec<u8>>>)) -> Vec<u8> {
        let mut cursor = std::io::Cursor::new(Vec::new());
        {
            let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
            write(&mut writer);
            writer.finalize().unwrap();
        }
        cursor.into_inner()
    }

    #[test]
    fn reads_one_channel_of_interleaved_data() {
        let buffer = SampleBuffer::from_channels(
            &[vec![1.0, 2.0, 3.0], vec![-1.0, -2.0, -3.0]],
            48_000,
        )
        .unwrap();

        assert_eq!(buffer.frame_count(), 3);
        assert_eq!(buffer.channel_count(), 2);

        let mut dst = [0.0; 2];
        buffer.read(1, 1, &mut dst);
        assert_eq!(dst, [-2.0, -3.0]);
        assert_eq!(buffer.channel(0), vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn integer_formats_convert_to_unit_range() {
        let buffer = SampleBuffer::new(SampleData::Int16(vec![i16::MIN, 0, 16384]), 1, 44_100).unwrap();
        assert_eq!(buffer.format(), SampleFormat::Int16);
        let samples = buffer.channel(0);
        assert_relative_eq!(samples[0], -1.0);
        assert_relative_eq!(samples[1], 0.0);
        assert_relative_eq!(samples[2], 0.5);
    }

    #[test]
    fn rejects_ragged_layouts() {
        let err = SampleBuffer::new(SampleData::Float32(vec![0.0; 5]), 2, 48_000).unwrap_err();
        assert!(matches!(err, ConvolveError::SourceInvalid { .. }));

        let err = SampleBuffer::from_channels(&[vec![0.0; 3], vec![0.0; 2]], 48_000).unwrap_err();
        assert!(matches!(err, ConvolveError::SourceInvalid { .. }));
    }

    #[test]
    fn empty_buffer_has_no_frames() {
        let buffer = SampleBuffer::new(SampleData::Float32(Vec::new()), 0, 48_000).unwrap();
        assert_eq!(buffer.frame_count(), 0);
        assert_eq!(buffer.channel_count(), 0);
    }

    #[test]
    fn decodes_float_wav() {
        let spec = hound::WavSpec {
            channels: 2,
            sample_rate: 48_000,
            bits_per_sample: 32,
            sample_format: hound::SampleFormat::Float,
        };
        let bytes = wav_bytes(spec, |w| {
            for s in [0.25f32, -0.25, 0.5, -0.5] {
                w.write_sample(s).unwrap();
            }
        });

        let buffer = SampleBuffer::from_wav_bytes(&bytes).unwrap();
        assert_eq!(buffer.sample_rate(), 48_000);
        assert_eq!(buffer.format(), SampleFormat::Float32);
        assert_eq!(buffer.channel(1), vec![-0.25, -0.5]);
    }

    #[test]
    fn decodes_24_bit_wav() {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 44_100,
            bits_per_sample: 24,
            sample_format: hound::SampleFormat::Int,
        };
        let bytes = wav_bytes(spec, |w| {
            for s in [-8_388_608i32, 0, 4_194_304] {
                w.write_sample(s).unwrap();
            }
        });

        let buffer = SampleBuffer::from_wav_bytes(&bytes).unwrap();
        assert_eq!(buffer.format(), SampleFormat::Int24);
        let samples = buffer.channel(0);
        assert_relative_eq!(samples[0], -1.0);
        assert_relative_eq!(samples[2], 0.5);
    }

    #[test]
    fn registry_handles_outlive_removal() {
        let mut registry = SourceRegistry::new();
        registry.insert("room", SampleBuffer::mono(vec![1.0, 0.5], 48_000));

        let pinned = registry.get("room").unwrap();
        registry.remove("room");
        assert_eq!(pinned.frame_count(), 2);

        let err = registry.get("room").unwrap_err();
        assert_eq!(err.to_string(), "room is not a valid source");
        assert!(registry.is_empty());
    }
}
