//! Offline renderer: convolves every channel of a WAV file with one channel of
//! an impulse WAV and writes a 32-bit float WAV of the same length.

mod color_logger;

use std::path::PathBuf;
use std::time::Instant;

use anyhow::Context;
use clap::Parser;
use log::{info, warn};

use color_logger::ColorLogger;
use time_convolver::{
    ConvolverConfig, ImpulseSettings, KernelPreference, Precision, SampleBuffer, SampleSource,
    SourceRegistry, TimeConvolver,
};

const IMPULSE_SOURCE: &str = "impulse";

#[derive(Parser)]
#[command(name = "convolve_wav", version)]
struct Cli {
    /// Signal to convolve
    input: PathBuf,

    /// Impulse response (at most 2044 samples are used)
    impulse: PathBuf,

    /// Where to write the 32-bit float result
    output: PathBuf,

    /// Samples per processing block (power of two, at most 2048)
    #[arg(short = 'b', long = "block-size")]
    block_size: Option<usize>,

    /// First impulse frame to use
    #[arg(long)]
    offset: Option<usize>,

    /// Impulse frames to use; 0 uses everything after the offset
    #[arg(long)]
    length: Option<usize>,

    /// 1-based impulse channel, wrapped by the channel count
    #[arg(short = 'c', long)]
    channel: Option<usize>,

    /// Run the double precision path
    #[arg(long)]
    double: bool,

    /// Force the scalar kernel
    #[arg(long)]
    scalar: bool,

    /// JSON config file; command line flags override it
    #[arg(long)]
    config: Option<PathBuf>,

    /// Print diagnostic messages
    #[arg(short = 'v', long = "verbose")]
    verbose: bool,

    /// Quiet mode: suppress all log output
    #[arg(short = 'q', long = "quiet")]
    quiet: bool,
}

impl Cli {
    fn config(&self) -> anyhow::Result<ConvolverConfig> {
        let mut config = match &self.config {
            Some(path) => ConvolverConfig::from_json_file(path)
                .with_context(|| format!("reading config {}", path.display()))?,
            None => ConvolverConfig::default(),
        };

        if let Some(block_size) = self.block_size {
            config.block_size = block_size;
        }
        if self.double {
            config.precision = Precision::Double;
        }
        if self.scalar {
            config.kernel = KernelPreference::Scalar;
        }

        let impulse = &mut config.impulse;
        impulse.source = Some(IMPULSE_SOURCE.to_string());
        if let Some(offset) = self.offset {
            impulse.offset = offset;
        }
        if let Some(length) = self.length {
            impulse.length = length;
        }
        if let Some(channel) = self.channel {
            impulse.channel = channel;
        }

        config.validate()?;
        Ok(config)
    }
}

fn convolve_channel(
    config: &ConvolverConfig,
    registry: &SourceRegistry,
    signal: &[f32],
) -> anyhow::Result<Vec<f32>> {
    let mut convolver = TimeConvolver::new(config.clone())?;
    let settings: ImpulseSettings = config.impulse.clone();
    let report = convolver.controller().apply_settings(registry, settings)?;
    info!(
        "impulse: {} taps from channel {} ({:?} kernel)",
        report.length,
        report.channel,
        convolver.backend()
    );

    if config.precision == Precision::Single {
        return Ok(convolver.process_signal(signal));
    }

    let block = config.block_size;
    let mut output = Vec::with_capacity(signal.len());
    let mut in_block = vec![0.0f64; block];
    let mut out_block = vec![0.0f64; block];
    for chunk in signal.chunks(block) {
        for (dst, &src) in in_block.iter_mut().zip(chunk.iter().chain(std::iter::repeat(&0.0))) {
            *dst = src as f64;
        }
        convolver.process_f64(&in_block, &mut out_block);
        output.extend(out_block[..chunk.len()].iter().map(|&x| x as f32));
    }
    Ok(output)
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    ColorLogger::new(cli.quiet, cli.verbose)
        .init()
        .context("installing logger")?;

    let config = cli.config()?;

    let input = SampleBuffer::from_wav_file(&cli.input)
        .with_context(|| format!("reading {}", cli.input.display()))?;
    let impulse = SampleBuffer::from_wav_file(&cli.impulse)
        .with_context(|| format!("reading {}", cli.impulse.display()))?;
    if impulse.sample_rate() != input.sample_rate() {
        warn!(
            "impulse sample rate {} differs from input sample rate {}",
            impulse.sample_rate(),
            input.sample_rate()
        );
    }

    let mut registry = SourceRegistry::new();
    registry.insert(IMPULSE_SOURCE, impulse);

    let started = Instant::now();
    let channels = (0..input.channel_count())
        .map(|channel| convolve_channel(&config, &registry, &input.channel(channel)))
        .collect::<anyhow::Result<Vec<_>>>()?;
    info!(
        "convolved {} frames x {} channels in {:.2?}",
        input.frame_count(),
        input.channel_count(),
        started.elapsed()
    );

    let spec = hound::WavSpec {
        channels: input.channel_count() as u16,
        sample_rate: input.sample_rate(),
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };
    let mut writer = hound::WavWriter::create(&cli.output, spec)
        .with_context(|| format!("creating {}", cli.output.display()))?;
    for frame in 0..input.frame_count() {
        for channel in &channels {
            writer.write_sample(channel[frame])?;
        }
    }
    writer.finalize()?;
    info!("wrote {}", cli.output.display());

    Ok(())
}
