// benches/convolve_benchmark.rs
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use time_convolver::kernel::{convolve_scalar, Kernel};
use time_convolver::{
    padded_length, ConvolverConfig, Precision, SampleBuffer, TimeConvolver, MAX_IMPULSE_LENGTH,
};

const BLOCK_SIZE: usize = 64;
const SAMPLE_RATE: u32 = 48_000;

fn decaying_impulse(length: usize) -> SampleBuffer {
    let samples = (0..length)
        .map(|i| (i as f32 * 0.37).sin() * (-(i as f32) / 300.0).exp())
        .collect();
    SampleBuffer::mono(samples, SAMPLE_RATE)
}

fn test_signal(len: usize) -> Vec<f32> {
    (0..len).map(|i| (i as f32 * 0.05).sin() * 0.5).collect()
}

fn bench_kernels(c: &mut Criterion) {
    let mut group = c.benchmark_group("kernel");
    let vector = Kernel::select(false);

    for length in [64, 512, MAX_IMPULSE_LENGTH] {
        let taps = test_signal(padded_length(length));
        let window = test_signal(taps.len() + BLOCK_SIZE);
        let mut output = vec![0.0f32; BLOCK_SIZE];
        group.throughput(Throughput::Elements((taps.len() * BLOCK_SIZE) as u64));

        group.bench_with_input(BenchmarkId::new("scalar", length), &length, |b, _| {
            b.iter(|| convolve_scalar(black_box(&window), black_box(&taps), &mut output))
        });
        group.bench_with_input(BenchmarkId::new(vector.backend(), length), &length, |b, _| {
            b.iter(|| vector.convolve(black_box(&window), black_box(&taps), &mut output))
        });
    }
    group.finish();
}

fn bench_stream(c: &mut Criterion) {
    let mut group = c.benchmark_group("stream");
    group.throughput(Throughput::Elements(BLOCK_SIZE as u64));

    for precision in [Precision::Single, Precision::Double] {
        let config = ConvolverConfig::default()
            .with_block_size(BLOCK_SIZE)
            .with_precision(precision);
        let mut convolver = TimeConvolver::new(config).expect("valid config");
        convolver
            .load(&decaying_impulse(MAX_IMPULSE_LENGTH), 0, 0, 1)
            .expect("impulse loads");

        let name = format!("{precision:?}").to_lowercase();
        match precision {
            Precision::Single => {
                let input = test_signal(BLOCK_SIZE);
                let mut output = vec![0.0f32; BLOCK_SIZE];
                group.bench_function(name, |b| {
                    b.iter(|| convolver.process(black_box(&input), &mut output))
                });
            }
            Precision::Double => {
                let input: Vec<f64> = test_signal(BLOCK_SIZE).iter().map(|&x| x as f64).collect();
                let mut output = vec![0.0f64; BLOCK_SIZE];
                group.bench_function(name, |b| {
                    b.iter(|| convolver.process_f64(black_box(&input), &mut output))
                });
            }
        }
    }
    group.finish();
}

criterion_group!(benches, bench_kernels, bench_stream);
criterion_main!(benches);
