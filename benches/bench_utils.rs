//! Shared benchmark utilities for criterion benchmarks.

use criterion::{BenchmarkId, Criterion, PlotConfiguration, SamplingMode, Throughput};
use std::time::Duration;

/// Configure criterion with settings tuned for the analytics benchmarks.
///
/// # Settings
/// - Sample size: 50 (balanced accuracy vs speed)
/// - Measurement time: 3 seconds per benchmark
/// - Warm-up time: 1 second
/// - Noise threshold: 3% (ignore small variations)
/// - Confidence level: 95%
#[allow(dead_code)]
pub fn configure_criterion() -> Criterion {
    Criterion::default()
        .sample_size(50)
        .measurement_time(Duration::from_secs(3))
        .warm_up_time(Duration::from_secs(1))
        .noise_threshold(0.03)
        .confidence_level(0.95)
        .without_plots() // Disable plots for CI environments
}

/// Row counts for densifier scaling runs.
#[allow(dead_code)]
pub const SCALING_SIZES: &[usize] = &[100, 1_000, 10_000, 100_000];

/// Run a scaling benchmark across multiple input sizes.
#[allow(dead_code)]
pub fn bench_scaling<T, S, B>(
    c: &mut Criterion,
    group_name: &str,
    sizes: &[usize],
    mut setup: S,
    mut bench: B,
) where
    S: FnMut(usize) -> T,
    B: FnMut(&T),
{
    let mut group = c.benchmark_group(group_name);
    group.sampling_mode(SamplingMode::Auto);
    group.plot_config(PlotConfiguration::default());

    for &size in sizes {
        let data = setup(size);
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| bench(&data));
        });
    }

    group.finish();
}
