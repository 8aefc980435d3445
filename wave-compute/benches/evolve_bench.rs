//! Benchmarks for the evolution kernel and memory updater
//!
//! Times `evolve` + `update_memory` pairs across a width sweep with a
//! fixed batch of 64.
//!
//! Run: cargo bench --bench evolve_bench

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use wave_compute::kernel;
use wave_compute::{evolve, update_memory};
use wave_core::{EvolveParams, KernelConfig, Stencil, CHANNELS};

const BATCHES: usize = 64;
const STEPS: u32 = 16;
const WIDTHS: [usize; 3] = [128, 512, 2048];

fn make_anchors(width: usize) -> Vec<f32> {
    (0..width).map(|i| (i as f32 * 0.05).sin() * 2.0).collect()
}

/// Full step-plus-update pair through the raw entry points
fn bench_evolve_update(c: &mut Criterion) {
    let mut group = c.benchmark_group("evolve_update");
    for width in WIDTHS {
        let len = BATCHES * CHANNELS * width;
        let mut state = vec![0.1f32; len];
        let mut scratch = vec![0.0f32; len];
        let mut anchors = make_anchors(width);
        let adjustment = vec![0.01f32; width];
        let stencil = [0.25f32, 0.5, 0.25];

        group.throughput(Throughput::Elements((BATCHES * width) as u64 * STEPS as u64));
        group.bench_with_input(BenchmarkId::from_parameter(width), &width, |b, &width| {
            b.iter(|| {
                evolve(&mut state, &mut scratch, &stencil, &anchors, BATCHES, width, STEPS, 0.05);
                update_memory(&mut anchors, black_box(&adjustment), width, 0.01, 1.0, 0.0);
            });
        });
    }
    group.finish();
}

/// Sequential vs rayon over the same lattice
fn bench_kernel_scheduling(c: &mut Criterion) {
    let cfg = KernelConfig::default();
    let stencil = Stencil::default();
    let params = EvolveParams::new(STEPS, 0.05);

    let mut group = c.benchmark_group("kernel_scheduling");
    for width in WIDTHS {
        let len = BATCHES * CHANNELS * width;
        let mut state = vec![0.1f32; len];
        let mut scratch = vec![0.0f32; len];
        let anchors = make_anchors(width);

        group.bench_with_input(BenchmarkId::new("sequential", width), &width, |b, &width| {
            b.iter(|| kernel::evolve_sequential(&mut state, &mut scratch, width, &stencil, &anchors, params, &cfg));
        });
        group.bench_with_input(BenchmarkId::new("parallel", width), &width, |b, &width| {
            b.iter(|| kernel::evolve_parallel(&mut state, &mut scratch, width, &stencil, &anchors, params, &cfg));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_evolve_update, bench_kernel_scheduling);
criterion_main!(benches);
