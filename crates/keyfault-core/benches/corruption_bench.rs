//! Criterion benchmarks for the corruption hot path.
//!
//! The service callback runs on every keyboard interrupt batch, so
//! `corrupt_batch` must stay cheap across all modes and probabilities.
//!
//! Run with:
//! ```bash
//! cargo bench --package keyfault-core --bench corruption_bench
//! ```

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use keyfault_core::{corrupt_batch, CorruptionMode, FilterConfig, FilterState, KeyEvent};

/// Typical interrupt batch: alternating key-down/key-up over the letter rows.
fn make_batch(len: usize) -> Vec<KeyEvent> {
    (0..len)
        .map(|i| {
            let scan_code = 0x10 + (i % 16) as u16;
            if i % 2 == 0 {
                KeyEvent::make(scan_code)
            } else {
                KeyEvent::break_(scan_code)
            }
        })
        .collect()
}

fn state_with(probability: u32, mode: CorruptionMode) -> FilterState {
    let state = FilterState::with_seed(0x1234_5678);
    state.apply(FilterConfig::new(probability, mode));
    state
}

/// Benchmarks each mode at the default 10 % probability.
fn bench_modes(c: &mut Criterion) {
    let modes: &[(&str, CorruptionMode)] = &[
        ("Normal", CorruptionMode::Normal),
        ("Chaos", CorruptionMode::Chaos),
        ("DropLetters", CorruptionMode::DropLetters),
        ("DropSpace", CorruptionMode::DropSpace),
    ];

    let mut group = c.benchmark_group("corrupt_batch_128");
    for (name, mode) in modes {
        let state = state_with(10, *mode);
        group.bench_with_input(BenchmarkId::new("mode", name), &state, |b, state| {
            b.iter_batched(
                || make_batch(128),
                |mut batch| corrupt_batch(black_box(state), black_box(&mut batch)),
                criterion::BatchSize::SmallInput,
            )
        });
    }
    group.finish();
}

/// Benchmarks the worst case: every key-down selected and rewritten.
fn bench_full_probability(c: &mut Criterion) {
    let state = state_with(100, CorruptionMode::Chaos);

    let mut group = c.benchmark_group("corrupt_batch_full_probability");
    for len in [16usize, 128, 1024] {
        group.bench_with_input(BenchmarkId::new("batch", len), &len, |b, &len| {
            b.iter_batched(
                || make_batch(len),
                |mut batch| corrupt_batch(black_box(&state), black_box(&mut batch)),
                criterion::BatchSize::SmallInput,
            )
        });
    }
    group.finish();
}

criterion_group!(benches, bench_modes, bench_full_probability);
criterion_main!(benches);
