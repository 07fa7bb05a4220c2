use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use flowspec::config::EngineConfig;
use flowspec::pipeline::Pipeline;
use flowspec::store::{ParameterState, ParameterStore};

/// Benchmark a full computation with an empty cache
fn bench_cold_run(c: &mut Criterion) {
    let mut group = c.benchmark_group("cold_run");

    for (name, config) in [
        ("interactive", EngineConfig::interactive()),
        ("high_resolution", EngineConfig::high_resolution()),
    ] {
        group.bench_with_input(BenchmarkId::from_parameter(name), &config, |b, config| {
            b.iter(|| {
                let mut pipeline = Pipeline::new(config.clone());
                let result = pipeline.run(black_box(&ParameterState::default())).unwrap();
                black_box(result);
            });
        });
    }

    group.finish();
}

/// Benchmark a run answered from the cache
fn bench_cached_run(c: &mut Criterion) {
    let mut pipeline = Pipeline::default();
    let state = ParameterState::default();
    pipeline.run(&state).unwrap();

    c.bench_function("cached_run", |b| {
        b.iter(|| {
            let result = pipeline.run(black_box(&state)).unwrap();
            black_box(result);
        });
    });
}

/// Benchmark dragging the window slider across the range and back
fn bench_slider_sweep(c: &mut Criterion) {
    let mut group = c.benchmark_group("slider_sweep");

    for steps in [10usize, 50, 100] {
        group.throughput(Throughput::Elements(2 * steps as u64));
        group.bench_with_input(BenchmarkId::from_parameter(steps), &steps, |b, &steps| {
            b.iter(|| {
                let mut store = ParameterStore::new();
                let mut pipeline = Pipeline::default();
                let positions = (0..steps).chain((0..steps).rev());
                for i in positions {
                    let state = store.set_window(i as f64 / steps as f64, 0.3);
                    black_box(pipeline.run_and_record(&state).unwrap());
                }
                black_box(pipeline.regression());
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_cold_run, bench_cached_run, bench_slider_sweep);
criterion_main!(benches);
