use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rs2_compose::*;
use std::time::Duration;
use tokio::runtime::Runtime;

// Pure CPU work per inner step
async fn light_cpu_task(x: u64) -> StreamResult<u64> {
    let mut result = x;
    for _ in 0..5 {
        result = result.wrapping_mul(17).wrapping_add(1);
    }
    Ok(black_box(result))
}

// A short sleep per inner step, where concurrency should pay off
async fn io_simulation_task(x: u64) -> StreamResult<u64> {
    tokio::time::sleep(Duration::from_micros(200)).await;
    Ok(x)
}

/// The same nested loop under any monadic policy.
fn nested_cpu<P: Monadic>(outer: u64, inner: u64) -> Stream<u64, P> {
    each(0..outer).bind(move |x| each(0..inner).map_m(move |y| light_cpu_task(x * inner + y)))
}

fn nested_io<P: Monadic>(outer: u64, inner: u64) -> Stream<u64, P> {
    each(0..outer).bind(move |x| each(0..inner).map_m(move |y| io_simulation_task(x * inner + y)))
}

fn bench_policies(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let mut group = c.benchmark_group("nested_loop_policies");
    group.measurement_time(Duration::from_secs(10));
    group.sample_size(20);

    let (outer, inner) = (50u64, 20u64);
    let size = outer * inner;

    group.bench_with_input(BenchmarkId::new("cpu_serial", size), &(outer, inner), |b, &(o, i)| {
        b.to_async(&rt).iter(|| async move { black_box(nested_cpu::<Serial>(o, i).length().await.unwrap()) });
    });
    group.bench_with_input(BenchmarkId::new("cpu_interleaved", size), &(outer, inner), |b, &(o, i)| {
        b.to_async(&rt).iter(|| async move { black_box(nested_cpu::<Interleaved>(o, i).length().await.unwrap()) });
    });
    group.bench_with_input(BenchmarkId::new("cpu_async", size), &(outer, inner), |b, &(o, i)| {
        b.to_async(&rt).iter(|| async move { black_box(nested_cpu::<Async>(o, i).length().await.unwrap()) });
    });
    group.bench_with_input(BenchmarkId::new("cpu_parallel", size), &(outer, inner), |b, &(o, i)| {
        b.to_async(&rt).iter(|| async move { black_box(nested_cpu::<Parallel>(o, i).length().await.unwrap()) });
    });

    let (outer, inner) = (20u64, 5u64);
    let size = outer * inner;

    group.bench_with_input(BenchmarkId::new("io_serial", size), &(outer, inner), |b, &(o, i)| {
        b.to_async(&rt).iter(|| async move { black_box(nested_io::<Serial>(o, i).length().await.unwrap()) });
    });
    group.bench_with_input(BenchmarkId::new("io_async", size), &(outer, inner), |b, &(o, i)| {
        b.to_async(&rt).iter(|| async move { black_box(nested_io::<Async>(o, i).length().await.unwrap()) });
    });
    group.bench_with_input(BenchmarkId::new("io_parallel", size), &(outer, inner), |b, &(o, i)| {
        b.to_async(&rt).iter(|| async move { black_box(nested_io::<Parallel>(o, i).length().await.unwrap()) });
    });

    group.finish();
}

fn bench_zips(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let mut group = c.benchmark_group("zips");
    group.sample_size(20);

    for size in [100u64, 1000] {
        group.bench_with_input(BenchmarkId::new("zip_serial", size), &size, |b, &n| {
            b.to_async(&rt).iter(|| async move {
                let s: ZipSerialStream<u64> = from_list(0..n).map_m(io_simulation_task).zip_with(from_list(0..n), |a, b| a + b);
                black_box(s.sum().await.unwrap())
            });
        });
        group.bench_with_input(BenchmarkId::new("zip_async", size), &size, |b, &n| {
            b.to_async(&rt).iter(|| async move {
                let s: ZipAsyncStream<u64> = from_list(0..n).map_m(io_simulation_task).zip_with(from_list(0..n), |a, b| a + b);
                black_box(s.sum().await.unwrap())
            });
        });
    }

    group.finish();
}

fn bench_config_presets(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let mut group = c.benchmark_group("async_config_presets");
    group.sample_size(20);

    for (name, config) in [
        ("default", SchedulerConfig::default()),
        ("cpu_bound", SchedulerConfig::cpu_bound()),
        ("eager_fork", SchedulerConfig::new().fork_threshold(16)),
    ] {
        group.bench_with_input(BenchmarkId::new(name, 100), &config, |b, config| {
            b.to_async(&rt).iter(|| async {
                let s: AsyncStream<u64> = each(0..20u64)
                    .with_config(config.clone())
                    .bind(|x| each(0..5u64).map_m(move |y| io_simulation_task(x * 5 + y)));
                black_box(s.length().await.unwrap())
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_policies, bench_zips, bench_config_presets);
criterion_main!(benches);
