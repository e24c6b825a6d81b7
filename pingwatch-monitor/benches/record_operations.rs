use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use pingwatch_monitor::{HistoryStore, LogRecord, Measurement, SharedHistory};

/// Benchmark record() on a full window (eviction on every call)
fn bench_record_full_window(c: &mut Criterion) {
    let mut store = HistoryStore::new(1000);
    for i in 0..1000 {
        store.record(Measurement::reachable(i as f64));
    }
    let m = Measurement::reachable(12.5);

    c.bench_function("record_full_window", |b| {
        b.iter(|| store.record(black_box(m)));
    });
}

/// Benchmark the shared handle's record, which also computes the summary
fn bench_shared_record(c: &mut Criterion) {
    let history = SharedHistory::new(1000);
    let m = Measurement::reachable(12.5);

    c.bench_function("shared_record_with_summary", |b| {
        b.iter(|| black_box(history.record(black_box(m))));
    });
}

/// Benchmark summary() with varying window sizes (min/max scan the window)
fn bench_summary_varying_window(c: &mut Criterion) {
    let mut group = c.benchmark_group("summary_varying_window");

    for size in [10usize, 100, 1000, 10_000].iter() {
        let mut store = HistoryStore::new(*size);
        for i in 0..*size {
            let latency = if i % 10 == 0 { None } else { Some(i as f64) };
            store.record(Measurement::new(pingwatch_types::now(), latency));
        }

        group.throughput(Throughput::Elements(*size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &store, |b, store| {
            b.iter(|| black_box(store.summary()));
        });
    }
    group.finish();
}

/// Benchmark rehydrating from log text of varying length
fn bench_rehydrate(c: &mut Criterion) {
    let mut group = c.benchmark_group("rehydrate");

    for lines in [100usize, 1000, 10_000].iter() {
        let text: String = (0..*lines)
            .map(|i| {
                let latency = if i % 7 == 0 { None } else { Some(i as f64 / 3.0) };
                let record = LogRecord::Measurement(Measurement::new(pingwatch_types::now(), latency));
                format!("{}\n", record)
            })
            .collect();

        group.throughput(Throughput::Elements(*lines as u64));
        group.bench_with_input(BenchmarkId::from_parameter(lines), &text, |b, text| {
            b.iter(|| {
                let mut store = HistoryStore::new(1000);
                black_box(store.rehydrate(text.lines()))
            });
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_record_full_window,
    bench_shared_record,
    bench_summary_varying_window,
    bench_rehydrate
);
criterion_main!(benches);
