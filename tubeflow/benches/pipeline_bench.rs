//! Benchmarks for siphon throughput.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use std::sync::Arc;
use tubeflow::prelude::*;
use tubeflow::testing::FakeDrain;

fn sync_series(c: &mut Criterion) {
    c.bench_function("series_sync_1k", |b| {
        b.iter(|| {
            let drain = FakeDrain::<u64>::new();
            let pipeline = series(FnTube::new("double", |n: u64| Emission::item(n * 2)))
                .then(FnTube::new("inc", |n: u64| Emission::item(n + 1)));
            let fount = IteratorFount::new(0..1_000_u64);
            fount.flow_into(&pipeline).flow_to(drain.clone() as Arc<dyn Drain<u64>>);
            black_box(drain.received().len())
        });
    });
}

fn resolved_deferreds(c: &mut Criterion) {
    c.bench_function("series_resolved_deferred_1k", |b| {
        b.iter(|| {
            let drain = FakeDrain::<u64>::new();
            let pipeline = series(FnTube::new("defer", |n: u64| {
                Emission::pending(Deferred::succeed(n))
            }));
            pipeline.flow_to(drain.clone());
            IteratorFount::new(0..1_000_u64).flow_to(pipeline.drain());
            black_box(drain.received().len())
        });
    });
}

fn buffered_flush(c: &mut Criterion) {
    c.bench_function("siphon_buffered_flush_1k", |b| {
        b.iter(|| {
            let drain = FakeDrain::<u64>::new();
            let pipeline = series(FnTube::new("fan", |n: u64| Emission::items(0..n)));
            pipeline.flow_to(drain.clone());
            let pause = pipeline.fount().pause_flow();
            IteratorFount::new(std::iter::once(1_000_u64)).flow_to(pipeline.drain());
            pause.unpause();
            black_box(drain.received().len())
        });
    });
}

criterion_group!(benches, sync_series, resolved_deferreds, buffered_flush);
criterion_main!(benches);
