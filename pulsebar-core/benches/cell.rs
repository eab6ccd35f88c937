//! Broadcast cell throughput: set with fan-out to idle subscribers, and get.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use pulsebar_core::output::{Output, Segment};
use pulsebar_core::reactive::BroadcastCell;

fn set_with_subscribers(c: &mut Criterion) {
    let mut group = c.benchmark_group("set_fan_out");
    for subscribers in [0usize, 1, 8, 64] {
        let cell = BroadcastCell::new(0u64);
        let _subs: Vec<_> = (0..subscribers).map(|_| cell.subscribe()).collect();
        group.bench_with_input(BenchmarkId::from_parameter(subscribers), &cell, |b, cell| {
            let mut n = 0u64;
            b.iter(|| {
                n += 1;
                cell.set(black_box(n))
            });
        });
    }
    group.finish();
}

fn get_output(c: &mut Criterion) {
    let cell = BroadcastCell::new(
        Output::empty()
            .with(Segment::icon("mdi-coffee"))
            .with(Segment::text("up to date").with_icon("mdi-package-down")),
    );
    c.bench_function("get_output", |b| b.iter(|| black_box(cell.get())));
}

criterion_group!(benches, set_with_subscribers, get_output);
criterion_main!(benches);
