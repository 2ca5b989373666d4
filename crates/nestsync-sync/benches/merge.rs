//! Tree validation and merge throughput.

#![allow(clippy::unwrap_used, missing_docs)]

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use nestsync_core::build;
use nestsync_sync::merge::merge;
use nestsync_testkit::strategies::encode;
use nestsync_testkit::{log_entries, SourceTree};

/// Parents of a tree with a fan-out of four.
fn bushy_parents(nodes: usize) -> Vec<usize> {
    (1..nodes).map(|index| (index - 1) / 4).collect()
}

fn bench_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("build");
    for size in [100usize, 1_000, 10_000] {
        let mut nodes = encode(&bushy_parents(size));
        nodes.reverse();
        group.bench_with_input(BenchmarkId::from_parameter(size), &nodes, |b, nodes| {
            b.iter(|| build(black_box(nodes.clone())).unwrap());
        });
    }
    group.finish();
}

fn bench_merge(c: &mut Criterion) {
    let mut group = c.benchmark_group("merge_source_log");
    for inserts in [50usize, 500] {
        let mut source = SourceTree::new();
        let mut known = vec![source.insert_root("root").unwrap()];
        for step in 0..inserts {
            let parent = known[step / 3];
            known.push(source.insert_child("n", parent).unwrap());
        }
        let log = log_entries(1, source.take_changes());

        group.bench_with_input(BenchmarkId::from_parameter(inserts), &log, |b, log| {
            b.iter(|| merge(black_box(log), &[]));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_build, bench_merge);
criterion_main!(benches);
