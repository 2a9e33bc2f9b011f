use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};

use tutti::prelude::*;

/// Measures the fixed cost of the batch machinery across widths, with
/// executors that do real but tiny work.
fn runner_overhead(c: &mut Criterion) {
    let mut group = c.benchmark_group("runner");
    for width in [1usize, 4, 16] {
        group.bench_with_input(BenchmarkId::from_parameter(width), &width, |b, &width| {
            b.iter(|| {
                Runner::new((0..1024u64).collect::<Vec<u64>>())
                    .partition_with(|numbers, parts| {
                        let size = usize::max(1, numbers.len() / parts);
                        numbers.chunks(size).map(<[u64]>::to_vec).collect()
                    })
                    .execute_with(|numbers: Vec<u64>| numbers.iter().sum::<u64>())
                    .merge_with(|sums| sums.iter().sum::<u64>())
                    .parts(16)
                    .unwrap()
                    .width(width)
                    .unwrap()
                    .run()
                    .unwrap()
            });
        });
    }
    group.finish();
}

criterion_group!(benches, runner_overhead);
criterion_main!(benches);
