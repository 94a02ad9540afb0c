//! Benchmarks for batch formation.

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use gpu_translate::batch::assembler::MaxiBatch;
use gpu_translate::batch::sentence::Sentence;

fn bench_sort_and_partition(c: &mut Criterion) {
    let lengths: Vec<usize> = (0..10_000).map(|i| (i * 31 + 7) % 120).collect();

    c.bench_function("maxi_sort_partition_10k", |b| {
        b.iter(|| {
            let mut maxi = MaxiBatch::new(10_000);
            for (i, &len) in lengths.iter().enumerate() {
                maxi.accept(Sentence::new(i as u64, vec![0; len]));
            }
            maxi.finalize();

            let mut cut = 0;
            loop {
                let mini = maxi.next_mini_batch(64);
                if mini.is_empty() {
                    break;
                }
                cut += mini.len();
            }
            black_box(cut);
        })
    });
}

fn bench_accept(c: &mut Criterion) {
    c.bench_function("maxi_accept_10k", |b| {
        b.iter(|| {
            let mut maxi = MaxiBatch::new(10_000);
            for i in 0..10_000u64 {
                maxi.accept(Sentence::new(i, black_box(vec![1, 2, 3])));
            }
            black_box(maxi.len());
        })
    });
}

criterion_group!(benches, bench_sort_and_partition, bench_accept);
criterion_main!(benches);
