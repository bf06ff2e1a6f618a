//! Benchmarks for the hot paths of the operation algebra.

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use chainpad_core::{patch_hash, root_hash, TextOperation};

fn document(len: usize) -> String {
    "lorem ipsum dolor sit amet ".chars().cycle().take(len).collect()
}

fn bench_apply(c: &mut Criterion) {
    let doc = document(10_000);
    let op = TextOperation::new(5_000, 10, "replacement");
    c.bench_function("apply_10k", |b| b.iter(|| black_box(&op).apply(black_box(&doc))));
}

fn bench_transform(c: &mut Criterion) {
    let a = TextOperation::new(120, 30, "alpha");
    let b = TextOperation::new(100, 40, "beta");
    c.bench_function("transform_overlap", |bench| {
        bench.iter(|| black_box(&a).transform(black_box(&b)))
    });
}

fn bench_diff(c: &mut Criterion) {
    let old = document(10_000);
    let new = TextOperation::insert(7_500, "inserted").apply(&old).unwrap_or_default();
    c.bench_function("diff_10k", |b| {
        b.iter(|| TextOperation::diff(black_box(&old), black_box(&new)))
    });
}

fn bench_patch_hash(c: &mut Criterion) {
    let root = root_hash("bench", "");
    let op = TextOperation::insert(0, "hello world");
    c.bench_function("patch_hash", |b| b.iter(|| patch_hash(black_box(&root), black_box(&op))));
}

criterion_group!(benches, bench_apply, bench_transform, bench_diff, bench_patch_hash);
criterion_main!(benches);
