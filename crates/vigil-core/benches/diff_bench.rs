//! Diff engine and path keying benchmarks

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use vigil_core::diff;
use vigil_core::hash::PathKey;
use vigil_core::path::RelPath;

fn synthetic_lines(lines: usize, stamp: &str) -> Vec<u8> {
    let mut out = String::with_capacity(lines * 24);
    for i in 0..lines {
        out.push_str(&format!("line {i:06} {stamp}\n"));
    }
    out.into_bytes()
}

fn bench_diff_operations(c: &mut Criterion) {
    let small_before = synthetic_lines(50, "a");
    let mut small_after = small_before.clone();
    small_after.extend_from_slice(b"appended tail line\n");

    c.bench_function("diff_small_append", |b| {
        b.iter(|| diff::diff(black_box(Some(&small_before)), black_box(&small_after)));
    });

    let large_before = synthetic_lines(5_000, "a");
    let large_after = {
        let text = String::from_utf8(large_before.clone()).unwrap();
        let edited: Vec<String> = text
            .lines()
            .enumerate()
            .map(|(i, line)| {
                if i % 50 == 0 {
                    format!("edited {i}")
                } else {
                    line.to_string()
                }
            })
            .collect();
        (edited.join("\n") + "\n").into_bytes()
    };

    c.bench_function("diff_large_scattered_edits", |b| {
        b.iter(|| diff::diff(black_box(Some(&large_before)), black_box(&large_after)));
    });

    c.bench_function("diff_created_large", |b| {
        b.iter(|| diff::diff(None, black_box(&large_after)));
    });
}

fn bench_classify(c: &mut Criterion) {
    c.bench_function("classify_magnitude", |b| {
        b.iter(|| {
            for (before, after) in [(100u64, 250u64), (100, 0), (100, 30), (100, 101)] {
                black_box(diff::classify(black_box(before), black_box(after)));
            }
        });
    });
}

fn bench_path_key(c: &mut Criterion) {
    let path = RelPath::new("src/deeply/nested/module/implementation.rs").unwrap();

    c.bench_function("path_key_of", |b| {
        b.iter(|| PathKey::of(black_box(&path)));
    });

    let key = PathKey::of(&path);
    c.bench_function("path_key_to_hex", |b| {
        b.iter(|| black_box(&key).to_hex());
    });
}

criterion_group!(benches, bench_diff_operations, bench_classify, bench_path_key);
criterion_main!(benches);
