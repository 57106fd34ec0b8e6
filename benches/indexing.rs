//! Indexing and search benchmarks over a generated corpus.
//!
//! Run with: `cargo bench`
//! Save baseline: `cargo bench -- --save-baseline main`
//! Compare: `cargo bench -- --baseline main`

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use quarry::index::{ConcurrentBuilder, IndexBuilder, InvertedIndex, ThreadSafeIndex};
use quarry::sync::WorkQueue;
use std::fs;
use std::hint::black_box;
use std::sync::Arc;
use tempfile::TempDir;

const SYLLABLES: &[&str] = &["ka", "lo", "mi", "ne", "su", "ta", "ri", "vo", "pe", "zu"];

/// Deterministic pseudo-words so runs are comparable
fn word(seed: usize) -> String {
    let mut n = seed.wrapping_mul(2_654_435_761) % 10_000;
    let mut word = String::new();
    for _ in 0..3 {
        word.push_str(SYLLABLES[n % SYLLABLES.len()]);
        n /= SYLLABLES.len();
    }
    word
}

fn document(doc: usize, words: usize) -> String {
    let mut text = String::new();
    for n in 0..words {
        text.push_str(&word(doc * 7919 + n));
        text.push(if n % 12 == 11 { '\n' } else { ' ' });
    }
    text
}

/// Temp directory with `files` text files of `words` words each
fn create_corpus(files: usize, words: usize) -> TempDir {
    let dir = TempDir::new().expect("Failed to create temp dir");
    for doc in 0..files {
        fs::write(dir.path().join(format!("doc_{}.txt", doc)), document(doc, words))
            .expect("Failed to write file");
    }
    dir
}

fn bench_build(c: &mut Criterion) {
    let corpus = create_corpus(200, 2_000);

    let mut group = c.benchmark_group("build");
    group.sample_size(10);

    group.bench_function("single", |b| {
        b.iter(|| {
            let mut index = InvertedIndex::new();
            IndexBuilder::new(&mut index).build(corpus.path()).unwrap();
            black_box(index.len())
        })
    });

    for threads in [2, 4, 8] {
        let queue = WorkQueue::new(threads).unwrap();
        group.bench_with_input(BenchmarkId::new("concurrent", threads), &threads, |b, _| {
            b.iter(|| {
                let index = Arc::new(ThreadSafeIndex::new());
                ConcurrentBuilder::new(Arc::clone(&index), queue.clone())
                    .build(corpus.path())
                    .unwrap();
                black_box(index.len())
            })
        });
        queue.shutdown();
    }
    group.finish();
}

fn bench_search(c: &mut Criterion) {
    let mut index = InvertedIndex::new();
    for doc in 0..500 {
        let location = format!("doc_{}.txt", doc);
        let words: Vec<String> = (0..500).map(|n| word(doc * 7919 + n)).collect();
        index.add_all(&words, &location, 0);
    }
    let terms: Vec<String> = (0..5).map(word).collect();
    let prefixes: Vec<String> = terms.iter().map(|t| t[..2].to_string()).collect();

    let mut group = c.benchmark_group("search");
    group.bench_function("exact", |b| b.iter(|| index.search(black_box(&terms), true)));
    group.bench_function("partial", |b| {
        b.iter(|| index.search(black_box(&prefixes), false))
    });
    group.finish();
}

fn bench_merge(c: &mut Criterion) {
    let shards: Vec<InvertedIndex> = (0..50)
        .map(|doc| {
            let mut shard = InvertedIndex::new();
            let words: Vec<String> = (0..1_000).map(|n| word(doc * 7919 + n)).collect();
            shard.add_all(&words, &format!("doc_{}.txt", doc), 0);
            shard
        })
        .collect();

    c.bench_function("merge_50_shards", |b| {
        b.iter(|| {
            let mut index = InvertedIndex::new();
            for shard in shards.iter().cloned() {
                index.merge(shard);
            }
            black_box(index.len())
        })
    });
}

criterion_group!(benches, bench_build, bench_search, bench_merge);
criterion_main!(benches);
