//! B+Tree insert and lookup benchmarks over a temporary buffer pool.

use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion, Throughput};
use pagetree::{BPlusTree, BufferPoolConfig, BufferPoolManager, MovieId, Rid, MOVIE_ID_INDEX};
use tempfile::TempDir;

const POOL_SIZE: usize = 256;
const KEY_COUNT: u32 = 10_000;

fn movie_id(n: u32) -> MovieId {
    MovieId::from(format!("tt{:07}", n).as_str())
}

fn open_pool(dir: &TempDir) -> BufferPoolManager {
    let config = BufferPoolConfig::new(POOL_SIZE, dir.path()).with_sync_writes(false);
    BufferPoolManager::open(config).expect("open buffer pool")
}

fn bench_insert(c: &mut Criterion) {
    let mut group = c.benchmark_group("btree_insert");
    group.throughput(Throughput::Elements(KEY_COUNT as u64));
    group.sample_size(10);

    group.bench_function("sequential", |b| {
        b.iter_batched(
            || TempDir::new().expect("tempdir"),
            |dir| {
                let bpm = open_pool(&dir);
                let tree = BPlusTree::<_, MovieId, Rid>::new(&bpm, MOVIE_ID_INDEX).unwrap();
                for i in 0..KEY_COUNT {
                    tree.insert(movie_id(i), Rid::new(i, 0)).unwrap();
                }
            },
            BatchSize::PerIteration,
        );
    });

    group.bench_function("scattered", |b| {
        b.iter_batched(
            || TempDir::new().expect("tempdir"),
            |dir| {
                let bpm = open_pool(&dir);
                let tree = BPlusTree::<_, MovieId, Rid>::new(&bpm, MOVIE_ID_INDEX).unwrap();
                for i in 0..KEY_COUNT {
                    let key = (i * 7919) % KEY_COUNT;
                    tree.insert(movie_id(key), Rid::new(key, 0)).unwrap();
                }
            },
            BatchSize::PerIteration,
        );
    });

    group.finish();
}

fn bench_lookup(c: &mut Criterion) {
    let dir = TempDir::new().expect("tempdir");
    let bpm = open_pool(&dir);
    let tree = BPlusTree::<_, MovieId, Rid>::new(&bpm, MOVIE_ID_INDEX).unwrap();
    for i in 0..KEY_COUNT {
        tree.insert(movie_id(i), Rid::new(i, 0)).unwrap();
    }

    let mut group = c.benchmark_group("btree_lookup");

    let mut next = 0u32;
    group.bench_function("point", |b| {
        b.iter(|| {
            next = (next + 7919) % KEY_COUNT;
            let hits = tree.search(&movie_id(next)).unwrap().count();
            black_box(hits)
        });
    });

    group.throughput(Throughput::Elements(1000));
    group.bench_function("range_1000", |b| {
        b.iter(|| {
            let rids = tree
                .range_search(&movie_id(4000), &movie_id(4999))
                .unwrap()
                .count();
            black_box(rids)
        });
    });

    group.finish();
}

criterion_group!(benches, bench_insert, bench_lookup);
criterion_main!(benches);
