use bptdb::{BPlusTree, Key, TreeConfig};
use criterion::{criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion, Throughput};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use tempfile::tempdir;

fn make_keys(n: usize, shuffled: bool) -> Vec<Key> {
    let mut keys: Vec<Key> = (0..n)
        .map(|i| Key::new(&format!("{:08}", i)).unwrap())
        .collect();
    if shuffled {
        keys.shuffle(&mut StdRng::seed_from_u64(42));
    }
    keys
}

fn bench_bulk_insert(c: &mut Criterion) {
    let mut group = c.benchmark_group("bulk_insert");
    group.sample_size(10);

    for &order in &[4usize, 64] {
        for &n in &[1_000usize, 10_000] {
            group.throughput(Throughput::Elements(n as u64));

            for (name, shuffled) in [("sequential", false), ("shuffled", true)] {
                let keys = make_keys(n, shuffled);
                let id = BenchmarkId::new(format!("{}/order{}", name, order), n);

                group.bench_with_input(id, &keys, |b, keys| {
                    b.iter_batched(
                        || {
                            let dir = tempdir().unwrap();
                            let config = TreeConfig::default().with_order(order);
                            let tree =
                                BPlusTree::open_with(dir.path().join("bench.db"), true, config)
                                    .unwrap();
                            (dir, tree)
                        },
                        |(_dir, mut tree)| {
                            for (i, key) in keys.iter().enumerate() {
                                tree.insert(*key, i as i32).unwrap();
                            }
                        },
                        BatchSize::PerIteration,
                    );
                });
            }
        }
    }

    group.finish();
}

fn bench_point_search(c: &mut Criterion) {
    let dir = tempdir().unwrap();
    let keys = make_keys(10_000, true);
    let mut tree = BPlusTree::open(dir.path().join("bench.db"), true).unwrap();
    for (i, key) in keys.iter().enumerate() {
        tree.insert(*key, i as i32).unwrap();
    }

    c.bench_function("search/order4/10000", |b| {
        let mut at = 0;
        b.iter(|| {
            let value = tree.search(&keys[at % keys.len()]).unwrap();
            at += 1;
            value
        });
    });
}

criterion_group!(benches, bench_bulk_insert, bench_point_search);
criterion_main!(benches);
