use assoc_maps::{HashOps, Map};
use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use std::time::Duration;

fn lcg(mut s: u64) -> impl Iterator<Item = u64> {
    std::iter::from_fn(move || {
        s = s.wrapping_mul(6364136223846793005).wrapping_add(1);
        Some(s)
    })
}

fn key(n: u64) -> String {
    format!("k{:016x}", n)
}

fn filled(seed: u64, n: usize) -> (Map<'static, str, u64>, Vec<String>) {
    let mut m = Map::new_hashed(HashOps::strings(), false);
    let keys: Vec<String> = lcg(seed).take(n).map(key).collect();
    for (i, k) in keys.iter().enumerate() {
        let _ = m.add(k.clone(), std::borrow::Cow::Owned(i as u64)).unwrap();
    }
    (m, keys)
}

fn bench_insert_fresh_100k(c: &mut Criterion) {
    // Includes every grow step through the prime table.
    c.bench_function("table::insert_fresh_100k", |b| {
        b.iter_batched(
            || lcg(1).take(100_000).map(key).collect::<Vec<_>>(),
            |keys| {
                let mut m: Map<'static, str, u64> = Map::new_hashed(HashOps::strings(), false);
                for (i, k) in keys.into_iter().enumerate() {
                    let _ = m.add(k, std::borrow::Cow::Owned(i as u64)).unwrap();
                }
                black_box(m)
            },
            BatchSize::SmallInput,
        )
    });
}

fn bench_drain_shrinking(c: &mut Criterion) {
    c.bench_function("table::delete_all_100k", |b| {
        b.iter_batched(
            || filled(3, 100_000),
            |(mut m, keys)| {
                for k in &keys {
                    black_box(m.delete(k));
                }
                black_box(m)
            },
            BatchSize::SmallInput,
        )
    });
}

fn bench_get_hit_10k(c: &mut Criterion) {
    c.bench_function("table::get_hit_10k_on_100k", |b| {
        let (m, keys) = filled(7, 100_000);
        let n = keys.len();
        let mut s = 0x9e3779b97f4a7c15u64;
        let queries: Vec<String> = (0..10_000)
            .map(|_| {
                s = s.wrapping_mul(2862933555777941757).wrapping_add(3037000493);
                keys[(s as usize) % n].clone()
            })
            .collect();
        b.iter(|| {
            for k in &queries {
                black_box(m.get(k));
            }
        })
    });
}

fn bench_get_miss_10k(c: &mut Criterion) {
    c.bench_function("table::get_miss_10k_on_100k", |b| {
        let (m, _) = filled(11, 100_000);
        let mut miss = lcg(0xdead_beef);
        b.iter(|| {
            for _ in 0..10_000 {
                let k = key(miss.next().unwrap());
                black_box(m.get(&k));
            }
        })
    });
}

fn bench_traverse_all_100k(c: &mut Criterion) {
    c.bench_function("table::traverse_all_100k", |b| {
        let (m, _) = filled(999, 100_000);
        b.iter(|| {
            let mut sum = 0u64;
            for (_k, v) in &m {
                sum = sum.wrapping_add(*v);
            }
            black_box(sum)
        })
    });
}

fn bench_config() -> Criterion {
    Criterion::default()
        .sample_size(12)
        .measurement_time(Duration::from_secs(5))
        .warm_up_time(Duration::from_secs(1))
}

criterion_group! {
    name = benches_insert;
    config = bench_config();
    targets = bench_insert_fresh_100k
}
criterion_group! {
    name = benches_ops;
    config = bench_config();
    targets = bench_drain_shrinking,
              bench_get_hit_10k,
              bench_get_miss_10k,
              bench_traverse_all_100k
}
criterion_main!(benches_insert, benches_ops);
