use criterion::{black_box, criterion_group, criterion_main, Criterion};
use lru_notify::{EvictionNotification, EvictionObserver, LruCache, LruCacheConfig};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[derive(Default)]
struct CountingObserver(AtomicUsize);

impl EvictionObserver for CountingObserver {
    fn on_evicted(&self, _notification: &EvictionNotification) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }
}

fn make_lru(cap: usize) -> LruCache<usize> {
    let config = LruCacheConfig::new(cap).unwrap();
    LruCache::init(config)
}

fn keys(n: usize) -> Vec<String> {
    (0..n).map(|i| format!("key_{}", i)).collect()
}

pub fn criterion_benchmark(c: &mut Criterion) {
    const CACHE_SIZE: usize = 1000;
    let mut group = c.benchmark_group("Cache Operations");

    let hot = keys(CACHE_SIZE);
    let cold: Vec<String> = (CACHE_SIZE..CACHE_SIZE * 2)
        .map(|i| format!("key_{}", i))
        .collect();

    {
        let cache = make_lru(CACHE_SIZE);
        for (i, key) in hot.iter().enumerate() {
            cache.add_or_update(key.as_str(), i);
        }

        group.bench_function("LRU get hit", |b| {
            b.iter(|| {
                for key in hot.iter().take(100) {
                    black_box(cache.get(key));
                }
            });
        });

        group.bench_function("LRU get miss", |b| {
            b.iter(|| {
                for key in cold.iter().take(100) {
                    black_box(cache.get(key));
                }
            });
        });

        group.bench_function("LRU update existing", |b| {
            b.iter(|| {
                for (i, key) in hot.iter().take(100).enumerate() {
                    cache.add_or_update(key.as_str(), black_box(i));
                }
            });
        });
    }

    // every insert of a fresh key evicts once the cache is full
    {
        let cache = make_lru(CACHE_SIZE);
        let mut next = 0_usize;
        group.bench_function("LRU insert with eviction", |b| {
            b.iter(|| {
                for _ in 0..100 {
                    cache.add_or_update(format!("key_{}", next), next);
                    next += 1;
                }
            });
        });
    }

    {
        let cache = make_lru(CACHE_SIZE);
        let observers: Vec<_> = (0..4)
            .map(|_| Arc::new(CountingObserver::default()))
            .collect();
        let _subs: Vec<_> = observers
            .iter()
            .map(|observer| cache.subscribe(observer.clone()))
            .collect();
        let mut next = 0_usize;
        group.bench_function("LRU insert with eviction (4 observers)", |b| {
            b.iter(|| {
                for _ in 0..100 {
                    cache.add_or_update(format!("key_{}", next), next);
                    next += 1;
                }
            });
        });
    }

    group.finish();
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
