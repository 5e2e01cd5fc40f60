use anyhow::Context;
use clap::Parser;
use lru_notify::{Cache, CacheOptions, LruCache, RecordingObserver};
use rand::Rng;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::info;

/// Drives a shared LRU cache from several writer threads and logs every
/// eviction it announces.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// JSON options file, e.g. {"cache_size": 3}
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Cache capacity; overrides the options file
    #[arg(short, long)]
    capacity: Option<i64>,

    /// Number of writer threads
    #[arg(short, long, default_value = "2")]
    threads: usize,

    /// Writes per thread (runs until interrupted if omitted)
    #[arg(short, long)]
    iterations: Option<u64>,
}

fn load_options(path: Option<&Path>) -> anyhow::Result<CacheOptions> {
    let Some(path) = path else {
        return Ok(CacheOptions::default());
    };
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read options file {}", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse options file {}", path.display()))
}

fn writer(id: usize, cache: Arc<dyn Cache<String> + Send + Sync>, iterations: Option<u64>) {
    let mut rng = rand::thread_rng();
    let mut written = 0_u64;
    while iterations.map_or(true, |limit| written < limit) {
        let key = rng.gen_range(1..10).to_string();
        cache.add_or_update(key.clone(), format!("value from writer {}", id));
        info!(writer = id, key = %key, size = cache.current_size(), "wrote");

        thread::sleep(Duration::from_millis(rng.gen_range(300..=500)));
        written += 1;
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let args = Args::parse();

    let mut options = load_options(args.config.as_deref())?;
    if let Some(capacity) = args.capacity {
        options.cache_size = capacity;
    }

    let cache = Arc::new(LruCache::<String>::from_options(&options)?);
    info!(capacity = cache.capacity().get(), threads = args.threads, "cache ready");

    let observer = RecordingObserver::new("console");
    observer.subscribe(cache.as_ref());

    let handles: Vec<_> = (0..args.threads)
        .map(|id| {
            let cache: Arc<dyn Cache<String> + Send + Sync> = cache.clone();
            let iterations = args.iterations;
            thread::spawn(move || writer(id, cache, iterations))
        })
        .collect();

    for handle in handles {
        if handle.join().is_err() {
            anyhow::bail!("writer thread panicked");
        }
    }

    info!(
        evicted = observer.evicted_keys().len(),
        remaining = ?cache.keys(),
        "done"
    );
    Ok(())
}
