//! memocache: client-side caching for the listing admin.
//! Generic memoizers over a keyed cache, plus a translation cache that
//! deduplicates in-flight requests and tracks backend health.

pub mod config;
pub mod memo;
pub mod pending;
pub mod status;
pub mod translate;

pub use config::{ConfigError, TranslateConfig};
pub use memo::{
    memoize, memoize_complex, memoize_lru, memoize_with_key_fn, BoundedCache, CacheStore, KeyedCache, MemoStats,
    Memoizer, DEFAULT_LRU_SIZE,
};
pub use pending::{Attach, PendingGuard, PendingRequestRegistry};
pub use status::{ServiceStatus, ServiceStatusStore, StatusSnapshot};
pub use translate::{
    HttpTranslator, ServiceInfo, TranslateError, TranslateRequest, TranslateResponse, TranslationCache,
    TranslationCacheStats, Translator,
};

/// Install the global tracing subscriber.
///
/// Filter comes from `RUST_LOG`, defaulting to `memocache=debug`. Set
/// `MEMOCACHE_LOG_FORMAT=json` for JSON lines. A second call is a no-op.
pub fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("memocache=debug"));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true);

    let json = std::env::var("MEMOCACHE_LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));
    let _ = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };

    tracing::info!("memocache tracing initialized");
}
