//! Translation cache with in-flight request deduplication.
//!
//! Lookup order per call: no-op fast path, cached result, join an in-flight
//! request for the same key, otherwise start one remote call. At most one
//! remote call per `(text, from_lang, to_lang)` is in flight at any time.
//! Failures are never cached; the next call for the key tries again.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use futures_util::future::FutureExt;
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

use super::languages::same_language;
use super::{TranslateError, TranslateRequest, Translator};
use crate::config::TranslateConfig;
use crate::memo::KeyedCache;
use crate::pending::{PendingGuard, PendingRequestRegistry};
use crate::status::{ServiceStatus, ServiceStatusStore, StatusSnapshot};

/// Cache key: text plus source and target language, kept as separate fields
/// so no choice of language codes can make two requests share an entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TranslationKey {
    text: String,
    from_lang: String,
    to_lang: String,
}

impl TranslationKey {
    pub fn new(text: &str, from_lang: &str, to_lang: &str) -> Self {
        Self {
            text: text.to_string(),
            from_lang: from_lang.to_string(),
            to_lang: to_lang.to_string(),
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn from_lang(&self) -> &str {
        &self.from_lang
    }

    pub fn to_lang(&self) -> &str {
        &self.to_lang
    }
}

impl fmt::Display for TranslationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}->{}:", self.from_lang, self.to_lang)?;
        // Keys embed whole listing descriptions; keep log lines short.
        let short: String = self.text.chars().take(48).collect();
        if short.len() < self.text.len() {
            write!(f, "{short}…")
        } else {
            f.write_str(&self.text)
        }
    }
}

type Registry = PendingRequestRegistry<TranslationKey, String, TranslateError>;
type Guard = PendingGuard<TranslationKey, String, TranslateError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize)]
pub struct TranslationCacheStats {
    pub hits: u64,
    pub misses: u64,
    /// Calls that attached to an already running remote call.
    pub joined: u64,
    pub remote_calls: u64,
    pub failures: u64,
    pub entries: usize,
    pub pending: usize,
}

#[derive(Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    joined: AtomicU64,
    remote_calls: AtomicU64,
    failures: AtomicU64,
}

struct Inner {
    translator: Arc<dyn Translator>,
    results: KeyedCache<TranslationKey, String>,
    pending: Arc<Registry>,
    status: Arc<ServiceStatusStore>,
    source_lang: String,
    target_lang: String,
    cache_degraded: bool,
    counters: Counters,
}

/// Cloning shares the same cache, registry and status store.
#[derive(Clone)]
pub struct TranslationCache {
    inner: Arc<Inner>,
}

impl TranslationCache {
    pub fn new(translator: Arc<dyn Translator>, config: &TranslateConfig) -> Self {
        Self::with_status_store(translator, config, Arc::new(ServiceStatusStore::new()))
    }

    /// Report into an existing status store, e.g. one shared by several caches.
    pub fn with_status_store(
        translator: Arc<dyn Translator>,
        config: &TranslateConfig,
        status: Arc<ServiceStatusStore>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                translator,
                results: KeyedCache::new(),
                pending: Arc::new(Registry::new()),
                status,
                source_lang: config.source_lang.clone(),
                target_lang: config.target_lang.clone(),
                cache_degraded: config.cache_degraded,
                counters: Counters::default(),
            }),
        }
    }

    /// Translate `text`, going to the remote translator only on a cache miss
    /// with no identical request already in flight.
    ///
    /// `to_lang` defaults to the configured target language. Text that is
    /// blank, or already in the target language, comes back unchanged without
    /// touching the cache, the network or the status store.
    pub async fn translate(&self, text: &str, from_lang: &str, to_lang: Option<&str>) -> Result<String, TranslateError> {
        let inner = &self.inner;
        let target = to_lang.unwrap_or(&inner.target_lang);

        if same_language(from_lang, target) || text.trim().is_empty() {
            return Ok(text.to_string());
        }

        let key = TranslationKey::new(text, from_lang, target);

        if let Some(cached) = inner.results.get(&key) {
            inner.counters.hits.fetch_add(1, Ordering::Relaxed);
            debug!(key = %key, "translation_cache_hit");
            return Ok(cached);
        }

        let request = TranslateRequest::new(text, from_lang, target);
        let task_inner = Arc::clone(inner);
        let attach = inner.pending.claim(
            key,
            |key| inner.results.get(key),
            move |guard| {
                let handle = tokio::spawn(task_inner.run_remote(request, guard));
                async move {
                    handle
                        .await
                        .unwrap_or_else(|e| Err(TranslateError::TaskFailed(e.to_string())))
                }
                .boxed()
            },
        );

        if attach.is_joined() {
            inner.counters.joined.fetch_add(1, Ordering::Relaxed);
        } else if attach.is_started() {
            inner.counters.misses.fetch_add(1, Ordering::Relaxed);
        } else {
            inner.counters.hits.fetch_add(1, Ordering::Relaxed);
        }

        attach.wait().await
    }

    /// Translate from the configured source language.
    pub async fn translate_default(&self, text: &str, to_lang: Option<&str>) -> Result<String, TranslateError> {
        self.translate(text, &self.inner.source_lang, to_lang).await
    }

    /// Cached translation without going to the network.
    pub fn cached(&self, text: &str, from_lang: &str, to_lang: &str) -> Option<String> {
        self.inner.results.get(&TranslationKey::new(text, from_lang, to_lang))
    }

    pub fn is_pending(&self, text: &str, from_lang: &str, to_lang: &str) -> bool {
        self.inner
            .pending
            .contains(&TranslationKey::new(text, from_lang, to_lang))
    }

    pub fn translation_status(&self) -> ServiceStatus {
        self.inner.status.status()
    }

    pub fn translation_message(&self) -> String {
        self.inner.status.message()
    }

    pub fn status_snapshot(&self) -> StatusSnapshot {
        self.inner.status.snapshot()
    }

    pub fn status_store(&self) -> &Arc<ServiceStatusStore> {
        &self.inner.status
    }

    pub fn clear_status(&self) {
        self.inner.status.clear_status();
    }

    /// Drop every cached translation. In-flight requests are unaffected.
    pub fn clear(&self) {
        self.inner.results.clear();
        info!("translation cache cleared");
    }

    pub fn len(&self) -> usize {
        self.inner.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.results.is_empty()
    }

    pub fn stats(&self) -> TranslationCacheStats {
        let c = &self.inner.counters;
        TranslationCacheStats {
            hits: c.hits.load(Ordering::Relaxed),
            misses: c.misses.load(Ordering::Relaxed),
            joined: c.joined.load(Ordering::Relaxed),
            remote_calls: c.remote_calls.load(Ordering::Relaxed),
            failures: c.failures.load(Ordering::Relaxed),
            entries: self.inner.results.len(),
            pending: self.inner.pending.len(),
        }
    }
}

impl Inner {
    /// Runs as a spawned task so it completes even if every caller is dropped.
    /// The guard is released last, after the result has been published.
    async fn run_remote(self: Arc<Self>, request: TranslateRequest, guard: Guard) -> Result<String, TranslateError> {
        let request_id = Uuid::new_v4().to_string();
        let span = info_span!(
            "remote_translate",
            request_id = %request_id,
            from = %request.from_lang,
            to = %request.to_lang
        );
        self.counters.remote_calls.fetch_add(1, Ordering::Relaxed);

        let outcome = self.translator.translate(&request).instrument(span).await;

        let result = match outcome {
            Ok(response) => {
                let status = response.status();
                if status.is_nominal() || self.cache_degraded {
                    self.results
                        .insert(guard.key().clone(), response.translated_text.clone());
                }
                if let Some(info) = response.service_info.filter(|info| !info.status.is_nominal()) {
                    warn!(
                        request_id = %request_id,
                        status = %info.status,
                        service_message = %info.message,
                        "translation degraded"
                    );
                    self.status.set_status(info.status, info.message);
                }
                debug!(request_id = %request_id, key = %guard.key(), "translation_cached");
                Ok(response.translated_text)
            }
            Err(e) => {
                self.counters.failures.fetch_add(1, Ordering::Relaxed);
                warn!(request_id = %request_id, error = %e, "translation failed");
                self.status.set_status(ServiceStatus::Error, e.to_string());
                Err(e)
            }
        };

        drop(guard);
        result
    }
}
