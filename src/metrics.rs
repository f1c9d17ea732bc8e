//! Run counters for the end-of-run summary.
//!
//! One `RunMetrics` instance lives for the duration of a translation run and
//! is shared across the pipeline. Counters are relaxed atomics; nothing here
//! is ordering-sensitive.

use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Debug, Default)]
pub struct RunMetrics {
    cache_hits: AtomicUsize,
    cache_misses: AtomicUsize,
    override_hits: AtomicUsize,
    glossary_hits: AtomicUsize,
    backend_calls: AtomicUsize,
    backend_failures: AtomicUsize,
    flagged: AtomicUsize,
}

impl RunMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_cache_hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cache_miss(&self) {
        self.cache_misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_override_hit(&self) {
        self.override_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_glossary_hit(&self) {
        self.glossary_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_backend_call(&self) {
        self.backend_calls.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_backend_failure(&self) {
        self.backend_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// An output sent to the review log (echo, leakage, or empty result).
    pub fn record_flagged(&self) {
        self.flagged.fetch_add(1, Ordering::Relaxed);
    }

    pub fn cache_hits(&self) -> usize {
        self.cache_hits.load(Ordering::Relaxed)
    }

    pub fn backend_calls(&self) -> usize {
        self.backend_calls.load(Ordering::Relaxed)
    }

    pub fn flagged(&self) -> usize {
        self.flagged.load(Ordering::Relaxed)
    }

    /// Human-readable summary for the end-of-run log line.
    pub fn summary(&self) -> String {
        let hits = self.cache_hits.load(Ordering::Relaxed);
        let misses = self.cache_misses.load(Ordering::Relaxed);
        let total = hits + misses;
        let hit_rate = if total > 0 {
            (hits as f64 / total as f64) * 100.0
        } else {
            0.0
        };
        format!(
            "cache {}/{} ({:.0}% hit), overrides {}, glossary {}, backend {} ({} failed), flagged {}",
            hits,
            total,
            hit_rate,
            self.override_hits.load(Ordering::Relaxed),
            self.glossary_hits.load(Ordering::Relaxed),
            self.backend_calls.load(Ordering::Relaxed),
            self.backend_failures.load(Ordering::Relaxed),
            self.flagged.load(Ordering::Relaxed),
        )
    }
}
