//! Per-stage counters shared between workers.

use std::sync::atomic::{AtomicUsize, Ordering};

/// Counters for the page-harvesting stage.
#[derive(Debug, Default)]
pub struct HarvestStats {
    pages_fetched: AtomicUsize,
    pages_failed: AtomicUsize,
    ids_emitted: AtomicUsize,
    sentinels_skipped: AtomicUsize,
}

impl HarvestStats {
    /// Creates a tracker with zero counts.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Listing pages fetched successfully.
    #[must_use]
    pub fn pages_fetched(&self) -> usize {
        self.pages_fetched.load(Ordering::SeqCst)
    }

    /// Listing pages whose fetch failed after retries.
    #[must_use]
    pub fn pages_failed(&self) -> usize {
        self.pages_failed.load(Ordering::SeqCst)
    }

    /// Identifiers accepted by the pending queue.
    #[must_use]
    pub fn ids_emitted(&self) -> usize {
        self.ids_emitted.load(Ordering::SeqCst)
    }

    /// Deleted-item entries dropped before queueing.
    #[must_use]
    pub fn sentinels_skipped(&self) -> usize {
        self.sentinels_skipped.load(Ordering::SeqCst)
    }

    pub(super) fn record_page(&self, sentinels: usize) {
        self.pages_fetched.fetch_add(1, Ordering::SeqCst);
        self.sentinels_skipped.fetch_add(sentinels, Ordering::SeqCst);
    }

    pub(super) fn increment_pages_failed(&self) {
        self.pages_failed.fetch_add(1, Ordering::SeqCst);
    }

    pub(super) fn increment_emitted(&self) {
        self.ids_emitted.fetch_add(1, Ordering::SeqCst);
    }
}

/// Counters for the detail-resolution stage.
#[derive(Debug, Default)]
pub struct ResolveStats {
    resolved: AtomicUsize,
    fetch_failed: AtomicUsize,
    extract_failed: AtomicUsize,
}

impl ResolveStats {
    /// Creates a tracker with zero counts.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records delivered to the items queue.
    #[must_use]
    pub fn resolved(&self) -> usize {
        self.resolved.load(Ordering::SeqCst)
    }

    /// Identifiers abandoned because the detail fetch failed.
    #[must_use]
    pub fn fetch_failed(&self) -> usize {
        self.fetch_failed.load(Ordering::SeqCst)
    }

    /// Identifiers skipped because a required pattern was missing.
    #[must_use]
    pub fn extract_failed(&self) -> usize {
        self.extract_failed.load(Ordering::SeqCst)
    }

    /// Identifiers processed, whatever the outcome.
    #[must_use]
    pub fn total(&self) -> usize {
        self.resolved() + self.fetch_failed() + self.extract_failed()
    }

    pub(super) fn increment_resolved(&self) {
        self.resolved.fetch_add(1, Ordering::SeqCst);
    }

    pub(super) fn increment_fetch_failed(&self) {
        self.fetch_failed.fetch_add(1, Ordering::SeqCst);
    }

    pub(super) fn increment_extract_failed(&self) {
        self.extract_failed.fetch_add(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_harvest_stats_counts() {
        let stats = HarvestStats::new();
        stats.record_page(1);
        stats.record_page(0);
        stats.increment_pages_failed();
        stats.increment_emitted();
        assert_eq!(stats.pages_fetched(), 2);
        assert_eq!(stats.pages_failed(), 1);
        assert_eq!(stats.sentinels_skipped(), 1);
        assert_eq!(stats.ids_emitted(), 1);
    }

    #[test]
    fn test_resolve_stats_total() {
        let stats = ResolveStats::new();
        stats.increment_resolved();
        stats.increment_resolved();
        stats.increment_fetch_failed();
        stats.increment_extract_failed();
        assert_eq!(stats.total(), 4);
    }
}
