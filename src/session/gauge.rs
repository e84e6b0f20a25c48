//! Active/peak counters for a bounded pool of concurrent operations.

use std::sync::atomic::{AtomicUsize, Ordering};

/// Tracks how many operations of one kind are running and the highest
/// simultaneous count observed.
#[derive(Debug, Default)]
pub struct ConcurrencyGauge {
    active: AtomicUsize,
    peak: AtomicUsize,
}

impl ConcurrencyGauge {
    /// Creates a gauge at zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks one operation as started; the returned guard marks it finished on drop.
    #[must_use = "the operation is counted as active only while the guard lives"]
    pub fn enter(&self) -> GaugeGuard<'_> {
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        GaugeGuard { gauge: self }
    }

    /// Operations currently running.
    #[must_use]
    pub fn active(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    /// Highest simultaneous count observed so far.
    #[must_use]
    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

/// Decrements the owning gauge when dropped.
#[derive(Debug)]
pub struct GaugeGuard<'a> {
    gauge: &'a ConcurrencyGauge,
}

impl Drop for GaugeGuard<'_> {
    fn drop(&mut self) {
        self.gauge.active.fetch_sub(1, Ordering::SeqCst);
    }
}
