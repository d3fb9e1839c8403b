use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe export counters, updated by flush tasks.
#[derive(Debug, Default)]
pub struct ExportMetrics {
    /// Spans delivered to the backend
    spans_exported: AtomicU64,
    /// Batches delivered to the backend
    batches_exported: AtomicU64,
    /// Batches dropped after the transport gave up
    batches_dropped: AtomicU64,
    /// Spans lost with dropped batches
    spans_dropped: AtomicU64,
    /// Uploads currently in flight
    inflight_exports: AtomicU64,
}

impl ExportMetrics {
    pub fn spans_exported(&self) -> u64 {
        self.spans_exported.load(Ordering::Relaxed)
    }

    pub fn batches_exported(&self) -> u64 {
        self.batches_exported.load(Ordering::Relaxed)
    }

    pub fn batches_dropped(&self) -> u64 {
        self.batches_dropped.load(Ordering::Relaxed)
    }

    pub fn spans_dropped(&self) -> u64 {
        self.spans_dropped.load(Ordering::Relaxed)
    }

    pub fn inflight_exports(&self) -> u64 {
        self.inflight_exports.load(Ordering::Relaxed)
    }

    pub(crate) fn record_success(&self, span_count: u64) {
        self.spans_exported.fetch_add(span_count, Ordering::Relaxed);
        self.batches_exported.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_dropped(&self, span_count: u64) {
        self.spans_dropped.fetch_add(span_count, Ordering::Relaxed);
        self.batches_dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn inc_inflight(&self) {
        self.inflight_exports.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn dec_inflight(&self) {
        self.inflight_exports.fetch_sub(1, Ordering::Relaxed);
    }
}
