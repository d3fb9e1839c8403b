use crate::record::{SpanBatch, SpanRecord};
use tokio::time::Instant;

/// Pending records accumulated between flushes.
///
/// `first_record_time` is set on the empty to non-empty transition and cleared on
/// reset, so it is present exactly when the buffer holds records.
#[derive(Debug, Default)]
pub struct Buffer {
    records: Vec<SpanRecord>,
    first_record_time: Option<Instant>,
}

impl Buffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a record. Returns true if the buffer was empty before the call.
    pub fn push(&mut self, record: SpanRecord, now: Instant) -> bool {
        let was_empty = self.records.is_empty();
        if was_empty {
            self.first_record_time = Some(now);
        }
        self.records.push(record);

        debug_assert_eq!(self.first_record_time.is_some(), !self.records.is_empty());
        was_empty
    }

    /// Number of pending records
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// When the current generation of records started.
    pub fn first_record_time(&self) -> Option<Instant> {
        self.first_record_time
    }

    /// Snapshots the pending records and resets the buffer to empty.
    ///
    /// Returns `None` if nothing is pending.
    pub fn take(&mut self) -> Option<SpanBatch> {
        if self.records.is_empty() {
            return None;
        }
        self.first_record_time = None;
        Some(SpanBatch::with_records(std::mem::take(&mut self.records)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::span::Span;
    use chrono::Utc;
    use std::time::Duration;

    fn record(id: &str) -> SpanRecord {
        SpanRecord::from_span(&Span::new("t", id, "op", "generic"), Utc::now())
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_record_time_set_once_per_generation() {
        let mut buffer = Buffer::new();
        assert!(buffer.first_record_time().is_none());

        let t0 = Instant::now();
        assert!(buffer.push(record("a"), t0));
        assert_eq!(buffer.first_record_time(), Some(t0));

        let t1 = t0 + Duration::from_millis(300);
        assert!(!buffer.push(record("b"), t1));
        assert_eq!(buffer.first_record_time(), Some(t0));
        assert_eq!(buffer.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_take_resets_and_preserves_order() {
        let mut buffer = Buffer::new();
        let now = Instant::now();
        for id in ["a", "b", "c"] {
            buffer.push(record(id), now);
        }

        let batch = buffer.take().unwrap();
        let ids: Vec<_> = batch.records.iter().map(|r| r.span_id.as_str()).collect();
        assert_eq!(ids, ["a", "b", "c"]);

        assert!(buffer.is_empty());
        assert!(buffer.first_record_time().is_none());
        assert!(buffer.take().is_none());

        let later = now + Duration::from_secs(1);
        assert!(buffer.push(record("d"), later));
        assert_eq!(buffer.first_record_time(), Some(later));
    }
}
