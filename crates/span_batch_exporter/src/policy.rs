//! Flush decision over buffer state.

use crate::config::ExporterConfig;
use std::fmt;
use std::time::Duration;
use tokio::time::Instant;

/// Why a flush happened. Only used for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushReason {
    /// Buffered record count reached `max_batch_size`
    Size,
    /// `max_batch_wait` elapsed since the first buffered record
    Time,
}

impl fmt::Display for FlushReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Size => f.write_str("size"),
            Self::Time => f.write_str("time"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushDecision {
    Wait,
    Flush(FlushReason),
}

/// Size and time thresholds captured from the exporter configuration.
#[derive(Debug, Clone, Copy)]
pub struct FlushPolicy {
    max_batch_size: usize,
    max_batch_wait: Duration,
}

impl FlushPolicy {
    pub fn new(max_batch_size: usize, max_batch_wait: Duration) -> Self {
        Self {
            max_batch_size,
            max_batch_wait,
        }
    }

    pub fn from_config(config: &ExporterConfig) -> Self {
        Self::new(config.max_batch_size, config.max_batch_wait)
    }

    pub fn max_batch_wait(&self) -> Duration {
        self.max_batch_wait
    }

    /// Decides whether the buffer must be flushed now. The size check runs first,
    /// so it wins when both thresholds are met.
    pub fn evaluate(
        &self,
        count: usize,
        first_record_time: Option<Instant>,
        now: Instant,
    ) -> FlushDecision {
        if count == 0 {
            return FlushDecision::Wait;
        }
        if count >= self.max_batch_size {
            return FlushDecision::Flush(FlushReason::Size);
        }
        match first_record_time {
            Some(first) if now.saturating_duration_since(first) >= self.max_batch_wait => {
                FlushDecision::Flush(FlushReason::Time)
            }
            _ => FlushDecision::Wait,
        }
    }

    /// Best-effort label for a flush that is already happening: re-checks the
    /// size threshold instead of tracking the path that triggered it.
    pub fn reason_for(&self, count: usize) -> FlushReason {
        if count >= self.max_batch_size {
            FlushReason::Size
        } else {
            FlushReason::Time
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> FlushPolicy {
        FlushPolicy::new(3, Duration::from_millis(5000))
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_buffer_never_flushes() {
        let now = Instant::now();
        let later = now + Duration::from_secs(60);
        assert_eq!(policy().evaluate(0, None, now), FlushDecision::Wait);
        assert_eq!(policy().evaluate(0, Some(now), later), FlushDecision::Wait);
    }

    #[tokio::test(start_paused = true)]
    async fn test_size_trigger() {
        let now = Instant::now();
        assert_eq!(policy().evaluate(2, Some(now), now), FlushDecision::Wait);
        assert_eq!(
            policy().evaluate(3, Some(now), now),
            FlushDecision::Flush(FlushReason::Size)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_time_trigger_boundary() {
        let first = Instant::now();
        let almost = first + Duration::from_millis(4999);
        let due = first + Duration::from_millis(5000);
        assert_eq!(policy().evaluate(1, Some(first), almost), FlushDecision::Wait);
        assert_eq!(
            policy().evaluate(1, Some(first), due),
            FlushDecision::Flush(FlushReason::Time)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_size_wins_tie() {
        let first = Instant::now();
        let due = first + Duration::from_secs(10);
        assert_eq!(
            policy().evaluate(3, Some(first), due),
            FlushDecision::Flush(FlushReason::Size)
        );
    }

    #[test]
    fn test_reason_label() {
        assert_eq!(policy().reason_for(5), FlushReason::Size);
        assert_eq!(policy().reason_for(1), FlushReason::Time);
        assert_eq!(FlushReason::Size.to_string(), "size");
        assert_eq!(FlushReason::Time.to_string(), "time");
    }
}
