//! Batching span exporter.
//!
//! [`BatchSpanExporter`] receives tracing events one at a time, keeps the finished
//! spans in a [`Buffer`], and uploads them in batches when either trigger fires:
//!
//! - **size**: the buffer reaches `max_batch_size` records, flushed immediately
//! - **time**: `max_batch_wait` has elapsed since the first record of the batch,
//!   flushed by the single pending [`FlushTimer`]
//!
//! A flush snapshots the buffer and resets it under the state lock, then uploads
//! the snapshot on a Tokio task with the lock released. Records arriving during
//! an upload start a fresh buffer and timer cycle.
//!
//! Failures never reach the caller: a batch the uploader gives up on is logged
//! and dropped.
//!
//! # Example
//!
//! ```rust,ignore
//! use span_batch_exporter::{ExporterConfig, HttpSpanExporter, Span, TracingEvent};
//!
//! let config = ExporterConfig::new(token, "https://ingest.example.com/v1/spans");
//! let exporter = HttpSpanExporter::from_config(&config)?;
//!
//! let mut span = Span::new("trace-1", "span-1", "agent run", "agent_run");
//! span.end(None);
//! exporter.export_event(&TracingEvent::ended(span));
//!
//! exporter.shutdown().await;
//! ```

use crate::buffer::Buffer;
use crate::config::ExporterConfig;
use crate::error::ConfigError;
use crate::metrics::ExportMetrics;
use crate::policy::{FlushDecision, FlushPolicy, FlushReason};
use crate::record::{SpanBatch, SpanRecord};
use crate::span::{TracingEvent, TracingEventType};
use crate::timer::{FlushTimer, TimerId};
use crate::transport::ReqwestTransport;
use crate::uploader::{BatchUploader, HttpUploadClient};
use chrono::Utc;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::runtime::Handle;
use tokio::sync::OnceCell;
use tokio::task::{JoinError, JoinSet};
use tokio::time::Instant;
use tracing::{debug, error, info};

/// Exporter uploading over HTTP with the retrying `reqwest` transport.
pub type HttpSpanExporter = BatchSpanExporter<HttpUploadClient<ReqwestTransport>>;

/// Mutable state guarded by one lock. Never held across an upload.
struct ExporterState {
    buffer: Buffer,
    timer: FlushTimer,
    /// Dispatched flushes that may still be uploading
    inflight: JoinSet<()>,
    is_shutdown: bool,
}

struct Shared<U> {
    policy: FlushPolicy,
    uploader: U,
    runtime: Handle,
    state: Mutex<ExporterState>,
    metrics: ExportMetrics,
    /// Set once the shutdown drain has finished
    shutdown_done: OnceCell<()>,
}

/// Buffers finished spans and uploads them in size- or time-triggered batches.
///
/// Cloning is cheap and yields a handle to the same buffer.
pub struct BatchSpanExporter<U: BatchUploader + 'static> {
    shared: Arc<Shared<U>>,
}

impl<U: BatchUploader + 'static> Clone for BatchSpanExporter<U> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<U: BatchUploader + 'static> BatchSpanExporter<U> {
    /// Creates an exporter that hands batches to `uploader`.
    ///
    /// Must be called from within a Tokio runtime; flush timers and uploads run on
    /// that runtime, while `export_event` may be called from any thread.
    pub fn new(config: &ExporterConfig, uploader: U) -> Result<Self, ConfigError> {
        config.validate()?;
        let runtime = Handle::try_current().map_err(|_| ConfigError::NoRuntime)?;

        Ok(Self {
            shared: Arc::new(Shared {
                policy: FlushPolicy::from_config(config),
                uploader,
                runtime,
                state: Mutex::new(ExporterState {
                    buffer: Buffer::new(),
                    timer: FlushTimer::new(),
                    inflight: JoinSet::new(),
                    is_shutdown: false,
                }),
                metrics: ExportMetrics::default(),
                shutdown_done: OnceCell::new(),
            }),
        })
    }

    /// Accepts one tracing event. Only `SpanEnded` events are buffered; started
    /// and updated events are ignored.
    pub fn export_event(&self, event: &TracingEvent) {
        if event.event_type != TracingEventType::SpanEnded {
            return;
        }
        let record = SpanRecord::from_span(&event.span, Utc::now());
        self.shared.append(record);
    }

    /// Cancels the pending timer, flushes whatever is buffered, and waits for that
    /// flush and any still-running ones to finish. Later events are ignored.
    ///
    /// Upload failures are logged, never returned. Concurrent and repeated calls all
    /// wait for the same drain to finish.
    pub async fn shutdown(&self) {
        self.shared
            .shutdown_done
            .get_or_init(|| self.shared.drain())
            .await;
    }

    /// Export counters.
    pub fn metrics(&self) -> &ExportMetrics {
        &self.shared.metrics
    }

    /// Number of records waiting for the next flush.
    pub fn buffered_len(&self) -> usize {
        self.shared.lock_state().buffer.len()
    }

    pub fn uploader(&self) -> &U {
        &self.shared.uploader
    }
}

impl HttpSpanExporter {
    /// Builds an HTTP exporter from `config`.
    pub fn from_config(config: &ExporterConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let transport = ReqwestTransport::new(config.backoff.clone(), config.request_timeout)?;
        Self::new(config, HttpUploadClient::new(config, transport))
    }

    /// Builds an HTTP exporter from `TRACE_EXPORTER_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_config(&ExporterConfig::from_env()?)
    }
}

impl<U: BatchUploader + 'static> Shared<U> {
    fn lock_state(&self) -> MutexGuard<'_, ExporterState> {
        // Every critical section leaves the state consistent, so a panic elsewhere
        // does not invalidate it.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn append(self: &Arc<Self>, record: SpanRecord) {
        let mut state = self.lock_state();
        if state.is_shutdown {
            debug!(
                name: "BatchSpanExporter.EventIgnored",
                span_id = %record.span_id,
                "exporter is shut down, ignoring span"
            );
            return;
        }

        let now = Instant::now();
        let was_empty = state.buffer.push(record, now);

        match self
            .policy
            .evaluate(state.buffer.len(), state.buffer.first_record_time(), now)
        {
            FlushDecision::Flush(reason) => {
                state.timer.cancel();
                if let Some(batch) = state.buffer.take() {
                    self.dispatch(&mut state, batch, reason);
                }
            }
            FlushDecision::Wait if was_empty => {
                let shared = Arc::clone(self);
                state
                    .timer
                    .schedule(&self.runtime, self.policy.max_batch_wait(), move |id| {
                        shared.on_timer(id);
                    });
            }
            FlushDecision::Wait => {}
        }
    }

    fn on_timer(self: &Arc<Self>, id: TimerId) {
        let mut state = self.lock_state();
        // cancelled or replaced after it fired
        if !state.timer.complete(id) {
            return;
        }
        let reason = self.policy.reason_for(state.buffer.len());
        if let Some(batch) = state.buffer.take() {
            self.dispatch(&mut state, batch, reason);
        }
    }

    /// Closes the exporter, hands the remaining records to a final flush, and joins
    /// every flush task still running.
    async fn drain(self: &Arc<Self>) {
        let mut inflight = {
            let mut state = self.lock_state();
            state.is_shutdown = true;
            state.timer.cancel();
            let reason = self.policy.reason_for(state.buffer.len());
            if let Some(batch) = state.buffer.take() {
                info!(
                    name: "BatchSpanExporter.Shutdown",
                    batch_size = batch.len(),
                    "flushing remaining spans before shutdown"
                );
                self.dispatch(&mut state, batch, reason);
            }
            std::mem::take(&mut state.inflight)
        };

        while let Some(result) = inflight.join_next().await {
            log_join_error(result);
        }
    }

    /// Starts uploading `batch` on the runtime. The buffer has already been reset.
    fn dispatch(self: &Arc<Self>, state: &mut ExporterState, batch: SpanBatch, reason: FlushReason) {
        while let Some(result) = state.inflight.try_join_next() {
            log_join_error(result);
        }

        let shared = Arc::clone(self);
        state.inflight.spawn_on(
            async move {
                shared.deliver(batch, reason).await;
            },
            &self.runtime,
        );
    }

    /// Uploads one batch and logs the outcome. This is where upload errors end.
    async fn deliver(&self, batch: SpanBatch, reason: FlushReason) {
        let batch_size = batch.len();
        debug!(
            name: "BatchSpanExporter.Flush",
            reason = %reason,
            batch_size,
            uploader = self.uploader.name(),
            "flushing span batch"
        );

        let inflight = InflightGuard::enter(&self.metrics, batch_size);
        let result = self.uploader.upload(batch).await;
        inflight.finish();

        match result {
            Ok(()) => {
                self.metrics.record_success(batch_size as u64);
                debug!(name: "BatchSpanExporter.BatchUploaded", batch_size, "span batch uploaded");
            }
            Err(e) => {
                self.metrics.record_dropped(batch_size as u64);
                error!(
                    name: "BatchSpanExporter.UploadFailed",
                    dropped_batch_size = batch_size,
                    error = %e,
                    "batch upload failed, dropping"
                );
            }
        }
    }
}

/// Counts one upload as in flight. If the upload never returns (the uploader
/// panicked or the task was aborted) the batch is counted and logged as dropped.
struct InflightGuard<'a> {
    metrics: &'a ExportMetrics,
    batch_size: usize,
    finished: bool,
}

impl<'a> InflightGuard<'a> {
    fn enter(metrics: &'a ExportMetrics, batch_size: usize) -> Self {
        metrics.inc_inflight();
        Self {
            metrics,
            batch_size,
            finished: false,
        }
    }

    fn finish(mut self) {
        self.finished = true;
    }
}

impl Drop for InflightGuard<'_> {
    fn drop(&mut self) {
        self.metrics.dec_inflight();
        if !self.finished {
            self.metrics.record_dropped(self.batch_size as u64);
            error!(
                name: "BatchSpanExporter.UploadAborted",
                dropped_batch_size = self.batch_size,
                "batch upload did not complete, dropping"
            );
        }
    }
}

fn log_join_error(result: Result<(), JoinError>) {
    if let Err(e) = result {
        error!(name: "BatchSpanExporter.FlushTaskFailed", error = %e, "flush task failed");
    }
}
