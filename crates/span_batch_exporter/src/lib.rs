//! Batching Span Exporter
//!
//! Accumulates finished execution-trace spans in memory and ships them to a remote
//! ingestion endpoint in bounded batches. A batch is flushed when it reaches
//! `max_batch_size` records or `max_batch_wait` after its first record, whichever
//! comes first. Each batch is uploaded at most once through a retrying transport and
//! dropped (with an error log) if every attempt fails. `shutdown()` drains what is
//! left.
//!
//! Uses native async traits (no `#[async_trait]` macro).

pub mod buffer;
pub mod config;
pub mod error;
pub mod exporter;
pub mod metrics;
pub mod policy;
pub mod record;
pub mod span;
pub mod timer;
pub mod transport;
pub mod uploader;

// Re-export main types
pub use buffer::Buffer;
pub use config::ExporterConfig;
pub use error::{ConfigError, ExportError};
pub use exporter::{BatchSpanExporter, HttpSpanExporter};
pub use metrics::ExportMetrics;
pub use policy::{FlushDecision, FlushPolicy, FlushReason};
pub use record::{SpanBatch, SpanRecord};
pub use span::{Span, TracingEvent, TracingEventType};
pub use timer::FlushTimer;
pub use transport::{BackoffConfig, ReqwestTransport, Transport, UploadRequest};
pub use uploader::{BatchUploader, HttpUploadClient};
