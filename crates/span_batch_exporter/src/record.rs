//! Wire-format span records.
//!
//! A [`SpanRecord`] is the flat, serializable form of one finished [`Span`]. Records
//! are immutable once formatted. Optional fields serialize as `null` instead of being
//! omitted so that consumers see a stable schema, and timestamps are ISO-8601 strings
//! with millisecond precision.

use crate::span::Span;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

/// One finished span as sent to the ingestion endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpanRecord {
    pub trace_id: String,
    pub span_id: String,
    pub parent_span_id: Option<String>,
    pub name: String,
    pub span_type: String,
    pub attributes: Option<Value>,
    pub metadata: Option<Value>,
    #[serde(with = "iso8601")]
    pub started_at: DateTime<Utc>,
    #[serde(with = "iso8601::option")]
    pub ended_at: Option<DateTime<Utc>>,
    pub input: Option<Value>,
    pub output: Option<Value>,
    pub error: Option<Value>,
    pub is_event: bool,
    /// Set when the record is formatted, not when the span started
    #[serde(with = "iso8601")]
    pub created_at: DateTime<Utc>,
    /// Reserved for downstream mutation; always `None` here
    #[serde(with = "iso8601::option")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl SpanRecord {
    /// Formats a span into a record stamped with `created_at`.
    pub fn from_span(span: &Span, created_at: DateTime<Utc>) -> Self {
        Self {
            trace_id: span.trace_id.clone(),
            span_id: span.id.clone(),
            parent_span_id: span.parent.clone(),
            name: span.name.clone(),
            span_type: span.span_type.clone(),
            attributes: span.attributes.clone(),
            metadata: span.metadata.clone(),
            started_at: span.start_time,
            ended_at: span.end_time,
            input: span.input.clone(),
            output: span.output.clone(),
            error: span.error_info.clone(),
            is_event: span.is_event,
            created_at,
            updated_at: None,
        }
    }
}

/// Snapshot of buffered records sent in a single upload call.
#[derive(Debug, Clone, Default)]
pub struct SpanBatch {
    /// Records in arrival order
    pub records: Vec<SpanRecord>,
}

impl SpanBatch {
    /// Creates a batch with the given records
    pub fn with_records(records: Vec<SpanRecord>) -> Self {
        Self { records }
    }

    /// Returns the number of records in the batch
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns true if the batch is empty
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Encodes the batch as the `{"spans": [...]}` request body.
    pub fn to_json(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(&SpansPayload {
            spans: &self.records,
        })
    }
}

/// Request body of one upload.
#[derive(Debug, Serialize)]
pub struct SpansPayload<'a> {
    pub spans: &'a [SpanRecord],
}

mod iso8601 {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::Serializer;

    pub fn serialize<S: Serializer>(ts: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&ts.to_rfc3339_opts(SecondsFormat::Millis, true))
    }

    pub mod option {
        use chrono::{DateTime, Utc};
        use serde::Serializer;

        pub fn serialize<S: Serializer>(
            ts: &Option<DateTime<Utc>>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match ts {
                Some(ts) => super::serialize(ts, serializer),
                None => serializer.serialize_none(),
            }
        }
    }
}
