use chrono::{DateTime, Utc};
use serde_json::Value;

/// A single operation (or instantaneous event) in a trace, as handed over by the
/// instrumentation layer.
#[derive(Debug, Clone, PartialEq)]
pub struct Span {
    /// Groups spans into one trace
    pub trace_id: String,
    /// Unique within the trace
    pub id: String,
    /// Parent span identifier (`None` for root spans)
    pub parent: Option<String>,
    /// Operation name
    pub name: String,
    /// Category tag (e.g. `agent_run`, `llm_generation`, `tool_call`)
    pub span_type: String,
    pub attributes: Option<Value>,
    pub metadata: Option<Value>,
    pub start_time: DateTime<Utc>,
    /// `None` if the span closed without an explicit end
    pub end_time: Option<DateTime<Utc>>,
    pub input: Option<Value>,
    pub output: Option<Value>,
    pub error_info: Option<Value>,
    /// Instantaneous event rather than a durational span
    pub is_event: bool,
}

impl Span {
    /// Creates a root span starting now.
    pub fn new(
        trace_id: impl Into<String>,
        id: impl Into<String>,
        name: impl Into<String>,
        span_type: impl Into<String>,
    ) -> Self {
        Self {
            trace_id: trace_id.into(),
            id: id.into(),
            parent: None,
            name: name.into(),
            span_type: span_type.into(),
            attributes: None,
            metadata: None,
            start_time: Utc::now(),
            end_time: None,
            input: None,
            output: None,
            error_info: None,
            is_event: false,
        }
    }

    /// Creates an instantaneous event span. Its start and end coincide.
    pub fn event(
        trace_id: impl Into<String>,
        id: impl Into<String>,
        name: impl Into<String>,
        span_type: impl Into<String>,
    ) -> Self {
        let mut span = Self::new(trace_id, id, name, span_type);
        span.end_time = Some(span.start_time);
        span.is_event = true;
        span
    }

    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    pub fn with_attributes(mut self, attributes: Value) -> Self {
        self.attributes = Some(attributes);
        self
    }

    pub fn with_metadata(mut self, metadata: Value) -> Self {
        self.metadata = Some(metadata);
        self
    }

    pub fn with_input(mut self, input: Value) -> Self {
        self.input = Some(input);
        self
    }

    pub fn with_start_time(mut self, start_time: DateTime<Utc>) -> Self {
        self.start_time = start_time;
        self
    }

    /// Marks the span as ended now with the given output.
    pub fn end(&mut self, output: Option<Value>) {
        self.end_time = Some(Utc::now());
        self.output = output;
    }

    /// Marks the span as ended now with an error payload.
    pub fn fail(&mut self, error_info: Value) {
        self.end_time = Some(Utc::now());
        self.error_info = Some(error_info);
    }

    /// Returns true if this span has no parent.
    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }
}

/// Lifecycle stage a tracing event reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TracingEventType {
    SpanStarted,
    SpanUpdated,
    SpanEnded,
}

/// One event pushed by the tracing layer.
#[derive(Debug, Clone, PartialEq)]
pub struct TracingEvent {
    pub event_type: TracingEventType,
    pub span: Span,
}

impl TracingEvent {
    pub fn started(span: Span) -> Self {
        Self {
            event_type: TracingEventType::SpanStarted,
            span,
        }
    }

    pub fn updated(span: Span) -> Self {
        Self {
            event_type: TracingEventType::SpanUpdated,
            span,
        }
    }

    pub fn ended(span: Span) -> Self {
        Self {
            event_type: TracingEventType::SpanEnded,
            span,
        }
    }
}
