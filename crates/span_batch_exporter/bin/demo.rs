//! # Batching Span Exporter Demo
//!
//! Emits a handful of synthetic agent traces (root run, LLM and tool child spans,
//! one event span per trace) through the exporter and prints the export metrics.
//!
//! ## Running
//!
//! ```bash
//! # Against a real ingestion endpoint
//! TRACE_EXPORTER_ACCESS_TOKEN=... TRACE_EXPORTER_ENDPOINT=https://... \
//!     cargo run -p span_batch_exporter --bin demo
//!
//! # Against an in-process simulated backend (15% failure rate)
//! cargo run -p span_batch_exporter --bin demo -- --simulate
//!
//! # Fewer traces
//! cargo run -p span_batch_exporter --bin demo -- --simulate --quick
//! ```
//!
//! Log verbosity follows `RUST_LOG` (default `info`), e.g.
//! `RUST_LOG=span_batch_exporter=debug`.

use rand::Rng;
use serde_json::json;
use span_batch_exporter::{
    BatchSpanExporter, BatchUploader, ExportError, ExportMetrics, ExporterConfig,
    HttpSpanExporter, Span, SpanBatch, TracingEvent,
};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// In-process backend with random latency and failures.
struct SimulatedBackend {
    failure_rate: f64,
    uploads: AtomicU64,
}

impl BatchUploader for SimulatedBackend {
    async fn upload(&self, batch: SpanBatch) -> Result<(), ExportError> {
        self.uploads.fetch_add(1, Ordering::Relaxed);
        let (latency_ms, fail) = {
            let mut rng = rand::thread_rng();
            (rng.gen_range(5..50), rng.gen_bool(self.failure_rate))
        };
        tokio::time::sleep(Duration::from_millis(latency_ms)).await;

        if fail {
            Err(ExportError::Status {
                status: 503,
                body: format!("simulated outage (batch of {} spans)", batch.len()),
            })
        } else {
            Ok(())
        }
    }

    fn name(&self) -> &str {
        "simulated"
    }
}

/// Anything the demo can drive.
trait DemoExporter {
    fn export(&self, event: &TracingEvent);
    async fn finish(&self);
    fn metrics(&self) -> &ExportMetrics;
}

impl<U: BatchUploader + 'static> DemoExporter for BatchSpanExporter<U> {
    fn export(&self, event: &TracingEvent) {
        self.export_event(event);
    }

    async fn finish(&self) {
        self.shutdown().await;
    }

    fn metrics(&self) -> &ExportMetrics {
        BatchSpanExporter::metrics(self)
    }
}

/// Emits one agent trace: start/end of the root, two LLM calls, a tool call and
/// an event span.
async fn emit_trace(exporter: &impl DemoExporter, trace_no: usize) {
    let trace_id = format!("trace-{trace_no:04}");
    let root_id = format!("{trace_id}-root");

    let mut root = Span::new(&trace_id, &root_id, "agent run", "agent_run")
        .with_input(json!({"prompt": format!("task #{trace_no}")}))
        .with_metadata(json!({"demo": true}));
    exporter.export(&TracingEvent::started(root.clone()));

    for (i, (name, span_type)) in [
        ("plan", "llm_generation"),
        ("search", "tool_call"),
        ("answer", "llm_generation"),
    ]
    .into_iter()
    .enumerate()
    {
        let mut child = Span::new(&trace_id, format!("{root_id}-{i}"), name, span_type)
            .with_parent(&root_id)
            .with_attributes(json!({"step": i}));
        exporter.export(&TracingEvent::started(child.clone()));

        let latency = rand::thread_rng().gen_range(1..20);
        tokio::time::sleep(Duration::from_millis(latency)).await;

        if rand::thread_rng().gen_bool(0.1) {
            child.fail(json!({"message": format!("{name} failed")}));
        } else {
            child.end(Some(json!({"tokens": latency * 10})));
        }
        exporter.export(&TracingEvent::ended(child));
    }

    let event = Span::event(&trace_id, format!("{root_id}-done"), "completed", "generic")
        .with_parent(&root_id);
    exporter.export(&TracingEvent::ended(event));

    root.end(Some(json!({"answer": "42"})));
    exporter.export(&TracingEvent::ended(root));
}

async fn run(exporter: impl DemoExporter, traces: usize) {
    for trace_no in 0..traces {
        emit_trace(&exporter, trace_no).await;
    }

    println!("\nShutting down (flushing remaining spans)...");
    exporter.finish().await;

    let metrics = exporter.metrics();
    println!("\nExport metrics:");
    println!("   Spans exported:   {}", metrics.spans_exported());
    println!("   Batches exported: {}", metrics.batches_exported());
    println!("   Batches dropped:  {}", metrics.batches_dropped());
    println!("   Spans dropped:    {}", metrics.spans_dropped());
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args: Vec<String> = std::env::args().collect();
    let simulate = args.iter().any(|a| a == "--simulate");
    let traces = if args.iter().any(|a| a == "--quick") { 5 } else { 50 };

    println!("Batching span exporter demo");
    println!("   Backend: {}", if simulate { "simulated" } else { "http" });
    println!("   Traces: {traces} (5 exported spans each)");

    if simulate {
        let config = ExporterConfig::new("demo-token", "http://localhost/v1/spans")
            .with_max_batch_size(32)
            .with_max_batch_wait(Duration::from_millis(200));
        let backend = SimulatedBackend {
            failure_rate: 0.15,
            uploads: AtomicU64::new(0),
        };
        let exporter = BatchSpanExporter::new(&config, backend)?;
        run(exporter.clone(), traces).await;
        println!(
            "   Upload calls:     {}",
            exporter.uploader().uploads.load(Ordering::Relaxed)
        );
    } else {
        let exporter = HttpSpanExporter::from_env()?;
        run(exporter, traces).await;
    }

    Ok(())
}
