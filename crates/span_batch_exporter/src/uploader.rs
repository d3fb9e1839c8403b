use crate::config::ExporterConfig;
use crate::error::ExportError;
use crate::record::SpanBatch;
use crate::transport::{Transport, UploadRequest};
use bytes::Bytes;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// Ships one batch of span records to a backend.
///
/// Uses native async fn in traits instead of `#[async_trait]`.
pub trait BatchUploader: Send + Sync {
    /// Uploads a batch. An `Err` means the batch is lost.
    fn upload(&self, batch: SpanBatch) -> impl Future<Output = Result<(), ExportError>> + Send;

    /// Returns the uploader name for debugging.
    fn name(&self) -> &str;
}

impl<T: BatchUploader> BatchUploader for Arc<T> {
    fn upload(&self, batch: SpanBatch) -> impl Future<Output = Result<(), ExportError>> + Send {
        T::upload(self, batch)
    }

    fn name(&self) -> &str {
        T::name(self)
    }
}

/// Uploads batches as a JSON `POST` with bearer authorization.
#[derive(Clone)]
pub struct HttpUploadClient<T> {
    endpoint: String,
    access_token: String,
    max_retries: u32,
    transport: T,
}

impl<T> fmt::Debug for HttpUploadClient<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpUploadClient")
            .field("endpoint", &self.endpoint)
            .field("max_retries", &self.max_retries)
            .finish_non_exhaustive()
    }
}

impl<T: Transport> HttpUploadClient<T> {
    pub fn new(config: &ExporterConfig, transport: T) -> Self {
        Self {
            endpoint: config.endpoint.clone(),
            access_token: config.access_token.clone(),
            max_retries: config.max_retries,
            transport,
        }
    }

    /// Builds the request carrying `batch`: URL, auth and content-type headers,
    /// and the `{"spans": [...]}` body.
    pub fn build_request(&self, batch: &SpanBatch) -> Result<UploadRequest, ExportError> {
        let mut headers = HeaderMap::new();
        let mut auth = HeaderValue::from_str(&format!("Bearer {}", self.access_token))?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        Ok(UploadRequest {
            url: self.endpoint.clone(),
            headers,
            body: Bytes::from(batch.to_json()?),
        })
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }
}

impl<T: Transport> BatchUploader for HttpUploadClient<T> {
    async fn upload(&self, batch: SpanBatch) -> Result<(), ExportError> {
        if batch.is_empty() {
            return Ok(());
        }
        let request = self.build_request(&batch)?;
        self.transport.send(request, self.max_retries).await
    }

    fn name(&self) -> &str {
        "http"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::SpanRecord;
    use crate::span::Span;
    use chrono::Utc;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    /// Records requests; fails every attempt when `fail` is set.
    #[derive(Default)]
    struct CapturingTransport {
        fail: bool,
        attempts: AtomicU32,
        requests: Mutex<Vec<(UploadRequest, u32)>>,
    }

    impl Transport for CapturingTransport {
        async fn send(&self, request: UploadRequest, max_retries: u32) -> Result<(), ExportError> {
            self.requests.lock().unwrap().push((request, max_retries));
            if self.fail {
                self.attempts.fetch_add(max_retries, Ordering::SeqCst);
                return Err(ExportError::RetriesExhausted {
                    attempts: max_retries,
                    last: Box::new(ExportError::Status {
                        status: 503,
                        body: "unavailable".to_string(),
                    }),
                });
            }
            self.attempts.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn batch(n: usize) -> SpanBatch {
        SpanBatch::with_records(
            (0..n)
                .map(|i| SpanRecord::from_span(&Span::new("t", format!("s{i}"), "op", "generic"), Utc::now()))
                .collect(),
        )
    }

    fn config() -> ExporterConfig {
        ExporterConfig::new("abc123", "https://ingest.example.com/v1/spans").with_max_retries(4)
    }

    #[test]
    fn test_build_request() {
        let client = HttpUploadClient::new(&config(), CapturingTransport::default());
        let request = client.build_request(&batch(2)).unwrap();

        assert_eq!(request.url, "https://ingest.example.com/v1/spans");
        assert_eq!(request.headers[AUTHORIZATION], "Bearer abc123");
        assert!(request.headers[AUTHORIZATION].is_sensitive());
        assert_eq!(request.headers[CONTENT_TYPE], "application/json");

        let body: serde_json::Value = serde_json::from_slice(&request.body).unwrap();
        assert_eq!(body["spans"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_upload_passes_max_retries_to_transport() {
        let client = HttpUploadClient::new(&config(), CapturingTransport::default());
        client.upload(batch(3)).await.unwrap();

        let requests = client.transport().requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].1, 4);
    }

    #[tokio::test]
    async fn test_empty_batch_sends_nothing() {
        let client = HttpUploadClient::new(&config(), CapturingTransport::default());
        client.upload(SpanBatch::default()).await.unwrap();

        assert!(client.transport().requests.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_upload_propagates_final_failure() {
        let transport = CapturingTransport {
            fail: true,
            ..Default::default()
        };
        let client = HttpUploadClient::new(&config(), transport);

        let err = client.upload(batch(1)).await.unwrap_err();
        assert_eq!(err.attempts(), Some(4));
        assert_eq!(client.transport().attempts.load(Ordering::SeqCst), 4);
    }

    #[test]
    fn test_invalid_token_is_rejected() {
        let config = ExporterConfig::new("bad\ntoken", "https://ingest.example.com");
        let client = HttpUploadClient::new(&config, CapturingTransport::default());
        assert!(matches!(
            client.build_request(&batch(1)),
            Err(ExportError::InvalidHeader(_))
        ));
    }
}
