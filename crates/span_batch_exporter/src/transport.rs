//! Retrying HTTP transport.
//!
//! [`Transport`] is the "send with N attempts" primitive the upload client relies
//! on. [`ReqwestTransport`] implements it over `reqwest` with capped exponential
//! backoff between attempts.

use crate::error::{ConfigError, ExportError};
use bytes::Bytes;
use reqwest::header::HeaderMap;
use reqwest::Client;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::debug;

/// A fully built upload request. Cheap to clone for each attempt.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub url: String,
    pub headers: HeaderMap,
    pub body: Bytes,
}

/// Sends a request, retrying on failure.
///
/// `max_retries` is the total number of attempts. Implementations return the
/// final outcome only; intermediate failures stay inside the transport.
pub trait Transport: Send + Sync {
    fn send(
        &self,
        request: UploadRequest,
        max_retries: u32,
    ) -> impl Future<Output = Result<(), ExportError>> + Send;
}

/// Backoff between upload attempts.
#[derive(Debug, Clone)]
pub struct BackoffConfig {
    /// Delay before the second attempt.
    pub initial_delay: Duration,
    /// Maximum delay between attempts (caps exponential growth).
    pub max_delay: Duration,
    /// Multiplier for exponential backoff (e.g., 2.0 = double delay each retry).
    pub multiplier: f64,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(10),
            multiplier: 2.0,
        }
    }
}

impl BackoffConfig {
    /// Calculate delay for a given attempt number (0-indexed).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }
        let delay_ms =
            self.initial_delay.as_millis() as f64 * self.multiplier.powi((attempt - 1) as i32);
        let delay = Duration::from_millis(delay_ms as u64);
        delay.min(self.max_delay)
    }
}

/// `reqwest`-backed transport. Non-2xx responses count as failed attempts.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
    backoff: BackoffConfig,
}

impl ReqwestTransport {
    pub fn new(backoff: BackoffConfig, request_timeout: Duration) -> Result<Self, ConfigError> {
        let client = Client::builder().timeout(request_timeout).build()?;
        Ok(Self { client, backoff })
    }

    async fn attempt(&self, request: &UploadRequest) -> Result<(), ExportError> {
        let response = self
            .client
            .post(&request.url)
            .headers(request.headers.clone())
            .body(request.body.clone())
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        Err(ExportError::Status {
            status: status.as_u16(),
            body,
        })
    }
}

impl Transport for ReqwestTransport {
    async fn send(&self, request: UploadRequest, max_retries: u32) -> Result<(), ExportError> {
        let max_attempts = max_retries.max(1);
        let mut attempt = 0;

        loop {
            let delay = self.backoff.delay_for_attempt(attempt);
            if !delay.is_zero() {
                sleep(delay).await;
            }
            attempt += 1;

            match self.attempt(&request).await {
                Ok(()) => return Ok(()),
                Err(e) if attempt >= max_attempts => {
                    return Err(ExportError::RetriesExhausted {
                        attempts: attempt,
                        last: Box::new(e),
                    });
                }
                Err(e) => {
                    debug!(
                        name: "ReqwestTransport.AttemptFailed",
                        attempt,
                        max_attempts,
                        error = %e,
                        "upload attempt failed, retrying"
                    );
                }
            }
        }
    }
}
