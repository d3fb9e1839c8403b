//! Error types for configuration and batch export.

use thiserror::Error;

/// Errors raised while building an exporter. These are fatal and surface before
/// any event is processed.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// No access token was configured
    #[error("missing access token")]
    MissingAccessToken,
    /// No ingestion endpoint was configured
    #[error("missing ingestion endpoint")]
    MissingEndpoint,
    /// The endpoint is not an absolute URL
    #[error("invalid ingestion endpoint {endpoint:?}: {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },
    /// A batching threshold is zero
    #[error("{name} must be greater than zero")]
    InvalidThreshold { name: &'static str },
    /// An environment variable could not be parsed
    #[error("invalid value {value:?} for environment variable {name}")]
    InvalidEnvVar { name: &'static str, value: String },
    /// The exporter was constructed outside of a Tokio runtime
    #[error("no Tokio runtime available to schedule flushes")]
    NoRuntime,
    /// The HTTP client could not be built
    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
}

/// Errors produced while uploading a batch.
///
/// These never reach callers of `export_event`; they are logged at the flush
/// boundary and the batch is dropped.
#[derive(Debug, Error)]
pub enum ExportError {
    /// The batch could not be encoded as JSON
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    /// The access token cannot be used as a header value
    #[error("invalid header value: {0}")]
    InvalidHeader(#[from] reqwest::header::InvalidHeaderValue),
    /// Transport-layer error (connect, TLS, timeout)
    #[error("transport error: {0}")]
    Http(#[from] reqwest::Error),
    /// The endpoint answered with a non-success status
    #[error("upload failed with status {status}: {body}")]
    Status { status: u16, body: String },
    /// All attempts failed; carries the error of the last attempt
    #[error("all {attempts} upload attempts failed, last error: {last}")]
    RetriesExhausted {
        attempts: u32,
        last: Box<ExportError>,
    },
}

impl ExportError {
    /// Number of attempts made before giving up, if this is a terminal retry error.
    pub fn attempts(&self) -> Option<u32> {
        match self {
            Self::RetriesExhausted { attempts, .. } => Some(*attempts),
            _ => None,
        }
    }
}
