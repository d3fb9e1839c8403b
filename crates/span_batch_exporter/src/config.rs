//! Exporter configuration.

use crate::error::ConfigError;
use crate::transport::BackoffConfig;
use std::fmt;
use std::time::Duration;

pub const ENV_ACCESS_TOKEN: &str = "TRACE_EXPORTER_ACCESS_TOKEN";
pub const ENV_ENDPOINT: &str = "TRACE_EXPORTER_ENDPOINT";
pub const ENV_MAX_BATCH_SIZE: &str = "TRACE_EXPORTER_MAX_BATCH_SIZE";
pub const ENV_MAX_BATCH_WAIT_MS: &str = "TRACE_EXPORTER_MAX_BATCH_WAIT_MS";
pub const ENV_MAX_RETRIES: &str = "TRACE_EXPORTER_MAX_RETRIES";

pub const DEFAULT_MAX_BATCH_SIZE: usize = 1000;
pub const DEFAULT_MAX_BATCH_WAIT: Duration = Duration::from_millis(5000);
pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Immutable configuration captured when the exporter is built.
#[derive(Clone)]
pub struct ExporterConfig {
    /// Sent as `Authorization: Bearer <token>`
    pub access_token: String,
    /// Ingestion URL the batches are POSTed to
    pub endpoint: String,
    /// Flush as soon as this many records are buffered.
    ///
    /// Default: 1000
    pub max_batch_size: usize,
    /// Flush this long after the first record of a batch was buffered.
    ///
    /// Default: 5s
    pub max_batch_wait: Duration,
    /// Total upload attempts per batch before it is dropped.
    ///
    /// Default: 3
    pub max_retries: u32,
    /// Delay between upload attempts
    pub backoff: BackoffConfig,
    /// Per-request timeout enforced by the HTTP client
    pub request_timeout: Duration,
}

impl ExporterConfig {
    /// Creates a configuration with default thresholds.
    pub fn new(access_token: impl Into<String>, endpoint: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            endpoint: endpoint.into(),
            max_batch_size: DEFAULT_MAX_BATCH_SIZE,
            max_batch_wait: DEFAULT_MAX_BATCH_WAIT,
            max_retries: DEFAULT_MAX_RETRIES,
            backoff: BackoffConfig::default(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    /// Reads the configuration from `TRACE_EXPORTER_*` environment variables.
    ///
    /// The access token and endpoint are required; thresholds fall back to their
    /// defaults when unset.
    pub fn from_env() -> Result<Self, ConfigError> {
        let access_token = read_var(ENV_ACCESS_TOKEN).ok_or(ConfigError::MissingAccessToken)?;
        let endpoint = read_var(ENV_ENDPOINT).ok_or(ConfigError::MissingEndpoint)?;

        let mut config = Self::new(access_token, endpoint);
        if let Some(size) = parse_var(ENV_MAX_BATCH_SIZE)? {
            config.max_batch_size = size;
        }
        if let Some(wait_ms) = parse_var::<u64>(ENV_MAX_BATCH_WAIT_MS)? {
            config.max_batch_wait = Duration::from_millis(wait_ms);
        }
        if let Some(retries) = parse_var(ENV_MAX_RETRIES)? {
            config.max_retries = retries;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn with_max_batch_size(mut self, size: usize) -> Self {
        self.max_batch_size = size;
        self
    }

    pub fn with_max_batch_wait(mut self, wait: Duration) -> Self {
        self.max_batch_wait = wait;
        self
    }

    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    pub fn with_backoff(mut self, backoff: BackoffConfig) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Checks required fields and thresholds.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.access_token.trim().is_empty() {
            return Err(ConfigError::MissingAccessToken);
        }
        if self.endpoint.trim().is_empty() {
            return Err(ConfigError::MissingEndpoint);
        }
        reqwest::Url::parse(&self.endpoint).map_err(|e| ConfigError::InvalidEndpoint {
            endpoint: self.endpoint.clone(),
            reason: e.to_string(),
        })?;
        if self.max_batch_size == 0 {
            return Err(ConfigError::InvalidThreshold {
                name: "max_batch_size",
            });
        }
        if self.max_batch_wait.is_zero() {
            return Err(ConfigError::InvalidThreshold {
                name: "max_batch_wait",
            });
        }
        if self.max_retries == 0 {
            return Err(ConfigError::InvalidThreshold {
                name: "max_retries",
            });
        }
        Ok(())
    }
}

impl fmt::Debug for ExporterConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExporterConfig")
            .field("access_token", &"<redacted>")
            .field("endpoint", &self.endpoint)
            .field("max_batch_size", &self.max_batch_size)
            .field("max_batch_wait", &self.max_batch_wait)
            .field("max_retries", &self.max_retries)
            .field("backoff", &self.backoff)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

fn read_var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_var<T: std::str::FromStr>(name: &'static str) -> Result<Option<T>, ConfigError> {
    match read_var(name) {
        Some(value) => value
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidEnvVar { name, value }),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ENDPOINT: &str = "https://ingest.example.com/v1/spans";

    #[test]
    fn test_defaults() {
        let config = ExporterConfig::new("token", ENDPOINT);
        assert_eq!(config.max_batch_size, 1000);
        assert_eq!(config.max_batch_wait, Duration::from_millis(5000));
        assert_eq!(config.max_retries, 3);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_missing_credentials() {
        assert!(matches!(
            ExporterConfig::new("", ENDPOINT).validate(),
            Err(ConfigError::MissingAccessToken)
        ));
        assert!(matches!(
            ExporterConfig::new("token", "  ").validate(),
            Err(ConfigError::MissingEndpoint)
        ));
        assert!(matches!(
            ExporterConfig::new("token", "not a url").validate(),
            Err(ConfigError::InvalidEndpoint { .. })
        ));
    }

    #[test]
    fn test_validate_rejects_zero_thresholds() {
        let base = ExporterConfig::new("token", ENDPOINT);
        assert!(matches!(
            base.clone().with_max_batch_size(0).validate(),
            Err(ConfigError::InvalidThreshold { name: "max_batch_size" })
        ));
        assert!(matches!(
            base.clone().with_max_batch_wait(Duration::ZERO).validate(),
            Err(ConfigError::InvalidThreshold { name: "max_batch_wait" })
        ));
        assert!(matches!(
            base.with_max_retries(0).validate(),
            Err(ConfigError::InvalidThreshold { name: "max_retries" })
        ));
    }

    #[test]
    fn test_debug_redacts_token() {
        let config = ExporterConfig::new("super-secret", ENDPOINT);
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("super-secret"));
        assert!(rendered.contains("<redacted>"));
    }

    #[test]
    fn test_from_env() {
        temp_env::with_vars(
            [
                (ENV_ACCESS_TOKEN, Some("env-token")),
                (ENV_ENDPOINT, Some(ENDPOINT)),
                (ENV_MAX_BATCH_SIZE, Some("50")),
                (ENV_MAX_BATCH_WAIT_MS, Some("250")),
                (ENV_MAX_RETRIES, None),
            ],
            || {
                let config = ExporterConfig::from_env().unwrap();
                assert_eq!(config.access_token, "env-token");
                assert_eq!(config.endpoint, ENDPOINT);
                assert_eq!(config.max_batch_size, 50);
                assert_eq!(config.max_batch_wait, Duration::from_millis(250));
                assert_eq!(config.max_retries, DEFAULT_MAX_RETRIES);
            },
        );
    }

    #[test]
    fn test_from_env_fails_fast() {
        temp_env::with_vars(
            [(ENV_ACCESS_TOKEN, None::<&str>), (ENV_ENDPOINT, Some(ENDPOINT))],
            || {
                assert!(matches!(
                    ExporterConfig::from_env(),
                    Err(ConfigError::MissingAccessToken)
                ));
            },
        );
        temp_env::with_vars(
            [(ENV_ACCESS_TOKEN, Some("token")), (ENV_ENDPOINT, None)],
            || {
                assert!(matches!(
                    ExporterConfig::from_env(),
                    Err(ConfigError::MissingEndpoint)
                ));
            },
        );
        temp_env::with_vars(
            [
                (ENV_ACCESS_TOKEN, Some("token")),
                (ENV_ENDPOINT, Some(ENDPOINT)),
                (ENV_MAX_RETRIES, Some("lots")),
            ],
            || {
                assert!(matches!(
                    ExporterConfig::from_env(),
                    Err(ConfigError::InvalidEnvVar { name: ENV_MAX_RETRIES, .. })
                ));
            },
        );
    }
}
