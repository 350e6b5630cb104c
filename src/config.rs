//! Configuration for batch submissions.
//!
//! Every knob lives in [`ConverterConfig`], built via its
//! [`ConverterConfigBuilder`]. Callers set what they care about and rely on
//! the documented defaults for the rest; `build()` rejects values the
//! coordinator cannot work with.

use crate::error::ConvertError;
use crate::progress::ProgressCallback;
use crate::request::SubmissionPolicy;
use reqwest::Url;
use std::fmt;
use std::time::Duration;

/// Default conversion endpoint.
pub const DEFAULT_ENDPOINT: &str = "http://localhost:3000/api/v1/convert";

/// Default per-file size limit checked by callers before staging: 10 MiB.
pub const DEFAULT_MAX_FILE_BYTES: u64 = 10 * 1024 * 1024;

/// Configuration for a [`crate::coordinator::Coordinator`].
///
/// # Example
/// ```rust
/// use batch_convert::{ConverterConfig, SubmissionPolicy};
///
/// let config = ConverterConfig::builder()
///     .endpoint("https://convert.example.com/api/v1/convert")
///     .target_format("docx")
///     .policy(SubmissionPolicy::MergeAll)
///     .build()
///     .unwrap();
/// assert_eq!(config.target_format, "docx");
/// ```
#[derive(Clone)]
pub struct ConverterConfig {
    /// URL of the conversion service's multipart upload endpoint.
    pub endpoint: String,

    /// Output format requested from the service, lower-case without a dot. Default: `pdf`.
    pub target_format: String,

    /// One job per file, or one merged job. Default: [`SubmissionPolicy::PerFile`].
    pub policy: SubmissionPolicy,

    /// Maximum exchanges in flight for one batch. Default: 10.
    ///
    /// Only bounds how many requests are on the wire at once; every request
    /// of the batch is still submitted exactly once.
    pub concurrency: usize,

    /// Optional per-request timeout in seconds. Default: `None` (wait forever).
    ///
    /// With `None` a hung exchange leaves its job `processing` indefinitely.
    /// Setting a value turns an expired exchange into an `error` job.
    pub request_timeout_secs: Option<u64>,

    /// Per-file size limit for callers that stage from disk. Default: 10 MiB.
    ///
    /// The staging buffer itself never enforces this.
    pub max_file_bytes: u64,

    /// Receives job lifecycle events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            target_format: "pdf".to_string(),
            policy: SubmissionPolicy::default(),
            concurrency: 10,
            request_timeout_secs: None,
            max_file_bytes: DEFAULT_MAX_FILE_BYTES,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ConverterConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConverterConfig")
            .field("endpoint", &self.endpoint)
            .field("target_format", &self.target_format)
            .field("policy", &self.policy)
            .field("concurrency", &self.concurrency)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("max_file_bytes", &self.max_file_bytes)
            .field(
                "progress_callback",
                &self
                    .progress_callback
                    .as_ref()
                    .map(|_| "<dyn SubmissionProgressCallback>"),
            )
            .finish()
    }
}

impl ConverterConfig {
    pub fn builder() -> ConverterConfigBuilder {
        ConverterConfigBuilder {
            config: Self::default(),
        }
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }
}

/// Builder for [`ConverterConfig`].
#[derive(Debug)]
pub struct ConverterConfigBuilder {
    config: ConverterConfig,
}

impl ConverterConfigBuilder {
    pub fn endpoint(mut self, url: impl Into<String>) -> Self {
        self.config.endpoint = url.into();
        self
    }

    /// Accepts `pdf`, `PDF` or `.pdf`.
    pub fn target_format(mut self, format: impl AsRef<str>) -> Self {
        self.config.target_format = normalise_format(format.as_ref());
        self
    }

    pub fn policy(mut self, policy: SubmissionPolicy) -> Self {
        self.config.policy = policy;
        self
    }

    pub fn concurrency(mut self, n: usize) -> Self {
        self.config.concurrency = n.max(1);
        self
    }

    pub fn request_timeout_secs(mut self, secs: u64) -> Self {
        self.config.request_timeout_secs = Some(secs);
        self
    }

    pub fn max_file_bytes(mut self, bytes: u64) -> Self {
        self.config.max_file_bytes = bytes;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ConverterConfig, ConvertError> {
        let c = &self.config;

        let url = Url::parse(&c.endpoint).map_err(|e| {
            ConvertError::InvalidConfig(format!("endpoint '{}' is not a valid URL: {e}", c.endpoint))
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConvertError::InvalidConfig(format!(
                "endpoint must use http or https, got '{}'",
                url.scheme()
            )));
        }

        if c.target_format.is_empty() {
            return Err(ConvertError::InvalidConfig(
                "target format must not be empty".into(),
            ));
        }
        if !c.target_format.chars().all(|ch| ch.is_ascii_alphanumeric()) {
            return Err(ConvertError::InvalidConfig(format!(
                "target format '{}' must be alphanumeric",
                c.target_format
            )));
        }

        if c.concurrency == 0 {
            return Err(ConvertError::InvalidConfig("concurrency must be ≥ 1".into()));
        }
        if c.request_timeout_secs == Some(0) {
            return Err(ConvertError::InvalidConfig(
                "request timeout must be ≥ 1 second".into(),
            ));
        }

        Ok(self.config)
    }
}

fn normalise_format(format: &str) -> String {
    format.trim().trim_start_matches('.').to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let c = ConverterConfig::default();
        assert_eq!(c.endpoint, DEFAULT_ENDPOINT);
        assert_eq!(c.target_format, "pdf");
        assert_eq!(c.policy, SubmissionPolicy::PerFile);
        assert_eq!(c.concurrency, 10);
        assert_eq!(c.request_timeout(), None);
        assert_eq!(c.max_file_bytes, 10 * 1024 * 1024);
        assert!(ConverterConfig::builder().build().is_ok());
    }

    #[test]
    fn target_format_is_normalised() {
        let c = ConverterConfig::builder()
            .target_format(" .DOCX ")
            .build()
            .unwrap();
        assert_eq!(c.target_format, "docx");
    }

    #[test]
    fn rejects_bad_endpoint() {
        let err = ConverterConfig::builder()
            .endpoint("not a url")
            .build()
            .unwrap_err();
        assert!(matches!(err, ConvertError::InvalidConfig(_)));

        let err = ConverterConfig::builder()
            .endpoint("ftp://files.example.com/convert")
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("http"));
    }

    #[test]
    fn rejects_bad_format() {
        assert!(ConverterConfig::builder().target_format("").build().is_err());
        assert!(ConverterConfig::builder()
            .target_format("tar.gz")
            .build()
            .is_err());
    }

    #[test]
    fn concurrency_clamped() {
        let c = ConverterConfig::builder().concurrency(0).build().unwrap();
        assert_eq!(c.concurrency, 1);
    }

    #[test]
    fn zero_timeout_rejected() {
        assert!(ConverterConfig::builder()
            .request_timeout_secs(0)
            .build()
            .is_err());
        let c = ConverterConfig::builder()
            .request_timeout_secs(30)
            .build()
            .unwrap();
        assert_eq!(c.request_timeout(), Some(Duration::from_secs(30)));
    }

    #[test]
    fn debug_hides_callback() {
        use crate::progress::NoopProgressCallback;
        use std::sync::Arc;

        let c = ConverterConfig::builder()
            .progress_callback(Arc::new(NoopProgressCallback))
            .build()
            .unwrap();
        let dbg = format!("{c:?}");
        assert!(dbg.contains("<dyn SubmissionProgressCallback>"));
    }
}
