//! Client for the external conversion service.
//!
//! The service accepts a multipart upload with one or more `files` parts, a
//! `targetFormat` field and a `merge` flag. On success it answers with a JSON
//! body carrying at least a download locator and optionally the output file
//! name it chose:
//!
//! ```text
//! 200 OK
//! { "downloadUrl": "/files/7f3c/report.pdf", "fileName": "report.pdf" }
//! ```
//!
//! Failures come back as a non-2xx status, or as a 2xx body with
//! `"success": false` / an `"error"` field. The reason, when present, is
//! passed through to the ledger verbatim.
//!
//! [`ConversionService`] is the seam the coordinator talks to, so tests can
//! drive the coordinator without a network.

use crate::config::ConverterConfig;
use crate::error::{ConvertError, ServiceError};
use crate::request::ConversionRequest;
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Body, Client, Url};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

/// What a successful exchange yields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceReceipt {
    /// Absolute URL of the converted output.
    pub download_ref: String,
    /// Output name chosen by the service, if it sent one.
    pub output_name: Option<String>,
}

/// One network exchange per request, no retries.
#[async_trait]
pub trait ConversionService: Send + Sync {
    async fn convert(&self, request: &ConversionRequest) -> Result<ServiceReceipt, ServiceError>;
}

/// [`ConversionService`] over HTTP multipart.
#[derive(Debug, Clone)]
pub struct HttpConversionService {
    client: Client,
    endpoint: Url,
    timeout_secs: Option<u64>,
}

impl HttpConversionService {
    /// Build a client for `config.endpoint`, honouring `config.request_timeout_secs`.
    pub fn new(config: &ConverterConfig) -> Result<Self, ConvertError> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.request_timeout() {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| ConvertError::HttpClient(e.to_string()))?;

        let endpoint = Url::parse(&config.endpoint).map_err(|e| {
            ConvertError::InvalidConfig(format!("endpoint '{}': {e}", config.endpoint))
        })?;

        Ok(Self {
            client,
            endpoint,
            timeout_secs: config.request_timeout_secs,
        })
    }

    /// Use a pre-built client (shared connection pool, custom TLS, …).
    pub fn with_client(client: Client, endpoint: Url) -> Self {
        Self {
            client,
            endpoint,
            timeout_secs: None,
        }
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    fn build_form(request: &ConversionRequest) -> Form {
        let mut form = Form::new()
            .text("targetFormat", request.target_format().to_string())
            .text("merge", request.merge().to_string());

        for file in request.sources() {
            let part = Part::stream_with_length(Body::from(file.payload().clone()), file.size_bytes())
                .file_name(file.name().to_string());
            form = form.part("files", part);
        }
        form
    }

    fn transport_error(&self, e: reqwest::Error) -> ServiceError {
        match self.timeout_secs {
            Some(secs) if e.is_timeout() => ServiceError::Timeout { secs },
            _ => ServiceError::Transport {
                detail: e.to_string(),
            },
        }
    }
}

#[async_trait]
impl ConversionService for HttpConversionService {
    async fn convert(&self, request: &ConversionRequest) -> Result<ServiceReceipt, ServiceError> {
        debug!(
            "POST {} ({} file(s), {} bytes, merge={}, format={})",
            self.endpoint,
            request.sources().len(),
            request.size_bytes(),
            request.merge(),
            request.target_format()
        );

        let response = self
            .client
            .post(self.endpoint.clone())
            .multipart(Self::build_form(request))
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status().as_u16();
        let body = response
            .bytes()
            .await
            .map_err(|e| self.transport_error(e))?;

        debug!("Service answered HTTP {} ({} bytes)", status, body.len());
        parse_response(status, &body, &self.endpoint)
    }
}

/// Interpret a service response.
///
/// `base` resolves relative download locators.
pub fn parse_response(status: u16, body: &[u8], base: &Url) -> Result<ServiceReceipt, ServiceError> {
    let json: Option<Value> = serde_json::from_slice(body).ok();

    if !(200..300).contains(&status) {
        let message = json.as_ref().and_then(failure_reason);
        warn!("Conversion service returned HTTP {}", status);
        return Err(ServiceError::Rejected { status, message });
    }

    let json = json.ok_or_else(|| ServiceError::Malformed {
        detail: "response body is not JSON".to_string(),
    })?;

    if reports_failure(&json) {
        return Err(ServiceError::Rejected {
            status,
            message: failure_reason(&json),
        });
    }

    let locator = first_string(&json, &["downloadUrl", "download_url", "url"])
        .ok_or_else(|| ServiceError::Malformed {
            detail: "response has no download URL".to_string(),
        })?;
    let download_ref = base
        .join(locator)
        .map_err(|e| ServiceError::Malformed {
            detail: format!("download URL '{locator}' is invalid: {e}"),
        })?
        .to_string();

    let output_name = first_string(&json, &["fileName", "file_name", "filename"]).map(str::to_string);

    Ok(ServiceReceipt {
        download_ref,
        output_name,
    })
}

/// An explicit `success` flag wins; otherwise only a truthy `error` counts.
fn reports_failure(json: &Value) -> bool {
    match json.get("success").and_then(Value::as_bool) {
        Some(success) => !success,
        None => match json.get("error") {
            Some(Value::Bool(flag)) => *flag,
            Some(Value::String(s)) => !s.trim().is_empty(),
            Some(Value::Object(_)) => true,
            _ => false,
        },
    }
}

fn failure_reason(json: &Value) -> Option<String> {
    let from_error = match json.get("error") {
        Some(Value::String(s)) => Some(s.as_str()),
        Some(obj @ Value::Object(_)) => obj.get("message").and_then(Value::as_str),
        _ => None,
    };
    from_error
        .or_else(|| first_string(json, &["message", "detail"]))
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn first_string<'a>(json: &'a Value, keys: &[&str]) -> Option<&'a str> {
    keys.iter()
        .filter_map(|k| json.get(*k).and_then(Value::as_str))
        .map(str::trim)
        .find(|s| !s.is_empty())
}
