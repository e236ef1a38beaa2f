/// Upstream client for the Mahakim middleware
///
/// Issues browser-like GET requests, parses JSON and opens encrypted
/// envelopes. Transport failures and non-2xx statuses are errors; malformed
/// bodies and undecryptable payloads come back as diagnostic objects.

pub mod endpoint;
pub mod envelope;
#[cfg(test)]
pub mod mock;

pub use endpoint::Endpoint;
pub use envelope::{open_envelope, EnvelopeOrRaw};

use crate::{config::UpstreamConfig, crypto::CryptoKeyPair};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, REFERER, USER_AGENT};
use serde_json::{json, Value};
use std::{sync::Arc, time::Duration};
use thiserror::Error;
use tracing::{debug, warn};

/// Longest raw excerpt kept when the body is not JSON
pub const RAW_EXCERPT_CHARS: usize = 500;

/// Upstream errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UpstreamError {
    #[error("Request failed: {0}")]
    Transport(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("HTTP {status} from {url}")]
    Status { status: u16, url: String },

    #[error("Failed to create HTTP client: {0}")]
    Client(String),
}

impl From<reqwest::Error> for UpstreamError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            UpstreamError::Timeout(e.to_string())
        } else {
            UpstreamError::Transport(e.to_string())
        }
    }
}

/// Raw HTTP seam: GET a URL and return its body as JSON
#[async_trait]
pub trait UpstreamTransport: Send + Sync {
    async fn get_json(&self, url: &str, params: &[(&'static str, String)]) -> Result<Value, UpstreamError>;
}

/// Diagnostic object returned in place of a body that is not JSON
pub fn non_json_diagnostic(text: &str) -> Value {
    let excerpt: String = text.chars().take(RAW_EXCERPT_CHARS).collect();
    json!({
        "error": "non_json_response",
        "text": excerpt,
    })
}

/// reqwest-backed transport
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(config: &UpstreamConfig) -> Result<Self, UpstreamError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&config.user_agent)
                .map_err(|e| UpstreamError::Client(format!("invalid user agent: {}", e)))?,
        );
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(
            REFERER,
            HeaderValue::from_str(&config.referer)
                .map_err(|e| UpstreamError::Client(format!("invalid referer: {}", e)))?,
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| UpstreamError::Client(e.to_string()))?;

        Ok(Self { client })
    }
}

#[async_trait]
impl UpstreamTransport for HttpTransport {
    async fn get_json(&self, url: &str, params: &[(&'static str, String)]) -> Result<Value, UpstreamError> {
        let response = self.client.get(url).query(params).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(UpstreamError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let text = response.text().await?;
        match serde_json::from_str(&text) {
            Ok(value) => Ok(value),
            Err(e) => {
                warn!(url, error = %e, "Upstream returned a non-JSON body");
                Ok(non_json_diagnostic(&text))
            }
        }
    }
}

/// Client used by the orchestrator: transport plus envelope handling
#[derive(Clone)]
pub struct UpstreamClient {
    transport: Arc<dyn UpstreamTransport>,
    base_url: String,
}

impl UpstreamClient {
    pub fn new(transport: Arc<dyn UpstreamTransport>, base_url: impl Into<String>) -> Self {
        Self {
            transport,
            base_url: base_url.into(),
        }
    }

    /// GET `url`, then decrypt a `data` envelope with `keys` when present
    pub async fn fetch_url(
        &self,
        url: &str,
        params: &[(&'static str, String)],
        keys: &CryptoKeyPair,
    ) -> Result<Value, UpstreamError> {
        let body = self.transport.get_json(url, params).await?;

        let outcome = open_envelope(body, keys);
        if let EnvelopeOrRaw::RawWithDiagnostic(_, reason) = &outcome {
            crate::metrics::ENVELOPE_DECRYPT_FAILURES_TOTAL.inc();
            warn!(url, error = %reason, "Failed to decrypt response envelope");
        }
        Ok(outcome.into_value())
    }

    /// Call one of the `SuiviDossiers` endpoints
    pub async fn fetch(
        &self,
        endpoint: Endpoint,
        params: &[(&'static str, String)],
        keys: &CryptoKeyPair,
    ) -> Result<Value, UpstreamError> {
        let url = endpoint.url(&self.base_url);
        debug!(endpoint = %endpoint, "Calling Mahakim middleware");

        let result = self.fetch_url(&url, params, keys).await;
        let outcome = match &result {
            Ok(_) => "ok",
            Err(UpstreamError::Timeout(_)) => "timeout",
            Err(UpstreamError::Status { .. }) => "http_error",
            Err(_) => "transport_error",
        };
        crate::metrics::record_upstream_request(endpoint.path(), outcome);
        result
    }
}
