//! Upstream computation API client.

use std::time::{Duration, Instant};

use reqwest::header::{HeaderValue, CONTENT_TYPE};
use serde_json::Value;
use tracing::{debug, instrument, warn};
use url::Url;

use crate::config::Config;
use crate::error::{RelayError, UpstreamError};
use crate::metrics;
use crate::model::credentials::{HEADER_API_HOST, HEADER_API_KEY};
use crate::model::{ComputationResult, ControlRequest, CredentialContext};

use super::Evaluator;

/// Maximum number of characters of an error body kept in [`UpstreamError::Status`].
const MAX_ERROR_BODY_CHARS: usize = 512;

/// HTTP client for the upstream computation API.
///
/// Holds no credentials; those arrive with every call.
#[derive(Debug, Clone)]
pub struct UpstreamClient {
    /// HTTP client (connection pool shared across requests).
    http: reqwest::Client,
    /// Per-call timeout.
    timeout: Duration,
}

impl UpstreamClient {
    /// Create a client with the given per-call timeout.
    pub fn new(timeout: Duration) -> Result<Self, UpstreamError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout.min(Duration::from_secs(5)))
            .tcp_nodelay(true)
            .pool_idle_timeout(Duration::from_secs(90))
            .build()?;

        Ok(Self { http, timeout })
    }

    /// Create a client from config.
    pub fn from_config(config: &Config) -> Result<Self, UpstreamError> {
        Self::new(config.upstream_timeout())
    }

    /// POST `payload` to `endpoint_url` exactly once and return the decoded
    /// JSON object unmodified.
    ///
    /// `endpoint_url` is used verbatim; no path is appended.
    #[instrument(skip_all)]
    pub async fn call(
        &self,
        endpoint_url: &str,
        credentials: &CredentialContext,
        payload: &ControlRequest,
    ) -> Result<ComputationResult, UpstreamError> {
        let url = parse_endpoint(endpoint_url)?;
        let start = Instant::now();

        let result = self.send(url, credentials, payload).await;

        metrics::record_upstream_latency(start);
        match &result {
            Ok(_) => debug!(elapsed_ms = start.elapsed().as_millis() as u64, "Upstream call succeeded"),
            Err(e) => {
                metrics::inc_upstream_failures(e.kind());
                warn!(kind = e.kind(), error = %e, "Upstream call failed");
            }
        }

        result
    }

    async fn send(
        &self,
        url: Url,
        credentials: &CredentialContext,
        payload: &ControlRequest,
    ) -> Result<ComputationResult, UpstreamError> {
        let response = self
            .http
            .post(url)
            .header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
            .header(HEADER_API_KEY, credentials.api_key().clone())
            .header(HEADER_API_HOST, credentials.api_host().clone())
            .json(payload)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(UpstreamError::Status {
                status: status.as_u16(),
                body: body.chars().take(MAX_ERROR_BODY_CHARS).collect(),
            });
        }

        let bytes = response.bytes().await.map_err(|e| self.classify(e))?;
        decode_object(&bytes)
    }

    fn classify(&self, error: reqwest::Error) -> UpstreamError {
        if error.is_timeout() {
            UpstreamError::Timeout {
                timeout_secs: self.timeout.as_secs(),
            }
        } else {
            UpstreamError::Transport(error)
        }
    }
}

/// Accept only absolute http(s) URLs.
fn parse_endpoint(endpoint_url: &str) -> Result<Url, UpstreamError> {
    let url = Url::parse(endpoint_url).map_err(|e| UpstreamError::InvalidEndpoint {
        url: endpoint_url.to_string(),
        reason: e.to_string(),
    })?;

    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(UpstreamError::InvalidEndpoint {
            url: endpoint_url.to_string(),
            reason: format!("unsupported scheme '{other}'"),
        }),
    }
}

fn decode_object(bytes: &[u8]) -> Result<ComputationResult, UpstreamError> {
    match serde_json::from_slice::<Value>(bytes) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(UpstreamError::Decode(format!(
            "expected a JSON object, got {}",
            json_kind(&other)
        ))),
        Err(e) => Err(UpstreamError::Decode(e.to_string())),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Evaluator that relays every request upstream with one caller's credentials.
#[derive(Debug, Clone, Copy)]
pub struct RelayEvaluator<'a> {
    client: &'a UpstreamClient,
    credentials: &'a CredentialContext,
}

impl<'a> RelayEvaluator<'a> {
    /// Bind a client to the credentials of the current request.
    pub fn new(client: &'a UpstreamClient, credentials: &'a CredentialContext) -> Self {
        Self {
            client,
            credentials,
        }
    }
}

impl Evaluator for RelayEvaluator<'_> {
    async fn evaluate(&self, request: &ControlRequest) -> Result<ComputationResult, RelayError> {
        Ok(self
            .client
            .call(self.credentials.base_url(), self.credentials, request)
            .await?)
    }
}
