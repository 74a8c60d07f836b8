//! HTTP API handlers.

use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{Html, IntoResponse, Response},
    Json,
};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Serialize;
use serde_json::{Map, Value};
use time::OffsetDateTime;
use tracing::{debug, info, instrument};

use crate::config::{ComputeMode, Config};
use crate::error::RelayError;
use crate::estimator::format_timestamp;
use crate::model::{ComputationResult, ControlRequest, CredentialContext, GraphRequest, SweepResponse};
use crate::sweep::{sweep, FailurePolicy};
use crate::upstream::{Evaluator, OfflineEstimator, RelayEvaluator, UpstreamClient};

const INDEX_PLACEHOLDER: &str =
    "<h1>Frontend not found. Please ensure static/index.html exists.</h1>";

/// Application state shared with handlers.
///
/// Holds only immutable settings and the pooled HTTP client; credentials
/// live in each request's headers.
#[derive(Clone)]
pub struct AppState {
    /// Where results come from.
    pub mode: ComputeMode,
    /// What a sweep does when one point fails.
    pub policy: FailurePolicy,
    /// Shared upstream connection pool.
    pub upstream: UpstreamClient,
    /// Directory holding `index.html` and static assets.
    pub static_dir: Arc<PathBuf>,
    /// Prometheus handle, if the recorder was installed.
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    /// Create state in relay mode with fail-fast sweeps.
    pub fn new(upstream: UpstreamClient) -> Self {
        Self {
            mode: ComputeMode::default(),
            policy: FailurePolicy::default(),
            upstream,
            static_dir: Arc::new(PathBuf::from("static")),
            metrics: None,
        }
    }

    /// Build state from loaded configuration.
    pub fn from_config(config: &Config) -> Result<Self, RelayError> {
        let mode = config.compute_mode().map_err(RelayError::InvalidConfig)?;
        let policy = config.failure_policy().map_err(RelayError::InvalidConfig)?;
        let upstream = UpstreamClient::from_config(config)?;

        Ok(Self::new(upstream)
            .with_mode(mode)
            .with_policy(policy)
            .with_static_dir(&config.static_dir))
    }

    /// Set compute mode.
    pub fn with_mode(mut self, mode: ComputeMode) -> Self {
        self.mode = mode;
        self
    }

    /// Set sweep failure policy.
    pub fn with_policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Set static asset directory.
    pub fn with_static_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.static_dir = Arc::new(dir.into());
        self
    }

    /// Attach a Prometheus handle for `/metrics`.
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Always "healthy".
    pub status: &'static str,
    /// RFC 3339 time of the check.
    pub timestamp: String,
}

/// Legacy configuration view. Nothing is stored server-side.
#[derive(Debug, Serialize)]
pub struct LegacyConfigResponse {
    /// Always empty.
    pub base_url: &'static str,
    /// Always false.
    pub has_api_key: bool,
    /// Always empty.
    pub api_host: &'static str,
}

/// Legacy configuration update acknowledgement.
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    /// Human-readable message.
    pub message: &'static str,
}

/// Single computation: relay upstream or estimate offline.
///
/// In relay mode the credential headers are checked before the body.
#[instrument(skip_all, fields(mode = %state.mode))]
pub async fn calculate(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<ComputationResult>, RelayError> {
    let result = match state.mode {
        ComputeMode::Relay => {
            let credentials = CredentialContext::from_headers(&headers)?;
            let request = ControlRequest::parse(&body)?;
            RelayEvaluator::new(&state.upstream, &credentials)
                .evaluate(&request)
                .await?
        }
        ComputeMode::Offline => {
            let request = ControlRequest::parse(&body)?;
            OfflineEstimator.evaluate(&request).await?
        }
    };

    debug!(fields = result.len(), "Calculation completed");
    Ok(Json(result))
}

/// Parameter sweep over one numeric field.
#[instrument(skip_all, fields(mode = %state.mode, policy = %state.policy))]
pub async fn graph(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<SweepResponse>, RelayError> {
    let response = match state.mode {
        ComputeMode::Relay => {
            let credentials = CredentialContext::from_headers(&headers)?;
            let graph = GraphRequest::parse(&body)?;
            let evaluator = RelayEvaluator::new(&state.upstream, &credentials);
            sweep(&graph, &evaluator, state.policy).await?
        }
        ComputeMode::Offline => {
            let graph = GraphRequest::parse(&body)?;
            sweep(&graph, &OfflineEstimator, state.policy).await?
        }
    };

    Ok(Json(response))
}

/// Health check handler - always returns 200.
pub async fn health() -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy",
        timestamp: format_timestamp(OffsetDateTime::now_utc()),
    })
}

/// Legacy config update. The payload is accepted and discarded.
pub async fn set_config(Json(payload): Json<Map<String, Value>>) -> impl IntoResponse {
    info!(
        keys = payload.len(),
        "Ignoring legacy config update; credentials are read from request headers"
    );
    Json(MessageResponse {
        message: "Configuration is not stored; send credentials as request headers",
    })
}

/// Legacy config view.
pub async fn get_config() -> impl IntoResponse {
    Json(LegacyConfigResponse {
        base_url: "",
        has_api_key: false,
        api_host: "",
    })
}

/// Serve `index.html`, or a placeholder page when it is missing.
pub async fn index(State(state): State<AppState>) -> Html<String> {
    let path = state.static_dir.join("index.html");
    match tokio::fs::read_to_string(&path).await {
        Ok(page) => Html(page),
        Err(e) => {
            debug!(path = %path.display(), error = %e, "Index page unavailable, serving placeholder");
            Html(INDEX_PLACEHOLDER.to_string())
        }
    }
}

/// Prometheus exposition, 404 when metrics are disabled.
pub async fn render_metrics(State(state): State<AppState>) -> Response {
    match &state.metrics {
        Some(handle) => (StatusCode::OK, handle.render()).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}
