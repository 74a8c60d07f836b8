//! Unified error types for the control relay.

use std::fmt;

use axum::{http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;
use thiserror::Error;

/// Unified error type for the control relay.
#[derive(Error, Debug)]
pub enum RelayError {
    /// Configuration holds an unusable value.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Request body failed validation.
    #[error("{0}")]
    Validation(#[from] ValidationError),

    /// A required per-call credential header was absent or empty.
    #[error("missing credentials: header {header} is required")]
    MissingCredentials {
        /// Name of the missing header.
        header: &'static str,
    },

    /// A credential cannot be sent as an HTTP header value.
    #[error("invalid credentials: header {header} contains characters not allowed in a header value")]
    InvalidCredentials {
        /// Name of the offending header.
        header: &'static str,
    },

    /// The offline estimate overflowed.
    #[error("{0}")]
    Estimate(#[from] EstimateError),

    /// The upstream call failed.
    #[error("upstream call failed: {0}")]
    Upstream(#[from] UpstreamError),

    /// Sweep parameter does not name a numeric request field.
    #[error("unknown parameter '{name}': expected one of {expected}")]
    FieldNotFound {
        /// The requested parameter name.
        name: String,
        /// Comma-separated list of sweepable fields.
        expected: String,
    },
}

impl RelayError {
    /// HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::Estimate(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::MissingCredentials { .. }
            | Self::InvalidCredentials { .. }
            | Self::FieldNotFound { .. } => StatusCode::BAD_REQUEST,
            Self::Upstream(_) => StatusCode::BAD_GATEWAY,
            Self::InvalidConfig(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Short category name used in error bodies and metrics.
    pub fn category(&self) -> &'static str {
        match self {
            Self::InvalidConfig(_) => "config",
            Self::Validation(_) => "validation",
            Self::MissingCredentials { .. } => "missing_credentials",
            Self::InvalidCredentials { .. } => "invalid_credentials",
            Self::Estimate(_) => "non_finite_estimate",
            Self::Upstream(_) => "upstream",
            Self::FieldNotFound { .. } => "field_not_found",
        }
    }
}

/// A single field-level validation failure.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldViolation {
    /// Dotted path of the offending field (e.g. `base_request.beta_0`).
    pub field: String,
    /// Human-readable description of the violated constraint.
    pub constraint: String,
}

/// Request validation failure, itemizing every offending field.
#[derive(Error, Debug, Clone, PartialEq)]
pub struct ValidationError {
    /// All violations found, in field order.
    pub violations: Vec<FieldViolation>,
}

impl ValidationError {
    /// Create an error for a single field.
    pub fn single(field: impl Into<String>, constraint: impl Into<String>) -> Self {
        Self {
            violations: vec![FieldViolation {
                field: field.into(),
                constraint: constraint.into(),
            }],
        }
    }

    /// Check whether a violation was recorded for `field`.
    pub fn has_field(&self, field: &str) -> bool {
        self.violations.iter().any(|v| v.field == field)
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid request")?;
        for (i, v) in self.violations.iter().enumerate() {
            let sep = if i == 0 { ": " } else { "; " };
            write!(f, "{}{} {}", sep, v.field, v.constraint)?;
        }
        Ok(())
    }
}

/// An estimated quantity overflowed and cannot be encoded as a JSON number.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("estimate overflowed: {field} is {value}")]
pub struct EstimateError {
    /// Result field holding the value (e.g. `processed_output[0]`).
    pub field: String,
    /// The non-finite value.
    pub value: f64,
}

/// Failures of a single upstream call.
#[derive(Error, Debug)]
pub enum UpstreamError {
    /// Endpoint is not an absolute http(s) URL.
    #[error("invalid upstream endpoint '{url}': {reason}")]
    InvalidEndpoint {
        /// The rejected endpoint.
        url: String,
        /// Why it was rejected.
        reason: String,
    },

    /// No response within the configured timeout.
    #[error("upstream timed out after {timeout_secs}s")]
    Timeout {
        /// Timeout that elapsed.
        timeout_secs: u64,
    },

    /// Connection refused, DNS failure, broken body, etc.
    #[error("transport failure: {0}")]
    Transport(#[from] reqwest::Error),

    /// Upstream answered with a non-success status.
    #[error("upstream returned HTTP {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body (truncated).
        body: String,
    },

    /// Response body was not a JSON object.
    #[error("failed to decode upstream response: {0}")]
    Decode(String),
}

impl UpstreamError {
    /// Label used for failure metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidEndpoint { .. } => "invalid_endpoint",
            Self::Timeout { .. } => "timeout",
            Self::Transport(_) => "transport",
            Self::Status { .. } => "status",
            Self::Decode(_) => "decode",
        }
    }
}

/// JSON error body returned to callers.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Error category.
    pub error: &'static str,
    /// Human-readable message.
    pub message: String,
    /// Field-level details (validation errors only).
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub details: Vec<FieldViolation>,
}

impl IntoResponse for RelayError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status_code();
        let details = match &self {
            Self::Validation(e) => e.violations.clone(),
            _ => Vec::new(),
        };
        let body = ErrorBody {
            error: self.category(),
            message: self.to_string(),
            details,
        };
        (status, Json(body)).into_response()
    }
}
