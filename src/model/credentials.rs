//! Per-call upstream credentials taken from request headers.

use std::fmt;

use axum::http::{HeaderMap, HeaderValue};

use crate::error::RelayError;

/// Header carrying the complete upstream endpoint URL.
pub const HEADER_BASE_URL: &str = "X-RapidAPI-Base-Url";
/// Header carrying the upstream API key.
pub const HEADER_API_KEY: &str = "X-RapidAPI-Key";
/// Header carrying the upstream host.
pub const HEADER_API_HOST: &str = "X-RapidAPI-Host";

/// Credentials for a single upstream call.
///
/// Built fresh for every incoming request and dropped with it. Key and host
/// are stored as ready-to-send header values; the key is marked sensitive and
/// the `Debug` impl redacts it.
#[derive(Clone, PartialEq, Eq)]
pub struct CredentialContext {
    base_url: String,
    api_key: HeaderValue,
    api_host: HeaderValue,
}

impl CredentialContext {
    /// Create a context, rejecting empty values and values that cannot be
    /// sent as header values.
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        api_host: impl Into<String>,
    ) -> Result<Self, RelayError> {
        let base_url = non_empty(base_url.into(), HEADER_BASE_URL)?;
        let mut api_key = header_value(api_key.into(), HEADER_API_KEY)?;
        api_key.set_sensitive(true);
        let api_host = header_value(api_host.into(), HEADER_API_HOST)?;

        Ok(Self {
            base_url,
            api_key,
            api_host,
        })
    }

    /// Extract credentials from the three credential headers.
    ///
    /// A header that is absent, empty, or not valid visible ASCII counts as
    /// missing.
    pub fn from_headers(headers: &HeaderMap) -> Result<Self, RelayError> {
        let read = |name: &'static str| -> Result<String, RelayError> {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .ok_or(RelayError::MissingCredentials { header: name })
        };

        Self::new(
            read(HEADER_BASE_URL)?,
            read(HEADER_API_KEY)?,
            read(HEADER_API_HOST)?,
        )
    }

    /// Complete upstream endpoint URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Upstream API key, marked sensitive.
    pub fn api_key(&self) -> &HeaderValue {
        &self.api_key
    }

    /// Upstream host header value.
    pub fn api_host(&self) -> &HeaderValue {
        &self.api_host
    }
}

fn non_empty(value: String, header: &'static str) -> Result<String, RelayError> {
    let value = value.trim().to_string();
    if value.is_empty() {
        Err(RelayError::MissingCredentials { header })
    } else {
        Ok(value)
    }
}

fn header_value(value: String, header: &'static str) -> Result<HeaderValue, RelayError> {
    HeaderValue::try_from(non_empty(value, header)?)
        .map_err(|_| RelayError::InvalidCredentials { header })
}

impl fmt::Debug for CredentialContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialContext")
            .field("base_url", &self.base_url)
            .field("api_key", &"<redacted>")
            .field("api_host", &self.api_host)
            .finish()
    }
}
