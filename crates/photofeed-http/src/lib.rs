// # HTTP Transport
//
// This crate provides the reqwest-based `Transport` for the photo feed.
//
// ## Responsibilities
//
// - Execute one HTTP request per call (no retry, no backoff)
// - Attach the bearer token when one is configured
// - Map non-success statuses to `TransportError::Status`
//
// The access token is never logged; the Debug implementation redacts it.
//
// ## API Reference
//
// - List photos: GET `/photos?page=<n>&per_page=<n>`
// - Like: POST `/photos/:id/like`
// - Unlike: DELETE `/photos/:id/like`

use async_trait::async_trait;
use photofeed_core::error::TransportError;
use photofeed_core::request::{ApiRequest, HttpMethod};
use photofeed_core::traits::Transport;
use photofeed_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default HTTP timeout for API requests (30 seconds)
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Longest error body kept in a `TransportError::Status`
const MAX_ERROR_BODY: usize = 512;

/// HTTP transport configuration
#[derive(Clone, Serialize, Deserialize)]
pub struct HttpTransportConfig {
    /// Bearer token attached to every request
    /// ⚠️ NEVER log this value
    #[serde(default)]
    pub access_token: Option<String>,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl HttpTransportConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.timeout_secs == 0 {
            return Err(Error::config("HTTP timeout must be > 0"));
        }

        if let Some(token) = &self.access_token {
            if token.trim().is_empty() {
                return Err(Error::config("Access token cannot be blank"));
            }
        }

        Ok(())
    }
}

impl Default for HttpTransportConfig {
    fn default() -> Self {
        Self {
            access_token: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

// Custom Debug implementation that hides the access token
impl std::fmt::Debug for HttpTransportConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpTransportConfig")
            .field("access_token", &self.access_token.as_ref().map(|_| "<REDACTED>"))
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

/// reqwest-backed transport
///
/// Cheap to clone; clones share the connection pool.
#[derive(Clone)]
pub struct HttpTransport {
    /// ⚠️ NEVER log this value
    access_token: Option<String>,

    /// HTTP client for API requests
    client: reqwest::Client,
}

impl HttpTransport {
    /// Create a transport from configuration
    pub fn new(config: HttpTransportConfig) -> Result<Self> {
        config.validate()?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            access_token: config.access_token,
            client,
        })
    }

    /// Whether requests carry a bearer token
    pub fn is_authenticated(&self) -> bool {
        self.access_token.is_some()
    }

    fn method(method: HttpMethod) -> reqwest::Method {
        match method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Delete => reqwest::Method::DELETE,
        }
    }
}

impl std::fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpTransport")
            .field("access_token", &self.access_token.as_ref().map(|_| "<REDACTED>"))
            .finish()
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn execute(&self, request: ApiRequest) -> std::result::Result<Vec<u8>, TransportError> {
        tracing::debug!("{}", request);

        let mut builder = self
            .client
            .request(Self::method(request.method), &request.url)
            .header("Accept", "application/json");

        if let Some(token) = &self.access_token {
            builder = builder.bearer_auth(token);
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                TransportError::Timeout
            } else {
                TransportError::Request(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let mut body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error response".to_string());
            truncate(&mut body, MAX_ERROR_BODY);

            tracing::warn!("{} {} -> {}", request.method, request.path, status);
            return Err(TransportError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| TransportError::Request(format!("Failed to read response: {}", e)))?;

        tracing::debug!("{} {} -> {} ({} bytes)", request.method, request.path, status, bytes.len());
        Ok(bytes.to_vec())
    }

    fn transport_name(&self) -> &'static str {
        "http"
    }
}

/// Cut `body` to at most `max` bytes on a char boundary
fn truncate(body: &mut String, max: usize) {
    if body.len() <= max {
        return;
    }

    let mut end = max;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    body.truncate(end);
}
