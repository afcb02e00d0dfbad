//! HTTP client for third-party APIs with uniform error mapping.

use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::{Method, RequestBuilder, StatusCode};
use serde_json::Value as JsonValue;
use std::time::Duration;
use tracing::{debug, error, warn};

use crate::error::ProxyError;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const REASON_LIMIT: usize = 256;

/// Client bound to one upstream service.
#[derive(Debug, Clone)]
pub struct UpstreamClient {
    service: &'static str,
    base_url: String,
    http: reqwest::Client,
}

impl UpstreamClient {
    /// Creates a client for `service` rooted at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns [`ProxyError::Internal`] if the HTTP client cannot be built.
    pub fn new(service: &'static str, base_url: impl Into<String>) -> Result<Self, ProxyError> {
        Self::with_timeout(service, base_url, DEFAULT_TIMEOUT)
    }

    /// Creates a client with an explicit request timeout.
    ///
    /// # Errors
    ///
    /// Returns [`ProxyError::Internal`] if the HTTP client cannot be built.
    pub fn with_timeout(
        service: &'static str,
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ProxyError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ProxyError::Internal {
                reason: format!("HTTP client error: {e}"),
            })?;
        Ok(Self {
            service,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http,
        })
    }

    /// Name of the upstream service, used in errors and logs.
    #[must_use]
    pub fn service(&self) -> &'static str {
        self.service
    }

    /// Starts a request to `path` under the base URL.
    pub fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.http
            .request(method, format!("{}{}", self.base_url, path))
    }

    /// Sends `request` and decodes a JSON response.
    ///
    /// An empty success body decodes to `null`.
    ///
    /// # Errors
    ///
    /// - [`ProxyError::Unreachable`] if no response arrived
    /// - [`ProxyError::RateLimited`] for 429
    /// - [`ProxyError::Upstream`] for any other non-2xx status
    /// - [`ProxyError::InvalidUpstreamResponse`] if the body is not JSON
    pub async fn send_json(&self, request: RequestBuilder) -> Result<JsonValue, ProxyError> {
        // Request URLs can carry credentials in the query string.
        let response = request.send().await.map_err(|e| {
            let e = e.without_url();
            error!(service = self.service, error = %e, "upstream unreachable");
            ProxyError::Unreachable {
                service: self.service.to_string(),
                reason: e.to_string(),
            }
        })?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after_secs = retry_after_secs(response.headers(), Utc::now());
            warn!(service = self.service, ?retry_after_secs, "upstream rate limited");
            return Err(ProxyError::RateLimited {
                service: self.service.to_string(),
                retry_after_secs,
            });
        }

        let body = response.bytes().await.map_err(|e| ProxyError::Unreachable {
            service: self.service.to_string(),
            reason: e.without_url().to_string(),
        })?;

        if !status.is_success() {
            let reason = excerpt(&String::from_utf8_lossy(&body));
            error!(service = self.service, status = status.as_u16(), %reason, "upstream error");
            return Err(ProxyError::Upstream {
                service: self.service.to_string(),
                status: status.as_u16(),
                reason,
            });
        }

        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(JsonValue::Null);
        }
        debug!(service = self.service, bytes = body.len(), "upstream response");
        serde_json::from_slice(&body).map_err(|e| ProxyError::InvalidUpstreamResponse {
            service: self.service.to_string(),
            reason: e.to_string(),
        })
    }
}

/// Reads `Retry-After` as delta-seconds or an HTTP date.
pub(crate) fn retry_after_secs(headers: &HeaderMap, now: DateTime<Utc>) -> Option<u64> {
    let value = headers.get(RETRY_AFTER)?.to_str().ok()?.trim();
    if let Ok(secs) = value.parse::<u64>() {
        return Some(secs);
    }
    let at = DateTime::parse_from_rfc2822(value).ok()?.with_timezone(&Utc);
    Some(u64::try_from((at - now).num_seconds()).unwrap_or(0))
}

fn excerpt(text: &str) -> String {
    text.chars().take(REASON_LIMIT).collect()
}
