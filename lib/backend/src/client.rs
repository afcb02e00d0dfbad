//! Shared HTTP plumbing for the hosted platform.

use peoplehub_core::Result;
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::fmt;
use std::time::Duration;
use tracing::debug;

use crate::error::BackendError;

/// Longest response body excerpt kept in an error.
const ERROR_BODY_LIMIT: usize = 512;

/// Connection settings for the hosted platform.
#[derive(Clone, PartialEq, Eq)]
pub struct PlatformConfig {
    url: String,
    anon_key: String,
    service_key: Option<String>,
    timeout: Duration,
}

impl PlatformConfig {
    /// Creates a config for the platform at `url`.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is not http(s) or the key is blank.
    pub fn new(url: impl Into<String>, anon_key: impl Into<String>) -> Result<Self, BackendError> {
        let url = url.into().trim_end_matches('/').to_string();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(BackendError::InvalidConfig {
                details: format!("platform url must be http(s): '{}'", url),
            }
            .into());
        }

        let anon_key = anon_key.into();
        if anon_key.trim().is_empty() {
            return Err(BackendError::InvalidConfig {
                details: "anon key is empty".to_string(),
            }
            .into());
        }

        Ok(Self {
            url,
            anon_key,
            service_key: None,
            timeout: Duration::from_secs(10),
        })
    }

    /// Sets the privileged key used for server-side reads.
    #[must_use]
    pub fn with_service_key(mut self, service_key: Option<String>) -> Self {
        self.service_key = service_key.filter(|k| !k.trim().is_empty());
        self
    }

    /// Sets the per-request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Returns the platform base URL without a trailing slash.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Returns the public key sent as `apikey`.
    #[must_use]
    pub fn anon_key(&self) -> &str {
        &self.anon_key
    }

    /// Returns the key server-side reads authenticate with.
    #[must_use]
    pub fn server_key(&self) -> &str {
        self.service_key.as_deref().unwrap_or(&self.anon_key)
    }
}

impl fmt::Debug for PlatformConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlatformConfig")
            .field("url", &self.url)
            .field("service_key", &self.service_key.as_ref().map(|_| "<redacted>"))
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

/// HTTP client bound to one platform project.
#[derive(Debug, Clone)]
pub struct PlatformClient {
    http: reqwest::Client,
    config: PlatformConfig,
}

impl PlatformClient {
    /// Creates a client for `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: PlatformConfig) -> Result<Self, BackendError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| BackendError::InvalidConfig {
                details: format!("HTTP client error: {}", e),
            })?;
        Ok(Self { http, config })
    }

    /// Returns the platform configuration.
    #[must_use]
    pub fn config(&self) -> &PlatformConfig {
        &self.config
    }

    /// Builds an absolute URL for `path`.
    #[must_use]
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.config.url, path)
    }

    /// Starts a request carrying the project `apikey` header.
    pub(crate) fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.http
            .request(method, self.endpoint(path))
            .header("apikey", &self.config.anon_key)
    }
}

/// Checks the status of `response` and decodes its JSON body.
///
/// 401 and 403 map to [`BackendError::Unauthorized`].
pub(crate) async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, BackendError> {
    let response = check_status(response).await?;
    let body = response
        .bytes()
        .await
        .map_err(|e| BackendError::request(&e))?;
    Ok(serde_json::from_slice(&body).map_err(BackendError::decode)?)
}

/// Returns `response` if it succeeded, otherwise the matching error.
pub(crate) async fn check_status(response: Response) -> Result<Response, BackendError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    debug!(status = status.as_u16(), url = %response.url(), "platform request rejected");

    if matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
        return Err(BackendError::Unauthorized.into());
    }

    let mut body = response.text().await.unwrap_or_default();
    if body.len() > ERROR_BODY_LIMIT {
        let mut cut = ERROR_BODY_LIMIT;
        while !body.is_char_boundary(cut) {
            cut -= 1;
        }
        body.truncate(cut);
    }
    Err(BackendError::UnexpectedStatus {
        status: status.as_u16(),
        body,
    }
    .into())
}
