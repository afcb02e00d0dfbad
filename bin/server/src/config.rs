//! Centralized server configuration.
//!
//! Loaded via the `config` crate from environment variables, using `__` as
//! the section separator (`PLATFORM__URL`, `AI__API_KEY`, ...). A proxy
//! function whose section is absent is not registered.

use peoplehub_proxy::functions::{
    AiContentConfig, BoardConfig, EmailConfig, ErpConfig, MessagingConfig,
};
use serde::Deserialize;
use std::fmt;

/// Server configuration composed from library configs.
#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    /// Address the HTTP listener binds to.
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Hosted platform connection.
    pub platform: PlatformSection,

    /// `ai-content` function settings.
    #[serde(default)]
    pub ai: Option<AiContentConfig>,

    /// `erp` function settings.
    #[serde(default)]
    pub erp: Option<ErpConfig>,

    /// `messaging` function settings.
    #[serde(default)]
    pub messaging: Option<MessagingConfig>,

    /// `board` function settings.
    #[serde(default)]
    pub board: Option<BoardConfig>,

    /// `email` function settings.
    #[serde(default)]
    pub email: Option<EmailConfig>,
}

/// Hosted platform settings.
#[derive(Clone, Deserialize)]
pub struct PlatformSection {
    /// Base URL of the platform.
    pub url: String,

    /// Public key sent as `apikey` on every request.
    pub anon_key: String,

    /// Privileged key for server-side role lookups.
    #[serde(default)]
    pub service_key: Option<String>,

    /// Maximum number of cached role decisions.
    #[serde(default = "default_role_cache_capacity")]
    pub role_cache_capacity: usize,
}

impl fmt::Debug for PlatformSection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlatformSection")
            .field("url", &self.url)
            .field("service_key", &self.service_key.as_ref().map(|_| "<redacted>"))
            .field("role_cache_capacity", &self.role_cache_capacity)
            .finish_non_exhaustive()
    }
}

fn default_bind_addr() -> String {
    "127.0.0.1:8787".to_string()
}

fn default_role_cache_capacity() -> usize {
    1024
}

impl ServerConfig {
    /// Loads configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if required configuration is missing or invalid.
    pub fn from_env() -> Result<Self, config::ConfigError> {
        Self::from_environment(config::Environment::default())
    }

    /// Loads configuration from `environment`.
    ///
    /// # Errors
    ///
    /// Returns an error if required configuration is missing or invalid.
    pub fn from_environment(environment: config::Environment) -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(environment.separator("__").try_parsing(true))
            .build()?
            .try_deserialize()
    }
}
