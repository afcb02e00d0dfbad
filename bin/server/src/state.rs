//! Shared application state and its assembly from configuration.

use peoplehub_access::{InMemoryRoleCache, RoleResolver};
use peoplehub_backend::{HostedAuthProvider, PlatformClient, PlatformConfig, RestRoleDirectory};
use peoplehub_core::Result;
use peoplehub_proxy::functions::{
    AiContentFunction, BoardFunction, EmailFunction, ErpFunction, MessagingFunction,
};
use peoplehub_proxy::{Dispatcher, FunctionRegistry, ProxyError, ProxyFunction};
use std::sync::Arc;
use tracing::info;

use crate::config::{PlatformSection, ServerConfig};
use crate::error::StartupError;

/// Application state shared by all handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Proxy dispatcher.
    pub dispatcher: Arc<Dispatcher>,
}

impl AppState {
    /// Wraps a dispatcher.
    #[must_use]
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self {
            dispatcher: Arc::new(dispatcher),
        }
    }

    /// Builds the state for `config`: platform clients, role resolver, and
    /// every configured proxy function.
    ///
    /// # Errors
    ///
    /// Returns an error if the platform settings are invalid or a function
    /// cannot be built.
    pub fn from_config(config: &ServerConfig) -> Result<Self, StartupError> {
        let client = platform_client(&config.platform)?;
        let provider = Arc::new(HostedAuthProvider::new(client.clone()));
        let resolver = RoleResolver::with_cache(
            Arc::new(RestRoleDirectory::new(client)),
            Arc::new(InMemoryRoleCache::bounded(config.platform.role_cache_capacity)),
        );
        let registry = build_registry(config)?;
        info!(
            functions = ?registry.names().collect::<Vec<_>>(),
            "proxy functions registered"
        );

        Ok(Self::new(Dispatcher::new(registry, provider, resolver)))
    }
}

fn platform_client(section: &PlatformSection) -> Result<PlatformClient, StartupError> {
    let platform = |e: rootcause::Report<_>| StartupError::Platform {
        details: e.to_string(),
    };
    let config = PlatformConfig::new(&section.url, &section.anon_key)
        .map_err(platform)?
        .with_service_key(section.service_key.clone());
    Ok(PlatformClient::new(config).map_err(platform)?)
}

/// Registers one function per configured section.
///
/// # Errors
///
/// Returns an error naming the first function that could not be built.
pub fn build_registry(config: &ServerConfig) -> Result<FunctionRegistry, StartupError> {
    let mut registry = FunctionRegistry::new();
    if let Some(ai) = &config.ai {
        registry.register(built("ai-content", AiContentFunction::new(ai.clone()))?);
    }
    if let Some(erp) = &config.erp {
        registry.register(built("erp", ErpFunction::new(erp.clone()))?);
    }
    if let Some(messaging) = &config.messaging {
        registry.register(built("messaging", MessagingFunction::new(messaging.clone()))?);
    }
    if let Some(board) = &config.board {
        registry.register(built("board", BoardFunction::new(board.clone()))?);
    }
    if let Some(email) = &config.email {
        registry.register(built("email", EmailFunction::new(email.clone()))?);
    }
    Ok(registry)
}

fn built<F>(
    name: &str,
    function: std::result::Result<F, ProxyError>,
) -> std::result::Result<Arc<dyn ProxyFunction>, StartupError>
where
    F: ProxyFunction + 'static,
{
    function
        .map(|f| Arc::new(f) as Arc<dyn ProxyFunction>)
        .map_err(|e| StartupError::Function {
            name: name.to_string(),
            details: e.to_string(),
        })
}
