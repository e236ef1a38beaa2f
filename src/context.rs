/// Application context and dependency injection
use crate::{
    cache::ResultCache,
    config::ServerConfig,
    crypto::KeyStore,
    dossier::{DossierOrchestrator, DossierService},
    error::ProxyResult,
    upstream::{HttpTransport, UpstreamClient, UpstreamTransport},
};
use std::sync::Arc;

/// Application context holding all shared services
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<ServerConfig>,
    pub cache: Arc<ResultCache>,
    pub key_store: Arc<KeyStore>,
    pub dossiers: DossierService,
}

impl AppContext {
    /// Create a new application context from configuration
    pub fn new(config: ServerConfig) -> ProxyResult<Self> {
        // Validate configuration
        config.validate()?;

        let transport = Arc::new(HttpTransport::new(&config.upstream)?);
        Self::with_transport(config, transport, Arc::new(ResultCache::new()))
    }

    /// Build the context around a given transport and cache
    pub fn with_transport(
        config: ServerConfig,
        transport: Arc<dyn UpstreamTransport>,
        cache: Arc<ResultCache>,
    ) -> ProxyResult<Self> {
        let key_store = Arc::new(KeyStore::new(config.crypto.key_pair()?, Arc::clone(&cache)));

        let client = UpstreamClient::new(transport, config.upstream.base_url.clone());
        let orchestrator = DossierOrchestrator::new(client, Arc::clone(&key_store));
        let dossiers = DossierService::new(Arc::clone(&cache), orchestrator);

        tracing::info!(upstream = %config.upstream.base_url, "Application context ready");

        Ok(Self {
            config: Arc::new(config),
            cache,
            key_store,
            dossiers,
        })
    }
}
