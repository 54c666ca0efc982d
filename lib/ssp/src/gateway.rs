use axum::Router;
use ssp_backend::files::{FilesBackend, FilesBackendConfig};
use ssp_backend::virtual_sensor::{VirtualSensorsBackend, VirtualSensorsConfig, CREATION_URI};
use ssp_backend::RegistryConfig;
use ssp_bus::{BusError, MessageBus};
use ssp_cache::{CacheConfig, CacheWorker, DummySemanticCache, MemorySemanticCache};
use ssp_model::CacheError;
use ssp_web::services::{ServiceDirectory, SparqlEndpoint, DIRECTORY_URI, SPARQL_URI};
use ssp_web::{create_router, Dispatcher, ServerConfig};
use std::sync::Arc;
use tokio::task::AbortHandle;
use tracing::{info, warn};

/// The implementation of the semantic cache.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CacheKind {
    /// Keeps all graphs in an in-memory RDF store.
    #[default]
    Memory,
    /// Stores nothing. Every read is forwarded to the data origins.
    Dummy,
}

/// Holds the configuration of a [Gateway].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayConfig {
    pub cache: CacheConfig,
    pub cache_kind: CacheKind,
    /// Passed to the registries of the backends started by the gateway.
    pub registry: RegistryConfig,
    /// The number of requests that may queue up in front of the cache and the dispatcher.
    pub channel_capacity: usize,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            cache: CacheConfig::default(),
            cache_kind: CacheKind::default(),
            registry: RegistryConfig::default(),
            channel_capacity: 1024,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("Could not create the semantic cache: {0}")]
    Cache(#[from] CacheError),
    #[error(transparent)]
    Bus(#[from] BusError),
    #[error("The URI {0} is already in use")]
    RouteInUse(&'static str),
}

/// A running gateway: the semantic cache, the dispatcher and the built-in webservices.
///
/// Backends register their data origins through [Gateway::bus]. Dropping the gateway stops the
/// workers.
pub struct Gateway {
    bus: MessageBus,
    config: GatewayConfig,
    workers: Vec<AbortHandle>,
}

impl Gateway {
    /// Spawns the workers and registers the SPARQL endpoint and the service directory.
    pub async fn start(config: GatewayConfig) -> Result<Self, GatewayError> {
        let (bus, cache_inbox, route_inbox) = MessageBus::channel(config.channel_capacity);

        let cache_worker = match config.cache_kind {
            CacheKind::Memory => {
                CacheWorker::new(MemorySemanticCache::new()?, config.cache).spawn(cache_inbox)
            }
            CacheKind::Dummy => {
                CacheWorker::new(DummySemanticCache, config.cache).spawn(cache_inbox)
            }
        };
        let dispatcher = Dispatcher::new(bus.clone()).spawn(route_inbox);
        let gateway = Self {
            bus,
            config,
            workers: vec![cache_worker.abort_handle(), dispatcher.abort_handle()],
        };

        gateway
            .register_webservice(SPARQL_URI, Arc::new(SparqlEndpoint::new(gateway.bus.clone())))
            .await?;
        gateway
            .register_webservice(
                DIRECTORY_URI,
                Arc::new(ServiceDirectory::new(gateway.bus.clone())),
            )
            .await?;
        info!("Gateway started ({:?} cache)", gateway.config.cache_kind);
        Ok(gateway)
    }

    pub fn bus(&self) -> &MessageBus {
        &self.bus
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Builds the HTTP router of the gateway.
    pub fn router(&self, cors: bool) -> Router {
        create_router(self.bus.clone(), cors)
    }

    /// Serves the gateway over HTTP until the server fails.
    pub async fn serve(&self, config: ServerConfig) -> anyhow::Result<()> {
        ssp_web::serve(config, self.bus.clone()).await
    }

    /// Registers the files of a directory and watches the directory for new files.
    pub async fn start_files_backend(&mut self, config: FilesBackendConfig) -> Arc<FilesBackend> {
        let directory = config.directory.clone();
        let backend = Arc::new(FilesBackend::new(
            self.bus.clone(),
            config,
            self.config.registry,
        ));
        let registered = backend.scan().await;
        info!(
            "Serving {registered} file(s) from {}",
            directory.display()
        );
        let scanner = Arc::clone(&backend).spawn_scanner();
        self.workers.push(scanner.abort_handle());
        backend
    }

    /// Creates the virtual sensor backend and serves its creation webservice.
    pub async fn start_virtual_sensors(
        &self,
        config: VirtualSensorsConfig,
    ) -> Result<VirtualSensorsBackend, GatewayError> {
        let backend = VirtualSensorsBackend::new(self.bus.clone(), config, self.config.registry);
        self.register_webservice(CREATION_URI, Arc::new(backend.creator()))
            .await?;
        Ok(backend)
    }

    async fn register_webservice(
        &self,
        uri: &'static str,
        webservice: Arc<dyn ssp_bus::Webservice>,
    ) -> Result<(), GatewayError> {
        if self.bus.register_webservice(uri, webservice).await? {
            Ok(())
        } else {
            warn!("Could not register webservice {uri}");
            Err(GatewayError::RouteInUse(uri))
        }
    }
}

impl Drop for Gateway {
    fn drop(&mut self) {
        for worker in &self.workers {
            worker.abort();
        }
    }
}
