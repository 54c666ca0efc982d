use crate::MockAccessor;
use axum_test::TestServer;
use ssp::backend::{Observer, Registry};
use ssp::bus::{CacheRequest, MessageBus, RouteKind};
use ssp::cache::{CacheConfig, CacheWorker, MemorySemanticCache};
use ssp::model::NamedNode;
use ssp::web::Dispatcher;
use ssp::{Gateway, GatewayConfig};
use std::sync::Arc;
use std::time::Duration;

/// A started [Gateway] together with an in-process HTTP client for its router.
pub struct TestGateway {
    gateway: Gateway,
    server: TestServer,
}

impl TestGateway {
    pub async fn start() -> anyhow::Result<Self> {
        Self::with_config(GatewayConfig::default()).await
    }

    pub async fn with_config(config: GatewayConfig) -> anyhow::Result<Self> {
        let gateway = Gateway::start(config).await?;
        let server = TestServer::new(gateway.router(false))?;
        Ok(Self { gateway, server })
    }

    pub fn server(&self) -> &TestServer {
        &self.server
    }

    pub fn bus(&self) -> &MessageBus {
        self.gateway.bus()
    }

    /// Creates a registry for a backend whose data origins are simulated by `accessor`.
    pub fn registry(
        &self,
        backend_name: &str,
        accessor: Arc<MockAccessor>,
        observer: Arc<impl Observer<String> + 'static>,
    ) -> Registry<String> {
        Registry::new(
            backend_name,
            self.bus().clone(),
            accessor,
            observer,
            self.gateway.config().registry,
        )
    }

    pub async fn is_cached(&self, graph_name: &NamedNode) -> anyhow::Result<bool> {
        Ok(self.bus().contains_named_graph(graph_name.clone()).await?)
    }

    /// The proxy URIs of all data origins in the route table.
    pub async fn data_origin_uris(&self) -> anyhow::Result<Vec<String>> {
        Ok(self
            .bus()
            .routes()
            .await?
            .into_iter()
            .filter(|route| route.kind == RouteKind::DataOrigin)
            .map(|route| route.uri)
            .collect())
    }
}

/// Starts a cache and a dispatcher whose cache acknowledges updates only `update_delay` after
/// applying them.
///
/// All other cache requests are answered in order and without delay. This leaves room to cancel a
/// registration while its initial status is being cached.
pub fn slow_cache_bus(update_delay: Duration) -> anyhow::Result<MessageBus> {
    let (bus, mut cache_inbox, route_inbox) = MessageBus::channel(64);
    let (cache, inner_inbox, _) = MessageBus::channel(64);
    CacheWorker::new(MemorySemanticCache::new()?, CacheConfig::default()).spawn(inner_inbox);
    Dispatcher::new(bus.clone()).spawn(route_inbox);

    tokio::spawn(async move {
        while let Some(request) = cache_inbox.recv().await {
            match request {
                CacheRequest::Update { graph, reply } => {
                    let result = cache.update_cache(graph).await;
                    tokio::spawn(async move {
                        tokio::time::sleep(update_delay).await;
                        reply.send(result).ok();
                    });
                }
                request => forward(&cache, request).await,
            }
        }
    });
    Ok(bus)
}

async fn forward(cache: &MessageBus, request: CacheRequest) {
    match request {
        CacheRequest::Contains { graph_name, reply } => {
            reply.send(cache.contains_named_graph(graph_name).await).ok();
        }
        CacheRequest::Get { graph_name, reply } => {
            reply.send(cache.get_named_graph(graph_name).await).ok();
        }
        CacheRequest::Update { graph, reply } => {
            reply.send(cache.update_cache(graph).await).ok();
        }
        CacheRequest::Delete { graph_name, reply } => {
            reply.send(cache.delete_from_cache(graph_name).await).ok();
        }
        CacheRequest::Query { query, reply } => {
            reply.send(cache.query(query).await).ok();
        }
        CacheRequest::Resource { resource, reply } => {
            reply.send(cache.lookup_resource(resource).await).ok();
        }
        CacheRequest::GraphNames { reply } => {
            reply.send(cache.cached_graph_names().await).ok();
        }
    }
}
