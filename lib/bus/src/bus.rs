use crate::{
    BusError, CacheRequest, DeregistrationRequest, ProxyService, RefreshRequest,
    RegistrationRequest, Reply, Route, RouteDescription, RouteRequest, Webservice,
};
use ssp_model::{
    CacheError, ExpiringNamedGraph, NamedNode, QueryExecutionResults, RegistrationError,
};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};

const CACHE: &str = "semantic cache";
const DISPATCHER: &str = "dispatcher";

/// A cloneable handle for sending requests to the semantic cache and the dispatcher.
#[derive(Clone, Debug)]
pub struct MessageBus {
    cache: mpsc::Sender<CacheRequest>,
    routes: mpsc::Sender<RouteRequest>,
}

/// The receiving end of the semantic cache's requests.
pub struct CacheInbox(mpsc::Receiver<CacheRequest>);

impl CacheInbox {
    pub async fn recv(&mut self) -> Option<CacheRequest> {
        self.0.recv().await
    }
}

/// The receiving end of the dispatcher's requests.
pub struct RouteInbox(mpsc::Receiver<RouteRequest>);

impl RouteInbox {
    pub async fn recv(&mut self) -> Option<RouteRequest> {
        self.0.recv().await
    }
}

impl MessageBus {
    /// Creates a new bus whose channels buffer up to `capacity` requests each.
    pub fn channel(capacity: usize) -> (Self, CacheInbox, RouteInbox) {
        let (cache, cache_inbox) = mpsc::channel(capacity);
        let (routes, route_inbox) = mpsc::channel(capacity);
        let bus = Self { cache, routes };
        (bus, CacheInbox(cache_inbox), RouteInbox(route_inbox))
    }

    /// Checks whether a graph is cached.
    pub async fn contains_named_graph(&self, graph_name: NamedNode) -> Result<bool, CacheError> {
        self.request_cache(|reply| CacheRequest::Contains { graph_name, reply })
            .await
    }

    pub async fn get_named_graph(
        &self,
        graph_name: NamedNode,
    ) -> Result<Option<ExpiringNamedGraph>, CacheError> {
        self.request_cache(|reply| CacheRequest::Get { graph_name, reply })
            .await
    }

    /// Upserts a graph in the cache. Resolves once the update has been applied.
    pub async fn update_cache(&self, graph: ExpiringNamedGraph) -> Result<(), CacheError> {
        self.request_cache(|reply| CacheRequest::Update { graph, reply })
            .await
    }

    pub async fn delete_from_cache(&self, graph_name: NamedNode) -> Result<(), CacheError> {
        self.request_cache(|reply| CacheRequest::Delete { graph_name, reply })
            .await
    }

    /// Evaluates a SPARQL query over all cached graphs.
    pub async fn query(&self, query: impl Into<String>) -> Result<QueryExecutionResults, CacheError> {
        let query = query.into();
        self.request_cache(|reply| CacheRequest::Query { query, reply })
            .await
    }

    /// Returns the description of a single resource as found in the cache.
    pub async fn lookup_resource(
        &self,
        resource: NamedNode,
    ) -> Result<ExpiringNamedGraph, CacheError> {
        self.request_cache(|reply| CacheRequest::Resource { resource, reply })
            .await
    }

    pub async fn cached_graph_names(&self) -> Result<Vec<NamedNode>, CacheError> {
        self.request_cache(|reply| CacheRequest::GraphNames { reply })
            .await
    }

    /// Asks the dispatcher to serve a data origin. Resolves once the initial status is cached and
    /// the route is active, or the registration has been rolled back.
    pub async fn register_data_origin(
        &self,
        proxy: Arc<dyn ProxyService>,
        initial_status: ExpiringNamedGraph,
    ) -> Result<(), RegistrationError> {
        self.request_route(|reply| {
            RouteRequest::Registration(RegistrationRequest {
                proxy,
                initial_status,
                reply,
            })
        })
        .await?
    }

    /// Asks the dispatcher to remove a data origin from the cache and the route table.
    pub async fn deregister_data_origin(
        &self,
        graph_name: NamedNode,
    ) -> Result<(), RegistrationError> {
        self.request_route(|reply| {
            RouteRequest::Deregistration(DeregistrationRequest { graph_name, reply })
        })
        .await?
    }

    /// Caches a status read through `proxy` if the proxy still serves its graph.
    ///
    /// Returns `false` if the data origin has been deregistered in the meantime. The status is
    /// then discarded, so a late answer cannot bring back a removed graph.
    pub async fn refresh_cache(
        &self,
        proxy: Arc<dyn ProxyService>,
        status: ExpiringNamedGraph,
    ) -> Result<bool, CacheError> {
        self.request_route(|reply| {
            RouteRequest::Refresh(RefreshRequest {
                proxy,
                status,
                reply,
            })
        })
        .await?
    }

    /// Registers a webservice. Returns `false` if the URI is already taken.
    pub async fn register_webservice(
        &self,
        uri: impl Into<String>,
        webservice: Arc<dyn Webservice>,
    ) -> Result<bool, BusError> {
        let uri = uri.into();
        self.request_route(|reply| RouteRequest::RegisterWebservice {
            uri,
            webservice,
            reply,
        })
        .await
    }

    pub async fn unregister_webservice(&self, uri: impl Into<String>) -> Result<bool, BusError> {
        let uri = uri.into();
        self.request_route(|reply| RouteRequest::UnregisterWebservice { uri, reply })
            .await
    }

    /// Resolves the handler for a proxy URI.
    pub async fn lookup_route(&self, uri: impl Into<String>) -> Result<Option<Route>, BusError> {
        let uri = uri.into();
        self.request_route(|reply| RouteRequest::Lookup { uri, reply })
            .await
    }

    /// Lists all routes, sorted by URI.
    pub async fn routes(&self) -> Result<Vec<RouteDescription>, BusError> {
        self.request_route(|reply| RouteRequest::Routes { reply })
            .await
    }

    async fn request_cache<T>(
        &self,
        request: impl FnOnce(Reply<Result<T, CacheError>>) -> CacheRequest,
    ) -> Result<T, CacheError> {
        let (reply, response) = oneshot::channel();
        self.cache
            .send(request(reply))
            .await
            .map_err(|_| BusError(CACHE))?;
        response.await.map_err(|_| BusError(CACHE))?
    }

    async fn request_route<T>(
        &self,
        request: impl FnOnce(Reply<T>) -> RouteRequest,
    ) -> Result<T, BusError> {
        let (reply, response) = oneshot::channel();
        self.routes
            .send(request(reply))
            .await
            .map_err(|_| BusError(DISPATCHER))?;
        response.await.map_err(|_| BusError(DISPATCHER))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ssp_model::Graph;

    fn graph_name() -> NamedNode {
        NamedNode::new("http://example.com/g").unwrap()
    }

    #[tokio::test]
    async fn cache_requests_are_answered_by_the_worker() {
        let (bus, mut cache_inbox, _route_inbox) = MessageBus::channel(4);

        let worker = tokio::spawn(async move {
            match cache_inbox.recv().await {
                Some(CacheRequest::Update { graph, reply }) => {
                    assert_eq!(graph.graph_name(), graph_name().as_ref());
                    reply.send(Ok(())).unwrap();
                }
                _ => panic!("expected an update request"),
            }
        });

        let graph = ExpiringNamedGraph::never_expiring(graph_name(), Graph::new());
        bus.update_cache(graph).await.unwrap();
        worker.await.unwrap();
    }

    #[tokio::test]
    async fn closed_cache_is_unavailable() {
        let (bus, cache_inbox, _route_inbox) = MessageBus::channel(4);
        drop(cache_inbox);

        let result = bus.contains_named_graph(graph_name()).await;

        assert_eq!(result, Err(CacheError::Unavailable));
    }

    #[tokio::test]
    async fn dropped_reply_makes_registration_fail() {
        let (bus, _cache_inbox, mut route_inbox) = MessageBus::channel(4);
        tokio::spawn(async move {
            // Drop every request without answering.
            while route_inbox.recv().await.is_some() {}
        });

        let result = bus.deregister_data_origin(graph_name()).await;

        assert_eq!(result, Err(RegistrationError::Unavailable(DISPATCHER)));
    }
}
