//! The HTTP surface of the semantic service proxy.
//!
//! The [Dispatcher] owns the route table and is driven through the [MessageBus]. The axum router
//! built by [create_router] resolves every request against that table, serves graphs from the
//! cache where possible, and forwards everything else to the data origins and webservices.

use anyhow::Context;
use axum::body::Body;
use axum::extract::DefaultBodyLimit;
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::Response;
use axum::Router;
use ssp_bus::MessageBus;
use std::any::Any;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

mod config;
mod content_negotiation;
mod dispatcher;
mod error;
mod handler;
mod response;
pub mod services;

pub use config::{ServerConfig, DEFAULT_BIND};
pub use dispatcher::Dispatcher;
pub use error::GatewayServerError;
pub use response::QUERY_DURATION_HEADER;

/// Builds the router that serves all requests of a gateway.
pub fn create_router(bus: MessageBus, cors: bool) -> Router {
    let app = Router::new()
        .fallback(handler::dispatch)
        .with_state(GatewayState { bus })
        .layer(DefaultBodyLimit::disable())
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(TraceLayer::new_for_http());

    if cors {
        app.layer(CorsLayer::permissive())
    } else {
        app
    }
}

/// Serves the gateway until the server fails.
pub async fn serve(config: ServerConfig, bus: MessageBus) -> anyhow::Result<()> {
    let app = create_router(bus, config.cors);
    let listener = tokio::net::TcpListener::bind(config.bind.as_str())
        .await
        .with_context(|| format!("Could not bind to {}", config.bind))?;

    info!("Listening on {}", listener.local_addr()?);
    Ok(axum::serve(listener, app).await?)
}

#[derive(Clone)]
struct GatewayState {
    bus: MessageBus,
}

fn handle_panic(panic: Box<dyn Any + Send + 'static>) -> Response {
    let message = if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_owned()
    } else {
        "Unknown panic".to_owned()
    };
    error!("Request handler panicked: {message}");

    let mut response = Response::new(Body::from(message));
    *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
    response
        .headers_mut()
        .insert(header::CONNECTION, HeaderValue::from_static("close"));
    response
}

#[cfg(test)]
pub(crate) mod test_util {
    use async_trait::async_trait;
    use ssp_bus::{CacheInbox, ProxyService};
    use ssp_cache::{CacheConfig, CacheWorker, MemorySemanticCache};
    use ssp_model::{
        AccessResult, ExpiringNamedGraph, Graph, Literal, Modification, NamedNode, NamedNodeRef,
        Triple,
    };
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    pub(crate) fn iri(name: &str) -> NamedNode {
        NamedNode::new(format!("http://example.com/{name}")).unwrap()
    }

    /// A graph named `http://example.com/<name>` with a single triple.
    pub(crate) fn graph(name: &str) -> ExpiringNamedGraph {
        let mut graph = Graph::new();
        graph.insert(&Triple::new(iri("s"), iri("p"), Literal::from(name)));
        ExpiringNamedGraph::never_expiring(iri(name), graph)
    }

    pub(crate) fn start_cache(inbox: CacheInbox) {
        let cache = MemorySemanticCache::new().unwrap();
        CacheWorker::new(cache, CacheConfig::default()).spawn(inbox);
    }

    /// A data origin that always reports the same status and records every call.
    pub(crate) struct StaticProxy {
        identifier: String,
        graph_name: NamedNode,
        pub(crate) calls: AtomicUsize,
        pub(crate) received: Mutex<Option<Graph>>,
    }

    impl StaticProxy {
        pub(crate) fn new(identifier: &str, graph_name: &str) -> Arc<Self> {
            Arc::new(Self {
                identifier: identifier.to_owned(),
                graph_name: iri(graph_name),
                calls: AtomicUsize::new(0),
                received: Mutex::new(None),
            })
        }
    }

    #[async_trait]
    impl ProxyService for StaticProxy {
        fn backend_name(&self) -> &str {
            "static"
        }

        fn origin_identifier(&self) -> String {
            self.identifier.clone()
        }

        fn graph_name(&self) -> NamedNodeRef<'_> {
            self.graph_name.as_ref()
        }

        async fn get_status(&self) -> AccessResult {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let (_, graph, expiry) = graph(&self.identifier).into_parts();
            Ok(ExpiringNamedGraph::new(self.graph_name.clone(), graph, expiry))
        }

        async fn set_status(&self, graph: Graph) -> AccessResult<Modification> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.received.lock().unwrap() = Some(graph);
            Ok(Modification::Updated)
        }

        async fn delete_resource(&self) -> AccessResult<Modification> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(Modification::Deleted)
        }
    }
}
