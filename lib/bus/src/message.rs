use crate::{ProxyService, Route, RouteDescription, Webservice};
use ssp_model::{
    CacheError, ExpiringNamedGraph, NamedNode, QueryExecutionResults, RegistrationError,
};
use std::sync::Arc;
use tokio::sync::oneshot;

/// The channel on which a worker answers a request.
pub type Reply<T> = oneshot::Sender<T>;

/// Requests processed by the semantic cache worker, strictly in arrival order.
#[derive(Debug)]
pub enum CacheRequest {
    Contains {
        graph_name: NamedNode,
        reply: Reply<Result<bool, CacheError>>,
    },
    Get {
        graph_name: NamedNode,
        reply: Reply<Result<Option<ExpiringNamedGraph>, CacheError>>,
    },
    /// Upserts a graph and (re)schedules its deletion.
    Update {
        graph: ExpiringNamedGraph,
        reply: Reply<Result<(), CacheError>>,
    },
    /// Deletes a graph and cancels its scheduled deletion.
    Delete {
        graph_name: NamedNode,
        reply: Reply<Result<(), CacheError>>,
    },
    /// Evaluates a SPARQL query over the union of all cached graphs.
    Query {
        query: String,
        reply: Reply<Result<QueryExecutionResults, CacheError>>,
    },
    /// Returns all triples whose subject is `resource`.
    Resource {
        resource: NamedNode,
        reply: Reply<Result<ExpiringNamedGraph, CacheError>>,
    },
    GraphNames {
        reply: Reply<Result<Vec<NamedNode>, CacheError>>,
    },
}

/// Asks the dispatcher to serve a data origin under its proxy URI.
///
/// The dispatcher inserts the initial status into the cache before the route becomes active. The
/// reply is only sent once both steps have completed or the registration has been rolled back.
pub struct RegistrationRequest {
    pub proxy: Arc<dyn ProxyService>,
    pub initial_status: ExpiringNamedGraph,
    pub reply: Reply<Result<(), RegistrationError>>,
}

/// Asks the dispatcher to stop serving a graph and to remove it from the cache.
pub struct DeregistrationRequest {
    pub graph_name: NamedNode,
    pub reply: Reply<Result<(), RegistrationError>>,
}

/// Asks the dispatcher to cache a status that was read through `proxy`.
///
/// The status is only cached while `proxy` still serves its graph. The reply is `false` if the
/// route is gone or belongs to another data origin.
pub struct RefreshRequest {
    pub proxy: Arc<dyn ProxyService>,
    pub status: ExpiringNamedGraph,
    pub reply: Reply<Result<bool, CacheError>>,
}

/// Requests processed by the dispatcher, the single owner of the route table.
pub enum RouteRequest {
    Registration(RegistrationRequest),
    Deregistration(DeregistrationRequest),
    Refresh(RefreshRequest),
    /// Registers a webservice. Replies `false` if the URI is already taken.
    RegisterWebservice {
        uri: String,
        webservice: Arc<dyn Webservice>,
        reply: Reply<bool>,
    },
    /// Replies `false` if no webservice was registered under the URI.
    UnregisterWebservice { uri: String, reply: Reply<bool> },
    Lookup {
        uri: String,
        reply: Reply<Option<Route>>,
    },
    Routes {
        reply: Reply<Vec<RouteDescription>>,
    },
}
