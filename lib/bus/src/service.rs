use async_trait::async_trait;
use bytes::Bytes;
use ssp_model::{AccessError, AccessResult, Graph, Modification, NamedNodeRef};
use std::fmt::{Debug, Formatter};
use std::sync::Arc;

/// A request to a [Webservice]. The body is fully buffered.
pub type WebserviceRequest = http::Request<Bytes>;

/// A response of a [Webservice].
pub type WebserviceResponse = http::Response<Bytes>;

/// The type-erased view the dispatcher has on a registered data origin.
///
/// Registries hand an implementation of this trait to the dispatcher when they register a data
/// origin. It forwards requests to the accessor of the data origin and enforces the accessor
/// timeout.
#[async_trait]
pub trait ProxyService: Send + Sync {
    /// The name of the backend that registered the data origin.
    fn backend_name(&self) -> &str;

    /// The backend-specific identifier of the data origin, rendered as text.
    fn origin_identifier(&self) -> String;

    fn graph_name(&self) -> NamedNodeRef<'_>;

    async fn get_status(&self) -> AccessResult;

    async fn set_status(&self, graph: Graph) -> AccessResult<Modification>;

    async fn delete_resource(&self) -> AccessResult<Modification>;
}

/// A non-semantic HTTP service served by the gateway (e.g., the SPARQL endpoint).
#[async_trait]
pub trait Webservice: Send + Sync {
    /// A short human-readable description that is listed by the service directory.
    fn description(&self) -> &str;

    /// Processes a request. Errors are turned into responses with the mapped HTTP status.
    async fn process(&self, request: WebserviceRequest) -> Result<WebserviceResponse, AccessError>;
}

/// The handler the dispatcher resolved for a proxy URI.
#[derive(Clone)]
pub enum Route {
    /// A registered data origin. Reads are served from the cache when possible.
    DataOrigin(Arc<dyn ProxyService>),
    Webservice(Arc<dyn Webservice>),
}

impl Debug for Route {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Route::DataOrigin(proxy) => f
                .debug_tuple("DataOrigin")
                .field(&proxy.origin_identifier())
                .finish(),
            Route::Webservice(service) => f
                .debug_tuple("Webservice")
                .field(&service.description())
                .finish(),
        }
    }
}

/// The kind of handler behind a [RouteDescription].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteKind {
    DataOrigin,
    Webservice,
}

/// A snapshot of a route table entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteDescription {
    pub uri: String,
    pub kind: RouteKind,
    /// The backend and identifier of a data origin, or the description of a webservice.
    pub description: String,
}
