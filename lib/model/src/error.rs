use crate::AccessError;
use oxrdf::NamedNode;
use thiserror::Error;

/// An error of the semantic cache.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CacheError {
    /// The underlying storage failed.
    #[error("Cache storage error: {0}")]
    Storage(String),
    /// The query could not be parsed or evaluated.
    #[error("Query error: {0}")]
    Query(String),
    /// The cache worker is not running anymore.
    #[error("The cache is not available")]
    Unavailable,
}

/// An error that occurred while registering or unregistering a data origin.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RegistrationError {
    /// The identifier is currently being (un)registered or is registered with another graph name.
    #[error("Data origin '{0}' is already registered or its registration is in progress")]
    IdentifierConflict(String),
    /// Another data origin already serves the graph.
    #[error("Graph '{graph_name}' is already served by data origin '{registered_by}'")]
    GraphNameConflict {
        graph_name: NamedNode,
        registered_by: String,
    },
    /// The data origin is not registered.
    #[error("Data origin '{0}' is not registered")]
    NotFound(String),
    /// The registration was canceled before it could complete.
    #[error("Registration aborted: {0}")]
    Aborted(String),
    /// The initial status could not be retrieved.
    #[error("Could not access data origin: {0}")]
    Access(#[from] AccessError),
    /// The initial status could not be cached.
    #[error(transparent)]
    Cache(#[from] CacheError),
    /// The coordinating component is not running anymore.
    #[error("{0} is not available")]
    Unavailable(&'static str),
}
