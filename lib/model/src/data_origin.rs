use oxrdf::{NamedNode, NamedNodeRef};
use std::fmt::{Debug, Display, Formatter};
use std::hash::{Hash, Hasher};

/// Bounds every backend-specific data origin identifier has to satisfy.
///
/// Identifiers are used as keys in the registries and are shipped across tasks. A URI of a CoAP
/// resource, a path of a file, or the IRI of a virtual sensor are typical identifiers.
pub trait Identifier: Clone + Eq + Hash + Debug + Display + Send + Sync + 'static {}

impl<T> Identifier for T where T: Clone + Eq + Hash + Debug + Display + Send + Sync + 'static {}

/// An external resource whose state is exposed as an RDF graph.
///
/// Two data origins are considered equal iff they produce the same named graph. The identifier is
/// only meaningful within the backend that created the data origin.
#[derive(Clone)]
pub struct DataOrigin<I> {
    identifier: I,
    graph_name: NamedNode,
    observable: bool,
}

impl<I: Identifier> DataOrigin<I> {
    /// Creates a new [DataOrigin].
    pub fn new(identifier: I, graph_name: NamedNode, observable: bool) -> Self {
        Self {
            identifier,
            graph_name,
            observable,
        }
    }

    /// The backend-specific key of this data origin.
    pub fn identifier(&self) -> &I {
        &self.identifier
    }

    /// The globally unique name of the graph that this data origin produces.
    pub fn graph_name(&self) -> NamedNodeRef<'_> {
        self.graph_name.as_ref()
    }

    /// Whether the data origin supports push-style change notifications.
    pub fn is_observable(&self) -> bool {
        self.observable
    }

    /// The gateway-local URI under which this data origin is served.
    pub fn proxy_uri(&self) -> String {
        graph_proxy_uri(self.graph_name.as_ref())
    }
}

/// Returns the proxy URI (route key) for the given graph name.
pub fn graph_proxy_uri(graph_name: NamedNodeRef<'_>) -> String {
    format!("/?graph={}", graph_name.as_str())
}

impl<I> PartialEq for DataOrigin<I> {
    fn eq(&self, other: &Self) -> bool {
        self.graph_name == other.graph_name
    }
}

impl<I> Eq for DataOrigin<I> {}

impl<I> Hash for DataOrigin<I> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.graph_name.hash(state);
    }
}

impl<I: Display> Debug for DataOrigin<I> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataOrigin")
            .field("identifier", &self.identifier.to_string())
            .field("graph_name", &self.graph_name.as_str())
            .field("observable", &self.observable)
            .finish()
    }
}

impl<I: Display> Display for DataOrigin<I> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[Identifier: {}, Graph Name: {}]",
            self.identifier,
            self.graph_name.as_str()
        )
    }
}
