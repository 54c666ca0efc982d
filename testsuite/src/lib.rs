//! Fixtures for the scenario tests of the semantic service proxy.
//!
//! The scenarios in `tests/` drive a complete [Gateway](ssp::Gateway) through its HTTP interface and
//! its message bus, with data origins backed by a [MockAccessor].

mod accessor;
mod gateway;
mod observer;

pub use accessor::MockAccessor;
pub use gateway::{slow_cache_bus, TestGateway};
pub use observer::RecordingObserver;

use ssp::model::{DataOrigin, Graph, Literal, NamedNode, Triple};

/// The namespace of all IRIs used by the scenarios.
pub const EX: &str = "http://example.com/";

/// Builds an IRI in the [EX] namespace. `name` must be a valid IRI path segment.
pub fn iri(name: &str) -> NamedNode {
    NamedNode::new_unchecked(format!("{EX}{name}"))
}

/// The predicate under which a [MockAccessor] publishes its current value.
pub fn value_predicate() -> NamedNode {
    iri("value")
}

/// The status a thing reports: a single `<graph_name> ex:value <value>` triple.
pub fn status_graph(graph_name: &NamedNode, value: i64) -> Graph {
    let mut graph = Graph::new();
    graph.insert(&Triple::new(
        graph_name.clone(),
        value_predicate(),
        Literal::from(value),
    ));
    graph
}

/// A data origin whose graph is named after its identifier.
pub fn origin(identifier: &str, observable: bool) -> DataOrigin<String> {
    DataOrigin::new(identifier.to_owned(), iri(identifier), observable)
}
