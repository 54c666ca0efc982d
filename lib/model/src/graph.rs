use oxrdf::{Graph, NamedNode, NamedNodeRef, SubjectRef, TermRef};
use std::collections::HashSet;
use std::time::SystemTime;

/// A named RDF graph together with the point in time after which it is considered stale.
///
/// An expiry of [None] means that the graph never expires.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpiringNamedGraph {
    graph_name: NamedNode,
    graph: Graph,
    expiry: Option<SystemTime>,
}

impl ExpiringNamedGraph {
    /// Creates a new [ExpiringNamedGraph].
    pub fn new(graph_name: NamedNode, graph: Graph, expiry: Option<SystemTime>) -> Self {
        Self {
            graph_name,
            graph,
            expiry,
        }
    }

    /// Creates a graph that is cached indefinitely.
    pub fn never_expiring(graph_name: NamedNode, graph: Graph) -> Self {
        Self::new(graph_name, graph, None)
    }

    /// Creates a graph that is already stale when it is handed out.
    pub fn expiring_now(graph_name: NamedNode, graph: Graph) -> Self {
        Self::new(graph_name, graph, Some(SystemTime::now()))
    }

    pub fn graph_name(&self) -> NamedNodeRef<'_> {
        self.graph_name.as_ref()
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub fn expiry(&self) -> Option<SystemTime> {
        self.expiry
    }

    /// Returns whether the graph is stale at `instant`.
    pub fn is_expired_at(&self, instant: SystemTime) -> bool {
        self.expiry.is_some_and(|expiry| expiry <= instant)
    }

    /// Splits the graph into its name, the triples, and the expiry.
    pub fn into_parts(self) -> (NamedNode, Graph, Option<SystemTime>) {
        (self.graph_name, self.graph, self.expiry)
    }
}

/// Splits `graph` into one sub-graph per subject of interest.
///
/// Every sub-graph contains the triples of its subject and, transitively, the triples of all blank
/// nodes reachable from it. Subjects without any triple are skipped.
pub fn split_by_subject(
    graph: &Graph,
    subjects: impl IntoIterator<Item = NamedNode>,
) -> Vec<(NamedNode, Graph)> {
    let mut result = Vec::new();
    for subject in subjects {
        let sub_graph = describe(graph, subject.as_ref().into());
        if !sub_graph.is_empty() {
            result.push((subject, sub_graph));
        }
    }
    result
}

/// Splits `graph` by all of its IRI subjects.
pub fn split_by_named_subjects(graph: &Graph) -> Vec<(NamedNode, Graph)> {
    let mut subjects = Vec::new();
    let mut seen = HashSet::new();
    for triple in graph {
        if let SubjectRef::NamedNode(node) = triple.subject {
            if seen.insert(node) {
                subjects.push(node.into_owned());
            }
        }
    }
    split_by_subject(graph, subjects)
}

fn describe(graph: &Graph, subject: SubjectRef<'_>) -> Graph {
    let mut result = Graph::new();
    let mut visited = HashSet::new();
    let mut pending = vec![subject];
    while let Some(current) = pending.pop() {
        for triple in graph.triples_for_subject(current) {
            if let TermRef::BlankNode(node) = triple.object {
                if visited.insert(node) {
                    pending.push(node.into());
                }
            }
            result.insert(triple);
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use oxrdf::{BlankNode, Literal, Triple};
    use std::time::Duration;

    fn node(name: &str) -> NamedNode {
        NamedNode::new(format!("http://example.com/{name}")).unwrap()
    }

    #[test]
    fn split_follows_blank_nodes() {
        let observation = BlankNode::default();
        let mut graph = Graph::new();
        graph.insert(&Triple::new(node("s1"), node("p"), observation.clone()));
        graph.insert(&Triple::new(observation, node("value"), Literal::from(21)));
        graph.insert(&Triple::new(node("s2"), node("p"), Literal::from("x")));

        let split = split_by_named_subjects(&graph);

        assert_eq!(split.len(), 2);
        let (first, first_graph) = split.iter().find(|(s, _)| *s == node("s1")).unwrap();
        assert_eq!(first, &node("s1"));
        assert_eq!(first_graph.len(), 2);
        let (_, second_graph) = split.iter().find(|(s, _)| *s == node("s2")).unwrap();
        assert_eq!(second_graph.len(), 1);
    }

    #[test]
    fn split_skips_unknown_subjects() {
        let mut graph = Graph::new();
        graph.insert(&Triple::new(node("s1"), node("p"), node("o")));

        let split = split_by_subject(&graph, [node("s1"), node("unknown")]);

        assert_eq!(split.len(), 1);
    }

    #[test]
    fn expiry_is_inclusive() {
        let now = SystemTime::now();
        let graph = ExpiringNamedGraph::new(node("g"), Graph::new(), Some(now));

        assert!(graph.is_expired_at(now));
        assert!(!graph.is_expired_at(now - Duration::from_secs(1)));
        assert!(!ExpiringNamedGraph::never_expiring(node("g"), Graph::new()).is_expired_at(now));
    }
}
