use ssp_model::{
    CacheError, Graph, NamedNode, NamedNodeRef, QueryResultSet, Term, Triple,
};

/// Storage for the named graphs of all registered data origins.
///
/// Implementations neither know about expiry nor about concurrency. They are owned by exactly one
/// [CacheWorker](crate::CacheWorker), which serializes all operations and schedules the deletion
/// of expired graphs.
pub trait SemanticCache: Send + 'static {
    fn contains_named_graph(&self, graph_name: NamedNodeRef<'_>) -> Result<bool, CacheError>;

    /// Returns the triples of a cached graph.
    fn get_named_graph(&self, graph_name: NamedNodeRef<'_>) -> Result<Option<Graph>, CacheError>;

    /// Inserts a graph, replacing any previous version with the same name.
    fn put_named_graph_to_cache(
        &mut self,
        graph_name: NamedNodeRef<'_>,
        graph: &Graph,
    ) -> Result<(), CacheError>;

    /// Removes a graph. Removing a graph that is not cached is not an error.
    fn delete_named_graph(&mut self, graph_name: NamedNodeRef<'_>) -> Result<(), CacheError>;

    /// Evaluates a SPARQL query whose default graph is the union of all cached graphs.
    fn process_sparql_query(&self, query: &str) -> Result<QueryResultSet, CacheError>;

    fn graph_names(&self) -> Result<Vec<NamedNode>, CacheError>;

    /// Returns all triples whose subject is `resource`, regardless of the graph they are cached in.
    fn resource_graph(&self, resource: NamedNodeRef<'_>) -> Result<Graph, CacheError> {
        let query = format!("SELECT ?p ?o WHERE {{ {resource} ?p ?o }}");
        let mut graph = Graph::new();
        let QueryResultSet::Solutions { rows, .. } = self.process_sparql_query(&query)? else {
            return Ok(graph);
        };

        for row in rows {
            if let [Some(Term::NamedNode(predicate)), Some(object)] = row.as_slice() {
                graph.insert(&Triple::new(
                    resource.into_owned(),
                    predicate.clone(),
                    object.clone(),
                ));
            }
        }
        Ok(graph)
    }
}
