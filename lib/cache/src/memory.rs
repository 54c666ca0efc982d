use crate::SemanticCache;
use oxigraph::sparql::{Query, QueryResults};
use oxigraph::store::Store;
use ssp_model::{
    CacheError, Graph, NamedNode, NamedNodeRef, NamedOrBlankNode, QueryResultSet, Triple,
};
use std::fmt::Display;

/// A [SemanticCache] that keeps all graphs in an in-memory quad store.
pub struct MemorySemanticCache {
    store: Store,
}

impl MemorySemanticCache {
    /// Creates a new, empty [MemorySemanticCache].
    pub fn new() -> Result<Self, CacheError> {
        let store = Store::new().map_err(storage_error)?;
        Ok(Self { store })
    }
}

impl SemanticCache for MemorySemanticCache {
    fn contains_named_graph(&self, graph_name: NamedNodeRef<'_>) -> Result<bool, CacheError> {
        self.store
            .contains_named_graph(graph_name)
            .map_err(storage_error)
    }

    fn get_named_graph(&self, graph_name: NamedNodeRef<'_>) -> Result<Option<Graph>, CacheError> {
        if !self.contains_named_graph(graph_name)? {
            return Ok(None);
        }

        let mut graph = Graph::new();
        for quad in self
            .store
            .quads_for_pattern(None, None, None, Some(graph_name.into()))
        {
            let quad = quad.map_err(storage_error)?;
            graph.insert(&Triple::new(quad.subject, quad.predicate, quad.object));
        }
        Ok(Some(graph))
    }

    fn put_named_graph_to_cache(
        &mut self,
        graph_name: NamedNodeRef<'_>,
        graph: &Graph,
    ) -> Result<(), CacheError> {
        self.store
            .remove_named_graph(graph_name)
            .map_err(storage_error)?;
        self.store
            .insert_named_graph(graph_name)
            .map_err(storage_error)?;
        self.store
            .extend(
                graph
                    .iter()
                    .map(|triple| triple.in_graph(graph_name).into_owned()),
            )
            .map_err(storage_error)
    }

    fn delete_named_graph(&mut self, graph_name: NamedNodeRef<'_>) -> Result<(), CacheError> {
        self.store
            .remove_named_graph(graph_name)
            .map(|_| ())
            .map_err(storage_error)
    }

    fn process_sparql_query(&self, query: &str) -> Result<QueryResultSet, CacheError> {
        let mut query = Query::parse(query, None).map_err(query_error)?;
        query.dataset_mut().set_default_graph_as_union();

        match self.store.query(query).map_err(query_error)? {
            QueryResults::Solutions(solutions) => {
                let variables = solutions.variables().to_vec();
                let rows = solutions
                    .map(|solution| solution.map(|solution| solution.values().to_vec()))
                    .collect::<Result<Vec<_>, _>>()
                    .map_err(query_error)?;
                Ok(QueryResultSet::Solutions { variables, rows })
            }
            QueryResults::Boolean(value) => Ok(QueryResultSet::Boolean(value)),
            QueryResults::Graph(triples) => {
                let mut graph = Graph::new();
                for triple in triples {
                    graph.insert(&triple.map_err(query_error)?);
                }
                Ok(QueryResultSet::Graph(graph))
            }
        }
    }

    fn graph_names(&self) -> Result<Vec<NamedNode>, CacheError> {
        let mut result = Vec::new();
        for graph_name in self.store.named_graphs() {
            if let NamedOrBlankNode::NamedNode(graph_name) = graph_name.map_err(storage_error)? {
                result.push(graph_name);
            }
        }
        Ok(result)
    }
}

fn storage_error(error: impl Display) -> CacheError {
    CacheError::Storage(error.to_string())
}

fn query_error(error: impl Display) -> CacheError {
    CacheError::Query(error.to_string())
}
