use crate::SemanticCache;
use ssp_model::{CacheError, Graph, NamedNode, NamedNodeRef, QueryResultSet};

/// A [SemanticCache] that does not cache anything.
///
/// Every read misses, so all requests are forwarded to the data origins. Queries always yield an
/// empty result.
#[derive(Debug, Default, Clone, Copy)]
pub struct DummySemanticCache;

impl SemanticCache for DummySemanticCache {
    fn contains_named_graph(&self, _graph_name: NamedNodeRef<'_>) -> Result<bool, CacheError> {
        Ok(false)
    }

    fn get_named_graph(&self, _graph_name: NamedNodeRef<'_>) -> Result<Option<Graph>, CacheError> {
        Ok(None)
    }

    fn put_named_graph_to_cache(
        &mut self,
        _graph_name: NamedNodeRef<'_>,
        _graph: &Graph,
    ) -> Result<(), CacheError> {
        Ok(())
    }

    fn delete_named_graph(&mut self, _graph_name: NamedNodeRef<'_>) -> Result<(), CacheError> {
        Ok(())
    }

    fn process_sparql_query(&self, _query: &str) -> Result<QueryResultSet, CacheError> {
        Ok(QueryResultSet::Solutions {
            variables: Vec::new(),
            rows: Vec::new(),
        })
    }

    fn graph_names(&self) -> Result<Vec<NamedNode>, CacheError> {
        Ok(Vec::new())
    }
}
