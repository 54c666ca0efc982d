use oxrdf::{Graph, Term, Variable};
use std::time::Duration;

/// The materialized result of a SPARQL query over the cached graphs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryResultSet {
    /// Results of a `SELECT` query. Every row has one (optional) value per variable.
    Solutions {
        variables: Vec<Variable>,
        rows: Vec<Vec<Option<Term>>>,
    },
    /// Result of an `ASK` query.
    Boolean(bool),
    /// Result of a `CONSTRUCT` or `DESCRIBE` query.
    Graph(Graph),
}

impl QueryResultSet {
    /// Returns the values bound to `variable`, skipping unbound rows.
    pub fn values_of(&self, variable: &str) -> Vec<&Term> {
        let QueryResultSet::Solutions { variables, rows } = self else {
            return Vec::new();
        };
        let Some(index) = variables.iter().position(|v| v.as_str() == variable) else {
            return Vec::new();
        };
        rows.iter()
            .filter_map(|row| row.get(index).and_then(Option::as_ref))
            .collect()
    }
}

/// A [QueryResultSet] together with the time it took to compute it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryExecutionResults {
    results: QueryResultSet,
    duration: Duration,
}

impl QueryExecutionResults {
    pub fn new(results: QueryResultSet, duration: Duration) -> Self {
        Self { results, duration }
    }

    pub fn results(&self) -> &QueryResultSet {
        &self.results
    }

    pub fn into_results(self) -> QueryResultSet {
        self.results
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub fn duration_millis(&self) -> u128 {
        self.duration.as_millis()
    }
}
