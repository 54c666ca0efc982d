use crate::content_negotiation::{graph_format, query_results_format};
use crate::error::GatewayServerError;
use anyhow::anyhow;
use axum::body::Body;
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use headers::{Expires, HeaderMapExt};
use http::header::{CACHE_CONTROL, CONTENT_TYPE};
use sparesults::QueryResultsSerializer;
use ssp_bus::WebserviceResponse;
use ssp_model::io::{serialize_graph, RdfFormat};
use ssp_model::{ExpiringNamedGraph, Modification, QueryExecutionResults, QueryResultSet};

/// The header that carries the execution time of a SPARQL query.
pub const QUERY_DURATION_HEADER: &str = "x-query-duration-millis";

const NO_CACHE: &str = "no-cache, no-store, must-revalidate";

/// Wraps a graph that is returned to the client in the negotiated format.
pub struct GraphResponse {
    graph: ExpiringNamedGraph,
    format: RdfFormat,
}

impl GraphResponse {
    pub fn new(graph: ExpiringNamedGraph, format: RdfFormat) -> Self {
        Self { graph, format }
    }
}

impl IntoResponse for GraphResponse {
    fn into_response(self) -> Response {
        let body = match serialize_graph(self.graph.graph(), self.format) {
            Ok(body) => body,
            Err(error) => {
                return GatewayServerError::Internal(anyhow!(error)).into_response();
            }
        };

        let mut headers = HeaderMap::new();
        headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_static(self.format.media_type()),
        );
        headers.insert(CACHE_CONTROL, HeaderValue::from_static(NO_CACHE));
        if let Some(expiry) = self.graph.expiry() {
            headers.typed_insert(Expires::from(expiry));
        }

        (StatusCode::OK, headers, Body::from(body)).into_response()
    }
}

/// The empty response of a successful modification.
pub fn modification_response(modification: Modification) -> Response {
    modification.http_status().into_response()
}

/// Serializes query results in the format negotiated with `headers`.
///
/// Graph results are serialized as RDF, all other results in a SPARQL results format.
pub fn query_results_response(
    results: QueryExecutionResults,
    headers: &HeaderMap,
) -> Result<WebserviceResponse, GatewayServerError> {
    let duration = results.duration_millis();
    let (content_type, body) = match results.into_results() {
        QueryResultSet::Solutions { variables, rows } => {
            let format = query_results_format(headers)?;
            let mut serializer = QueryResultsSerializer::from_format(format)
                .serialize_solutions_to_writer(Vec::new(), variables.clone())
                .map_err(internal)?;
            for row in &rows {
                let solution = variables
                    .iter()
                    .zip(row)
                    .filter_map(|(variable, value)| Some((variable, value.as_ref()?)));
                serializer.serialize(solution).map_err(internal)?;
            }
            (format.media_type(), serializer.finish().map_err(internal)?)
        }
        QueryResultSet::Boolean(value) => {
            let format = query_results_format(headers)?;
            let body = QueryResultsSerializer::from_format(format)
                .serialize_boolean_to_writer(Vec::new(), value)
                .map_err(internal)?;
            (format.media_type(), body)
        }
        QueryResultSet::Graph(graph) => {
            let format = graph_format(headers)?;
            (format.media_type(), serialize_graph(&graph, format).map_err(internal)?)
        }
    };

    http::Response::builder()
        .status(StatusCode::OK)
        .header(CONTENT_TYPE, content_type)
        .header(QUERY_DURATION_HEADER, duration.to_string())
        .header(CACHE_CONTROL, NO_CACHE)
        .body(Bytes::from(body))
        .map_err(internal)
}

fn internal(error: impl Into<anyhow::Error>) -> GatewayServerError {
    GatewayServerError::Internal(error.into())
}
