use crate::error::GatewayServerError;
use crate::response::query_results_response;
use async_trait::async_trait;
use axum::body::Body;
use axum::extract::{Form, FromRequest, Query};
use http::header::CONTENT_TYPE;
use http::Method;
use serde::Deserialize;
use ssp_bus::{MessageBus, Webservice, WebserviceRequest, WebserviceResponse};
use ssp_model::AccessError;
use tracing::debug;

/// The URI under which the [SparqlEndpoint] is served.
pub const SPARQL_URI: &str = "/sparql";

const SPARQL_QUERY_MEDIA_TYPE: &str = "application/sparql-query";

#[derive(Debug, Deserialize)]
struct SparqlParams {
    query: String,
}

/// Evaluates SPARQL queries over the union of all cached graphs.
///
/// Queries are accepted as `GET /sparql?query=...`, as a `query` form field, or as an
/// `application/sparql-query` body.
pub struct SparqlEndpoint {
    bus: MessageBus,
}

impl SparqlEndpoint {
    pub fn new(bus: MessageBus) -> Self {
        Self { bus }
    }

    async fn handle(&self, request: WebserviceRequest) -> Result<WebserviceResponse, GatewayServerError> {
        let headers = request.headers().clone();
        let query = extract_query(request).await?;
        debug!("Evaluating SPARQL query: {query}");

        let results = self.bus.query(query).await?;
        query_results_response(results, &headers)
    }
}

async fn extract_query(request: WebserviceRequest) -> Result<String, GatewayServerError> {
    match *request.method() {
        Method::GET => {
            let Query(params) = Query::<SparqlParams>::try_from_uri(request.uri())
                .map_err(|error| GatewayServerError::BadRequest(error.body_text()))?;
            Ok(params.query)
        }
        Method::POST => {
            let is_sparql_query = request
                .headers()
                .get(CONTENT_TYPE)
                .and_then(|content_type| content_type.to_str().ok())
                .is_some_and(|content_type| content_type.starts_with(SPARQL_QUERY_MEDIA_TYPE));
            if is_sparql_query {
                return String::from_utf8(request.into_body().to_vec())
                    .map_err(|error| GatewayServerError::BadRequest(error.to_string()));
            }

            let Form(params) = Form::<SparqlParams>::from_request(request.map(Body::from), &())
                .await
                .map_err(|error| GatewayServerError::BadRequest(error.body_text()))?;
            Ok(params.query)
        }
        ref method => Err(GatewayServerError::MethodNotAllowed(method.clone())),
    }
}

#[async_trait]
impl Webservice for SparqlEndpoint {
    fn description(&self) -> &str {
        "SPARQL endpoint over all cached graphs"
    }

    async fn process(&self, request: WebserviceRequest) -> Result<WebserviceResponse, AccessError> {
        Ok(self.handle(request).await?)
    }
}
