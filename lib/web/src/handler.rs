use crate::content_negotiation::{body_format, graph_format};
use crate::error::GatewayServerError;
use crate::response::{modification_response, GraphResponse};
use crate::GatewayState;
use axum::body::{Body, Bytes};
use axum::extract::{Query, State};
use axum::http::{HeaderMap, Method, Uri};
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use ssp_bus::{MessageBus, ProxyService, Route, Webservice};
use ssp_model::io::parse_graph;
use ssp_model::{graph_proxy_uri, NamedNode};
use std::sync::Arc;
use tracing::{debug, warn};

/// The query parameters understood at the root URI.
#[derive(Debug, Default, Deserialize)]
struct RootParams {
    graph: Option<String>,
    resource: Option<String>,
}

/// Dispatches every request of the gateway.
///
/// `/?graph=<g>` is served from the cache or the data origin that produces `g`, `/?resource=<r>`
/// from the cache only. All other URIs are resolved through the route table.
pub(crate) async fn dispatch(
    State(state): State<GatewayState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, GatewayServerError> {
    debug!("{method} {uri}");

    if uri.path() == "/" && uri.query().is_some() {
        let Query(params) = Query::<RootParams>::try_from_uri(&uri)
            .map_err(|error| GatewayServerError::BadRequest(error.body_text()))?;
        if let Some(graph) = params.graph {
            let graph_name = parse_iri(&graph)?;
            return handle_graph(&state.bus, method, graph_name, &headers, body).await;
        }
        if let Some(resource) = params.resource {
            let resource = parse_iri(&resource)?;
            return handle_resource(&state.bus, method, resource, &headers).await;
        }
    }

    match state.bus.lookup_route(uri.path()).await? {
        Some(Route::Webservice(webservice)) => {
            forward_to_webservice(webservice, method, uri, headers, body).await
        }
        Some(Route::DataOrigin(proxy)) => {
            forward_to_data_origin(&state.bus, proxy, method, &headers, body).await
        }
        None => Err(GatewayServerError::NotFound(uri.to_string())),
    }
}

async fn handle_graph(
    bus: &MessageBus,
    method: Method,
    graph_name: NamedNode,
    headers: &HeaderMap,
    body: Bytes,
) -> Result<Response, GatewayServerError> {
    let uri = graph_proxy_uri(graph_name.as_ref());

    if method == Method::GET {
        let format = graph_format(headers)?;
        if let Some(cached) = bus.get_named_graph(graph_name).await? {
            debug!("Serving {uri} from the cache");
            return Ok(GraphResponse::new(cached, format).into_response());
        }
    }

    match bus.lookup_route(uri.as_str()).await? {
        Some(Route::DataOrigin(proxy)) => {
            forward_to_data_origin(bus, proxy, method, headers, body).await
        }
        Some(Route::Webservice(_)) | None => Err(GatewayServerError::NotFound(uri)),
    }
}

async fn handle_resource(
    bus: &MessageBus,
    method: Method,
    resource: NamedNode,
    headers: &HeaderMap,
) -> Result<Response, GatewayServerError> {
    if method != Method::GET {
        return Err(GatewayServerError::MethodNotAllowed(method));
    }

    let format = graph_format(headers)?;
    let description = bus.lookup_resource(resource.clone()).await?;
    if description.graph().is_empty() {
        return Err(GatewayServerError::NotFound(format!("/?resource={resource}")));
    }
    Ok(GraphResponse::new(description, format).into_response())
}

/// Translates a request on a data origin into an accessor operation.
async fn forward_to_data_origin(
    bus: &MessageBus,
    proxy: Arc<dyn ProxyService>,
    method: Method,
    headers: &HeaderMap,
    body: Bytes,
) -> Result<Response, GatewayServerError> {
    match method {
        Method::GET => {
            let format = graph_format(headers)?;
            let status = proxy.get_status().await?;
            // Deregistration may have happened while the data origin was being read.
            match bus.refresh_cache(Arc::clone(&proxy), status.clone()).await {
                Ok(true) => {}
                Ok(false) => debug!("{} is not served anymore, not caching", proxy.graph_name()),
                Err(error) => {
                    warn!("Could not cache the status of {}: {error}", proxy.graph_name());
                }
            }
            Ok(GraphResponse::new(status, format).into_response())
        }
        Method::PUT => {
            let format = body_format(headers)?;
            let base_iri = proxy.graph_name().as_str().to_owned();
            let graph = parse_graph(&body, format, Some(&base_iri))
                .map_err(|error| GatewayServerError::BadRequest(error.to_string()))?;
            let modification = proxy.set_status(graph).await?;
            Ok(modification_response(modification))
        }
        Method::DELETE => {
            let modification = proxy.delete_resource().await?;
            Ok(modification_response(modification))
        }
        method => Err(GatewayServerError::MethodNotAllowed(method)),
    }
}

async fn forward_to_webservice(
    webservice: Arc<dyn Webservice>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, GatewayServerError> {
    let mut request = http::Request::new(body);
    *request.method_mut() = method;
    *request.uri_mut() = uri;
    *request.headers_mut() = headers;

    let response = webservice.process(request).await?;
    Ok(response.map(Body::from).into_response())
}

fn parse_iri(iri: &str) -> Result<NamedNode, GatewayServerError> {
    NamedNode::new(iri).map_err(|error| {
        GatewayServerError::BadRequest(format!("Invalid IRI '{iri}': {error}"))
    })
}
