use crate::error::GatewayServerError;
use async_trait::async_trait;
use bytes::Bytes;
use http::header::CONTENT_TYPE;
use http::{Method, StatusCode};
use serde::Serialize;
use ssp_bus::{MessageBus, RouteKind, Webservice, WebserviceRequest, WebserviceResponse};
use ssp_model::AccessError;

/// The URI under which the [ServiceDirectory] is served.
pub const DIRECTORY_URI: &str = "/services/directory";

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Directory {
    services: Vec<DirectoryEntry>,
    cached_graphs: Vec<String>,
}

#[derive(Serialize)]
struct DirectoryEntry {
    uri: String,
    kind: &'static str,
    description: String,
}

/// Lists the registered data origins and webservices as JSON.
pub struct ServiceDirectory {
    bus: MessageBus,
}

impl ServiceDirectory {
    pub fn new(bus: MessageBus) -> Self {
        Self { bus }
    }

    async fn directory(&self) -> Result<Directory, GatewayServerError> {
        let services = self
            .bus
            .routes()
            .await?
            .into_iter()
            .map(|route| DirectoryEntry {
                uri: route.uri,
                kind: match route.kind {
                    RouteKind::DataOrigin => "dataOrigin",
                    RouteKind::Webservice => "webservice",
                },
                description: route.description,
            })
            .collect();
        let cached_graphs = self
            .bus
            .cached_graph_names()
            .await?
            .into_iter()
            .map(|graph_name| graph_name.into_string())
            .collect();

        Ok(Directory {
            services,
            cached_graphs,
        })
    }
}

#[async_trait]
impl Webservice for ServiceDirectory {
    fn description(&self) -> &str {
        "Lists all registered services"
    }

    async fn process(&self, request: WebserviceRequest) -> Result<WebserviceResponse, AccessError> {
        if request.method() != Method::GET {
            return Err(GatewayServerError::MethodNotAllowed(request.method().clone()).into());
        }

        let directory = self.directory().await?;
        let body = serde_json::to_vec(&directory)
            .map_err(|error| GatewayServerError::Internal(error.into()))?;
        http::Response::builder()
            .status(StatusCode::OK)
            .header(CONTENT_TYPE, "application/json")
            .body(Bytes::from(body))
            .map_err(|error| GatewayServerError::Internal(error.into()).into())
    }
}
