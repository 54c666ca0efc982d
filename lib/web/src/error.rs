use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use http::Method;
use ssp_bus::BusError;
use ssp_model::{AccessCode, AccessError, CacheError};
use tracing::warn;

#[derive(thiserror::Error, Debug)]
pub enum GatewayServerError {
    #[error("Bad request: {0}")]
    BadRequest(String),
    #[error("Content Negotiation Failed: {0}")]
    ContentNegotiation(String),
    #[error("Unsupported content type: {0}")]
    UnsupportedContentType(String),
    #[error("404 Not Found: {0}")]
    NotFound(String),
    #[error("Method {0} is not allowed")]
    MethodNotAllowed(Method),
    #[error(transparent)]
    Access(#[from] AccessError),
    #[error(transparent)]
    Cache(#[from] CacheError),
    #[error(transparent)]
    Unavailable(#[from] BusError),
    #[error("Internal server error: {0}")]
    Internal(anyhow::Error),
}

impl GatewayServerError {
    pub fn status(&self) -> StatusCode {
        match self {
            GatewayServerError::BadRequest(_) => StatusCode::BAD_REQUEST,
            GatewayServerError::ContentNegotiation(_) => StatusCode::NOT_ACCEPTABLE,
            GatewayServerError::UnsupportedContentType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            GatewayServerError::NotFound(_) => StatusCode::NOT_FOUND,
            GatewayServerError::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            GatewayServerError::Access(error) => error.http_status(),
            GatewayServerError::Cache(CacheError::Query(_)) => StatusCode::BAD_REQUEST,
            GatewayServerError::Cache(CacheError::Unavailable)
            | GatewayServerError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            GatewayServerError::Cache(CacheError::Storage(_))
            | GatewayServerError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for GatewayServerError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match self {
            GatewayServerError::Access(error) => error.message().to_owned(),
            error => error.to_string(),
        };
        if status.is_server_error() {
            warn!("Request failed with {status}: {message}");
        }

        (status, message).into_response()
    }
}

/// Webservices report failures as [AccessError]s. The code follows the HTTP status of the error.
impl From<GatewayServerError> for AccessError {
    fn from(error: GatewayServerError) -> Self {
        match error {
            GatewayServerError::Access(error) => error,
            error => AccessError::new(AccessCode::from_http_status(error.status()), error.to_string()),
        }
    }
}
