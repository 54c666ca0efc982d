use crate::{ExpiringNamedGraph, ProtocolCode};
use http::StatusCode;
use std::fmt::{Display, Formatter};

/// The result of an operation on a data origin.
pub type AccessResult<T = ExpiringNamedGraph> = Result<T, AccessError>;

/// The closed set of failure reasons an accessor may report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccessCode {
    BadRequest,
    Unauthorized,
    Forbidden,
    NotFound,
    /// The data origin does not support the requested operation.
    NotAllowed,
    NotAcceptable,
    PreconditionFailed,
    PayloadTooLarge,
    UnsupportedContentFormat,
    Internal,
    NotImplemented,
    /// The data origin answered with something the gateway could not make sense of.
    BadGateway,
    ServiceUnavailable,
    /// The data origin did not answer in time.
    Timeout,
}

impl AccessCode {
    /// The HTTP status that is reported to clients for this code.
    pub fn http_status(self) -> StatusCode {
        match self {
            AccessCode::BadRequest => StatusCode::BAD_REQUEST,
            AccessCode::Unauthorized => StatusCode::UNAUTHORIZED,
            AccessCode::Forbidden => StatusCode::FORBIDDEN,
            AccessCode::NotFound => StatusCode::NOT_FOUND,
            AccessCode::NotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            AccessCode::NotAcceptable => StatusCode::NOT_ACCEPTABLE,
            AccessCode::PreconditionFailed => StatusCode::PRECONDITION_FAILED,
            AccessCode::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            AccessCode::UnsupportedContentFormat => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            AccessCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
            AccessCode::NotImplemented => StatusCode::NOT_IMPLEMENTED,
            AccessCode::BadGateway => StatusCode::BAD_GATEWAY,
            AccessCode::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            AccessCode::Timeout => StatusCode::GATEWAY_TIMEOUT,
        }
    }

    /// Classifies an HTTP error status. Statuses without a dedicated code are internal errors.
    pub fn from_http_status(status: StatusCode) -> Self {
        match status {
            StatusCode::BAD_REQUEST => AccessCode::BadRequest,
            StatusCode::UNAUTHORIZED => AccessCode::Unauthorized,
            StatusCode::FORBIDDEN => AccessCode::Forbidden,
            StatusCode::NOT_FOUND => AccessCode::NotFound,
            StatusCode::METHOD_NOT_ALLOWED => AccessCode::NotAllowed,
            StatusCode::NOT_ACCEPTABLE => AccessCode::NotAcceptable,
            StatusCode::PRECONDITION_FAILED => AccessCode::PreconditionFailed,
            StatusCode::PAYLOAD_TOO_LARGE => AccessCode::PayloadTooLarge,
            StatusCode::UNSUPPORTED_MEDIA_TYPE => AccessCode::UnsupportedContentFormat,
            StatusCode::NOT_IMPLEMENTED => AccessCode::NotImplemented,
            StatusCode::BAD_GATEWAY => AccessCode::BadGateway,
            StatusCode::SERVICE_UNAVAILABLE => AccessCode::ServiceUnavailable,
            StatusCode::GATEWAY_TIMEOUT => AccessCode::Timeout,
            _ => AccessCode::Internal,
        }
    }
}

/// A failed operation on a data origin.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{code:?}: {message}")]
pub struct AccessError {
    code: AccessCode,
    message: String,
}

impl AccessError {
    /// Creates a new [AccessError].
    pub fn new(code: AccessCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Creates the error that is returned for operations a data origin does not support.
    pub fn not_allowed(operation: &str) -> Self {
        Self::new(
            AccessCode::NotAllowed,
            format!("Data origin does not support {operation} requests."),
        )
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(AccessCode::Timeout, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(AccessCode::Internal, message)
    }

    pub fn bad_gateway(message: impl Into<String>) -> Self {
        Self::new(AccessCode::BadGateway, message)
    }

    /// Creates an error from a non-success response code of an origin protocol.
    pub fn from_protocol_code(code: ProtocolCode, message: impl Into<String>) -> Self {
        Self::new(AccessCode::from_http_status(code.http_status()), message)
    }

    pub fn code(&self) -> AccessCode {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn http_status(&self) -> StatusCode {
        self.code.http_status()
    }
}

/// The outcome of a successful modification of a data origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Modification {
    Created,
    Updated,
    Deleted,
}

impl Modification {
    pub fn http_status(self) -> StatusCode {
        match self {
            Modification::Created => StatusCode::CREATED,
            Modification::Updated | Modification::Deleted => StatusCode::NO_CONTENT,
        }
    }
}

impl Display for Modification {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            Modification::Created => "CREATED",
            Modification::Updated => "UPDATED",
            Modification::Deleted => "DELETED",
        };
        f.write_str(text)
    }
}
