use http::StatusCode;
use std::fmt::{Display, Formatter};

/// A response code of a constrained origin protocol in `class.detail` notation (e.g. `2.05`).
///
/// Backends report the codes of their data origins with this type so that every backend is mapped
/// to HTTP by the same table (see [ProtocolCode::http_status]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProtocolCode {
    class: u8,
    detail: u8,
}

impl ProtocolCode {
    pub const CREATED: Self = Self::new(2, 1);
    pub const DELETED: Self = Self::new(2, 2);
    pub const VALID: Self = Self::new(2, 3);
    pub const CHANGED: Self = Self::new(2, 4);
    pub const CONTENT: Self = Self::new(2, 5);
    pub const BAD_REQUEST: Self = Self::new(4, 0);
    pub const UNAUTHORIZED: Self = Self::new(4, 1);
    pub const BAD_OPTION: Self = Self::new(4, 2);
    pub const FORBIDDEN: Self = Self::new(4, 3);
    pub const NOT_FOUND: Self = Self::new(4, 4);
    pub const METHOD_NOT_ALLOWED: Self = Self::new(4, 5);
    pub const NOT_ACCEPTABLE: Self = Self::new(4, 6);
    pub const PRECONDITION_FAILED: Self = Self::new(4, 12);
    pub const REQUEST_ENTITY_TOO_LARGE: Self = Self::new(4, 13);
    pub const UNSUPPORTED_CONTENT_FORMAT: Self = Self::new(4, 15);
    pub const INTERNAL_SERVER_ERROR: Self = Self::new(5, 0);
    pub const NOT_IMPLEMENTED: Self = Self::new(5, 1);
    pub const BAD_GATEWAY: Self = Self::new(5, 2);
    pub const SERVICE_UNAVAILABLE: Self = Self::new(5, 3);
    pub const GATEWAY_TIMEOUT: Self = Self::new(5, 4);
    pub const PROXYING_NOT_SUPPORTED: Self = Self::new(5, 5);

    pub const fn new(class: u8, detail: u8) -> Self {
        Self { class, detail }
    }

    /// Decodes the single-byte representation (`ccc ddddd`).
    pub const fn from_byte(value: u8) -> Self {
        Self::new(value >> 5, value & 0x1F)
    }

    pub fn class(self) -> u8 {
        self.class
    }

    pub fn detail(self) -> u8 {
        self.detail
    }

    pub fn is_success(self) -> bool {
        self.class == 2
    }

    /// Maps the code to an HTTP status. Codes without an entry are internal server errors.
    pub fn http_status(self) -> StatusCode {
        match (self.class, self.detail) {
            (2, 1) => StatusCode::CREATED,
            (2, 2 | 4) => StatusCode::NO_CONTENT,
            (2, 3) => StatusCode::NOT_MODIFIED,
            (2, 5) => StatusCode::OK,
            (4, 0 | 2) => StatusCode::BAD_REQUEST,
            (4, 1) => StatusCode::UNAUTHORIZED,
            (4, 3) => StatusCode::FORBIDDEN,
            (4, 4) => StatusCode::NOT_FOUND,
            (4, 5) => StatusCode::METHOD_NOT_ALLOWED,
            (4, 6) => StatusCode::NOT_ACCEPTABLE,
            (4, 12) => StatusCode::PRECONDITION_FAILED,
            (4, 13) => StatusCode::PAYLOAD_TOO_LARGE,
            (4, 15) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            (5, 1) => StatusCode::NOT_IMPLEMENTED,
            (5, 2 | 5) => StatusCode::BAD_GATEWAY,
            (5, 3) => StatusCode::SERVICE_UNAVAILABLE,
            (5, 4) => StatusCode::GATEWAY_TIMEOUT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl Display for ProtocolCode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{:02}", self.class, self.detail)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_codes() {
        assert_eq!(ProtocolCode::CONTENT.http_status(), StatusCode::OK);
        assert_eq!(ProtocolCode::CREATED.http_status(), StatusCode::CREATED);
        assert_eq!(ProtocolCode::CHANGED.http_status(), StatusCode::NO_CONTENT);
        assert_eq!(ProtocolCode::DELETED.http_status(), StatusCode::NO_CONTENT);
        assert_eq!(ProtocolCode::VALID.http_status(), StatusCode::NOT_MODIFIED);
    }

    #[test]
    fn error_codes() {
        assert_eq!(ProtocolCode::BAD_OPTION.http_status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ProtocolCode::PROXYING_NOT_SUPPORTED.http_status(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            ProtocolCode::GATEWAY_TIMEOUT.http_status(),
            StatusCode::GATEWAY_TIMEOUT
        );
    }

    #[test]
    fn unmapped_codes_are_internal_errors() {
        assert_eq!(
            ProtocolCode::new(4, 29).http_status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ProtocolCode::new(7, 0).http_status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn byte_representation() {
        assert_eq!(ProtocolCode::from_byte(0x45), ProtocolCode::CONTENT);
        assert_eq!(ProtocolCode::from_byte(0x84), ProtocolCode::NOT_FOUND);
        assert_eq!(ProtocolCode::NOT_FOUND.to_string(), "4.04");
    }
}
