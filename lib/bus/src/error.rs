use ssp_model::{CacheError, RegistrationError};
use thiserror::Error;

/// Indicates that the receiving worker of a request has shut down.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
#[error("The {0} is not running")]
pub struct BusError(pub &'static str);

impl From<BusError> for CacheError {
    fn from(_: BusError) -> Self {
        CacheError::Unavailable
    }
}

impl From<BusError> for RegistrationError {
    fn from(value: BusError) -> Self {
        RegistrationError::Unavailable(value.0)
    }
}
