use async_trait::async_trait;
use ssp_model::{AccessError, AccessResult, DataOrigin, Graph, Identifier, Modification};

/// Reads and modifies the state of data origins of one backend.
///
/// Accessors are pure protocol adapters. They do not update the cache themselves, their results are
/// forwarded by the callers. Operations a data origin does not support keep the default
/// implementation, which fails with [AccessCode::NotAllowed](ssp_model::AccessCode::NotAllowed).
#[async_trait]
pub trait Accessor<I: Identifier>: Send + Sync {
    /// Retrieves the current status of the data origin.
    async fn get_status(&self, _origin: &DataOrigin<I>) -> AccessResult {
        Err(AccessError::not_allowed("GET"))
    }

    /// Replaces the status of the data origin with `graph`.
    async fn set_status(
        &self,
        _origin: &DataOrigin<I>,
        _graph: Graph,
    ) -> AccessResult<Modification> {
        Err(AccessError::not_allowed("PUT"))
    }

    /// Deletes the data origin.
    async fn delete_resource(&self, _origin: &DataOrigin<I>) -> AccessResult<Modification> {
        Err(AccessError::not_allowed("DELETE"))
    }
}

/// An [Accessor] that supports no operation at all.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnsupportedAccessor;

impl<I: Identifier> Accessor<I> for UnsupportedAccessor {}
