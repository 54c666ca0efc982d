use crate::registry::RegistryInner;
use async_trait::async_trait;
use ssp_bus::ProxyService;
use ssp_model::{
    AccessCode, AccessError, AccessResult, DataOrigin, Graph, Identifier, Modification,
    NamedNodeRef,
};
use std::sync::{Arc, Weak};

/// Exposes one registered data origin to the dispatcher.
///
/// All calls go through the accessor of the registry and are subject to its timeout.
pub(crate) struct DataOriginProxy<I: Identifier> {
    registry: Weak<RegistryInner<I>>,
    backend_name: String,
    origin: DataOrigin<I>,
}

impl<I: Identifier> DataOriginProxy<I> {
    pub(crate) fn new(registry: &Arc<RegistryInner<I>>, origin: DataOrigin<I>) -> Self {
        Self {
            registry: Arc::downgrade(registry),
            backend_name: registry.backend_name().to_owned(),
            origin,
        }
    }

    fn registry(&self) -> AccessResult<Arc<RegistryInner<I>>> {
        self.registry.upgrade().ok_or_else(|| {
            AccessError::new(
                AccessCode::ServiceUnavailable,
                format!("Backend '{}' has been shut down", self.backend_name),
            )
        })
    }
}

#[async_trait]
impl<I: Identifier> ProxyService for DataOriginProxy<I> {
    fn backend_name(&self) -> &str {
        &self.backend_name
    }

    fn origin_identifier(&self) -> String {
        self.origin.identifier().to_string()
    }

    fn graph_name(&self) -> NamedNodeRef<'_> {
        self.origin.graph_name()
    }

    async fn get_status(&self) -> AccessResult {
        let registry = self.registry()?;
        let accessor = registry.accessor();
        registry
            .call_accessor(&self.origin, "GET", accessor.get_status(&self.origin))
            .await
    }

    async fn set_status(&self, graph: Graph) -> AccessResult<Modification> {
        let registry = self.registry()?;
        let accessor = registry.accessor();
        registry
            .call_accessor(&self.origin, "PUT", accessor.set_status(&self.origin, graph))
            .await
    }

    async fn delete_resource(&self) -> AccessResult<Modification> {
        let registry = self.registry()?;
        let accessor = registry.accessor();
        registry
            .call_accessor(&self.origin, "DELETE", accessor.delete_resource(&self.origin))
            .await
    }
}
