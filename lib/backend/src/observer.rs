use crate::registry::RegistryInner;
use async_trait::async_trait;
use ssp_bus::MessageBus;
use ssp_model::{
    split_by_named_subjects, AccessError, CacheError, DataOrigin, ExpiringNamedGraph, Graph,
    Identifier,
};
use std::sync::Weak;
use std::time::SystemTime;
use tracing::{debug, warn};

/// Maintains push-style subscriptions to observable data origins.
///
/// [Observer::start_observation] is called once a data origin has been registered. Implementations
/// spawn whatever they need to follow the data origin and report every change through the
/// [ObservationSink]. A failure to start is logged but does not undo the registration.
#[async_trait]
pub trait Observer<I: Identifier>: Send + Sync {
    async fn start_observation(
        &self,
        origin: DataOrigin<I>,
        sink: ObservationSink<I>,
    ) -> Result<(), AccessError>;
}

/// An [Observer] for backends whose data origins cannot be observed.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoObservation;

#[async_trait]
impl<I: Identifier> Observer<I> for NoObservation {
    async fn start_observation(
        &self,
        origin: DataOrigin<I>,
        _sink: ObservationSink<I>,
    ) -> Result<(), AccessError> {
        debug!("Data origin {origin} is not observed");
        Ok(())
    }
}

/// The channel through which an [Observer] reports the changes of one data origin.
#[derive(Clone)]
pub struct ObservationSink<I: Identifier> {
    registry: Weak<RegistryInner<I>>,
    bus: MessageBus,
    origin: DataOrigin<I>,
}

impl<I: Identifier> ObservationSink<I> {
    pub(crate) fn new(registry: Weak<RegistryInner<I>>, bus: MessageBus, origin: DataOrigin<I>) -> Self {
        Self {
            registry,
            bus,
            origin,
        }
    }

    pub fn origin(&self) -> &DataOrigin<I> {
        &self.origin
    }

    /// Returns whether the observed data origin is still registered. Observers stop once this
    /// returns `false`.
    pub fn is_active(&self) -> bool {
        self.registry
            .upgrade()
            .is_some_and(|registry| registry.is_registered(&self.origin))
    }

    /// Submits a new status without waiting for the cache. Failures are logged.
    pub fn update_cache(&self, graph: ExpiringNamedGraph) {
        let bus = self.bus.clone();
        tokio::spawn(async move {
            let graph_name = graph.graph_name().into_owned();
            if let Err(error) = bus.update_cache(graph).await {
                warn!("Could not cache observed status of {graph_name}: {error}");
            }
        });
    }

    /// Submits a new status and waits until the cache has applied it.
    pub async fn push(&self, graph: ExpiringNamedGraph) -> Result<(), CacheError> {
        self.bus.update_cache(graph).await
    }

    /// Submits one cache update per IRI subject of `graph`. Each sub-graph is named after its
    /// subject.
    pub fn update_cache_by_subject(&self, graph: &Graph, expiry: Option<SystemTime>) {
        for (subject, sub_graph) in split_by_named_subjects(graph) {
            self.update_cache(ExpiringNamedGraph::new(subject, sub_graph, expiry));
        }
    }

    /// Reports that the data origin cannot be observed anymore. The data origin is unregistered.
    pub fn observation_failed(&self, reason: &str) {
        warn!("Observation of {} failed: {reason}", self.origin);
        let Some(registry) = self.registry.upgrade() else {
            return;
        };
        let identifier = self.origin.identifier().clone();
        tokio::spawn(async move {
            if let Err(error) = registry.unregister(&identifier).await {
                debug!("Could not unregister {identifier} after failed observation: {error}");
            }
        });
    }
}
