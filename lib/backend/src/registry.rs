use crate::proxy::DataOriginProxy;
use crate::{Accessor, ObservationSink, Observer};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use ssp_bus::MessageBus;
use ssp_model::{
    AccessError, AccessResult, DataOrigin, ExpiringNamedGraph, Identifier, RegistrationError,
};
use std::future::Future;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tracing::{debug, info, warn};

/// The time an accessor may take before the data origin is considered unreachable.
pub const DEFAULT_ACCESSOR_TIMEOUT: Duration = Duration::from_secs(5);

/// Holds the configuration of a [Registry].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegistryConfig {
    /// Upper bound for every accessor call. A data origin that does not answer in time is
    /// unregistered.
    pub accessor_timeout: Duration,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            accessor_timeout: DEFAULT_ACCESSOR_TIMEOUT,
        }
    }
}

/// The lifecycle of a registration.
///
/// Failed and unregistered data origins are removed from the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegistrationState {
    New,
    FetchingInitialStatus,
    InsertingIntoCache,
    RouteRegistered,
    Observing,
    Unregistering,
}

impl RegistrationState {
    /// Whether the data origin is completely registered.
    pub fn is_registered(self) -> bool {
        matches!(
            self,
            RegistrationState::RouteRegistered | RegistrationState::Observing
        )
    }
}

/// Onboards and offboards the data origins of one backend.
///
/// At most one data origin is registered per identifier. A registration claims the identifier
/// before any other step, so concurrent attempts for the same identifier are rejected instead of
/// interleaved. Cloning a [Registry] yields another handle to the same registrations.
pub struct Registry<I: Identifier> {
    inner: Arc<RegistryInner<I>>,
}

impl<I: Identifier> Clone for Registry<I> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

/// A handle to a [Registry] that does not keep it alive.
pub struct WeakRegistry<I: Identifier> {
    inner: Weak<RegistryInner<I>>,
}

impl<I: Identifier> Clone for WeakRegistry<I> {
    fn clone(&self) -> Self {
        Self {
            inner: Weak::clone(&self.inner),
        }
    }
}

impl<I: Identifier> WeakRegistry<I> {
    pub fn upgrade(&self) -> Option<Registry<I>> {
        self.inner.upgrade().map(|inner| Registry { inner })
    }
}

pub(crate) struct RegistryInner<I: Identifier> {
    backend_name: String,
    bus: MessageBus,
    accessor: Arc<dyn Accessor<I>>,
    observer: Arc<dyn Observer<I>>,
    config: RegistryConfig,
    registrations: DashMap<I, Registration<I>>,
}

struct Registration<I> {
    origin: DataOrigin<I>,
    state: RegistrationState,
}

impl<I: Identifier> Registry<I> {
    /// Creates a new [Registry].
    pub fn new(
        backend_name: impl Into<String>,
        bus: MessageBus,
        accessor: Arc<dyn Accessor<I>>,
        observer: Arc<dyn Observer<I>>,
        config: RegistryConfig,
    ) -> Self {
        let inner = RegistryInner {
            backend_name: backend_name.into(),
            bus,
            accessor,
            observer,
            config,
            registrations: DashMap::new(),
        };
        Self {
            inner: Arc::new(inner),
        }
    }

    pub fn backend_name(&self) -> &str {
        self.inner.backend_name()
    }

    pub fn downgrade(&self) -> WeakRegistry<I> {
        WeakRegistry {
            inner: Arc::downgrade(&self.inner),
        }
    }

    pub fn bus(&self) -> &MessageBus {
        &self.inner.bus
    }

    /// Registers a data origin, retrieving its initial status through the accessor.
    ///
    /// Registering the same data origin twice is a no-op.
    pub async fn register_data_origin(
        &self,
        origin: DataOrigin<I>,
    ) -> Result<(), RegistrationError> {
        self.inner.register(origin, None).await
    }

    /// Registers a data origin whose initial status is already known.
    pub async fn register_data_origin_with_status(
        &self,
        origin: DataOrigin<I>,
        initial_status: ExpiringNamedGraph,
    ) -> Result<(), RegistrationError> {
        self.inner.register(origin, Some(initial_status)).await
    }

    /// Removes a data origin from the cache and stops serving it.
    pub async fn unregister_data_origin(&self, identifier: &I) -> Result<(), RegistrationError> {
        self.inner.unregister(identifier).await
    }

    /// Replaces a registered data origin, e.g. after a device changed its address.
    ///
    /// A missing old data origin is not an error.
    pub async fn replace_data_origin(
        &self,
        old_identifier: &I,
        new_origin: DataOrigin<I>,
    ) -> Result<(), RegistrationError> {
        match self.inner.unregister(old_identifier).await {
            Ok(()) | Err(RegistrationError::NotFound(_)) => {}
            Err(error) => return Err(error),
        }
        self.inner.register(new_origin, None).await
    }

    /// Returns the data origin registered (or being registered) under `identifier`.
    pub fn data_origin(&self, identifier: &I) -> Option<DataOrigin<I>> {
        self.inner
            .registrations
            .get(identifier)
            .map(|registration| registration.origin.clone())
    }

    /// Returns all completely registered data origins.
    pub fn data_origins(&self) -> Vec<DataOrigin<I>> {
        self.inner
            .registrations
            .iter()
            .filter(|registration| registration.state.is_registered())
            .map(|registration| registration.origin.clone())
            .collect()
    }

    pub fn state(&self, identifier: &I) -> Option<RegistrationState> {
        self.inner
            .registrations
            .get(identifier)
            .map(|registration| registration.state)
    }
}

impl<I: Identifier> RegistryInner<I> {
    pub(crate) fn backend_name(&self) -> &str {
        &self.backend_name
    }

    pub(crate) fn accessor(&self) -> Arc<dyn Accessor<I>> {
        Arc::clone(&self.accessor)
    }

    pub(crate) fn is_registered(&self, origin: &DataOrigin<I>) -> bool {
        self.registrations
            .get(origin.identifier())
            .is_some_and(|registration| {
                registration.state.is_registered() && registration.origin == *origin
            })
    }

    async fn register(
        self: &Arc<Self>,
        origin: DataOrigin<I>,
        initial_status: Option<ExpiringNamedGraph>,
    ) -> Result<(), RegistrationError> {
        if !self.claim(&origin)? {
            debug!("Data origin {origin} is already registered");
            return Ok(());
        }

        info!("Registering data origin {origin} ({})", self.backend_name);
        match self.onboard(&origin, initial_status).await {
            Ok(()) => {
                info!("Registered data origin {origin}");
                Ok(())
            }
            Err(error) => {
                self.registrations.remove(origin.identifier());
                warn!("Could not register data origin {origin}: {error}");
                Err(error)
            }
        }
    }

    /// Reserves the identifier. Returns `false` if the data origin is already registered.
    fn claim(&self, origin: &DataOrigin<I>) -> Result<bool, RegistrationError> {
        match self.registrations.entry(origin.identifier().clone()) {
            Entry::Vacant(entry) => {
                entry.insert(Registration {
                    origin: origin.clone(),
                    state: RegistrationState::New,
                });
                Ok(true)
            }
            Entry::Occupied(entry) => {
                let registration = entry.get();
                if registration.state.is_registered() && registration.origin == *origin {
                    Ok(false)
                } else {
                    Err(RegistrationError::IdentifierConflict(
                        origin.identifier().to_string(),
                    ))
                }
            }
        }
    }

    async fn onboard(
        self: &Arc<Self>,
        origin: &DataOrigin<I>,
        initial_status: Option<ExpiringNamedGraph>,
    ) -> Result<(), RegistrationError> {
        let initial_status = match initial_status {
            Some(initial_status) => initial_status,
            None => {
                self.set_state(origin, RegistrationState::FetchingInitialStatus);
                self.call_accessor(origin, "GET", self.accessor.get_status(origin))
                    .await?
            }
        };

        // The route and the cache entry must refer to the same graph.
        let (_, graph, expiry) = initial_status.into_parts();
        let initial_status =
            ExpiringNamedGraph::new(origin.graph_name().into_owned(), graph, expiry);

        self.set_state(origin, RegistrationState::InsertingIntoCache);
        let proxy = Arc::new(DataOriginProxy::new(self, origin.clone()));
        self.bus.register_data_origin(proxy, initial_status).await?;
        self.set_state(origin, RegistrationState::RouteRegistered);

        if origin.is_observable() {
            let sink = ObservationSink::new(Arc::downgrade(self), self.bus.clone(), origin.clone());
            match self.observer.start_observation(origin.clone(), sink).await {
                Ok(()) => self.set_state(origin, RegistrationState::Observing),
                Err(error) => warn!("Could not start observation of {origin}: {error}"),
            }
        }
        Ok(())
    }

    pub(crate) async fn unregister(&self, identifier: &I) -> Result<(), RegistrationError> {
        let (origin, previous_state) = {
            let Some(mut registration) = self.registrations.get_mut(identifier) else {
                return Err(RegistrationError::NotFound(identifier.to_string()));
            };
            if !registration.state.is_registered() {
                return Err(RegistrationError::IdentifierConflict(identifier.to_string()));
            }
            let previous_state = registration.state;
            registration.state = RegistrationState::Unregistering;
            (registration.origin.clone(), previous_state)
        };

        info!("Unregistering data origin {origin}");
        match self
            .bus
            .deregister_data_origin(origin.graph_name().into_owned())
            .await
        {
            Ok(()) => {
                self.registrations.remove(identifier);
                info!("Unregistered data origin {origin}");
                Ok(())
            }
            Err(error) => {
                if let Some(mut registration) = self.registrations.get_mut(identifier) {
                    registration.state = previous_state;
                }
                warn!("Could not unregister data origin {origin}: {error}");
                Err(error)
            }
        }
    }

    /// Runs an accessor call under the accessor timeout.
    ///
    /// A registered data origin that times out is unregistered before the error is returned.
    pub(crate) async fn call_accessor<T>(
        &self,
        origin: &DataOrigin<I>,
        operation: &str,
        call: impl Future<Output = AccessResult<T>>,
    ) -> AccessResult<T> {
        let timeout = self.config.accessor_timeout;
        if let Ok(result) = tokio::time::timeout(timeout, call).await {
            return result;
        }

        warn!("{operation} on data origin {origin} timed out after {timeout:?}");
        if self.is_registered(origin) {
            if let Err(error) = self.unregister(origin.identifier()).await {
                debug!("Could not unregister unresponsive data origin {origin}: {error}");
            }
        }
        Err(AccessError::timeout(format!(
            "Data origin {origin} did not answer within {timeout:?}"
        )))
    }

    fn set_state(&self, origin: &DataOrigin<I>, state: RegistrationState) {
        if let Some(mut registration) = self.registrations.get_mut(origin.identifier()) {
            registration.state = state;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::start_gateway;
    use crate::NoObservation;
    use async_trait::async_trait;
    use ssp_bus::Route;
    use ssp_model::{graph_proxy_uri, AccessCode, Graph, Literal, NamedNode, Triple};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    fn iri(name: &str) -> NamedNode {
        NamedNode::new(format!("http://example.com/{name}")).unwrap()
    }

    fn origin(identifier: &str, graph: &str) -> DataOrigin<String> {
        DataOrigin::new(identifier.to_owned(), iri(graph), false)
    }

    #[derive(Default)]
    struct CountingAccessor {
        calls: AtomicUsize,
        delay: Option<Duration>,
        failure: Option<AccessCode>,
    }

    #[async_trait]
    impl Accessor<String> for CountingAccessor {
        async fn get_status(&self, origin: &DataOrigin<String>) -> AccessResult {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            if let Some(code) = self.failure {
                return Err(AccessError::new(code, "unreachable"));
            }
            let mut graph = Graph::new();
            graph.insert(&Triple::new(iri("s"), iri("p"), Literal::from(1)));
            Ok(ExpiringNamedGraph::never_expiring(
                origin.graph_name().into_owned(),
                graph,
            ))
        }
    }

    #[derive(Default)]
    struct RecordingObserver {
        sinks: Mutex<Vec<ObservationSink<String>>>,
        fail: bool,
    }

    #[async_trait]
    impl Observer<String> for RecordingObserver {
        async fn start_observation(
            &self,
            _origin: DataOrigin<String>,
            sink: ObservationSink<String>,
        ) -> Result<(), AccessError> {
            if self.fail {
                return Err(AccessError::internal("cannot observe"));
            }
            self.sinks.lock().unwrap().push(sink);
            Ok(())
        }
    }

    fn registry(
        bus: MessageBus,
        accessor: Arc<CountingAccessor>,
        observer: Arc<RecordingObserver>,
    ) -> Registry<String> {
        Registry::new("test", bus, accessor, observer, RegistryConfig::default())
    }

    #[tokio::test]
    async fn registration_caches_initial_status() {
        let bus = start_gateway();
        let registry = registry(bus.clone(), Arc::default(), Arc::default());

        registry.register_data_origin(origin("a", "g1")).await.unwrap();

        let cached = bus.get_named_graph(iri("g1")).await.unwrap().unwrap();
        assert_eq!(cached.graph().len(), 1);
        assert_eq!(
            registry.state(&"a".to_owned()),
            Some(RegistrationState::RouteRegistered)
        );
        assert!(bus
            .lookup_route(graph_proxy_uri(iri("g1").as_ref()))
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn registering_twice_is_a_no_op() {
        let bus = start_gateway();
        let accessor = Arc::new(CountingAccessor::default());
        let registry = registry(bus, Arc::clone(&accessor), Arc::default());

        registry.register_data_origin(origin("a", "g1")).await.unwrap();
        registry.register_data_origin(origin("a", "g1")).await.unwrap();

        assert_eq!(accessor.calls.load(Ordering::SeqCst), 1);
        assert_eq!(registry.data_origins().len(), 1);
    }

    #[tokio::test]
    async fn identifier_with_other_graph_conflicts() {
        let bus = start_gateway();
        let registry = registry(bus, Arc::default(), Arc::default());
        registry.register_data_origin(origin("a", "g1")).await.unwrap();

        let result = registry.register_data_origin(origin("a", "g2")).await;

        assert!(matches!(result, Err(RegistrationError::IdentifierConflict(_))));
    }

    #[tokio::test]
    async fn graph_served_by_other_origin_conflicts() {
        let bus = start_gateway();
        let registry = registry(bus, Arc::default(), Arc::default());
        registry.register_data_origin(origin("a", "g1")).await.unwrap();

        let result = registry.register_data_origin(origin("b", "g1")).await;

        assert!(matches!(result, Err(RegistrationError::GraphNameConflict { .. })));
        assert!(registry.state(&"b".to_owned()).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_registration_is_rejected() {
        let bus = start_gateway();
        let accessor = Arc::new(CountingAccessor {
            delay: Some(Duration::from_secs(1)),
            ..CountingAccessor::default()
        });
        let registry = registry(bus, Arc::clone(&accessor), Arc::default());

        let first = tokio::spawn({
            let registry = registry.clone();
            async move { registry.register_data_origin(origin("a", "g1")).await }
        });
        tokio::task::yield_now().await;
        let second = registry.register_data_origin(origin("a", "g1")).await;

        assert!(matches!(second, Err(RegistrationError::IdentifierConflict(_))));
        first.await.unwrap().unwrap();
        assert_eq!(accessor.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failed_access_releases_identifier() {
        let bus = start_gateway();
        let accessor = Arc::new(CountingAccessor {
            failure: Some(AccessCode::NotFound),
            ..CountingAccessor::default()
        });
        let registry = registry(bus.clone(), Arc::clone(&accessor), Arc::default());

        let result = registry.register_data_origin(origin("a", "g1")).await;

        assert!(matches!(result, Err(RegistrationError::Access(_))));
        assert!(registry.state(&"a".to_owned()).is_none());
        assert!(!bus.contains_named_graph(iri("g1")).await.unwrap());
        assert!(registry.register_data_origin(origin("a", "g1")).await.is_err());
        assert_eq!(accessor.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn unregistration_removes_graph_and_route() {
        let bus = start_gateway();
        let registry = registry(bus.clone(), Arc::default(), Arc::default());
        registry.register_data_origin(origin("a", "g1")).await.unwrap();

        registry.unregister_data_origin(&"a".to_owned()).await.unwrap();

        assert!(!bus.contains_named_graph(iri("g1")).await.unwrap());
        assert!(bus
            .lookup_route(graph_proxy_uri(iri("g1").as_ref()))
            .await
            .unwrap()
            .is_none());
        assert!(matches!(
            registry.unregister_data_origin(&"a".to_owned()).await,
            Err(RegistrationError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn initial_status_can_be_provided() {
        let bus = start_gateway();
        let accessor = Arc::new(CountingAccessor::default());
        let registry = registry(bus.clone(), Arc::clone(&accessor), Arc::default());
        let status = ExpiringNamedGraph::never_expiring(iri("ignored"), Graph::new());

        registry
            .register_data_origin_with_status(origin("a", "g1"), status)
            .await
            .unwrap();

        assert_eq!(accessor.calls.load(Ordering::SeqCst), 0);
        assert!(bus.contains_named_graph(iri("g1")).await.unwrap());
        assert!(!bus.contains_named_graph(iri("ignored")).await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn unresponsive_origin_is_unregistered() {
        let bus = start_gateway();
        let registry = registry(bus.clone(), Arc::default(), Arc::default());
        registry.register_data_origin(origin("a", "g1")).await.unwrap();
        let Some(Route::DataOrigin(proxy)) = bus
            .lookup_route(graph_proxy_uri(iri("g1").as_ref()))
            .await
            .unwrap()
        else {
            panic!("expected a data origin route");
        };

        let slow = Registry::new(
            "slow",
            bus.clone(),
            Arc::new(CountingAccessor {
                delay: Some(Duration::from_secs(60)),
                ..CountingAccessor::default()
            }),
            Arc::new(NoObservation),
            RegistryConfig::default(),
        );
        slow.register_data_origin_with_status(
            origin("b", "g2"),
            ExpiringNamedGraph::never_expiring(iri("g2"), Graph::new()),
        )
        .await
        .unwrap();
        let Some(Route::DataOrigin(slow_proxy)) = bus
            .lookup_route(graph_proxy_uri(iri("g2").as_ref()))
            .await
            .unwrap()
        else {
            panic!("expected a data origin route");
        };

        let error = slow_proxy.get_status().await.unwrap_err();

        assert_eq!(error.code(), AccessCode::Timeout);
        assert!(slow.data_origins().is_empty());
        assert!(!bus.contains_named_graph(iri("g2")).await.unwrap());
        // The responsive data origin is unaffected.
        assert!(proxy.get_status().await.is_ok());
    }

    #[tokio::test]
    async fn failing_observer_keeps_registration() {
        let bus = start_gateway();
        let observer = Arc::new(RecordingObserver {
            fail: true,
            ..RecordingObserver::default()
        });
        let registry = registry(bus, Arc::default(), observer);
        let observable = DataOrigin::new("a".to_owned(), iri("g1"), true);

        registry.register_data_origin(observable).await.unwrap();

        assert_eq!(
            registry.state(&"a".to_owned()),
            Some(RegistrationState::RouteRegistered)
        );
    }

    #[tokio::test]
    async fn sink_reports_changes_and_failures() {
        let bus = start_gateway();
        let observer = Arc::new(RecordingObserver::default());
        let registry = registry(bus.clone(), Arc::default(), Arc::clone(&observer));
        let observable = DataOrigin::new("a".to_owned(), iri("g1"), true);
        registry.register_data_origin(observable).await.unwrap();
        assert_eq!(
            registry.state(&"a".to_owned()),
            Some(RegistrationState::Observing)
        );
        let sink = observer.sinks.lock().unwrap()[0].clone();
        assert!(sink.is_active());

        sink.push(ExpiringNamedGraph::never_expiring(iri("g1"), Graph::new()))
            .await
            .unwrap();
        assert!(bus
            .get_named_graph(iri("g1"))
            .await
            .unwrap()
            .unwrap()
            .graph()
            .is_empty());

        sink.observation_failed("connection lost");
        while registry.state(&"a".to_owned()).is_some() {
            tokio::task::yield_now().await;
        }
        assert!(!sink.is_active());
        assert!(!bus.contains_named_graph(iri("g1")).await.unwrap());
    }

    #[tokio::test]
    async fn replacing_moves_the_registration() {
        let bus = start_gateway();
        let registry = registry(bus.clone(), Arc::default(), Arc::default());
        registry.register_data_origin(origin("a", "g1")).await.unwrap();

        registry
            .replace_data_origin(&"a".to_owned(), origin("b", "g2"))
            .await
            .unwrap();
        registry
            .replace_data_origin(&"unknown".to_owned(), origin("c", "g3"))
            .await
            .unwrap();

        assert!(registry.data_origin(&"a".to_owned()).is_none());
        assert!(!bus.contains_named_graph(iri("g1")).await.unwrap());
        assert!(bus.contains_named_graph(iri("g2")).await.unwrap());
        assert!(bus.contains_named_graph(iri("g3")).await.unwrap());
    }
}
