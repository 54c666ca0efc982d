use ssp_bus::{
    DeregistrationRequest, MessageBus, ProxyService, RefreshRequest, RegistrationRequest, Reply,
    Route, RouteDescription, RouteInbox, RouteKind, RouteRequest, Webservice,
};
use ssp_model::{graph_proxy_uri, CacheError, ExpiringNamedGraph, NamedNode, RegistrationError};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// The single owner of the route table.
///
/// A data origin's route is reserved when its registration arrives and only becomes visible once
/// the initial status has been cached. If the reservation is canceled in the meantime, the cached
/// status is removed again, so a graph is never left in the cache without a route.
pub struct Dispatcher {
    bus: MessageBus,
    routes: BTreeMap<String, RouteEntry>,
    next_reservation: u64,
    activations_tx: mpsc::UnboundedSender<Activation>,
    activations_rx: mpsc::UnboundedReceiver<Activation>,
}

enum RouteEntry {
    /// The initial status of the data origin is being cached.
    Reserved {
        reservation: u64,
        proxy: Arc<dyn ProxyService>,
    },
    Active(Route),
}

impl RouteEntry {
    fn registered_by(&self) -> String {
        match self {
            RouteEntry::Reserved { proxy, .. } | RouteEntry::Active(Route::DataOrigin(proxy)) => {
                format!("{} ({})", proxy.origin_identifier(), proxy.backend_name())
            }
            RouteEntry::Active(Route::Webservice(service)) => service.description().to_owned(),
        }
    }
}

/// The outcome of caching the initial status of a reserved route.
struct Activation {
    uri: String,
    reservation: u64,
    graph_name: NamedNode,
    result: Result<(), CacheError>,
    reply: Reply<Result<(), RegistrationError>>,
}

impl Dispatcher {
    /// Creates a new [Dispatcher] that uses `bus` to reach the semantic cache.
    pub fn new(bus: MessageBus) -> Self {
        let (activations_tx, activations_rx) = mpsc::unbounded_channel();
        Self {
            bus,
            routes: BTreeMap::new(),
            next_reservation: 0,
            activations_tx,
            activations_rx,
        }
    }

    pub fn spawn(self, inbox: RouteInbox) -> JoinHandle<()> {
        tokio::spawn(self.run(inbox))
    }

    async fn run(mut self, mut inbox: RouteInbox) {
        debug!("Dispatcher started");
        loop {
            tokio::select! {
                request = inbox.recv() => match request {
                    Some(request) => self.handle(request).await,
                    None => break,
                },
                Some(activation) = self.activations_rx.recv() => self.activate(activation).await,
            }
        }
        debug!("Dispatcher stopped");
    }

    async fn handle(&mut self, request: RouteRequest) {
        match request {
            RouteRequest::Registration(request) => self.reserve(request),
            RouteRequest::Deregistration(request) => self.deregister(request).await,
            RouteRequest::Refresh(request) => self.refresh(request).await,
            RouteRequest::RegisterWebservice {
                uri,
                webservice,
                reply,
            } => {
                let registered = self.register_webservice(uri, webservice);
                respond(reply, registered);
            }
            RouteRequest::UnregisterWebservice { uri, reply } => {
                let removed = matches!(
                    self.routes.get(&uri),
                    Some(RouteEntry::Active(Route::Webservice(_)))
                );
                if removed {
                    self.routes.remove(&uri);
                    info!("Unregistered webservice {uri}");
                }
                respond(reply, removed);
            }
            RouteRequest::Lookup { uri, reply } => {
                let route = match self.routes.get(&uri) {
                    Some(RouteEntry::Active(route)) => Some(route.clone()),
                    _ => None,
                };
                respond(reply, route);
            }
            RouteRequest::Routes { reply } => {
                respond(reply, self.describe_routes());
            }
        }
    }

    /// Reserves the proxy URI and caches the initial status in the background.
    fn reserve(&mut self, request: RegistrationRequest) {
        let RegistrationRequest {
            proxy,
            initial_status,
            reply,
        } = request;
        let graph_name = proxy.graph_name().into_owned();
        let uri = graph_proxy_uri(graph_name.as_ref());

        if let Some(existing) = self.routes.get(&uri) {
            let error = RegistrationError::GraphNameConflict {
                graph_name,
                registered_by: existing.registered_by(),
            };
            debug!("Rejected registration: {error}");
            respond(reply, Err(error));
            return;
        }

        let reservation = self.next_reservation;
        self.next_reservation += 1;
        self.routes
            .insert(uri.clone(), RouteEntry::Reserved { reservation, proxy });

        let bus = self.bus.clone();
        let activations = self.activations_tx.clone();
        tokio::spawn(async move {
            let result = bus.update_cache(initial_status).await;
            let activation = Activation {
                uri,
                reservation,
                graph_name,
                result,
                reply,
            };
            if activations.send(activation).is_err() {
                debug!("Dispatcher stopped before a registration completed");
            }
        });
    }

    /// Activates a reserved route once its initial status is cached.
    ///
    /// A status whose reservation is gone is removed from the cache unless another data origin
    /// holds the URI by now. The removal is awaited, so it reaches the cache before the status of
    /// any later registration of the graph.
    async fn activate(&mut self, activation: Activation) {
        let Activation {
            uri,
            reservation,
            graph_name,
            result,
            reply,
        } = activation;

        let reserved = matches!(
            self.routes.get(&uri),
            Some(RouteEntry::Reserved { reservation: current, .. }) if *current == reservation
        );

        if let Err(error) = result {
            if reserved {
                self.routes.remove(&uri);
            }
            warn!("Could not cache the initial status of {graph_name}: {error}");
            self.discard_unrouted(&uri, &graph_name).await;
            respond(reply, Err(error.into()));
            return;
        }

        if !reserved {
            warn!("Registration of {graph_name} was canceled, removing its cached status");
            self.discard_unrouted(&uri, &graph_name).await;
            respond(
                reply,
                Err(RegistrationError::Aborted(format!(
                    "The registration of {graph_name} was canceled"
                ))),
            );
            return;
        }

        if let Some(RouteEntry::Reserved { proxy, .. }) = self.routes.remove(&uri) {
            self.routes
                .insert(uri.clone(), RouteEntry::Active(Route::DataOrigin(proxy)));
        }
        info!("Registered route {uri}");
        if reply.send(Ok(())).is_err() {
            debug!("Registration of {graph_name} completed after its caller left");
        }
    }

    /// Removes the graph from the cache, then its route. Deregistering an unknown graph succeeds.
    async fn deregister(&mut self, request: DeregistrationRequest) {
        let DeregistrationRequest { graph_name, reply } = request;
        let uri = graph_proxy_uri(graph_name.as_ref());

        if let Err(error) = self.bus.delete_from_cache(graph_name.clone()).await {
            warn!("Could not remove {graph_name} from the cache: {error}");
            respond(reply, Err(error.into()));
            return;
        }

        match self.routes.get(&uri) {
            Some(RouteEntry::Active(Route::Webservice(_))) => {}
            Some(_) => {
                self.routes.remove(&uri);
                info!("Removed route {uri}");
            }
            None => debug!("No route to remove for {graph_name}"),
        }
        respond(reply, Ok(()));
    }

    /// Caches a status read through a proxy, unless the proxy does not serve its graph anymore.
    async fn refresh(&self, request: RefreshRequest) {
        let RefreshRequest {
            proxy,
            status,
            reply,
        } = request;
        let uri = graph_proxy_uri(proxy.graph_name());

        let served = matches!(
            self.routes.get(&uri),
            Some(RouteEntry::Active(Route::DataOrigin(current)))
                if std::ptr::addr_eq(Arc::as_ptr(current), Arc::as_ptr(&proxy))
        );
        if !served {
            debug!("Discarding status of {uri}, the data origin is not served anymore");
            respond(reply, Ok(false));
            return;
        }

        let (_, graph, expiry) = status.into_parts();
        let status = ExpiringNamedGraph::new(proxy.graph_name().into_owned(), graph, expiry);
        let result = self.bus.update_cache(status).await.map(|()| true);
        respond(reply, result);
    }

    /// Removes a graph from the cache if no route refers to it.
    async fn discard_unrouted(&self, uri: &str, graph_name: &NamedNode) {
        if self.routes.contains_key(uri) {
            debug!("Keeping cached status of {graph_name}, {uri} has been claimed again");
            return;
        }
        if let Err(error) = self.bus.delete_from_cache(graph_name.clone()).await {
            warn!("Could not roll back the cached status of {graph_name}: {error}");
        }
    }

    fn register_webservice(&mut self, uri: String, webservice: Arc<dyn Webservice>) -> bool {
        if let Some(existing) = self.routes.get(&uri) {
            debug!(
                "Webservice {uri} is already served by {}",
                existing.registered_by()
            );
            return false;
        }
        info!("Registered webservice {uri}: {}", webservice.description());
        self.routes
            .insert(uri, RouteEntry::Active(Route::Webservice(webservice)));
        true
    }

    fn describe_routes(&self) -> Vec<RouteDescription> {
        self.routes
            .iter()
            .filter_map(|(uri, entry)| {
                let kind = match entry {
                    RouteEntry::Reserved { .. } => return None,
                    RouteEntry::Active(Route::DataOrigin(_)) => RouteKind::DataOrigin,
                    RouteEntry::Active(Route::Webservice(_)) => RouteKind::Webservice,
                };
                Some(RouteDescription {
                    uri: uri.clone(),
                    kind,
                    description: entry.registered_by(),
                })
            })
            .collect()
    }
}

fn respond<T>(reply: Reply<T>, value: T) {
    if reply.send(value).is_err() {
        debug!("Requester of a route operation went away");
    }
}
