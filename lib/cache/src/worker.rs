use crate::{CacheConfig, SemanticCache};
use ssp_bus::{CacheInbox, CacheRequest, Reply};
use ssp_model::{CacheError, ExpiringNamedGraph, NamedNode, QueryExecutionResults};
use std::collections::HashMap;
use std::time::{Duration, Instant, SystemTime};
use tokio::sync::mpsc;
use tokio::task::{AbortHandle, JoinHandle};
use tracing::{debug, info, warn};

/// The single owner of a [SemanticCache] and of the expiry timers of its graphs.
///
/// The worker processes [CacheRequest]s strictly in arrival order. Every update cancels the
/// pending deletion of the graph and schedules a new one at `expiry + grace period`. Deletion
/// timers carry a generation so that a timer that fires after it has been superseded is ignored.
pub struct CacheWorker<C> {
    cache: C,
    grace_period: Duration,
    entries: HashMap<NamedNode, CacheEntry>,
    next_generation: u64,
    deletions_tx: mpsc::UnboundedSender<DeletionDue>,
    deletions_rx: mpsc::UnboundedReceiver<DeletionDue>,
}

struct CacheEntry {
    expiry: Option<SystemTime>,
    deletion: Option<ScheduledDeletion>,
}

struct ScheduledDeletion {
    generation: u64,
    handle: AbortHandle,
}

struct DeletionDue {
    graph_name: NamedNode,
    generation: u64,
}

impl<C: SemanticCache> CacheWorker<C> {
    /// Creates a new [CacheWorker].
    pub fn new(cache: C, config: CacheConfig) -> Self {
        let (deletions_tx, deletions_rx) = mpsc::unbounded_channel();
        Self {
            cache,
            grace_period: config.grace_period,
            entries: HashMap::new(),
            next_generation: 0,
            deletions_tx,
            deletions_rx,
        }
    }

    /// Spawns the worker. It stops once every sender of `inbox` has been dropped.
    pub fn spawn(self, inbox: CacheInbox) -> JoinHandle<()> {
        tokio::spawn(self.run(inbox))
    }

    async fn run(mut self, mut inbox: CacheInbox) {
        debug!("Semantic cache started");
        loop {
            tokio::select! {
                request = inbox.recv() => match request {
                    Some(request) => self.handle(request),
                    None => break,
                },
                Some(due) = self.deletions_rx.recv() => self.delete_if_due(&due),
            }
        }

        for entry in self.entries.values() {
            if let Some(deletion) = &entry.deletion {
                deletion.handle.abort();
            }
        }
        debug!("Semantic cache stopped");
    }

    fn handle(&mut self, request: CacheRequest) {
        match request {
            CacheRequest::Contains { graph_name, reply } => {
                respond(reply, self.cache.contains_named_graph(graph_name.as_ref()));
            }
            CacheRequest::Get { graph_name, reply } => {
                respond(reply, self.get(graph_name));
            }
            CacheRequest::Update { graph, reply } => {
                respond(reply, self.update(graph));
            }
            CacheRequest::Delete { graph_name, reply } => {
                respond(reply, self.delete(&graph_name));
            }
            CacheRequest::Query { query, reply } => {
                respond(reply, self.query(&query));
            }
            CacheRequest::Resource { resource, reply } => {
                let result = self
                    .cache
                    .resource_graph(resource.as_ref())
                    .map(|graph| ExpiringNamedGraph::expiring_now(resource, graph));
                respond(reply, result);
            }
            CacheRequest::GraphNames { reply } => {
                respond(reply, self.cache.graph_names());
            }
        }
    }

    fn get(&self, graph_name: NamedNode) -> Result<Option<ExpiringNamedGraph>, CacheError> {
        let expiry = self.entries.get(&graph_name).and_then(|entry| entry.expiry);
        Ok(self
            .cache
            .get_named_graph(graph_name.as_ref())?
            .map(|graph| ExpiringNamedGraph::new(graph_name, graph, expiry)))
    }

    fn update(&mut self, graph: ExpiringNamedGraph) -> Result<(), CacheError> {
        let (graph_name, graph, expiry) = graph.into_parts();
        self.cache
            .put_named_graph_to_cache(graph_name.as_ref(), &graph)?;

        self.cancel_deletion(&graph_name);
        let deletion = expiry.map(|expiry| self.schedule_deletion(graph_name.clone(), expiry));
        match expiry {
            Some(expiry) => debug!(
                "Cached graph {graph_name} ({} triples) until {:?}",
                graph.len(),
                expiry
            ),
            None => debug!(
                "Cached graph {graph_name} ({} triples) without expiry",
                graph.len()
            ),
        }
        self.entries
            .insert(graph_name, CacheEntry { expiry, deletion });
        Ok(())
    }

    fn delete(&mut self, graph_name: &NamedNode) -> Result<(), CacheError> {
        self.cache.delete_named_graph(graph_name.as_ref())?;
        self.cancel_deletion(graph_name);
        self.entries.remove(graph_name);
        debug!("Removed graph {graph_name} from cache");
        Ok(())
    }

    fn query(&self, query: &str) -> Result<QueryExecutionResults, CacheError> {
        let start = Instant::now();
        let results = self.cache.process_sparql_query(query)?;
        let duration = start.elapsed();
        debug!("Query executed in {} ms", duration.as_millis());
        Ok(QueryExecutionResults::new(results, duration))
    }

    fn schedule_deletion(&mut self, graph_name: NamedNode, expiry: SystemTime) -> ScheduledDeletion {
        let delay = expiry
            .duration_since(SystemTime::now())
            .unwrap_or_default()
            + self.grace_period;
        self.next_generation += 1;
        let generation = self.next_generation;

        let deletions = self.deletions_tx.clone();
        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if deletions
                .send(DeletionDue {
                    graph_name,
                    generation,
                })
                .is_err()
            {
                debug!("Semantic cache stopped before a scheduled deletion");
            }
        });

        ScheduledDeletion {
            generation,
            handle: task.abort_handle(),
        }
    }

    fn cancel_deletion(&mut self, graph_name: &NamedNode) {
        let deletion = self
            .entries
            .get_mut(graph_name)
            .and_then(|entry| entry.deletion.take());
        if let Some(deletion) = deletion {
            deletion.handle.abort();
        }
    }

    fn delete_if_due(&mut self, due: &DeletionDue) {
        let current = self
            .entries
            .get(&due.graph_name)
            .and_then(|entry| entry.deletion.as_ref())
            .map(|deletion| deletion.generation);
        if current != Some(due.generation) {
            debug!("Ignoring superseded deletion of graph {}", due.graph_name);
            return;
        }

        match self.delete(&due.graph_name) {
            Ok(()) => info!("Graph {} expired and was removed", due.graph_name),
            Err(error) => warn!("Could not remove expired graph {}: {error}", due.graph_name),
        }
    }
}

fn respond<T>(reply: Reply<T>, value: T) {
    if reply.send(value).is_err() {
        debug!("Requester of a cache operation went away");
    }
}
