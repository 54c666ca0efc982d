use crate::status_graph;
use async_trait::async_trait;
use ssp::backend::Accessor;
use ssp::model::{
    AccessCode, AccessError, AccessResult, DataOrigin, ExpiringNamedGraph, Graph, Modification,
};
use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, SystemTime};
use tracing::debug;

/// An [Accessor] that simulates a thing with a single numeric value.
///
/// Its latency, failures and the validity of the reported status can be changed while data origins
/// are registered.
#[derive(Default)]
pub struct MockAccessor {
    value: AtomicI64,
    validity: Mutex<Option<Duration>>,
    delay: Mutex<Option<Duration>>,
    failure: Mutex<Option<AccessCode>>,
    reads: AtomicUsize,
    written: Mutex<Option<Graph>>,
    deletions: AtomicUsize,
}

impl MockAccessor {
    pub fn new() -> Self {
        Self::default()
    }

    /// A [MockAccessor] whose status expires `validity` after it has been read.
    pub fn expiring(validity: Duration) -> Self {
        let accessor = Self::default();
        accessor.set_validity(Some(validity));
        accessor
    }

    pub fn set_value(&self, value: i64) {
        self.value.store(value, Ordering::SeqCst);
    }

    pub fn set_validity(&self, validity: Option<Duration>) {
        *lock(&self.validity) = validity;
    }

    /// Makes every following call wait for `delay` before it answers.
    pub fn set_delay(&self, delay: Option<Duration>) {
        *lock(&self.delay) = delay;
    }

    /// Makes every following call fail with `failure`.
    pub fn set_failure(&self, failure: Option<AccessCode>) {
        *lock(&self.failure) = failure;
    }

    /// The number of status reads so far.
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn deletions(&self) -> usize {
        self.deletions.load(Ordering::SeqCst)
    }

    /// The last graph written through [Accessor::set_status].
    pub fn written(&self) -> Option<Graph> {
        lock(&self.written).clone()
    }

    /// The status the thing currently reports.
    pub fn status(&self, origin: &DataOrigin<String>) -> ExpiringNamedGraph {
        let graph_name = origin.graph_name().into_owned();
        let graph = status_graph(&graph_name, self.value.load(Ordering::SeqCst));
        let expiry = lock(&self.validity).map(|validity| SystemTime::now() + validity);
        ExpiringNamedGraph::new(graph_name, graph, expiry)
    }

    async fn simulate_call(&self, origin: &DataOrigin<String>) -> AccessResult<()> {
        let delay = *lock(&self.delay);
        if let Some(delay) = delay {
            debug!("Delaying answer of {origin} by {delay:?}");
            tokio::time::sleep(delay).await;
        }
        match *lock(&self.failure) {
            Some(code) => Err(AccessError::new(code, format!("{origin} failed"))),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl Accessor<String> for MockAccessor {
    async fn get_status(&self, origin: &DataOrigin<String>) -> AccessResult {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.simulate_call(origin).await?;
        Ok(self.status(origin))
    }

    async fn set_status(
        &self,
        origin: &DataOrigin<String>,
        graph: Graph,
    ) -> AccessResult<Modification> {
        self.simulate_call(origin).await?;
        let previous = lock(&self.written).replace(graph);
        Ok(if previous.is_some() {
            Modification::Updated
        } else {
            Modification::Created
        })
    }

    async fn delete_resource(&self, origin: &DataOrigin<String>) -> AccessResult<Modification> {
        self.simulate_call(origin).await?;
        self.deletions.fetch_add(1, Ordering::SeqCst);
        Ok(Modification::Deleted)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
