use super::accessor::read_graph;
use super::{modified, RdfFile};
use crate::{ObservationSink, Observer};
use async_trait::async_trait;
use ssp_model::{AccessCode, AccessError, DataOrigin, ExpiringNamedGraph};
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

/// Observes a file by polling its modification time.
///
/// A changed file is re-read and pushed to the cache. A file that vanished breaks the observation,
/// which unregisters the data origin.
#[derive(Debug, Clone, Copy)]
pub struct RdfFileObserver {
    poll_interval: Duration,
}

impl RdfFileObserver {
    pub fn new(poll_interval: Duration) -> Self {
        Self { poll_interval }
    }
}

#[async_trait]
impl Observer<RdfFile> for RdfFileObserver {
    async fn start_observation(
        &self,
        origin: DataOrigin<RdfFile>,
        sink: ObservationSink<RdfFile>,
    ) -> Result<(), AccessError> {
        let path = origin.identifier().path().to_owned();
        let mut last_modified = modified(&path).await.ok_or_else(|| {
            AccessError::new(AccessCode::NotFound, format!("{} vanished", path.display()))
        })?;

        let mut interval = tokio::time::interval(self.poll_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::spawn(async move {
            // The first tick completes immediately.
            interval.tick().await;
            loop {
                interval.tick().await;
                if !sink.is_active() {
                    debug!("Stopped observing {}", path.display());
                    break;
                }

                let Some(current) = modified(&path).await else {
                    sink.observation_failed("the file was removed");
                    break;
                };
                if current == last_modified {
                    continue;
                }
                last_modified = current;

                match read_graph(sink.origin()).await {
                    Ok(graph) => {
                        debug!("{} changed", path.display());
                        let graph_name = sink.origin().graph_name().into_owned();
                        sink.update_cache(ExpiringNamedGraph::never_expiring(graph_name, graph));
                    }
                    Err(error) => warn!("Ignoring change of {}: {error}", path.display()),
                }
            }
        });
        Ok(())
    }
}
