use async_trait::async_trait;
use ssp::backend::{ObservationSink, Observer};
use ssp::model::{AccessError, DataOrigin};
use std::sync::{Mutex, PoisonError};

/// An [Observer] that hands the sinks of observed data origins to the test.
///
/// Scenarios push updates through [RecordingObserver::sink] to play the role of a thing that
/// notifies the gateway.
#[derive(Default)]
pub struct RecordingObserver {
    sinks: Mutex<Vec<ObservationSink<String>>>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    /// The most recent sink of the data origin with `identifier`.
    pub fn sink(&self, identifier: &str) -> Option<ObservationSink<String>> {
        self.sinks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .rev()
            .find(|sink| sink.origin().identifier() == identifier)
            .cloned()
    }

    pub fn observed(&self) -> usize {
        self.sinks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

#[async_trait]
impl Observer<String> for RecordingObserver {
    async fn start_observation(
        &self,
        _origin: DataOrigin<String>,
        sink: ObservationSink<String>,
    ) -> Result<(), AccessError> {
        self.sinks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(sink);
        Ok(())
    }
}
