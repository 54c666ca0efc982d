//! Virtual sensors derive observations from the cached graphs of other data origins.
//!
//! A virtual sensor periodically evaluates its SPARQL query over the cache and publishes the value
//! bound to `?val` as an SSN observation.

mod creator;
mod sensor;

pub use creator::{VirtualSensorCreator, CREATION_URI};
pub use sensor::{VirtualSensor, VALUE_VARIABLE};

use crate::{Accessor, ObservationSink, Observer, Registry, RegistryConfig, WeakRegistry};
use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use ssp_bus::MessageBus;
use ssp_model::{
    AccessCode, AccessError, AccessResult, DataOrigin, ExpiringNamedGraph, Modification,
    NamedNode, RegistrationError,
};
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

/// The name under which the virtual sensors register their data origins.
pub const BACKEND_NAME: &str = "virtual-sensors";

/// Holds the configuration of the [VirtualSensorsBackend].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VirtualSensorsConfig {
    /// The interval in which the sensors re-evaluate their queries.
    pub observation_period: Duration,
}

impl Default for VirtualSensorsConfig {
    fn default() -> Self {
        Self {
            observation_period: Duration::from_secs(60),
        }
    }
}

/// The definitions of all virtual sensors, shared by the accessor and the observer.
struct SensorDefinitions {
    bus: MessageBus,
    sensors: DashMap<NamedNode, Arc<VirtualSensor>>,
}

impl SensorDefinitions {
    /// Evaluates the query of a sensor and builds its current status.
    async fn observe(&self, sensor_name: &NamedNode) -> AccessResult {
        let sensor = self
            .sensors
            .get(sensor_name)
            .map(|sensor| Arc::clone(&sensor))
            .ok_or_else(|| {
                AccessError::new(
                    AccessCode::NotFound,
                    format!("No virtual sensor {sensor_name}"),
                )
            })?;

        let results = self
            .bus
            .query(sensor.query())
            .await
            .map_err(|error| AccessError::internal(error.to_string()))?;
        let value = results.results().values_of(VALUE_VARIABLE).first().copied();
        Ok(ExpiringNamedGraph::never_expiring(
            sensor_name.clone(),
            sensor.graph(value),
        ))
    }
}

/// Registers virtual sensors and keeps their observations up to date.
#[derive(Clone)]
pub struct VirtualSensorsBackend {
    registry: Registry<NamedNode>,
    definitions: Arc<SensorDefinitions>,
}

impl VirtualSensorsBackend {
    /// Creates a new [VirtualSensorsBackend].
    pub fn new(bus: MessageBus, config: VirtualSensorsConfig, registry_config: RegistryConfig) -> Self {
        let definitions = Arc::new(SensorDefinitions {
            bus: bus.clone(),
            sensors: DashMap::new(),
        });
        let accessor = Arc::new(VirtualSensorAccessor {
            definitions: Arc::clone(&definitions),
            registry: OnceLock::new(),
        });
        let observer = Arc::new(VirtualSensorObserver {
            definitions: Arc::clone(&definitions),
            period: config.observation_period,
        });
        let sensor_accessor: Arc<dyn Accessor<NamedNode>> =
            Arc::<VirtualSensorAccessor>::clone(&accessor);
        let registry = Registry::new(
            BACKEND_NAME,
            bus,
            sensor_accessor,
            observer,
            registry_config,
        );
        if accessor.registry.set(registry.downgrade()).is_err() {
            warn!("Virtual sensor accessor was already bound to a registry");
        }

        Self {
            registry,
            definitions,
        }
    }

    pub fn registry(&self) -> &Registry<NamedNode> {
        &self.registry
    }

    /// Registers a new virtual sensor. Its query is evaluated once before the registration
    /// completes.
    ///
    /// The sensor name is claimed before the registration starts. A failed registration only
    /// releases the claim it made itself.
    pub async fn create_sensor(&self, sensor: VirtualSensor) -> Result<(), RegistrationError> {
        let sensor_name = sensor.sensor().into_owned();
        let sensor = Arc::new(sensor);
        match self.definitions.sensors.entry(sensor_name.clone()) {
            Entry::Occupied(_) => {
                return Err(RegistrationError::IdentifierConflict(sensor_name.to_string()));
            }
            Entry::Vacant(entry) => {
                entry.insert(Arc::clone(&sensor));
            }
        }

        let origin = DataOrigin::new(sensor_name.clone(), sensor_name.clone(), true);
        let result = self.registry.register_data_origin(origin).await;
        if let Err(error) = &result {
            debug!("Releasing virtual sensor {sensor_name}: {error}");
            self.definitions
                .sensors
                .remove_if(&sensor_name, |_, claimed| Arc::ptr_eq(claimed, &sensor));
        }
        result
    }

    /// Returns the webservice that creates virtual sensors from JSON definitions.
    pub fn creator(&self) -> VirtualSensorCreator {
        VirtualSensorCreator::new(self.clone())
    }
}

struct VirtualSensorAccessor {
    definitions: Arc<SensorDefinitions>,
    registry: OnceLock<WeakRegistry<NamedNode>>,
}

#[async_trait]
impl Accessor<NamedNode> for VirtualSensorAccessor {
    async fn get_status(&self, origin: &DataOrigin<NamedNode>) -> AccessResult {
        self.definitions.observe(origin.identifier()).await
    }

    async fn delete_resource(&self, origin: &DataOrigin<NamedNode>) -> AccessResult<Modification> {
        let sensor_name = origin.identifier();
        if self.definitions.sensors.remove(sensor_name).is_none() {
            return Err(AccessError::new(
                AccessCode::NotFound,
                format!("No virtual sensor {sensor_name}"),
            ));
        }

        let registry = self.registry.get().and_then(WeakRegistry::upgrade);
        if let Some(registry) = registry {
            registry
                .unregister_data_origin(sensor_name)
                .await
                .map_err(|error| AccessError::internal(error.to_string()))?;
        }
        Ok(Modification::Deleted)
    }
}

struct VirtualSensorObserver {
    definitions: Arc<SensorDefinitions>,
    period: Duration,
}

#[async_trait]
impl Observer<NamedNode> for VirtualSensorObserver {
    async fn start_observation(
        &self,
        origin: DataOrigin<NamedNode>,
        sink: ObservationSink<NamedNode>,
    ) -> Result<(), AccessError> {
        let definitions = Arc::clone(&self.definitions);
        let mut interval = tokio::time::interval(self.period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tokio::spawn(async move {
            // The initial status has just been evaluated by the registration.
            interval.tick().await;
            loop {
                interval.tick().await;
                if !sink.is_active() {
                    debug!("Stopped observing virtual sensor {}", origin.identifier());
                    break;
                }
                match definitions.observe(origin.identifier()).await {
                    Ok(status) => sink.update_cache(status),
                    Err(error) => warn!(
                        "Could not observe virtual sensor {}: {error}",
                        origin.identifier()
                    ),
                }
            }
        });
        Ok(())
    }
}
