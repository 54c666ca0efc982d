use super::{VirtualSensor, VirtualSensorsBackend};
use async_trait::async_trait;
use bytes::Bytes;
use http::{header, Method, StatusCode};
use serde::Deserialize;
use ssp_bus::{Webservice, WebserviceRequest, WebserviceResponse};
use ssp_model::{graph_proxy_uri, AccessCode, AccessError, NamedNode, RegistrationError};

/// The URI under which the [VirtualSensorCreator] is served.
pub const CREATION_URI: &str = "/services/virtual-sensor-creation";

/// The JSON body of a creation request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SensorDefinition {
    sensor_name: String,
    sensor_type: String,
    feature_of_interest: String,
    observed_property: String,
    query: String,
}

impl SensorDefinition {
    fn into_sensor(self) -> Result<VirtualSensor, AccessError> {
        Ok(VirtualSensor::new(
            parse_iri("sensorName", self.sensor_name)?,
            parse_iri("sensorType", self.sensor_type)?,
            parse_iri("featureOfInterest", self.feature_of_interest)?,
            parse_iri("observedProperty", self.observed_property)?,
            self.query,
        ))
    }
}

fn parse_iri(field: &str, value: String) -> Result<NamedNode, AccessError> {
    NamedNode::new(value).map_err(|error| {
        AccessError::new(AccessCode::BadRequest, format!("Invalid {field}: {error}"))
    })
}

/// Creates virtual sensors from `POST` requests with a JSON definition.
///
/// A created sensor is answered with `201 Created` and a `Location` header pointing to its proxy
/// URI.
pub struct VirtualSensorCreator {
    backend: VirtualSensorsBackend,
}

impl VirtualSensorCreator {
    pub(super) fn new(backend: VirtualSensorsBackend) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl Webservice for VirtualSensorCreator {
    fn description(&self) -> &str {
        "Creates virtual sensors whose observations are computed by SPARQL queries"
    }

    async fn process(&self, request: WebserviceRequest) -> Result<WebserviceResponse, AccessError> {
        if request.method() != Method::POST {
            return Err(AccessError::not_allowed(request.method().as_str()));
        }

        let definition: SensorDefinition =
            serde_json::from_slice(request.body()).map_err(|error| {
                AccessError::new(
                    AccessCode::BadRequest,
                    format!("Invalid sensor definition: {error}"),
                )
            })?;
        let sensor = definition.into_sensor()?;
        let location = graph_proxy_uri(sensor.sensor());

        match self.backend.create_sensor(sensor).await {
            Ok(()) => {}
            Err(RegistrationError::IdentifierConflict(name)) => {
                return Err(AccessError::new(
                    AccessCode::BadRequest,
                    format!("A virtual sensor named {name} already exists"),
                ))
            }
            Err(RegistrationError::Access(error)) => return Err(error),
            Err(error) => return Err(AccessError::internal(error.to_string())),
        }

        http::Response::builder()
            .status(StatusCode::CREATED)
            .header(header::LOCATION, location)
            .body(Bytes::new())
            .map_err(|error| AccessError::internal(error.to_string()))
    }
}
