use ssp_model::vocab::rdf;
use ssp_model::{BlankNode, Graph, NamedNode, NamedNodeRef, Term, Triple};

/// The variable of a virtual sensor query that carries the observation value.
pub const VALUE_VARIABLE: &str = "val";

mod ssn {
    use ssp_model::NamedNodeRef;

    pub const OBSERVES: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("http://purl.oclc.org/NET/ssnx/ssn#observes");
    pub const MADE_OBSERVATION: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("http://purl.oclc.org/NET/ssnx/ssn#madeObservation");
    pub const FEATURE_OF_INTEREST: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("http://purl.oclc.org/NET/ssnx/ssn#featureOfInterest");
    pub const OBSERVED_PROPERTY: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("http://purl.oclc.org/NET/ssnx/ssn#observedProperty");
    pub const OBSERVATION_RESULT: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("http://purl.oclc.org/NET/ssnx/ssn#observationResult");
    pub const IS_PRODUCED_BY: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("http://purl.oclc.org/NET/ssnx/ssn#isProducedBy");
    pub const HAS_VALUE: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("http://purl.oclc.org/NET/ssnx/ssn#hasValue");
    pub const OBSERVATION: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("http://purl.oclc.org/NET/ssnx/ssn#Observation");
    pub const SENSOR_OUTPUT: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("http://purl.oclc.org/NET/ssnx/ssn#SensorOutput");
}

/// A sensor whose observations are derived from the cached graphs by a SPARQL query.
///
/// The IRI of the sensor is also the name of the graph it produces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VirtualSensor {
    sensor: NamedNode,
    sensor_type: NamedNode,
    feature_of_interest: NamedNode,
    observed_property: NamedNode,
    query: String,
}

impl VirtualSensor {
    /// Creates a new [VirtualSensor]. The query must bind the observation value to `?val`.
    pub fn new(
        sensor: NamedNode,
        sensor_type: NamedNode,
        feature_of_interest: NamedNode,
        observed_property: NamedNode,
        query: impl Into<String>,
    ) -> Self {
        Self {
            sensor,
            sensor_type,
            feature_of_interest,
            observed_property,
            query: query.into(),
        }
    }

    pub fn sensor(&self) -> NamedNodeRef<'_> {
        self.sensor.as_ref()
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    /// Describes the sensor and, if present, its latest observation.
    pub fn graph(&self, value: Option<&Term>) -> Graph {
        let mut graph = Graph::new();
        graph.insert(&Triple::new(
            self.sensor.clone(),
            rdf::TYPE,
            self.sensor_type.clone(),
        ));
        graph.insert(&Triple::new(
            self.sensor.clone(),
            ssn::OBSERVES,
            self.observed_property.clone(),
        ));

        let Some(value) = value else {
            return graph;
        };

        let observation = BlankNode::default();
        let result = BlankNode::default();
        graph.insert(&Triple::new(
            self.sensor.clone(),
            ssn::MADE_OBSERVATION,
            observation.clone(),
        ));
        graph.insert(&Triple::new(
            observation.clone(),
            rdf::TYPE,
            ssn::OBSERVATION.into_owned(),
        ));
        graph.insert(&Triple::new(
            observation.clone(),
            ssn::FEATURE_OF_INTEREST,
            self.feature_of_interest.clone(),
        ));
        graph.insert(&Triple::new(
            observation.clone(),
            ssn::OBSERVED_PROPERTY,
            self.observed_property.clone(),
        ));
        graph.insert(&Triple::new(
            observation,
            ssn::OBSERVATION_RESULT,
            result.clone(),
        ));
        graph.insert(&Triple::new(
            result.clone(),
            rdf::TYPE,
            ssn::SENSOR_OUTPUT.into_owned(),
        ));
        graph.insert(&Triple::new(
            result.clone(),
            ssn::IS_PRODUCED_BY,
            self.sensor.clone(),
        ));
        graph.insert(&Triple::new(result, ssn::HAS_VALUE, value.clone()));
        graph.insert(&Triple::new(
            self.feature_of_interest.clone(),
            self.observed_property.clone(),
            value.clone(),
        ));
        graph
    }
}
