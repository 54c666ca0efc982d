use crate::error::GatewayServerError;
use axum::http::HeaderMap;
use headers::HeaderMapExt;
use headers_accept::Accept;
use http::header::CONTENT_TYPE;
use mediatype::names::{APPLICATION, CSV, JSON, N3, N_QUADS, N_TRIPLES, TEXT, TRIG, TURTLE, XML};
use mediatype::{MediaType, Name};
use sparesults::QueryResultsFormat;
use ssp_model::io::RdfFormat;

/// The serializations the gateway offers for one kind of response, in order of preference.
///
/// The first offer is used when the request has no usable `Accept` header.
struct Offers<F: 'static> {
    formats: &'static [(MediaType<'static>, F)],
    hint: &'static str,
}

impl<F: Copy + 'static> Offers<F> {
    fn select(&self, headers: &HeaderMap) -> Result<F, GatewayServerError> {
        let Some((_, preferred)) = self.formats.first() else {
            return Err(GatewayServerError::ContentNegotiation(
                "No serialization is available".to_owned(),
            ));
        };
        let Some(accept) = headers.typed_get::<Accept>() else {
            return Ok(*preferred);
        };

        let media_types = self.formats.iter().map(|(media_type, _)| media_type);
        accept
            .negotiate(media_types)
            .and_then(|chosen| {
                self.formats
                    .iter()
                    .find(|(media_type, _)| std::ptr::eq(media_type, chosen))
            })
            .map(|(_, format)| *format)
            .ok_or_else(|| {
                GatewayServerError::ContentNegotiation(format!(
                    "The accept header does not provide any accepted format like {}.",
                    self.hint
                ))
            })
    }
}

static GRAPH_OFFERS: Offers<RdfFormat> = Offers {
    formats: &[
        (MediaType::new(TEXT, TURTLE), RdfFormat::Turtle),
        (MediaType::new(APPLICATION, N_TRIPLES), RdfFormat::NTriples),
        (
            MediaType::new(APPLICATION, Name::new_unchecked("rdf+xml")),
            RdfFormat::RdfXml,
        ),
        (MediaType::new(TEXT, N3), RdfFormat::N3),
        (MediaType::new(APPLICATION, N_QUADS), RdfFormat::NQuads),
        (MediaType::new(APPLICATION, TRIG), RdfFormat::TriG),
    ],
    hint: "text/turtle or application/n-triples",
};

static QUERY_RESULTS_OFFERS: Offers<QueryResultsFormat> = Offers {
    formats: &[
        (
            MediaType::new(APPLICATION, Name::new_unchecked("sparql-results+json")),
            QueryResultsFormat::Json,
        ),
        (MediaType::new(APPLICATION, JSON), QueryResultsFormat::Json),
        (
            MediaType::new(APPLICATION, Name::new_unchecked("sparql-results+xml")),
            QueryResultsFormat::Xml,
        ),
        (MediaType::new(APPLICATION, XML), QueryResultsFormat::Xml),
        (MediaType::new(TEXT, CSV), QueryResultsFormat::Csv),
        (
            MediaType::new(TEXT, Name::new_unchecked("tab-separated-values")),
            QueryResultsFormat::Tsv,
        ),
    ],
    hint: "application/sparql-results+json or text/tab-separated-values",
};

/// Negotiates the serialization of a graph. Turtle is used if the client does not state a
/// preference.
pub fn graph_format(headers: &HeaderMap) -> Result<RdfFormat, GatewayServerError> {
    GRAPH_OFFERS.select(headers)
}

/// Negotiates the serialization of SPARQL query results. SPARQL JSON is used if the client does
/// not state a preference.
pub fn query_results_format(headers: &HeaderMap) -> Result<QueryResultsFormat, GatewayServerError> {
    QUERY_RESULTS_OFFERS.select(headers)
}

/// Determines the format of a request body from its `Content-Type`. Turtle is assumed if the header
/// is missing.
pub fn body_format(headers: &HeaderMap) -> Result<RdfFormat, GatewayServerError> {
    let Some(content_type) = headers.get(CONTENT_TYPE) else {
        return Ok(RdfFormat::Turtle);
    };
    let content_type = content_type
        .to_str()
        .map_err(|error| GatewayServerError::BadRequest(error.to_string()))?;

    RdfFormat::from_media_type(content_type)
        .ok_or_else(|| GatewayServerError::UnsupportedContentType(content_type.to_owned()))
}
