//! Parsing and serialization of whole graphs.

use oxrdf::{Graph, IriParseError, Triple};
pub use oxrdfio::{RdfFormat, RdfParseError, RdfParser, RdfSerializer};

/// An error that occurred while parsing a graph.
#[derive(Debug, thiserror::Error)]
pub enum GraphParseError {
    #[error(transparent)]
    Syntax(#[from] RdfParseError),
    #[error("Invalid base IRI: {0}")]
    BaseIri(#[from] IriParseError),
}

/// Parses `data` into a [Graph]. Quads of named graphs are merged into the resulting graph.
pub fn parse_graph(
    data: &[u8],
    format: RdfFormat,
    base_iri: Option<&str>,
) -> Result<Graph, GraphParseError> {
    let mut parser = RdfParser::from_format(format);
    if let Some(base_iri) = base_iri {
        parser = parser.with_base_iri(base_iri)?;
    }

    let mut graph = Graph::new();
    for quad in parser.for_slice(data) {
        let quad = quad.map_err(RdfParseError::from)?;
        graph.insert(&Triple::new(quad.subject, quad.predicate, quad.object));
    }
    Ok(graph)
}

/// Serializes `graph` into `format`.
pub fn serialize_graph(graph: &Graph, format: RdfFormat) -> std::io::Result<Vec<u8>> {
    let mut serializer = RdfSerializer::from_format(format).for_writer(Vec::new());
    for triple in graph {
        serializer.serialize_triple(triple)?;
    }
    serializer.finish()
}
