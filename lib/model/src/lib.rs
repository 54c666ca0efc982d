mod access;
mod data_origin;
mod error;
mod graph;
pub mod io;
mod query;
mod status;

pub use access::*;
pub use data_origin::*;
pub use error::*;
pub use graph::*;
pub use query::*;
pub use status::*;

// Re-export some oxrdf types.
pub use oxrdf::{
    BlankNode, BlankNodeRef, Graph, GraphName, GraphNameRef, IriParseError, Literal, LiteralRef,
    NamedNode, NamedNodeRef, NamedOrBlankNode, NamedOrBlankNodeRef, Quad, QuadRef, Subject,
    SubjectRef, Term, TermRef, Triple, TripleRef, Variable, VariableRef,
};
pub use oxrdf::vocab;
