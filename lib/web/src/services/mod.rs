//! Webservices that are registered with every gateway.

mod directory;
mod sparql;

pub use directory::{ServiceDirectory, DIRECTORY_URI};
pub use sparql::{SparqlEndpoint, SPARQL_URI};
