#![cfg_attr(docsrs, feature(doc_auto_cfg))]
//! A semantic gateway for the internet of things.
//!
//! Things are onboarded as data origins by a backend's [Registry](backend::Registry). Their state is
//! cached as expiring named graphs, served over HTTP under proxy URIs, and can be queried with
//! SPARQL. A [Gateway] wires the semantic cache, the dispatcher and the built-in webservices
//! together.

mod gateway;

pub use gateway::{CacheKind, Gateway, GatewayConfig, GatewayError};

pub mod model {
    pub use ssp_model::*;
}

pub mod bus {
    pub use ssp_bus::*;
}

pub mod cache {
    pub use ssp_cache::*;
}

pub mod backend {
    pub use ssp_backend::*;
}

pub mod web {
    pub use ssp_web::*;
}
