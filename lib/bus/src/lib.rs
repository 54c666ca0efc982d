//! The internal message bus of the gateway.
//!
//! The semantic cache and the dispatcher are single-owner workers. Every other component talks to
//! them by sending the typed requests of this crate through a [MessageBus] and awaiting the reply.
//! This keeps the registries, the cache, and the dispatcher independent of each other's concrete
//! types.

mod bus;
mod error;
mod message;
mod service;

pub use bus::*;
pub use error::*;
pub use message::*;
pub use service::*;
