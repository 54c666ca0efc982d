//! Onboarding and maintenance of data origins.
//!
//! A backend provides an [Accessor] and an [Observer] for its kind of data origin and registers its
//! data origins with a [Registry]. The registry fetches the initial status, has the dispatcher
//! serve the data origin under its proxy URI, and starts the observation.

mod accessor;
pub mod files;
mod observer;
mod proxy;
mod registry;
pub mod virtual_sensor;

pub use accessor::*;
pub use observer::*;
pub use registry::*;
