mod config;
mod dummy;
mod memory;
mod semantic_cache;
mod worker;

pub use config::*;
pub use dummy::DummySemanticCache;
pub use memory::MemorySemanticCache;
pub use semantic_cache::SemanticCache;
pub use worker::CacheWorker;
