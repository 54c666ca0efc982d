use std::time::Duration;

/// The time a graph is kept in the cache after it has expired.
pub const DEFAULT_GRACE_PERIOD: Duration = Duration::from_secs(10);

/// Holds the configuration of the semantic cache worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheConfig {
    /// The delay between the expiry of a graph and its deletion.
    pub grace_period: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            grace_period: DEFAULT_GRACE_PERIOD,
        }
    }
}
