/// The address the gateway binds to if nothing else is configured.
pub const DEFAULT_BIND: &str = "localhost:7878";

/// Holds the configuration for the HTTP server of the gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// The IP address or DNS name that the socket binds to.
    pub bind: String,
    /// Whether CORS is enabled.
    pub cors: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: DEFAULT_BIND.to_owned(),
            cors: false,
        }
    }
}
