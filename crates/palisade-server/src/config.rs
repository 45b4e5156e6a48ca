//! Worker server configuration.

use std::net::SocketAddr;
use std::time::Duration;

/// Default HTTP bind address.
pub const DEFAULT_HTTP_ADDR: &str = "0.0.0.0:8080";

/// Default shutdown timeout in seconds: how long draining waits for
/// in-flight connections before giving up on them.
pub const DEFAULT_SHUTDOWN_TIMEOUT_SECS: u64 = 30;

/// Worker server configuration.
///
/// # Example
///
/// ```rust
/// use palisade_server::ServerConfig;
/// use std::time::Duration;
///
/// let config = ServerConfig::builder()
///     .http_addr("127.0.0.1:3000")
///     .shutdown_timeout(Duration::from_secs(15))
///     .build();
///
/// assert_eq!(config.http_addr(), "127.0.0.1:3000");
/// ```
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// HTTP bind address (e.g., "0.0.0.0:8080").
    http_addr: String,

    /// How long a drain waits for in-flight connections.
    shutdown_timeout: Duration,
}

impl ServerConfig {
    /// Creates a configuration builder.
    #[must_use]
    pub fn builder() -> ServerConfigBuilder {
        ServerConfigBuilder::default()
    }

    /// Returns the HTTP bind address.
    #[must_use]
    pub fn http_addr(&self) -> &str {
        &self.http_addr
    }

    /// Parses the bind address as a `SocketAddr`.
    ///
    /// # Errors
    ///
    /// Returns an error if the address cannot be parsed.
    pub fn socket_addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        self.http_addr.parse()
    }

    /// Returns the drain timeout.
    #[must_use]
    pub fn shutdown_timeout(&self) -> Duration {
        self.shutdown_timeout
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Builder for [`ServerConfig`].
#[derive(Debug, Clone, Default)]
pub struct ServerConfigBuilder {
    http_addr: Option<String>,
    shutdown_timeout: Option<Duration>,
}

impl ServerConfigBuilder {
    /// Sets the HTTP bind address.
    #[must_use]
    pub fn http_addr(mut self, addr: impl Into<String>) -> Self {
        self.http_addr = Some(addr.into());
        self
    }

    /// Sets the drain timeout.
    #[must_use]
    pub fn shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = Some(timeout);
        self
    }

    /// Builds the configuration, filling in defaults.
    #[must_use]
    pub fn build(self) -> ServerConfig {
        ServerConfig {
            http_addr: self
                .http_addr
                .unwrap_or_else(|| DEFAULT_HTTP_ADDR.to_string()),
            shutdown_timeout: self
                .shutdown_timeout
                .unwrap_or(Duration::from_secs(DEFAULT_SHUTDOWN_TIMEOUT_SECS)),
        }
    }
}
