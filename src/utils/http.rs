//! HTTP client utilities.

use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;

/// Default overall request timeout. Grounded generation can take a while.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// Default connect timeout
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Shared HTTP client with sensible defaults
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Arc<Client>,
}

impl HttpClient {
    /// Create a new HTTP client with default settings
    pub fn new() -> Self {
        Self::with_timeouts(DEFAULT_TIMEOUT, DEFAULT_CONNECT_TIMEOUT)
    }

    /// Create a new HTTP client with explicit request and connect timeouts
    pub fn with_timeouts(timeout: Duration, connect_timeout: Duration) -> Self {
        let client = Client::builder()
            .user_agent(user_agent())
            .timeout(timeout)
            .connect_timeout(connect_timeout)
            .pool_idle_timeout(Duration::from_secs(90))
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!("Falling back to default HTTP client: {}", e);
                Client::new()
            });

        Self {
            client: Arc::new(client),
        }
    }

    /// Get the underlying client
    pub fn client(&self) -> &Client {
        &self.client
    }
}

impl Default for HttpClient {
    fn default() -> Self {
        Self::new()
    }
}

/// User agent sent with every request
pub fn user_agent() -> &'static str {
    concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_agent_names_crate() {
        assert!(user_agent().starts_with("research-cards/"));
    }

    #[test]
    fn test_clients_share_connection_pool() {
        let client = HttpClient::new();
        let clone = client.clone();
        assert!(std::ptr::eq(client.client(), clone.client()));
    }
}
