//! # HTTP Gateway
//!
//! Serves the research backend over HTTP. Routes under `/functions/v1/` keep the
//! names the dashboard already calls; `/api/reports` exposes the report store.
//! Supports token authentication, CORS, and request tracing.

mod auth;
pub mod payloads;
mod server;

pub use auth::GatewayAuth;
pub use server::{ApiError, AppState, router as gateway_router, run as run_gateway};

use serde::{Deserialize, Serialize};

/// Configuration for the HTTP gateway.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host to bind to.
    pub host: String,
    /// Port to listen on.
    pub port: u16,
    /// Valid authentication tokens. Empty means open mode.
    pub auth_tokens: Vec<String>,
    /// Origins allowed by CORS. Empty allows any origin.
    pub allowed_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8787,
            auth_tokens: Vec::new(),
            allowed_origins: Vec::new(),
        }
    }
}

impl ServerConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_config_default() {
        let config = ServerConfig::default();
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 8787);
        assert!(config.auth_tokens.is_empty());
        assert!(config.allowed_origins.is_empty());
        assert_eq!(config.bind_addr(), "127.0.0.1:8787");
    }

    #[test]
    fn test_server_config_serialization() {
        let config = ServerConfig {
            host: "0.0.0.0".into(),
            port: 9090,
            auth_tokens: vec!["token1".into()],
            allowed_origins: vec!["https://app.example".into()],
        };
        let json = serde_json::to_string(&config).unwrap();
        let deserialized: ServerConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized, config);

        let partial: ServerConfig = serde_json::from_str(r#"{"port": 1}"#).unwrap();
        assert_eq!(partial.port, 1);
        assert_eq!(partial.host, "127.0.0.1");
    }
}
