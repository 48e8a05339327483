//! Gateway authentication.

use super::ServerConfig;
use axum::http::HeaderMap;

/// Token-based authentication for HTTP requests.
#[derive(Debug, Clone)]
pub struct GatewayAuth {
    valid_tokens: Vec<String>,
}

impl GatewayAuth {
    /// Create a new auth validator from the server config.
    pub fn from_config(config: &ServerConfig) -> Self {
        Self::new(config.auth_tokens.clone())
    }

    pub fn new(tokens: Vec<String>) -> Self {
        Self {
            valid_tokens: tokens.into_iter().filter(|t| !t.is_empty()).collect(),
        }
    }

    /// Validate a token. If no tokens are configured, all tokens are accepted (open mode).
    pub fn validate(&self, token: &str) -> bool {
        if self.valid_tokens.is_empty() {
            return true;
        }
        self.valid_tokens.iter().any(|t| t == token)
    }

    /// Validate the credentials carried by a request: `Authorization: Bearer <token>`
    /// or an `apikey` header.
    pub fn validate_headers(&self, headers: &HeaderMap) -> bool {
        if self.is_open_mode() {
            return true;
        }
        let bearer = headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(str::trim);
        let api_key = headers
            .get("apikey")
            .and_then(|v| v.to_str().ok())
            .map(str::trim);
        [bearer, api_key]
            .into_iter()
            .flatten()
            .any(|token| self.validate(token))
    }

    pub fn token_count(&self) -> usize {
        self.valid_tokens.len()
    }

    /// Whether the gateway is in open mode (no auth required).
    pub fn is_open_mode(&self) -> bool {
        self.valid_tokens.is_empty()
    }
}
