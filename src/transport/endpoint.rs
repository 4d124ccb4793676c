//! Gateway connection endpoint.

use http::Uri;

use super::Scheme;
use crate::error::{MoltbotError, Result};

/// Where and how to reach the gateway for a single call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    /// Gateway host name or address
    pub host: String,
    /// Gateway port
    pub port: u16,
    /// Optional bearer credential
    pub token: Option<String>,
    /// Use TLS (`wss://`)
    pub secure: bool,
}

impl Endpoint {
    /// Create a plaintext endpoint without credential.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            token: None,
            secure: false,
        }
    }

    /// Set the bearer credential.
    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token;
        self
    }

    /// Enable or disable TLS.
    pub fn with_secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    /// Scheme derived from the security flag.
    pub fn scheme(&self) -> Scheme {
        Scheme::from_secure(self.secure)
    }

    /// Credential if present and non-empty.
    pub fn credential(&self) -> Option<&str> {
        self.token.as_deref().filter(|t| !t.is_empty())
    }

    /// Build and validate the connection URL.
    pub fn url(&self) -> Result<String> {
        let host = self.host.trim();
        if host.is_empty() {
            return Err(MoltbotError::InvalidUrl("empty host".to_string()));
        }

        let url = format!("{}://{}:{}", self.scheme(), host, self.port);
        let uri: Uri = url
            .parse()
            .map_err(|e| MoltbotError::InvalidUrl(format!("{url}: {e}")))?;

        if uri.host().is_none() {
            return Err(MoltbotError::InvalidUrl(url));
        }

        Ok(url)
    }
}

impl Default for Endpoint {
    fn default() -> Self {
        Self::new("127.0.0.1", 18789)
    }
}
