//! Moltbot Widgets error types.
//!
//! # Error Classification
//!
//! Gateway RPC failures follow a fixed taxonomy so callers can react to
//! the kind of failure rather than its text:
//!
//! | Variant                  | Raised when                                         |
//! |--------------------------|-----------------------------------------------------|
//! | `InvalidUrl`             | Endpoint cannot form a connectable address          |
//! | `ConnectionFailed`       | Socket could not be opened or broke mid-call        |
//! | `InvalidResponse`        | Message is not a valid envelope or payload          |
//! | `Timeout`                | Deadline or receive-attempt budget exhausted        |
//! | `AuthenticationRequired` | Handshake rejected for pairing/authorization        |
//! | `Api`                    | Any other server-reported failure                   |
//! | `Protocol`               | Wire-format or sequencing violation                 |
//!
//! The remaining variants cover the custom widget side: HTTP fetches, the
//! JSON config store and configuration loading.

use thiserror::Error;

/// Moltbot Widgets errors.
#[derive(Error, Debug)]
pub enum MoltbotError {
    /// Endpoint or widget URL could not be parsed.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Transport-level failure opening or maintaining the connection.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Message could not be parsed as the expected envelope or payload.
    #[error("Invalid response from server: {0}")]
    InvalidResponse(String),

    /// No expected message arrived within the time or attempt bound.
    #[error("Connection timed out")]
    Timeout,

    /// Gateway rejected the handshake because the device is not paired or authorized.
    #[error("Authentication required: {0}")]
    AuthenticationRequired(String),

    /// Server-reported failure, message carried verbatim.
    #[error("{0}")]
    Api(String),

    /// Protocol-level error.
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Widget endpoint returned a non-2xx status.
    #[error("HTTP error: {0}")]
    Http(u16),

    /// Widget endpoint body is not a valid widget response.
    #[error("Invalid JSON: {0}")]
    InvalidJson(String),

    /// Network communication error.
    #[error("Network error: {0}")]
    Network(String),

    /// Widget id or name not present in the store.
    #[error("Widget not found: {0}")]
    WidgetNotFound(String),

    /// A widget with this name already exists.
    #[error("A widget named '{0}' already exists")]
    DuplicateName(String),

    /// Configuration error.
    #[error("Config error: {0}")]
    Config(String),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for Moltbot Widgets operations
pub type Result<T> = std::result::Result<T, MoltbotError>;

impl MoltbotError {
    /// Whether the caller should prompt for a credential instead of showing a generic failure.
    pub fn is_auth_required(&self) -> bool {
        matches!(self, MoltbotError::AuthenticationRequired(_))
    }
}

impl From<reqwest::Error> for MoltbotError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            MoltbotError::Timeout
        } else {
            MoltbotError::Network(err.to_string())
        }
    }
}

impl From<toml::de::Error> for MoltbotError {
    fn from(err: toml::de::Error) -> Self {
        MoltbotError::Config(err.to_string())
    }
}
