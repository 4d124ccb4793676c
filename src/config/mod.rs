//! Configuration management.
//!
//! Supports configuration from:
//! - TOML config files
//! - Environment variables
//! - CLI arguments (gateway overrides)
//!
//! When no gateway token is configured anywhere, the token written by the
//! gateway itself to `~/.clawdbot/clawdbot.json` (`gateway.auth.token`) is
//! used.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{MoltbotError, Result};
use crate::protocol::{DEFAULT_TIMEOUT_SECS, MAX_RECEIVE_ATTEMPTS};
use crate::transport::Endpoint;

/// Gateway-written config holding the fallback token, relative to home
const GATEWAY_CONFIG_FILE: &str = ".clawdbot/clawdbot.json";

/// Main configuration struct
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Gateway connection settings
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Custom widget settings
    #[serde(default)]
    pub widgets: WidgetsConfig,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let content = std::fs::read_to_string(&path)
            .map_err(|e| MoltbotError::Config(format!("Failed to read config file: {e}")))?;

        toml::from_str(&content)
            .map_err(|e| MoltbotError::Config(format!("Failed to parse config: {e}")))
    }

    /// Default config file location
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("moltbot-widgets").join("config.toml"))
    }

    /// Load the default config file if present, then apply environment overrides
    pub fn load() -> Result<Self> {
        let base = match Self::default_path() {
            Some(path) if path.exists() => {
                tracing::debug!("Loading config from {}", path.display());
                Self::from_file(path)?
            },
            _ => Self::default(),
        };
        Ok(base.apply_env())
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self::default().apply_env()
    }

    /// Apply `MOLTBOT_*` environment overrides on top of this config
    pub fn apply_env(mut self) -> Self {
        if let Ok(host) = std::env::var("MOLTBOT_HOST") {
            self.gateway.host = host;
        }
        if let Ok(port) = std::env::var("MOLTBOT_PORT") {
            match port.parse() {
                Ok(port) => self.gateway.port = port,
                Err(_) => tracing::warn!("Ignoring invalid MOLTBOT_PORT: {}", port),
            }
        }
        if let Ok(token) = std::env::var("MOLTBOT_TOKEN") {
            self.gateway.token = Some(token);
        }
        if let Ok(secure) = std::env::var("MOLTBOT_SECURE") {
            self.gateway.secure = matches!(secure.to_lowercase().as_str(), "1" | "true" | "yes");
        }
        if let Ok(path) = std::env::var("MOLTBOT_WIDGETS_FILE") {
            self.widgets.store_path = Some(PathBuf::from(path));
        }

        self
    }
}

/// Gateway connection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Gateway host
    pub host: String,

    /// Gateway port
    pub port: u16,

    /// Bearer token (falls back to the gateway's own config file)
    pub token: Option<String>,

    /// Use TLS
    pub secure: bool,

    /// Overall deadline per call in seconds
    pub timeout_secs: u64,

    /// Inbound messages consulted per call before giving up
    pub max_attempts: u32,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 18789,
            token: None,
            secure: false,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            max_attempts: MAX_RECEIVE_ATTEMPTS,
        }
    }
}

impl GatewayConfig {
    /// Per-call deadline
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Configured token if non-empty, else the gateway's own token
    pub fn resolve_token(&self) -> Option<String> {
        match self.token.as_deref() {
            Some(token) if !token.is_empty() => Some(token.to_string()),
            _ => dirs::home_dir().and_then(|home| read_gateway_token(&home.join(GATEWAY_CONFIG_FILE))),
        }
    }

    /// Build the connection endpoint
    pub fn endpoint(&self) -> Endpoint {
        Endpoint::new(self.host.clone(), self.port)
            .with_token(self.resolve_token())
            .with_secure(self.secure)
    }
}

/// Read `gateway.auth.token` from the gateway's JSON config.
pub fn read_gateway_token(path: &Path) -> Option<String> {
    let content = std::fs::read_to_string(path).ok()?;
    let json: Value = serde_json::from_str(&content).ok()?;
    json.pointer("/gateway/auth/token")
        .and_then(Value::as_str)
        .filter(|token| !token.is_empty())
        .map(str::to_string)
}

/// Custom widget configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WidgetsConfig {
    /// Widget config file (platform default when unset)
    pub store_path: Option<PathBuf>,

    /// HTTP timeout for widget fetches in seconds
    pub fetch_timeout_secs: u64,
}

impl Default for WidgetsConfig {
    fn default() -> Self {
        Self {
            store_path: None,
            fetch_timeout_secs: 30,
        }
    }
}

impl WidgetsConfig {
    /// HTTP timeout for widget fetches
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }
}
