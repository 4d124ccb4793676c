//! # Moltbot Widgets - Gateway Client and Custom Widget Tooling
//!
//! Data layer for desktop dashboard widgets. Two sources feed the widgets:
//!
//! - **The local automation gateway**, spoken to over a WebSocket RPC
//!   protocol (scheduled jobs, health, token spend).
//! - **Custom widgets**, arbitrary HTTP endpoints returning a small JSON
//!   schema, configured through a shared JSON file.
//!
//! ## Gateway Protocol Overview
//!
//! Every gateway operation is one short-lived connection:
//!
//! ```text
//! Client                                   Gateway
//!    |                                        |
//!    |======== WebSocket upgrade ============>|
//!    |<------- event connect.challenge -------|
//!    |-------- req connect (v3, auth) ------->|
//!    |<------- res connect ok ----------------|
//!    |-------- req <method> (params) -------->|
//!    |<------- event ... ---------------------|   (ignored)
//!    |<------- res <method> ok/payload -------|
//!    |======== close ========================>|
//! ```
//!
//! Replies are matched to requests by a fresh UUID per request. Messages
//! with unknown ids and unsolicited events are skipped. Each call is bounded
//! both by an overall deadline and by a budget of inbound messages.
//!
//! ## Quick Start
//!
//! ### Gateway Calls
//!
//! ```rust,ignore
//! use moltbot_widgets::{Config, GatewayClient};
//!
//! let config = Config::load()?;
//! let client = GatewayClient::new(config.gateway.endpoint())
//!     .with_timeout(config.gateway.timeout());
//!
//! let health = client.health(true).await?;
//! println!("ok={} uptime={:?}", health.ok, health.uptime_display());
//!
//! let usage = client.usage_cost(30).await?;
//! println!("{} over {} days", usage.formatted_cost(), usage.days);
//! ```
//!
//! ### Custom Widgets
//!
//! ```rust,ignore
//! use moltbot_widgets::widget::{CustomWidgetConfig, WidgetConfigStore, WidgetFetcher};
//!
//! let store = WidgetConfigStore::default_location()?;
//! let fetcher = WidgetFetcher::new()?;
//!
//! let (_, response) = fetcher.fetch_raw("https://example.com/cpu", None).await?;
//! store.add(CustomWidgetConfig::new("CPU", "https://example.com/cpu"))?;
//! ```
//!
//! ## Modules
//!
//! - [`transport`]: Message transport abstraction and WebSocket implementation
//! - [`protocol`]: Wire messages, correlator and the sans-IO handshake session
//! - [`api`]: Typed gateway operations and result decoders
//! - [`widget`]: Custom widget schema, config store and HTTP fetcher
//! - [`skill`]: Assistant skill installation
//! - [`config`]: Configuration management
//! - [`error`]: Error types and result aliases

pub mod api;
pub mod config;
pub mod error;
pub mod protocol;
pub mod skill;
pub mod transport;
pub mod widget;

// Re-exports for convenience
pub use api::{CronJobList, CronRunHistory, CronStatus, GatewayClient, HealthStatus, UsageCost};
pub use config::Config;
pub use error::{MoltbotError, Result};
pub use protocol::{ClientSession, SessionState};
pub use transport::{Endpoint, MessageTransport, WsConnector};
pub use widget::{CustomWidgetConfig, WidgetAuth, WidgetConfigStore, WidgetFetcher, WidgetResponse};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
