//! Transport layer for the gateway RPC client.
//!
//! A transport owns one message-oriented duplex connection to the gateway
//! and moves whole text messages in both directions. The protocol layer
//! never touches sockets directly; it only sees [`MessageTransport`].
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │           GatewayClient (api)            │
//! │   handshake + call over one transport    │
//! └──────────────────┬──────────────────────┘
//!                    │ Connector::connect(endpoint)
//!                    ▼
//! ┌─────────────────────────────────────────┐
//! │   WsTransport (ws:// or wss://)          │
//! │   send / receive / close                 │
//! └─────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use moltbot_widgets::transport::{Connector, Endpoint, MessageTransport, WsConnector};
//!
//! let endpoint = Endpoint::new("127.0.0.1", 18789);
//! let mut transport = WsConnector.connect(&endpoint).await?;
//! transport.send(r#"{"type":"req"}"#.to_string()).await?;
//! let reply = transport.receive().await?;
//! transport.close().await?;
//! ```

mod endpoint;
mod websocket;

pub use endpoint::Endpoint;
pub use websocket::{WsConnector, WsTransport};

use futures::future::BoxFuture;

use crate::error::Result;

/// URL scheme selected by the endpoint's security flag.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Scheme {
    /// Plaintext WebSocket (default for a local gateway)
    #[default]
    Ws,
    /// WebSocket over TLS
    Wss,
}

impl Scheme {
    /// Select the scheme from a security flag.
    pub fn from_secure(secure: bool) -> Self {
        if secure {
            Self::Wss
        } else {
            Self::Ws
        }
    }

    /// Get the URL scheme name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Ws => "ws",
            Self::Wss => "wss",
        }
    }
}

impl std::fmt::Display for Scheme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// One duplex connection carrying whole text messages.
///
/// `close` must be idempotent: closing an already-closed transport is a
/// no-op that returns `Ok(())`.
pub trait MessageTransport: Send {
    /// Send one text message.
    fn send(&mut self, text: String) -> BoxFuture<'_, Result<()>>;

    /// Wait for the next text message. `Ok(None)` means the peer closed the connection.
    fn receive(&mut self) -> BoxFuture<'_, Result<Option<String>>>;

    /// Close the connection.
    fn close(&mut self) -> BoxFuture<'_, Result<()>>;
}

/// Opens a fresh transport per call.
pub trait Connector: Send + Sync {
    /// Transport produced by this connector.
    type Transport: MessageTransport;

    /// Establish a new connection to the endpoint.
    fn connect<'a>(&'a self, endpoint: &'a Endpoint) -> BoxFuture<'a, Result<Self::Transport>>;
}
