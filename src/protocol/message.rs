//! Wire messages for the gateway protocol.
//!
//! Outbound traffic is always a `req` envelope; inbound traffic is either
//! a server-pushed `event` or a `res` answering an earlier request.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{ClientInfo, CONNECT_METHOD, PROTOCOL_VERSION};
use crate::error::{MoltbotError, Result};

/// Loosely-typed request parameters
pub type Params = Map<String, Value>;

/// Outbound request envelope
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    /// Always `"req"`
    #[serde(rename = "type")]
    pub kind: RequestKind,
    /// Call id echoed back in the response
    pub id: String,
    /// Method name
    pub method: String,
    /// Method parameters
    pub params: Params,
}

/// Marker for the `"type": "req"` discriminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RequestKind {
    /// Request
    #[default]
    #[serde(rename = "req")]
    Req,
}

impl Request {
    /// Create a request envelope.
    pub fn new(id: impl Into<String>, method: impl Into<String>, params: Params) -> Self {
        Self {
            kind: RequestKind::Req,
            id: id.into(),
            method: method.into(),
            params,
        }
    }

    /// Serialize to JSON text.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self)
            .map_err(|e| MoltbotError::InvalidResponse(format!("cannot encode request: {e}")))
    }
}

/// Parameters of the `connect` request.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectParams {
    /// Lowest protocol version accepted
    pub min_protocol: u32,
    /// Highest protocol version accepted
    pub max_protocol: u32,
    /// Client descriptor
    pub client: ClientInfo,
    /// Client capabilities (none advertised)
    pub caps: Vec<String>,
    /// Requested role
    pub role: String,
    /// Requested scopes
    pub scopes: Vec<String>,
    /// Credential, only present when non-empty
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth: Option<ConnectAuth>,
}

/// Credential block of the connect request.
#[derive(Debug, Clone, Serialize)]
pub struct ConnectAuth {
    /// Bearer token
    pub token: String,
}

impl ConnectParams {
    /// Build the connect parameters for a read-only operator.
    pub fn operator(client: ClientInfo, credential: Option<&str>) -> Self {
        Self {
            min_protocol: PROTOCOL_VERSION,
            max_protocol: PROTOCOL_VERSION,
            client,
            caps: Vec::new(),
            role: "operator".to_string(),
            scopes: vec!["operator.read".to_string()],
            auth: credential
                .filter(|token| !token.is_empty())
                .map(|token| ConnectAuth {
                    token: token.to_string(),
                }),
        }
    }

    /// Convert into a request parameter map.
    pub fn into_params(self) -> Result<Params> {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(_) => Err(MoltbotError::InvalidResponse(
                "connect params did not encode as an object".to_string(),
            )),
            Err(e) => Err(MoltbotError::InvalidResponse(format!(
                "cannot encode connect params: {e}"
            ))),
        }
    }

    /// Method name of the connect request.
    pub fn method() -> &'static str {
        CONNECT_METHOD
    }
}

/// Structured server error.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RpcError {
    /// Machine-readable code
    #[serde(default)]
    pub code: String,
    /// Human-readable message
    #[serde(default)]
    pub message: String,
}

/// Response to an earlier request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    /// Id of the originating request
    pub id: String,
    /// Success flag
    #[serde(default)]
    pub ok: bool,
    /// Success payload
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
    /// Failure details
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
}

/// Server-pushed event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Event name
    pub event: String,
    /// Event payload
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
}

/// Inbound message, discriminated by `type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Inbound {
    /// Server-pushed event
    Event(Event),
    /// Response to a request
    Res(Response),
    /// Any other message type
    #[serde(other)]
    Unknown,
}

impl Inbound {
    /// Parse one inbound text message.
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| MoltbotError::InvalidResponse(e.to_string()))
    }

    /// Whether this is the event with the given name.
    pub fn is_event(&self, name: &str) -> bool {
        matches!(self, Inbound::Event(event) if event.event == name)
    }
}
