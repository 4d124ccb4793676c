//! Gateway RPC protocol: wire messages, call correlation and the connect handshake.
//!
//! Every logical call runs over its own connection: the gateway pushes a
//! challenge, the client answers with a `connect` request, and only after
//! the gateway accepts does the client send the one method request it came
//! for.
//!
//! ## Message Flow
//!
//! ```text
//! Client                                   Gateway
//!    |                                        |
//!    |<------- event connect.challenge -------|  Server opens the exchange
//!    |                                        |
//!    |-------- req connect (id=A) ----------->|  Protocol bounds, role, token
//!    |<------- res id=A ok:true --------------|  server.version, snapshot.uptimeMs
//!    |     or  res id=A ok:false (error)      |  NOT_PAIRED → auth required
//!    |                                        |
//!    |-------- req <method> (id=B) ---------->|  e.g. health, cron.status
//!    |<------- res id=B ok:true payload ------|
//!    |                                        |
//!    |-------- close ------------------------>|
//! ```
//!
//! ## State Machine
//!
//! | State               | Description                          | Valid Transitions           |
//! |---------------------|--------------------------------------|-----------------------------|
//! | `Idle`              | Session created, no connection yet   | → AwaitingChallenge         |
//! | `AwaitingChallenge` | Waiting for `connect.challenge`      | → HandshakeSent, Failed     |
//! | `HandshakeSent`     | Connect request sent                 | → Authenticated, Failed     |
//! | `Authenticated`     | Gateway accepted the client          | → MethodSent, Failed        |
//! | `MethodSent`        | Method request sent                  | → Completed, Failed         |
//! | `Completed`         | Payload received                     | (terminal)                  |
//! | `Failed`            | Call failed                          | (terminal)                  |
//!
//! Responses whose id does not match the pending call and events other
//! than the challenge are ignored. A receive-attempt budget bounds how long
//! the client tolerates such chatter.
//!
//! # Usage
//!
//! ```rust,ignore
//! use moltbot_widgets::protocol::{ClientSession, Params, Step};
//!
//! let mut session = ClientSession::new("health", Params::new()).with_credential(Some("tok"));
//! session.open()?;
//! loop {
//!     session.record_attempt()?;
//!     let text = transport.receive().await?.unwrap();
//!     match session.handle_text(&text)? {
//!         Step::Send(request) => transport.send(request.to_json()?).await?,
//!         Step::Authenticated => {
//!             let request = session.begin_call()?;
//!             transport.send(request.to_json()?).await?;
//!         }
//!         Step::Wait => {}
//!         Step::Done(reply) => break reply,
//!     }
//! }
//! ```

mod correlator;
mod message;
mod session;

pub use correlator::{Correlator, PendingCall, Resolved};
pub use message::{
    ConnectAuth, ConnectParams, Event, Inbound, Params, Request, RequestKind, Response, RpcError,
};
pub use session::{CallReply, ClientSession, SessionState, Step};

use serde::{Deserialize, Serialize};

/// Gateway protocol version (min = max)
pub const PROTOCOL_VERSION: u32 = 3;

/// Method name of the handshake request
pub const CONNECT_METHOD: &str = "connect";

/// Event that opens the handshake
pub const CHALLENGE_EVENT: &str = "connect.challenge";

/// Error code the gateway uses for an unpaired device
pub const NOT_PAIRED_CODE: &str = "NOT_PAIRED";

/// Maximum inbound messages consulted per call (handshake + method)
pub const MAX_RECEIVE_ATTEMPTS: u32 = 20;

/// Overall deadline for connect + handshake + call
pub const DEFAULT_TIMEOUT_SECS: u64 = 15;

/// Pause after closing a successful call
pub const CLOSE_GRACE_MILLIS: u64 = 50;

/// Client descriptor sent in the connect request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientInfo {
    /// Client id
    pub id: String,
    /// Client version
    pub version: String,
    /// Platform name
    pub platform: String,
    /// Client mode
    pub mode: String,
}

impl Default for ClientInfo {
    fn default() -> Self {
        Self {
            id: "gateway-client".to_string(),
            version: "1.0.0".to_string(),
            platform: "darwin".to_string(),
            mode: "backend".to_string(),
        }
    }
}
