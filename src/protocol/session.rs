//! Client session for one gateway call.
//!
//! Sans-IO: the session consumes inbound text and tells the driver what to
//! send next. The driver owns the transport and the deadline.

use serde_json::{Map, Value};

use super::correlator::{Correlator, Resolved};
use super::message::{ConnectParams, Inbound, Params, Request, Response, RpcError};
use super::{ClientInfo, CHALLENGE_EVENT, MAX_RECEIVE_ATTEMPTS, NOT_PAIRED_CODE};
use crate::error::{MoltbotError, Result};

/// Message fragments that mark a handshake rejection as an authorization problem
const AUTH_REQUIRED_HINTS: &[&str] = &[
    "not paired",
    "pairing required",
    "device identity",
    "unauthorized",
];

/// Session state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Created, not yet connected
    Idle,
    /// Connected, waiting for the challenge event
    AwaitingChallenge,
    /// Connect request sent
    HandshakeSent,
    /// Gateway accepted the connect request
    Authenticated,
    /// Method request sent
    MethodSent,
    /// Method response received
    Completed,
    /// Call failed
    Failed,
}

impl SessionState {
    /// Whether no further transitions are possible.
    pub fn is_terminal(self) -> bool {
        matches!(self, SessionState::Completed | SessionState::Failed)
    }
}

/// What the driver should do after an inbound message.
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    /// Send this request
    Send(Request),
    /// Handshake done; call [`ClientSession::begin_call`]
    Authenticated,
    /// Keep receiving
    Wait,
    /// Call finished
    Done(CallReply),
}

/// Successful call result.
#[derive(Debug, Clone, PartialEq)]
pub struct CallReply {
    /// Method payload (`{}` when the gateway sent none)
    pub payload: Value,
    /// Gateway version reported during the handshake
    pub server_version: Option<String>,
    /// Gateway uptime reported during the handshake
    pub uptime_ms: Option<u64>,
}

/// One handshake + method call exchange.
#[derive(Debug)]
pub struct ClientSession {
    state: SessionState,
    correlator: Correlator,
    method: String,
    params: Option<Params>,
    credential: Option<String>,
    client: ClientInfo,
    server_version: Option<String>,
    uptime_ms: Option<u64>,
    attempts: u32,
    max_attempts: u32,
}

impl ClientSession {
    /// Create a session that will call `method` with `params`.
    pub fn new(method: impl Into<String>, params: Params) -> Self {
        Self {
            state: SessionState::Idle,
            correlator: Correlator::new(),
            method: method.into(),
            params: Some(params),
            credential: None,
            client: ClientInfo::default(),
            server_version: None,
            uptime_ms: None,
            attempts: 0,
            max_attempts: MAX_RECEIVE_ATTEMPTS,
        }
    }

    /// Set the credential sent as `auth.token` (ignored when empty).
    pub fn with_credential(mut self, credential: Option<&str>) -> Self {
        self.credential = credential.filter(|c| !c.is_empty()).map(str::to_string);
        self
    }

    /// Override the client descriptor.
    pub fn with_client(mut self, client: ClientInfo) -> Self {
        self.client = client;
        self
    }

    /// Override the receive-attempt budget.
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Get current state
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Method this session calls
    pub fn method(&self) -> &str {
        &self.method
    }

    /// Receive attempts used so far
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Mark the connection as open and start waiting for the challenge.
    pub fn open(&mut self) -> Result<()> {
        if self.state != SessionState::Idle {
            return Err(self.fail(MoltbotError::Protocol(format!(
                "cannot open session in state {:?}",
                self.state
            ))));
        }
        self.state = SessionState::AwaitingChallenge;
        Ok(())
    }

    /// Count one receive against the attempt budget.
    pub fn record_attempt(&mut self) -> Result<()> {
        if self.attempts >= self.max_attempts {
            tracing::debug!(
                "Gave up on {} after {} inbound messages",
                self.method,
                self.attempts
            );
            return Err(self.fail(MoltbotError::Timeout));
        }
        self.attempts += 1;
        Ok(())
    }

    /// Parse and process one inbound text message.
    pub fn handle_text(&mut self, text: &str) -> Result<Step> {
        match Inbound::from_json(text) {
            Ok(inbound) => self.handle(inbound),
            Err(e) => Err(self.fail(e)),
        }
    }

    /// Process one inbound message.
    pub fn handle(&mut self, inbound: Inbound) -> Result<Step> {
        let result = self.advance(inbound);
        result.map_err(|e| self.fail(e))
    }

    /// Issue the method request. Only valid once the handshake is accepted.
    pub fn begin_call(&mut self) -> Result<Request> {
        if self.state != SessionState::Authenticated {
            return Err(self.fail(MoltbotError::Protocol(format!(
                "cannot send {} before handshake completes (state {:?})",
                self.method, self.state
            ))));
        }

        let params = self.params.take().unwrap_or_default();
        match self.correlator.issue(&self.method, params) {
            Ok(request) => {
                tracing::debug!("Sending {} ({})", self.method, request.id);
                self.state = SessionState::MethodSent;
                Ok(request)
            },
            Err(e) => Err(self.fail(e)),
        }
    }

    fn advance(&mut self, inbound: Inbound) -> Result<Step> {
        match self.state {
            SessionState::AwaitingChallenge => {
                if inbound.is_event(CHALLENGE_EVENT) {
                    return self.send_connect();
                }
                tracing::trace!("Ignoring {:?} while awaiting challenge", inbound);
                Ok(Step::Wait)
            },
            SessionState::HandshakeSent => match self.resolve(inbound) {
                Some(resolved) => self.finish_handshake(resolved.response),
                None => Ok(Step::Wait),
            },
            SessionState::Authenticated => Ok(Step::Wait),
            SessionState::MethodSent => match self.resolve(inbound) {
                Some(resolved) => self.finish_call(resolved.response),
                None => Ok(Step::Wait),
            },
            SessionState::Idle | SessionState::Completed | SessionState::Failed => {
                Err(MoltbotError::Protocol(format!(
                    "unexpected message in state {:?}",
                    self.state
                )))
            },
        }
    }

    fn resolve(&mut self, inbound: Inbound) -> Option<Resolved> {
        match inbound {
            Inbound::Res(response) => {
                let id = response.id.clone();
                let resolved = self.correlator.resolve(response);
                if resolved.is_none() {
                    tracing::trace!("Ignoring response with unmatched id {}", id);
                }
                resolved
            },
            other => {
                tracing::trace!("Ignoring {:?} in state {:?}", other, self.state);
                None
            },
        }
    }

    fn send_connect(&mut self) -> Result<Step> {
        let params =
            ConnectParams::operator(self.client.clone(), self.credential.as_deref()).into_params()?;
        let request = self.correlator.issue(ConnectParams::method(), params)?;

        tracing::debug!("Challenge received, sending connect ({})", request.id);
        self.state = SessionState::HandshakeSent;
        Ok(Step::Send(request))
    }

    fn finish_handshake(&mut self, response: Response) -> Result<Step> {
        if !response.ok {
            return Err(handshake_error(response.error));
        }

        if let Some(payload) = &response.payload {
            self.server_version = payload
                .pointer("/server/version")
                .and_then(Value::as_str)
                .map(str::to_string);
            self.uptime_ms = payload.pointer("/snapshot/uptimeMs").and_then(Value::as_u64);
        }

        tracing::debug!(
            "Handshake accepted (server version {:?})",
            self.server_version
        );
        self.state = SessionState::Authenticated;
        Ok(Step::Authenticated)
    }

    fn finish_call(&mut self, response: Response) -> Result<Step> {
        if !response.ok {
            return Err(match response.error {
                Some(error) => MoltbotError::Api(error_text(&error)),
                None => MoltbotError::InvalidResponse(format!(
                    "{} failed without an error",
                    self.method
                )),
            });
        }

        self.state = SessionState::Completed;
        Ok(Step::Done(CallReply {
            payload: response
                .payload
                .unwrap_or_else(|| Value::Object(Map::new())),
            server_version: self.server_version.clone(),
            uptime_ms: self.uptime_ms,
        }))
    }

    fn fail(&mut self, error: MoltbotError) -> MoltbotError {
        if !self.state.is_terminal() {
            tracing::debug!("Session for {} failed: {}", self.method, error);
            self.state = SessionState::Failed;
        }
        error
    }
}

/// Classify a rejected handshake.
fn handshake_error(error: Option<RpcError>) -> MoltbotError {
    let Some(error) = error else {
        return MoltbotError::InvalidResponse("connect rejected without an error".to_string());
    };

    let message = error.message.to_lowercase();
    let auth_required = error.code == NOT_PAIRED_CODE
        || AUTH_REQUIRED_HINTS.iter().any(|hint| message.contains(hint));

    if auth_required {
        MoltbotError::AuthenticationRequired(error_text(&error))
    } else {
        MoltbotError::Api(error_text(&error))
    }
}

fn error_text(error: &RpcError) -> String {
    if error.message.is_empty() {
        error.code.clone()
    } else {
        error.message.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    const CHALLENGE: &str = r#"{"type":"event","event":"connect.challenge","payload":{"nonce":"abc"}}"#;

    fn res(id: &str, ok: bool, payload: Value) -> String {
        json!({"type": "res", "id": id, "ok": ok, "payload": payload}).to_string()
    }

    fn res_err(id: &str, code: &str, message: &str) -> String {
        json!({"type": "res", "id": id, "ok": false, "error": {"code": code, "message": message}})
            .to_string()
    }

    fn expect_send(step: Step) -> Request {
        match step {
            Step::Send(request) => request,
            other => panic!("expected Send, got {other:?}"),
        }
    }

    /// Drive a session up to `MethodSent`, returning the method request.
    fn authenticate(session: &mut ClientSession, hello: Value) -> Request {
        session.open().unwrap();
        let connect = expect_send(session.handle_text(CHALLENGE).unwrap());
        assert_eq!(
            session.handle_text(&res(&connect.id, true, hello)).unwrap(),
            Step::Authenticated
        );
        session.begin_call().unwrap()
    }

    #[test]
    fn test_full_exchange() {
        let mut session = ClientSession::new("health", Params::new());
        assert_eq!(session.state(), SessionState::Idle);

        session.open().unwrap();
        assert_eq!(session.state(), SessionState::AwaitingChallenge);

        let connect = expect_send(session.handle_text(CHALLENGE).unwrap());
        assert_eq!(connect.method, "connect");
        assert_eq!(session.state(), SessionState::HandshakeSent);

        let hello = json!({"server": {"version": "1.2.3"}, "snapshot": {"uptimeMs": 5000}});
        assert_eq!(
            session.handle_text(&res(&connect.id, true, hello)).unwrap(),
            Step::Authenticated
        );
        assert_eq!(session.state(), SessionState::Authenticated);

        let call = session.begin_call().unwrap();
        assert_eq!(call.method, "health");
        assert_ne!(call.id, connect.id);
        assert_eq!(session.state(), SessionState::MethodSent);

        let step = session
            .handle_text(&res(&call.id, true, json!({"ok": true})))
            .unwrap();
        let Step::Done(reply) = step else {
            panic!("expected Done");
        };
        assert_eq!(reply.payload, json!({"ok": true}));
        assert_eq!(reply.server_version.as_deref(), Some("1.2.3"));
        assert_eq!(reply.uptime_ms, Some(5000));
        assert_eq!(session.state(), SessionState::Completed);
    }

    #[test]
    fn test_events_before_challenge_are_ignored() {
        let mut session = ClientSession::new("cron.status", Params::new());
        session.open().unwrap();

        let tick = r#"{"type":"event","event":"tick"}"#;
        assert_eq!(session.handle_text(tick).unwrap(), Step::Wait);
        assert_eq!(
            session.handle_text(&res("whatever", true, json!({}))).unwrap(),
            Step::Wait
        );
        assert_eq!(session.state(), SessionState::AwaitingChallenge);
    }

    #[test]
    fn test_unmatched_response_is_ignored() {
        let mut session = ClientSession::new("cron.status", Params::new());
        let call = authenticate(&mut session, json!({}));

        assert_eq!(
            session.handle_text(&res("stale-id", true, json!({"jobs": 9}))).unwrap(),
            Step::Wait
        );
        assert_eq!(session.state(), SessionState::MethodSent);

        let Step::Done(reply) = session
            .handle_text(&res(&call.id, true, json!({"jobs": 3})))
            .unwrap()
        else {
            panic!("expected Done");
        };
        assert_eq!(reply.payload["jobs"], 3);
    }

    #[test]
    fn test_not_paired_requires_authentication() {
        let mut session = ClientSession::new("health", Params::new());
        session.open().unwrap();
        let connect = expect_send(session.handle_text(CHALLENGE).unwrap());

        let err = session
            .handle_text(&res_err(&connect.id, "NOT_PAIRED", "device identity unknown"))
            .unwrap_err();
        assert!(matches!(err, MoltbotError::AuthenticationRequired(_)));
        assert_eq!(session.state(), SessionState::Failed);
    }

    #[test]
    fn test_unauthorized_message_requires_authentication() {
        let mut session = ClientSession::new("health", Params::new());
        session.open().unwrap();
        let connect = expect_send(session.handle_text(CHALLENGE).unwrap());

        let err = session
            .handle_text(&res_err(&connect.id, "FORBIDDEN", "Unauthorized: bad token"))
            .unwrap_err();
        assert!(err.is_auth_required());
    }

    #[test]
    fn test_other_handshake_rejection_is_api_error() {
        let mut session = ClientSession::new("health", Params::new());
        session.open().unwrap();
        let connect = expect_send(session.handle_text(CHALLENGE).unwrap());

        let err = session
            .handle_text(&res_err(&connect.id, "PROTOCOL_MISMATCH", "protocol 3 unsupported"))
            .unwrap_err();
        match err {
            MoltbotError::Api(message) => assert_eq!(message, "protocol 3 unsupported"),
            other => panic!("expected Api, got {other:?}"),
        }
    }

    #[test]
    fn test_method_failure_is_api_error() {
        let mut session = ClientSession::new("cron.runs", Params::new());
        let call = authenticate(&mut session, json!({}));

        let err = session
            .handle_text(&res_err(&call.id, "NOT_FOUND", "job not found"))
            .unwrap_err();
        assert!(matches!(err, MoltbotError::Api(ref m) if m == "job not found"));
        assert_eq!(session.state(), SessionState::Failed);
    }

    #[test]
    fn test_missing_payload_defaults_to_empty_object() {
        let mut session = ClientSession::new("cron.status", Params::new());
        let call = authenticate(&mut session, json!({}));

        let text = json!({"type": "res", "id": call.id, "ok": true}).to_string();
        let Step::Done(reply) = session.handle_text(&text).unwrap() else {
            panic!("expected Done");
        };
        assert_eq!(reply.payload, json!({}));
        assert_eq!(reply.server_version, None);
    }

    #[test]
    fn test_method_before_handshake_is_rejected() {
        let mut session = ClientSession::new("health", Params::new());
        session.open().unwrap();

        assert!(matches!(
            session.begin_call(),
            Err(MoltbotError::Protocol(_))
        ));
        assert_eq!(session.state(), SessionState::Failed);
    }

    #[test]
    fn test_attempt_budget() {
        let mut session = ClientSession::new("health", Params::new()).with_max_attempts(3);
        session.open().unwrap();

        for _ in 0..3 {
            session.record_attempt().unwrap();
            session.handle_text(r#"{"type":"event","event":"tick"}"#).unwrap();
        }
        assert!(matches!(session.record_attempt(), Err(MoltbotError::Timeout)));
        assert_eq!(session.state(), SessionState::Failed);
    }

    #[test]
    fn test_malformed_message_fails_session() {
        let mut session = ClientSession::new("health", Params::new());
        session.open().unwrap();

        assert!(matches!(
            session.handle_text("{oops"),
            Err(MoltbotError::InvalidResponse(_))
        ));
        assert_eq!(session.state(), SessionState::Failed);
    }

    #[test]
    fn test_completed_session_stays_completed() {
        let mut session = ClientSession::new("health", Params::new());
        let call = authenticate(&mut session, json!({}));
        session.handle_text(&res(&call.id, true, json!({}))).unwrap();

        assert!(session.handle_text(CHALLENGE).is_err());
        assert_eq!(session.state(), SessionState::Completed);
        assert!(session.open().is_err());
        assert_eq!(session.state(), SessionState::Completed);
    }

    proptest! {
        #[test]
        fn prop_auth_token_iff_credential_non_empty(credential in proptest::option::of(".{0,16}")) {
            let mut session = ClientSession::new("health", Params::new())
                .with_credential(credential.as_deref());
            session.open().unwrap();
            let connect = expect_send(session.handle_text(CHALLENGE).unwrap());

            let expected = credential.filter(|c| !c.is_empty());
            let sent = connect.params.get("auth").and_then(|auth| auth["token"].as_str());
            prop_assert_eq!(sent, expected.as_deref());
        }
    }
}
