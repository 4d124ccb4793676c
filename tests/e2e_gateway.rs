//! End-to-end gateway client tests.
//!
//! Each test runs a scripted gateway on a real WebSocket listener and drives
//! the public client against it.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use moltbot_widgets::{
    api::{GatewayClient, HealthStatus, UsageCost},
    transport::Endpoint,
    MoltbotError,
};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::Message;

type Responder = dyn Fn(&Value) -> Vec<Value> + Send + Sync;

/// Scripted gateway serving a single connection
struct MockGateway {
    port: u16,
    requests: Arc<Mutex<Vec<Value>>>,
    authorization: Arc<Mutex<Option<String>>>,
    handle: JoinHandle<()>,
}

impl MockGateway {
    async fn spawn(opening: Vec<Value>, respond: impl Fn(&Value) -> Vec<Value> + Send + Sync + 'static) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let requests = Arc::new(Mutex::new(Vec::new()));
        let authorization = Arc::new(Mutex::new(None));
        let respond: Box<Responder> = Box::new(respond);

        let seen = Arc::clone(&requests);
        let auth_header = Arc::clone(&authorization);
        let handle = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let callback = |req: &Request, resp: Response| -> Result<Response, ErrorResponse> {
                *auth_header.lock().unwrap() = req
                    .headers()
                    .get("authorization")
                    .and_then(|v| v.to_str().ok())
                    .map(str::to_string);
                Ok(resp)
            };
            let mut ws = tokio_tungstenite::accept_hdr_async(stream, callback).await.unwrap();

            for message in opening {
                ws.send(Message::Text(message.to_string())).await.unwrap();
            }

            while let Some(Ok(message)) = ws.next().await {
                let text = match message {
                    Message::Text(text) => text,
                    Message::Close(_) => break,
                    _ => continue,
                };
                let request: Value = serde_json::from_str(&text).unwrap();
                let replies = respond(&request);
                seen.lock().unwrap().push(request);
                for reply in replies {
                    if ws.send(Message::Text(reply.to_string())).await.is_err() {
                        return;
                    }
                }
            }
        });

        Self {
            port,
            requests,
            authorization,
            handle,
        }
    }

    fn client(&self) -> GatewayClient {
        GatewayClient::new(Endpoint::new("127.0.0.1", self.port)).with_close_grace(Duration::ZERO)
    }

    async fn finished(&mut self) {
        (&mut self.handle).await.unwrap();
    }

    fn requests(&self) -> Vec<Value> {
        self.requests.lock().unwrap().clone()
    }
}

fn challenge() -> Value {
    json!({"type": "event", "event": "connect.challenge", "payload": {"nonce": "n-1"}})
}

fn ok(request: &Value, payload: Value) -> Value {
    json!({"type": "res", "id": request["id"], "ok": true, "payload": payload})
}

fn fail(request: &Value, code: &str, message: &str) -> Value {
    json!({"type": "res", "id": request["id"], "ok": false, "error": {"code": code, "message": message}})
}

fn hello() -> Value {
    json!({"server": {"version": "1.2.3"}, "snapshot": {"uptimeMs": 5000}})
}

#[tokio::test]
async fn test_health_end_to_end() {
    let mut gateway = MockGateway::spawn(vec![challenge()], |req| match req["method"].as_str() {
        Some("connect") => vec![ok(req, hello())],
        Some("health") => vec![ok(
            req,
            json!({"ok": true, "channels": {"a": {"linked": true}, "b": {"configured": false}}}),
        )],
        _ => vec![],
    })
    .await;

    let health = gateway.client().health(true).await.unwrap();
    assert_eq!(
        health,
        HealthStatus {
            ok: true,
            uptime_ms: Some(5000),
            version: Some("1.2.3".to_string()),
            channels_total: Some(2),
            channels_connected: Some(1),
        }
    );

    gateway.finished().await;
    let requests = gateway.requests();
    assert_eq!(requests.len(), 2);

    let connect = &requests[0];
    assert_eq!(connect["type"], "req");
    assert_eq!(connect["method"], "connect");
    assert_eq!(connect["params"]["minProtocol"], 3);
    assert_eq!(connect["params"]["maxProtocol"], 3);
    assert_eq!(connect["params"]["role"], "operator");
    assert!(connect["params"].get("auth").is_none());

    let call = &requests[1];
    assert_eq!(call["method"], "health");
    assert_eq!(call["params"], json!({"probe": true}));
    assert_ne!(call["id"], connect["id"]);
    assert_eq!(*gateway.authorization.lock().unwrap(), None);
}

#[tokio::test]
async fn test_not_paired_requires_authentication() {
    let mut gateway = MockGateway::spawn(vec![challenge()], |req| {
        vec![fail(req, "NOT_PAIRED", "device identity unknown")]
    })
    .await;

    let err = gateway.client().cron_status().await.unwrap_err();
    assert!(matches!(err, MoltbotError::AuthenticationRequired(_)), "got {err:?}");
    assert!(err.is_auth_required());

    gateway.finished().await;
    let requests = gateway.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0]["method"], "connect");
}

#[tokio::test]
async fn test_usage_cost_end_to_end() {
    let mut gateway = MockGateway::spawn(vec![challenge()], |req| match req["method"].as_str() {
        Some("connect") => vec![ok(req, hello())],
        Some("usage.cost") => vec![ok(req, json!({"days": 7, "totals": {"totalCost": 3.5, "totalTokens": 100}}))],
        _ => vec![],
    })
    .await;

    let usage = gateway.client().usage_cost(30).await.unwrap();
    assert_eq!(
        usage,
        UsageCost {
            total_cost: 3.5,
            total_tokens: 100,
            input: 0,
            output: 0,
            cache_read: 0,
            cache_write: 0,
            days: 7,
        }
    );

    gateway.finished().await;
    assert_eq!(gateway.requests()[1]["params"], json!({"days": 30}));
}

#[tokio::test]
async fn test_unmatched_messages_are_skipped() {
    let mut gateway = MockGateway::spawn(
        vec![json!({"type": "event", "event": "tick"}), challenge()],
        |req| match req["method"].as_str() {
            Some("connect") => vec![
                json!({"type": "res", "id": "someone-else", "ok": true, "payload": {}}),
                ok(req, hello()),
            ],
            Some("cron.status") => vec![
                json!({"type": "event", "event": "presence", "payload": {}}),
                json!({"type": "res", "id": "stale", "ok": false, "error": {"code": "X", "message": "no"}}),
                ok(req, json!({"enabled": true, "storePath": "/tmp/jobs.json", "jobs": 4})),
            ],
            _ => vec![],
        },
    )
    .await;

    let status = gateway.client().cron_status().await.unwrap();
    assert!(status.enabled);
    assert_eq!(status.jobs, 4);
    assert_eq!(status.store_path, "/tmp/jobs.json");
    assert_eq!(status.next_wake_at_ms, None);

    gateway.finished().await;
}

#[tokio::test]
async fn test_credential_is_sent() {
    let mut gateway = MockGateway::spawn(vec![challenge()], |req| match req["method"].as_str() {
        Some("connect") => vec![ok(req, hello())],
        Some("cron.list") => vec![ok(req, json!({"jobs": [{"id": "j1", "name": "Backup"}]}))],
        _ => vec![],
    })
    .await;

    let client = GatewayClient::new(Endpoint::new("127.0.0.1", gateway.port).with_token(Some("secret".to_string())))
        .with_close_grace(Duration::ZERO);
    let list = client.cron_list(true).await.unwrap();
    assert_eq!(list.jobs.len(), 1);
    assert_eq!(list.jobs[0].display_name(), "Backup");
    assert!(list.jobs[0].enabled);

    gateway.finished().await;
    let requests = gateway.requests();
    assert_eq!(requests[0]["params"]["auth"], json!({"token": "secret"}));
    assert_eq!(requests[1]["params"], json!({"includeDisabled": true}));
    assert_eq!(gateway.authorization.lock().unwrap().as_deref(), Some("Bearer secret"));
}

#[tokio::test]
async fn test_method_failure_is_api_error() {
    let mut gateway = MockGateway::spawn(vec![challenge()], |req| match req["method"].as_str() {
        Some("connect") => vec![ok(req, hello())],
        _ => vec![fail(req, "NOT_FOUND", "unknown job")],
    })
    .await;

    let err = gateway.client().cron_runs("missing", 5).await.unwrap_err();
    assert!(matches!(err, MoltbotError::Api(ref message) if message == "unknown job"), "got {err:?}");

    gateway.finished().await;
}

#[tokio::test]
async fn test_silent_gateway_times_out() {
    let mut gateway = MockGateway::spawn(vec![], |_| vec![]).await;

    let client = gateway.client().with_timeout(Duration::from_millis(200));
    let err = client.health(false).await.unwrap_err();
    assert!(matches!(err, MoltbotError::Timeout), "got {err:?}");

    gateway.finished().await;
    assert!(gateway.requests().is_empty());
}

#[tokio::test]
async fn test_refused_connection() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let client = GatewayClient::new(Endpoint::new("127.0.0.1", port));
    let err = client.health(false).await.unwrap_err();
    assert!(matches!(err, MoltbotError::ConnectionFailed(_)), "got {err:?}");
}
