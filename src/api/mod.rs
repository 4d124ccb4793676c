//! Gateway client: typed operations over the RPC protocol.
//!
//! Each operation opens its own connection, completes the handshake, sends
//! exactly one method request and closes the connection again before
//! returning, whether the call succeeded or not.
//!
//! | Operation       | Method        | Parameters                    |
//! |-----------------|---------------|-------------------------------|
//! | `cron_status`   | `cron.status` | none                          |
//! | `cron_list`     | `cron.list`   | `includeDisabled`             |
//! | `cron_runs`     | `cron.runs`   | `id`, `limit`                 |
//! | `health`        | `health`      | `probe` (only when true)      |
//! | `usage_cost`    | `usage.cost`  | `days`                        |
//!
//! Independent calls share nothing, so they can run concurrently:
//!
//! ```rust,ignore
//! use moltbot_widgets::{api::GatewayClient, transport::Endpoint};
//!
//! let client = GatewayClient::new(Endpoint::default());
//! let (status, health) = tokio::join!(client.cron_status(), client.health(true));
//! ```

mod types;

pub use types::{
    decode_cron_list, decode_cron_runs, decode_cron_status, decode_health, decode_usage_cost,
    CronJob, CronJobList, CronRunEntry, CronRunHistory, CronStatus, HealthStatus, UsageCost,
};

use std::time::Duration;

use serde_json::{json, Value};
use tokio::time::{sleep, timeout_at, Instant};

use crate::error::{MoltbotError, Result};
use crate::protocol::{
    CallReply, ClientInfo, ClientSession, Params, Step, CLOSE_GRACE_MILLIS, DEFAULT_TIMEOUT_SECS,
    MAX_RECEIVE_ATTEMPTS,
};
use crate::transport::{Connector, Endpoint, MessageTransport, WsConnector};

/// Client for the local automation gateway.
#[derive(Debug, Clone)]
pub struct GatewayClient<C = WsConnector> {
    endpoint: Endpoint,
    connector: C,
    client: ClientInfo,
    timeout: Duration,
    max_attempts: u32,
    close_grace: Duration,
}

impl GatewayClient<WsConnector> {
    /// Create a WebSocket client for the endpoint.
    pub fn new(endpoint: Endpoint) -> Self {
        Self::with_connector(endpoint, WsConnector)
    }
}

impl<C: Connector> GatewayClient<C> {
    /// Create a client using a custom connector.
    pub fn with_connector(endpoint: Endpoint, connector: C) -> Self {
        Self {
            endpoint,
            connector,
            client: ClientInfo::default(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            max_attempts: MAX_RECEIVE_ATTEMPTS,
            close_grace: Duration::from_millis(CLOSE_GRACE_MILLIS),
        }
    }

    /// Set the overall deadline for connect + handshake + call.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the receive-attempt budget.
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Set the pause observed after closing a successful call.
    pub fn with_close_grace(mut self, grace: Duration) -> Self {
        self.close_grace = grace;
        self
    }

    /// Override the client descriptor sent during the handshake.
    pub fn with_client_info(mut self, client: ClientInfo) -> Self {
        self.client = client;
        self
    }

    /// Endpoint this client talks to.
    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Run one method call and return its raw reply.
    pub async fn call(&self, method: &str, params: Params) -> Result<CallReply> {
        // Surface a bad endpoint before any I/O
        self.endpoint.url()?;

        let deadline = Instant::now() + self.timeout;
        let mut transport = timeout_at(deadline, self.connector.connect(&self.endpoint))
            .await
            .map_err(|_| MoltbotError::Timeout)??;

        let session = ClientSession::new(method, params)
            .with_credential(self.endpoint.credential())
            .with_client(self.client.clone())
            .with_max_attempts(self.max_attempts);

        let result = timeout_at(deadline, exchange(&mut transport, session))
            .await
            .unwrap_or(Err(MoltbotError::Timeout));

        match timeout_at(deadline, transport.close()).await {
            Ok(Ok(())) => {},
            Ok(Err(e)) => tracing::warn!("Failed to close gateway connection: {}", e),
            Err(_) => tracing::warn!("Gateway connection close did not finish before the deadline"),
        }

        if result.is_ok() && !self.close_grace.is_zero() {
            sleep(self.close_grace).await;
        }

        result
    }

    /// Scheduler status.
    pub async fn cron_status(&self) -> Result<CronStatus> {
        let reply = self.call("cron.status", Params::new()).await?;
        decode_cron_status(reply.payload)
    }

    /// Scheduled jobs.
    pub async fn cron_list(&self, include_disabled: bool) -> Result<CronJobList> {
        let reply = self
            .call("cron.list", params([("includeDisabled", json!(include_disabled))]))
            .await?;
        decode_cron_list(reply.payload)
    }

    /// Recent runs of one job.
    pub async fn cron_runs(&self, id: &str, limit: u32) -> Result<CronRunHistory> {
        let reply = self
            .call("cron.runs", params([("id", json!(id)), ("limit", json!(limit))]))
            .await?;
        decode_cron_runs(reply.payload)
    }

    /// Gateway health, optionally probing channels.
    pub async fn health(&self, probe: bool) -> Result<HealthStatus> {
        let params = if probe {
            params([("probe", json!(true))])
        } else {
            Params::new()
        };
        let reply = self.call("health", params).await?;
        decode_health(reply)
    }

    /// Token usage and cost over the last `days` days.
    pub async fn usage_cost(&self, days: u32) -> Result<UsageCost> {
        let reply = self
            .call("usage.cost", params([("days", json!(days))]))
            .await?;
        decode_usage_cost(reply.payload, days)
    }
}

fn params<const N: usize>(entries: [(&str, Value); N]) -> Params {
    entries
        .into_iter()
        .map(|(key, value)| (key.to_string(), value))
        .collect()
}

/// Drive the session over an open transport until it completes or fails.
async fn exchange<T: MessageTransport>(
    transport: &mut T,
    mut session: ClientSession,
) -> Result<CallReply> {
    session.open()?;

    loop {
        session.record_attempt()?;

        let text = transport.receive().await?.ok_or_else(|| {
            MoltbotError::ConnectionFailed("gateway closed the connection".to_string())
        })?;

        match session.handle_text(&text)? {
            Step::Send(request) => transport.send(request.to_json()?).await?,
            Step::Authenticated => {
                let request = session.begin_call()?;
                transport.send(request.to_json()?).await?;
            },
            Step::Wait => {},
            Step::Done(reply) => return Ok(reply),
        }
    }
}
