//! Typed gateway results and their decoders.
//!
//! Every decoder is a pure function over the response payload. Absent and
//! `null` fields take documented defaults; present fields of the wrong shape
//! are an `InvalidResponse`.

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{MoltbotError, Result};
use crate::protocol::CallReply;

fn decode<T: DeserializeOwned>(method: &str, mut payload: Value) -> Result<T> {
    strip_nulls(&mut payload);
    serde_json::from_value(payload)
        .map_err(|e| MoltbotError::InvalidResponse(format!("{method} payload: {e}")))
}

/// Drop `null` object members at every depth so they read as absent.
fn strip_nulls(value: &mut Value) {
    match value {
        Value::Object(map) => {
            map.retain(|_, v| !v.is_null());
            map.values_mut().for_each(strip_nulls);
        },
        Value::Array(items) => items.iter_mut().for_each(strip_nulls),
        _ => {},
    }
}

/// `cron.status` result
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CronStatus {
    /// Scheduler enabled
    pub enabled: bool,
    /// Job store location on the gateway host
    pub store_path: String,
    /// Number of jobs
    pub jobs: u64,
    /// Next scheduler wake-up (epoch millis)
    pub next_wake_at_ms: Option<i64>,
}

/// Decode a `cron.status` payload.
pub fn decode_cron_status(payload: Value) -> Result<CronStatus> {
    decode("cron.status", payload)
}

/// `cron.list` result
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CronJobList {
    /// Jobs known to the scheduler
    pub jobs: Vec<CronJob>,
}

/// One scheduled job
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CronJob {
    /// Job id
    pub id: String,
    /// Job name
    #[serde(default)]
    pub name: Option<String>,
    /// Display label
    #[serde(default)]
    pub label: Option<String>,
    /// Job enabled
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Schedule expression
    #[serde(default)]
    pub schedule: Option<Value>,
    /// Last run (epoch millis)
    #[serde(default)]
    pub last_run_at: Option<i64>,
    /// Outcome of the last run
    #[serde(default)]
    pub last_result: Option<String>,
}

fn default_true() -> bool {
    true
}

impl CronJob {
    /// Label, falling back to name, then id.
    pub fn display_name(&self) -> &str {
        self.label
            .as_deref()
            .or(self.name.as_deref())
            .unwrap_or(&self.id)
    }
}

/// Decode a `cron.list` payload.
pub fn decode_cron_list(payload: Value) -> Result<CronJobList> {
    decode("cron.list", payload)
}

/// `cron.runs` result
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CronRunHistory {
    /// Runs, newest first as sent by the gateway
    pub entries: Vec<CronRunEntry>,
}

/// One job run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CronRunEntry {
    /// Run status
    #[serde(default = "default_status")]
    pub status: String,
    /// Start time (epoch millis)
    #[serde(default)]
    pub started_at: Option<i64>,
    /// Finish time (epoch millis)
    #[serde(default)]
    pub finished_at: Option<i64>,
    /// Failure description
    #[serde(default)]
    pub error: Option<String>,
}

fn default_status() -> String {
    "unknown".to_string()
}

/// Decode a `cron.runs` payload.
pub fn decode_cron_runs(payload: Value) -> Result<CronRunHistory> {
    decode("cron.runs", payload)
}

/// `health` result, combined with handshake metadata
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthStatus {
    /// Gateway reports itself healthy
    pub ok: bool,
    /// Gateway uptime from the handshake
    pub uptime_ms: Option<u64>,
    /// Gateway version from the handshake
    pub version: Option<String>,
    /// Channels that report link/config state (`None` when there are none)
    pub channels_total: Option<u32>,
    /// Channels currently linked (`None` when there are no channels)
    pub channels_connected: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct HealthPayload {
    ok: bool,
    channels: BTreeMap<String, Value>,
}

impl HealthStatus {
    /// Uptime as `"2d 5h"`, `"3h 12m"` or `"7m"`.
    pub fn uptime_display(&self) -> Option<String> {
        let secs = self.uptime_ms? / 1000;
        let days = secs / 86_400;
        let hours = (secs % 86_400) / 3_600;
        let minutes = (secs % 3_600) / 60;

        Some(if days > 0 {
            format!("{days}d {hours}h")
        } else if hours > 0 {
            format!("{hours}h {minutes}m")
        } else {
            format!("{minutes}m")
        })
    }
}

/// Decode a `health` reply.
pub fn decode_health(reply: CallReply) -> Result<HealthStatus> {
    let payload: HealthPayload = decode("health", reply.payload)?;

    let mut total = 0u32;
    let mut connected = 0u32;
    for channel in payload.channels.values() {
        let linked = channel.get("linked").and_then(Value::as_bool);
        let configured = channel.get("configured").and_then(Value::as_bool);
        if linked.is_none() && configured.is_none() {
            continue;
        }
        total += 1;
        if linked.or(configured).unwrap_or(false) {
            connected += 1;
        }
    }

    let (channels_total, channels_connected) = if total == 0 {
        (None, None)
    } else {
        (Some(total), Some(connected))
    };

    Ok(HealthStatus {
        ok: payload.ok,
        uptime_ms: reply.uptime_ms,
        version: reply.server_version,
        channels_total,
        channels_connected,
    })
}

/// `usage.cost` result
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageCost {
    /// Total spend in USD
    pub total_cost: f64,
    /// Total tokens
    pub total_tokens: u64,
    /// Input tokens
    pub input: u64,
    /// Output tokens
    pub output: u64,
    /// Cache-read tokens
    pub cache_read: u64,
    /// Cache-write tokens
    pub cache_write: u64,
    /// Window covered by the totals
    pub days: u32,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct UsagePayload {
    days: Option<u32>,
    totals: UsageTotals,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct UsageTotals {
    total_cost: f64,
    total_tokens: u64,
    input: u64,
    output: u64,
    cache_read: u64,
    cache_write: u64,
}

impl UsageCost {
    /// Cost as `"$12.45"`.
    pub fn formatted_cost(&self) -> String {
        format!("${:.2}", self.total_cost)
    }

    /// Token count as `"1.2M"`, `"12.3K"` or the plain number.
    pub fn formatted_tokens(&self) -> String {
        let tokens = self.total_tokens;
        if tokens >= 1_000_000 {
            format!("{:.1}M", tokens as f64 / 1_000_000.0)
        } else if tokens >= 1_000 {
            format!("{:.1}K", tokens as f64 / 1_000.0)
        } else {
            tokens.to_string()
        }
    }
}

/// Decode a `usage.cost` payload; `requested_days` fills a missing `days`.
pub fn decode_usage_cost(payload: Value, requested_days: u32) -> Result<UsageCost> {
    let payload: UsagePayload = decode("usage.cost", payload)?;
    let totals = payload.totals;

    Ok(UsageCost {
        total_cost: totals.total_cost,
        total_tokens: totals.total_tokens,
        input: totals.input,
        output: totals.output,
        cache_read: totals.cache_read,
        cache_write: totals.cache_write,
        days: payload.days.unwrap_or(requested_days),
    })
}
