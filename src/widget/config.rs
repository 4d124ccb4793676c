//! Stored widget configuration model.

use std::collections::BTreeMap;

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{MoltbotError, Result};

/// Current config file format version
pub const CONFIG_FILE_VERSION: u32 = 1;

/// Default refresh interval in minutes
pub const DEFAULT_INTERVAL_MINUTES: u32 = 5;

/// A custom widget: where to fetch its data and how to authenticate
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomWidgetConfig {
    /// Stable identifier (uppercase UUID)
    pub id: String,
    /// Display name, unique case-insensitively
    pub name: String,
    /// Endpoint returning a widget response
    pub url: String,
    /// Request authentication
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth: Option<WidgetAuth>,
    /// Refresh interval in minutes
    #[serde(default = "default_interval")]
    pub interval_minutes: u32,
    /// Creation time
    #[serde(with = "whole_seconds")]
    pub created_at: DateTime<Utc>,
    /// Last modification time
    #[serde(with = "whole_seconds")]
    pub updated_at: DateTime<Utc>,
}

/// Current time truncated to whole seconds, the precision the file keeps.
pub fn timestamp_now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(0)
}

/// RFC 3339 at second precision (`2025-01-02T03:04:05Z`).
///
/// The desktop extension decodes plain ISO 8601 and rejects fractional seconds.
mod whole_seconds {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_rfc3339_opts(SecondsFormat::Secs, true))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let text = String::deserialize(deserializer)?;
        DateTime::parse_from_rfc3339(&text)
            .map(|t| t.with_timezone(&Utc))
            .map_err(serde::de::Error::custom)
    }
}

fn default_interval() -> u32 {
    DEFAULT_INTERVAL_MINUTES
}

impl CustomWidgetConfig {
    /// Create a widget with a fresh id and timestamps
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        let now = timestamp_now();
        Self {
            id: uuid::Uuid::new_v4().to_string().to_uppercase(),
            name: name.into(),
            url: url.into(),
            auth: None,
            interval_minutes: DEFAULT_INTERVAL_MINUTES,
            created_at: now,
            updated_at: now,
        }
    }

    /// Set authentication
    pub fn with_auth(mut self, auth: Option<WidgetAuth>) -> Self {
        self.auth = auth;
        self
    }

    /// Set refresh interval
    pub fn with_interval(mut self, minutes: u32) -> Self {
        self.interval_minutes = minutes;
        self
    }
}

/// Authentication applied to widget requests
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum WidgetAuth {
    /// Extra HTTP headers
    Header {
        /// Header name to value
        headers: BTreeMap<String, String>,
    },
    /// HTTP basic authentication
    Basic {
        /// User name
        username: String,
        /// Password
        password: String,
    },
    /// Query parameters appended to the URL
    Query {
        /// Parameter name to value
        params: BTreeMap<String, String>,
    },
}

impl WidgetAuth {
    /// Build auth from CLI flags.
    ///
    /// Basic auth (`user:pass`) wins over headers (`Key: Value`), which win
    /// over query parameters (`key=value`). Returns `None` when no flag is set.
    pub fn from_cli(headers: &[String], basic: Option<&str>, query: &[String]) -> Result<Option<Self>> {
        if let Some(basic) = basic {
            let (username, password) = basic.split_once(':').ok_or_else(|| {
                MoltbotError::Config("Basic auth must be in format 'username:password'".to_string())
            })?;
            return Ok(Some(Self::Basic {
                username: username.to_string(),
                password: password.to_string(),
            }));
        }

        if !headers.is_empty() {
            let mut map = BTreeMap::new();
            for header in headers {
                let (key, value) = header.split_once(':').ok_or_else(|| {
                    MoltbotError::Config(format!("Invalid header format: {header} (expected 'Key: Value')"))
                })?;
                map.insert(key.trim().to_string(), value.trim().to_string());
            }
            return Ok(Some(Self::Header { headers: map }));
        }

        if !query.is_empty() {
            let mut map = BTreeMap::new();
            for param in query {
                let (key, value) = param.split_once('=').ok_or_else(|| {
                    MoltbotError::Config(format!("Invalid query format: {param} (expected 'key=value')"))
                })?;
                map.insert(key.to_string(), value.to_string());
            }
            return Ok(Some(Self::Query { params: map }));
        }

        Ok(None)
    }

    /// Short label for listings
    pub fn describe(&self) -> String {
        match self {
            Self::Header { headers } => format!("Headers ({})", headers.len()),
            Self::Basic { .. } => "Basic Auth".to_string(),
            Self::Query { params } => format!("Query Params ({})", params.len()),
        }
    }
}

/// Root of the widget config file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomWidgetsFile {
    /// Format version
    pub version: u32,
    /// Configured widgets
    #[serde(default)]
    pub widgets: Vec<CustomWidgetConfig>,
}

impl Default for CustomWidgetsFile {
    fn default() -> Self {
        Self {
            version: CONFIG_FILE_VERSION,
            widgets: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn test_new_widget() {
        let widget = CustomWidgetConfig::new("Deploys", "https://example.com/w");
        assert_eq!(widget.interval_minutes, 5);
        assert_eq!(widget.id, widget.id.to_uppercase());
        assert_eq!(widget.created_at, widget.updated_at);
        assert!(widget.auth.is_none());
    }

    #[test]
    fn test_auth_from_cli_precedence() {
        let auth = WidgetAuth::from_cli(&strings(&["X-Key: 1"]), Some("me:secret"), &strings(&["k=v"]))
            .unwrap();
        assert_eq!(
            auth,
            Some(WidgetAuth::Basic {
                username: "me".to_string(),
                password: "secret".to_string()
            })
        );

        let auth = WidgetAuth::from_cli(&strings(&["Authorization: Bearer abc"]), None, &strings(&["k=v"]))
            .unwrap();
        let Some(WidgetAuth::Header { headers }) = auth else {
            panic!("expected header auth");
        };
        assert_eq!(headers.get("Authorization").map(String::as_str), Some("Bearer abc"));

        let auth = WidgetAuth::from_cli(&[], None, &strings(&["api_key=a=b"])).unwrap();
        let Some(WidgetAuth::Query { params }) = auth else {
            panic!("expected query auth");
        };
        assert_eq!(params.get("api_key").map(String::as_str), Some("a=b"));

        assert_eq!(WidgetAuth::from_cli(&[], None, &[]).unwrap(), None);
    }

    #[test]
    fn test_auth_from_cli_rejects_malformed() {
        assert!(WidgetAuth::from_cli(&[], Some("nocolon"), &[]).is_err());
        assert!(WidgetAuth::from_cli(&strings(&["NoColon"]), None, &[]).is_err());
        assert!(WidgetAuth::from_cli(&[], None, &strings(&["noequals"])).is_err());
    }

    #[test]
    fn test_auth_wire_format() {
        let auth: WidgetAuth =
            serde_json::from_str(r#"{"type":"basic","username":"u","password":"p"}"#).unwrap();
        assert_eq!(auth.describe(), "Basic Auth");

        let json = serde_json::to_value(WidgetAuth::Query {
            params: BTreeMap::from([("token".to_string(), "x".to_string())]),
        })
        .unwrap();
        assert_eq!(json["type"], "query");
        assert_eq!(json["params"]["token"], "x");

        assert!(serde_json::from_str::<WidgetAuth>(r#"{"type":"oauth"}"#).is_err());
    }

    #[test]
    fn test_widget_file_format() {
        let json = r#"{
            "version": 1,
            "widgets": [{
                "id": "ABC",
                "name": "CPU",
                "url": "http://localhost/cpu",
                "createdAt": "2025-01-02T03:04:05Z",
                "updatedAt": "2025-01-02T03:04:05Z"
            }]
        }"#;
        let file: CustomWidgetsFile = serde_json::from_str(json).unwrap();
        assert_eq!(file.version, 1);
        assert_eq!(file.widgets[0].interval_minutes, 5);
        assert_eq!(file.widgets[0].created_at.to_rfc3339(), "2025-01-02T03:04:05+00:00");
    }

    #[test]
    fn test_timestamps_written_without_fraction() {
        let widget = CustomWidgetConfig::new("CPU", "http://localhost/cpu");
        let json = serde_json::to_value(&widget).unwrap();

        let created = json["createdAt"].as_str().unwrap();
        assert!(!created.contains('.'), "{created}");
        assert!(created.ends_with('Z'), "{created}");
        assert!(!json["updatedAt"].as_str().unwrap().contains('.'));

        let back: CustomWidgetConfig = serde_json::from_value(json).unwrap();
        assert_eq!(back, widget);
    }

    #[test]
    fn test_fractional_timestamps_still_read() {
        let json = r#"{"id":"A","name":"n","url":"u",
            "createdAt":"2025-01-02T03:04:05.123Z","updatedAt":"2025-01-02T03:04:05+02:00"}"#;
        let widget: CustomWidgetConfig = serde_json::from_str(json).unwrap();
        assert_eq!(widget.created_at.timestamp_subsec_millis(), 123);
        assert_eq!(widget.updated_at.to_rfc3339(), "2025-01-02T01:04:05+00:00");
    }
}
