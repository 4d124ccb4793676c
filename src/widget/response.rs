//! Widget response schema.
//!
//! A widget endpoint returns `{"type": <kind>, "data": {...}}` where the
//! kind selects the shape of `data`.

use serde::{Deserialize, Serialize};

/// Root response from a widget endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "lowercase")]
pub enum WidgetResponse {
    /// Service status, build results, alerts
    Status(StatusWidgetData),
    /// Metrics, counts, KPIs
    Number(NumberWidgetData),
    /// Percentages, progress, utilization
    Gauge(GaugeWidgetData),
    /// Recent items, activity feeds
    List(ListWidgetData),
    /// Messages, notes, announcements
    Text(TextWidgetData),
}

impl WidgetResponse {
    /// Widget kind of this response
    pub fn kind(&self) -> WidgetType {
        match self {
            Self::Status(_) => WidgetType::Status,
            Self::Number(_) => WidgetType::Number,
            Self::Gauge(_) => WidgetType::Gauge,
            Self::List(_) => WidgetType::List,
            Self::Text(_) => WidgetType::Text,
        }
    }

    /// One-line `key: value` summary rows for terminal output
    pub fn summary(&self) -> Vec<(&'static str, String)> {
        let mut rows = Vec::new();
        match self {
            Self::Status(data) => {
                rows.push(("title", data.title.clone()));
                if let Some(value) = &data.value {
                    rows.push(("value", value.clone()));
                }
            },
            Self::Number(data) => {
                rows.push(("value", data.value.display_string()));
                if let Some(label) = &data.label {
                    rows.push(("label", label.clone()));
                }
            },
            Self::Gauge(data) => {
                rows.push(("value", format!("{} / {}", data.value, data.max)));
                if let Some(label) = &data.label {
                    rows.push(("label", label.clone()));
                }
            },
            Self::List(data) => {
                rows.push(("items", data.items.len().to_string()));
                if let Some(title) = &data.title {
                    rows.push(("title", title.clone()));
                }
            },
            Self::Text(data) => {
                if let Some(title) = &data.title {
                    rows.push(("title", title.clone()));
                }
                let body: String = data.body.chars().take(50).collect();
                let ellipsis = if data.body.chars().count() > 50 { "..." } else { "" };
                rows.push(("body", format!("{body}{ellipsis}")));
            },
        }
        rows
    }
}

/// Widget kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WidgetType {
    /// Status widget
    Status,
    /// Number widget
    Number,
    /// Gauge widget
    Gauge,
    /// List widget
    List,
    /// Text widget
    Text,
}

impl WidgetType {
    /// All kinds, in documentation order
    pub const ALL: [WidgetType; 5] = [
        WidgetType::Status,
        WidgetType::Number,
        WidgetType::Gauge,
        WidgetType::List,
        WidgetType::Text,
    ];

    /// Wire name
    pub fn name(&self) -> &'static str {
        match self {
            Self::Status => "status",
            Self::Number => "number",
            Self::Gauge => "gauge",
            Self::List => "list",
            Self::Text => "text",
        }
    }
}

impl std::fmt::Display for WidgetType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for WidgetType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.name() == s.to_lowercase())
            .ok_or_else(|| format!("Unknown widget type: {s}"))
    }
}

/// Status widget data
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusWidgetData {
    /// SF Symbol name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    /// Icon color
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon_color: Option<String>,
    /// Title
    pub title: String,
    /// Subtitle
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,
    /// Value
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    /// Footer
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub footer: Option<String>,
}

/// Number widget data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NumberWidgetData {
    /// SF Symbol name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    /// Icon color
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon_color: Option<String>,
    /// Displayed value
    pub value: NumberValue,
    /// Unit
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    /// Label
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Trend arrow
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trend: Option<TrendDirection>,
    /// Trend text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trend_value: Option<String>,
}

/// Number widget value: integer, double or preformatted string
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NumberValue {
    /// Integer
    Int(i64),
    /// Floating point
    Double(f64),
    /// Preformatted text
    String(String),
}

impl NumberValue {
    /// Display text; integral doubles drop the fraction, others show two decimals
    pub fn display_string(&self) -> String {
        match self {
            Self::Int(value) => value.to_string(),
            Self::Double(value) if value.fract() == 0.0 && value.is_finite() => {
                format!("{value:.0}")
            },
            Self::Double(value) => format!("{value:.2}"),
            Self::String(value) => value.clone(),
        }
    }
}

/// Trend direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    /// Up
    Up,
    /// Down
    Down,
    /// Flat
    Neutral,
}

/// Gauge widget data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GaugeWidgetData {
    /// Current value
    pub value: f64,
    /// Maximum value
    pub max: f64,
    /// Label
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Gauge color
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    /// Show the percentage text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub show_percentage: Option<bool>,
}

impl GaugeWidgetData {
    /// Fill percentage clamped to 0–100; 0 when `max` is not positive
    pub fn percentage(&self) -> f64 {
        if self.max <= 0.0 {
            return 0.0;
        }
        (self.value / self.max * 100.0).clamp(0.0, 100.0)
    }
}

/// List widget data
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListWidgetData {
    /// Title
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Items
    pub items: Vec<ListWidgetItem>,
}

/// One list row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListWidgetItem {
    /// SF Symbol name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    /// Icon color
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon_color: Option<String>,
    /// Title
    pub title: String,
    /// Subtitle
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,
    /// Value
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

/// Text widget data
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextWidgetData {
    /// Title
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Body text
    pub body: String,
    /// Footer
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub footer: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_status() {
        let response: WidgetResponse = serde_json::from_str(
            r#"{"type":"status","data":{"icon":"server.rack","iconColor":"green","title":"API","value":"Healthy"}}"#,
        )
        .unwrap();

        assert_eq!(response.kind(), WidgetType::Status);
        let WidgetResponse::Status(data) = &response else {
            panic!("expected status");
        };
        assert_eq!(data.icon_color.as_deref(), Some("green"));
        assert_eq!(
            response.summary(),
            vec![("title", "API".to_string()), ("value", "Healthy".to_string())]
        );
    }

    #[test]
    fn test_number_values() {
        let int: NumberValue = serde_json::from_str("12").unwrap();
        assert_eq!(int, NumberValue::Int(12));
        assert_eq!(int.display_string(), "12");

        let double: NumberValue = serde_json::from_str("3.14159").unwrap();
        assert_eq!(double.display_string(), "3.14");

        assert_eq!(NumberValue::Double(42.0).display_string(), "42");

        let text: NumberValue = serde_json::from_str(r#""N/A""#).unwrap();
        assert_eq!(text.display_string(), "N/A");
    }

    #[test]
    fn test_number_requires_value() {
        let result: Result<WidgetResponse, _> =
            serde_json::from_str(r#"{"type":"number","data":{"label":"PRs"}}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_gauge_percentage() {
        let gauge = GaugeWidgetData {
            value: 73.0,
            max: 100.0,
            label: None,
            color: None,
            show_percentage: None,
        };
        assert_eq!(gauge.percentage(), 73.0);

        let over = GaugeWidgetData { value: 150.0, ..gauge.clone() };
        assert_eq!(over.percentage(), 100.0);

        let zero_max = GaugeWidgetData { max: 0.0, ..gauge };
        assert_eq!(zero_max.percentage(), 0.0);
    }

    #[test]
    fn test_text_summary_truncates() {
        let response = WidgetResponse::Text(TextWidgetData {
            title: None,
            body: "x".repeat(60),
            footer: None,
        });
        let rows = response.summary();
        assert_eq!(rows[0].1, format!("{}...", "x".repeat(50)));
    }

    #[test]
    fn test_unknown_type_rejected() {
        let result: Result<WidgetResponse, _> =
            serde_json::from_str(r#"{"type":"chart","data":{}}"#);
        assert!(result.is_err());
        assert!("chart".parse::<WidgetType>().is_err());
        assert_eq!("Gauge".parse::<WidgetType>().unwrap(), WidgetType::Gauge);
    }
}
