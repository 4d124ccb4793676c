//! Widget schema documentation shown by the `schema` command.

use super::response::WidgetType;

/// Published schema location
pub const SCHEMA_URL: &str = "https://raw.githubusercontent.com/851-labs/MoltbotWidgets/main/schema/widget.v1.json";

/// Overview of the response format, widget kinds, colors and icons
pub fn overview() -> String {
    format!(
        r#"Widget Schema Documentation
===========================

Your API endpoint should return JSON matching this schema.

Schema URL: {SCHEMA_URL}

Response Format
---------------
{{
  "type": "<widget-type>",
  "data": {{ ... }}
}}

Widget Types
------------
• status  - Service status, build results, alerts
• number  - Metrics, counts, KPIs
• gauge   - Percentages, progress, utilization
• list    - Recent items, activity feeds
• text    - Messages, notes, announcements

Use --type <type> for detailed schema of each type.

Colors
------
Named: red, orange, yellow, green, mint, teal, cyan, blue, indigo, purple, pink, brown, gray
Hex:   #RRGGBB (e.g., #22c55e)

Icons
-----
Any SF Symbol name (e.g., checkmark.circle.fill, server.rack)
Browse: https://developer.apple.com/sf-symbols/"#
    )
}

/// Example and field reference for one widget kind
pub fn type_doc(kind: WidgetType) -> &'static str {
    match kind {
        WidgetType::Status => STATUS_DOC,
        WidgetType::Number => NUMBER_DOC,
        WidgetType::Gauge => GAUGE_DOC,
        WidgetType::List => LIST_DOC,
        WidgetType::Text => TEXT_DOC,
    }
}

/// Minimal JSON schema for the response envelope
pub fn json_schema() -> serde_json::Value {
    let kinds: Vec<&str> = WidgetType::ALL.iter().map(WidgetType::name).collect();
    serde_json::json!({
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "$id": SCHEMA_URL,
        "title": "Moltbot Widget Response",
        "type": "object",
        "required": ["type", "data"],
        "properties": {
            "type": { "type": "string", "enum": kinds },
            "data": { "type": "object" }
        }
    })
}

const STATUS_DOC: &str = r#"Status Widget
=============

Best for: service status, build results, alerts

Example:
{
  "type": "status",
  "data": {
    "icon": "checkmark.circle.fill",
    "iconColor": "green",
    "title": "API Server",
    "subtitle": "us-east-1",
    "value": "Healthy",
    "footer": "99.9% uptime"
  }
}

Fields:
• title      (required)  string, max 50 chars
• icon       (optional)  SF Symbol name
• iconColor  (optional)  color value
• subtitle   (optional)  string, max 100 chars
• value      (optional)  string, max 20 chars
• footer     (optional)  string, max 50 chars"#;

const NUMBER_DOC: &str = r#"Number Widget
=============

Best for: metrics, counts, KPIs

Example:
{
  "type": "number",
  "data": {
    "icon": "arrow.triangle.pull",
    "iconColor": "purple",
    "value": 12,
    "unit": "PRs",
    "label": "Open Pull Requests",
    "trend": "up",
    "trendValue": "+3"
  }
}

Fields:
• value       (required)  string or number
• icon        (optional)  SF Symbol name
• iconColor   (optional)  color value
• unit        (optional)  string, max 10 chars
• label       (optional)  string, max 30 chars
• trend       (optional)  "up", "down", or "neutral"
• trendValue  (optional)  string, max 10 chars"#;

const GAUGE_DOC: &str = r#"Gauge Widget
============

Best for: percentages, progress, utilization

Example:
{
  "type": "gauge",
  "data": {
    "value": 73,
    "max": 100,
    "label": "CPU Usage",
    "color": "orange",
    "showPercentage": true
  }
}

Fields:
• value           (required)  number
• max             (required)  number
• label           (optional)  string, max 30 chars
• color           (optional)  color value
• showPercentage  (optional)  boolean, default true"#;

const LIST_DOC: &str = r#"List Widget
===========

Best for: recent items, top N, activity feeds

Example:
{
  "type": "list",
  "data": {
    "title": "Recent Deploys",
    "items": [
      { "icon": "checkmark.circle.fill", "iconColor": "green", "title": "v2.3.1", "subtitle": "10 min ago" },
      { "icon": "xmark.circle.fill", "iconColor": "red", "title": "v2.3.0", "value": "Failed" }
    ]
  }
}

Fields:
• items  (required)  array, max 5 items
• title  (optional)  string, max 30 chars

Item Fields:
• title     (required)  string, max 50 chars
• icon      (optional)  SF Symbol name
• iconColor (optional)  color value
• subtitle  (optional)  string, max 50 chars
• value     (optional)  string, max 15 chars"#;

const TEXT_DOC: &str = r#"Text Widget
===========

Best for: messages, notes, announcements

Example:
{
  "type": "text",
  "data": {
    "title": "Daily Standup",
    "body": "Working on the widgets feature. Should be done by EOD.",
    "footer": "Updated 5 min ago"
  }
}

Fields:
• body    (required)  string, max 280 chars
• title   (optional)  string, max 30 chars
• footer  (optional)  string, max 50 chars"#;
