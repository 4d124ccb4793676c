//! HTTP fetch of custom widget data.

use std::time::Duration;

use base64::Engine as _;
use reqwest::header::AUTHORIZATION;
use reqwest::{Client, Url};

use super::config::{CustomWidgetConfig, WidgetAuth};
use super::response::WidgetResponse;
use crate::error::{MoltbotError, Result};

/// Default request timeout
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Fetches widget responses over HTTP, applying the widget's auth
#[derive(Debug, Clone)]
pub struct WidgetFetcher {
    client: Client,
}

impl WidgetFetcher {
    /// Fetcher with the default timeout
    pub fn new() -> Result<Self> {
        Self::with_timeout(DEFAULT_FETCH_TIMEOUT)
    }

    /// Fetcher with a custom request timeout
    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| MoltbotError::Network(format!("Failed to create HTTP client: {e}")))?;
        Ok(Self { client })
    }

    /// Fetch and decode the response for a stored widget
    pub async fn fetch(&self, config: &CustomWidgetConfig) -> Result<WidgetResponse> {
        let (_, response) = self.fetch_raw(&config.url, config.auth.as_ref()).await?;
        Ok(response)
    }

    /// Fetch a URL, returning the raw body alongside the decoded response
    pub async fn fetch_raw(&self, url: &str, auth: Option<&WidgetAuth>) -> Result<(String, WidgetResponse)> {
        let url = build_url(url, auth)?;
        tracing::debug!("Fetching widget data from {}", url.host_str().unwrap_or_default());

        let mut request = self.client.get(url);
        match auth {
            Some(WidgetAuth::Header { headers }) => {
                for (key, value) in headers {
                    request = request.header(key.as_str(), value.as_str());
                }
            },
            Some(WidgetAuth::Basic { username, password }) => {
                request = request.header(AUTHORIZATION, basic_credentials(username, password));
            },
            Some(WidgetAuth::Query { .. }) | None => {},
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            tracing::warn!("Widget endpoint returned {}", status);
            return Err(MoltbotError::Http(status.as_u16()));
        }

        let body = response.text().await?;
        let widget = serde_json::from_str(&body).map_err(|e| MoltbotError::InvalidJson(e.to_string()))?;
        Ok((body, widget))
    }
}

/// Parse the URL and append query auth parameters
fn build_url(url: &str, auth: Option<&WidgetAuth>) -> Result<Url> {
    let mut url = Url::parse(url).map_err(|e| MoltbotError::InvalidUrl(format!("{url}: {e}")))?;

    if let Some(WidgetAuth::Query { params }) = auth {
        let mut pairs = url.query_pairs_mut();
        for (key, value) in params {
            pairs.append_pair(key, value);
        }
    }

    Ok(url)
}

/// `Basic <base64(user:pass)>`
fn basic_credentials(username: &str, password: &str) -> String {
    let encoded = base64::engine::general_purpose::STANDARD.encode(format!("{username}:{password}"));
    format!("Basic {encoded}")
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    #[test]
    fn test_build_url_appends_query_auth() {
        let auth = WidgetAuth::Query {
            params: BTreeMap::from([("api_key".to_string(), "x y".to_string())]),
        };
        let url = build_url("https://example.com/w?existing=1", Some(&auth)).unwrap();
        assert_eq!(url.as_str(), "https://example.com/w?existing=1&api_key=x+y");

        let plain = build_url("https://example.com/w", None).unwrap();
        assert_eq!(plain.query(), None);
    }

    #[test]
    fn test_build_url_invalid() {
        assert!(matches!(build_url("not a url", None), Err(MoltbotError::InvalidUrl(_))));
    }

    #[test]
    fn test_basic_credentials() {
        assert_eq!(basic_credentials("user", "pass"), "Basic dXNlcjpwYXNz");
    }
}
