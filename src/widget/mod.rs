//! Custom widgets backed by arbitrary HTTP endpoints.
//!
//! A custom widget is a named URL (plus optional auth) that returns a
//! [`WidgetResponse`]. Configurations are kept in a JSON file shared with
//! the desktop extension ([`WidgetConfigStore`]) and fetched with
//! [`WidgetFetcher`].
//!
//! ```rust,ignore
//! use moltbot_widgets::widget::{CustomWidgetConfig, WidgetConfigStore, WidgetFetcher};
//!
//! let store = WidgetConfigStore::default_location()?;
//! store.add(CustomWidgetConfig::new("CPU", "https://example.com/cpu"))?;
//!
//! let fetcher = WidgetFetcher::new()?;
//! for widget in store.load_widgets()? {
//!     let response = fetcher.fetch(&widget).await?;
//!     println!("{}: {}", widget.name, response.kind());
//! }
//! ```

pub mod config;
pub mod fetch;
pub mod response;
pub mod schema;
pub mod store;

pub use config::{CustomWidgetConfig, CustomWidgetsFile, WidgetAuth, DEFAULT_INTERVAL_MINUTES};
pub use fetch::WidgetFetcher;
pub use response::{
    GaugeWidgetData, ListWidgetData, ListWidgetItem, NumberValue, NumberWidgetData, StatusWidgetData,
    TextWidgetData, TrendDirection, WidgetResponse, WidgetType,
};
pub use store::WidgetConfigStore;
