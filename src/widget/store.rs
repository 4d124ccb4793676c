//! JSON file store for custom widget configurations.
//!
//! The file lives in the widget app's group container so the desktop
//! extension and the CLI read the same list:
//!
//! ```text
//! ~/Library/Group Containers/group.com.moltbot.widgets/custom-widgets.json
//! ```
//!
//! Every mutation is a full load, modify, save cycle. A missing file reads
//! as an empty list; an unreadable one is an error so that a later save
//! never clobbers it.

use std::path::{Path, PathBuf};

use super::config::{timestamp_now, CustomWidgetConfig, CustomWidgetsFile};
use crate::error::{MoltbotError, Result};

/// Shared container identifier
pub const APP_GROUP_ID: &str = "group.com.moltbot.widgets";

/// Config file name inside the container
pub const CONFIG_FILE_NAME: &str = "custom-widgets.json";

/// Widget configuration store backed by one JSON file
#[derive(Debug, Clone)]
pub struct WidgetConfigStore {
    path: PathBuf,
}

impl WidgetConfigStore {
    /// Store at an explicit path
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store at the shared container location under the user's home
    pub fn default_location() -> Result<Self> {
        let home = dirs::home_dir()
            .ok_or_else(|| MoltbotError::Config("Cannot determine home directory".to_string()))?;
        Ok(Self::new(Self::default_path(&home)))
    }

    /// Shared container config path for a given home directory
    pub fn default_path(home: &Path) -> PathBuf {
        home.join("Library")
            .join("Group Containers")
            .join(APP_GROUP_ID)
            .join(CONFIG_FILE_NAME)
    }

    /// Backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the whole file; missing file yields an empty list
    pub fn load(&self) -> Result<CustomWidgetsFile> {
        if !self.path.exists() {
            return Ok(CustomWidgetsFile::default());
        }

        let content = std::fs::read_to_string(&self.path)?;
        serde_json::from_str(&content).map_err(|e| {
            MoltbotError::Config(format!("Failed to parse {}: {e}", self.path.display()))
        })
    }

    /// All configured widgets
    pub fn load_widgets(&self) -> Result<Vec<CustomWidgetConfig>> {
        Ok(self.load()?.widgets)
    }

    /// Widget with this exact id
    pub fn get_by_id(&self, id: &str) -> Result<Option<CustomWidgetConfig>> {
        Ok(self.load_widgets()?.into_iter().find(|w| w.id == id))
    }

    /// Widget with this name, ignoring case
    pub fn get_by_name(&self, name: &str) -> Result<Option<CustomWidgetConfig>> {
        Ok(self
            .load_widgets()?
            .into_iter()
            .find(|w| w.name.to_lowercase() == name.to_lowercase()))
    }

    /// Look up by id first, then by name
    pub fn find(&self, id_or_name: &str) -> Result<CustomWidgetConfig> {
        if let Some(widget) = self.get_by_id(id_or_name)? {
            return Ok(widget);
        }
        self.get_by_name(id_or_name)?
            .ok_or_else(|| MoltbotError::WidgetNotFound(id_or_name.to_string()))
    }

    /// Write the file as pretty JSON with sorted keys, creating parent directories
    pub fn save(&self, file: &CustomWidgetsFile) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        // Value maps are ordered by key.
        let value = serde_json::to_value(file)?;
        let json = serde_json::to_string_pretty(&value)?;
        std::fs::write(&self.path, json)?;

        tracing::debug!("Saved {} widgets to {}", file.widgets.len(), self.path.display());
        Ok(())
    }

    /// Append a widget; its name must be unique ignoring case
    pub fn add(&self, widget: CustomWidgetConfig) -> Result<()> {
        let mut file = self.load()?;

        if file.widgets.iter().any(|w| same_name(&w.name, &widget.name)) {
            return Err(MoltbotError::DuplicateName(widget.name));
        }

        file.widgets.push(widget);
        self.save(&file)
    }

    /// Replace the widget with the same id, stamping `updated_at`
    pub fn update(&self, widget: CustomWidgetConfig) -> Result<CustomWidgetConfig> {
        let mut file = self.load()?;

        let index = file
            .widgets
            .iter()
            .position(|w| w.id == widget.id)
            .ok_or_else(|| MoltbotError::WidgetNotFound(widget.id.clone()))?;

        if file
            .widgets
            .iter()
            .any(|w| w.id != widget.id && same_name(&w.name, &widget.name))
        {
            return Err(MoltbotError::DuplicateName(widget.name));
        }

        let mut updated = widget;
        updated.updated_at = timestamp_now();
        file.widgets[index] = updated.clone();
        self.save(&file)?;

        Ok(updated)
    }

    /// Remove the widget with this id
    pub fn delete(&self, id: &str) -> Result<()> {
        let mut file = self.load()?;

        let before = file.widgets.len();
        file.widgets.retain(|w| w.id != id);
        if file.widgets.len() == before {
            return Err(MoltbotError::WidgetNotFound(id.to_string()));
        }

        self.save(&file)
    }
}

fn same_name(a: &str, b: &str) -> bool {
    a.to_lowercase() == b.to_lowercase()
}
