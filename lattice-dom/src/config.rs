//! Driver configuration.
//!
//! Configuration is a plain serde struct so hosts can ship it alongside the
//! rest of their settings. Every field has a default; a partial JSON object
//! only overrides the fields it names.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Class prefix marking an element as the mount point of a custom element.
pub const DEFAULT_CUSTOM_ELEMENT_CLASS_PREFIX: &str = "cycleCustomElement-";

/// Tag of the element the driver mounts inside a plain container.
pub const DEFAULT_ROOT_TAG: &str = "div";

/// Settings shared by a driver and every custom element rendered under it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriverConfig {
    /// Containers carrying a class with this prefix (followed by a name) are
    /// rendered into directly instead of receiving a fresh child element.
    pub custom_element_class_prefix: String,

    /// Tag used for freshly mounted root elements and custom-element hosts.
    pub root_tag: String,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            custom_element_class_prefix: DEFAULT_CUSTOM_ELEMENT_CLASS_PREFIX.to_owned(),
            root_tag: DEFAULT_ROOT_TAG.to_owned(),
        }
    }
}

impl DriverConfig {
    /// Parse and validate a configuration from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check that the configuration can drive a render.
    pub fn validate(&self) -> Result<()> {
        if self.custom_element_class_prefix.trim().is_empty() {
            return Err(Error::Config(
                "custom_element_class_prefix must not be empty".into(),
            ));
        }
        if self.custom_element_class_prefix.contains(char::is_whitespace) {
            return Err(Error::Config(
                "custom_element_class_prefix must be a single class token".into(),
            ));
        }
        if self.root_tag.is_empty()
            || !self.root_tag.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
        {
            return Err(Error::Config(format!("invalid root_tag '{}'", self.root_tag)));
        }
        Ok(())
    }

    /// The marker class for a custom element with the given tag.
    pub fn custom_element_class(&self, tag: &str) -> String {
        format!("{}{}", self.custom_element_class_prefix, tag)
    }

    /// Whether a class list contains a custom-element marker class.
    pub fn is_custom_element_mount(&self, class_name: &str) -> bool {
        let prefix = self.custom_element_class_prefix.as_str();
        class_name
            .split_whitespace()
            .any(|class| class.len() > prefix.len() && class.starts_with(prefix))
    }
}
