//! Registry of custom-element definitions.

use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::RwLock;

use crate::driver::{Props, ViewOutput};
use crate::error::{Error, Result};
use crate::interactions::Interactions;

/// A custom element's definition function.
pub type DefinitionFn = Arc<dyn Fn(Interactions, Option<Props>) -> ViewOutput + Send + Sync>;

/// Named custom-element definitions, shared by a driver and every nested
/// driver it starts.
#[derive(Default)]
pub struct CustomElementRegistry {
    definitions: RwLock<IndexMap<String, DefinitionFn>>,
}

impl CustomElementRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `definition` under `tag`.
    ///
    /// Tags are case-insensitive and stored lower-cased. They must be
    /// non-empty and consist of ASCII alphanumerics, `-` and `_`.
    pub fn register<F>(&self, tag: &str, definition: F) -> Result<()>
    where
        F: Fn(Interactions, Option<Props>) -> ViewOutput + Send + Sync + 'static,
    {
        let tag = tag.trim().to_ascii_lowercase();
        let valid = !tag.is_empty()
            && tag.starts_with(|c: char| c.is_ascii_alphabetic())
            && tag
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(Error::InvalidCustomElementName(tag));
        }

        let mut definitions = self.definitions.write();
        if definitions.contains_key(&tag) {
            return Err(Error::DuplicateCustomElement(tag));
        }
        tracing::debug!(%tag, "registered custom element");
        definitions.insert(tag, Arc::new(definition));
        Ok(())
    }

    /// The definition registered under `tag`.
    pub fn get(&self, tag: &str) -> Option<DefinitionFn> {
        self.definitions
            .read()
            .get(&tag.to_ascii_lowercase())
            .map(Arc::clone)
    }

    /// Whether `tag` is registered.
    pub fn contains(&self, tag: &str) -> bool {
        self.definitions
            .read()
            .contains_key(&tag.to_ascii_lowercase())
    }

    /// Registered tags in registration order.
    pub fn tags(&self) -> Vec<String> {
        self.definitions.read().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.definitions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.read().is_empty()
    }
}

impl std::fmt::Debug for CustomElementRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CustomElementRegistry")
            .field("tags", &self.tags())
            .finish()
    }
}
