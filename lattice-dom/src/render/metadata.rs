//! Side table of custom-element metadata.
//!
//! Live elements carry no free-form properties, so the fact that an element
//! hosts a custom element is recorded here, keyed by [`NodeId`]. Entries
//! move with a root across replacement through [`MetadataTable::carry_forward`],
//! so a replaced root leaves nothing behind.

use std::sync::OnceLock;

use dashmap::DashMap;

use crate::dom::NodeId;

/// What the driver knows about an element hosting a custom element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomElementMetadata {
    /// Registered tag of the custom element.
    pub tag: String,
}

static TABLE: OnceLock<DashMap<NodeId, CustomElementMetadata>> = OnceLock::new();

fn table() -> &'static DashMap<NodeId, CustomElementMetadata> {
    TABLE.get_or_init(DashMap::new)
}

/// Metadata recorded for the element with the given id, if it hosts a
/// custom element.
pub fn custom_element_metadata(id: NodeId) -> Option<CustomElementMetadata> {
    MetadataTable::get(id)
}

/// Access to the global metadata table.
pub(crate) struct MetadataTable;

impl MetadataTable {
    pub(crate) fn insert(id: NodeId, metadata: CustomElementMetadata) {
        table().insert(id, metadata);
    }

    pub(crate) fn get(id: NodeId) -> Option<CustomElementMetadata> {
        table().get(&id).map(|entry| entry.value().clone())
    }

    pub(crate) fn remove(id: NodeId) -> Option<CustomElementMetadata> {
        table().remove(&id).map(|(_, metadata)| metadata)
    }

    #[cfg(test)]
    pub(crate) fn count_tagged(tag: &str) -> usize {
        table().iter().filter(|entry| entry.value().tag == tag).count()
    }

    /// Move the entry of `from` onto `to` when a root was replaced.
    pub(crate) fn carry_forward(from: NodeId, to: NodeId) {
        if from == to {
            return;
        }
        if let Some(metadata) = Self::remove(from) {
            tracing::trace!(
                from = from.raw(),
                to = to.raw(),
                tag = %metadata.tag,
                "carrying custom element metadata"
            );
            Self::insert(to, metadata);
        }
    }
}
