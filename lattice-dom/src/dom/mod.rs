//! Live Document
//!
//! This module implements the live document the driver renders into: element
//! and text nodes with parent links, attributes and class lists, a CSS
//! selector subset for queries, and bubbling events.
//!
//! # Ownership
//!
//! Nodes are reference counted handles. A parent owns its children; a child
//! only holds a weak link back to its parent, so detaching a subtree frees it
//! once the last handle is dropped. Handles compare equal when they point at
//! the same node.
//!
//! # Identity
//!
//! Every node gets a [`NodeId`] at creation. The id never changes and is the
//! key used by out-of-band side tables such as the custom-element metadata
//! table.

mod element;
mod event;
mod selector;

pub use element::{Document, Element, ListenerId, Node, NodeId, Text};
pub use event::Event;
pub use selector::Selector;
