//! Tree comparison.

use std::sync::Arc;

use super::node::{VElement, VirtualNode};
use super::widget::Widget;

/// The changes that turn the DOM rendered from one tree into the DOM for
/// the next.
#[derive(Debug, Clone)]
pub struct Patch {
    pub root: NodePatch,
}

impl Patch {
    /// Whether applying the patch would touch the DOM at all.
    pub fn is_empty(&self) -> bool {
        self.root.is_keep()
    }
}

/// Changes to a single node.
#[derive(Debug, Clone)]
pub enum NodePatch {
    /// Nothing changed.
    Keep,
    /// The node must be rebuilt from `next`.
    Replace {
        previous: VirtualNode,
        next: VirtualNode,
    },
    /// A text node's content changed.
    Text(String),
    /// A widget takes over the element of a widget with the same name.
    Widget {
        previous: Arc<dyn Widget>,
        next: Arc<dyn Widget>,
    },
    /// An element kept its tag; attributes and children changed.
    Element {
        attributes: Vec<AttributeChange>,
        children: Vec<ChildPatch>,
    },
}

impl NodePatch {
    /// Whether this is [`NodePatch::Keep`].
    pub fn is_keep(&self) -> bool {
        matches!(self, NodePatch::Keep)
    }
}

/// A single attribute edit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttributeChange {
    Set(String, String),
    Remove(String),
}

/// A change to one child position.
///
/// Updates come first in ascending index order, removals follow in
/// descending index order, appends come last.
#[derive(Debug, Clone)]
pub enum ChildPatch {
    Update { index: usize, patch: NodePatch },
    Remove { index: usize, previous: VirtualNode },
    Append(VirtualNode),
}

/// Compare two trees.
pub fn diff(previous: &VirtualNode, next: &VirtualNode) -> Patch {
    Patch {
        root: diff_node(previous, next),
    }
}

fn diff_node(previous: &VirtualNode, next: &VirtualNode) -> NodePatch {
    match (previous, next) {
        (VirtualNode::Text(old), VirtualNode::Text(new)) => {
            if old == new {
                NodePatch::Keep
            } else {
                NodePatch::Text(new.clone())
            }
        }
        (VirtualNode::Element(old), VirtualNode::Element(new))
            if old.tag() == new.tag() && old.namespace_uri() == new.namespace_uri() =>
        {
            diff_element(old, new)
        }
        (VirtualNode::Widget(old), VirtualNode::Widget(new)) if old.name() == new.name() => {
            if Arc::ptr_eq(old, new) {
                NodePatch::Keep
            } else {
                NodePatch::Widget {
                    previous: Arc::clone(old),
                    next: Arc::clone(new),
                }
            }
        }
        _ => NodePatch::Replace {
            previous: previous.clone(),
            next: next.clone(),
        },
    }
}

fn diff_element(previous: &VElement, next: &VElement) -> NodePatch {
    let mut attributes = Vec::new();
    for (name, value) in next.attributes() {
        if previous.attribute(name) != Some(value.as_str()) {
            attributes.push(AttributeChange::Set(name.clone(), value.clone()));
        }
    }
    for name in previous.attributes().keys() {
        if !next.attributes().contains_key(name) {
            attributes.push(AttributeChange::Remove(name.clone()));
        }
    }

    let old_children = previous.child_nodes();
    let new_children = next.child_nodes();
    let shared = old_children.len().min(new_children.len());

    let mut children = Vec::new();
    for (index, (old, new)) in old_children.iter().zip(new_children).enumerate() {
        let patch = diff_node(old, new);
        if !patch.is_keep() {
            children.push(ChildPatch::Update { index, patch });
        }
    }
    for index in (shared..old_children.len()).rev() {
        children.push(ChildPatch::Remove {
            index,
            previous: old_children[index].clone(),
        });
    }
    for child in &new_children[shared..] {
        children.push(ChildPatch::Append(child.clone()));
    }

    if attributes.is_empty() && children.is_empty() {
        NodePatch::Keep
    } else {
        NodePatch::Element {
            attributes,
            children,
        }
    }
}
