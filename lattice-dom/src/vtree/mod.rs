//! Virtual Trees
//!
//! Virtual trees are immutable descriptions of a DOM subtree produced by
//! application code. This module defines the node types, the [`Widget`]
//! trait for nodes that own their own rendering, and the diff/patch
//! primitive that turns two consecutive trees into a DOM mutation.
//!
//! # Diff and Patch
//!
//! [`diff`] compares two trees and produces a [`Patch`]; [`patch`] applies it
//! to the live node rendered from the old tree and returns the node that now
//! represents the new tree. The result may be a different node when the root
//! had to be replaced.
//!
//! Children are compared by position. Widgets are never looked into: a widget
//! is either updated (same name) or replaced, and its subtree is its own.

mod diff;
mod node;
mod patch;
mod widget;

pub use diff::{diff, AttributeChange, ChildPatch, NodePatch, Patch};
pub use node::{h, VElement, VirtualNode};
pub use patch::{create_node, destroy_widgets, patch};
pub use widget::Widget;
