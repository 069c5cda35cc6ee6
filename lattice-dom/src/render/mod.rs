//! Render Pipeline
//!
//! The render pipeline turns a stream of virtual trees into a stream of live
//! root elements. It is assembled from four stages:
//!
//! 1. [`normalize`] swaps registered custom-element tags for widgets.
//! 2. The sequencer pairs consecutive trees, patches the root, and waits for
//!    every embedded widget to publish its root ([`collect_root_streams`]).
//! 3. [`fix_root_stream`] restores the container's classes on every root and
//!    multicasts the result through a replay-one subject.
//! 4. Interactions and application code subscribe to that replayed stream.
//!
//! # Ordering
//!
//! Each consecutive pair of trees produces exactly one patch, applied in
//! stream order and completed before any observer sees the resulting root.
//! A cycle whose tree embeds widgets is only reported once every one of those
//! widgets has emitted a root element.

mod collect;
mod metadata;
mod normalize;
mod root;
mod sequencer;

pub use collect::collect_root_streams;
pub use metadata::{custom_element_metadata, CustomElementMetadata};
pub use normalize::{normalize, replace_custom_elements};
pub use root::fix_root_stream;
pub use sequencer::{check_root_not_custom_element, render_raw_root_stream, render_root, Sequencer};

pub(crate) use metadata::MetadataTable;
