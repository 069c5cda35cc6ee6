//! Custom Elements
//!
//! A custom element is a tag registered with a definition function. When a
//! tree is normalized, every element carrying a registered tag becomes a
//! [`CustomElementWidget`]. The widget mounts a host element and runs a
//! nested driver inside it, so the custom element renders, reacts to its own
//! interactions and publishes its own root elements independently of the
//! view that embeds it.
//!
//! # Lifecycle
//!
//! 1. `init` creates the host, records its metadata and starts the nested
//!    driver with the element's attributes as props.
//! 2. `update` hands the running nested driver over to the new widget
//!    instance and pushes the new attributes as props.
//! 3. `destroy` disposes the nested driver.
//!
//! Custom events emitted by the nested definition are dispatched on the
//! widget's current root element as bubbling events.

mod registry;
mod widget;

pub use registry::{CustomElementRegistry, DefinitionFn};
pub use widget::CustomElementWidget;
