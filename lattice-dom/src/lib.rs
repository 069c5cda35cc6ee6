//! Lattice DOM
//!
//! This crate provides the DOM driver for the Lattice reactive UI framework.
//! It connects a stream of virtual trees produced by application code to a
//! live document, and hands back a stream of user interaction events.
//!
//! It implements:
//!
//! - Push-based reactive streams (observables, subjects, combinators)
//! - An in-memory live document with selectors and bubbling events
//! - Virtual trees, widgets, and the diff/patch primitive
//! - The render pipeline: normalize, diff and patch, root-element fix-up
//! - Custom elements that run their own nested driver
//!
//! # Architecture
//!
//! - `stream`: Observables, subjects and the combinators the pipeline uses
//! - `dom`: Live document nodes, CSS selector subset and events
//! - `vtree`: Virtual nodes, the widget trait, `diff` and `patch`
//! - `render`: Normalizer, widget root-stream collector, sequencer, root pipeline
//! - `interactions`: Event queries against the current root element
//! - `driver`: The `apply_to_dom` entry point and its disposable handle
//! - `custom_element`: Registry and the custom-element widget
//!
//! # Example
//!
//! ```rust,ignore
//! use lattice_dom::dom::Document;
//! use lattice_dom::stream::Observable;
//! use lattice_dom::vtree::h;
//! use lattice_dom::{apply_to_dom, Container, DriverOptions, ViewOutput};
//!
//! let document = Document::new();
//! let app = document.create_element("div");
//! app.set_attribute("id", "app");
//! document.body().append_child(app);
//!
//! let handle = apply_to_dom(
//!     Container::query(&document, "#app"),
//!     |_interactions, _props| {
//!         ViewOutput::Tree(Observable::just(h("div.greeting").text("hi").into()))
//!     },
//!     DriverOptions::default(),
//! )?;
//!
//! handle.dispose();
//! ```

pub mod config;
pub mod custom_element;
pub mod dom;
pub mod driver;
pub mod error;
pub mod interactions;
pub mod render;
pub mod stream;
pub mod vtree;

pub use config::DriverConfig;
pub use custom_element::CustomElementRegistry;
pub use driver::{apply_to_dom, Container, DriverHandle, DriverOptions, Props, Sinks, ViewOutput};
pub use error::{Error, Result};
pub use interactions::Interactions;
