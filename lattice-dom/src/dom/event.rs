//! Events dispatched through the live document.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use serde_json::Value;

use super::element::Element;

struct EventData {
    name: String,
    bubbles: bool,
    detail: Option<Value>,
    target: RwLock<Option<Element>>,
    current_target: RwLock<Option<Element>>,
    propagation_stopped: AtomicBool,
}

/// An event travelling from its target up through its ancestors.
///
/// Clones share state, so a listener that stops propagation stops it for
/// the whole dispatch.
#[derive(Clone)]
pub struct Event {
    data: Arc<EventData>,
}

impl Event {
    /// A bubbling event without a payload.
    pub fn new(name: &str) -> Self {
        Self::build(name, true, None)
    }

    /// An event that only reaches listeners on its target.
    pub fn non_bubbling(name: &str) -> Self {
        Self::build(name, false, None)
    }

    /// A bubbling event carrying a payload.
    pub fn custom(name: &str, detail: Value) -> Self {
        Self::build(name, true, Some(detail))
    }

    fn build(name: &str, bubbles: bool, detail: Option<Value>) -> Self {
        Self {
            data: Arc::new(EventData {
                name: name.to_owned(),
                bubbles,
                detail,
                target: RwLock::new(None),
                current_target: RwLock::new(None),
                propagation_stopped: AtomicBool::new(false),
            }),
        }
    }

    /// The event type.
    pub fn name(&self) -> &str {
        &self.data.name
    }

    /// Whether the event bubbles.
    pub fn bubbles(&self) -> bool {
        self.data.bubbles
    }

    /// Payload of a custom event.
    pub fn detail(&self) -> Option<&Value> {
        self.data.detail.as_ref()
    }

    /// The element the event was dispatched at.
    pub fn target(&self) -> Option<Element> {
        self.data.target.read().clone()
    }

    /// The element whose listeners are currently running.
    pub fn current_target(&self) -> Option<Element> {
        self.data.current_target.read().clone()
    }

    /// Stop the event from reaching further ancestors.
    pub fn stop_propagation(&self) {
        self.data.propagation_stopped.store(true, Ordering::SeqCst);
    }

    /// Whether propagation has been stopped.
    pub fn is_propagation_stopped(&self) -> bool {
        self.data.propagation_stopped.load(Ordering::SeqCst)
    }

    pub(crate) fn set_target(&self, target: &Element) {
        *self.data.target.write() = Some(target.clone());
    }

    pub(crate) fn set_current_target(&self, target: &Element) {
        *self.data.current_target.write() = Some(target.clone());
    }
}

impl PartialEq for Event {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.data, &other.data)
    }
}

impl std::fmt::Debug for Event {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Event")
            .field("name", &self.data.name)
            .field("bubbles", &self.data.bubbles)
            .field("detail", &self.data.detail)
            .finish()
    }
}
