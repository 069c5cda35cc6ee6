//! Interaction queries.
//!
//! Interactions are event streams addressed by a CSS selector and an event
//! name. They are resolved against whichever root element is current: every
//! time the root stream emits, the previous listeners are dropped and new
//! ones are attached to the new root's matching elements.

use crate::dom::{Element, Event, Selector};
use crate::error::{Error, Result};
use crate::stream::Observable;

/// Event queries against a driver's current root element.
#[derive(Debug, Clone)]
pub struct Interactions {
    root_elem: Observable<Element>,
}

impl Interactions {
    /// Build interactions over a stream of root elements.
    pub fn new(root_elem: Observable<Element>) -> Self {
        Self { root_elem }
    }

    /// Stream of `event_name` events from elements matching `selector`.
    ///
    /// A selector naming a single class present on the root element itself
    /// listens on the root, which also catches events bubbling up from its
    /// descendants. Any other selector listens on every matching descendant.
    /// A root with no match contributes no events.
    ///
    /// Arguments are checked here, before anything is subscribed.
    pub fn get(&self, selector: &str, event_name: &str) -> Result<Observable<Event>> {
        let selector = Selector::parse(selector)?;
        if event_name.trim().is_empty() {
            return Err(Error::InvalidEventName(event_name.to_owned()));
        }
        let event_name = event_name.to_owned();

        Ok(self.root_elem.switch_map(move |root| {
            if let Some(class) = selector.single_class() {
                if root.has_class(class) {
                    return root.events(&event_name);
                }
            }
            let targets = root.select_all(&selector);
            if targets.is_empty() {
                tracing::trace!(selector = %selector, event = %event_name, "no matching elements");
                return Observable::empty();
            }
            Element::from_event(&targets, &event_name)
        }))
    }
}
