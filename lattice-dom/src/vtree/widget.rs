//! Nodes that render and update themselves.

use std::any::Any;

use crate::dom::Element;
use crate::error::Result;
use crate::stream::Observable;

/// A virtual node that owns its own DOM subtree.
///
/// The diff never looks inside a widget. When two widgets with the same
/// [`name`](Widget::name) meet in consecutive trees, the new one is asked to
/// [`update`](Widget::update) the element the old one rendered; otherwise the
/// old element is replaced by a fresh [`init`](Widget::init).
pub trait Widget: Send + Sync + Any {
    /// Identifies widgets that can update one another.
    fn name(&self) -> &str;

    /// Render the widget's element.
    fn init(&self) -> Result<Element>;

    /// Take over `element`, previously rendered by `previous`.
    ///
    /// Returns a replacement element, or `None` when `element` stays.
    fn update(&self, previous: &dyn Widget, element: &Element) -> Result<Option<Element>>;

    /// Release resources once the widget's element leaves the tree.
    fn destroy(&self, _element: &Element) {}

    /// The widget's own stream of rendered root elements.
    ///
    /// A render cycle that contains the widget is not reported until this
    /// stream has emitted at least once.
    fn root_elem_stream(&self) -> Option<Observable<Element>> {
        None
    }

    /// Whether the widget stands for a registered custom element.
    fn is_custom_element(&self) -> bool {
        false
    }

    /// Support downcasting to the concrete widget type.
    fn as_any(&self) -> &dyn Any;
}

impl std::fmt::Debug for dyn Widget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Widget")
            .field("name", &self.name())
            .field("custom_element", &self.is_custom_element())
            .finish()
    }
}
