//! Virtual node types and the `h` builder.

use std::sync::Arc;

use indexmap::IndexMap;

use super::widget::Widget;

/// An immutable description of a DOM node.
#[derive(Clone)]
pub enum VirtualNode {
    /// An element with attributes and children.
    Element(VElement),
    /// A text node.
    Text(String),
    /// A node that renders and updates itself.
    Widget(Arc<dyn Widget>),
}

/// Description of an element.
#[derive(Debug, Clone, Default)]
pub struct VElement {
    tag: String,
    namespace: Option<String>,
    attributes: IndexMap<String, String>,
    children: Vec<VirtualNode>,
}

/// Start building an element from a selector-like string.
///
/// `"div.greeting#main"` yields a `div` with class `greeting` and id `main`.
/// The tag defaults to `div` when the string starts with `.` or `#`.
///
/// # Example
///
/// ```rust,ignore
/// let tree: VirtualNode = h("ul.list")
///     .child(h("li.item").text("one"))
///     .child(h("li.item").text("two"))
///     .into();
/// ```
pub fn h(selector: &str) -> VElement {
    VElement::parse(selector)
}

impl VElement {
    fn parse(selector: &str) -> Self {
        let selector = selector.trim();
        let tag_end = selector.find(['.', '#']).unwrap_or(selector.len());
        let tag = &selector[..tag_end];

        let mut id: Option<String> = None;
        let mut classes: Vec<&str> = Vec::new();
        let mut rest = &selector[tag_end..];
        while let Some(marker) = rest.chars().next() {
            let body = &rest[1..];
            let end = body.find(['.', '#']).unwrap_or(body.len());
            let token = &body[..end];
            if !token.is_empty() {
                if marker == '.' {
                    classes.push(token);
                } else {
                    id = Some(token.to_owned());
                }
            }
            rest = &body[end..];
        }

        let mut element = Self {
            tag: if tag.is_empty() {
                "div".to_owned()
            } else {
                tag.to_ascii_lowercase()
            },
            ..Self::default()
        };
        if let Some(id) = id {
            element.attributes.insert("id".to_owned(), id);
        }
        if !classes.is_empty() {
            element.attributes.insert("class".to_owned(), classes.join(" "));
        }
        element
    }

    /// Set an attribute.
    pub fn attr(mut self, name: &str, value: impl Into<String>) -> Self {
        self.attributes.insert(name.to_owned(), value.into());
        self
    }

    /// Append a class to the `class` attribute.
    pub fn class(mut self, class: &str) -> Self {
        let merged = match self.attributes.get("class") {
            Some(existing) if !existing.is_empty() => format!("{existing} {class}"),
            _ => class.to_owned(),
        };
        self.attributes.insert("class".to_owned(), merged);
        self
    }

    /// Put the element in a namespace.
    pub fn namespace(mut self, namespace: &str) -> Self {
        self.namespace = Some(namespace.to_owned());
        self
    }

    /// Append a child.
    pub fn child(mut self, child: impl Into<VirtualNode>) -> Self {
        self.children.push(child.into());
        self
    }

    /// Append several children.
    pub fn children<I, C>(mut self, children: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<VirtualNode>,
    {
        self.children.extend(children.into_iter().map(Into::into));
        self
    }

    /// Append a text child.
    pub fn text(self, text: impl Into<String>) -> Self {
        self.child(VirtualNode::Text(text.into()))
    }

    /// Lower-cased tag name.
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Namespace URI, if any.
    pub fn namespace_uri(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    /// All attributes in insertion order.
    pub fn attributes(&self) -> &IndexMap<String, String> {
        &self.attributes
    }

    /// A single attribute.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    /// The `class` attribute, empty when absent.
    pub fn class_name(&self) -> &str {
        self.attribute("class").unwrap_or("")
    }

    /// Child nodes in order.
    pub fn child_nodes(&self) -> &[VirtualNode] {
        &self.children
    }

    /// Copy of this element with different children.
    pub fn with_children(&self, children: Vec<VirtualNode>) -> Self {
        Self {
            tag: self.tag.clone(),
            namespace: self.namespace.clone(),
            attributes: self.attributes.clone(),
            children,
        }
    }
}

impl VirtualNode {
    /// The empty tree every render starts from: a bare `div`.
    pub fn empty() -> Self {
        VirtualNode::Element(h("div"))
    }

    /// Borrow as an element description.
    pub fn as_element(&self) -> Option<&VElement> {
        match self {
            VirtualNode::Element(element) => Some(element),
            _ => None,
        }
    }

    /// Borrow as a widget.
    pub fn as_widget(&self) -> Option<&Arc<dyn Widget>> {
        match self {
            VirtualNode::Widget(widget) => Some(widget),
            _ => None,
        }
    }

    /// Child nodes; empty for text and widgets.
    pub fn children(&self) -> &[VirtualNode] {
        match self {
            VirtualNode::Element(element) => element.child_nodes(),
            _ => &[],
        }
    }
}

impl std::fmt::Debug for VirtualNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VirtualNode::Element(element) => std::fmt::Debug::fmt(element, f),
            VirtualNode::Text(text) => f.debug_tuple("Text").field(text).finish(),
            VirtualNode::Widget(widget) => std::fmt::Debug::fmt(&**widget, f),
        }
    }
}

impl From<VElement> for VirtualNode {
    fn from(element: VElement) -> Self {
        VirtualNode::Element(element)
    }
}

impl From<&str> for VirtualNode {
    fn from(text: &str) -> Self {
        VirtualNode::Text(text.to_owned())
    }
}

impl From<String> for VirtualNode {
    fn from(text: String) -> Self {
        VirtualNode::Text(text)
    }
}

impl From<Arc<dyn Widget>> for VirtualNode {
    fn from(widget: Arc<dyn Widget>) -> Self {
        VirtualNode::Widget(widget)
    }
}
