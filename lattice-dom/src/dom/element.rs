//! Element and text nodes.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use indexmap::IndexMap;
use parking_lot::RwLock;
use smallvec::SmallVec;

use super::event::Event;
use super::selector::Selector;
use crate::error::Result;
use crate::stream::{Observable, Sink, Subscription};

/// Unique identifier for a node in the live document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(u64);

impl NodeId {
    /// Generate a new unique node ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::new()
    }
}

/// Identifies a registered event listener on an element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

impl ListenerId {
    fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

type Callback = Arc<dyn Fn(&Event) + Send + Sync>;

struct Listener {
    id: ListenerId,
    event: String,
    callback: Callback,
}

struct ElementState {
    attributes: IndexMap<String, String>,
    children: Vec<Node>,
    parent: Option<Weak<ElementData>>,
    listeners: Vec<Listener>,
}

struct ElementData {
    id: NodeId,
    tag: String,
    namespace: Option<String>,
    state: RwLock<ElementState>,
}

/// Handle to a live element.
#[derive(Clone)]
pub struct Element {
    data: Arc<ElementData>,
}

struct TextData {
    id: NodeId,
    content: RwLock<String>,
    parent: RwLock<Option<Weak<ElementData>>>,
}

/// Handle to a live text node.
#[derive(Clone)]
pub struct Text {
    data: Arc<TextData>,
}

/// Any node of the live document.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Element(Element),
    Text(Text),
}

// ----------------------------------------------------------------------------
// Node
// ----------------------------------------------------------------------------

impl Node {
    /// The node's identity.
    pub fn id(&self) -> NodeId {
        match self {
            Node::Element(element) => element.id(),
            Node::Text(text) => text.id(),
        }
    }

    /// The element this node is attached to, if any.
    pub fn parent(&self) -> Option<Element> {
        match self {
            Node::Element(element) => element.parent(),
            Node::Text(text) => text.parent(),
        }
    }

    /// Borrow as an element.
    pub fn as_element(&self) -> Option<&Element> {
        match self {
            Node::Element(element) => Some(element),
            Node::Text(_) => None,
        }
    }

    /// Convert into an element.
    pub fn into_element(self) -> Option<Element> {
        match self {
            Node::Element(element) => Some(element),
            Node::Text(_) => None,
        }
    }

    /// Concatenated text of the node and its descendants.
    pub fn text_content(&self) -> String {
        match self {
            Node::Element(element) => element.text_content(),
            Node::Text(text) => text.content(),
        }
    }

    /// Serialize the node as markup.
    pub fn outer_html(&self) -> String {
        match self {
            Node::Element(element) => element.outer_html(),
            Node::Text(text) => escape(&text.content()),
        }
    }

    fn set_parent(&self, parent: Option<Weak<ElementData>>) {
        match self {
            Node::Element(element) => element.data.state.write().parent = parent,
            Node::Text(text) => *text.data.parent.write() = parent,
        }
    }

    /// Remove the node from its parent, if it has one.
    pub fn detach(&self) {
        if let Some(parent) = self.parent() {
            parent.remove_child(self);
        }
    }
}

impl From<Element> for Node {
    fn from(element: Element) -> Self {
        Node::Element(element)
    }
}

impl From<Text> for Node {
    fn from(text: Text) -> Self {
        Node::Text(text)
    }
}

// ----------------------------------------------------------------------------
// Text
// ----------------------------------------------------------------------------

impl Text {
    /// Create a detached text node.
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            data: Arc::new(TextData {
                id: NodeId::new(),
                content: RwLock::new(content.into()),
                parent: RwLock::new(None),
            }),
        }
    }

    /// The node's identity.
    pub fn id(&self) -> NodeId {
        self.data.id
    }

    /// Current text.
    pub fn content(&self) -> String {
        self.data.content.read().clone()
    }

    /// Replace the text.
    pub fn set_content(&self, content: impl Into<String>) {
        *self.data.content.write() = content.into();
    }

    /// The element this node is attached to, if any.
    pub fn parent(&self) -> Option<Element> {
        self.data
            .parent
            .read()
            .as_ref()
            .and_then(Weak::upgrade)
            .map(|data| Element { data })
    }
}

impl PartialEq for Text {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.data, &other.data)
    }
}

impl std::fmt::Debug for Text {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Text")
            .field("id", &self.data.id)
            .field("content", &self.content())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Element
// ----------------------------------------------------------------------------

impl Element {
    /// Create a detached element. Tags are stored lower-cased.
    pub fn new(tag: &str) -> Self {
        Self::build(tag, None)
    }

    /// Create a detached element in a namespace.
    pub fn with_namespace(tag: &str, namespace: &str) -> Self {
        Self::build(tag, Some(namespace.to_owned()))
    }

    fn build(tag: &str, namespace: Option<String>) -> Self {
        Self {
            data: Arc::new(ElementData {
                id: NodeId::new(),
                tag: tag.to_ascii_lowercase(),
                namespace,
                state: RwLock::new(ElementState {
                    attributes: IndexMap::new(),
                    children: Vec::new(),
                    parent: None,
                    listeners: Vec::new(),
                }),
            }),
        }
    }

    /// The element's identity.
    pub fn id(&self) -> NodeId {
        self.data.id
    }

    /// Lower-cased tag name.
    pub fn tag_name(&self) -> &str {
        &self.data.tag
    }

    /// Namespace URI, if any.
    pub fn namespace(&self) -> Option<&str> {
        self.data.namespace.as_deref()
    }

    // Attributes ------------------------------------------------------------

    /// Read an attribute.
    pub fn attribute(&self, name: &str) -> Option<String> {
        self.data.state.read().attributes.get(name).cloned()
    }

    /// Set an attribute, keeping its position if it already exists.
    pub fn set_attribute(&self, name: &str, value: impl Into<String>) {
        self.data
            .state
            .write()
            .attributes
            .insert(name.to_owned(), value.into());
    }

    /// Remove an attribute, returning its old value.
    pub fn remove_attribute(&self, name: &str) -> Option<String> {
        self.data.state.write().attributes.shift_remove(name)
    }

    /// Snapshot of all attributes in insertion order.
    pub fn attributes(&self) -> IndexMap<String, String> {
        self.data.state.read().attributes.clone()
    }

    /// The raw `class` attribute, empty when absent.
    pub fn class_name(&self) -> String {
        self.attribute("class").unwrap_or_default()
    }

    /// Replace the `class` attribute.
    pub fn set_class_name(&self, class_name: &str) {
        self.set_attribute("class", class_name);
    }

    /// Classes split on whitespace, in order.
    pub fn class_list(&self) -> SmallVec<[String; 4]> {
        self.class_name()
            .split_whitespace()
            .map(str::to_owned)
            .collect()
    }

    /// Whether the class list contains `class`.
    pub fn has_class(&self, class: &str) -> bool {
        self.class_name().split_whitespace().any(|c| c == class)
    }

    /// Append `class` unless it is already present.
    pub fn add_class(&self, class: &str) {
        if self.has_class(class) {
            return;
        }
        let mut classes = self.class_list();
        classes.push(class.to_owned());
        self.set_class_name(&classes.join(" "));
    }

    // Tree ------------------------------------------------------------------

    /// The element this one is attached to, if any.
    pub fn parent(&self) -> Option<Element> {
        self.data
            .state
            .read()
            .parent
            .as_ref()
            .and_then(Weak::upgrade)
            .map(|data| Element { data })
    }

    /// Snapshot of the child nodes.
    pub fn children(&self) -> Vec<Node> {
        self.data.state.read().children.clone()
    }

    /// Child node at `index`.
    pub fn child(&self, index: usize) -> Option<Node> {
        self.data.state.read().children.get(index).cloned()
    }

    /// Number of child nodes.
    pub fn child_count(&self) -> usize {
        self.data.state.read().children.len()
    }

    /// Child elements, skipping text nodes.
    pub fn child_elements(&self) -> Vec<Element> {
        self.children()
            .into_iter()
            .filter_map(Node::into_element)
            .collect()
    }

    /// Append a node, detaching it from its previous parent first.
    pub fn append_child(&self, node: impl Into<Node>) {
        let node = node.into();
        node.detach();
        node.set_parent(Some(Arc::downgrade(&self.data)));
        self.data.state.write().children.push(node);
    }

    /// Insert a node at `index` (clamped to the child count).
    pub fn insert_child(&self, index: usize, node: impl Into<Node>) {
        let node = node.into();
        node.detach();
        node.set_parent(Some(Arc::downgrade(&self.data)));
        let mut state = self.data.state.write();
        let index = index.min(state.children.len());
        state.children.insert(index, node);
    }

    /// Remove a child node. Returns false if it is not a child.
    pub fn remove_child(&self, node: &Node) -> bool {
        let removed = {
            let mut state = self.data.state.write();
            match state.children.iter().position(|c| c == node) {
                Some(index) => Some(state.children.remove(index)),
                None => None,
            }
        };
        match removed {
            Some(node) => {
                node.set_parent(None);
                true
            }
            None => false,
        }
    }

    /// Remove the child at `index`.
    pub fn remove_child_at(&self, index: usize) -> Option<Node> {
        let removed = {
            let mut state = self.data.state.write();
            (index < state.children.len()).then(|| state.children.remove(index))
        };
        if let Some(node) = &removed {
            node.set_parent(None);
        }
        removed
    }

    /// Swap `old` for `new` in place. Returns false if `old` is not a child.
    pub fn replace_child(&self, old: &Node, new: impl Into<Node>) -> bool {
        let new = new.into();
        if &new == old {
            return true;
        }
        new.detach();
        let replaced = {
            let mut state = self.data.state.write();
            match state.children.iter().position(|c| c == old) {
                Some(index) => {
                    state.children[index] = new.clone();
                    true
                }
                None => false,
            }
        };
        if replaced {
            old.set_parent(None);
            new.set_parent(Some(Arc::downgrade(&self.data)));
        }
        replaced
    }

    /// Remove every child node.
    pub fn clear_children(&self) {
        let children = std::mem::take(&mut self.data.state.write().children);
        for child in children {
            child.set_parent(None);
        }
    }

    /// Whether `other` is this element or one of its descendants.
    pub fn contains(&self, other: &Element) -> bool {
        let mut current = Some(other.clone());
        while let Some(element) = current {
            if &element == self {
                return true;
            }
            current = element.parent();
        }
        false
    }

    /// Descendant elements in document order, excluding this one.
    pub fn descendants(&self) -> Vec<Element> {
        let mut found = Vec::new();
        let mut stack: Vec<Element> = self.child_elements().into_iter().rev().collect();
        while let Some(element) = stack.pop() {
            stack.extend(element.child_elements().into_iter().rev());
            found.push(element);
        }
        found
    }

    /// Concatenated text of all descendant text nodes.
    pub fn text_content(&self) -> String {
        self.children().iter().map(Node::text_content).collect()
    }

    /// Serialize the element and its subtree as markup.
    pub fn outer_html(&self) -> String {
        let mut html = format!("<{}", self.data.tag);
        for (name, value) in self.attributes() {
            html.push_str(&format!(" {}=\"{}\"", name, escape(&value)));
        }
        html.push('>');
        for child in self.children() {
            html.push_str(&child.outer_html());
        }
        html.push_str(&format!("</{}>", self.data.tag));
        html
    }

    // Queries ---------------------------------------------------------------

    /// Whether this element matches a CSS selector.
    pub fn matches(&self, selector: &str) -> Result<bool> {
        Ok(Selector::parse(selector)?.matches(self))
    }

    /// Descendants matching a CSS selector, in document order.
    pub fn query_selector_all(&self, selector: &str) -> Result<Vec<Element>> {
        Ok(self.select_all(&Selector::parse(selector)?))
    }

    /// First descendant matching a CSS selector.
    pub fn query_selector(&self, selector: &str) -> Result<Option<Element>> {
        let selector = Selector::parse(selector)?;
        Ok(self.descendants().into_iter().find(|e| selector.matches(e)))
    }

    /// Descendants matching an already parsed selector.
    pub fn select_all(&self, selector: &Selector) -> Vec<Element> {
        self.descendants()
            .into_iter()
            .filter(|e| selector.matches(e))
            .collect()
    }

    // Events ----------------------------------------------------------------

    /// Register a listener for events named `event`.
    pub fn add_event_listener<F>(&self, event: &str, callback: F) -> ListenerId
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        let id = ListenerId::new();
        self.data.state.write().listeners.push(Listener {
            id,
            event: event.to_owned(),
            callback: Arc::new(callback),
        });
        id
    }

    /// Remove a listener. Unknown ids are ignored.
    pub fn remove_event_listener(&self, id: ListenerId) {
        self.data.state.write().listeners.retain(|l| l.id != id);
    }

    /// Number of registered listeners.
    pub fn listener_count(&self) -> usize {
        self.data.state.read().listeners.len()
    }

    /// Dispatch an event at this element.
    ///
    /// Listeners on the element run first, then, for bubbling events, those
    /// on each ancestor until propagation is stopped.
    pub fn dispatch_event(&self, event: &Event) {
        event.set_target(self);
        let mut current = Some(self.clone());
        while let Some(element) = current {
            if event.is_propagation_stopped() {
                break;
            }
            event.set_current_target(&element);
            let callbacks: Vec<Callback> = element
                .data
                .state
                .read()
                .listeners
                .iter()
                .filter(|l| l.event == event.name())
                .map(|l| Arc::clone(&l.callback))
                .collect();
            for callback in callbacks {
                callback(event);
            }
            if !event.bubbles() {
                break;
            }
            current = element.parent();
        }
    }

    /// Stream of events named `event` reaching this element.
    ///
    /// The listener is registered on subscription and removed on
    /// unsubscription.
    pub fn events(&self, event: &str) -> Observable<Event> {
        let element = self.clone();
        let name = event.to_owned();
        Observable::new(move |sink: Sink<Event>| {
            let id = element.add_event_listener(&name, move |event| sink.next(event.clone()));
            let element = element.clone();
            let subscription = Subscription::new();
            subscription.add(move || element.remove_event_listener(id));
            subscription
        })
    }

    /// Merged stream of events named `event` from every target.
    pub fn from_event(targets: &[Element], event: &str) -> Observable<Event> {
        Observable::merge(targets.iter().map(|t| t.events(event)).collect())
    }
}

impl PartialEq for Element {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.data, &other.data)
    }
}

impl Eq for Element {}

impl std::fmt::Debug for Element {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Element")
            .field("id", &self.data.id)
            .field("tag", &self.data.tag)
            .field("class", &self.class_name())
            .finish()
    }
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

// ----------------------------------------------------------------------------
// Document
// ----------------------------------------------------------------------------

/// A live document: an `html` element holding a `body`.
#[derive(Debug, Clone)]
pub struct Document {
    root: Element,
    body: Element,
}

impl Document {
    /// Create an empty document.
    pub fn new() -> Self {
        let root = Element::new("html");
        let body = Element::new("body");
        root.append_child(body.clone());
        Self { root, body }
    }

    /// The `html` element.
    pub fn document_element(&self) -> &Element {
        &self.root
    }

    /// The `body` element.
    pub fn body(&self) -> &Element {
        &self.body
    }

    /// Create a detached element.
    pub fn create_element(&self, tag: &str) -> Element {
        Element::new(tag)
    }

    /// Create a detached text node.
    pub fn create_text_node(&self, content: &str) -> Text {
        Text::new(content)
    }

    /// First element in the document matching a CSS selector.
    pub fn query_selector(&self, selector: &str) -> Result<Option<Element>> {
        let selector = Selector::parse(selector)?;
        if selector.matches(&self.root) {
            return Ok(Some(self.root.clone()));
        }
        Ok(self.root.descendants().into_iter().find(|e| selector.matches(e)))
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}
