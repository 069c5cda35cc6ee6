//! Driver Entry Point
//!
//! [`apply_to_dom`] wires a view into a container:
//!
//! 1. Resolve and validate the container, then pick the root element.
//! 2. Build the render pipeline over a relay that does not have a tree
//!    stream yet.
//! 3. Call the definition function with interactions over the pipeline's
//!    root stream, so the view can subscribe to events before it renders.
//! 4. Connect the pipeline, subscribe the observer, and only then hand the
//!    view's tree stream to the relay.
//!
//! The returned [`DriverHandle`] exposes the root stream, the interactions
//! and the view's custom events, and tears everything down on `dispose`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use indexmap::IndexMap;
use serde_json::Value;

use crate::config::DriverConfig;
use crate::custom_element::CustomElementRegistry;
use crate::dom::{Document, Element, Node};
use crate::error::{Error, Result};
use crate::interactions::Interactions;
use crate::render::{fix_root_stream, render_raw_root_stream, render_root, Sequencer};
use crate::stream::{AsyncSubject, Notification, Observable, Observer, Replayed, Subscription};
use crate::vtree::VirtualNode;

/// Attribute maps pushed to a view as its properties.
pub type Props = Observable<IndexMap<String, String>>;

/// Where a driver renders.
#[derive(Debug, Clone)]
pub enum Container {
    /// The first element of `document` matching `selector`.
    Selector { document: Document, selector: String },
    /// A node given directly. Must be an element.
    Node(Node),
}

impl Container {
    /// Look the container up by CSS selector when the driver starts.
    pub fn query(document: &Document, selector: &str) -> Self {
        Container::Selector {
            document: document.clone(),
            selector: selector.to_owned(),
        }
    }

    fn resolve(self) -> Result<Element> {
        match self {
            Container::Selector { document, selector } => document
                .query_selector(&selector)?
                .ok_or(Error::UnknownContainer(selector)),
            Container::Node(Node::Element(element)) => Ok(element),
            Container::Node(Node::Text(_)) => Err(Error::InvalidContainer),
        }
    }
}

impl From<Element> for Container {
    fn from(element: Element) -> Self {
        Container::Node(Node::Element(element))
    }
}

impl From<&Element> for Container {
    fn from(element: &Element) -> Self {
        Container::Node(Node::Element(element.clone()))
    }
}

impl From<Node> for Container {
    fn from(node: Node) -> Self {
        Container::Node(node)
    }
}

/// What a definition function returns.
#[derive(Debug, Clone)]
pub enum ViewOutput {
    /// Just the tree stream.
    Tree(Observable<VirtualNode>),
    /// Named output streams, one of which should be the tree stream.
    Sinks(Sinks),
}

impl From<Observable<VirtualNode>> for ViewOutput {
    fn from(tree: Observable<VirtualNode>) -> Self {
        ViewOutput::Tree(tree)
    }
}

impl From<Sinks> for ViewOutput {
    fn from(sinks: Sinks) -> Self {
        ViewOutput::Sinks(sinks)
    }
}

/// Output streams of a view: the tree stream plus named custom events.
#[derive(Debug, Clone, Default)]
pub struct Sinks {
    pub vtree: Option<Observable<VirtualNode>>,
    pub events: IndexMap<String, Observable<Value>>,
}

impl Sinks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the tree stream.
    pub fn with_vtree(mut self, vtree: Observable<VirtualNode>) -> Self {
        self.vtree = Some(vtree);
        self
    }

    /// Add a custom event stream.
    pub fn with_event(mut self, name: &str, events: Observable<Value>) -> Self {
        self.events.insert(name.to_owned(), events);
        self
    }
}

type CustomEvents = IndexMap<String, Observable<Value>>;

fn digest(output: ViewOutput) -> Result<(Observable<VirtualNode>, CustomEvents)> {
    match output {
        ViewOutput::Tree(vtree) => Ok((vtree, IndexMap::new())),
        ViewOutput::Sinks(Sinks {
            vtree: Some(vtree),
            events,
        }) => Ok((vtree, events)),
        ViewOutput::Sinks(Sinks { vtree: None, .. }) => Err(Error::MissingTreeStream),
    }
}

/// Optional collaborators of a driver.
#[derive(Clone, Default)]
pub struct DriverOptions {
    /// Receives every root element, and the error that ends rendering.
    pub observer: Option<Observer<Element>>,
    /// Passed to the definition function.
    pub props: Option<Props>,
    /// Custom elements available to the view; empty when absent.
    pub registry: Option<Arc<CustomElementRegistry>>,
    pub config: DriverConfig,
}

impl DriverOptions {
    pub fn with_observer<F>(mut self, observer: F) -> Self
    where
        F: Fn(Notification<Element>) + Send + Sync + 'static,
    {
        self.observer = Some(Arc::new(observer));
        self
    }

    pub fn with_props(mut self, props: Props) -> Self {
        self.props = Some(props);
        self
    }

    pub fn with_registry(mut self, registry: Arc<CustomElementRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn with_config(mut self, config: DriverConfig) -> Self {
        self.config = config;
        self
    }
}

impl std::fmt::Debug for DriverOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DriverOptions")
            .field("observer", &self.observer.is_some())
            .field("props", &self.props.is_some())
            .field("registry", &self.registry)
            .field("config", &self.config)
            .finish()
    }
}

/// Render the view produced by `definition` into `container`.
///
/// Container problems, invalid configuration and a view without a tree
/// stream are reported here. Problems found while rendering (such as a
/// custom element used as the view's root) end the root stream with an
/// error, which reaches the observer.
///
/// # Example
///
/// ```rust,ignore
/// let handle = apply_to_dom(
///     &container,
///     |interactions, _props| {
///         let clicks = interactions.get(".go", "click").unwrap();
///         ViewOutput::Tree(clicks.map(|_| h("p").text("clicked").into()))
///     },
///     DriverOptions::default(),
/// )?;
/// ```
pub fn apply_to_dom<F>(
    container: impl Into<Container>,
    definition: F,
    options: DriverOptions,
) -> Result<DriverHandle>
where
    F: FnOnce(Interactions, Option<Props>) -> ViewOutput,
{
    let DriverOptions {
        observer,
        props,
        registry,
        config,
    } = options;
    config.validate()?;
    let container = container.into().resolve()?;
    let registry = registry.unwrap_or_default();

    let sequencer = Sequencer::new(render_root(&container, &config));
    let relay: AsyncSubject<Observable<VirtualNode>> = AsyncSubject::new();
    let raw = render_raw_root_stream(
        relay.observable().merge_all(),
        sequencer.clone(),
        registry,
        config,
    );
    let replayed = fix_root_stream(raw, &container);
    let root_elem = replayed.observable();
    let interactions = Interactions::new(root_elem.clone());

    let (vtree, custom_events) = digest(definition(interactions.clone(), props))?;

    let connection = replayed.connect();
    let subscription = match observer {
        Some(observer) => root_elem.subscribe_observer(observer),
        None => root_elem.subscribe(|_| {}),
    };
    relay.next(vtree.share_replay());
    relay.complete();
    tracing::debug!(container = container.id().raw(), "driver attached");

    Ok(DriverHandle {
        root_elem,
        interactions,
        custom_events,
        replayed,
        teardown: Arc::new(Teardown {
            disposed: AtomicBool::new(false),
            subscription,
            connection,
            relay,
            sequencer,
        }),
    })
}

struct Teardown {
    disposed: AtomicBool,
    subscription: Subscription,
    connection: Subscription,
    relay: AsyncSubject<Observable<VirtualNode>>,
    sequencer: Sequencer,
}

/// A running driver.
///
/// Clones share the same driver; disposing any of them disposes it.
#[derive(Clone)]
pub struct DriverHandle {
    root_elem: Observable<Element>,
    interactions: Interactions,
    custom_events: CustomEvents,
    replayed: Replayed<Element>,
    teardown: Arc<Teardown>,
}

impl DriverHandle {
    /// Stop rendering: unsubscribe the observer, disconnect the pipeline,
    /// drop the relay and destroy the widgets still mounted, which disposes
    /// the drivers of nested custom elements. Further calls do nothing.
    pub fn dispose(&self) {
        if self.teardown.disposed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.teardown.subscription.unsubscribe();
        self.teardown.connection.unsubscribe();
        self.teardown.relay.dispose();
        self.teardown.sequencer.unmount();
        tracing::debug!("driver disposed");
    }

    /// Whether [`dispose`](Self::dispose) has been called.
    pub fn is_disposed(&self) -> bool {
        self.teardown.disposed.load(Ordering::SeqCst)
    }

    /// The replayed stream of current root elements.
    pub fn root_elem(&self) -> Observable<Element> {
        self.root_elem.clone()
    }

    /// The interactions handed to the definition function.
    pub fn interactions(&self) -> &Interactions {
        &self.interactions
    }

    /// Custom event streams returned by the view.
    pub fn custom_events(&self) -> &IndexMap<String, Observable<Value>> {
        &self.custom_events
    }

    /// The most recent root element, if one has been published.
    pub fn latest_root(&self) -> Option<Element> {
        self.replayed.latest()
    }
}

impl std::fmt::Debug for DriverHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DriverHandle")
            .field("disposed", &self.is_disposed())
            .field("latest_root", &self.latest_root())
            .field("custom_events", &self.custom_events.keys().collect::<Vec<_>>())
            .finish()
    }
}
