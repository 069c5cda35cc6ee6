//! The custom-element widget.

use std::any::Any;
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::Mutex;

use super::registry::{CustomElementRegistry, DefinitionFn};
use crate::config::DriverConfig;
use crate::dom::{Element, Event};
use crate::driver::{apply_to_dom, DriverHandle, DriverOptions};
use crate::error::Result;
use crate::render::{CustomElementMetadata, MetadataTable};
use crate::stream::{Notification, Observable, ReplaySubject, Subscription};
use crate::vtree::{VElement, Widget};

/// A running nested driver, handed from one widget instance to the next.
struct Mounted {
    host: Element,
    handle: DriverHandle,
    props: ReplaySubject<IndexMap<String, String>>,
    forward: Subscription,
    events: Subscription,
}

/// Widget standing in for an element with a registered custom-element tag.
pub struct CustomElementWidget {
    name: String,
    tag: String,
    element: VElement,
    definition: DefinitionFn,
    registry: Arc<CustomElementRegistry>,
    config: DriverConfig,
    root_elem: ReplaySubject<Element>,
    mounted: Mutex<Option<Mounted>>,
}

impl CustomElementWidget {
    pub fn new(
        element: VElement,
        definition: DefinitionFn,
        registry: Arc<CustomElementRegistry>,
        config: DriverConfig,
    ) -> Self {
        let tag = element.tag().to_owned();
        Self {
            name: format!("CustomElement:{tag}"),
            tag,
            element,
            definition,
            registry,
            config,
            root_elem: ReplaySubject::new(),
            mounted: Mutex::new(None),
        }
    }

    /// The registered tag this widget renders.
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// The attributes of the replaced element, as passed to the view.
    pub fn props(&self) -> &IndexMap<String, String> {
        self.element.attributes()
    }

    /// The nested driver, once initialized.
    pub fn handle(&self) -> Option<DriverHandle> {
        self.mounted.lock().as_ref().map(|m| m.handle.clone())
    }

    fn host(&self) -> Element {
        let host = Element::new(&self.config.root_tag);
        host.add_class(&self.config.custom_element_class(&self.tag));
        for class in self.element.class_name().split_whitespace() {
            host.add_class(class);
        }
        for (name, value) in self.element.attributes() {
            if name != "class" {
                host.set_attribute(name, value.clone());
            }
        }
        host
    }

    /// Mirror the nested driver's roots into this instance's root stream.
    fn forward_roots(&self, handle: &DriverHandle) -> Subscription {
        let root_elem = self.root_elem.clone();
        handle.root_elem().subscribe_with(move |n| match n {
            Notification::Next(root) => root_elem.next(root),
            Notification::Error(error) => root_elem.error(error),
            Notification::Complete => {}
        })
    }
}

fn dispatch_custom_events(handle: &DriverHandle) -> Subscription {
    let subscription = Subscription::new();
    for (name, events) in handle.custom_events() {
        let target = handle.clone();
        let name = name.clone();
        subscription.add_subscription(events.subscribe(move |detail| {
            if let Some(root) = target.latest_root() {
                tracing::trace!(event = %name, root = root.id().raw(), "dispatching custom event");
                root.dispatch_event(&Event::custom(&name, detail));
            }
        }));
    }
    subscription
}

impl Widget for CustomElementWidget {
    fn name(&self) -> &str {
        &self.name
    }

    fn init(&self) -> Result<Element> {
        let host = self.host();
        MetadataTable::insert(
            host.id(),
            CustomElementMetadata {
                tag: self.tag.clone(),
            },
        );

        let props = ReplaySubject::new();
        props.next(self.element.attributes().clone());
        let definition = Arc::clone(&self.definition);
        let options = DriverOptions::default()
            .with_props(props.observable())
            .with_registry(Arc::clone(&self.registry))
            .with_config(self.config.clone());
        let handle = match apply_to_dom(
            &host,
            move |interactions, props| definition(interactions, props),
            options,
        ) {
            Ok(handle) => handle,
            Err(error) => {
                MetadataTable::remove(host.id());
                tracing::warn!(tag = %self.tag, %error, "custom element failed to mount");
                return Err(error);
            }
        };
        tracing::debug!(tag = %self.tag, host = host.id().raw(), "custom element mounted");

        let forward = self.forward_roots(&handle);
        let events = dispatch_custom_events(&handle);
        let root = handle.latest_root().unwrap_or_else(|| host.clone());
        *self.mounted.lock() = Some(Mounted {
            host,
            handle,
            props,
            forward,
            events,
        });
        Ok(root)
    }

    fn update(&self, previous: &dyn Widget, element: &Element) -> Result<Option<Element>> {
        let adopted = previous
            .as_any()
            .downcast_ref::<CustomElementWidget>()
            .and_then(|previous| previous.mounted.lock().take().map(|m| (previous, m)));
        let Some((previous, mut mounted)) = adopted else {
            return self.init().map(Some);
        };

        mounted.forward.unsubscribe();
        previous.root_elem.complete();
        mounted.forward = self.forward_roots(&mounted.handle);
        if previous.props() != self.props() {
            mounted.props.next(self.props().clone());
        }
        let current = mounted.handle.latest_root();
        *self.mounted.lock() = Some(mounted);

        Ok(current.filter(|root| root != element))
    }

    fn destroy(&self, element: &Element) {
        let Some(mounted) = self.mounted.lock().take() else {
            self.root_elem.complete();
            return;
        };
        mounted.events.unsubscribe();
        mounted.forward.unsubscribe();
        self.root_elem.complete();
        if let Some(root) = mounted.handle.latest_root() {
            MetadataTable::remove(root.id());
        }
        mounted.handle.dispose();
        mounted.props.dispose();
        MetadataTable::remove(mounted.host.id());
        MetadataTable::remove(element.id());
        tracing::debug!(tag = %self.tag, "custom element destroyed");
    }

    fn root_elem_stream(&self) -> Option<Observable<Element>> {
        Some(self.root_elem.observable())
    }

    fn is_custom_element(&self) -> bool {
        true
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl std::fmt::Debug for CustomElementWidget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CustomElementWidget")
            .field("tag", &self.tag)
            .field("props", self.props())
            .field("mounted", &self.mounted.lock().is_some())
            .finish()
    }
}
