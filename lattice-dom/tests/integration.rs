//! Integration Tests for the DOM Driver
//!
//! These tests drive complete views through `apply_to_dom` against an
//! in-memory document and check what ends up in the live tree.

use std::any::Any;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use indexmap::IndexMap;
use parking_lot::Mutex;
use serde_json::json;

use lattice_dom::custom_element::CustomElementRegistry;
use lattice_dom::dom::{Document, Element, Event};
use lattice_dom::stream::{Notification, Observable, Subject};
use lattice_dom::vtree::{h, VirtualNode, Widget};
use lattice_dom::{apply_to_dom, Container, DriverOptions, Error, Props, Result, Sinks, ViewOutput};

fn document_with_app() -> (Document, Element) {
    let document = Document::new();
    let app = document.create_element("div");
    app.set_attribute("id", "app");
    app.set_class_name("app");
    document.body().append_child(app.clone());
    (document, app)
}

type Seen = Arc<Mutex<Vec<Notification<String>>>>;

/// Observer recording each root as markup at the moment it was published.
fn recording_options() -> (DriverOptions, Seen) {
    let seen: Seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let options = DriverOptions::default().with_observer(move |n: Notification<Element>| {
        let snapshot = match n {
            Notification::Next(root) => Notification::Next(root.outer_html()),
            Notification::Error(error) => Notification::Error(error),
            Notification::Complete => Notification::Complete,
        };
        sink.lock().push(snapshot);
    });
    (options, seen)
}

fn published_roots(seen: &Seen) -> Vec<String> {
    seen.lock()
        .iter()
        .filter_map(|n| match n {
            Notification::Next(html) => Some(html.clone()),
            _ => None,
        })
        .collect()
}

/// A widget whose root only shows up after a delay.
struct Delayed {
    delay: Duration,
}

impl Widget for Delayed {
    fn name(&self) -> &str {
        "delayed"
    }

    fn init(&self) -> Result<Element> {
        Ok(Element::new("aside"))
    }

    fn update(&self, _previous: &dyn Widget, _element: &Element) -> Result<Option<Element>> {
        Ok(None)
    }

    fn root_elem_stream(&self) -> Option<Observable<Element>> {
        Some(Observable::just(Element::new("aside")).delay(self.delay))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

fn label_view(_: lattice_dom::Interactions, props: Option<Props>) -> ViewOutput {
    let props = props.unwrap_or_else(Observable::never);
    ViewOutput::Tree(props.map(|attrs: IndexMap<String, String>| {
        let label = attrs.get("label").cloned().unwrap_or_default();
        h("span.label").text(label).into()
    }))
}

/// A single tree renders under the container, keeping the container's class.
#[test]
fn greeting_renders_after_placeholder() {
    let (document, app) = document_with_app();
    let (options, seen) = recording_options();

    let handle = apply_to_dom(
        Container::query(&document, "#app"),
        |_, _| {
            let tree = h("div").child(h("div.greeting").text("hi"));
            ViewOutput::Tree(Observable::just(tree.into()))
        },
        options,
    )
    .unwrap();

    assert_eq!(
        published_roots(&seen),
        vec![
            r#"<div class="app"></div>"#.to_owned(),
            r#"<div class="app"><div class="greeting">hi</div></div>"#.to_owned(),
        ]
    );
    let root = handle.latest_root().unwrap();
    assert!(app.contains(&root));
    assert_eq!(root.class_list().to_vec(), vec!["app".to_owned()]);
}

/// Own classes of the view's root come first; the container's are appended.
#[test]
fn root_classes_are_a_superset_of_the_container_classes() {
    let (_, app) = document_with_app();
    let trees = Subject::new();
    let source = trees.observable();
    let handle = apply_to_dom(
        &app,
        move |_, _| ViewOutput::Tree(source.clone()),
        DriverOptions::default(),
    )
    .unwrap();

    trees.next(h("div.greeting").text("hi").into());
    let first = handle.latest_root().unwrap();
    assert_eq!(first.class_name(), "greeting app");

    trees.next(h("section.other").into());
    let second = handle.latest_root().unwrap();
    assert_ne!(first, second);
    assert_eq!(second.class_name(), "other app");
    assert_eq!(app.child_elements(), vec![second]);
}

/// An unknown selector is reported before the view is even called.
#[test]
fn missing_container_fails_immediately() {
    let document = Document::new();
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);

    let result = apply_to_dom(
        Container::query(&document, "#missing"),
        move |_, _| {
            counter.fetch_add(1, Ordering::SeqCst);
            ViewOutput::Tree(Observable::never())
        },
        DriverOptions::default(),
    );

    assert_eq!(result.err(), Some(Error::UnknownContainer("#missing".into())));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

/// A custom element as the view's root ends rendering before any patch.
#[test]
fn custom_element_root_is_rejected_before_patching() {
    let (_, app) = document_with_app();
    let registry = CustomElementRegistry::new();
    registry.register("my-label", label_view).unwrap();
    let (options, seen) = recording_options();

    let handle = apply_to_dom(
        &app,
        |_, _| ViewOutput::Tree(Observable::just(h("my-label").into())),
        options.with_registry(Arc::new(registry)),
    )
    .unwrap();

    assert_eq!(
        seen.lock().last(),
        Some(&Notification::Error(Error::CustomElementAsRoot {
            tag: "my-label".into()
        }))
    );
    assert_eq!(
        app.outer_html(),
        r#"<div id="app" class="app"><div class="app"></div></div>"#
    );
    handle.dispose();
}

/// Disposing twice is harmless and stops further rendering.
#[test]
fn dispose_is_idempotent() {
    let (_, app) = document_with_app();
    let trees = Subject::new();
    let source = trees.observable();
    let handle = apply_to_dom(
        &app,
        move |_, _| ViewOutput::Tree(source.clone()),
        DriverOptions::default(),
    )
    .unwrap();

    handle.dispose();
    handle.dispose();

    trees.next(h("div").text("late").into());
    assert!(handle.is_disposed());
    assert_eq!(app.text_content(), "");
}

/// A tree stream that ends without a value leaves only the placeholder.
#[test]
fn empty_tree_stream_publishes_only_the_placeholder() {
    let (_, app) = document_with_app();
    let (options, seen) = recording_options();

    apply_to_dom(&app, |_, _| ViewOutput::Tree(Observable::empty()), options).unwrap();

    assert_eq!(published_roots(&seen), vec![r#"<div class="app"></div>"#.to_owned()]);
}

/// A container marked as a custom-element host is rendered into directly.
#[test]
fn marked_container_is_used_as_the_root() {
    let host = Element::new("div");
    host.set_class_name("cycleCustomElement-my-tab");

    let handle = apply_to_dom(
        &host,
        |_, _| ViewOutput::Tree(Observable::just(h("div.tab").text("x").into())),
        DriverOptions::default(),
    )
    .unwrap();

    assert_eq!(handle.latest_root(), Some(host.clone()));
    assert_eq!(host.class_name(), "tab cycleCustomElement-my-tab");
    assert_eq!(host.text_content(), "x");
}

/// Clicks are delivered from whichever root is current, across re-renders.
#[test]
fn interactions_follow_re_renders() {
    let (_, app) = document_with_app();
    let clicks = Arc::new(AtomicUsize::new(0));

    let handle = apply_to_dom(
        &app,
        move |interactions, _| {
            let render = |count: usize| -> VirtualNode {
                h("div")
                    .child(h("button.go").text(count.to_string()))
                    .into()
            };
            let trees = interactions
                .get("button.go", "click")
                .unwrap()
                .map(move |_| render(clicks.fetch_add(1, Ordering::SeqCst) + 1))
                .start_with(render(0));
            ViewOutput::Tree(trees)
        },
        DriverOptions::default(),
    )
    .unwrap();

    let root = handle.latest_root().unwrap();
    assert_eq!(root.text_content(), "0");

    for expected in ["1", "2"] {
        let button = root.query_selector("button.go").unwrap().unwrap();
        button.dispatch_event(&Event::new("click"));
        assert_eq!(root.text_content(), expected);
    }
}

/// The parent's root for a cycle waits for a widget that publishes late.
#[tokio::test(start_paused = true)]
async fn delayed_widget_holds_back_the_parent_root() {
    let (_, app) = document_with_app();
    let (options, seen) = recording_options();

    let _handle = apply_to_dom(
        &app,
        |_, _| {
            let widget: Arc<dyn Widget> = Arc::new(Delayed {
                delay: Duration::from_millis(50),
            });
            ViewOutput::Tree(Observable::just(h("div").child(widget).into()))
        },
        options,
    )
    .unwrap();

    // Patched synchronously, but only the placeholder has been published.
    let root = app.child_elements().pop().unwrap();
    assert_eq!(root.child_count(), 1);
    assert_eq!(published_roots(&seen).len(), 1);

    tokio::time::sleep(Duration::from_millis(49)).await;
    assert_eq!(published_roots(&seen).len(), 1);

    tokio::time::sleep(Duration::from_millis(2)).await;
    assert_eq!(published_roots(&seen).len(), 2);
}

/// Custom elements render with their attributes as props and follow updates.
#[test]
fn custom_elements_receive_props_and_updates() {
    let (_, app) = document_with_app();
    let registry = CustomElementRegistry::new();
    registry.register("my-label", label_view).unwrap();
    let trees = Subject::new();
    let source = trees.observable();

    let handle = apply_to_dom(
        &app,
        move |_, _| ViewOutput::Tree(source.clone()),
        DriverOptions::default().with_registry(Arc::new(registry)),
    )
    .unwrap();

    trees.next(h("div").child(h("my-label").attr("label", "one")).into());
    let root = handle.latest_root().unwrap();
    let label = root.query_selector(".label").unwrap().unwrap();
    assert!(label.has_class("cycleCustomElement-my-label"));
    assert_eq!(root.text_content(), "one");

    trees.next(h("div").child(h("my-label").attr("label", "two")).into());
    assert_eq!(root.text_content(), "two");
    assert_eq!(root.query_selector(".label").unwrap(), Some(label));
}

/// Custom events bubble out of a custom element into the embedding view.
#[test]
fn custom_events_bubble_to_the_container() {
    let (_, app) = document_with_app();
    let registry = CustomElementRegistry::new();
    let changes = Subject::new();
    let source = changes.observable();
    registry
        .register("my-counter", move |_, _| {
            Sinks::new()
                .with_vtree(Observable::just(h("div.counter").into()))
                .with_event("changed", source.clone())
                .into()
        })
        .unwrap();

    let _handle = apply_to_dom(
        &app,
        |_, _| ViewOutput::Tree(Observable::just(h("div").child(h("my-counter")).into())),
        DriverOptions::default().with_registry(Arc::new(registry)),
    )
    .unwrap();

    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    app.add_event_listener("changed", move |event| {
        sink.lock().push(event.detail().cloned());
    });
    changes.next(json!({ "count": 5 }));

    assert_eq!(*seen.lock(), vec![Some(json!({ "count": 5 }))]);
}

/// Disposing a driver also stops the custom elements mounted in its tree.
#[test]
fn dispose_stops_nested_custom_elements() {
    let (_, app) = document_with_app();
    let registry = CustomElementRegistry::new();
    let inner = Subject::new();
    let source = inner.observable();
    registry
        .register("my-tab", move |_, _| ViewOutput::Tree(source.clone()))
        .unwrap();

    let handle = apply_to_dom(
        &app,
        |_, _| ViewOutput::Tree(Observable::just(h("div").child(h("my-tab")).into())),
        DriverOptions::default().with_registry(Arc::new(registry)),
    )
    .unwrap();

    inner.next(h("div").text("a").into());
    assert_eq!(app.text_content(), "a");
    assert_eq!(inner.observer_count(), 1);

    handle.dispose();

    assert_eq!(inner.observer_count(), 0);
    inner.next(h("div").text("b").into());
    assert_eq!(app.text_content(), "a");
}
