//! Diff/patch sequencing.
//!
//! The sequencer owns the current root element. Every consecutive pair of
//! trees is diffed and patched into it synchronously; the resulting root is
//! reported immediately, or once every widget embedded in the new tree has
//! published its own root. The last applied tree is kept so that its
//! widgets can be destroyed when the driver goes away.

use std::sync::Arc;

use parking_lot::Mutex;

use super::collect::collect_root_streams;
use super::metadata::MetadataTable;
use super::normalize::normalize;
use crate::config::DriverConfig;
use crate::custom_element::{CustomElementRegistry, CustomElementWidget};
use crate::dom::{Element, Node};
use crate::error::{Error, Result};
use crate::stream::Observable;
use crate::vtree::{destroy_widgets, diff, patch, VirtualNode};

/// Fail when a custom element is used as the top-level tree of a view.
pub fn check_root_not_custom_element(tree: &VirtualNode) -> Result<()> {
    let Some(widget) = tree.as_widget() else {
        return Ok(());
    };
    if !widget.is_custom_element() {
        return Ok(());
    }
    let tag = widget
        .as_any()
        .downcast_ref::<CustomElementWidget>()
        .map(|custom| custom.tag().to_owned())
        .unwrap_or_else(|| widget.name().to_owned());
    tracing::warn!(%tag, "custom element used as the root of a view");
    Err(Error::CustomElementAsRoot { tag })
}

/// Applies consecutive trees to a root element, one patch per pair.
#[derive(Debug, Clone)]
pub struct Sequencer {
    root: Arc<Mutex<Element>>,
    rendered: Arc<Mutex<VirtualNode>>,
}

impl Sequencer {
    /// Start from an already mounted root.
    pub fn new(root: Element) -> Self {
        Self {
            root: Arc::new(Mutex::new(root)),
            rendered: Arc::new(Mutex::new(VirtualNode::empty())),
        }
    }

    /// The root as of the last patch.
    pub fn root(&self) -> Element {
        self.root.lock().clone()
    }

    /// Patch the root from `previous` to `current`.
    ///
    /// The patch is applied before this returns. The returned stream emits
    /// the current root right away when `current` embeds no widget roots,
    /// otherwise once all of them have emitted and again on every later
    /// emission. A missing `current` yields an empty stream and no patch.
    pub fn diff_and_patch(
        &self,
        previous: &VirtualNode,
        current: Option<&VirtualNode>,
    ) -> Observable<Element> {
        let Some(current) = current else {
            return Observable::empty();
        };

        let widget_roots = collect_root_streams(current);
        let previous_root = self.root();
        let patched = patch(&Node::Element(previous_root.clone()), &diff(previous, current));
        let root = match patched {
            Ok(Node::Element(root)) => root,
            Ok(Node::Text(_)) => return Observable::throw(Error::RootNotElement),
            Err(error) => {
                tracing::error!(%error, "patching the root failed");
                return Observable::throw(error);
            }
        };

        MetadataTable::carry_forward(previous_root.id(), root.id());
        *self.root.lock() = root.clone();
        *self.rendered.lock() = current.clone();
        tracing::debug!(
            root = root.id().raw(),
            replaced = root != previous_root,
            widgets = widget_roots.len(),
            "patched root"
        );

        if widget_roots.is_empty() {
            return Observable::just(root);
        }
        let slot = Arc::clone(&self.root);
        Observable::combine_latest(widget_roots).map(move |_| slot.lock().clone())
    }

    /// Destroy the widgets of the last applied tree.
    ///
    /// The live nodes stay where they are. Later calls do nothing until
    /// another tree has been applied.
    pub fn unmount(&self) {
        let rendered = std::mem::replace(&mut *self.rendered.lock(), VirtualNode::empty());
        let root = self.root();
        tracing::debug!(root = root.id().raw(), "destroying rendered widgets");
        destroy_widgets(&rendered, &Node::Element(root));
    }
}

/// Pick the element a driver renders into.
///
/// A container marked as a custom-element host is used directly. Any other
/// container is emptied and given a fresh `root_tag` child.
pub fn render_root(container: &Element, config: &DriverConfig) -> Element {
    if config.is_custom_element_mount(&container.class_name()) {
        return container.clone();
    }
    container.clear_children();
    let root = Element::new(&config.root_tag);
    container.append_child(root.clone());
    root
}

/// The raw root stream: the mounted root, then the root after every patch.
pub fn render_raw_root_stream(
    trees: Observable<VirtualNode>,
    sequencer: Sequencer,
    registry: Arc<CustomElementRegistry>,
    config: DriverConfig,
) -> Observable<Element> {
    let root = sequencer.root();
    trees
        .start_with(VirtualNode::empty())
        .map(move |tree| normalize(&tree, &registry, &config))
        .try_tap(check_root_not_custom_element)
        .pairwise()
        .flat_map(move |(previous, current)| {
            sequencer.diff_and_patch(&previous, Some(&current))
        })
        .start_with(root)
}

#[cfg(test)]
mod tests {
    use std::any::Any;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use super::*;
    use crate::driver::ViewOutput;
    use crate::render::CustomElementMetadata;
    use crate::stream::{Notification, ReplaySubject, Subject};
    use crate::vtree::{h, Widget};

    fn collect(stream: &Observable<Element>) -> Arc<Mutex<Vec<Notification<Element>>>> {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        stream.subscribe_with(move |n| sink.lock().push(n));
        seen
    }

    #[derive(Default)]
    struct Deferred {
        roots: ReplaySubject<Element>,
        destroyed: Arc<AtomicUsize>,
    }

    impl Widget for Deferred {
        fn name(&self) -> &str {
            "deferred"
        }

        fn init(&self) -> Result<Element> {
            Ok(Element::new("aside"))
        }

        fn update(&self, _previous: &dyn Widget, _element: &Element) -> Result<Option<Element>> {
            Ok(None)
        }

        fn destroy(&self, _element: &Element) {
            self.destroyed.fetch_add(1, Ordering::SeqCst);
        }

        fn root_elem_stream(&self) -> Option<Observable<Element>> {
            Some(self.roots.observable())
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    #[test]
    fn missing_tree_yields_nothing() {
        let sequencer = Sequencer::new(Element::new("div"));
        let seen = collect(&sequencer.diff_and_patch(&VirtualNode::empty(), None));
        assert_eq!(*seen.lock(), vec![Notification::Complete]);
    }

    #[test]
    fn patch_without_widgets_emits_immediately() {
        let root = Element::new("div");
        let sequencer = Sequencer::new(root.clone());
        let next: VirtualNode = h("div.greeting").text("hi").into();

        let seen = collect(&sequencer.diff_and_patch(&VirtualNode::empty(), Some(&next)));

        assert_eq!(
            *seen.lock(),
            vec![Notification::Next(root.clone()), Notification::Complete]
        );
        assert_eq!(root.outer_html(), r#"<div class="greeting">hi</div>"#);
    }

    #[test]
    fn replaced_root_is_tracked_and_keeps_metadata() {
        let root = Element::new("div");
        MetadataTable::insert(
            root.id(),
            CustomElementMetadata {
                tag: "my-tab".into(),
            },
        );
        let sequencer = Sequencer::new(root.clone());
        let next: VirtualNode = h("section").into();

        sequencer.diff_and_patch(&VirtualNode::empty(), Some(&next));

        let replaced = sequencer.root();
        assert_ne!(replaced, root);
        assert_eq!(replaced.tag_name(), "section");
        assert_eq!(
            MetadataTable::get(replaced.id()).map(|m| m.tag),
            Some("my-tab".to_owned())
        );
        assert!(MetadataTable::get(root.id()).is_none());

        let third: VirtualNode = h("article").into();
        sequencer.diff_and_patch(&next, Some(&third));
        let latest = sequencer.root();
        assert_eq!(latest.tag_name(), "article");
        assert!(MetadataTable::get(replaced.id()).is_none());
        assert_eq!(
            MetadataTable::get(latest.id()).map(|m| m.tag),
            Some("my-tab".to_owned())
        );
        MetadataTable::remove(latest.id());
    }

    #[test]
    fn waits_for_widget_roots_before_emitting() {
        let root = Element::new("div");
        let sequencer = Sequencer::new(root.clone());
        let roots = ReplaySubject::new();
        let widget: Arc<dyn Widget> = Arc::new(Deferred {
            roots: roots.clone(),
            ..Deferred::default()
        });
        let next: VirtualNode = h("div").child(widget).into();

        let seen = collect(&sequencer.diff_and_patch(&VirtualNode::empty(), Some(&next)));

        // Patched already, but not reported yet.
        assert_eq!(root.child_count(), 1);
        assert!(seen.lock().is_empty());

        roots.next(Element::new("aside"));
        assert_eq!(*seen.lock(), vec![Notification::Next(root.clone())]);

        roots.next(Element::new("aside"));
        assert_eq!(seen.lock().len(), 2);
    }

    #[test]
    fn unmount_destroys_widgets_of_the_last_tree_once() {
        let root = Element::new("div");
        let sequencer = Sequencer::new(root.clone());
        let destroyed = Arc::new(AtomicUsize::new(0));
        let widget: Arc<dyn Widget> = Arc::new(Deferred {
            destroyed: Arc::clone(&destroyed),
            ..Deferred::default()
        });
        let next: VirtualNode = h("div").child(h("p").child(widget)).into();
        sequencer.diff_and_patch(&VirtualNode::empty(), Some(&next));

        sequencer.unmount();
        sequencer.unmount();

        assert_eq!(destroyed.load(Ordering::SeqCst), 1);
        assert_eq!(root.child_count(), 1);
    }

    #[test]
    fn render_root_mounts_a_fresh_child() {
        let config = DriverConfig::default();
        let container = Element::new("div");
        container.append_child(Element::new("p"));

        let root = render_root(&container, &config);

        assert_eq!(container.children(), vec![Node::Element(root.clone())]);
        assert_eq!(root.tag_name(), "div");
    }

    #[test]
    fn render_root_uses_custom_element_hosts_directly() {
        let config = DriverConfig::default();
        let host = Element::new("div");
        host.set_class_name("cycleCustomElement-my-tab");
        host.append_child(Element::new("p"));

        let root = render_root(&host, &config);

        assert_eq!(root, host);
        assert_eq!(host.child_count(), 1);
    }

    #[test]
    fn raw_stream_starts_with_the_mounted_root() {
        let root = Element::new("div");
        let trees = Subject::new();
        let raw = render_raw_root_stream(
            trees.observable(),
            Sequencer::new(root.clone()),
            Arc::new(CustomElementRegistry::new()),
            DriverConfig::default(),
        );

        let seen = collect(&raw);
        assert_eq!(*seen.lock(), vec![Notification::Next(root.clone())]);

        trees.next(h("div.greeting").text("hi").into());
        assert_eq!(seen.lock().len(), 2);
        assert_eq!(root.text_content(), "hi");

        trees.next(h("div.greeting").text("bye").into());
        assert_eq!(seen.lock().len(), 3);
        assert_eq!(root.text_content(), "bye");
    }

    #[test]
    fn custom_element_root_fails_before_patching() {
        let registry = CustomElementRegistry::new();
        registry
            .register("my-tab", |_, _| ViewOutput::Tree(Observable::never()))
            .unwrap();
        let root = Element::new("div");
        let trees = Subject::new();
        let raw = render_raw_root_stream(
            trees.observable(),
            Sequencer::new(root.clone()),
            Arc::new(registry),
            DriverConfig::default(),
        );
        let seen = collect(&raw);

        trees.next(h("my-tab").into());

        assert_eq!(
            seen.lock().last(),
            Some(&Notification::Error(Error::CustomElementAsRoot {
                tag: "my-tab".into()
            }))
        );
        assert_eq!(root.outer_html(), "<div></div>");
    }

    #[tokio::test(start_paused = true)]
    async fn delayed_widget_root_holds_back_the_cycle() {
        let root = Element::new("div");
        let sequencer = Sequencer::new(root.clone());
        let roots = ReplaySubject::new();
        let widget: Arc<dyn Widget> = Arc::new(Deferred {
            roots: roots.clone(),
            ..Deferred::default()
        });
        let next: VirtualNode = h("div").child(widget).into();
        let _timer = Observable::<()>::timer(Duration::from_millis(50)).subscribe(move |_| {
            roots.next(Element::new("aside"));
        });

        let seen = collect(&sequencer.diff_and_patch(&VirtualNode::empty(), Some(&next)));
        assert!(seen.lock().is_empty());

        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(seen.lock().len(), 1);
    }
}
