//! Rendering and patching live nodes.

use crate::dom::{Element, Node, Text};
use crate::error::{Error, Result};

use super::diff::{AttributeChange, ChildPatch, NodePatch, Patch};
use super::node::VirtualNode;

/// Build a detached live node from a virtual tree.
pub fn create_node(tree: &VirtualNode) -> Result<Node> {
    match tree {
        VirtualNode::Text(text) => Ok(Text::new(text.clone()).into()),
        VirtualNode::Widget(widget) => Ok(widget.init()?.into()),
        VirtualNode::Element(description) => {
            let element = match description.namespace_uri() {
                Some(namespace) => Element::with_namespace(description.tag(), namespace),
                None => Element::new(description.tag()),
            };
            for (name, value) in description.attributes() {
                element.set_attribute(name, value.clone());
            }
            for child in description.child_nodes() {
                element.append_child(create_node(child)?);
            }
            Ok(element.into())
        }
    }
}

/// Apply `patch` to `node` and return the node that now stands for the new
/// tree.
///
/// When the node has to be replaced and has a parent, the replacement takes
/// its place in the parent.
pub fn patch(node: &Node, patch: &Patch) -> Result<Node> {
    apply(node, &patch.root)
}

fn apply(node: &Node, patch: &NodePatch) -> Result<Node> {
    match patch {
        NodePatch::Keep => Ok(node.clone()),
        NodePatch::Replace { previous, next } => {
            let replacement = create_node(next)?;
            tracing::trace!(node = node.id().raw(), "replacing node");
            replace(node, replacement.clone());
            destroy_widgets(previous, node);
            Ok(replacement)
        }
        NodePatch::Text(content) => match node {
            Node::Text(text) => {
                text.set_content(content.clone());
                Ok(node.clone())
            }
            Node::Element(_) => {
                let replacement: Node = Text::new(content.clone()).into();
                replace(node, replacement.clone());
                Ok(replacement)
            }
        },
        NodePatch::Widget { previous, next } => {
            let Some(element) = node.as_element() else {
                return Err(Error::PatchMismatch(format!(
                    "widget '{}' rendered a text node",
                    previous.name()
                )));
            };
            match next.update(previous.as_ref(), element)? {
                Some(updated) if &updated != element => {
                    let replacement: Node = updated.into();
                    replace(node, replacement.clone());
                    Ok(replacement)
                }
                _ => Ok(node.clone()),
            }
        }
        NodePatch::Element {
            attributes,
            children,
        } => {
            let Some(element) = node.as_element() else {
                return Err(Error::PatchMismatch(
                    "element patch applied to a text node".into(),
                ));
            };
            for change in attributes {
                match change {
                    AttributeChange::Set(name, value) => element.set_attribute(name, value.clone()),
                    AttributeChange::Remove(name) => {
                        element.remove_attribute(name);
                    }
                }
            }
            for change in children {
                apply_child(element, change)?;
            }
            Ok(node.clone())
        }
    }
}

fn apply_child(element: &Element, change: &ChildPatch) -> Result<()> {
    match change {
        ChildPatch::Update { index, patch } => {
            let child = element.child(*index).ok_or_else(|| {
                Error::PatchMismatch(format!("<{}> has no child {index}", element.tag_name()))
            })?;
            apply(&child, patch)?;
        }
        ChildPatch::Remove { index, previous } => {
            if let Some(removed) = element.remove_child_at(*index) {
                destroy_widgets(previous, &removed);
            }
        }
        ChildPatch::Append(tree) => element.append_child(create_node(tree)?),
    }
    Ok(())
}

fn replace(node: &Node, replacement: Node) {
    if let Some(parent) = node.parent() {
        parent.replace_child(node, replacement);
    }
}

/// Let every widget in a discarded subtree release its element.
/// Destroy every widget of `tree`, rendered as `node`, without touching
/// the live nodes themselves.
pub fn destroy_widgets(tree: &VirtualNode, node: &Node) {
    let Some(element) = node.as_element() else {
        return;
    };
    match tree {
        VirtualNode::Widget(widget) => widget.destroy(element),
        VirtualNode::Element(description) => {
            for (child_tree, child) in description.child_nodes().iter().zip(element.children()) {
                destroy_widgets(child_tree, &child);
            }
        }
        VirtualNode::Text(_) => {}
    }
}

#[cfg(test)]
mod tests {
    use std::any::Any;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use super::*;
    use crate::vtree::{diff, h, Widget};

    fn render(tree: &VirtualNode) -> Node {
        create_node(tree).unwrap()
    }

    fn update(old: &VirtualNode, new: &VirtualNode, node: &Node) -> Node {
        patch(node, &diff(old, new)).unwrap()
    }

    #[derive(Default)]
    struct Counter {
        inits: AtomicUsize,
        updates: AtomicUsize,
        destroys: AtomicUsize,
    }

    struct Badge {
        label: String,
        counter: Arc<Counter>,
    }

    impl Widget for Badge {
        fn name(&self) -> &str {
            "badge"
        }

        fn init(&self) -> Result<Element> {
            self.counter.inits.fetch_add(1, Ordering::SeqCst);
            let element = Element::new("span");
            element.set_class_name("badge");
            element.append_child(Text::new(self.label.clone()));
            Ok(element)
        }

        fn update(&self, _previous: &dyn Widget, element: &Element) -> Result<Option<Element>> {
            self.counter.updates.fetch_add(1, Ordering::SeqCst);
            element.clear_children();
            element.append_child(Text::new(self.label.clone()));
            Ok(None)
        }

        fn destroy(&self, _element: &Element) {
            self.counter.destroys.fetch_add(1, Ordering::SeqCst);
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    fn badge(label: &str, counter: &Arc<Counter>) -> VirtualNode {
        let widget: Arc<dyn Widget> = Arc::new(Badge {
            label: label.to_owned(),
            counter: Arc::clone(counter),
        });
        widget.into()
    }

    #[test]
    fn create_node_renders_attributes_and_children() {
        let node = render(&h("ul.list#main").child(h("li").text("one")).into());
        assert_eq!(
            node.outer_html(),
            r#"<ul id="main" class="list"><li>one</li></ul>"#
        );
    }

    #[test]
    fn text_changes_reuse_the_text_node() {
        let old: VirtualNode = h("p").text("a").into();
        let new: VirtualNode = h("p").text("b").into();
        let node = render(&old);
        let text_before = node.as_element().unwrap().child(0).unwrap();

        let patched = update(&old, &new, &node);

        assert_eq!(patched, node);
        assert_eq!(node.as_element().unwrap().child(0).unwrap(), text_before);
        assert_eq!(node.text_content(), "b");
    }

    #[test]
    fn replacement_takes_the_place_in_the_parent() {
        let parent = Element::new("div");
        let old: VirtualNode = h("span").into();
        let new: VirtualNode = h("em").into();
        let node = render(&old);
        parent.append_child(node.clone());

        let patched = update(&old, &new, &node);

        assert_ne!(patched, node);
        assert!(node.parent().is_none());
        assert_eq!(parent.child(0), Some(patched));
        assert_eq!(parent.outer_html(), "<div><em></em></div>");
    }

    #[test]
    fn children_are_added_and_removed() {
        let old: VirtualNode = h("ul").children(["a", "b", "c"]).into();
        let fewer: VirtualNode = h("ul").children(["a"]).into();
        let more: VirtualNode = h("ul").children(["a", "x", "y"]).into();
        let node = render(&old);

        update(&old, &fewer, &node);
        assert_eq!(node.text_content(), "a");

        update(&fewer, &more, &node);
        assert_eq!(node.text_content(), "axy");
    }

    #[test]
    fn widgets_are_updated_in_place_and_destroyed_on_removal() {
        let counter = Arc::new(Counter::default());
        let first: VirtualNode = h("div").child(badge("1", &counter)).into();
        let second: VirtualNode = h("div").child(badge("2", &counter)).into();
        let gone: VirtualNode = h("div").into();

        let node = render(&first);
        let span = node.as_element().unwrap().child(0).unwrap();
        update(&first, &second, &node);

        assert_eq!(node.as_element().unwrap().child(0), Some(span));
        assert_eq!(node.text_content(), "2");
        assert_eq!(counter.inits.load(Ordering::SeqCst), 1);
        assert_eq!(counter.updates.load(Ordering::SeqCst), 1);

        update(&second, &gone, &node);
        assert_eq!(counter.destroys.load(Ordering::SeqCst), 1);
        assert_eq!(node.as_element().unwrap().child_count(), 0);
    }

    #[test]
    fn replacing_a_subtree_destroys_nested_widgets() {
        let counter = Arc::new(Counter::default());
        let old: VirtualNode = h("div").child(h("section").child(badge("x", &counter))).into();
        let new: VirtualNode = h("p").into();
        let node = render(&old);

        update(&old, &new, &node);

        assert_eq!(counter.destroys.load(Ordering::SeqCst), 1);
    }
}
