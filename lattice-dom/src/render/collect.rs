//! Widget root-stream collection.

use crate::dom::Element;
use crate::stream::Observable;
use crate::vtree::VirtualNode;

/// Root-element streams of every widget embedded in `tree`.
///
/// A widget with a root stream contributes exactly that stream and is not
/// looked into. Children are visited last to first.
pub fn collect_root_streams(tree: &VirtualNode) -> Vec<Observable<Element>> {
    let mut streams = Vec::new();
    collect_into(tree, &mut streams);
    streams
}

fn collect_into(tree: &VirtualNode, streams: &mut Vec<Observable<Element>>) {
    if let VirtualNode::Widget(widget) = tree {
        if let Some(stream) = widget.root_elem_stream() {
            streams.push(stream);
            return;
        }
    }
    for child in tree.children().iter().rev() {
        collect_into(child, streams);
    }
}

#[cfg(test)]
mod tests {
    use std::any::Any;
    use std::sync::Arc;

    use parking_lot::Mutex;

    use super::*;
    use crate::error::Result;
    use crate::vtree::{h, Widget};

    struct Tagged {
        label: &'static str,
        element: Element,
    }

    impl Widget for Tagged {
        fn name(&self) -> &str {
            self.label
        }

        fn init(&self) -> Result<Element> {
            Ok(self.element.clone())
        }

        fn update(&self, _previous: &dyn Widget, _element: &Element) -> Result<Option<Element>> {
            Ok(None)
        }

        fn root_elem_stream(&self) -> Option<Observable<Element>> {
            let element = self.element.clone();
            element.set_attribute("data-label", self.label);
            Some(Observable::just(element))
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    fn tagged(label: &'static str) -> VirtualNode {
        let widget: Arc<dyn Widget> = Arc::new(Tagged {
            label,
            element: Element::new("div"),
        });
        widget.into()
    }

    fn labels(streams: &[Observable<Element>]) -> Vec<String> {
        let seen = Arc::new(Mutex::new(Vec::new()));
        for stream in streams {
            let seen = Arc::clone(&seen);
            stream.subscribe(move |element| {
                seen.lock().push(element.attribute("data-label").unwrap_or_default());
            });
        }
        let labels = seen.lock().clone();
        labels
    }

    #[test]
    fn leaves_without_widgets_yield_nothing() {
        assert!(collect_root_streams(&h("div").text("x").into()).is_empty());
        assert!(collect_root_streams(&"text".into()).is_empty());
    }

    #[test]
    fn children_are_collected_in_reverse_order() {
        let tree: VirtualNode = h("div")
            .child(tagged("a"))
            .child(h("p").child(tagged("b")).child(tagged("c")))
            .into();

        let streams = collect_root_streams(&tree);

        assert_eq!(labels(&streams), vec!["c", "b", "a"]);
    }
}
