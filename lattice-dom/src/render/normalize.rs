//! Custom-element substitution.

use std::sync::Arc;

use crate::config::DriverConfig;
use crate::custom_element::{CustomElementRegistry, CustomElementWidget, DefinitionFn};
use crate::vtree::{VElement, VirtualNode, Widget};

/// Replace every element whose tag is registered with the widget built by
/// `factory`.
///
/// The walk is top-down: a replaced element's children are handed to the
/// factory untouched. Text nodes and existing widgets are kept as they are.
pub fn replace_custom_elements<F>(
    tree: &VirtualNode,
    registry: &CustomElementRegistry,
    factory: &F,
) -> VirtualNode
where
    F: Fn(&VElement, DefinitionFn) -> Arc<dyn Widget>,
{
    let VirtualNode::Element(element) = tree else {
        return tree.clone();
    };
    if let Some(definition) = registry.get(element.tag()) {
        return VirtualNode::Widget(factory(element, definition));
    }
    if element.child_nodes().is_empty() {
        return tree.clone();
    }
    let children = element
        .child_nodes()
        .iter()
        .map(|child| replace_custom_elements(child, registry, factory))
        .collect();
    VirtualNode::Element(element.with_children(children))
}

/// Replace registered custom elements with [`CustomElementWidget`]s that
/// share `registry` and `config`.
pub fn normalize(
    tree: &VirtualNode,
    registry: &Arc<CustomElementRegistry>,
    config: &DriverConfig,
) -> VirtualNode {
    if registry.is_empty() {
        return tree.clone();
    }
    replace_custom_elements(tree, registry, &|element: &VElement, definition: DefinitionFn| {
        let widget: Arc<dyn Widget> = Arc::new(CustomElementWidget::new(
            element.clone(),
            definition,
            Arc::clone(registry),
            config.clone(),
        ));
        widget
    })
}
