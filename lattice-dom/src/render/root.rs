//! Root-element fix-up and replay.

use smallvec::SmallVec;

use crate::dom::Element;
use crate::stream::{Observable, Replayed};

/// Turn the raw root stream into the replayed "current root" stream.
///
/// The container's classes are read once, now. Every root that passes
/// through gets whichever of them it lacks appended after its own classes,
/// so a root never carries fewer classes than the container it was rendered
/// for. Nothing runs until the result is connected.
pub fn fix_root_stream(raw: Observable<Element>, container: &Element) -> Replayed<Element> {
    let original: SmallVec<[String; 4]> = container.class_list();
    raw.map(move |root| {
        restore_classes(&root, &original);
        root
    })
    .replay()
}

fn restore_classes(root: &Element, original: &[String]) {
    let mut classes = root.class_list();
    let before = classes.len();
    for class in original {
        if !classes.contains(class) {
            classes.push(class.clone());
        }
    }
    if classes.len() != before {
        let class_name = classes.join(" ");
        tracing::trace!(root = root.id().raw(), class = %class_name, "restored root classes");
        root.set_class_name(&class_name);
    }
}
