//! Deep merging of document layers.
//!
//! Layers are merged in order, each later layer overriding the one beneath:
//!
//! - mappings merge key by key, recursing where both sides define a key
//! - sequences keep every base element; an overlay mapping merges into the
//!   base mapping at the same index, every other overlay element is appended
//! - anything else (scalars, or two different kinds) is replaced by the overlay
//!
//! Merging mapping elements by index lets a service file tweak a single field
//! of one list element, e.g. the `servicePort` of the first port mapping,
//! without restating the rest of the list. Scalar lists such as notification
//! rooms accumulate across layers instead, duplicates included.

use super::Node;

/// Merge `overlay` on top of `base`.
pub fn merge(base: Node, overlay: Node) -> Node {
  match (base, overlay) {
    (Node::Mapping(mut base), Node::Mapping(overlay)) => {
      for (key, value) in overlay {
        let merged = match base.remove(&key) {
          Some(existing) => merge(existing, value),
          None => value,
        };
        base.insert(key, merged);
      }
      Node::Mapping(base)
    }
    (Node::Sequence(mut base), Node::Sequence(overlay)) => {
      let mut appended = Vec::new();
      for (index, value) in overlay.into_iter().enumerate() {
        match (base.get_mut(index), value) {
          (Some(existing @ Node::Mapping(_)), value @ Node::Mapping(_)) => {
            *existing = merge(std::mem::take(existing), value);
          }
          (_, value) => appended.push(value),
        }
      }
      base.extend(appended);
      Node::Sequence(base)
    }
    (_, overlay) => overlay,
  }
}

/// Merge a stack of layers, lowest priority first.
pub fn merge_all(layers: impl IntoIterator<Item = Node>) -> Node {
  layers.into_iter().fold(Node::default(), merge)
}
