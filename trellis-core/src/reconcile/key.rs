//! Item keys for list reconciliation.

use crate::reactive::{TrackedKind, Value, ValueKey};

/// How a list item is matched against the previous render.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ItemKey {
    /// From the key expression, or the item's `id` field.
    Keyed(ValueKey),
    /// Identity token of a container item without an `id`.
    Identity(u64),
    /// Primitive value signature. Duplicates are matched first-in,
    /// first-out.
    Primitive(ValueKey),
}

/// Key for an item when no key expression is bound.
pub(crate) fn default_key(item: &Value) -> ItemKey {
    match item {
        Value::Object(tracked) => {
            if tracked.kind() == TrackedKind::Record {
                let id = tracked.peek("id");
                if !id.is_undefined() {
                    return ItemKey::Keyed(id.key());
                }
            }
            ItemKey::Identity(tracked.identity())
        }
        other => ItemKey::Primitive(other.key()),
    }
}
