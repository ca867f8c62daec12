use serde::{Deserialize, Serialize};
use slotmap::new_key_type;

new_key_type! {
    /// Identifies a placed node (machine, unloader, cargo hold, facade).
    ///
    /// Keys are generational: a key kept after its node was removed never
    /// resolves to a node placed later in the same slot.
    pub struct NodeId;
}

/// Identifies an item type. Cheap to copy and compare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ItemTypeId(pub u32);
