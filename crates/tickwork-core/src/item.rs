use crate::id::ItemTypeId;
use serde::{Deserialize, Serialize};

/// Default maximum stack size for item types that don't specify one.
pub const DEFAULT_MAX_STACK: u32 = 64;

/// A stack of fungible items of a single type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemStack {
    pub item_type: ItemTypeId,
    pub quantity: u32,
    /// Largest quantity a single slot may hold for this item type.
    pub max_stack_size: u32,
}

impl ItemStack {
    pub fn new(item_type: ItemTypeId, quantity: u32) -> Self {
        Self::with_max(item_type, quantity, DEFAULT_MAX_STACK)
    }

    pub fn with_max(item_type: ItemTypeId, quantity: u32, max_stack_size: u32) -> Self {
        Self {
            item_type,
            quantity,
            max_stack_size: max_stack_size.max(1),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.quantity == 0
    }

    /// True if both stacks hold the same item identity and may merge.
    pub fn matches(&self, other: &ItemStack) -> bool {
        self.item_type == other.item_type
    }

    pub fn is_full(&self) -> bool {
        self.quantity >= self.max_stack_size
    }

    /// Copy of this stack carrying a different quantity.
    pub fn with_quantity(&self, quantity: u32) -> Self {
        Self {
            quantity,
            ..self.clone()
        }
    }

    /// Split up to `count` items off this stack. Returns `None` if nothing was split.
    pub fn split_off(&mut self, count: u32) -> Option<ItemStack> {
        let taken = count.min(self.quantity);
        if taken == 0 {
            return None;
        }
        self.quantity -= taken;
        Some(self.with_quantity(taken))
    }
}

/// Fixed-size indexed slot array. Each slot is empty or holds one stack.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotInventory {
    slots: Vec<Option<ItemStack>>,
}

impl SlotInventory {
    pub fn new(size: usize) -> Self {
        Self {
            slots: vec![None; size],
        }
    }

    /// Number of slots, occupied or not.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(|s| s.is_none())
    }

    /// Get the stack at `index`. Out of range reads as empty.
    pub fn get(&self, index: usize) -> Option<&ItemStack> {
        self.slots.get(index).and_then(|s| s.as_ref())
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut ItemStack> {
        self.slots.get_mut(index).and_then(|s| s.as_mut())
    }

    /// Replace the contents of `index`. Empty stacks are stored as `None`.
    /// Writes outside the slot range are ignored.
    pub fn set(&mut self, index: usize, stack: Option<ItemStack>) {
        if let Some(slot) = self.slots.get_mut(index) {
            *slot = stack.filter(|s| !s.is_empty());
        }
    }

    /// Remove and return the stack at `index`.
    pub fn take(&mut self, index: usize) -> Option<ItemStack> {
        self.slots.get_mut(index).and_then(Option::take)
    }

    /// Total items across all slots.
    pub fn total_items(&self) -> u64 {
        self.slots
            .iter()
            .flatten()
            .map(|s| u64::from(s.quantity))
            .sum()
    }

    /// Total items of one type across all slots.
    pub fn count_of(&self, item_type: ItemTypeId) -> u64 {
        self.slots
            .iter()
            .flatten()
            .filter(|s| s.item_type == item_type)
            .map(|s| u64::from(s.quantity))
            .sum()
    }

    /// Iterate `(index, stack)` over occupied slots.
    pub fn occupied(&self) -> impl Iterator<Item = (usize, &ItemStack)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, s)| s.as_ref().map(|s| (i, s)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_inventory_is_empty() {
        let inv = SlotInventory::new(15);
        assert_eq!(inv.len(), 15);
        assert!(inv.is_empty());
        assert_eq!(inv.total_items(), 0);
    }

    #[test]
    fn set_and_get_slot() {
        let mut inv = SlotInventory::new(3);
        inv.set(1, Some(ItemStack::new(ItemTypeId(7), 12)));
        assert_eq!(inv.get(1).map(|s| s.quantity), Some(12));
        assert!(inv.get(0).is_none());
        assert!(inv.get(99).is_none());
    }

    #[test]
    fn setting_an_empty_stack_clears_slot() {
        let mut inv = SlotInventory::new(2);
        inv.set(0, Some(ItemStack::new(ItemTypeId(1), 4)));
        inv.set(0, Some(ItemStack::new(ItemTypeId(1), 0)));
        assert!(inv.get(0).is_none());
    }

    #[test]
    fn out_of_range_set_is_ignored() {
        let mut inv = SlotInventory::new(2);
        inv.set(5, Some(ItemStack::new(ItemTypeId(1), 4)));
        assert_eq!(inv.total_items(), 0);
    }

    #[test]
    fn split_off_clamps_to_quantity() {
        let mut stack = ItemStack::new(ItemTypeId(2), 5);
        let split = stack.split_off(8).unwrap();
        assert_eq!(split.quantity, 5);
        assert!(stack.is_empty());
        assert!(stack.split_off(1).is_none());
    }

    #[test]
    fn count_of_sums_matching_slots_only() {
        let mut inv = SlotInventory::new(4);
        inv.set(0, Some(ItemStack::new(ItemTypeId(1), 10)));
        inv.set(2, Some(ItemStack::new(ItemTypeId(1), 5)));
        inv.set(3, Some(ItemStack::new(ItemTypeId(2), 7)));
        assert_eq!(inv.count_of(ItemTypeId(1)), 15);
        assert_eq!(inv.total_items(), 22);
        assert_eq!(inv.occupied().count(), 3);
    }

    #[test]
    fn zero_max_stack_is_raised_to_one() {
        let stack = ItemStack::with_max(ItemTypeId(0), 1, 0);
        assert_eq!(stack.max_stack_size, 1);
        assert!(stack.is_full());
    }
}
