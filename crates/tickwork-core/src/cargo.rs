//! Stack-based bounded cargo transfer into a slot inventory.
//!
//! [`TransferEngine::try_add`] places an incoming stack in two passes:
//!
//! 1. **Merge**: the first non-full slot holding the same item absorbs the
//!    stack. If it overflows, the slot is topped up and the surplus is placed
//!    recursively against the remaining slots. A failed recursion restores
//!    the slot from the journal and reports [`CargoStatus::Full`].
//! 2. **Empty slot**: otherwise the whole stack goes into the first empty slot.
//!
//! Slots below `reserved_slots` are never touched (slot 0 holds a battery).
//! A placement either succeeds completely or leaves the inventory untouched.

use crate::item::{ItemStack, SlotInventory};
use serde::{Deserialize, Serialize};

/// Default number of leading slots excluded from cargo placement.
pub const DEFAULT_RESERVED_SLOTS: usize = 1;

// ---------------------------------------------------------------------------
// Status and extraction result
// ---------------------------------------------------------------------------

/// Outcome of a cargo load or unload attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CargoStatus {
    Success,
    /// The destination has no room for the stack.
    Full,
    /// The source has nothing to give.
    Empty,
    /// The source has no reachable inventory.
    NoInventory,
    /// There is no source to talk to.
    NoTarget,
}

/// What a cargo source handed out (or would hand out, when simulated).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionResult {
    pub stack: Option<ItemStack>,
    pub status: CargoStatus,
}

impl ExtractionResult {
    pub fn success(stack: ItemStack) -> Self {
        Self {
            stack: Some(stack),
            status: CargoStatus::Success,
        }
    }

    pub fn failed(status: CargoStatus) -> Self {
        Self { stack: None, status }
    }

    /// The extracted stack, if it holds any items.
    pub fn non_empty_stack(&self) -> Option<&ItemStack> {
        self.stack.as_ref().filter(|s| !s.is_empty())
    }
}

/// A node other nodes can move cargo in and out of.
pub trait CargoEntity {
    /// Remove up to `max_count` items. With `simulate` set, nothing changes.
    fn remove_cargo(&mut self, simulate: bool, max_count: u32) -> ExtractionResult;

    /// Add a stack. With `simulate` set, nothing changes.
    fn add_cargo(&mut self, stack: &ItemStack, simulate: bool) -> CargoStatus;
}

// ---------------------------------------------------------------------------
// Journal
// ---------------------------------------------------------------------------

/// Previous slot contents captured before each mutation, restored in
/// reverse order on rollback.
#[derive(Debug, Default)]
struct Journal {
    entries: Vec<(usize, Option<ItemStack>)>,
}

impl Journal {
    fn record(&mut self, inventory: &SlotInventory, slot: usize) {
        self.entries.push((slot, inventory.get(slot).cloned()));
    }

    /// Undo everything recorded after `mark`.
    fn rollback_to(&mut self, inventory: &mut SlotInventory, mark: usize) {
        while self.entries.len() > mark {
            if let Some((slot, previous)) = self.entries.pop() {
                inventory.set(slot, previous);
            }
        }
    }

    fn mark(&self) -> usize {
        self.entries.len()
    }

    fn touched(&self, slot: usize) -> bool {
        self.entries.iter().any(|(s, _)| *s == slot)
    }
}

// ---------------------------------------------------------------------------
// Transfer engine
// ---------------------------------------------------------------------------

/// Places stacks into a destination [`SlotInventory`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferEngine {
    pub reserved_slots: usize,
}

impl Default for TransferEngine {
    fn default() -> Self {
        Self {
            reserved_slots: DEFAULT_RESERVED_SLOTS,
        }
    }
}

impl TransferEngine {
    pub fn new(reserved_slots: usize) -> Self {
        Self { reserved_slots }
    }

    /// Try to place `stack` into `inventory`.
    ///
    /// Returns [`CargoStatus::Success`] if the whole stack fits, otherwise
    /// [`CargoStatus::Full`]. When `commit` is false, or the placement fails,
    /// the inventory is left exactly as it was. An empty stack reports
    /// [`CargoStatus::Empty`].
    ///
    /// No slot ever ends up above its stack's `max_stack_size`; a larger offer
    /// is spread over several slots.
    pub fn try_add(
        &self,
        inventory: &mut SlotInventory,
        stack: &ItemStack,
        commit: bool,
    ) -> CargoStatus {
        if stack.is_empty() {
            return CargoStatus::Empty;
        }

        let mut journal = Journal::default();
        let status = self.place(inventory, stack, &mut journal);

        if !commit || status != CargoStatus::Success {
            journal.rollback_to(inventory, 0);
        }
        status
    }

    fn place(
        &self,
        inventory: &mut SlotInventory,
        stack: &ItemStack,
        journal: &mut Journal,
    ) -> CargoStatus {
        let slots = self.reserved_slots..inventory.len();

        // Merge pass.
        let merge_target = slots.clone().find(|&i| {
            !journal.touched(i)
                && inventory
                    .get(i)
                    .is_some_and(|existing| existing.matches(stack) && !existing.is_full())
        });

        if let Some(index) = merge_target {
            let mark = journal.mark();
            journal.record(inventory, index);
            let Some(existing) = inventory.get_mut(index) else {
                return CargoStatus::Full;
            };

            let max = existing.max_stack_size;
            let combined = u64::from(existing.quantity) + u64::from(stack.quantity);
            if combined <= u64::from(max) {
                existing.quantity += stack.quantity;
                return CargoStatus::Success;
            }

            // combined > max, and the surplus never exceeds the incoming quantity
            let surplus = (combined - u64::from(max)) as u32;
            existing.quantity = max;

            let rest = stack.with_quantity(surplus);
            if self.place(inventory, &rest, journal) == CargoStatus::Success {
                return CargoStatus::Success;
            }

            journal.rollback_to(inventory, mark);
            return CargoStatus::Full;
        }

        // Empty-slot pass. Offers above the stack cap spill into further empty slots.
        let empty = slots
            .clone()
            .find(|&i| !journal.touched(i) && inventory.get(i).is_none());
        if let Some(index) = empty {
            let mark = journal.mark();
            journal.record(inventory, index);
            let cap = stack.max_stack_size;
            if stack.quantity <= cap {
                inventory.set(index, Some(stack.clone()));
                return CargoStatus::Success;
            }

            inventory.set(index, Some(stack.with_quantity(cap)));
            let rest = stack.with_quantity(stack.quantity - cap);
            if self.place(inventory, &rest, journal) == CargoStatus::Success {
                return CargoStatus::Success;
            }

            journal.rollback_to(inventory, mark);
            return CargoStatus::Full;
        }

        CargoStatus::Full
    }
}

// ---------------------------------------------------------------------------
// Cargo hold
// ---------------------------------------------------------------------------

/// A docked vessel or container exposing its inventory as a [`CargoEntity`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CargoHold {
    /// `None` for holds without any cargo space.
    pub inventory: Option<SlotInventory>,
    /// An undocked hold reports [`CargoStatus::NoTarget`].
    pub docked: bool,
}

impl CargoHold {
    pub fn new(slots: usize) -> Self {
        Self {
            inventory: Some(SlotInventory::new(slots)),
            docked: true,
        }
    }

    /// A hold with no inventory at all.
    pub fn without_inventory() -> Self {
        Self {
            inventory: None,
            docked: true,
        }
    }

    pub fn total_items(&self) -> u64 {
        self.inventory.as_ref().map_or(0, SlotInventory::total_items)
    }
}

impl CargoEntity for CargoHold {
    /// Reports `NoInventory`, then `NoTarget`, then `Empty`, in that priority.
    /// Takes from the last non-empty slot first.
    fn remove_cargo(&mut self, simulate: bool, max_count: u32) -> ExtractionResult {
        let Some(inventory) = self.inventory.as_mut() else {
            return ExtractionResult::failed(CargoStatus::NoInventory);
        };
        if !self.docked {
            return ExtractionResult::failed(CargoStatus::NoTarget);
        }
        let Some(index) = (0..inventory.len()).rev().find(|&i| inventory.get(i).is_some()) else {
            return ExtractionResult::failed(CargoStatus::Empty);
        };
        let Some(source) = inventory.get_mut(index) else {
            return ExtractionResult::failed(CargoStatus::Empty);
        };

        let taken = max_count.min(source.quantity);
        if taken == 0 {
            return ExtractionResult::failed(CargoStatus::Empty);
        }
        let result = source.with_quantity(taken);
        if !simulate {
            let remaining = source.quantity - taken;
            let leftover = source.with_quantity(remaining);
            inventory.set(index, Some(leftover));
        }
        ExtractionResult::success(result)
    }

    fn add_cargo(&mut self, stack: &ItemStack, simulate: bool) -> CargoStatus {
        let Some(inventory) = self.inventory.as_mut() else {
            return CargoStatus::NoInventory;
        };
        if !self.docked {
            return CargoStatus::NoTarget;
        }
        TransferEngine::new(0).try_add(inventory, stack, !simulate)
    }
}

// ===========================================================================
// Tests
// ===========================================================================
