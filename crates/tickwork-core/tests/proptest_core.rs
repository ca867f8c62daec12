//! Property-based tests for the Tickwork core.
//!
//! Uses proptest to generate random stores, inventories and unload scenes,
//! then verify the clamping, atomicity and conservation invariants hold.

use tickwork_core::cargo::{CargoStatus, TransferEngine};
use tickwork_core::energy::ResourceStore;
use tickwork_core::fixed::{Fixed64, ZERO};
use tickwork_core::id::ItemTypeId;
use tickwork_core::item::{ItemStack, SlotInventory};
use tickwork_core::machine::MachineState;
use tickwork_core::test_utils::*;
use proptest::prelude::*;

// ===========================================================================
// Generators
// ===========================================================================

fn arb_stack() -> impl Strategy<Value = ItemStack> {
    (0..3u32, 1..=64u32).prop_map(|(t, q)| ItemStack::new(ItemTypeId(t), q))
}

/// Offers may exceed their own stack cap.
fn arb_offer() -> impl Strategy<Value = ItemStack> {
    (0..3u32, 1..=200u32, 16..=64u32)
        .prop_map(|(t, q, max)| ItemStack::with_max(ItemTypeId(t), q, max))
}

fn arb_inventory(slots: usize) -> impl Strategy<Value = SlotInventory> {
    proptest::collection::vec(proptest::option::weighted(0.6, arb_stack()), slots).prop_map(
        |stacks| {
            let mut inventory = SlotInventory::new(stacks.len());
            for (i, stack) in stacks.into_iter().enumerate() {
                inventory.set(i, stack);
            }
            inventory
        },
    )
}

#[derive(Debug, Clone, Copy)]
enum StoreOp {
    Extract(u32),
    Insert(u32),
}

fn arb_store_ops(max_ops: usize) -> impl Strategy<Value = Vec<StoreOp>> {
    proptest::collection::vec(
        prop_oneof![
            (0..200u32).prop_map(StoreOp::Extract),
            (0..200u32).prop_map(StoreOp::Insert),
        ],
        1..=max_ops,
    )
}

// ===========================================================================
// Properties
// ===========================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Every result is the minimum of request, availability and rate, and
    /// the amount never leaves [0, capacity].
    #[test]
    fn store_clamps_every_call(
        capacity in 1..500u32,
        max_extract in 0..100u32,
        max_insert in 0..100u32,
        ops in arb_store_ops(40),
    ) {
        let mut s = ResourceStore::new(
            Fixed64::from_num(capacity),
            Fixed64::from_num(max_extract),
            Fixed64::from_num(max_insert),
        ).unwrap();

        for op in ops {
            let before = s.amount();
            match op {
                StoreOp::Extract(req) => {
                    let req = Fixed64::from_num(req);
                    let got = s.extract(req, false).unwrap();
                    prop_assert_eq!(got, req.min(before).min(s.max_extract()));
                    prop_assert_eq!(s.amount(), before - got);
                }
                StoreOp::Insert(req) => {
                    let req = Fixed64::from_num(req);
                    let headroom = s.capacity() - before;
                    let got = s.insert(req, false).unwrap();
                    prop_assert_eq!(got, req.min(headroom).min(s.max_insert()));
                    prop_assert_eq!(s.amount(), before + got);
                }
            }
            prop_assert!(s.amount() >= ZERO);
            prop_assert!(s.amount() <= s.capacity());
        }
    }

    /// A simulated placement never mutates the destination.
    #[test]
    fn simulated_placement_is_pure(inventory in arb_inventory(8), stack in arb_offer()) {
        let mut dest = inventory.clone();
        TransferEngine::default().try_add(&mut dest, &stack, false);
        prop_assert_eq!(dest, inventory);
    }

    /// A committed placement lands completely or not at all, and the
    /// reserved slot is never touched.
    #[test]
    fn committed_placement_is_atomic(inventory in arb_inventory(8), stack in arb_offer()) {
        let engine = TransferEngine::default();
        let mut dest = inventory.clone();
        let preview = engine.try_add(&mut dest.clone(), &stack, false);
        let status = engine.try_add(&mut dest, &stack, true);

        prop_assert_eq!(status, preview);
        prop_assert_eq!(dest.get(0), inventory.get(0));
        match status {
            CargoStatus::Success => {
                let added = u64::from(stack.quantity);
                prop_assert_eq!(dest.total_items(), inventory.total_items() + added);
                prop_assert_eq!(
                    dest.count_of(stack.item_type),
                    inventory.count_of(stack.item_type) + added
                );
                for (_, s) in dest.occupied() {
                    prop_assert!(s.quantity <= s.max_stack_size);
                }
            }
            CargoStatus::Full => prop_assert_eq!(dest, inventory),
            other => prop_assert!(false, "unexpected status {:?}", other),
        }
    }

    /// Sufficiency after a tick is exactly `amount > max_extract`, measured
    /// before the draw.
    #[test]
    fn sufficiency_is_strictly_greater(
        amount in 0..100u32,
        max_extract in 0..50u32,
        wants in any::<bool>(),
    ) {
        let mut s = store(100.0, f64::from(max_extract), 100.0, f64::from(amount));
        let mut state = MachineState::default();
        let outcome = state.tick(&mut s, false, wants);
        prop_assert_eq!(outcome.sufficient, amount > max_extract);
        let drawn = if amount > max_extract && wants { max_extract } else { 0 };
        prop_assert_eq!(s.amount(), Fixed64::from_num(amount - drawn));
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(30))]

    /// Items are neither created nor destroyed while unloading.
    #[test]
    fn unloading_conserves_items(
        stacks in proptest::collection::vec(arb_stack(), 1..6),
        ticks in 1..80u64,
    ) {
        let total: u64 = stacks.iter().map(|s| u64::from(s.quantity)).sum();
        let mut scene = unload_scene(unloader(), hold_with(6, &stacks));

        for _ in 0..ticks {
            scene.engine.step();
            let in_hold = scene.engine.cargo_hold(scene.hold).unwrap().total_items();
            let unloaded = scene.engine.unloader(scene.unloader).unwrap().inventory.total_items();
            prop_assert_eq!(in_hold + unloaded, total);
        }
    }
}
