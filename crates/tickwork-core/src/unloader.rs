//! Cargo unloader node: pulls cargo out of an adjacent partner into its own
//! slot inventory.
//!
//! Every tick the unloader previews an extraction from the partner and
//! provisionally places it, which keeps the status flags current. Only every
//! `confirm_interval`-th tick is the extraction committed on the partner and
//! the stack committed into the local inventory. This throttles how fast
//! cargo actually leaves the partner.

use crate::adjacency::{AdjacencyResolver, BlockPos, Capability, Neighborhood, ResolverChange};
use crate::cargo::{CargoEntity, CargoStatus, TransferEngine};
use crate::config::UnloaderConfig;
use crate::electric::ElectricMachine;
use crate::energy::StoreError;
use crate::fixed::Ticks;
use crate::id::NodeId;
use crate::item::{ItemStack, SlotInventory};
use crate::machine::TickOutcome;
use crate::status::{StatusLine, present_unpowered};
use slotmap::SecondaryMap;

pub const TEXT_NO_TARGET: &str = "No Target";
pub const TEXT_NO_INVENTORY: &str = "No Inventory";
pub const TEXT_TARGET_EMPTY: &str = "Target Empty";
pub const TEXT_UNLOADING: &str = "Unloading";

// ---------------------------------------------------------------------------
// Partner lookup
// ---------------------------------------------------------------------------

/// Mutable access to cargo-bearing nodes by id.
pub trait CargoLookup {
    fn cargo_mut(&mut self, node: NodeId) -> Option<&mut dyn CargoEntity>;
}

impl<E: CargoEntity> CargoLookup for SecondaryMap<NodeId, E> {
    fn cargo_mut(&mut self, node: NodeId) -> Option<&mut dyn CargoEntity> {
        self.get_mut(node).map(|entity| entity as &mut dyn CargoEntity)
    }
}

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

/// What happened during one unloader update.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnloaderReport {
    /// Machine outcome, for powered unloaders.
    pub machine: Option<TickOutcome>,
    /// Partner change from rescan or invalidation.
    pub resolver: Option<ResolverChange>,
    /// Provisional placement status, or the partner's failure status.
    pub status: Option<CargoStatus>,
    /// Stack committed into the local inventory this tick.
    pub unloaded: Option<ItemStack>,
    /// Why a confirmed extraction was handed back to the partner.
    pub returned: Option<CargoStatus>,
    /// The cached partner disappeared and was invalidated.
    pub vanished: bool,
}

// ---------------------------------------------------------------------------
// Unloader
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct CargoUnloader {
    pub inventory: SlotInventory,
    pub resolver: AdjacencyResolver,
    pub transfer: TransferEngine,
    /// `Some` for unloaders that need power to work.
    pub power: Option<ElectricMachine>,
    pub pull_batch: u32,
    pub confirm_interval: Ticks,
    pub target_empty: bool,
    pub target_no_inventory: bool,
    pub no_target: bool,
}

impl CargoUnloader {
    pub fn from_config(config: &UnloaderConfig) -> Result<Self, StoreError> {
        let power = config
            .power
            .as_ref()
            .map(ElectricMachine::from_config)
            .transpose()?;
        Ok(Self {
            inventory: SlotInventory::new(config.slot_count),
            resolver: AdjacencyResolver::new(
                Capability::Cargo,
                config.scan,
                config.rescan_interval,
            ),
            transfer: TransferEngine::new(config.reserved_slots),
            power,
            pull_batch: config.pull_batch,
            confirm_interval: config.confirm_interval.max(1),
            target_empty: false,
            target_no_inventory: false,
            no_target: true,
        })
    }

    pub fn partner(&self) -> Option<NodeId> {
        self.resolver.partner()
    }

    /// Advance one tick.
    ///
    /// Order: partner rescan (on its interval), power (when powered), then the
    /// transfer. A powered unloader that is withheld, short on energy or
    /// user-disabled skips the transfer for this tick.
    pub fn update<W, L>(
        &mut self,
        tick: Ticks,
        pos: BlockPos,
        world: &W,
        partners: &mut L,
    ) -> UnloaderReport
    where
        W: Neighborhood + ?Sized,
        L: CargoLookup + ?Sized,
    {
        let mut report = UnloaderReport::default();

        let change = self.resolver.update(tick, pos, world);
        if change != ResolverChange::Unchanged {
            report.resolver = Some(change);
        }

        if let Some(power) = self.power.as_mut() {
            let wants_to_run = self.resolver.partner().is_some() && !power.state.disabled();
            let outcome = power.update(tick, world.interlock_active(pos), wants_to_run);
            report.machine = Some(outcome);
            if outcome.withheld || !power.can_work() {
                return report;
            }
        }

        let Some(partner) = self.resolver.partner() else {
            self.no_target = true;
            report.status = Some(CargoStatus::NoTarget);
            return report;
        };

        let entity = if world.supports(partner, Capability::Cargo) {
            partners.cargo_mut(partner)
        } else {
            None
        };
        let Some(entity) = entity else {
            tracing::warn!(?partner, "cargo partner vanished, dropping it");
            self.resolver.invalidate();
            report.resolver = Some(ResolverChange::Lost);
            report.vanished = true;
            report.status = Some(CargoStatus::NoTarget);
            self.no_target = true;
            return report;
        };

        self.no_target = false;
        let preview = entity.remove_cargo(true, self.pull_batch);

        match preview.non_empty_stack() {
            Some(stack) => {
                self.target_empty = false;
                self.target_no_inventory = false;

                let status = self.transfer.try_add(&mut self.inventory, stack, false);
                self.target_empty = status == CargoStatus::Empty;
                report.status = Some(status);

                if tick % self.confirm_interval == 0 && status == CargoStatus::Success {
                    self.confirm(entity, &mut report);
                }
            }
            None => {
                self.target_no_inventory = preview.status == CargoStatus::NoInventory;
                self.no_target = preview.status == CargoStatus::NoTarget;
                self.target_empty = true;
                report.status = Some(preview.status);
            }
        }

        report
    }

    /// Commit the extraction on the partner and the placement locally. A
    /// stack that no longer fits is handed back to the partner.
    fn confirm(&mut self, entity: &mut dyn CargoEntity, report: &mut UnloaderReport) {
        let taken = entity.remove_cargo(false, self.pull_batch);
        let Some(stack) = taken.stack.filter(|s| !s.is_empty()) else {
            return;
        };

        match self.transfer.try_add(&mut self.inventory, &stack, true) {
            CargoStatus::Success => {
                tracing::debug!(
                    item = ?stack.item_type,
                    quantity = stack.quantity,
                    "cargo unloaded"
                );
                report.unloaded = Some(stack);
            }
            status => {
                let back = entity.add_cargo(&stack, false);
                if back == CargoStatus::Success {
                    tracing::warn!(?status, "confirmed cargo did not fit, returned to partner");
                } else {
                    tracing::error!(
                        ?status,
                        ?back,
                        quantity = stack.quantity,
                        "confirmed cargo could not be placed or returned"
                    );
                }
                report.returned = Some(status);
            }
        }
    }

    /// Domain-specific missing input for the status line.
    pub fn missing_input(&self) -> Option<&'static str> {
        if self.no_target {
            Some(TEXT_NO_TARGET)
        } else if self.target_no_inventory {
            Some(TEXT_NO_INVENTORY)
        } else if self.target_empty {
            Some(TEXT_TARGET_EMPTY)
        } else {
            None
        }
    }

    pub fn status(&self, interlock_active: bool, short: bool) -> StatusLine {
        match &self.power {
            Some(power) => power.status(
                interlock_active,
                self.missing_input(),
                Some(TEXT_UNLOADING),
                short,
            ),
            None => present_unpowered(self.missing_input(), Some(TEXT_UNLOADING)),
        }
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adjacency::{CapabilitySet, Direction};
    use crate::cargo::{CargoHold, ExtractionResult};
    use crate::config::MachineConfig;
    use crate::fixed::Fixed64;
    use crate::id::ItemTypeId;
    use crate::status::StatusKind;
    use slotmap::SlotMap;
    use std::collections::{BTreeMap, HashMap};

    const POS: BlockPos = BlockPos::new(0, 64, 0);
    const ORE: ItemTypeId = ItemTypeId(10);

    #[derive(Default)]
    struct World {
        blocks: BTreeMap<BlockPos, NodeId>,
        caps: HashMap<NodeId, CapabilitySet>,
        interlock: bool,
    }

    impl Neighborhood for World {
        fn neighbor(&self, pos: BlockPos, dir: Direction) -> Option<NodeId> {
            self.blocks.get(&pos.offset(dir)).copied()
        }
        fn resolve_primary(&self, node: NodeId) -> NodeId {
            node
        }
        fn supports(&self, node: NodeId, capability: Capability) -> bool {
            self.caps.get(&node).is_some_and(|c| c.supports(capability))
        }
        fn interlock_active(&self, _pos: BlockPos) -> bool {
            self.interlock
        }
    }

    /// Counts calls so tests can prove the partner was never touched.
    #[derive(Default)]
    struct CountingSource {
        removals: u32,
    }

    impl CargoEntity for CountingSource {
        fn remove_cargo(&mut self, _simulate: bool, _max_count: u32) -> ExtractionResult {
            self.removals += 1;
            ExtractionResult::failed(CargoStatus::Empty)
        }
        fn add_cargo(&mut self, _stack: &ItemStack, _simulate: bool) -> CargoStatus {
            CargoStatus::Full
        }
    }

    /// Previews one stack but hands over a different one on commit.
    struct ShiftingSource {
        preview: ItemStack,
        committed: ItemStack,
        stock: u64,
        handed_back: Vec<ItemStack>,
    }

    impl CargoEntity for ShiftingSource {
        fn remove_cargo(&mut self, simulate: bool, _max_count: u32) -> ExtractionResult {
            if simulate {
                return ExtractionResult::success(self.preview.clone());
            }
            self.stock -= u64::from(self.committed.quantity);
            ExtractionResult::success(self.committed.clone())
        }
        fn add_cargo(&mut self, stack: &ItemStack, simulate: bool) -> CargoStatus {
            if !simulate {
                self.stock += u64::from(stack.quantity);
                self.handed_back.push(stack.clone());
            }
            CargoStatus::Success
        }
    }

    fn scene(hold: CargoHold) -> (World, SecondaryMap<NodeId, CargoHold>, NodeId) {
        let mut ids = SlotMap::<NodeId, ()>::with_key();
        let id = ids.insert(());
        let mut world = World::default();
        world.blocks.insert(POS.offset(Direction::Down), id);
        world.caps.insert(id, CapabilitySet::of(&[Capability::Cargo]));
        let mut holds = SecondaryMap::new();
        holds.insert(id, hold);
        (world, holds, id)
    }

    fn loaded_hold(quantity: u32) -> CargoHold {
        let mut hold = CargoHold::new(4);
        if let Some(inv) = hold.inventory.as_mut() {
            inv.set(0, Some(ItemStack::new(ORE, quantity)));
        }
        hold
    }

    fn unloader() -> CargoUnloader {
        CargoUnloader::from_config(&UnloaderConfig::default()).unwrap()
    }

    #[test]
    fn confirms_only_on_interval() {
        let (world, mut holds, id) = scene(loaded_hold(40));
        let mut u = unloader();

        let report = u.update(0, POS, &world, &mut holds);
        assert_eq!(report.resolver, Some(ResolverChange::Attached(id)));
        assert_eq!(report.status, Some(CargoStatus::Success));
        // tick 0 is a confirm tick
        assert_eq!(report.unloaded.map(|s| s.quantity), Some(8));

        for tick in 1..5 {
            let report = u.update(tick, POS, &world, &mut holds);
            assert_eq!(report.status, Some(CargoStatus::Success));
            assert!(report.unloaded.is_none());
        }
        assert_eq!(holds[id].total_items(), 32);

        let report = u.update(5, POS, &world, &mut holds);
        assert!(report.unloaded.is_some());
        assert_eq!(holds[id].total_items(), 24);
        assert_eq!(u.inventory.count_of(ORE), 16);
    }

    #[test]
    fn no_partner_never_calls_remove_cargo() {
        let mut ids = SlotMap::<NodeId, ()>::with_key();
        let stray = ids.insert(());
        let world = World::default();
        let mut sources: SecondaryMap<NodeId, CountingSource> = SecondaryMap::new();
        sources.insert(stray, CountingSource::default());

        let mut u = unloader();
        // Destination full of unrelated items.
        for i in 1..u.inventory.len() {
            u.inventory.set(i, Some(ItemStack::new(ItemTypeId(99), 64)));
        }

        let report = u.update(0, POS, &world, &mut sources);
        assert_eq!(report.status, Some(CargoStatus::NoTarget));
        assert!(u.no_target);
        assert_eq!(sources[stray].removals, 0);
        assert_eq!(u.missing_input(), Some(TEXT_NO_TARGET));
    }

    #[test]
    fn vanished_partner_is_invalidated_immediately() {
        let (mut world, mut holds, id) = scene(loaded_hold(40));
        let mut u = unloader();
        u.update(0, POS, &world, &mut holds);
        assert_eq!(u.partner(), Some(id));

        holds.remove(id);
        world.blocks.clear();
        let report = u.update(1, POS, &world, &mut holds);
        assert!(report.vanished);
        assert_eq!(report.resolver, Some(ResolverChange::Lost));
        assert_eq!(u.partner(), None);
        assert!(u.no_target);
    }

    #[test]
    fn empty_target_is_not_vanished() {
        let (world, mut holds, id) = scene(CargoHold::new(4));
        let mut u = unloader();
        let report = u.update(0, POS, &world, &mut holds);
        assert_eq!(report.status, Some(CargoStatus::Empty));
        assert!(!report.vanished);
        assert_eq!(u.partner(), Some(id));
        assert!(u.target_empty);
        assert_eq!(u.missing_input(), Some(TEXT_TARGET_EMPTY));
    }

    #[test]
    fn partner_without_inventory_sets_flag() {
        let (world, mut holds, _) = scene(CargoHold::without_inventory());
        let mut u = unloader();
        u.update(0, POS, &world, &mut holds);
        assert!(u.target_no_inventory);
        assert!(!u.no_target);
        assert_eq!(u.missing_input(), Some(TEXT_NO_INVENTORY));
    }

    #[test]
    fn full_destination_leaves_partner_untouched() {
        let (world, mut holds, id) = scene(loaded_hold(40));
        let mut u = unloader();
        for i in 1..u.inventory.len() {
            u.inventory.set(i, Some(ItemStack::new(ItemTypeId(99), 64)));
        }
        let report = u.update(0, POS, &world, &mut holds);
        assert_eq!(report.status, Some(CargoStatus::Full));
        assert_eq!(holds[id].total_items(), 40);
    }

    #[test]
    fn unpowered_status_lines() {
        let (world, mut holds, _) = scene(loaded_hold(40));
        let mut u = unloader();
        assert_eq!(u.status(false, false).text, TEXT_NO_TARGET);
        u.update(0, POS, &world, &mut holds);
        assert_eq!(u.status(false, false).text, TEXT_UNLOADING);
    }

    #[test]
    fn powered_unloader_waits_for_energy() {
        let config = UnloaderConfig {
            power: Some(MachineConfig {
                capacity: 100.0,
                max_extract: 5.0,
                max_insert: 50.0,
                ..MachineConfig::default()
            }),
            ..UnloaderConfig::default()
        };
        let (mut world, mut holds, id) = scene(loaded_hold(40));
        let mut u = CargoUnloader::from_config(&config).unwrap();

        let report = u.update(0, POS, &world, &mut holds);
        assert!(report.unloaded.is_none());
        assert_eq!(holds[id].total_items(), 40);
        assert_eq!(u.status(false, false).kind, StatusKind::MissingPower);

        if let Some(power) = u.power.as_mut() {
            power.store.set_amount(Fixed64::from_num(50)).unwrap();
        }
        let report = u.update(5, POS, &world, &mut holds);
        assert_eq!(report.unloaded.map(|s| s.quantity), Some(8));
        assert_eq!(
            u.power.as_ref().map(|p| p.store.amount()),
            Some(Fixed64::from_num(45))
        );

        world.interlock = true;
        let report = u.update(10, POS, &world, &mut holds);
        assert!(report.machine.is_some_and(|m| m.withheld));
        assert!(report.unloaded.is_none());
        assert_eq!(u.status(true, false).kind, StatusKind::Off);
    }

    #[test]
    fn failed_confirm_hands_stack_back() {
        let mut ids = SlotMap::<NodeId, ()>::with_key();
        let id = ids.insert(());
        let mut world = World::default();
        world.blocks.insert(POS.offset(Direction::Down), id);
        world.caps.insert(id, CapabilitySet::of(&[Capability::Cargo]));
        let other = ItemTypeId(99);
        let mut sources = SecondaryMap::new();
        sources.insert(
            id,
            ShiftingSource {
                preview: ItemStack::new(ORE, 8),
                committed: ItemStack::new(other, 8),
                stock: 100,
                handed_back: Vec::new(),
            },
        );

        // Room for ore only: every slot holds a partial ore stack.
        let mut u = unloader();
        for i in 1..u.inventory.len() {
            u.inventory.set(i, Some(ItemStack::new(ORE, 60)));
        }
        let before = u.inventory.clone();

        let report = u.update(0, POS, &world, &mut sources);
        assert_eq!(report.status, Some(CargoStatus::Success));
        assert_eq!(report.returned, Some(CargoStatus::Full));
        assert!(report.unloaded.is_none());

        let source = &sources[id];
        assert_eq!(source.handed_back, vec![ItemStack::new(other, 8)]);
        assert_eq!(source.stock, 100);
        assert_eq!(u.inventory, before);
        assert_eq!(u.inventory.count_of(other), 0);
    }
}
