//! Reference host: owns placed nodes and the world layout and drives them
//! one tick at a time.
//!
//! # Architecture
//!
//! The `Engine` owns:
//! - a [`SlotMap`] of nodes tagged with their [`NodeKind`]
//! - per-kind component storage (SoA, keyed by [`NodeId`])
//! - a [`Layout`] indexing positions, facades, capabilities and interlocks
//! - an [`EventLog`] collecting transition events
//!
//! # Tick order
//!
//! Each `step()` runs:
//! 1. **Generators** -- produce, then push to the consumer on the output side
//! 2. **Machines** -- battery, interlock, sufficiency, draw, cooldown
//! 3. **Unloaders** -- rescan, power, cargo transfer
//! 4. **Bookkeeping** -- advance the tick counter
//!
//! Every node runs exactly once per tick. Nodes only reach each other through
//! exposed operations ([`EnergyReceiver`], [`CargoEntity`](crate::cargo::CargoEntity)).

use std::collections::{BTreeMap, BTreeSet};

use crate::adjacency::{
    BlockPos, Capability, CapabilitySet, Direction, Neighborhood, ResolverChange,
};
use crate::cargo::CargoHold;
use crate::electric::ElectricMachine;
use crate::energy::StoreError;
use crate::event::{DEFAULT_EVENT_CAPACITY, Event, EventLog};
use crate::fixed::{Fixed64, Ticks, ZERO};
use crate::generator::{EnergyReceiver, Generator};
use crate::id::NodeId;
use crate::machine::TickOutcome;
use crate::status::{StatusLine, TEXT_ACTIVE, present_default};
use crate::unloader::CargoUnloader;
use slotmap::{SecondaryMap, SlotMap};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    #[error("position {0:?} is already occupied")]
    Occupied(BlockPos),
    #[error("node {0:?} does not exist")]
    UnknownNode(NodeId),
    #[error("node {node:?} is not a {expected}")]
    WrongKind { node: NodeId, expected: &'static str },
    #[error(transparent)]
    Store(#[from] StoreError),
}

// ---------------------------------------------------------------------------
// Node kinds
// ---------------------------------------------------------------------------

/// What a placed node is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Machine,
    Unloader,
    Generator,
    CargoHold,
    /// Part of a composite structure; delegates to its primary.
    Facade,
}

/// A powered machine plus the host's demand signal.
#[derive(Debug, Clone, PartialEq)]
pub struct MachineSlot {
    pub machine: ElectricMachine,
    /// Whether the machine has work to do. Set by the host.
    pub wants_to_run: bool,
}

// ---------------------------------------------------------------------------
// Layout
// ---------------------------------------------------------------------------

/// Where nodes sit and what they expose.
#[derive(Debug, Default)]
pub struct Layout {
    tiles: BTreeMap<BlockPos, NodeId>,
    positions: SecondaryMap<NodeId, BlockPos>,
    primaries: SecondaryMap<NodeId, NodeId>,
    capabilities: SecondaryMap<NodeId, CapabilitySet>,
    interlocks: BTreeSet<BlockPos>,
}

impl Layout {
    pub fn node_at(&self, pos: BlockPos) -> Option<NodeId> {
        self.tiles.get(&pos).copied()
    }

    pub fn position(&self, node: NodeId) -> Option<BlockPos> {
        self.positions.get(node).copied()
    }

    pub fn capabilities(&self, node: NodeId) -> CapabilitySet {
        self.capabilities.get(node).copied().unwrap_or_default()
    }

    fn place(&mut self, node: NodeId, pos: BlockPos, capabilities: CapabilitySet) {
        self.tiles.insert(pos, node);
        self.positions.insert(node, pos);
        self.capabilities.insert(node, capabilities);
    }

    fn remove(&mut self, node: NodeId) {
        if let Some(pos) = self.positions.remove(node) {
            self.tiles.remove(&pos);
        }
        self.primaries.remove(node);
        self.capabilities.remove(node);
    }
}

impl Neighborhood for Layout {
    fn neighbor(&self, pos: BlockPos, dir: Direction) -> Option<NodeId> {
        self.node_at(pos.offset(dir))
    }

    fn resolve_primary(&self, node: NodeId) -> NodeId {
        self.primaries.get(node).copied().unwrap_or(node)
    }

    fn supports(&self, node: NodeId, capability: Capability) -> bool {
        self.capabilities(node).supports(capability)
    }

    fn interlock_active(&self, pos: BlockPos) -> bool {
        self.interlocks.contains(&pos)
    }
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct Engine {
    tick: Ticks,
    nodes: SlotMap<NodeId, NodeKind>,
    layout: Layout,

    // -- Per-node state (SoA, keyed by NodeId) --
    machines: SecondaryMap<NodeId, MachineSlot>,
    unloaders: SecondaryMap<NodeId, CargoUnloader>,
    generators: SecondaryMap<NodeId, Generator>,
    cargo_holds: SecondaryMap<NodeId, CargoHold>,
    /// Generators that delivered energy on their last tick.
    flowing: SecondaryMap<NodeId, NodeId>,

    events: EventLog,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine {
    pub fn new() -> Self {
        Self::with_event_capacity(DEFAULT_EVENT_CAPACITY)
    }

    pub fn with_event_capacity(capacity: usize) -> Self {
        Self {
            tick: 0,
            nodes: SlotMap::with_key(),
            layout: Layout::default(),
            machines: SecondaryMap::new(),
            unloaders: SecondaryMap::new(),
            generators: SecondaryMap::new(),
            cargo_holds: SecondaryMap::new(),
            flowing: SecondaryMap::new(),
            events: EventLog::new(capacity),
        }
    }

    /// The tick the next `step()` will run.
    pub fn tick(&self) -> Ticks {
        self.tick
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn kind(&self, node: NodeId) -> Option<NodeKind> {
        self.nodes.get(node).copied()
    }

    // -----------------------------------------------------------------------
    // Placement
    // -----------------------------------------------------------------------

    fn insert_node(
        &mut self,
        pos: BlockPos,
        kind: NodeKind,
        capabilities: CapabilitySet,
    ) -> Result<NodeId, EngineError> {
        if self.layout.node_at(pos).is_some() {
            return Err(EngineError::Occupied(pos));
        }
        let node = self.nodes.insert(kind);
        self.layout.place(node, pos, capabilities);
        tracing::debug!(?node, ?kind, ?pos, "node placed");
        Ok(node)
    }

    /// Place a powered machine. It starts wanting to run.
    pub fn add_machine(
        &mut self,
        pos: BlockPos,
        machine: ElectricMachine,
    ) -> Result<NodeId, EngineError> {
        let caps = energy_input_caps(&machine);
        let node = self.insert_node(pos, NodeKind::Machine, caps)?;
        self.machines.insert(
            node,
            MachineSlot {
                machine,
                wants_to_run: true,
            },
        );
        Ok(node)
    }

    pub fn add_unloader(
        &mut self,
        pos: BlockPos,
        unloader: CargoUnloader,
    ) -> Result<NodeId, EngineError> {
        let caps = unloader.power.as_ref().map(energy_input_caps).unwrap_or_default();
        let node = self.insert_node(pos, NodeKind::Unloader, caps)?;
        self.unloaders.insert(node, unloader);
        Ok(node)
    }

    pub fn add_generator(
        &mut self,
        pos: BlockPos,
        generator: Generator,
    ) -> Result<NodeId, EngineError> {
        let caps = CapabilitySet::of(&[Capability::EnergyOutput]);
        let node = self.insert_node(pos, NodeKind::Generator, caps)?;
        self.generators.insert(node, generator);
        Ok(node)
    }

    pub fn add_cargo_hold(
        &mut self,
        pos: BlockPos,
        hold: CargoHold,
    ) -> Result<NodeId, EngineError> {
        let caps = CapabilitySet::of(&[Capability::Cargo]);
        let node = self.insert_node(pos, NodeKind::CargoHold, caps)?;
        self.cargo_holds.insert(node, hold);
        Ok(node)
    }

    /// Place a facade block delegating to `primary`.
    pub fn add_facade(&mut self, pos: BlockPos, primary: NodeId) -> Result<NodeId, EngineError> {
        if !self.nodes.contains_key(primary) {
            return Err(EngineError::UnknownNode(primary));
        }
        let node = self.insert_node(pos, NodeKind::Facade, CapabilitySet::empty())?;
        self.layout.primaries.insert(node, primary);
        Ok(node)
    }

    /// Remove a node and all of its state. Facades pointing at it are left
    /// dangling; they resolve to a key that no longer exists.
    pub fn remove_node(&mut self, node: NodeId) -> Result<NodeKind, EngineError> {
        let kind = self.nodes.remove(node).ok_or(EngineError::UnknownNode(node))?;
        self.layout.remove(node);
        self.machines.remove(node);
        self.unloaders.remove(node);
        self.generators.remove(node);
        self.cargo_holds.remove(node);
        self.flowing.remove(node);
        tracing::debug!(?node, ?kind, "node removed");
        Ok(kind)
    }

    // -----------------------------------------------------------------------
    // Host controls
    // -----------------------------------------------------------------------

    pub fn set_interlock(&mut self, pos: BlockPos, active: bool) {
        if active {
            self.layout.interlocks.insert(pos);
        } else {
            self.layout.interlocks.remove(&pos);
        }
    }

    /// Grant or revoke a capability on a placed node.
    pub fn set_capability(
        &mut self,
        node: NodeId,
        capability: Capability,
        enabled: bool,
    ) -> Result<(), EngineError> {
        let caps = self
            .layout
            .capabilities
            .get_mut(node)
            .ok_or(EngineError::UnknownNode(node))?;
        *caps = if enabled {
            caps.with(capability)
        } else {
            caps.without(capability)
        };
        Ok(())
    }

    pub fn set_wants_to_run(
        &mut self,
        node: NodeId,
        wants_to_run: bool,
    ) -> Result<(), EngineError> {
        if !self.nodes.contains_key(node) {
            return Err(EngineError::UnknownNode(node));
        }
        let slot = self.machines.get_mut(node).ok_or(EngineError::WrongKind {
            node,
            expected: "machine",
        })?;
        slot.wants_to_run = wants_to_run;
        Ok(())
    }

    /// User toggle of a machine or powered unloader. Returns whether the
    /// toggle was honored (it is ignored during the cooldown).
    pub fn toggle(&mut self, node: NodeId) -> Result<bool, EngineError> {
        let tick = self.tick;
        let machine = match self.nodes.get(node) {
            None => return Err(EngineError::UnknownNode(node)),
            Some(NodeKind::Machine) => self.machines.get_mut(node).map(|slot| &mut slot.machine),
            Some(NodeKind::Unloader) => self.unloaders.get_mut(node).and_then(|u| u.power.as_mut()),
            Some(_) => None,
        };
        let Some(machine) = machine else {
            return Err(EngineError::WrongKind {
                node,
                expected: "powered node",
            });
        };

        let honored = machine.state.toggle();
        if honored {
            let disabled = machine.state.disabled();
            tracing::debug!(?node, disabled, "machine toggled");
            self.events.push(Event::MachineToggled { node, disabled, tick });
        } else {
            tracing::debug!(
                ?node,
                cooldown = machine.state.cooldown(),
                "toggle ignored during cooldown"
            );
        }
        Ok(honored)
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    pub fn machine(&self, node: NodeId) -> Option<&ElectricMachine> {
        self.machines.get(node).map(|slot| &slot.machine)
    }

    pub fn machine_mut(&mut self, node: NodeId) -> Option<&mut ElectricMachine> {
        self.machines.get_mut(node).map(|slot| &mut slot.machine)
    }

    pub fn unloader(&self, node: NodeId) -> Option<&CargoUnloader> {
        self.unloaders.get(node)
    }

    pub fn unloader_mut(&mut self, node: NodeId) -> Option<&mut CargoUnloader> {
        self.unloaders.get_mut(node)
    }

    pub fn generator(&self, node: NodeId) -> Option<&Generator> {
        self.generators.get(node)
    }

    pub fn cargo_hold(&self, node: NodeId) -> Option<&CargoHold> {
        self.cargo_holds.get(node)
    }

    pub fn cargo_hold_mut(&mut self, node: NodeId) -> Option<&mut CargoHold> {
        self.cargo_holds.get_mut(node)
    }

    /// Status line for a machine or unloader.
    pub fn status(&self, node: NodeId, short: bool) -> Option<StatusLine> {
        let pos = self.layout.position(node)?;
        let interlock = self.layout.interlock_active(pos);
        if let Some(slot) = self.machines.get(node) {
            let inputs = slot.machine.status_inputs(interlock, None, None);
            return Some(if short {
                slot.machine.status(interlock, None, Some(TEXT_ACTIVE), true)
            } else {
                present_default(&inputs)
            });
        }
        self.unloaders.get(node).map(|u| u.status(interlock, short))
    }

    pub fn events(&self) -> &EventLog {
        &self.events
    }

    /// Remove and return buffered events, oldest first.
    pub fn drain_events(&mut self) -> Vec<Event> {
        self.events.drain()
    }

    // -----------------------------------------------------------------------
    // Simulation
    // -----------------------------------------------------------------------

    /// Run `ticks` steps.
    pub fn advance(&mut self, ticks: Ticks) {
        for _ in 0..ticks {
            self.step();
        }
    }

    /// Advance the simulation by one tick.
    pub fn step(&mut self) {
        let tick = self.tick;
        self.phase_generators(tick);
        self.phase_machines(tick);
        self.phase_unloaders(tick);
        self.tick += 1;
    }

    fn phase_generators(&mut self, tick: Ticks) {
        let ids: Vec<NodeId> = self.generators.keys().collect();
        for id in ids {
            let Some(generator) = self.generators.get_mut(id) else {
                continue;
            };
            generator.produce();

            let Some(pos) = self.layout.position(id) else {
                continue;
            };
            let target = self
                .layout
                .neighbor(pos, generator.output_side)
                .map(|n| self.layout.resolve_primary(n))
                .filter(|&n| self.layout.supports(n, Capability::EnergyInput));

            let receiver: Option<&mut dyn EnergyReceiver> = match target {
                Some(n) => match self.machines.get_mut(n) {
                    Some(slot) => Some(&mut slot.machine as &mut dyn EnergyReceiver),
                    None => self
                        .unloaders
                        .get_mut(n)
                        .and_then(|u| u.power.as_mut())
                        .map(|m| m as &mut dyn EnergyReceiver),
                },
                None => None,
            };
            let moved = match receiver {
                Some(receiver) => generator.push_into(receiver),
                None => ZERO,
            };

            let now = target.filter(|_| moved > ZERO);
            let before = self.flowing.get(id).copied();
            if now != before {
                if let Some(to) = before {
                    self.events.push(Event::EnergyFlowChanged {
                        from: id,
                        to,
                        flowing: false,
                        tick,
                    });
                }
                if let Some(to) = now {
                    self.events.push(Event::EnergyFlowChanged {
                        from: id,
                        to,
                        flowing: true,
                        tick,
                    });
                }
                match now {
                    Some(to) => self.flowing.insert(id, to),
                    None => self.flowing.remove(id),
                };
            }
        }
    }

    fn phase_machines(&mut self, tick: Ticks) {
        for (id, slot) in self.machines.iter_mut() {
            let Some(pos) = self.layout.positions.get(id).copied() else {
                continue;
            };
            let interlock = self.layout.interlock_active(pos);
            let outcome = slot.machine.update(tick, interlock, slot.wants_to_run);
            record_sufficiency(&mut self.events, id, &outcome, tick);
        }
    }

    fn phase_unloaders(&mut self, tick: Ticks) {
        for (id, unloader) in self.unloaders.iter_mut() {
            let Some(pos) = self.layout.positions.get(id).copied() else {
                continue;
            };
            let report = unloader.update(tick, pos, &self.layout, &mut self.cargo_holds);

            if let Some(outcome) = &report.machine {
                record_sufficiency(&mut self.events, id, outcome, tick);
            }
            match report.resolver {
                Some(ResolverChange::Attached(partner)) => {
                    tracing::debug!(node = ?id, ?partner, "unloader attached");
                    self.events.push(Event::PartnerAttached { node: id, partner, tick });
                }
                Some(ResolverChange::Lost) => {
                    tracing::debug!(node = ?id, "unloader lost its partner");
                    self.events.push(Event::PartnerLost { node: id, tick });
                }
                Some(ResolverChange::Unchanged) | None => {}
            }
            if let Some(stack) = report.unloaded {
                self.events.push(Event::CargoUnloaded {
                    node: id,
                    item_type: stack.item_type,
                    quantity: stack.quantity,
                    tick,
                });
            }
            if let Some(status) = report.returned {
                self.events.push(Event::CargoReturned { node: id, status, tick });
            }
        }
    }
}

fn energy_input_caps(machine: &ElectricMachine) -> CapabilitySet {
    if machine.input_side.is_some() {
        CapabilitySet::of(&[Capability::EnergyInput])
    } else {
        CapabilitySet::empty()
    }
}

fn record_sufficiency(events: &mut EventLog, node: NodeId, outcome: &TickOutcome, tick: Ticks) {
    if outcome.sufficiency_changed {
        tracing::debug!(?node, sufficient = outcome.sufficient, "energy sufficiency changed");
        events.push(Event::EnergySufficiencyChanged {
            node,
            sufficient: outcome.sufficient,
            tick,
        });
    }
}

/// Total energy stored across machines, unloaders and generators.
pub fn total_stored(engine: &Engine) -> Fixed64 {
    let machines = engine.machines.values().map(|s| s.machine.store.amount());
    let unloaders = engine
        .unloaders
        .values()
        .filter_map(|u| u.power.as_ref().map(|p| p.store.amount()));
    let generators = engine.generators.values().map(|g| g.store.amount());
    machines.chain(unloaders).chain(generators).fold(ZERO, |acc, v| acc + v)
}

// ===========================================================================
// Tests
// ===========================================================================
