//! Shared test helpers for integration tests and benchmarks.
//!
//! Gated behind `#[cfg(any(test, feature = "test-utils"))]` so these helpers
//! are available in unit tests, integration tests, and benchmarks (via the
//! `test-utils` feature).

use crate::adjacency::{BlockPos, Direction};
use crate::cargo::CargoHold;
use crate::config::{GeneratorConfig, MachineConfig, UnloaderConfig};
use crate::electric::ElectricMachine;
use crate::energy::ResourceStore;
use crate::engine::Engine;
use crate::fixed::Fixed64;
use crate::generator::Generator;
use crate::id::{ItemTypeId, NodeId};
use crate::item::ItemStack;
use crate::unloader::CargoUnloader;

// ===========================================================================
// Fixed-point helper
// ===========================================================================

pub fn fixed(v: f64) -> Fixed64 {
    Fixed64::from_num(v)
}

// ===========================================================================
// Item types
// ===========================================================================

pub fn iron_ore() -> ItemTypeId {
    ItemTypeId(10)
}
pub fn copper_ore() -> ItemTypeId {
    ItemTypeId(11)
}
pub fn coal() -> ItemTypeId {
    ItemTypeId(12)
}

// ===========================================================================
// Stores and nodes
// ===========================================================================

/// A store holding `amount`, with the given limits.
pub fn store(capacity: f64, max_extract: f64, max_insert: f64, amount: f64) -> ResourceStore {
    let mut s = ResourceStore::new(fixed(capacity), fixed(max_extract), fixed(max_insert))
        .expect("valid store limits");
    s.set_amount(fixed(amount)).expect("non-negative amount");
    s
}

/// Small machine: capacity 100, draw 5 per tick, insert 40 per call.
pub fn small_machine_config() -> MachineConfig {
    MachineConfig {
        capacity: 100.0,
        max_extract: 5.0,
        max_insert: 40.0,
        ..MachineConfig::default()
    }
}

pub fn machine(input_side: Option<Direction>) -> ElectricMachine {
    let m = ElectricMachine::from_config(&small_machine_config()).expect("valid machine config");
    match input_side {
        Some(side) => m.with_input_side(side),
        None => m,
    }
}

pub fn generator(output_side: Direction) -> Generator {
    let config = GeneratorConfig {
        capacity: 1000.0,
        max_extract: 50.0,
        max_insert: 100.0,
        output_per_tick: 60.0,
    };
    Generator::from_config(&config, output_side).expect("valid generator config")
}

pub fn unloader() -> CargoUnloader {
    CargoUnloader::from_config(&UnloaderConfig::default()).expect("valid unloader config")
}

pub fn powered_unloader() -> CargoUnloader {
    let config = UnloaderConfig {
        power: Some(small_machine_config()),
        ..UnloaderConfig::default()
    };
    CargoUnloader::from_config(&config).expect("valid unloader config")
}

/// A docked hold with one stack per entry, starting at slot 0.
pub fn hold_with(slots: usize, stacks: &[ItemStack]) -> CargoHold {
    let mut hold = CargoHold::new(slots);
    if let Some(inventory) = hold.inventory.as_mut() {
        for (i, stack) in stacks.iter().enumerate() {
            inventory.set(i, Some(stack.clone()));
        }
    }
    hold
}

// ===========================================================================
// Scenes
// ===========================================================================

/// Unloader at the origin with a loaded hold directly below it.
pub struct UnloadScene {
    pub engine: Engine,
    pub unloader: NodeId,
    pub hold: NodeId,
}

pub const ORIGIN: BlockPos = BlockPos::new(0, 0, 0);

pub fn unload_scene(unloader: CargoUnloader, hold: CargoHold) -> UnloadScene {
    let mut engine = Engine::new();
    let hold = engine
        .add_cargo_hold(ORIGIN.offset(Direction::Down), hold)
        .expect("free position");
    let unloader = engine.add_unloader(ORIGIN, unloader).expect("free position");
    UnloadScene { engine, unloader, hold }
}

/// A row of `count` generator/machine pairs along x, each generator feeding
/// the machine to its east.
pub fn powered_row(count: i32) -> (Engine, Vec<NodeId>) {
    let mut engine = Engine::new();
    let mut machines = Vec::new();
    for i in 0..count {
        let x = i * 2;
        engine
            .add_generator(BlockPos::new(x, 0, 0), generator(Direction::East))
            .expect("free position");
        let m = engine
            .add_machine(BlockPos::new(x + 1, 0, 0), machine(Some(Direction::West)))
            .expect("free position");
        machines.push(m);
    }
    (engine, machines)
}
