//! Tickwork Core -- bounded-resource tick simulation for electrical machines
//! and cargo unloaders.
//!
//! Nodes exchange energy and cargo with adjacent partners through exposed
//! operations only. Every quantity is bounded: stores clamp to their
//! capacity and per-call rates, inventories to their slot limits, and a
//! cargo placement either lands completely or not at all.
//!
//! # Per-Tick Node Contract
//!
//! A host (a scheduler owning the world) calls each node's `update` exactly
//! once per tick. Order between sibling nodes is not relied upon:
//!
//! 1. **Rescan** -- every 100 ticks a node looks for a partner among its
//!    neighbors (composite structures redirect to their primary block).
//! 2. **Power** -- interlock, sufficiency, energy draw, toggle cooldown.
//! 3. **Transfer** -- preview against the partner every tick, commit on
//!    every 5th.
//!
//! [`engine::Engine`] is a reference host that drives nodes in this way for
//! tests, demos and benchmarks.
//!
//! # Key Types
//!
//! - [`energy::ResourceStore`] -- Bounded energy buffer with rate limits.
//! - [`machine::MachineState`] -- Enabled/disabled with debounce, plus energy
//!   sufficiency.
//! - [`adjacency::AdjacencyResolver`] -- Cached partner lookup on a fixed scan
//!   order.
//! - [`cargo::TransferEngine`] -- All-or-nothing stack placement with
//!   merge-then-empty-slot passes.
//! - [`status::present`] -- Priority cascade from state to a status line.
//! - [`electric::ElectricMachine`], [`unloader::CargoUnloader`],
//!   [`generator::Generator`] -- The node types.
//! - [`fixed::Fixed64`] -- Q32.32 fixed-point type for deterministic math.
//! - [`persist`] -- Versioned persistence of machine state via bitcode.

pub mod adjacency;
pub mod cargo;
pub mod config;
pub mod electric;
pub mod energy;
pub mod engine;
pub mod event;
pub mod fixed;
pub mod generator;
pub mod id;
pub mod item;
pub mod machine;
pub mod persist;
pub mod status;
pub mod unloader;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
