//! Periodic neighbor scan that locates a single capability-bearing partner.
//!
//! # Design
//!
//! - Directions are scanned in a fixed enumeration order. The first match
//!   wins, so the result is deterministic for a given layout.
//! - A neighbor that is a facade of a composite structure is redirected to its
//!   primary node via [`Neighborhood::resolve_primary`] before the capability
//!   check.
//! - The scan runs every `rescan_interval` ticks. In between, the cached
//!   partner is trusted until an operation against it reports it vanished,
//!   at which point the owner calls [`AdjacencyResolver::invalidate`].

use crate::fixed::Ticks;
use crate::id::NodeId;
use serde::{Deserialize, Serialize};

/// Default number of ticks between rescans.
pub const DEFAULT_RESCAN_INTERVAL: Ticks = 100;

// ---------------------------------------------------------------------------
// Positions and directions
// ---------------------------------------------------------------------------

/// Integer block position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BlockPos {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl BlockPos {
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// The position one step away in `dir`.
    pub fn offset(self, dir: Direction) -> Self {
        let (dx, dy, dz) = dir.offset();
        Self::new(self.x + dx, self.y + dy, self.z + dz)
    }
}

/// The six axis-aligned directions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Down,
    Up,
    North,
    South,
    West,
    East,
}

impl Direction {
    /// All six directions in scan order.
    pub const ALL: [Direction; 6] = [
        Direction::Down,
        Direction::Up,
        Direction::North,
        Direction::South,
        Direction::West,
        Direction::East,
    ];

    /// The four horizontal directions in scan order.
    pub const HORIZONTAL: [Direction; 4] = [
        Direction::North,
        Direction::South,
        Direction::West,
        Direction::East,
    ];

    /// Unit offset `(dx, dy, dz)`. North is -z.
    pub fn offset(self) -> (i32, i32, i32) {
        match self {
            Direction::Down => (0, -1, 0),
            Direction::Up => (0, 1, 0),
            Direction::North => (0, 0, -1),
            Direction::South => (0, 0, 1),
            Direction::West => (-1, 0, 0),
            Direction::East => (1, 0, 0),
        }
    }

    pub fn opposite(self) -> Self {
        match self {
            Direction::Down => Direction::Up,
            Direction::Up => Direction::Down,
            Direction::North => Direction::South,
            Direction::South => Direction::North,
            Direction::West => Direction::East,
            Direction::East => Direction::West,
        }
    }
}

/// Which directions a resolver scans.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScanPattern {
    /// All six faces.
    #[default]
    Full,
    /// Only the four horizontal faces.
    Horizontal,
}

impl ScanPattern {
    pub fn directions(self) -> &'static [Direction] {
        match self {
            ScanPattern::Full => &Direction::ALL,
            ScanPattern::Horizontal => &Direction::HORIZONTAL,
        }
    }
}

// ---------------------------------------------------------------------------
// Capabilities
// ---------------------------------------------------------------------------

/// Something a node can do for its neighbors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Capability {
    /// Holds cargo that can be removed or added.
    Cargo,
    /// Accepts energy on its input side.
    EnergyInput,
    /// Pushes energy out of its output side.
    EnergyOutput,
}

impl Capability {
    fn bit(self) -> u8 {
        match self {
            Capability::Cargo => 1 << 0,
            Capability::EnergyInput => 1 << 1,
            Capability::EnergyOutput => 1 << 2,
        }
    }
}

/// A small set of [`Capability`] flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CapabilitySet(u8);

impl CapabilitySet {
    pub fn empty() -> Self {
        Self(0)
    }

    pub fn of(capabilities: &[Capability]) -> Self {
        capabilities
            .iter()
            .fold(Self::empty(), |set, &cap| set.with(cap))
    }

    #[must_use]
    pub fn with(self, capability: Capability) -> Self {
        Self(self.0 | capability.bit())
    }

    #[must_use]
    pub fn without(self, capability: Capability) -> Self {
        Self(self.0 & !capability.bit())
    }

    pub fn supports(self, capability: Capability) -> bool {
        self.0 & capability.bit() != 0
    }
}

// ---------------------------------------------------------------------------
// World access
// ---------------------------------------------------------------------------

/// Read-only view of the world around a node.
pub trait Neighborhood {
    /// The node occupying the block adjacent to `pos` in `dir`, if any.
    fn neighbor(&self, pos: BlockPos, dir: Direction) -> Option<NodeId>;

    /// The primary node a composite-structure facade delegates to. Nodes
    /// that are not facades resolve to themselves.
    fn resolve_primary(&self, node: NodeId) -> NodeId;

    /// Whether `node` currently exposes `capability`.
    fn supports(&self, node: NodeId, capability: Capability) -> bool;

    /// Whether the external interlock signal is active at `pos`.
    fn interlock_active(&self, pos: BlockPos) -> bool;
}

// ---------------------------------------------------------------------------
// Resolver
// ---------------------------------------------------------------------------

/// How the cached partner changed during an update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolverChange {
    Unchanged,
    Attached(NodeId),
    Lost,
}

/// Cached reference to one adjacent partner exposing a capability.
///
/// The resolver does not own the partner. It stores a generational
/// [`NodeId`] that may go stale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdjacencyResolver {
    #[serde(skip)]
    partner: Option<NodeId>,
    pub capability: Capability,
    pub pattern: ScanPattern,
    pub rescan_interval: Ticks,
}

impl AdjacencyResolver {
    pub fn new(capability: Capability, pattern: ScanPattern, rescan_interval: Ticks) -> Self {
        Self {
            partner: None,
            capability,
            pattern,
            rescan_interval: rescan_interval.max(1),
        }
    }

    pub fn partner(&self) -> Option<NodeId> {
        self.partner
    }

    /// Rescan if this tick falls on the rescan interval.
    pub fn update<W: Neighborhood + ?Sized>(
        &mut self,
        tick: Ticks,
        pos: BlockPos,
        world: &W,
    ) -> ResolverChange {
        if tick % self.rescan_interval == 0 {
            self.rescan(pos, world)
        } else {
            ResolverChange::Unchanged
        }
    }

    /// Scan all directions now. First qualifying neighbor wins.
    pub fn rescan<W: Neighborhood + ?Sized>(&mut self, pos: BlockPos, world: &W) -> ResolverChange {
        let found = self.pattern.directions().iter().find_map(|&dir| {
            let neighbor = world.neighbor(pos, dir)?;
            let primary = world.resolve_primary(neighbor);
            world.supports(primary, self.capability).then_some(primary)
        });
        self.replace(found)
    }

    /// Drop the cached partner immediately.
    pub fn invalidate(&mut self) -> ResolverChange {
        self.replace(None)
    }

    fn replace(&mut self, found: Option<NodeId>) -> ResolverChange {
        let previous = std::mem::replace(&mut self.partner, found);
        match (previous, found) {
            (a, b) if a == b => ResolverChange::Unchanged,
            (_, Some(node)) => ResolverChange::Attached(node),
            (Some(_), None) => ResolverChange::Lost,
            (None, None) => ResolverChange::Unchanged,
        }
    }
}

// ===========================================================================
// Tests
// ===========================================================================
