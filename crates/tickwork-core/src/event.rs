//! Simulation events and a fixed-capacity ring buffer to collect them.
//!
//! Events fire on transitions only (a machine gaining or losing power, a
//! partner attaching or disappearing), never every tick.

use crate::cargo::CargoStatus;
use crate::fixed::Ticks;
use crate::id::{ItemTypeId, NodeId};

/// Default ring buffer capacity.
pub const DEFAULT_EVENT_CAPACITY: usize = 1024;

/// A simulation event. All events carry the tick at which they occurred.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    EnergySufficiencyChanged {
        node: NodeId,
        sufficient: bool,
        tick: Ticks,
    },
    MachineToggled {
        node: NodeId,
        disabled: bool,
        tick: Ticks,
    },
    PartnerAttached {
        node: NodeId,
        partner: NodeId,
        tick: Ticks,
    },
    PartnerLost {
        node: NodeId,
        tick: Ticks,
    },
    CargoUnloaded {
        node: NodeId,
        item_type: ItemTypeId,
        quantity: u32,
        tick: Ticks,
    },
    /// A confirmed extraction could not be placed and went back to the partner.
    CargoReturned {
        node: NodeId,
        status: CargoStatus,
        tick: Ticks,
    },
    /// A generator started or stopped delivering energy to a consumer.
    EnergyFlowChanged {
        from: NodeId,
        to: NodeId,
        flowing: bool,
        tick: Ticks,
    },
}

impl Event {
    pub fn tick(&self) -> Ticks {
        match self {
            Event::EnergySufficiencyChanged { tick, .. }
            | Event::MachineToggled { tick, .. }
            | Event::PartnerAttached { tick, .. }
            | Event::PartnerLost { tick, .. }
            | Event::CargoUnloaded { tick, .. }
            | Event::CargoReturned { tick, .. }
            | Event::EnergyFlowChanged { tick, .. } => *tick,
        }
    }
}

// ---------------------------------------------------------------------------
// EventLog
// ---------------------------------------------------------------------------

/// A pre-allocated ring buffer of events. When full, the oldest event is dropped.
#[derive(Debug)]
pub struct EventLog {
    events: Vec<Option<Event>>,
    /// Write position (wraps around).
    head: usize,
    len: usize,
    /// Total events ever written, including dropped ones.
    total_written: u64,
    dropped: u64,
}

impl Default for EventLog {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_CAPACITY)
    }
}

impl EventLog {
    /// A capacity of 0 is clamped to 1.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            events: (0..capacity).map(|_| None).collect(),
            head: 0,
            len: 0,
            total_written: 0,
            dropped: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.events.len()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn total_written(&self) -> u64 {
        self.total_written
    }

    /// Events dropped because the buffer was full.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    pub fn push(&mut self, event: Event) {
        let capacity = self.capacity();
        self.events[self.head] = Some(event);
        self.head = (self.head + 1) % capacity;
        if self.len < capacity {
            self.len += 1;
        } else {
            self.dropped += 1;
        }
        self.total_written += 1;
    }

    /// Remove and return buffered events, oldest first.
    pub fn drain(&mut self) -> Vec<Event> {
        let capacity = self.capacity();
        let start = (self.head + capacity - self.len) % capacity;
        let mut out = Vec::with_capacity(self.len);
        for i in 0..self.len {
            if let Some(event) = self.events[(start + i) % capacity].take() {
                out.push(event);
            }
        }
        self.len = 0;
        out
    }
}
