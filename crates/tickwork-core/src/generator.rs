//! Energy producer node.
//!
//! A generator fills its own store by `output_per_tick` every tick and pushes
//! what it can to the consumer adjacent on its output side. Energy only flows
//! when the consumer's input side faces back at the generator.

use crate::adjacency::Direction;
use crate::config::GeneratorConfig;
use crate::electric::ElectricMachine;
use crate::energy::{ResourceStore, StoreError, config_value};
use crate::fixed::{Fixed64, ZERO};
use serde::{Deserialize, Serialize};

/// Anything that accepts energy through a side.
pub trait EnergyReceiver {
    fn can_connect(&self, side: Direction) -> bool;

    /// Insert up to `amount` arriving on `side`. Returns the amount accepted.
    fn receive_energy(
        &mut self,
        side: Direction,
        amount: Fixed64,
        simulate: bool,
    ) -> Result<Fixed64, StoreError>;
}

impl EnergyReceiver for ElectricMachine {
    fn can_connect(&self, side: Direction) -> bool {
        ElectricMachine::can_connect(self, side)
    }

    fn receive_energy(
        &mut self,
        side: Direction,
        amount: Fixed64,
        simulate: bool,
    ) -> Result<Fixed64, StoreError> {
        ElectricMachine::receive_energy(self, side, amount, simulate)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Generator {
    pub store: ResourceStore,
    pub output_side: Direction,
    pub output_per_tick: Fixed64,
}

impl Generator {
    pub fn new(store: ResourceStore, output_side: Direction, output_per_tick: Fixed64) -> Self {
        Self {
            store,
            output_side,
            output_per_tick: output_per_tick.max(ZERO),
        }
    }

    pub fn from_config(
        config: &GeneratorConfig,
        output_side: Direction,
    ) -> Result<Self, StoreError> {
        let store = ResourceStore::new(
            config_value("capacity", config.capacity)?,
            config_value("max extract", config.max_extract)?,
            config_value("max insert", config.max_insert)?,
        )?;
        let output = config_value("output per tick", config.output_per_tick)?;
        Ok(Self::new(store, output_side, output))
    }

    /// Fill the store by this tick's output. Returns the amount produced.
    pub fn produce(&mut self) -> Fixed64 {
        // output_per_tick is clamped non-negative on construction
        self.store.insert(self.output_per_tick, false).unwrap_or(ZERO)
    }

    /// Push stored energy into `receiver`, which sits on the output side.
    /// Returns the amount moved.
    pub fn push_into<R: EnergyReceiver + ?Sized>(&mut self, receiver: &mut R) -> Fixed64 {
        let facing = self.output_side.opposite();
        if !receiver.can_connect(facing) {
            return ZERO;
        }
        let offered = match self.store.extract(self.store.max_extract(), true) {
            Ok(offered) if offered > ZERO => offered,
            _ => return ZERO,
        };
        let accepted = match receiver.receive_energy(facing, offered, false) {
            Ok(accepted) => accepted,
            Err(err) => {
                tracing::warn!(%err, "energy receiver rejected push");
                return ZERO;
            }
        };
        // accepted never exceeds offered, which the store can cover
        let moved = self.store.extract(accepted, false).unwrap_or(ZERO);
        tracing::trace!(%moved, "generator pushed energy");
        moved
    }
}
