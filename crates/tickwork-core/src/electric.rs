//! Electric machine node: a resource store, derived machine state, an
//! optional battery slot and an optional idle drain.
//!
//! Each update, in order:
//! 1. discharge the battery into the store if the machine is pulling energy,
//!    the store has room, and both a battery and an input side exist;
//! 2. run the [`MachineState`] cascade (interlock, sufficiency, draw, cooldown);
//! 3. apply the slow discharge while idle.

use crate::adjacency::Direction;
use crate::config::{MachineConfig, SlowDischarge};
use crate::energy::{ResourceStore, StoreError, config_value};
use crate::fixed::{Fixed64, Ticks, ZERO};
use crate::machine::{MachineState, TickOutcome};
use crate::status::{StatusInputs, StatusLine, present};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElectricMachine {
    pub store: ResourceStore,
    pub state: MachineState,
    /// Battery item in the machine's battery slot.
    pub battery: Option<ResourceStore>,
    /// The only side energy may enter from.
    pub input_side: Option<Direction>,
    pub slow_discharge: Option<SlowDischarge>,
}

impl ElectricMachine {
    pub fn new(store: ResourceStore, state: MachineState) -> Self {
        Self {
            store,
            state,
            battery: None,
            input_side: None,
            slow_discharge: None,
        }
    }

    pub fn from_config(config: &MachineConfig) -> Result<Self, StoreError> {
        let store = ResourceStore::new(
            config_value("capacity", config.capacity)?,
            config_value("max extract", config.max_extract)?,
            config_value("max insert", config.max_insert)?,
        )?;
        if let Some(drain) = config.slow_discharge {
            config_value("slow discharge", drain.amount)?;
        }
        let mut state = MachineState::new(config.toggle_cooldown);
        state.interlock_override = config.interlock_override;
        let mut machine = Self::new(store, state);
        machine.slow_discharge = config.slow_discharge;
        Ok(machine)
    }

    #[must_use]
    pub fn with_input_side(mut self, side: Direction) -> Self {
        self.input_side = Some(side);
        self
    }

    /// Whether the machine wants energy this tick.
    pub fn should_pull_energy(&self, wants_to_run: bool) -> bool {
        wants_to_run || self.store.amount() < self.store.capacity()
    }

    pub fn can_connect(&self, side: Direction) -> bool {
        self.input_side == Some(side)
    }

    /// Accept energy arriving on `side`. Energy offered on any other side is refused.
    pub fn receive_energy(
        &mut self,
        side: Direction,
        amount: Fixed64,
        simulate: bool,
    ) -> Result<Fixed64, StoreError> {
        if !self.can_connect(side) {
            return Ok(ZERO);
        }
        self.store.insert(amount, simulate)
    }

    /// Move charge from the battery slot into the store. Returns the amount moved.
    pub fn discharge_battery(&mut self) -> Fixed64 {
        let Some(battery) = self.battery.as_mut() else {
            return ZERO;
        };
        let request = self.store.max_insert();
        // request is a store limit and never negative
        ResourceStore::transfer(battery, &mut self.store, request).unwrap_or(ZERO)
    }

    pub fn update(
        &mut self,
        tick: Ticks,
        interlock_active: bool,
        wants_to_run: bool,
    ) -> TickOutcome {
        if self.should_pull_energy(wants_to_run)
            && !self.store.is_full()
            && self.battery.is_some()
            && self.input_side.is_some()
        {
            let moved = self.discharge_battery();
            if moved > ZERO {
                tracing::trace!(%moved, "battery discharged into store");
            }
        }

        let outcome = self.state.tick(&mut self.store, interlock_active, wants_to_run);

        if !wants_to_run {
            self.apply_slow_discharge(tick);
        }

        outcome
    }

    fn apply_slow_discharge(&mut self, tick: Ticks) {
        let Some(drain) = self.slow_discharge else {
            return;
        };
        if drain.interval == 0 || tick % drain.interval != 0 {
            return;
        }
        let amount = Fixed64::saturating_from_num(drain.amount).max(ZERO);
        if let Ok(drained) = self.store.extract(amount, false) {
            tracing::trace!(%drained, "slow discharge");
        }
    }

    /// Whether the machine may do work this tick, given its last update.
    pub fn can_work(&self) -> bool {
        self.state.has_sufficient_energy() && !self.state.disabled()
    }

    pub fn status(
        &self,
        interlock_active: bool,
        missing_input: Option<&str>,
        active: Option<&str>,
        short: bool,
    ) -> StatusLine {
        present(&self.status_inputs(interlock_active, missing_input, active), short)
    }

    pub fn status_inputs<'a>(
        &self,
        interlock_active: bool,
        missing_input: Option<&'a str>,
        active: Option<&'a str>,
    ) -> StatusInputs<'a> {
        StatusInputs {
            interlock_active,
            interlock_override: self.state.interlock_override,
            stored: self.store.amount(),
            max_extract: self.store.max_extract(),
            disabled: self.state.disabled(),
            missing_input,
            active,
        }
    }
}

// ===========================================================================
// Tests
// ===========================================================================
