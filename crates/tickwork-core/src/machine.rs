//! Derived machine state: enabled/disabled with a debounce cooldown, plus
//! energy sufficiency recomputed every tick from the store and the interlock.

use crate::energy::ResourceStore;
use crate::fixed::{Fixed64, ZERO};
use serde::{Deserialize, Serialize};

/// Ticks a toggle locks out further toggles.
pub const DEFAULT_TOGGLE_COOLDOWN: u32 = 10;

/// The persisted part of a machine's state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MachineSnapshot {
    pub disabled_by_user: bool,
}

/// What one call to [`MachineState::tick`] did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickOutcome {
    /// The interlock signal held the machine off this tick.
    pub withheld: bool,
    /// Value of `has_sufficient_energy` after the tick.
    pub sufficient: bool,
    /// Energy committed out of the store this tick.
    pub extracted: Fixed64,
    /// `sufficient` differs from the previous tick.
    pub sufficiency_changed: bool,
}

/// Soft state of a powered machine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MachineState {
    disabled_by_user: bool,
    disable_cooldown: u32,
    cooldown_window: u32,
    #[serde(skip)]
    has_sufficient_energy: bool,
    /// Ignore the external interlock signal entirely.
    pub interlock_override: bool,
}

impl Default for MachineState {
    fn default() -> Self {
        Self::new(DEFAULT_TOGGLE_COOLDOWN)
    }
}

impl MachineState {
    pub fn new(cooldown_window: u32) -> Self {
        Self {
            disabled_by_user: false,
            disable_cooldown: 0,
            cooldown_window,
            has_sufficient_energy: false,
            interlock_override: false,
        }
    }

    pub fn disabled(&self) -> bool {
        self.disabled_by_user
    }

    pub fn cooldown(&self) -> u32 {
        self.disable_cooldown
    }

    pub fn has_sufficient_energy(&self) -> bool {
        self.has_sufficient_energy
    }

    /// Whether the interlock signal applies given the override flag.
    pub fn interlocked(&self, signal_active: bool) -> bool {
        signal_active && !self.interlock_override
    }

    /// Advance one tick.
    ///
    /// The checks form a priority cascade and run in this order:
    /// 1. an active, non-overridden interlock withholds the machine;
    /// 2. sufficiency is `amount > max_extract`, strictly;
    /// 3. a sufficient machine that wants to run draws `max_extract`;
    /// 4. the toggle cooldown counts down.
    pub fn tick(
        &mut self,
        store: &mut ResourceStore,
        interlock_active: bool,
        wants_to_run: bool,
    ) -> TickOutcome {
        let previous = self.has_sufficient_energy;
        let withheld = self.interlocked(interlock_active);
        let mut extracted = ZERO;

        if withheld {
            self.has_sufficient_energy = false;
        } else {
            self.has_sufficient_energy = store.amount() > store.max_extract();
            if self.has_sufficient_energy && wants_to_run {
                // max_extract is non-negative by construction
                extracted = store.extract(store.max_extract(), false).unwrap_or(ZERO);
            }
        }

        self.disable_cooldown = self.disable_cooldown.saturating_sub(1);

        TickOutcome {
            withheld,
            sufficient: self.has_sufficient_energy,
            extracted,
            sufficiency_changed: previous != self.has_sufficient_energy,
        }
    }

    /// Request a new user-disabled value. Honored only when the cooldown has
    /// expired; an honored request re-arms the cooldown. Returns whether the
    /// request was applied.
    pub fn set_disabled(&mut self, disabled: bool) -> bool {
        if self.disable_cooldown != 0 {
            return false;
        }
        self.disabled_by_user = disabled;
        self.disable_cooldown = self.cooldown_window;
        true
    }

    /// Flip the user-disabled flag, subject to the cooldown.
    pub fn toggle(&mut self) -> bool {
        self.set_disabled(!self.disabled_by_user)
    }

    pub fn serialize_state(&self) -> MachineSnapshot {
        MachineSnapshot {
            disabled_by_user: self.disabled_by_user,
        }
    }

    /// Apply a loaded snapshot. The flag is applied unconditionally and the
    /// cooldown is re-armed, as for a freshly honored toggle.
    pub fn restore_state(&mut self, snapshot: MachineSnapshot) {
        self.disabled_by_user = snapshot.disabled_by_user;
        self.disable_cooldown = self.cooldown_window;
    }
}

// ===========================================================================
// Tests
// ===========================================================================
