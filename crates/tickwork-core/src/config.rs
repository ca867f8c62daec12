//! Tunables for machines, unloaders and generators.
//!
//! Values are plain `f64` / integers so they read naturally in data files;
//! they are converted to fixed point when a node is built.

use crate::adjacency::{DEFAULT_RESCAN_INTERVAL, ScanPattern};
use crate::cargo::DEFAULT_RESERVED_SLOTS;
use crate::fixed::Ticks;
use crate::machine::DEFAULT_TOGGLE_COOLDOWN;
use serde::{Deserialize, Serialize};

/// Idle energy drain: `amount` every `interval` ticks.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SlowDischarge {
    pub interval: Ticks,
    pub amount: f64,
}

impl Default for SlowDischarge {
    fn default() -> Self {
        Self {
            interval: 10,
            amount: 5.0,
        }
    }
}

/// Energy buffer and toggle settings of an electric machine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MachineConfig {
    pub capacity: f64,
    /// Energy drawn per running tick; also the sufficiency threshold.
    pub max_extract: f64,
    pub max_insert: f64,
    pub toggle_cooldown: u32,
    pub slow_discharge: Option<SlowDischarge>,
    /// Ignore the interlock signal.
    pub interlock_override: bool,
}

impl Default for MachineConfig {
    fn default() -> Self {
        Self {
            capacity: 16_000.0,
            max_extract: 45.0,
            max_insert: 400.0,
            toggle_cooldown: DEFAULT_TOGGLE_COOLDOWN,
            slow_discharge: None,
            interlock_override: false,
        }
    }
}

/// Cargo unloader settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UnloaderConfig {
    pub slot_count: usize,
    /// Leading slots excluded from cargo (slot 0 holds a battery).
    pub reserved_slots: usize,
    /// Items requested from the partner per pull.
    pub pull_batch: u32,
    pub rescan_interval: Ticks,
    /// Every n-th tick a provisional placement is confirmed.
    pub confirm_interval: Ticks,
    pub scan: ScanPattern,
    /// When set, the unloader only works while powered.
    pub power: Option<MachineConfig>,
}

impl Default for UnloaderConfig {
    fn default() -> Self {
        Self {
            slot_count: 15,
            reserved_slots: DEFAULT_RESERVED_SLOTS,
            pull_batch: 8,
            rescan_interval: DEFAULT_RESCAN_INTERVAL,
            confirm_interval: 5,
            scan: ScanPattern::Full,
            power: None,
        }
    }
}

/// Energy producer settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    pub capacity: f64,
    pub max_extract: f64,
    pub max_insert: f64,
    pub output_per_tick: f64,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            capacity: 50_000.0,
            max_extract: 200.0,
            max_insert: 200.0,
            output_per_tick: 60.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unloader_defaults_match_reference_machine() {
        let cfg = UnloaderConfig::default();
        assert_eq!(cfg.slot_count, 15);
        assert_eq!(cfg.reserved_slots, 1);
        assert_eq!(cfg.pull_batch, 8);
        assert_eq!(cfg.rescan_interval, 100);
        assert_eq!(cfg.confirm_interval, 5);
        assert!(cfg.power.is_none());
    }

    #[test]
    fn slow_discharge_default() {
        let sd = SlowDischarge::default();
        assert_eq!(sd.interval, 10);
        assert_eq!(sd.amount, 5.0);
    }
}
