//! Bounded energy accumulator with per-call rate limits.
//!
//! A [`ResourceStore`] never rejects an in-range request: extraction and
//! insertion clamp to the available amount, the remaining headroom, and the
//! per-call rate. Negative inputs are caller bugs and fail with
//! [`StoreError::Negative`].

use crate::fixed::{Fixed64, ZERO, min3};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Invalid arguments passed to a [`ResourceStore`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("{what} must not be negative (got {value})")]
    Negative { what: &'static str, value: Fixed64 },
    #[error("capacity must be greater than zero")]
    ZeroCapacity,
    #[error("{what} is outside the fixed-point range")]
    OutOfRange { what: &'static str },
}

/// Convert a configured value to [`Fixed64`], failing instead of wrapping
/// when it is not finite or does not fit.
pub fn config_value(what: &'static str, value: f64) -> Result<Fixed64, StoreError> {
    Fixed64::checked_from_num(value).ok_or(StoreError::OutOfRange { what })
}

fn non_negative(what: &'static str, value: Fixed64) -> Result<Fixed64, StoreError> {
    if value < ZERO {
        Err(StoreError::Negative { what, value })
    } else {
        Ok(value)
    }
}

// ---------------------------------------------------------------------------
// ResourceStore
// ---------------------------------------------------------------------------

/// Energy buffer owned by a single node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceStore {
    /// Current charge. Always within `[0, capacity]`.
    amount: Fixed64,
    capacity: Fixed64,
    max_extract: Fixed64,
    max_insert: Fixed64,
}

impl ResourceStore {
    /// Create an empty store.
    pub fn new(
        capacity: Fixed64,
        max_extract: Fixed64,
        max_insert: Fixed64,
    ) -> Result<Self, StoreError> {
        let capacity = non_negative("capacity", capacity)?;
        if capacity == ZERO {
            return Err(StoreError::ZeroCapacity);
        }
        Ok(Self {
            amount: ZERO,
            capacity,
            max_extract: non_negative("max extract", max_extract)?,
            max_insert: non_negative("max insert", max_insert)?,
        })
    }

    /// Create a store with the same limit for extraction and insertion.
    pub fn symmetric(capacity: Fixed64, max_transfer: Fixed64) -> Result<Self, StoreError> {
        Self::new(capacity, max_transfer, max_transfer)
    }

    pub fn amount(&self) -> Fixed64 {
        self.amount
    }

    pub fn capacity(&self) -> Fixed64 {
        self.capacity
    }

    pub fn max_extract(&self) -> Fixed64 {
        self.max_extract
    }

    pub fn max_insert(&self) -> Fixed64 {
        self.max_insert
    }

    pub fn is_empty(&self) -> bool {
        self.amount == ZERO
    }

    pub fn is_full(&self) -> bool {
        self.amount >= self.capacity
    }

    /// Space left before the store is full.
    pub fn headroom(&self) -> Fixed64 {
        self.capacity - self.amount
    }

    /// Take up to `requested` out of the store.
    ///
    /// Returns `min(requested, amount, max_extract)`. The amount is only
    /// decremented when `simulate` is false.
    pub fn extract(&mut self, requested: Fixed64, simulate: bool) -> Result<Fixed64, StoreError> {
        let requested = non_negative("requested extraction", requested)?;
        let actual = min3(requested, self.amount, self.max_extract);
        if !simulate {
            self.amount -= actual;
        }
        Ok(actual)
    }

    /// Put up to `requested` into the store.
    ///
    /// Returns `min(requested, capacity - amount, max_insert)`. The amount is
    /// only incremented when `simulate` is false.
    pub fn insert(&mut self, requested: Fixed64, simulate: bool) -> Result<Fixed64, StoreError> {
        let requested = non_negative("requested insertion", requested)?;
        let accepted = min3(requested, self.headroom(), self.max_insert);
        if !simulate {
            self.amount += accepted;
        }
        Ok(accepted)
    }

    /// Overwrite the stored amount, e.g. when restoring a save.
    /// Values above capacity are clamped to capacity.
    pub fn set_amount(&mut self, amount: Fixed64) -> Result<(), StoreError> {
        let amount = non_negative("amount", amount)?;
        self.amount = amount.min(self.capacity);
        Ok(())
    }

    /// Fill level scaled to `0..=scale`, rounded down. Used for gauges.
    pub fn scaled_level(&self, scale: u32) -> u32 {
        let scaled = self.amount * Fixed64::from_num(scale) / self.capacity;
        scaled.floor().to_num::<u32>()
    }

    /// Move energy from `from` into `to`, bounded by both sides' limits.
    /// Returns the amount moved.
    pub fn transfer(
        from: &mut ResourceStore,
        to: &mut ResourceStore,
        requested: Fixed64,
    ) -> Result<Fixed64, StoreError> {
        let available = from.extract(requested, true)?;
        let accepted = to.insert(available, true)?;
        if accepted > ZERO {
            from.extract(accepted, false)?;
            to.insert(accepted, false)?;
        }
        Ok(accepted)
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn fixed(v: f64) -> Fixed64 {
        Fixed64::from_num(v)
    }

    fn store(capacity: f64, max_extract: f64, max_insert: f64, amount: f64) -> ResourceStore {
        let mut s =
            ResourceStore::new(fixed(capacity), fixed(max_extract), fixed(max_insert)).unwrap();
        s.set_amount(fixed(amount)).unwrap();
        s
    }

    #[test]
    fn extract_clamps_to_rate() {
        let mut s = store(100.0, 5.0, 10.0, 50.0);
        assert_eq!(s.extract(fixed(20.0), false).unwrap(), fixed(5.0));
        assert_eq!(s.amount(), fixed(45.0));
    }

    #[test]
    fn extract_clamps_to_amount() {
        let mut s = store(100.0, 50.0, 10.0, 3.0);
        assert_eq!(s.extract(fixed(20.0), false).unwrap(), fixed(3.0));
        assert!(s.is_empty());
    }

    #[test]
    fn simulated_extract_leaves_amount() {
        let mut s = store(100.0, 5.0, 10.0, 50.0);
        assert_eq!(s.extract(fixed(4.0), true).unwrap(), fixed(4.0));
        assert_eq!(s.amount(), fixed(50.0));
    }

    #[test]
    fn insert_clamps_to_headroom_and_rate() {
        let mut s = store(100.0, 5.0, 10.0, 95.0);
        assert_eq!(s.insert(fixed(20.0), false).unwrap(), fixed(5.0));
        assert!(s.is_full());

        let mut s = store(100.0, 5.0, 10.0, 0.0);
        assert_eq!(s.insert(fixed(20.0), false).unwrap(), fixed(10.0));
        assert_eq!(s.amount(), fixed(10.0));
    }

    #[test]
    fn simulated_insert_leaves_amount() {
        let mut s = store(100.0, 5.0, 10.0, 0.0);
        assert_eq!(s.insert(fixed(7.0), true).unwrap(), fixed(7.0));
        assert!(s.is_empty());
    }

    #[test]
    fn negative_requests_fail_fast() {
        let mut s = store(100.0, 5.0, 10.0, 50.0);
        assert!(matches!(
            s.extract(fixed(-1.0), false),
            Err(StoreError::Negative { .. })
        ));
        assert!(matches!(
            s.insert(fixed(-1.0), true),
            Err(StoreError::Negative { .. })
        ));
        assert_eq!(s.amount(), fixed(50.0));
    }

    #[test]
    fn invalid_construction_is_rejected() {
        assert_eq!(
            ResourceStore::new(fixed(0.0), fixed(1.0), fixed(1.0)),
            Err(StoreError::ZeroCapacity)
        );
        assert!(ResourceStore::new(fixed(-5.0), fixed(1.0), fixed(1.0)).is_err());
        assert!(ResourceStore::new(fixed(5.0), fixed(-1.0), fixed(1.0)).is_err());
    }

    #[test]
    fn config_values_outside_fixed_range_are_rejected() {
        assert_eq!(config_value("capacity", 250.5), Ok(fixed(250.5)));
        assert_eq!(
            config_value("capacity", 5.0e9),
            Err(StoreError::OutOfRange { what: "capacity" })
        );
        assert!(config_value("max insert", -5.0e9).is_err());
        assert!(config_value("max insert", f64::NAN).is_err());
        assert!(config_value("max insert", f64::INFINITY).is_err());
    }

    #[test]
    fn set_amount_clamps_above_capacity() {
        let mut s = store(100.0, 5.0, 10.0, 0.0);
        s.set_amount(fixed(250.0)).unwrap();
        assert_eq!(s.amount(), fixed(100.0));
        assert!(s.set_amount(fixed(-1.0)).is_err());
    }

    #[test]
    fn scaled_level_rounds_down() {
        let s = store(100.0, 5.0, 10.0, 49.9);
        assert_eq!(s.scaled_level(10), 4);
        let s = store(100.0, 5.0, 10.0, 100.0);
        assert_eq!(s.scaled_level(54), 54);
    }

    #[test]
    fn transfer_is_bounded_by_both_sides() {
        let mut battery = store(1000.0, 30.0, 30.0, 500.0);
        let mut machine = store(100.0, 5.0, 20.0, 90.0);
        let moved = ResourceStore::transfer(&mut battery, &mut machine, fixed(1000.0)).unwrap();
        assert_eq!(moved, fixed(10.0));
        assert_eq!(battery.amount(), fixed(490.0));
        assert!(machine.is_full());
    }
}
