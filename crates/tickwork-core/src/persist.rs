//! Versioned binary persistence of machine state via `bitcode`.
//!
//! Only [`MachineSnapshot`] is persisted. Everything else a machine holds is
//! either configuration or recomputed on the first tick after loading.

use crate::fixed::Ticks;
use crate::machine::{MachineSnapshot, MachineState};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Magic number identifying a persisted machine state.
pub const STATE_MAGIC: u32 = 0x71C4_0001;

/// Current format version. Increment when breaking the wire format.
pub const FORMAT_VERSION: u32 = 1;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum SerializeError {
    #[error("bitcode encoding failed: {0}")]
    Encode(String),
}

#[derive(Debug, thiserror::Error)]
pub enum DeserializeError {
    #[error("invalid magic number: expected 0x{:08X}, got 0x{:08X}", STATE_MAGIC, .0)]
    InvalidMagic(u32),
    #[error("unsupported format version: expected {}, got {}", FORMAT_VERSION, .0)]
    UnsupportedVersion(u32),
    #[error("state from future version {0} (this build supports up to {FORMAT_VERSION})")]
    FutureVersion(u32),
    #[error("bitcode decoding failed: {0}")]
    Decode(String),
}

// ---------------------------------------------------------------------------
// Header
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateHeader {
    pub magic: u32,
    pub version: u32,
    /// Tick at which the state was saved.
    pub tick: Ticks,
}

impl StateHeader {
    pub fn new(tick: Ticks) -> Self {
        Self {
            magic: STATE_MAGIC,
            version: FORMAT_VERSION,
            tick,
        }
    }

    pub fn validate(&self) -> Result<(), DeserializeError> {
        if self.magic != STATE_MAGIC {
            return Err(DeserializeError::InvalidMagic(self.magic));
        }
        if self.version > FORMAT_VERSION {
            return Err(DeserializeError::FutureVersion(self.version));
        }
        if self.version < FORMAT_VERSION {
            return Err(DeserializeError::UnsupportedVersion(self.version));
        }
        Ok(())
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct PersistedMachine {
    header: StateHeader,
    snapshot: MachineSnapshot,
}

// ---------------------------------------------------------------------------
// Encode / decode
// ---------------------------------------------------------------------------

pub fn encode_machine_state(state: &MachineState, tick: Ticks) -> Result<Vec<u8>, SerializeError> {
    let persisted = PersistedMachine {
        header: StateHeader::new(tick),
        snapshot: state.serialize_state(),
    };
    bitcode::serialize(&persisted).map_err(|e| SerializeError::Encode(e.to_string()))
}

/// Decode and validate a persisted machine state. Returns the header and
/// the snapshot; apply it with [`MachineState::restore_state`].
pub fn decode_machine_state(
    data: &[u8],
) -> Result<(StateHeader, MachineSnapshot), DeserializeError> {
    let persisted: PersistedMachine =
        bitcode::deserialize(data).map_err(|e| DeserializeError::Decode(e.to_string()))?;
    persisted.header.validate()?;
    Ok((persisted.header, persisted.snapshot))
}

/// Decode `data` and apply it to `state`.
pub fn restore_machine_state(
    state: &mut MachineState,
    data: &[u8],
) -> Result<StateHeader, DeserializeError> {
    let (header, snapshot) = decode_machine_state(data)?;
    state.restore_state(snapshot);
    tracing::debug!(
        tick = header.tick,
        disabled = snapshot.disabled_by_user,
        "machine state restored"
    );
    Ok(header)
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn restores_disabled_flag_and_rearms_cooldown() {
        let mut original = MachineState::new(10);
        assert!(original.toggle());
        let data = encode_machine_state(&original, 42).unwrap();

        let mut loaded = MachineState::new(10);
        let header = restore_machine_state(&mut loaded, &data).unwrap();
        assert_eq!(header.tick, 42);
        assert!(loaded.disabled());
        assert_eq!(loaded.cooldown(), 10);
    }

    #[test]
    fn bad_magic_is_rejected() {
        let persisted = PersistedMachine {
            header: StateHeader {
                magic: 0xDEAD_BEEF,
                ..StateHeader::new(0)
            },
            snapshot: MachineSnapshot::default(),
        };
        let data = bitcode::serialize(&persisted).unwrap();
        assert!(matches!(
            decode_machine_state(&data),
            Err(DeserializeError::InvalidMagic(0xDEAD_BEEF))
        ));
    }

    #[test]
    fn future_version_is_rejected() {
        let persisted = PersistedMachine {
            header: StateHeader {
                version: FORMAT_VERSION + 1,
                ..StateHeader::new(0)
            },
            snapshot: MachineSnapshot::default(),
        };
        let data = bitcode::serialize(&persisted).unwrap();
        assert!(matches!(decode_machine_state(&data), Err(DeserializeError::FutureVersion(_))));
    }

    #[test]
    fn garbage_fails_to_decode() {
        assert!(matches!(decode_machine_state(&[1, 2, 3]), Err(DeserializeError::Decode(_))));
    }
}
