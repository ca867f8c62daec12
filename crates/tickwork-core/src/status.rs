//! Human-readable machine status line.
//!
//! [`present`] is a pure priority cascade: the first matching rule wins.

use crate::fixed::{Fixed64, ZERO};
use serde::{Deserialize, Serialize};
use std::fmt;

/// How alarming a status line is. Hosts map this to a color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Severity {
    /// The machine cannot run at all.
    Blocking,
    /// The machine runs poorly or intermittently.
    Warning,
    /// Capable but paused.
    Informational,
    Nominal,
    /// Should not be reachable with well-formed inputs.
    Error,
}

/// Which rule produced a status line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StatusKind {
    Off,
    MissingPower,
    MissingInput,
    Ready,
    LowPower,
    Active,
    Unknown,
}

/// A rendered status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusLine {
    pub kind: StatusKind,
    pub severity: Severity,
    pub text: String,
}

impl StatusLine {
    fn new(kind: StatusKind, severity: Severity, text: impl Into<String>) -> Self {
        Self {
            kind,
            severity,
            text: text.into(),
        }
    }
}

impl fmt::Display for StatusLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// Everything the presenter looks at.
#[derive(Debug, Clone, Copy)]
pub struct StatusInputs<'a> {
    pub interlock_active: bool,
    pub interlock_override: bool,
    pub stored: Fixed64,
    pub max_extract: Fixed64,
    pub disabled: bool,
    /// Domain-specific missing input, e.g. "Missing Fuel".
    pub missing_input: Option<&'a str>,
    /// Domain-specific running text, e.g. "Processing".
    pub active: Option<&'a str>,
}

pub const TEXT_OFF: &str = "Off";
pub const TEXT_MISSING_POWER: &str = "Missing Power";
pub const TEXT_MISSING_POWER_SHORT: &str = "No Power";
pub const TEXT_READY: &str = "Ready";
pub const TEXT_ACTIVE: &str = "Active";
pub const TEXT_UNKNOWN: &str = "Unknown";

fn missing_power(short: bool) -> &'static str {
    if short {
        TEXT_MISSING_POWER_SHORT
    } else {
        TEXT_MISSING_POWER
    }
}

/// Map machine state to a status line.
///
/// Rules, in priority order:
/// 1. interlock active and not overridden: "Off" (blocking)
/// 2. nothing stored: "Missing Power" (blocking)
/// 3. caller-supplied missing input, verbatim (blocking)
/// 4. user-disabled: "Ready" (informational)
/// 5. stored below the per-tick draw: "Missing Power" (warning)
/// 6. caller-supplied active text (nominal)
/// 7. "Unknown" (error)
///
/// `short` selects the abbreviated missing-power wording.
pub fn present(inputs: &StatusInputs<'_>, short: bool) -> StatusLine {
    if inputs.interlock_active && !inputs.interlock_override {
        return StatusLine::new(StatusKind::Off, Severity::Blocking, TEXT_OFF);
    }
    if inputs.stored == ZERO {
        return StatusLine::new(StatusKind::MissingPower, Severity::Blocking, missing_power(short));
    }
    if let Some(missing) = inputs.missing_input {
        return StatusLine::new(StatusKind::MissingInput, Severity::Blocking, missing);
    }
    if inputs.disabled {
        return StatusLine::new(StatusKind::Ready, Severity::Informational, TEXT_READY);
    }
    if inputs.stored < inputs.max_extract {
        return StatusLine::new(StatusKind::LowPower, Severity::Warning, missing_power(short));
    }
    if let Some(active) = inputs.active {
        return StatusLine::new(StatusKind::Active, Severity::Nominal, active);
    }
    StatusLine::new(StatusKind::Unknown, Severity::Error, TEXT_UNKNOWN)
}

/// Status for machines without domain inputs: same cascade without the
/// missing-input rule, falling back to a generic "Active".
pub fn present_default(inputs: &StatusInputs<'_>) -> StatusLine {
    let inputs = StatusInputs {
        missing_input: None,
        active: Some(inputs.active.unwrap_or(TEXT_ACTIVE)),
        ..*inputs
    };
    present(&inputs, false)
}

/// Status for nodes without an energy buffer: only the missing-input,
/// active and unknown rules apply.
pub fn present_unpowered(missing_input: Option<&str>, active: Option<&str>) -> StatusLine {
    match (missing_input, active) {
        (Some(missing), _) => {
            StatusLine::new(StatusKind::MissingInput, Severity::Blocking, missing)
        }
        (None, Some(active)) => StatusLine::new(StatusKind::Active, Severity::Nominal, active),
        (None, None) => StatusLine::new(StatusKind::Unknown, Severity::Error, TEXT_UNKNOWN),
    }
}

// ===========================================================================
// Tests
// ===========================================================================
