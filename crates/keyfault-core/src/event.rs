//! The keyboard event model.
//!
//! One [`KeyEvent`] is one hardware key transition within an ordered batch.
//! The filter mutates events in place; it never creates or destroys them –
//! the batch is owned by the lower device layer for the duration of one
//! dispatch call, which is why the pipeline works on `&mut [KeyEvent]`.

use serde::{Deserialize, Serialize};

/// Direction of a key transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum KeyTransition {
    /// Key pressed down.
    Make = 0x00,
    /// Key released.
    Break = 0x01,
}

impl TryFrom<u8> for KeyTransition {
    type Error = ();

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x00 => Ok(KeyTransition::Make),
            0x01 => Ok(KeyTransition::Break),
            _ => Err(()),
        }
    }
}

/// Auxiliary flag bitmask carried alongside the scan code.
///
/// Bit layout:
/// - Bit 0: E0 prefix (extended key, e.g. right-side modifiers, arrow keys)
/// - Bit 1: E1 prefix (Pause/Break sequence)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EventFlags(pub u8);

impl EventFlags {
    pub const E0: u8 = 1 << 0;
    pub const E1: u8 = 1 << 1;

    /// Returns `true` if either extended-key prefix is present.
    pub fn extended(&self) -> bool {
        self.0 & (Self::E0 | Self::E1) != 0
    }
}

/// One hardware key transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyEvent {
    /// Hardware scan code (set 1).
    pub scan_code: u16,
    /// Whether this is a key-down or key-up transition.
    pub transition: KeyTransition,
    /// Auxiliary prefix flags.
    pub flags: EventFlags,
}

impl KeyEvent {
    /// Creates an event with explicit transition and empty flags.
    pub fn new(scan_code: u16, transition: KeyTransition) -> Self {
        Self {
            scan_code,
            transition,
            flags: EventFlags::default(),
        }
    }

    /// Creates a key-down (Make) event.
    pub fn make(scan_code: u16) -> Self {
        Self::new(scan_code, KeyTransition::Make)
    }

    /// Creates a key-up (Break) event.
    pub fn break_(scan_code: u16) -> Self {
        Self::new(scan_code, KeyTransition::Break)
    }

    /// Returns `true` for key-down transitions – the only events eligible
    /// for corruption.
    pub fn is_make(&self) -> bool {
        self.transition == KeyTransition::Make
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
