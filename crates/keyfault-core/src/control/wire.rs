//! Fixed binary layouts of the control operations.
//!
//! Wire formats:
//! ```text
//! SetConfig input:      [probability:4][mode:4]               (8 bytes)
//! GetAttributes output: KeyboardAttributes descriptor         (22 bytes)
//! ```
//! All multi-byte integers are little-endian – these buffers model
//! native-struct ioctl payloads, not network traffic.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::state::FilterConfig;

/// Errors produced while decoding a control payload.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum WireError {
    /// The byte slice is shorter than the fixed layout requires.
    #[error("insufficient data: need at least {needed} bytes, got {available}")]
    InsufficientData { needed: usize, available: usize },
}

fn require_len(buf: &[u8], needed: usize) -> Result<(), WireError> {
    if buf.len() < needed {
        Err(WireError::InsufficientData {
            needed,
            available: buf.len(),
        })
    } else {
        Ok(())
    }
}

fn read_u16(buf: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes([buf[offset], buf[offset + 1]])
}

fn read_u32(buf: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([
        buf[offset],
        buf[offset + 1],
        buf[offset + 2],
        buf[offset + 3],
    ])
}

// ── SetConfig payload ─────────────────────────────────────────────────────────

impl FilterConfig {
    /// Size of the encoded payload in bytes.
    pub const WIRE_SIZE: usize = 8;

    /// Encodes the payload: probability then mode, little-endian.
    pub fn encode(&self) -> [u8; Self::WIRE_SIZE] {
        let mut buf = [0u8; Self::WIRE_SIZE];
        buf[0..4].copy_from_slice(&self.probability.to_le_bytes());
        buf[4..8].copy_from_slice(&self.mode.to_le_bytes());
        buf
    }

    /// Decodes a payload from the beginning of `bytes`.
    ///
    /// # Errors
    ///
    /// Returns [`WireError::InsufficientData`] for undersized input. Range
    /// validation of `probability` belongs to the dispatch layer, not the
    /// codec.
    pub fn decode(bytes: &[u8]) -> Result<Self, WireError> {
        require_len(bytes, Self::WIRE_SIZE)?;
        Ok(Self {
            probability: read_u32(bytes, 0),
            mode: read_u32(bytes, 4),
        })
    }
}

// ── Keyboard attributes descriptor ────────────────────────────────────────────

/// Fixed-size keyboard attributes descriptor.
///
/// The filter treats this as opaque: it is captured from the first
/// successful forwarded attribute query and handed back verbatim to local
/// queries. The fields mirror what a keyboard class driver reports about
/// the underlying device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct KeyboardAttributes {
    /// Keyboard hardware type identifier.
    pub keyboard_type: u8,
    /// Vendor-specific subtype.
    pub keyboard_subtype: u8,
    /// Scan-code set in use.
    pub keyboard_mode: u16,
    /// Number of function keys.
    pub function_key_count: u16,
    /// Number of LED indicators.
    pub indicator_count: u16,
    /// Total number of keys.
    pub total_key_count: u16,
    /// Depth of the device input queue, in events.
    pub input_queue_length: u32,
    /// Slowest supported typematic rate, in keys per second.
    pub repeat_rate_min: u16,
    /// Fastest supported typematic rate, in keys per second.
    pub repeat_rate_max: u16,
    /// Shortest supported typematic delay, in milliseconds.
    pub repeat_delay_min: u16,
    /// Longest supported typematic delay, in milliseconds.
    pub repeat_delay_max: u16,
}

impl KeyboardAttributes {
    /// Size of the encoded descriptor in bytes.
    pub const WIRE_SIZE: usize = 22;

    /// Encodes the descriptor, fields in declaration order, little-endian.
    pub fn encode(&self) -> [u8; Self::WIRE_SIZE] {
        let mut buf = [0u8; Self::WIRE_SIZE];
        buf[0] = self.keyboard_type;
        buf[1] = self.keyboard_subtype;
        buf[2..4].copy_from_slice(&self.keyboard_mode.to_le_bytes());
        buf[4..6].copy_from_slice(&self.function_key_count.to_le_bytes());
        buf[6..8].copy_from_slice(&self.indicator_count.to_le_bytes());
        buf[8..10].copy_from_slice(&self.total_key_count.to_le_bytes());
        buf[10..14].copy_from_slice(&self.input_queue_length.to_le_bytes());
        buf[14..16].copy_from_slice(&self.repeat_rate_min.to_le_bytes());
        buf[16..18].copy_from_slice(&self.repeat_rate_max.to_le_bytes());
        buf[18..20].copy_from_slice(&self.repeat_delay_min.to_le_bytes());
        buf[20..22].copy_from_slice(&self.repeat_delay_max.to_le_bytes());
        buf
    }

    /// Decodes a descriptor from the beginning of `bytes`.
    ///
    /// # Errors
    ///
    /// Returns [`WireError::InsufficientData`] for undersized input.
    pub fn decode(bytes: &[u8]) -> Result<Self, WireError> {
        require_len(bytes, Self::WIRE_SIZE)?;
        Ok(Self {
            keyboard_type: bytes[0],
            keyboard_subtype: bytes[1],
            keyboard_mode: read_u16(bytes, 2),
            function_key_count: read_u16(bytes, 4),
            indicator_count: read_u16(bytes, 6),
            total_key_count: read_u16(bytes, 8),
            input_queue_length: read_u32(bytes, 10),
            repeat_rate_min: read_u16(bytes, 14),
            repeat_rate_max: read_u16(bytes, 16),
            repeat_delay_min: read_u16(bytes, 18),
            repeat_delay_max: read_u16(bytes, 20),
        })
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
