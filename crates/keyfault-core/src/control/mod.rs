//! Control-channel vocabulary: code points and fixed binary wire layouts.

pub mod codes;
pub mod wire;

pub use codes::{ControlCode, KeyboardIoCode};
pub use wire::{KeyboardAttributes, WireError};
