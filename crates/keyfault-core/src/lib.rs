//! # keyfault-core
//!
//! Shared library for KeyFault containing the keyboard event model, the
//! corruption policy, the shared filter state, and the control-channel wire
//! formats.
//!
//! This crate is used by the filter stage service and by external tooling
//! that speaks the control protocol. It has zero dependencies on OS APIs,
//! async runtimes, or device plumbing.
//!
//! # Architecture overview (for beginners)
//!
//! KeyFault is a fault injector for keyboard input: it sits between the
//! hardware layer that produces key events and the consumer that normally
//! receives them, and corrupts a configurable fraction of key-down events
//! so that driver and input-stack developers can observe how software above
//! the filter copes with bad input.
//!
//! This crate (`keyfault-core`) is the shared foundation. It defines:
//!
//! - **`event`** – The in-memory shape of one key transition: a scan code,
//!   a Make (key-down) or Break (key-up) transition, and auxiliary prefix
//!   flags. Batches of these flow through the filter in order.
//!
//! - **`corruption`** – Pure business logic: given the shared filter state
//!   and a mutable batch of events, decide per event whether to corrupt it
//!   and how. Fully deterministic given a seed.
//!
//! - **`state`** – The single shared configuration value (probability,
//!   mode, random seed) read on every event and written by the control
//!   channel, built from per-field atomics.
//!
//! - **`control`** – The fixed binary layouts of the two control
//!   operations (`SetConfig`, `GetAttributes`) and their code points.

// Declare the top-level modules. Rust will look for each in a file or
// subdirectory with the same name (e.g., src/control/mod.rs).
pub mod control;
pub mod corruption;
pub mod event;
pub mod rand;
pub mod scancode;
pub mod state;

// Re-export the most-used types at the crate root so callers can write
// `keyfault_core::FilterState` instead of `keyfault_core::state::FilterState`.
pub use control::codes::{ControlCode, KeyboardIoCode};
pub use control::wire::{KeyboardAttributes, WireError};
pub use corruption::corrupt_batch;
pub use event::{EventFlags, KeyEvent, KeyTransition};
pub use rand::Lcg31;
pub use state::{CorruptionMode, FilterConfig, FilterState};
