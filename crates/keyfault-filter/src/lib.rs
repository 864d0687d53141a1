//! keyfault-filter library entry point.
//!
//! The filter stage service: everything between the lower device layer that
//! produces key-event batches and the upstream consumer that normally
//! receives them.
//!
//! # Module map
//!
//! - **`pipeline`** – the service callback: corrupt a batch in place, hand
//!   it to the captured upstream consumer. This runs on every interrupt
//!   batch and is the hot path.
//! - **`dispatch`** – the request multiplexer: keyboard-class requests from
//!   the upper stack (connect, attribute queries, indicator/typematic
//!   pass-through) and the configuration surface reached through the
//!   primary control queue.
//! - **`sideband`** – the control-only endpoint external tooling opens;
//!   forwards real configuration work into the primary queue.
//! - **`lower`** – the port trait to the lower device layer, plus a mock.
//! - **`stage`** – one-time attachment wiring all of the above together.
//!
//! Re-exported so integration tests in `tests/` and the binary in `main.rs`
//! share the same module tree.

pub mod dispatch;
pub mod lower;
pub mod pipeline;
pub mod sideband;
pub mod stage;

pub use dispatch::{
    ControlError, ControlQueueHandle, ControlRequest, ControlResponse, DispatchMultiplexer,
    InternalRequest,
};
pub use lower::{LowerError, LowerTarget};
pub use pipeline::{FilterPipeline, UpstreamConsumer};
pub use sideband::SidebandChannel;
pub use stage::FilterStage;
