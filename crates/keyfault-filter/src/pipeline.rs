//! The interception pipeline: the service callback sitting on the keyboard
//! data path.
//!
//! The lower layer hands this pipeline an ordered batch of key events; the
//! pipeline corrupts eligible events in place and hands the whole batch –
//! same count, same order – to the upstream consumer captured at connect
//! time. It never buffers, splits, or reorders a batch, so the consumed
//! count reported back to the lower layer always equals the input count.

use std::sync::{Arc, OnceLock};

use tracing::warn;

use keyfault_core::{corrupt_batch, FilterState, KeyEvent};

/// The original recipient of keyboard events, re-invoked by the pipeline
/// after corruption.
///
/// The production binding is whatever consumer issued the connect request;
/// tests use recording implementations.
pub trait UpstreamConsumer: Send + Sync {
    /// Delivers a batch of events. The consumer sets `consumed` to the
    /// number of events it accepted.
    fn service(&self, events: &mut [KeyEvent], consumed: &mut usize);
}

/// The consumer capability captured by the connect operation.
///
/// Captured exactly once and immutable thereafter; disconnecting is not
/// supported.
pub struct UpstreamBinding {
    consumer: Arc<dyn UpstreamConsumer>,
}

/// The data-path half of the filter stage.
pub struct FilterPipeline {
    state: Arc<FilterState>,
    binding: OnceLock<UpstreamBinding>,
}

impl FilterPipeline {
    /// Creates an unconnected pipeline over the shared filter state.
    pub fn new(state: Arc<FilterState>) -> Self {
        Self {
            state,
            binding: OnceLock::new(),
        }
    }

    /// Captures the upstream consumer. Fails if a binding already exists,
    /// leaving the existing binding untouched.
    pub(crate) fn bind(&self, consumer: Arc<dyn UpstreamConsumer>) -> Result<(), ()> {
        self.binding
            .set(UpstreamBinding { consumer })
            .map_err(|_| ())
    }

    /// Returns whether an upstream consumer has been captured.
    pub fn is_connected(&self) -> bool {
        self.binding.get().is_some()
    }

    /// The service callback: processes one ordered batch.
    ///
    /// Corrupts eligible key-downs in place per the shared configuration,
    /// then forwards the batch to the bound consumer. `consumed` always
    /// ends up equal to `events.len()`.
    pub fn service_callback(&self, events: &mut [KeyEvent], consumed: &mut usize) {
        corrupt_batch(&self.state, events);

        match self.binding.get() {
            Some(binding) => binding.consumer.service(events, consumed),
            None => {
                // Nothing upstream to hand the batch to; report it consumed
                // so the lower layer does not re-deliver.
                warn!("service callback invoked with no upstream consumer bound");
                *consumed = events.len();
            }
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
