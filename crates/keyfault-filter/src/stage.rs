//! One-time attachment of the filter stage.
//!
//! [`FilterStage::attach`] is the equivalent of inserting the filter into a
//! live keyboard stack: it creates the shared state, the pipeline, the
//! dispatch multiplexer with its primary control queue, and the sideband
//! channel, wired together exactly once. Everything after attachment goes
//! through the returned handle – the lower layer drives the pipeline's
//! service callback, the upper stack issues internal requests, and external
//! tooling talks to the sideband channel.

use std::sync::Arc;

use tracing::info;

use keyfault_core::FilterState;

use crate::dispatch::{
    spawn_control_queue, ControlError, ControlQueueHandle, ControlResponse, DispatchMultiplexer,
    InternalRequest,
};
use crate::lower::LowerTarget;
use crate::pipeline::FilterPipeline;
use crate::sideband::SidebandChannel;

/// A fully wired filter stage.
pub struct FilterStage {
    state: Arc<FilterState>,
    pipeline: Arc<FilterPipeline>,
    multiplexer: Arc<DispatchMultiplexer>,
    control_queue: ControlQueueHandle,
    sideband: SidebandChannel,
}

impl FilterStage {
    /// Attaches a new filter stage over the given lower layer, seeding the
    /// corruption engine from the system clock.
    ///
    /// Must be called from within a tokio runtime (queue workers are
    /// spawned here).
    pub fn attach(lower: Arc<dyn LowerTarget>) -> Self {
        Self::attach_with_state(lower, Arc::new(FilterState::new()))
    }

    /// Attaches with an explicit seed, for reproducible corruption runs.
    pub fn attach_seeded(lower: Arc<dyn LowerTarget>, seed: u32) -> Self {
        Self::attach_with_state(lower, Arc::new(FilterState::with_seed(seed)))
    }

    fn attach_with_state(lower: Arc<dyn LowerTarget>, state: Arc<FilterState>) -> Self {
        let pipeline = Arc::new(FilterPipeline::new(Arc::clone(&state)));
        let multiplexer = Arc::new(DispatchMultiplexer::new(
            Arc::clone(&state),
            Arc::clone(&pipeline),
            lower,
        ));
        let control_queue = spawn_control_queue(Arc::clone(&multiplexer));
        let sideband = SidebandChannel::create(control_queue.clone());

        info!(
            "keyboard filter stage attached as {} (seed 0x{:08X})",
            sideband.identity(),
            state.seed()
        );

        Self {
            state,
            pipeline,
            multiplexer,
            control_queue,
            sideband,
        }
    }

    /// The data-path pipeline the lower layer invokes per batch.
    pub fn pipeline(&self) -> &Arc<FilterPipeline> {
        &self.pipeline
    }

    /// The sideband channel external tooling opens.
    pub fn sideband(&self) -> &SidebandChannel {
        &self.sideband
    }

    /// The primary control queue handle.
    pub fn control_queue(&self) -> &ControlQueueHandle {
        &self.control_queue
    }

    /// The shared filter state, for observation and diagnostics.
    pub fn state(&self) -> &Arc<FilterState> {
        &self.state
    }

    /// Dispatches a keyboard-class request from the upper consumer stack.
    ///
    /// # Errors
    ///
    /// See [`DispatchMultiplexer::dispatch_internal`].
    pub async fn dispatch_internal(
        &self,
        request: InternalRequest,
    ) -> Result<ControlResponse, ControlError> {
        self.multiplexer.dispatch_internal(request).await
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
