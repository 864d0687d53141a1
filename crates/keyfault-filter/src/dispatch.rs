//! The I/O dispatch multiplexer.
//!
//! Two surfaces, matching the two places requests come from:
//!
//! - [`DispatchMultiplexer::dispatch_internal`] – keyboard-class requests
//!   from the upper consumer stack: the one-time connect, the unsupported
//!   disconnect, the attribute query (forwarded with a snapshot on
//!   completion), and the indicator/typematic pass-through class.
//! - [`DispatchMultiplexer::dispatch_control`] – the configuration surface
//!   (`SetConfig` / `GetAttributes`), reached through the primary control
//!   queue that the sideband channel forwards into.
//!
//! Every request completes exactly once on every path: direct dispatch
//! returns a `Result` on every branch, and queued requests carry a oneshot
//! completion sender with a single send site.

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, trace, warn};

use keyfault_core::{
    ControlCode, FilterConfig, FilterState, KeyboardAttributes, KeyboardIoCode, WireError,
};

use crate::lower::{LowerError, LowerTarget};
use crate::pipeline::{FilterPipeline, UpstreamConsumer};

/// Capacity of the primary control queue.
const CONTROL_QUEUE_DEPTH: usize = 64;

/// Errors produced by the dispatch layer.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ControlError {
    /// A buffer did not meet the fixed layout size. State is unchanged.
    #[error("buffer too small: need {needed} bytes, have {available}")]
    BufferTooSmall { needed: usize, available: usize },

    /// Probability outside 0–100. State is unchanged.
    #[error("invalid parameter: probability {0} exceeds 100")]
    InvalidParameter(u32),

    /// A second connect while an upstream binding exists.
    #[error("an upstream consumer is already connected")]
    AlreadyConnected,

    /// Disconnect, which this filter never performs.
    #[error("disconnect is not supported")]
    NotSupported,

    /// A configuration code the multiplexer does not recognize.
    #[error("control code 0x{0:04X} is not implemented")]
    NotImplemented(u32),

    /// The dispatch queue stopped accepting requests.
    #[error("dispatch queue is no longer accepting requests")]
    QueueClosed,

    /// An error surfaced by the lower layer, propagated verbatim.
    #[error(transparent)]
    Lower(#[from] LowerError),
}

impl From<WireError> for ControlError {
    fn from(err: WireError) -> Self {
        match err {
            WireError::InsufficientData { needed, available } => {
                ControlError::BufferTooSmall { needed, available }
            }
        }
    }
}

/// One configuration request: a raw code plus its buffers. Scoped to a
/// single dispatch; never outlives its completion.
#[derive(Debug, Clone)]
pub struct ControlRequest {
    /// Raw control code as submitted by the caller.
    pub code: u32,
    /// Input payload bytes.
    pub input: Vec<u8>,
    /// Size of the caller's output buffer.
    pub output_capacity: usize,
}

impl ControlRequest {
    /// A request with no input payload.
    pub fn no_input(code: u32, output_capacity: usize) -> Self {
        Self {
            code,
            input: Vec::new(),
            output_capacity,
        }
    }
}

/// Successful completion of a control request; `data.len()` is the number
/// of bytes transferred.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlResponse {
    pub data: Vec<u8>,
}

impl ControlResponse {
    /// Success with zero output bytes.
    pub fn empty() -> Self {
        Self { data: Vec::new() }
    }
}

/// A keyboard-class request arriving from the upper consumer stack.
pub enum InternalRequest {
    /// Capture the upstream consumer. Succeeds at most once per pipeline.
    Connect {
        consumer: Arc<dyn UpstreamConsumer>,
    },
    /// Tear down the binding – intentionally unsupported.
    Disconnect,
    /// Query the device attributes; forwarded downward, snapshotted on the
    /// way back.
    QueryAttributes { output_capacity: usize },
    /// Indicator/typematic get/set, forwarded without a local continuation.
    Passthrough {
        code: KeyboardIoCode,
        input: Vec<u8>,
        output_capacity: usize,
    },
    /// A code this filter does not know; forwarded like the pass-through
    /// class so unknown device traffic keeps flowing.
    Other {
        code: u32,
        input: Vec<u8>,
        output_capacity: usize,
    },
}

/// Routes every request for the primary device.
pub struct DispatchMultiplexer {
    state: Arc<FilterState>,
    pipeline: Arc<FilterPipeline>,
    lower: Arc<dyn LowerTarget>,
}

impl DispatchMultiplexer {
    pub fn new(
        state: Arc<FilterState>,
        pipeline: Arc<FilterPipeline>,
        lower: Arc<dyn LowerTarget>,
    ) -> Self {
        Self {
            state,
            pipeline,
            lower,
        }
    }

    /// Dispatches a keyboard-class request from the upper stack.
    ///
    /// # Errors
    ///
    /// [`ControlError::AlreadyConnected`] on a repeated connect,
    /// [`ControlError::NotSupported`] for disconnect, and lower-layer
    /// errors verbatim for every forwarded class.
    pub async fn dispatch_internal(
        &self,
        request: InternalRequest,
    ) -> Result<ControlResponse, ControlError> {
        match request {
            InternalRequest::Connect { consumer } => {
                self.pipeline
                    .bind(consumer)
                    .map_err(|_| ControlError::AlreadyConnected)?;
                debug!("upstream consumer connected");
                Ok(ControlResponse::empty())
            }

            InternalRequest::Disconnect => Err(ControlError::NotSupported),

            InternalRequest::QueryAttributes { output_capacity } => {
                let data = self
                    .lower
                    .submit(
                        KeyboardIoCode::QueryAttributes as u32,
                        Vec::new(),
                        output_capacity,
                    )
                    .await?;
                // Completion continuation: snapshot the descriptor into the
                // shared state before completing the original caller. The
                // cache is best-effort – a short result is handed through
                // without snapshotting.
                if let Ok(attributes) = KeyboardAttributes::decode(&data) {
                    if self.state.cache_attributes(attributes) {
                        debug!("keyboard attributes snapshot cached");
                    }
                }
                Ok(ControlResponse { data })
            }

            InternalRequest::Passthrough {
                code,
                input,
                output_capacity,
            } => {
                trace!("forwarding keyboard request {code:?}");
                let data = self.lower.submit(code as u32, input, output_capacity).await?;
                Ok(ControlResponse { data })
            }

            InternalRequest::Other {
                code,
                input,
                output_capacity,
            } => {
                trace!("forwarding unrecognized request 0x{code:04X}");
                let data = self.lower.submit(code, input, output_capacity).await?;
                Ok(ControlResponse { data })
            }
        }
    }

    /// Dispatches a configuration request.
    ///
    /// # Errors
    ///
    /// [`ControlError::BufferTooSmall`], [`ControlError::InvalidParameter`],
    /// or [`ControlError::NotImplemented`]; every failure leaves the filter
    /// state unchanged.
    pub fn dispatch_control(&self, request: ControlRequest) -> Result<ControlResponse, ControlError> {
        match ControlCode::try_from(request.code) {
            Ok(ControlCode::GetAttributes) => {
                if request.output_capacity < KeyboardAttributes::WIRE_SIZE {
                    return Err(ControlError::BufferTooSmall {
                        needed: KeyboardAttributes::WIRE_SIZE,
                        available: request.output_capacity,
                    });
                }
                let snapshot = self.state.attributes_snapshot();
                Ok(ControlResponse {
                    data: snapshot.encode().to_vec(),
                })
            }

            Ok(ControlCode::SetConfig) => {
                let config = FilterConfig::decode(&request.input)?;
                if config.probability > 100 {
                    return Err(ControlError::InvalidParameter(config.probability));
                }
                self.state.apply(config);
                debug!(
                    "configuration updated: mode {}, probability {}",
                    config.mode, config.probability
                );
                Ok(ControlResponse::empty())
            }

            Err(()) => Err(ControlError::NotImplemented(request.code)),
        }
    }
}

// ── Primary control queue ─────────────────────────────────────────────────────

/// A control request travelling through a dispatch queue, paired with its
/// completion. The sender has exactly one send site per path, which is what
/// makes the complete-exactly-once guarantee checkable.
pub struct QueuedControl {
    pub request: ControlRequest,
    pub completion: oneshot::Sender<Result<ControlResponse, ControlError>>,
}

/// Handle to the primary control queue.
///
/// Cloneable; the sideband channel holds one and forwards recognized
/// requests through it so configuration state has a single owner.
#[derive(Clone)]
pub struct ControlQueueHandle {
    tx: mpsc::Sender<QueuedControl>,
}

impl ControlQueueHandle {
    /// Submits a request and awaits its completion.
    ///
    /// # Errors
    ///
    /// [`ControlError::QueueClosed`] if the queue worker is gone; otherwise
    /// whatever the multiplexer produced.
    pub async fn submit(&self, request: ControlRequest) -> Result<ControlResponse, ControlError> {
        let (completion, rx) = oneshot::channel();
        self.tx
            .send(QueuedControl {
                request,
                completion,
            })
            .await
            .map_err(|_| ControlError::QueueClosed)?;
        rx.await.map_err(|_| ControlError::QueueClosed)?
    }

    /// Forwards an already-queued request, completion and all.
    ///
    /// On failure the request is handed back so the caller can complete it.
    pub(crate) async fn forward(&self, queued: QueuedControl) -> Result<(), QueuedControl> {
        self.tx.send(queued).await.map_err(|err| err.0)
    }
}

/// Spawns the primary control queue worker.
///
/// Each queued request is dispatched on its own task. Serializing here
/// would let one slow request stall the queue the sideband forwards into,
/// so the queue deliberately dispatches concurrently.
pub fn spawn_control_queue(multiplexer: Arc<DispatchMultiplexer>) -> ControlQueueHandle {
    let (tx, mut rx) = mpsc::channel::<QueuedControl>(CONTROL_QUEUE_DEPTH);
    tokio::spawn(async move {
        while let Some(queued) = rx.recv().await {
            let multiplexer = Arc::clone(&multiplexer);
            tokio::spawn(async move {
                let result = multiplexer.dispatch_control(queued.request);
                if queued.completion.send(result).is_err() {
                    warn!("control request completed after its caller went away");
                }
            });
        }
        trace!("primary control queue drained");
    });
    ControlQueueHandle { tx }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
