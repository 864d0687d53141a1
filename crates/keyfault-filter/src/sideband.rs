//! The sideband control channel.
//!
//! A control-only endpoint created once per filter attachment, so external
//! tooling can retune the corruption parameters without ever contending
//! with the keyboard data queue. The channel does not process recognized
//! configuration codes itself – it forwards them, completion and all, into
//! the primary control queue, which keeps the filter state behind a single
//! owner. Everything else completes immediately with success and zero
//! output bytes so generic enumeration probes against the endpoint do not
//! fail loudly.
//!
//! Unlike the primary queue, the sideband queue is strictly sequential:
//! control traffic is low-volume and processing one request at a time keeps
//! reconfiguration ordering predictable.

use std::sync::atomic::{AtomicU32, Ordering};

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, trace};

use keyfault_core::ControlCode;

use crate::dispatch::{
    ControlError, ControlQueueHandle, ControlRequest, ControlResponse, QueuedControl,
};

/// Capacity of the sideband queue.
const SIDEBAND_QUEUE_DEPTH: usize = 16;

/// Process-wide attachment counter; the first channel is instance 1.
static INSTANCE_SEQ: AtomicU32 = AtomicU32::new(0);

/// The secondary, control-only device endpoint.
pub struct SidebandChannel {
    instance_no: u32,
    identity: String,
    tx: mpsc::Sender<QueuedControl>,
}

impl SidebandChannel {
    /// Creates the channel and spawns its sequential queue worker.
    ///
    /// `parent` is the primary control queue of the pipeline this channel
    /// configures. Must be called from within a tokio runtime.
    pub fn create(parent: ControlQueueHandle) -> Self {
        let instance_no = INSTANCE_SEQ.fetch_add(1, Ordering::Relaxed) + 1;
        let identity = format!("keyboard-fault-filter-{instance_no:02}");

        let (tx, mut rx) = mpsc::channel::<QueuedControl>(SIDEBAND_QUEUE_DEPTH);
        let worker_identity = identity.clone();
        tokio::spawn(async move {
            // One request at a time; a request leaves this queue either by
            // being forwarded to the parent or by completing right here.
            while let Some(queued) = rx.recv().await {
                match ControlCode::try_from(queued.request.code) {
                    Ok(code) => {
                        trace!("{worker_identity}: forwarding {code:?} to the primary queue");
                        if let Err(returned) = parent.forward(queued).await {
                            let _ = returned.completion.send(Err(ControlError::QueueClosed));
                        }
                    }
                    Err(()) => {
                        trace!(
                            "{worker_identity}: completing probe 0x{:04X} with empty success",
                            queued.request.code
                        );
                        let _ = queued.completion.send(Ok(ControlResponse::empty()));
                    }
                }
            }
            trace!("{worker_identity}: sideband queue drained");
        });

        debug!("sideband channel {identity} created");
        Self {
            instance_no,
            identity,
            tx,
        }
    }

    /// The strictly increasing attachment number this channel was tagged
    /// with.
    pub fn instance_no(&self) -> u32 {
        self.instance_no
    }

    /// The published textual identity external tooling discovers.
    pub fn identity(&self) -> &str {
        &self.identity
    }

    /// Submits a control request on behalf of external tooling and awaits
    /// its completion.
    ///
    /// # Errors
    ///
    /// [`ControlError::QueueClosed`] when the channel or its parent queue
    /// has shut down; otherwise whatever the primary multiplexer produced.
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
}

// ── Tests ─────────────────────────────────────────────────────────────────────
