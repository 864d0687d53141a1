//! Port to the lower device layer.
//!
//! Every request the filter does not answer locally is forwarded through
//! [`LowerTarget`]. The production implementation wraps whatever transport
//! reaches the real device stack; tests use [`mock::MockLowerTarget`].
//!
//! Forwarded requests may complete on whichever task context the lower
//! layer finishes on; the filter neither cancels nor retries them, and an
//! error coming back is handed to the original caller verbatim.

use async_trait::async_trait;
use thiserror::Error;

pub mod mock;

/// Error surfaced by the lower device layer for a forwarded request.
///
/// Propagated unchanged through the dispatch layer – the filter never
/// translates or retries lower-layer failures.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LowerError {
    /// The device is not ready to accept requests.
    #[error("device not ready")]
    NotReady,
    /// The lower layer rejected the request.
    #[error("request rejected by lower layer: {0}")]
    Rejected(String),
    /// The transport to the device failed.
    #[error("transport failure: {0}")]
    Transport(String),
}

/// Trait abstracting the lower device layer a request is forwarded to.
///
/// `code` is the raw request code: the keyboard-class codes the filter
/// recognizes are forwarded with their [`KeyboardIoCode`] value, and codes
/// it does not recognize travel through untouched.
///
/// [`KeyboardIoCode`]: keyfault_core::KeyboardIoCode
#[async_trait]
pub trait LowerTarget: Send + Sync {
    /// Submits a request and resolves once the lower layer completes it.
    ///
    /// Returns the bytes the lower layer produced (up to `output_capacity`).
    ///
    /// # Errors
    ///
    /// Whatever the lower layer reports, verbatim.
    async fn submit(
        &self,
        code: u32,
        input: Vec<u8>,
        output_capacity: usize,
    ) -> Result<Vec<u8>, LowerError>;
}
