//! Error types for nalcast-source.

use thiserror::Error;

use crate::session::SessionState;

/// Result type for nalcast-source operations.
pub type Result<T> = std::result::Result<T, SourceError>;

/// Failure to obtain a host-runtime context for the calling thread.
#[derive(Debug, Error)]
pub enum BindError {
    /// The process-wide runtime handle was never initialised.
    #[error("Host runtime not initialised")]
    Uninitialized,

    /// The runtime refused to attach the current thread.
    #[error("Failed to attach thread to host runtime: {0}")]
    Attach(String),
}

/// Failure while waiting on the NAL queue.
#[derive(Debug, Error)]
pub enum QueueError {
    /// Every producer handle has been dropped; no item can ever arrive.
    #[error("NAL queue disconnected")]
    Disconnected,

    /// The host runtime signalled an error while polling.
    #[error("Host runtime error while polling: {0}")]
    Runtime(String),

    /// A capability the poll needs has already been released.
    #[error("Queue capability missing: {0}")]
    MissingCapability(&'static str),
}

/// Failure while copying the parameter-set payload out of the host runtime.
#[derive(Debug, Error)]
#[error("Failed to copy parameter-set payload: {0}")]
pub struct PayloadError(pub String);

/// Error type for the byte-source callbacks.
///
/// Every variant is fatal for the call that produced it. A queue timeout is
/// not an error and never shows up here.
#[derive(Debug, Error)]
pub enum SourceError {
    /// Thread binding failed before the callback could do any work.
    #[error(transparent)]
    Bind(#[from] BindError),

    /// Communication with the queue failed.
    #[error(transparent)]
    Queue(#[from] QueueError),

    /// The callback is not valid in the session's current state.
    #[error("Invalid call to {op} in state {state:?}")]
    InvalidState {
        op: &'static str,
        state: SessionState,
    },

    /// A queue item exceeded the configured size limit.
    #[error("NAL item of {len} bytes exceeds limit of {max} bytes")]
    OversizedItem { len: usize, max: usize },

    /// The source is live and has no random access.
    #[error("Source is not seekable (requested offset {0})")]
    NotSeekable(u64),
}

impl SourceError {
    pub(crate) fn invalid_state(op: &'static str, state: SessionState) -> Self {
        Self::InvalidState { op, state }
    }
}

/// Errors raised by the H.264 NAL helpers.
#[derive(Debug, Error)]
pub enum NalError {
    /// No start code was found in the input.
    #[error("No Annex-B start code found in {0} bytes of input")]
    NoStartCode(usize),

    /// A NAL header had its forbidden bit set.
    #[error("Forbidden zero bit set in NAL header at offset {0}")]
    ForbiddenBit(usize),
}
