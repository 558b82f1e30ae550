//! The open/read/seek/close state machine behind a decoder byte source.
//!
//! A [`Session`] bundles every host handle the read path needs: the NAL
//! queue, the parameter-set payload and the thread binder. The decoder
//! drives it through the four [`ByteSource`] callbacks:
//!
//! ```text
//! Uninitialized --open--> Opened --close--> Closed
//!                          |  ^
//!                          read / seek
//! ```
//!
//! Reads deliver the parameter sets first, then one queue item at a time.
//! A queue wait that elapses is reported as a zero-byte read, never as an
//! error, so the decoder simply calls `read` again.

use bytes::{Buf, Bytes};
use tracing::{debug, error, info, trace, warn};

use crate::binder::{InProcess, ThreadBinder};
use crate::error::{Result, SourceError};
use crate::handle::{HostHandle, Owned};
use crate::options::{OversizePolicy, SourceOptions};
use crate::prepend::{ParamSetSource, PrependBuffer};
use crate::queue::{ChannelQueue, NalQueue, Pull, QueueAdapter};

/// Lifecycle state of a [`Session`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Uninitialized,
    Opened,
    Closed,
}

/// Stream length reported by `open`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamSize {
    /// Live source of unknown length.
    Unbounded,
}

impl StreamSize {
    /// The value written to the decoder's size out-parameter.
    pub fn as_u64(self) -> u64 {
        match self {
            StreamSize::Unbounded => u64::MAX,
        }
    }
}

/// The four-callback contract a decoder expects from a custom input.
pub trait ByteSource: Send {
    /// Prepare for reading and report the stream size.
    fn open(&mut self) -> Result<StreamSize>;

    /// Fill `buf` with up to `buf.len()` bytes and return the count.
    /// `Ok(0)` means nothing is available right now.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize>;

    /// Reposition the stream.
    fn seek(&mut self, offset: u64) -> Result<()>;

    /// Release everything the source holds. Idempotent.
    fn close(&mut self);
}

/// Counters kept over a session's lifetime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStats {
    /// Parameter-set bytes handed to the decoder.
    pub prepend_bytes: u64,
    /// Queue items pulled.
    pub items: u64,
    /// Queue item bytes handed to the decoder.
    pub item_bytes: u64,
    /// Pulls that timed out empty.
    pub timeouts: u64,
    /// Item bytes dropped under [`OversizePolicy::Truncate`].
    pub discarded_bytes: u64,
}

/// A single-shot byte source over a live NAL queue.
pub struct Session<B, Q, P = Bytes>
where
    Q: HostHandle,
    P: HostHandle,
{
    state: SessionState,
    binder: B,
    queue: QueueAdapter<Q>,
    payload: Option<Owned<P>>,
    prepend: PrependBuffer,
    pending: Bytes,
    options: SourceOptions,
    stats: SessionStats,
}

impl Session<InProcess, ChannelQueue, Bytes> {
    /// Session fed by an in-process [`nal_channel`](crate::queue::nal_channel).
    pub fn in_process(
        queue: ChannelQueue,
        param_sets: Option<Bytes>,
        options: SourceOptions,
    ) -> Self {
        Session::new(
            InProcess,
            Owned::new("nal_queue", queue),
            param_sets.map(|p| Owned::new("param_sets", p)),
            options,
        )
    }
}

impl<B, Q, P> Session<B, Q, P>
where
    B: ThreadBinder,
    Q: NalQueue<B::Context>,
    P: ParamSetSource<B::Context>,
{
    /// Assemble a session from already-acquired handles. Ownership of the
    /// handles passes to the session.
    pub fn new(
        binder: B,
        queue: Owned<Q>,
        payload: Option<Owned<P>>,
        options: SourceOptions,
    ) -> Self {
        Self {
            state: SessionState::Uninitialized,
            binder,
            queue: QueueAdapter::from_owned(queue, options.poll_timeout()),
            payload,
            prepend: PrependBuffer::empty(),
            pending: Bytes::new(),
            options,
            stats: SessionStats::default(),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn stats(&self) -> SessionStats {
        self.stats
    }

    pub fn options(&self) -> &SourceOptions {
        &self.options
    }

    /// Parameter-set bytes still waiting to be read.
    pub fn prepend_remaining(&self) -> usize {
        self.prepend.remaining()
    }

    /// Bytes of a partially delivered queue item held for the next read.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Copy the held item tail into `buf`.
    fn drain_pending(&mut self, buf: &mut [u8]) -> usize {
        let n = buf.len().min(self.pending.len());
        buf[..n].copy_from_slice(&self.pending[..n]);
        self.pending.advance(n);
        self.stats.item_bytes += n as u64;
        n
    }

    fn read_prepend(&mut self, buf: &mut [u8]) -> usize {
        let n = self.prepend.fill(buf);
        self.stats.prepend_bytes += n as u64;

        if self.prepend.is_done() {
            info!(total = self.prepend.len(), "Parameter sets fully delivered");
        } else {
            debug!(
                chunk = n,
                remaining = self.prepend.remaining(),
                "Parameter sets partially delivered"
            );
        }
        n
    }

    fn read_item(&mut self, item: Bytes, buf: &mut [u8]) -> Result<usize> {
        if item.len() > self.options.max_item_len {
            error!(
                len = item.len(),
                max = self.options.max_item_len,
                "Queue item exceeds size limit"
            );
            return Err(SourceError::OversizedItem {
                len: item.len(),
                max: self.options.max_item_len,
            });
        }

        self.stats.items += 1;
        self.pending = item;
        let n = self.drain_pending(buf);

        if !self.pending.is_empty() {
            match self.options.oversize {
                OversizePolicy::Retain => {
                    debug!(
                        delivered = n,
                        held = self.pending.len(),
                        "Item larger than read buffer, holding remainder"
                    );
                }
                OversizePolicy::Truncate => {
                    warn!(
                        delivered = n,
                        discarded = self.pending.len(),
                        "Item larger than read buffer, discarding remainder"
                    );
                    self.stats.discarded_bytes += self.pending.len() as u64;
                    self.pending = Bytes::new();
                }
            }
        }

        trace!(bytes = n, "Delivered queue item");
        Ok(n)
    }
}

impl<B, Q, P> ByteSource for Session<B, Q, P>
where
    B: ThreadBinder,
    Q: NalQueue<B::Context>,
    P: ParamSetSource<B::Context>,
{
    fn open(&mut self) -> Result<StreamSize> {
        if self.state != SessionState::Uninitialized {
            return Err(SourceError::invalid_state("open", self.state));
        }

        let mut cx = self.binder.bind().inspect_err(|e| {
            error!(error = %e, "open: failed to bind host runtime");
        })?;

        // The payload reference is only needed long enough to copy it.
        if let Some(mut payload) = self.payload.take() {
            if let Some(handle) = payload.get() {
                match handle.copy_bytes(&mut cx) {
                    Ok(bytes) => {
                        info!(len = bytes.len(), "Copied parameter sets");
                        self.prepend = PrependBuffer::from(bytes);
                    }
                    Err(e) => {
                        warn!(error = %e, "Continuing without parameter sets");
                    }
                }
            }
            payload.release();
        }

        self.pending = Bytes::new();
        self.state = SessionState::Opened;

        info!(
            prepend_len = self.prepend.len(),
            poll_timeout_ms = self.options.poll_timeout_ms,
            "Byte source opened"
        );
        Ok(StreamSize::Unbounded)
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        if self.state != SessionState::Opened {
            return Err(SourceError::invalid_state("read", self.state));
        }

        let mut cx = self.binder.bind().inspect_err(|e| {
            error!(error = %e, "read: failed to bind host runtime");
        })?;

        if !self.prepend.is_done() {
            return Ok(self.read_prepend(buf));
        }

        if !self.pending.is_empty() {
            let n = self.drain_pending(buf);
            trace!(bytes = n, held = self.pending.len(), "Delivered held item tail");
            return Ok(n);
        }

        let pull = self.queue.pull(&mut cx).inspect_err(|e| {
            error!(error = %e, "Polling NAL queue failed");
        })?;

        match pull {
            Pull::Empty => {
                self.stats.timeouts += 1;
                trace!(
                    timeout_ms = self.queue.timeout().as_millis() as u64,
                    "No NAL unit within wait"
                );
                Ok(0)
            }
            Pull::Item(item) => self.read_item(item, buf),
        }
    }

    fn seek(&mut self, offset: u64) -> Result<()> {
        debug!(offset, state = ?self.state, "Seek refused on live source");
        Err(SourceError::NotSeekable(offset))
    }

    fn close(&mut self) {
        if self.state == SessionState::Closed {
            return;
        }

        if let Err(e) = self.binder.bind() {
            warn!(error = %e, "close: failed to bind host runtime, releasing anyway");
        }

        self.queue.release();
        if let Some(mut payload) = self.payload.take() {
            payload.release();
        }
        self.prepend.clear();
        self.pending = Bytes::new();

        let previous = self.state;
        self.state = SessionState::Closed;

        info!(
            from = ?previous,
            prepend_bytes = self.stats.prepend_bytes,
            items = self.stats.items,
            item_bytes = self.stats.item_bytes,
            timeouts = self.stats.timeouts,
            discarded_bytes = self.stats.discarded_bytes,
            "Byte source closed"
        );
    }
}
