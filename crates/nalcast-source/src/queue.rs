//! Timeout-bounded pulls from the NAL unit queue.
//!
//! The producer (capture and encode) pushes one NAL unit per queue element.
//! The read path is the only consumer. [`QueueAdapter`] turns the queue's
//! `poll(timeout)` into a [`Pull`]: an item, or nothing within the wait.
//! It never retries; the decoder calls `read` again after an empty pull.

use std::time::Duration;

use bytes::Bytes;
use crossbeam_channel::{Receiver, RecvTimeoutError, SendTimeoutError, Sender, TrySendError};

use crate::error::QueueError;
use crate::handle::{HostHandle, Owned};

/// A blocking queue of NAL unit payloads owned by the host.
///
/// `C` is the per-thread context produced by the session's binder.
pub trait NalQueue<C>: HostHandle {
    /// Wait up to `timeout` for the next item. `Ok(None)` means the wait
    /// elapsed with nothing to deliver.
    fn poll(&self, cx: &mut C, timeout: Duration) -> Result<Option<Bytes>, QueueError>;
}

/// Outcome of a single pull.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Pull {
    Item(Bytes),
    Empty,
}

/// Owns the queue handle and applies the configured wait.
#[derive(Debug)]
pub struct QueueAdapter<Q: HostHandle> {
    queue: Owned<Q>,
    timeout: Duration,
}

impl<Q: HostHandle> QueueAdapter<Q> {
    pub fn new(queue: Q, timeout: Duration) -> Self {
        Self::from_owned(Owned::new("nal_queue", queue), timeout)
    }

    /// Adopt a handle already guarded by the caller.
    pub fn from_owned(queue: Owned<Q>, timeout: Duration) -> Self {
        Self { queue, timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Wait once for the next NAL unit.
    pub fn pull<C>(&self, cx: &mut C) -> Result<Pull, QueueError>
    where
        Q: NalQueue<C>,
    {
        let queue = self
            .queue
            .get()
            .ok_or(QueueError::MissingCapability("nal_queue"))?;

        match queue.poll(cx, self.timeout)? {
            Some(item) => Ok(Pull::Item(item)),
            None => Ok(Pull::Empty),
        }
    }

    /// Give the queue reference back to the host.
    pub fn release(&mut self) {
        self.queue.release();
    }

    pub fn is_held(&self) -> bool {
        self.queue.is_held()
    }
}

/// Create an in-process bounded NAL queue.
///
/// The sender side is cloneable; any number of producers may push. The
/// receiving [`ChannelQueue`] is handed to a single session.
pub fn nal_channel(capacity: usize) -> (NalSender, ChannelQueue) {
    let (tx, rx) = crossbeam_channel::bounded(capacity);
    (NalSender { tx, capacity }, ChannelQueue { rx })
}

/// Producer half of [`nal_channel`].
#[derive(Debug, Clone)]
pub struct NalSender {
    tx: Sender<Bytes>,
    capacity: usize,
}

impl NalSender {
    /// Block until the item is queued.
    pub fn send(&self, item: Bytes) -> Result<(), QueueError> {
        self.tx.send(item).map_err(|_| QueueError::Disconnected)
    }

    /// Queue the item, waiting up to `timeout` for space. Returns `false`
    /// if the queue stayed full.
    pub fn offer(&self, item: Bytes, timeout: Duration) -> Result<bool, QueueError> {
        match self.tx.send_timeout(item, timeout) {
            Ok(()) => Ok(true),
            Err(SendTimeoutError::Timeout(_)) => Ok(false),
            Err(SendTimeoutError::Disconnected(_)) => Err(QueueError::Disconnected),
        }
    }

    /// Queue the item only if there is space right now.
    pub fn try_send(&self, item: Bytes) -> Result<bool, QueueError> {
        match self.tx.try_send(item) {
            Ok(()) => Ok(true),
            Err(TrySendError::Full(_)) => Ok(false),
            Err(TrySendError::Disconnected(_)) => Err(QueueError::Disconnected),
        }
    }

    pub fn len(&self) -> usize {
        self.tx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tx.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

/// Consumer half of [`nal_channel`].
#[derive(Debug)]
pub struct ChannelQueue {
    rx: Receiver<Bytes>,
}

impl HostHandle for ChannelQueue {
    fn release(self) {}
}

impl<C> NalQueue<C> for ChannelQueue {
    fn poll(&self, _cx: &mut C, timeout: Duration) -> Result<Option<Bytes>, QueueError> {
        match self.rx.recv_timeout(timeout) {
            Ok(item) => Ok(Some(item)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => Err(QueueError::Disconnected),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Instant;

    #[test]
    fn pull_times_out_empty() {
        let (_tx, rx) = nal_channel(4);
        let adapter = QueueAdapter::new(rx, Duration::from_millis(20));

        let start = Instant::now();
        assert_eq!(adapter.pull(&mut ()).unwrap(), Pull::Empty);
        assert!(start.elapsed() >= Duration::from_millis(20));
    }

    #[test]
    fn pull_returns_item_in_order() {
        let (tx, rx) = nal_channel(4);
        let adapter = QueueAdapter::new(rx, Duration::from_millis(50));

        tx.send(Bytes::from_static(b"one")).unwrap();
        tx.send(Bytes::from_static(b"two")).unwrap();

        assert_eq!(
            adapter.pull(&mut ()).unwrap(),
            Pull::Item(Bytes::from_static(b"one"))
        );
        assert_eq!(
            adapter.pull(&mut ()).unwrap(),
            Pull::Item(Bytes::from_static(b"two"))
        );
    }

    #[test]
    fn pull_wakes_when_item_arrives() {
        let (tx, rx) = nal_channel(4);
        let adapter = QueueAdapter::new(rx, Duration::from_secs(2));

        let producer = thread::spawn(move || {
            thread::sleep(Duration::from_millis(10));
            tx.send(Bytes::from_static(b"late")).unwrap();
        });

        assert_eq!(
            adapter.pull(&mut ()).unwrap(),
            Pull::Item(Bytes::from_static(b"late"))
        );
        producer.join().unwrap();
    }

    #[test]
    fn disconnected_producer_is_fatal() {
        let (tx, rx) = nal_channel(4);
        drop(tx);
        let adapter = QueueAdapter::new(rx, Duration::from_millis(10));
        assert!(matches!(
            adapter.pull(&mut ()),
            Err(QueueError::Disconnected)
        ));
    }

    #[test]
    fn released_queue_reports_missing_capability() {
        let (_tx, rx) = nal_channel(1);
        let mut adapter = QueueAdapter::new(rx, Duration::from_millis(10));
        adapter.release();
        assert!(!adapter.is_held());
        assert!(matches!(
            adapter.pull(&mut ()),
            Err(QueueError::MissingCapability(_))
        ));
    }

    #[test]
    fn offer_reports_full_queue() {
        let (tx, _rx) = nal_channel(1);
        assert!(tx.try_send(Bytes::from_static(b"a")).unwrap());
        assert!(!tx.try_send(Bytes::from_static(b"b")).unwrap());
        assert!(!tx
            .offer(Bytes::from_static(b"c"), Duration::from_millis(5))
            .unwrap());
        assert_eq!(tx.len(), 1);
        assert_eq!(tx.capacity(), 1);
    }
}
