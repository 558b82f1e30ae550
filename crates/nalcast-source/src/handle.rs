//! Ownership of references that live in the host runtime.
//!
//! A queue object, a parameter-set array or a time-unit constant held on
//! behalf of the decoder must be handed back to the host exactly once.
//! [`Owned`] guarantees that: it releases on [`Owned::release`], or on drop
//! when construction bails out early, and never both.

use std::fmt;

/// A reference into the host runtime that has to be given back.
pub trait HostHandle: Send {
    /// Return the reference to the host. Called at most once per handle.
    fn release(self);
}

/// Exclusive owner of a [`HostHandle`].
pub struct Owned<H: HostHandle> {
    inner: Option<H>,
    label: &'static str,
}

impl<H: HostHandle> Owned<H> {
    /// Take ownership of an acquired handle.
    pub fn new(label: &'static str, handle: H) -> Self {
        tracing::trace!(handle = label, "Acquired host handle");
        Self {
            inner: Some(handle),
            label,
        }
    }

    /// Borrow the handle. `None` once it has been released.
    pub fn get(&self) -> Option<&H> {
        self.inner.as_ref()
    }

    /// Whether the handle is still held.
    pub fn is_held(&self) -> bool {
        self.inner.is_some()
    }

    /// Release the handle now. Further calls are no-ops.
    pub fn release(&mut self) {
        if let Some(handle) = self.inner.take() {
            handle.release();
            tracing::trace!(handle = self.label, "Released host handle");
        }
    }

    /// Move the handle out without releasing it.
    pub fn take(mut self) -> Option<H> {
        self.inner.take()
    }
}

impl<H: HostHandle> Drop for Owned<H> {
    fn drop(&mut self) {
        self.release();
    }
}

impl<H: HostHandle> fmt::Debug for Owned<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Owned")
            .field("label", &self.label)
            .field("held", &self.is_held())
            .finish()
    }
}

/// In-process payloads need no host cooperation to release.
impl HostHandle for bytes::Bytes {
    fn release(self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct Counted(Arc<AtomicUsize>);

    impl HostHandle for Counted {
        fn release(self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn explicit_release_happens_once() {
        let released = Arc::new(AtomicUsize::new(0));
        let mut owned = Owned::new("counted", Counted(released.clone()));

        owned.release();
        owned.release();
        drop(owned);

        assert_eq!(released.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn drop_releases_on_early_return() {
        let released = Arc::new(AtomicUsize::new(0));

        fn acquire_then_fail(counter: Arc<AtomicUsize>) -> Result<(), &'static str> {
            let _queue = Owned::new("queue", Counted(counter));
            Err("method lookup failed")
        }

        assert!(acquire_then_fail(released.clone()).is_err());
        assert_eq!(released.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn take_transfers_without_release() {
        let released = Arc::new(AtomicUsize::new(0));
        let owned = Owned::new("counted", Counted(released.clone()));

        let raw = owned.take().unwrap();
        assert_eq!(released.load(Ordering::SeqCst), 0);

        raw.release();
        assert_eq!(released.load(Ordering::SeqCst), 1);
    }
}
