//! C-ABI trampolines that forward libVLC's media callbacks to a [`ByteSource`].
//!
//! The source is boxed and handed to libVLC as the callback opaque. From then
//! on libVLC owns it: `close` is the only place it is freed. If media creation
//! fails before libVLC takes it, the activation path reclaims the box itself.
//!
//! Panics never cross the C boundary; they are caught and mapped to the
//! callback's failure code.

use std::ffi::{c_int, c_uchar, c_void};
use std::panic::{self, AssertUnwindSafe};

use nalcast_source::ByteSource;
use tracing::{error, warn};

use crate::ffi::{
    libvlc_media_close_cb, libvlc_media_open_cb, libvlc_media_read_cb, libvlc_media_seek_cb,
};

/// The four callbacks monomorphized for one source type.
#[derive(Clone, Copy)]
pub struct CallbackTable {
    pub open: libvlc_media_open_cb,
    pub read: libvlc_media_read_cb,
    pub seek: libvlc_media_seek_cb,
    pub close: libvlc_media_close_cb,
}

impl CallbackTable {
    pub fn for_source<S: ByteSource>() -> Self {
        Self {
            open: open_cb::<S>,
            read: read_cb::<S>,
            seek: seek_cb::<S>,
            close: close_cb::<S>,
        }
    }
}

impl std::fmt::Debug for CallbackTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallbackTable").finish_non_exhaustive()
    }
}

/// Move `source` to the heap and return it as a callback opaque.
pub fn into_opaque<S: ByteSource>(source: S) -> *mut c_void {
    Box::into_raw(Box::new(source)).cast()
}

/// Take back a source produced by [`into_opaque`].
///
/// # Safety
///
/// `opaque` must come from `into_opaque::<S>` and must not have been
/// reclaimed or passed to `close` already.
pub unsafe fn reclaim<S: ByteSource>(opaque: *mut c_void) -> Box<S> {
    Box::from_raw(opaque.cast::<S>())
}

fn guarded<T>(callback: &'static str, fallback: T, f: impl FnOnce() -> T) -> T {
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(value) => value,
        Err(_) => {
            error!(callback, "Byte source panicked inside media callback");
            fallback
        }
    }
}

/// # Safety
///
/// `opaque` is null or a live source from [`into_opaque::<S>`]; `datap` and
/// `sizep` are valid for writes.
pub unsafe extern "C" fn open_cb<S: ByteSource>(
    opaque: *mut c_void,
    datap: *mut *mut c_void,
    sizep: *mut u64,
) -> c_int {
    let Some(source) = opaque.cast::<S>().as_mut() else {
        error!("open callback received a null source");
        return -1;
    };

    guarded("open", -1, || match source.open() {
        Ok(size) => {
            if !datap.is_null() {
                *datap = opaque;
            }
            if !sizep.is_null() {
                *sizep = size.as_u64();
            }
            0
        }
        Err(e) => {
            error!(error = %e, "Byte source open failed");
            -1
        }
    })
}

/// # Safety
///
/// `opaque` is null or a live source; `buf` is null or valid for `len` bytes.
pub unsafe extern "C" fn read_cb<S: ByteSource>(
    opaque: *mut c_void,
    buf: *mut c_uchar,
    len: usize,
) -> isize {
    let Some(source) = opaque.cast::<S>().as_mut() else {
        error!("read callback received a null source");
        return -1;
    };
    if len == 0 {
        return 0;
    }
    if buf.is_null() {
        error!(len, "read callback received a null buffer");
        return -1;
    }

    let out = std::slice::from_raw_parts_mut(buf, len);
    guarded("read", -1, || match source.read(out) {
        Ok(n) => isize::try_from(n).unwrap_or(isize::MAX),
        Err(e) => {
            error!(error = %e, "Byte source read failed");
            -1
        }
    })
}

/// # Safety
///
/// `opaque` is null or a live source.
pub unsafe extern "C" fn seek_cb<S: ByteSource>(opaque: *mut c_void, offset: u64) -> c_int {
    let Some(source) = opaque.cast::<S>().as_mut() else {
        error!("seek callback received a null source");
        return -1;
    };

    guarded("seek", -1, || match source.seek(offset) {
        Ok(()) => 0,
        Err(e) => {
            warn!(offset, error = %e, "Byte source seek refused");
            -1
        }
    })
}

/// Close and free the source. The opaque is dangling afterwards.
///
/// # Safety
///
/// `opaque` is null or a live source that no other callback is using.
pub unsafe extern "C" fn close_cb<S: ByteSource>(opaque: *mut c_void) {
    if opaque.is_null() {
        warn!("close callback received a null source");
        return;
    }
    let mut source = reclaim::<S>(opaque);
    guarded("close", (), || source.close());
    guarded("drop", (), move || drop(source));
}

#[cfg(test)]
mod tests {
    use std::ptr;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use nalcast_source::{SourceError, StreamSize};

    use super::*;

    #[derive(Default)]
    struct Counters {
        closes: AtomicUsize,
        drops: AtomicUsize,
    }

    struct Fixed {
        data: Vec<u8>,
        counters: Arc<Counters>,
        panic_on_read: bool,
    }

    impl ByteSource for Fixed {
        fn open(&mut self) -> nalcast_source::Result<StreamSize> {
            Ok(StreamSize::Unbounded)
        }

        fn read(&mut self, buf: &mut [u8]) -> nalcast_source::Result<usize> {
            if self.panic_on_read {
                panic!("boom");
            }
            let n = buf.len().min(self.data.len());
            buf[..n].copy_from_slice(&self.data[..n]);
            self.data.drain(..n);
            Ok(n)
        }

        fn seek(&mut self, offset: u64) -> nalcast_source::Result<()> {
            Err(SourceError::NotSeekable(offset))
        }

        fn close(&mut self) {
            self.counters.closes.fetch_add(1, Ordering::SeqCst);
        }
    }

    impl Drop for Fixed {
        fn drop(&mut self) {
            self.counters.drops.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn fixed(data: &[u8], panic_on_read: bool) -> (Arc<Counters>, *mut c_void) {
        let counters = Arc::new(Counters::default());
        let opaque = into_opaque(Fixed {
            data: data.to_vec(),
            counters: counters.clone(),
            panic_on_read,
        });
        (counters, opaque)
    }

    #[test]
    fn open_reports_unbounded_size_and_forwards_opaque() {
        let (counters, opaque) = fixed(b"abc", false);
        let table = CallbackTable::for_source::<Fixed>();

        let mut data: *mut c_void = ptr::null_mut();
        let mut size = 0u64;
        let rc = unsafe { (table.open)(opaque, &mut data, &mut size) };

        assert_eq!(rc, 0);
        assert_eq!(data, opaque);
        assert_eq!(size, u64::MAX);

        unsafe { (table.close)(data) };
        assert_eq!(counters.closes.load(Ordering::SeqCst), 1);
        assert_eq!(counters.drops.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn read_copies_and_seek_fails() {
        let (_, opaque) = fixed(b"abcdef", false);
        let table = CallbackTable::for_source::<Fixed>();

        let mut buf = [0u8; 4];
        let n = unsafe { (table.read)(opaque, buf.as_mut_ptr(), buf.len()) };
        assert_eq!(n, 4);
        assert_eq!(&buf, b"abcd");

        assert_eq!(unsafe { (table.seek)(opaque, 0) }, -1);
        assert_eq!(unsafe { (table.read)(opaque, buf.as_mut_ptr(), 0) }, 0);

        unsafe { (table.close)(opaque) };
    }

    #[test]
    fn panics_become_error_codes() {
        let (counters, opaque) = fixed(b"abc", true);
        let table = CallbackTable::for_source::<Fixed>();

        let mut buf = [0u8; 4];
        let n = unsafe { (table.read)(opaque, buf.as_mut_ptr(), buf.len()) };
        assert_eq!(n, -1);

        unsafe { (table.close)(opaque) };
        assert_eq!(counters.drops.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn null_opaque_is_rejected() {
        let table = CallbackTable::for_source::<Fixed>();
        let mut buf = [0u8; 4];
        assert_eq!(
            unsafe { (table.read)(ptr::null_mut(), buf.as_mut_ptr(), 4) },
            -1
        );
        assert_eq!(unsafe { (table.seek)(ptr::null_mut(), 0) }, -1);
        unsafe { (table.close)(ptr::null_mut()) };
    }
}
