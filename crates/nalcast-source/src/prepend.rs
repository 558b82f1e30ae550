//! One-shot parameter-set prefix.
//!
//! Holds the SPS/PPS bytes captured when the session opens and hands them to
//! the decoder ahead of any frame data, split across as many reads as the
//! decoder's buffer size requires.

use bytes::Bytes;

use crate::error::PayloadError;
use crate::handle::HostHandle;

/// A parameter-set payload held by the host until the session opens.
///
/// `C` is the per-thread context produced by the session's binder.
pub trait ParamSetSource<C>: HostHandle {
    /// Copy the payload out of the host.
    fn copy_bytes(&self, cx: &mut C) -> Result<Vec<u8>, PayloadError>;
}

impl<C> ParamSetSource<C> for Bytes {
    fn copy_bytes(&self, _cx: &mut C) -> Result<Vec<u8>, PayloadError> {
        Ok(self.to_vec())
    }
}

/// Parameter-set bytes and a delivery cursor.
#[derive(Debug, Default)]
pub struct PrependBuffer {
    data: Vec<u8>,
    offset: usize,
}

impl PrependBuffer {
    /// A buffer that is exhausted from the first read.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Copy `bytes` into an owned buffer.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self {
            data: bytes.to_vec(),
            offset: 0,
        }
    }

    /// Total payload length.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// True if no payload was supplied.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Bytes not yet delivered.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.offset
    }

    /// True once every byte has been delivered.
    pub fn is_done(&self) -> bool {
        self.offset == self.data.len()
    }

    /// Copy up to `buf.len()` pending bytes into `buf`, returning the count.
    pub fn fill(&mut self, buf: &mut [u8]) -> usize {
        let n = buf.len().min(self.remaining());
        buf[..n].copy_from_slice(&self.data[self.offset..self.offset + n]);
        self.offset += n;
        n
    }

    /// Drop the payload. The buffer reads as done afterwards.
    pub fn clear(&mut self) {
        self.data = Vec::new();
        self.offset = 0;
    }
}

impl From<Vec<u8>> for PrependBuffer {
    fn from(data: Vec<u8>) -> Self {
        Self { data, offset: 0 }
    }
}
