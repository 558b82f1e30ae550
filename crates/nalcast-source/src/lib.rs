//! Nalcast-Source: a pull-based byte source over a live queue of H.264 NAL units
//!
//! Decoders that accept custom inputs (libVLC's callback media, for one) pull
//! bytes through four callbacks: open, read, seek and close. This crate
//! implements that contract on top of a producer-filled queue so a live,
//! in-process encoder can be played without a file or socket in between.
//!
//! # Modules
//!
//! - `session` - the open/read/seek/close state machine and handle ownership
//! - `prepend` - one-shot SPS/PPS prefix delivered before any frame
//! - `queue` - timeout-bounded pulls, plus an in-process bounded channel
//! - `binder` - per-callback host-runtime binding and the process-wide runtime cell
//! - `handle` - exactly-once release of host references
//! - `nal` - Annex-B splitting and parameter-set capture for producers
//! - `options` - session tunables
//!
//! # Example
//!
//! ```rust
//! use bytes::Bytes;
//! use nalcast_source::{nal_channel, ByteSource, Session, SourceOptions};
//!
//! let (tx, rx) = nal_channel(16);
//! let mut session = Session::in_process(rx, None, SourceOptions::default());
//!
//! tx.send(Bytes::from_static(&[0, 0, 0, 1, 0x65, 0x88])).unwrap();
//! session.open().unwrap();
//!
//! let mut buf = [0u8; 1500];
//! assert_eq!(session.read(&mut buf).unwrap(), 6);
//! session.close();
//! ```

pub mod binder;
pub mod error;
pub mod handle;
pub mod nal;
pub mod options;
pub mod prepend;
pub mod queue;
pub mod session;

pub use binder::{GlobalRuntime, InProcess, ThreadBinder};
pub use error::{BindError, NalError, PayloadError, QueueError, Result, SourceError};
pub use handle::{HostHandle, Owned};
pub use nal::{split_annex_b, with_start_code, NalUnit, NalUnitType, ParameterSets};
pub use options::{OversizePolicy, SourceOptions};
pub use prepend::{ParamSetSource, PrependBuffer};
pub use queue::{nal_channel, ChannelQueue, NalQueue, NalSender, Pull, QueueAdapter};
pub use session::{ByteSource, Session, SessionState, SessionStats, StreamSize};
