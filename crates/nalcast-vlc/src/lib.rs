//! Nalcast-VLC: plays a nalcast byte source through libVLC
//!
//! libVLC is loaded at runtime, so this crate builds without VLC installed.
//! A [`ByteSource`](nalcast_source::ByteSource) is registered as a callback
//! media via [`setup_and_play`]; libVLC then owns it and frees it from its
//! close callback.
//!
//! # Modules
//!
//! - `ffi` - runtime-loaded libVLC function table
//! - `callbacks` - C-ABI open/read/seek/close trampolines
//! - `backend` - the media operations activation needs, as a trait
//! - `activate` - `setup_and_play`
//! - `options` - demuxer hints (`:demux=h264`, `:h264-fps=30`)
//! - `player` - owned instance and player for desktop hosts

pub mod activate;
pub mod backend;
pub mod callbacks;
pub mod error;
pub mod ffi;
pub mod handles;
pub mod options;
pub mod player;

pub use activate::{setup_and_play, PlaybackTarget};
pub use backend::MediaBackend;
pub use callbacks::CallbackTable;
pub use error::{ActivationError, VlcLoadError};
pub use ffi::LibVlc;
pub use handles::{InstanceHandle, MediaHandle, PlayerHandle, RendererHandle};
pub use options::DemuxOptions;
pub use player::{Instance, Player};
