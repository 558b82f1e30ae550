//! The slice of libVLC that activation depends on.
//!
//! [`LibVlc`] is the production implementation. Tests substitute a recording
//! backend that drives the callbacks the way libVLC would.

use std::ffi::{c_int, c_void, CStr};

use crate::callbacks::CallbackTable;
use crate::ffi::LibVlc;
use crate::handles::{InstanceHandle, MediaHandle, PlayerHandle, RendererHandle};

pub trait MediaBackend {
    /// Create a media that pulls its bytes through `callbacks`.
    ///
    /// # Safety
    ///
    /// `opaque` must stay valid until the backend invokes `callbacks.close`
    /// with it. On `None` the backend must not have retained `opaque`.
    unsafe fn media_new_callbacks(
        &self,
        instance: InstanceHandle,
        callbacks: &CallbackTable,
        opaque: *mut c_void,
    ) -> Option<MediaHandle>;

    fn media_add_option(&self, media: MediaHandle, option: &CStr);

    fn media_release(&self, media: MediaHandle);

    /// Attach `media`. The player takes its own reference.
    fn player_set_media(&self, player: PlayerHandle, media: MediaHandle);

    fn player_set_renderer(&self, player: PlayerHandle, renderer: RendererHandle) -> c_int;

    fn player_play(&self, player: PlayerHandle) -> c_int;
}

impl MediaBackend for LibVlc {
    unsafe fn media_new_callbacks(
        &self,
        instance: InstanceHandle,
        callbacks: &CallbackTable,
        opaque: *mut c_void,
    ) -> Option<MediaHandle> {
        let media = (self.media_new_callbacks)(
            instance.as_ptr(),
            Some(callbacks.open),
            Some(callbacks.read),
            Some(callbacks.seek),
            Some(callbacks.close),
            opaque,
        );
        MediaHandle::from_raw(media)
    }

    fn media_add_option(&self, media: MediaHandle, option: &CStr) {
        // SAFETY: handles are non-null and live by construction; libVLC
        // copies the option string.
        unsafe { (self.media_add_option)(media.as_ptr(), option.as_ptr()) }
    }

    fn media_release(&self, media: MediaHandle) {
        // SAFETY: see media_add_option.
        unsafe { (self.media_release)(media.as_ptr()) }
    }

    fn player_set_media(&self, player: PlayerHandle, media: MediaHandle) {
        // SAFETY: see media_add_option.
        unsafe { (self.player_set_media)(player.as_ptr(), media.as_ptr()) }
    }

    fn player_set_renderer(&self, player: PlayerHandle, renderer: RendererHandle) -> c_int {
        // SAFETY: see media_add_option.
        unsafe { (self.player_set_renderer)(player.as_ptr(), renderer.as_ptr()) }
    }

    fn player_play(&self, player: PlayerHandle) -> c_int {
        // SAFETY: see media_add_option.
        unsafe { (self.player_play)(player.as_ptr()) }
    }
}
