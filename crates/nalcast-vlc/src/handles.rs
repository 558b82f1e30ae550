//! Non-null wrappers for libVLC object pointers.
//!
//! Handles are resolved by whoever owns the objects (a Java `VLCObject`, a
//! desktop [`Player`](crate::player::Player)) and passed in already resolved.
//! Wrapping them here only records that they are non-null; it does not take
//! a reference.

use std::ptr::NonNull;

use crate::error::ActivationError;
use crate::ffi::{libvlc_instance_t, libvlc_media_player_t, libvlc_media_t, libvlc_renderer_item_t};

macro_rules! native_handle {
    ($(#[$doc:meta])* $name:ident => $raw:ty, $label:literal) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub struct $name(NonNull<$raw>);

        impl $name {
            /// Wrap a raw pointer. `None` if it is null.
            ///
            /// # Safety
            ///
            /// A non-null `ptr` must point to a live object of this type for
            /// as long as the handle is used.
            pub unsafe fn from_raw(ptr: *mut $raw) -> Option<Self> {
                NonNull::new(ptr).map(Self)
            }

            /// Wrap a pointer carried as an integer (a JNI `long`).
            ///
            /// # Safety
            ///
            /// Same as [`Self::from_raw`].
            pub unsafe fn from_address(address: i64) -> Result<Self, ActivationError> {
                Self::from_raw(address as usize as *mut $raw)
                    .ok_or(ActivationError::NullHandle($label))
            }

            pub fn as_ptr(self) -> *mut $raw {
                self.0.as_ptr()
            }
        }
    };
}

native_handle!(
    /// A `libvlc_instance_t`.
    InstanceHandle => libvlc_instance_t, "instance"
);
native_handle!(
    /// A `libvlc_media_player_t`.
    PlayerHandle => libvlc_media_player_t, "player"
);
native_handle!(
    /// A `libvlc_renderer_item_t`.
    RendererHandle => libvlc_renderer_item_t, "renderer"
);
native_handle!(
    /// A `libvlc_media_t`.
    MediaHandle => libvlc_media_t, "media"
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_address_is_rejected() {
        let err = unsafe { PlayerHandle::from_address(0) }.unwrap_err();
        assert!(matches!(err, ActivationError::NullHandle("player")));
    }

    #[test]
    fn address_round_trips() {
        let handle = unsafe { RendererHandle::from_address(0x1000) }.unwrap();
        assert_eq!(handle.as_ptr() as usize, 0x1000);
    }
}
