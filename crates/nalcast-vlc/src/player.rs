//! Owned libVLC instance and player for hosts that create their own.
//!
//! On Android the instance and player belong to the Java side; desktop hosts
//! use these wrappers instead.

use std::ffi::{c_char, c_int, CString};
use std::ptr;

use tracing::debug;

use crate::error::ActivationError;
use crate::ffi::LibVlc;
use crate::handles::{InstanceHandle, PlayerHandle};

/// A `libvlc_instance_t` released on drop.
pub struct Instance<'lib> {
    lib: &'lib LibVlc,
    handle: InstanceHandle,
}

impl<'lib> Instance<'lib> {
    /// Create an instance with the given command-line style arguments.
    pub fn new(lib: &'lib LibVlc, args: &[String]) -> Result<Self, ActivationError> {
        let args = args
            .iter()
            .map(|a| CString::new(a.as_str()).map_err(|_| ActivationError::InvalidOption(a.clone())))
            .collect::<Result<Vec<_>, _>>()?;
        let argv: Vec<*const c_char> = args.iter().map(|a| a.as_ptr()).collect();
        let argc = c_int::try_from(argv.len()).map_err(|_| ActivationError::InstanceCreation)?;

        let argv_ptr = if argv.is_empty() {
            ptr::null()
        } else {
            argv.as_ptr()
        };

        // SAFETY: argv holds argc valid C strings that outlive the call.
        let raw = unsafe { (lib.new)(argc, argv_ptr) };
        // SAFETY: a non-null result is a fresh instance we own.
        let handle =
            unsafe { InstanceHandle::from_raw(raw) }.ok_or(ActivationError::InstanceCreation)?;

        debug!(args = argc, "Created libVLC instance");
        Ok(Self { lib, handle })
    }

    pub fn handle(&self) -> InstanceHandle {
        self.handle
    }

    pub fn lib(&self) -> &'lib LibVlc {
        self.lib
    }
}

impl Drop for Instance<'_> {
    fn drop(&mut self) {
        // SAFETY: we hold the only reference taken by Instance::new.
        unsafe { (self.lib.release)(self.handle.as_ptr()) }
    }
}

/// A `libvlc_media_player_t` stopped and released on drop.
pub struct Player<'lib> {
    lib: &'lib LibVlc,
    handle: PlayerHandle,
}

impl<'lib> Player<'lib> {
    pub fn new(instance: &Instance<'lib>) -> Result<Self, ActivationError> {
        let lib = instance.lib();
        // SAFETY: the instance handle is live for the borrow.
        let raw = unsafe { (lib.player_new)(instance.handle().as_ptr()) };
        // SAFETY: a non-null result is a fresh player we own.
        let handle =
            unsafe { PlayerHandle::from_raw(raw) }.ok_or(ActivationError::PlayerCreation)?;
        Ok(Self { lib, handle })
    }

    pub fn handle(&self) -> PlayerHandle {
        self.handle
    }

    pub fn is_playing(&self) -> bool {
        // SAFETY: handle is live until drop.
        unsafe { (self.lib.player_is_playing)(self.handle.as_ptr()) != 0 }
    }

    /// Stop playback. Closes the current media's byte source.
    pub fn stop(&self) {
        // SAFETY: handle is live until drop.
        unsafe { (self.lib.player_stop)(self.handle.as_ptr()) }
    }
}

impl Drop for Player<'_> {
    fn drop(&mut self) {
        self.stop();
        // SAFETY: we hold the only reference taken by Player::new.
        unsafe { (self.lib.player_release)(self.handle.as_ptr()) }
    }
}
