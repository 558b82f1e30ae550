//! Raw FFI bindings for libVLC 3.x.
//!
//! The library is loaded at runtime via `libloading`, so nothing links
//! against libVLC at build time. Only the entry points needed to register a
//! callback media and drive a player are resolved.
//!
//! Reference: `vlc/libvlc_media.h`, `vlc/libvlc_media_player.h`.

#![allow(non_camel_case_types)]

use std::ffi::{c_char, c_int, c_uchar, c_void, CStr};
use std::path::Path;

use libloading::Library;
use tracing::{debug, info};

use crate::error::VlcLoadError;

/// Opaque `libvlc_instance_t`.
#[repr(C)]
pub struct libvlc_instance_t {
    _private: [u8; 0],
}

/// Opaque `libvlc_media_t`.
#[repr(C)]
pub struct libvlc_media_t {
    _private: [u8; 0],
}

/// Opaque `libvlc_media_player_t`.
#[repr(C)]
pub struct libvlc_media_player_t {
    _private: [u8; 0],
}

/// Opaque `libvlc_renderer_item_t`.
#[repr(C)]
pub struct libvlc_renderer_item_t {
    _private: [u8; 0],
}

// ---------------------------------------------------------------------------
// Callback media signatures
// ---------------------------------------------------------------------------

/// `libvlc_media_open_cb`: 0 on success, writes the per-stream opaque and size.
pub type libvlc_media_open_cb =
    unsafe extern "C" fn(opaque: *mut c_void, datap: *mut *mut c_void, sizep: *mut u64) -> c_int;

/// `libvlc_media_read_cb`: bytes written, 0 at end of stream, -1 on error.
pub type libvlc_media_read_cb =
    unsafe extern "C" fn(opaque: *mut c_void, buf: *mut c_uchar, len: usize) -> isize;

/// `libvlc_media_seek_cb`: 0 on success, -1 on error.
pub type libvlc_media_seek_cb = unsafe extern "C" fn(opaque: *mut c_void, offset: u64) -> c_int;

/// `libvlc_media_close_cb`.
pub type libvlc_media_close_cb = unsafe extern "C" fn(opaque: *mut c_void);

// ---------------------------------------------------------------------------
// Function table
// ---------------------------------------------------------------------------

type NewFn = unsafe extern "C" fn(argc: c_int, argv: *const *const c_char) -> *mut libvlc_instance_t;
type ReleaseFn = unsafe extern "C" fn(*mut libvlc_instance_t);
type GetVersionFn = unsafe extern "C" fn() -> *const c_char;
type MediaNewCallbacksFn = unsafe extern "C" fn(
    *mut libvlc_instance_t,
    Option<libvlc_media_open_cb>,
    Option<libvlc_media_read_cb>,
    Option<libvlc_media_seek_cb>,
    Option<libvlc_media_close_cb>,
    *mut c_void,
) -> *mut libvlc_media_t;
type MediaAddOptionFn = unsafe extern "C" fn(*mut libvlc_media_t, *const c_char);
type MediaReleaseFn = unsafe extern "C" fn(*mut libvlc_media_t);
type PlayerNewFn = unsafe extern "C" fn(*mut libvlc_instance_t) -> *mut libvlc_media_player_t;
type PlayerReleaseFn = unsafe extern "C" fn(*mut libvlc_media_player_t);
type PlayerSetMediaFn = unsafe extern "C" fn(*mut libvlc_media_player_t, *mut libvlc_media_t);
type PlayerSetRendererFn =
    unsafe extern "C" fn(*mut libvlc_media_player_t, *mut libvlc_renderer_item_t) -> c_int;
type PlayerPlayFn = unsafe extern "C" fn(*mut libvlc_media_player_t) -> c_int;
type PlayerStopFn = unsafe extern "C" fn(*mut libvlc_media_player_t);
type PlayerIsPlayingFn = unsafe extern "C" fn(*mut libvlc_media_player_t) -> c_int;

/// Loaded libVLC function pointers.
///
/// The `Library` handle keeps the shared object mapped for as long as the
/// pointers are reachable.
pub struct LibVlc {
    pub(crate) new: NewFn,
    pub(crate) release: ReleaseFn,
    pub(crate) get_version: GetVersionFn,
    pub(crate) media_new_callbacks: MediaNewCallbacksFn,
    pub(crate) media_add_option: MediaAddOptionFn,
    pub(crate) media_release: MediaReleaseFn,
    pub(crate) player_new: PlayerNewFn,
    pub(crate) player_release: PlayerReleaseFn,
    pub(crate) player_set_media: PlayerSetMediaFn,
    pub(crate) player_set_renderer: PlayerSetRendererFn,
    pub(crate) player_play: PlayerPlayFn,
    pub(crate) player_stop: PlayerStopFn,
    pub(crate) player_is_playing: PlayerIsPlayingFn,
    _lib: Library,
}

// SAFETY: libVLC entry points are thread-safe per its API documentation, and
// the Library handle is only used to keep the object mapped.
unsafe impl Send for LibVlc {}
unsafe impl Sync for LibVlc {}

impl std::fmt::Debug for LibVlc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LibVlc")
            .field("version", &self.version())
            .finish_non_exhaustive()
    }
}

impl LibVlc {
    /// Candidate file names for the current platform, most specific first.
    pub fn library_names() -> &'static [&'static str] {
        if cfg!(target_os = "windows") {
            &["libvlc.dll"]
        } else if cfg!(target_os = "macos") {
            &["libvlc.dylib", "libvlc.5.dylib"]
        } else if cfg!(target_os = "android") {
            &["libvlc.so"]
        } else {
            &["libvlc.so.5", "libvlc.so"]
        }
    }

    /// Load libVLC from the system search path.
    pub fn load() -> Result<Self, VlcLoadError> {
        let mut last_error = String::new();

        for name in Self::library_names() {
            debug!(library = %name, "Trying to load libVLC");
            // SAFETY: libVLC's initialisers only register modules; loading it
            // has no side effects on this process beyond that.
            match unsafe { Library::new(name) } {
                Ok(lib) => {
                    let vlc = Self::load_functions(lib)?;
                    info!(library = %name, version = %vlc.version(), "Loaded libVLC");
                    return Ok(vlc);
                }
                Err(e) => last_error = format!("{name}: {e}"),
            }
        }

        Err(VlcLoadError::LibraryNotFound(format!(
            "{last_error}. Is VLC installed?"
        )))
    }

    /// Load libVLC from an explicit path.
    pub fn load_from(path: &Path) -> Result<Self, VlcLoadError> {
        info!(path = %path.display(), "Loading libVLC from custom path");

        // SAFETY: the caller asserts `path` is a libVLC build.
        let lib = unsafe { Library::new(path) }.map_err(|e| {
            VlcLoadError::LibraryNotFound(format!("Failed to load {}: {e}", path.display()))
        })?;

        Self::load_functions(lib)
    }

    fn load_functions(lib: Library) -> Result<Self, VlcLoadError> {
        // SAFETY: each symbol is resolved with the signature declared in the
        // libVLC 3.x headers.
        unsafe {
            Ok(Self {
                new: symbol(&lib, b"libvlc_new\0")?,
                release: symbol(&lib, b"libvlc_release\0")?,
                get_version: symbol(&lib, b"libvlc_get_version\0")?,
                media_new_callbacks: symbol(&lib, b"libvlc_media_new_callbacks\0")?,
                media_add_option: symbol(&lib, b"libvlc_media_add_option\0")?,
                media_release: symbol(&lib, b"libvlc_media_release\0")?,
                player_new: symbol(&lib, b"libvlc_media_player_new\0")?,
                player_release: symbol(&lib, b"libvlc_media_player_release\0")?,
                player_set_media: symbol(&lib, b"libvlc_media_player_set_media\0")?,
                player_set_renderer: symbol(&lib, b"libvlc_media_player_set_renderer\0")?,
                player_play: symbol(&lib, b"libvlc_media_player_play\0")?,
                player_stop: symbol(&lib, b"libvlc_media_player_stop\0")?,
                player_is_playing: symbol(&lib, b"libvlc_media_player_is_playing\0")?,
                _lib: lib,
            })
        }
    }

    /// The version string reported by the loaded library.
    pub fn version(&self) -> String {
        // SAFETY: libvlc_get_version returns a static NUL-terminated string.
        unsafe {
            let ptr = (self.get_version)();
            if ptr.is_null() {
                return "unknown".to_string();
            }
            CStr::from_ptr(ptr).to_string_lossy().into_owned()
        }
    }
}

/// Resolve `name` and copy the function pointer out of the symbol.
///
/// # Safety
///
/// `T` must match the symbol's actual signature.
unsafe fn symbol<T: Copy>(lib: &Library, name: &'static [u8]) -> Result<T, VlcLoadError> {
    lib.get::<T>(name).map(|sym| *sym).map_err(|e| {
        let printable = String::from_utf8_lossy(&name[..name.len().saturating_sub(1)]);
        VlcLoadError::SymbolNotFound(format!("{printable}: {e}"))
    })
}
