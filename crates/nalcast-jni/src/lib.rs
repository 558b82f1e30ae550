//! Nalcast-JNI: feeds a libVLC player from a Java `BlockingQueue<byte[]>`
//!
//! Loaded into an Android app next to libVLC. `JNI_OnLoad` records the VM;
//! `nativeSetupCustomMediaAndPlay` builds a session over the app's NAL queue
//! and starts playback on the given player and renderer.

use std::ffi::c_void;
use std::panic::{self, AssertUnwindSafe};

use jni::objects::{JByteArray, JObject};
use jni::sys::{jboolean, jint, jlong, JNI_ERR, JNI_FALSE, JNI_TRUE, JNI_VERSION_1_6};
use jni::{JNIEnv, JavaVM};
use tracing::{error, info};

pub mod error;
pub mod refs;
pub mod runtime;
pub mod setup;

pub use error::SetupError;
pub use refs::{JavaPayload, JavaQueue, JavaRef};
pub use runtime::{JniBinder, RUNTIME};
pub use setup::{build_session, setup_custom_media_and_play, JavaSession, NativeHandles};

#[no_mangle]
pub extern "system" fn JNI_OnLoad(vm: *mut jni::sys::JavaVM, _reserved: *mut c_void) -> jint {
    info!("JNI_OnLoad called");
    // SAFETY: the JVM passes a valid invocation interface pointer.
    match unsafe { JavaVM::from_raw(vm) } {
        Ok(vm) => {
            RUNTIME.init(vm);
            JNI_VERSION_1_6
        }
        Err(e) => {
            error!(error = %e, "Invalid JavaVM pointer");
            JNI_ERR
        }
    }
}

/// `ScreenCastingService.nativeSetupCustomMediaAndPlay(long player,
/// long instance, ArrayBlockingQueue<byte[]> queue, byte[] spsPps,
/// long renderer): Boolean`
#[no_mangle]
pub extern "system" fn Java_home_screen_1to_1chromecast_casting_ScreenCastingService_nativeSetupCustomMediaAndPlay<
    'local,
>(
    mut env: JNIEnv<'local>,
    _this: JObject<'local>,
    player: jlong,
    instance: jlong,
    queue: JObject<'local>,
    sps_pps: JByteArray<'local>,
    renderer: jlong,
) -> jboolean {
    info!("nativeSetupCustomMediaAndPlay called");

    let handles = NativeHandles {
        player,
        instance,
        renderer,
    };
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        setup_custom_media_and_play(&mut env, handles, &queue, &sps_pps)
    }));

    match outcome {
        Ok(Ok(())) => JNI_TRUE,
        Ok(Err(e)) => {
            error!(error = %e, "nativeSetupCustomMediaAndPlay failed");
            JNI_FALSE
        }
        Err(_) => {
            error!("nativeSetupCustomMediaAndPlay panicked");
            JNI_FALSE
        }
    }
}
