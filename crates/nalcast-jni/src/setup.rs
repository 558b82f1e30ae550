//! Building a JVM-backed session and handing it to the player.

use std::sync::OnceLock;

use jni::objects::{JByteArray, JObject};
use jni::JNIEnv;
use nalcast_source::{BindError, Owned, Session, SourceOptions};
use nalcast_vlc::{
    setup_and_play, DemuxOptions, InstanceHandle, LibVlc, PlaybackTarget, PlayerHandle,
    RendererHandle,
};
use tracing::{info, warn};

use crate::error::Result;
use crate::refs::{JavaPayload, JavaQueue};
use crate::runtime::{JniBinder, RUNTIME};

/// A session reading from a Java `BlockingQueue<byte[]>`.
pub type JavaSession = Session<JniBinder, JavaQueue, JavaPayload>;

/// libVLC is already mapped by the Java bindings; this resolves it once.
static LIBVLC: OnceLock<LibVlc> = OnceLock::new();

fn libvlc() -> Result<&'static LibVlc> {
    if let Some(lib) = LIBVLC.get() {
        return Ok(lib);
    }
    let lib = LibVlc::load()?;
    Ok(LIBVLC.get_or_init(|| lib))
}

/// Native object addresses as passed from Java `long`s.
#[derive(Debug, Clone, Copy)]
pub struct NativeHandles {
    pub player: i64,
    pub instance: i64,
    pub renderer: i64,
}

impl NativeHandles {
    /// All three are required; a null renderer is rejected.
    pub fn resolve(self) -> Result<PlaybackTarget> {
        // SAFETY: the Java side passes addresses of live VLCObjects it keeps
        // referenced for the duration of the call.
        unsafe {
            Ok(PlaybackTarget {
                instance: InstanceHandle::from_address(self.instance)?,
                player: PlayerHandle::from_address(self.player)?,
                renderer: Some(RendererHandle::from_address(self.renderer)?),
            })
        }
    }
}

/// Take references to the Java inputs and assemble an unopened session.
///
/// A failure to reference the SPS/PPS array is not fatal: the stream then
/// starts without a prefix.
pub fn build_session(
    env: &mut JNIEnv<'_>,
    queue: &JObject<'_>,
    sps_pps: &JByteArray<'_>,
    options: SourceOptions,
) -> Result<JavaSession> {
    let queue = JavaQueue::new(env, queue)?;

    let payload = match JavaPayload::new(env, sps_pps) {
        Ok(payload) => payload,
        Err(e) => {
            warn!(error = %e, "Proceeding without parameter sets");
            None
        }
    };
    if payload.is_none() {
        warn!("No SPS/PPS provided, stream starts without a prefix");
    }

    Ok(Session::new(
        JniBinder,
        Owned::new("nal_queue", queue),
        payload.map(|p| Owned::new("sps_pps", p)),
        options,
    ))
}

/// Body of `nativeSetupCustomMediaAndPlay`.
pub fn setup_custom_media_and_play(
    env: &mut JNIEnv<'_>,
    handles: NativeHandles,
    queue: &JObject<'_>,
    sps_pps: &JByteArray<'_>,
) -> Result<()> {
    if !RUNTIME.is_initialized() {
        return Err(BindError::Uninitialized.into());
    }

    let target = handles.resolve()?;
    let lib = libvlc()?;
    let session = build_session(env, queue, sps_pps, SourceOptions::default())?;

    setup_and_play(lib, &target, session, &DemuxOptions::default())?;
    info!("Custom media attached and playing");
    Ok(())
}
