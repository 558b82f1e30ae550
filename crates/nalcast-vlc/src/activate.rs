//! Wiring a byte source into a player and starting playback.

use nalcast_source::ByteSource;
use tracing::{debug, error, info};

use crate::backend::MediaBackend;
use crate::callbacks::{self, CallbackTable};
use crate::error::ActivationError;
use crate::handles::{InstanceHandle, PlayerHandle, RendererHandle};
use crate::options::DemuxOptions;

/// Already-resolved native objects the media is attached to.
#[derive(Debug, Clone, Copy)]
pub struct PlaybackTarget {
    pub instance: InstanceHandle,
    pub player: PlayerHandle,
    /// Cast target. `None` keeps the player's current output.
    pub renderer: Option<RendererHandle>,
}

/// Register `source` as a callback media on `target.player` and start it.
///
/// Ownership of `source` moves to the media as soon as it is created; from
/// then on only the media's close callback frees it. If media creation fails
/// the source is dropped here, unopened, which releases whatever it holds.
///
/// The local media reference is released right after it is attached, so a
/// renderer or play failure leaves the media owned by the player alone.
pub fn setup_and_play<B, S>(
    backend: &B,
    target: &PlaybackTarget,
    source: S,
    demux: &DemuxOptions,
) -> Result<(), ActivationError>
where
    B: MediaBackend + ?Sized,
    S: ByteSource + 'static,
{
    let options = demux.to_cstrings()?;
    let table = CallbackTable::for_source::<S>();
    let opaque = callbacks::into_opaque(source);

    // SAFETY: opaque stays valid until the media's close callback consumes it.
    let media = match unsafe { backend.media_new_callbacks(target.instance, &table, opaque) } {
        Some(media) => media,
        None => {
            // SAFETY: the backend did not retain opaque, so nothing else frees it.
            drop(unsafe { callbacks::reclaim::<S>(opaque) });
            error!("Failed to create callback media");
            return Err(ActivationError::MediaCreation);
        }
    };

    for option in &options {
        debug!(option = ?option, "Adding media option");
        backend.media_add_option(media, option);
    }

    backend.player_set_media(target.player, media);
    backend.media_release(media);

    if let Some(renderer) = target.renderer {
        let rc = backend.player_set_renderer(target.player, renderer);
        if rc != 0 {
            error!(rc, "Failed to set renderer");
            return Err(ActivationError::Renderer(rc));
        }
    }

    let rc = backend.player_play(target.player);
    if rc != 0 {
        error!(rc, "Failed to start playback");
        return Err(ActivationError::Play(rc));
    }

    info!(
        demux = %demux.demux,
        fps = demux.fps,
        renderer = target.renderer.is_some(),
        "Playback started from custom byte source"
    );
    Ok(())
}
