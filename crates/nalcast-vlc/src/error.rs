//! Error types for nalcast-vlc.

use thiserror::Error;

/// Errors that can occur when loading libVLC.
#[derive(Debug, Error)]
pub enum VlcLoadError {
    #[error("libVLC not found: {0}")]
    LibraryNotFound(String),

    #[error("Required symbol not found: {0}")]
    SymbolNotFound(String),
}

/// Errors raised while wiring a byte source into a player.
#[derive(Debug, Error)]
pub enum ActivationError {
    /// A media option contained an interior NUL byte.
    #[error("Invalid media option {0:?}")]
    InvalidOption(String),

    /// A native handle passed across the boundary was null.
    #[error("Null native handle: {0}")]
    NullHandle(&'static str),

    #[error("libvlc_new failed")]
    InstanceCreation,

    #[error("libvlc_media_player_new failed")]
    PlayerCreation,

    /// The library refused to create the callback media.
    #[error("libvlc_media_new_callbacks failed")]
    MediaCreation,

    #[error("libvlc_media_player_set_renderer failed with code {0}")]
    Renderer(i32),

    #[error("libvlc_media_player_play failed with code {0}")]
    Play(i32),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn activation_error_display() {
        assert_eq!(
            ActivationError::Renderer(-1).to_string(),
            "libvlc_media_player_set_renderer failed with code -1"
        );
        assert_eq!(
            VlcLoadError::SymbolNotFound("libvlc_new".into()).to_string(),
            "Required symbol not found: libvlc_new"
        );
    }
}
