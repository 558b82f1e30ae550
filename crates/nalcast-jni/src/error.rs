//! Error types for nalcast-jni.

use nalcast_source::BindError;
use nalcast_vlc::{ActivationError, VlcLoadError};
use thiserror::Error;

/// Failures of `nativeSetupCustomMediaAndPlay`. All of them map to `false`
/// on the Java side.
#[derive(Debug, Error)]
pub enum SetupError {
    #[error(transparent)]
    Bind(#[from] BindError),

    #[error("Null argument: {0}")]
    NullArgument(&'static str),

    #[error("JNI call {step} failed: {source}")]
    Jni {
        step: &'static str,
        #[source]
        source: jni::errors::Error,
    },

    #[error(transparent)]
    Load(#[from] VlcLoadError),

    #[error(transparent)]
    Activation(#[from] ActivationError),
}

pub type Result<T> = std::result::Result<T, SetupError>;
