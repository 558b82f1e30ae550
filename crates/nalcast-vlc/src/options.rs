//! Demuxer hints attached to the callback media.

use std::ffi::CString;

#[cfg(feature = "serialize")]
use serde::{Deserialize, Serialize};

use crate::error::ActivationError;

/// How the decoder should interpret the raw byte stream.
///
/// A callback media carries no container, so the elementary-stream demuxer
/// has to be forced and told the frame rate.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct DemuxOptions {
    #[cfg_attr(feature = "serialize", serde(default = "default_demux"))]
    pub demux: String,

    #[cfg_attr(feature = "serialize", serde(default = "default_fps"))]
    pub fps: f32,

    /// Additional `:key=value` media options, passed through verbatim.
    #[cfg_attr(feature = "serialize", serde(default))]
    pub extra: Vec<String>,
}

fn default_demux() -> String {
    "h264".to_string()
}

fn default_fps() -> f32 {
    30.0
}

impl Default for DemuxOptions {
    fn default() -> Self {
        Self {
            demux: default_demux(),
            fps: default_fps(),
            extra: Vec::new(),
        }
    }
}

impl DemuxOptions {
    /// The media options in the order they are applied.
    pub fn media_options(&self) -> Vec<String> {
        let mut options = vec![
            format!(":demux={}", self.demux),
            format!(":{}-fps={}", self.demux, self.fps),
        ];
        options.extend(self.extra.iter().cloned());
        options
    }

    pub(crate) fn to_cstrings(&self) -> Result<Vec<CString>, ActivationError> {
        self.media_options()
            .into_iter()
            .map(|opt| CString::new(opt.clone()).map_err(|_| ActivationError::InvalidOption(opt)))
            .collect()
    }
}
