use nalcast_source::SourceOptions;
use nalcast_vlc::DemuxOptions;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    /// Read-path tunables for the byte source
    #[serde(default)]
    pub source: SourceOptions,

    /// Demuxer hints added to the media
    #[serde(default)]
    pub demux: DemuxOptions,

    #[serde(default)]
    pub queue: QueueConfig,

    #[serde(default)]
    pub vlc: VlcConfig,

    #[serde(default)]
    pub feed: FeedConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct QueueConfig {
    /// Bounded capacity of the NAL queue, in units
    #[serde(default = "default_capacity")]
    pub capacity: usize,
}

fn default_capacity() -> usize {
    64
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            capacity: default_capacity(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct VlcConfig {
    /// Explicit path to libvlc; searched on the system path when unset
    #[serde(default)]
    pub library: Option<PathBuf>,

    /// Arguments passed to libvlc_new
    #[serde(default = "default_vlc_args")]
    pub args: Vec<String>,
}

fn default_vlc_args() -> Vec<String> {
    vec!["--no-sub-autodetect-file".to_string()]
}

impl Default for VlcConfig {
    fn default() -> Self {
        Self {
            library: None,
            args: default_vlc_args(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct FeedConfig {
    /// Restart from the first IDR when the input file is exhausted
    #[serde(default)]
    pub loop_input: bool,
}
