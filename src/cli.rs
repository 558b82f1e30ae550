use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "nalcast")]
#[command(author, version, about = "Play H.264 elementary streams through a live NAL queue")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Feed an Annex-B file through the NAL queue into libVLC
    Play {
        /// H.264 Annex-B file to play
        #[arg(required = true)]
        file: PathBuf,

        /// Restart from the first IDR when the file ends
        #[arg(long = "loop")]
        loop_input: bool,
    },

    /// Summarize the NAL units in an Annex-B file
    Inspect {
        /// File to inspect
        #[arg(required = true)]
        file: PathBuf,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Validate configuration file
    Validate {
        /// Config file to validate (uses default if not specified)
        config: Option<PathBuf>,
    },

    /// Display version information
    Version,
}
