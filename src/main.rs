mod cli;

use nalcast::{
    config,
    feeder::{ElementaryStream, Feeder},
};
use nalcast_source::{nal_channel, Session};
use nalcast_vlc::{setup_and_play, Instance, LibVlc, PlaybackTarget, Player};

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use std::path::Path;
use std::sync::atomic::Ordering;
use std::time::{Duration, Instant};

/// How long playback may take to start before the drain wait gives up on it.
const START_GRACE: Duration = Duration::from_secs(5);

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "nalcast=trace,nalcast_source=trace,nalcast_vlc=debug".to_string()
        } else {
            "nalcast=info,nalcast_source=info,nalcast_vlc=info".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Play { file, loop_input } => play_file(&file, cli.config.as_deref(), loop_input),
        Commands::Inspect { file, json } => inspect_file(&file, cli.config.as_deref(), json),
        Commands::Validate {
            config: config_path,
        } => {
            let path = config_path.or(cli.config);
            validate_config(path.as_deref())
        }
        Commands::Version => {
            println!("nalcast {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn read_stream(file: &Path) -> Result<ElementaryStream> {
    if !file.exists() {
        anyhow::bail!("File does not exist: {:?}", file);
    }

    let data = std::fs::read(file).with_context(|| format!("Failed to read {:?}", file))?;
    ElementaryStream::parse(&data)
        .with_context(|| format!("Not an H.264 Annex-B stream: {:?}", file))
}

fn play_file(file: &Path, config_path: Option<&Path>, loop_input: bool) -> Result<()> {
    let config = config::load_config_or_default(config_path)?;
    let stream = read_stream(file)?;

    if stream.param_sets.is_none() {
        tracing::warn!("No SPS/PPS found in {:?}, decoder may not start", file);
    }
    if stream.units.is_empty() {
        anyhow::bail!("No IDR frame found in {:?}", file);
    }

    tracing::info!(
        "Playing {:?}: {} units, {} skipped before first IDR",
        file,
        stream.units.len(),
        stream.skipped
    );

    let lib = match config.vlc.library {
        Some(ref path) => LibVlc::load_from(path)?,
        None => LibVlc::load()?,
    };
    let instance = Instance::new(&lib, &config.vlc.args)?;
    let player = Player::new(&instance)?;

    let (tx, rx) = nal_channel(config.queue.capacity);
    let session = Session::in_process(rx, stream.param_sets.clone(), config.source.clone());

    let feeder = Feeder::new(
        tx,
        &stream,
        config.demux.fps,
        loop_input || config.feed.loop_input,
    );
    let stop = feeder.stop_signal();
    let feed_handle = feeder.spawn().context("Failed to start feeder thread")?;

    let target = PlaybackTarget {
        instance: instance.handle(),
        player: player.handle(),
        renderer: None,
    };
    if let Err(e) = setup_and_play(&lib, &target, session, &config.demux) {
        stop.store(true, Ordering::Relaxed);
        let _ = feed_handle.join();
        return Err(e).context("Failed to start playback");
    }

    let stats = feed_handle
        .join()
        .map_err(|_| anyhow::anyhow!("Feeder thread panicked"))?;

    // The feeder dropped the only sender when it finished. Once the player
    // drains the queue the next read fails as disconnected and libVLC stops
    // the input; wait for that.
    let deadline = Instant::now() + START_GRACE;
    let mut seen_playing = false;
    loop {
        let playing = player.is_playing();
        seen_playing |= playing;
        if !playing && (seen_playing || Instant::now() >= deadline) {
            break;
        }
        std::thread::sleep(Duration::from_millis(200));
    }
    player.stop();

    println!("Units sent: {}", stats.units_sent);
    println!("Frames sent: {}", stats.frames_sent);
    println!("Bytes sent: {}", stats.bytes_sent);
    if stats.dropped > 0 {
        println!("Dropped (queue full): {}", stats.dropped);
    }

    Ok(())
}

fn inspect_file(file: &Path, config_path: Option<&Path>, json: bool) -> Result<()> {
    let config = config::load_config_or_default(config_path)?;
    let stream = read_stream(file)?;
    let summary = stream.summary(config.demux.fps);

    if json {
        let json_str = serde_json::to_string_pretty(&summary)?;
        println!("{}", json_str);
    } else {
        println!("File: {}", file.display());
        println!("NAL units: {}", summary.total_units);
        for (name, count) in &summary.unit_types {
            println!("  {:<24} {}", name, count);
        }
        match summary.param_sets_bytes {
            Some(len) => println!("Parameter sets: SPS+PPS ({} bytes)", len),
            None => println!("Parameter sets: missing"),
        }
        println!("Skipped before first IDR: {}", summary.skipped_before_idr);
        println!("Units to feed: {}", summary.fed_units);
        println!(
            "Slices: {} ({:.2}s at {} fps)",
            summary.vcl_units, summary.duration_secs, config.demux.fps
        );
    }

    Ok(())
}

fn validate_config(path: Option<&Path>) -> Result<()> {
    let config = match path {
        Some(p) => {
            println!("Validating config: {:?}", p);
            let config = config::load_config(p)?;
            println!("✓ Configuration is valid");
            config
        }
        None => {
            println!("No config file specified, using defaults");
            config::Config::default()
        }
    };

    println!("  Demux: {} at {} fps", config.demux.demux, config.demux.fps);
    println!("  Media options: {}", config.demux.media_options().join(" "));
    println!("  Queue capacity: {}", config.queue.capacity);
    println!("  Poll timeout: {} ms", config.source.poll_timeout_ms);
    println!("  Oversize policy: {:?}", config.source.oversize);
    match config.vlc.library {
        Some(ref lib) => println!("  libvlc: {}", lib.display()),
        None => println!("  libvlc: system search path"),
    }

    Ok(())
}
