//! wavplay-ap - command-line WAV player
//!
//! Plays the given clips in order through the wavplay engine. Clips that do
//! not fit in the queue are held back and enqueued as earlier ones finish.

use std::collections::{HashSet, VecDeque};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use tokio::signal;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use wavplay_ap::error::QueueError;
use wavplay_ap::sink::{AudioSink, NullSink};
use wavplay_ap::{PlaybackState, PlayerConfig, SourceDescriptor, WavPlayer};
use wavplay_common::config::{resolve_config_path, TomlConfig};
use wavplay_common::events::PlayerEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Output {
    /// Discard audio (paced with --realtime)
    Null,
    /// System audio device (requires the cpal-output feature)
    Cpal,
}

/// Command-line arguments for wavplay-ap
#[derive(Parser, Debug)]
#[command(name = "wavplay-ap")]
#[command(about = "Streaming PCM WAV player")]
#[command(version)]
struct Args {
    /// WAV files to play, in order
    #[arg(required = true)]
    clips: Vec<PathBuf>,

    /// Bootstrap config file (defaults to $WAVPLAY_CONFIG, then the user config dir)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Initial volume in percent
    #[arg(short, long, value_parser = clap::value_parser!(u8).range(0..=100))]
    volume: Option<u8>,

    /// Playback queue capacity
    #[arg(long)]
    queue_len: Option<usize>,

    /// Streaming chunk size in bytes
    #[arg(long)]
    chunk_size: Option<usize>,

    /// Byte-swap 16-bit samples for TDA1543-style DACs
    #[arg(long)]
    legacy_dac: bool,

    /// Load clips into memory and play them from there
    #[arg(long)]
    preload: bool,

    /// Audio output
    #[arg(short, long, value_enum, default_value_t = Output::Null)]
    output: Output,

    /// Output device name for --output cpal
    #[arg(long, env = "WAVPLAY_DEVICE")]
    device: Option<String>,

    /// Pace the null sink at the clip byte rate
    #[arg(long)]
    realtime: bool,

    /// Print the header properties of each clip as JSON and exit
    #[arg(long)]
    probe: bool,

    /// Log level (overrides the config file; RUST_LOG overrides both)
    #[arg(long, env = "WAVPLAY_LOG_LEVEL")]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config_path = resolve_config_path(args.config.as_deref());
    let toml_config =
        TomlConfig::load_or_default(args.config.as_deref()).context("Failed to load config")?;

    let level = args
        .log_level
        .clone()
        .unwrap_or_else(|| toml_config.logging.level.clone());
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("wavplay_ap={level},wavplay_common={level}").into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting wavplay-ap v{}", env!("CARGO_PKG_VERSION"));
    match config_path {
        Some(path) if path.exists() => info!("Config: {}", path.display()),
        _ => info!("Config: built-in defaults"),
    }

    if args.probe {
        return probe(&args.clips);
    }

    let mut config = PlayerConfig::from(&toml_config.player);
    if let Some(volume) = args.volume {
        config.initial_volume = volume;
    }
    if let Some(queue_len) = args.queue_len {
        config.queue_len = queue_len;
    }
    if let Some(chunk_size) = args.chunk_size {
        config.chunk_size = chunk_size;
    }
    config.legacy_dac_mode |= args.legacy_dac;

    let sink = build_sink(&args)?;
    let player = WavPlayer::init(config, sink).context("Failed to initialize player")?;

    let mut pending = VecDeque::with_capacity(args.clips.len());
    for path in &args.clips {
        pending.push_back(load_source(path, args.preload).await?);
    }

    let result = run(&player, pending).await;

    tokio::task::spawn_blocking(move || player.deinit())
        .await
        .context("Shutdown task failed")?
        .context("Player shutdown failed")?;

    info!("Shutdown complete");
    result
}

fn build_sink(args: &Args) -> Result<Box<dyn AudioSink>> {
    debug!("Output: {:?} (device: {:?})", args.output, args.device);
    match args.output {
        Output::Null if args.realtime => Ok(Box::new(NullSink::realtime())),
        Output::Null => Ok(Box::new(NullSink::new())),
        #[cfg(feature = "cpal-output")]
        Output::Cpal => Ok(Box::new(wavplay_ap::sink::CpalSink::new(args.device.clone()))),
        #[cfg(not(feature = "cpal-output"))]
        Output::Cpal => bail!("wavplay-ap was built without the cpal-output feature"),
    }
}

async fn load_source(path: &Path, preload: bool) -> Result<SourceDescriptor> {
    if !preload {
        return Ok(SourceDescriptor::file(path));
    }
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    debug!("Preloaded {} ({} bytes)", path.display(), bytes.len());
    // Clips live for the rest of the process
    Ok(SourceDescriptor::embedded(Box::leak(bytes.into_boxed_slice())))
}

fn probe(clips: &[PathBuf]) -> Result<()> {
    for path in clips {
        let source = SourceDescriptor::file(path);
        match WavPlayer::probe(&source) {
            Ok(properties) => {
                let json = serde_json::json!({
                    "path": path,
                    "properties": properties,
                    "duration_secs": properties.duration().as_secs_f64(),
                });
                println!("{}", serde_json::to_string_pretty(&json)?);
            }
            Err(e) => warn!("{}: {}", path.display(), e),
        }
    }
    Ok(())
}

/// Feed `pending` into the player until everything has played or Ctrl+C
async fn run(player: &WavPlayer, mut pending: VecDeque<SourceDescriptor>) -> Result<()> {
    let mut events = player.subscribe();
    let mut in_flight: HashSet<Uuid> = HashSet::new();
    let mut failures = 0usize;

    loop {
        while let Some(source) = pending.front() {
            match player.play(source.clone()) {
                Ok(clip_id) => {
                    in_flight.insert(clip_id);
                    pending.pop_front();
                }
                Err(QueueError::QueueFull) => break,
                Err(e) => {
                    warn!("Skipping {}: {}", source, e);
                    failures += 1;
                    pending.pop_front();
                }
            }
        }

        if pending.is_empty() && in_flight.is_empty() {
            break;
        }

        tokio::select! {
            _ = signal::ctrl_c() => {
                info!("Received Ctrl+C, stopping playback");
                player.stop();
                break;
            }
            event = events.recv() => match event {
                Ok(event) => {
                    if let PlayerEvent::ClipFailed { .. } = event {
                        failures += 1;
                    }
                    if event.is_terminal() {
                        if let Some(clip_id) = event.clip_id() {
                            in_flight.remove(&clip_id);
                        }
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!("Event subscriber lagged, skipped {} events", skipped);
                    // A missed terminal event would otherwise wait forever
                    if player.get_queued_count() == 0
                        && player.get_state() == PlaybackState::Stopped
                    {
                        in_flight.clear();
                    }
                }
                Err(RecvError::Closed) => break,
            }
        }
    }

    if failures > 0 {
        bail!("{} clip(s) could not be played", failures);
    }
    Ok(())
}
