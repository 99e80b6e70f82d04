//! # wavplay Audio Player Library (wavplay-ap)
//!
//! Streaming PCM WAV playback for small devices.
//!
//! Clips come from an embedded memory region or a file, are validated when
//! queued, and are streamed chunk by chunk through a volume transform into
//! an [`AudioSink`](sink::AudioSink) on a dedicated worker thread. The
//! caller controls playback through [`WavPlayer`].
//!
//! ```no_run
//! use wavplay_ap::{PlayerConfig, SourceDescriptor, WavPlayer};
//! use wavplay_ap::sink::NullSink;
//!
//! let player = WavPlayer::init(PlayerConfig::default(), NullSink::realtime())?;
//! player.play(SourceDescriptor::file("/spiffs/chime.wav"))?;
//! player.set_volume(60);
//! # Ok::<(), wavplay_ap::Error>(())
//! ```

pub mod audio;
pub mod config;
pub mod error;
pub mod playback;
pub mod player;
pub mod sink;
pub mod state;

pub use audio::{AudioProperties, SourceDescriptor};
pub use config::PlayerConfig;
pub use error::{Error, Result};
pub use playback::{ClipId, ClipInfo, ClipOutcome};
pub use player::WavPlayer;
pub use state::PlaybackState;
