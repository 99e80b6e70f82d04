//! Control surface
//!
//! `WavPlayer` is the handle callers hold. Every method is safe to call from
//! any thread while the worker is streaming; none of them block on audio
//! I/O. Clips are validated here, before they take a queue slot.

use crate::audio::{read_properties, AudioProperties, Backend, SourceDescriptor};
use crate::config::PlayerConfig;
use crate::error::{ClipError, QueueError, Result, SyncError};
use crate::playback::engine::{EngineShared, PlaybackWorker};
use crate::playback::{ClipId, ClipInfo, ClipOutcome, PushError};
use crate::sink::AudioSink;
use crate::state::PlaybackState;
use chrono::Utc;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};
use uuid::Uuid;
use wavplay_common::events::PlayerEvent;

struct WorkerHandle {
    thread: JoinHandle<()>,
    // mpsc::Receiver is not Sync
    done: Mutex<mpsc::Receiver<()>>,
}

/// Handle to a running player
///
/// Dropping the handle shuts the player down the same way [`deinit`]
/// does, logging instead of returning any failure.
///
/// [`deinit`]: WavPlayer::deinit
pub struct WavPlayer {
    shared: Arc<EngineShared>,
    worker: Option<WorkerHandle>,
    config: PlayerConfig,
}

impl WavPlayer {
    /// Validate `config` and start the playback worker on `sink`
    ///
    /// Nothing is left running if this fails.
    pub fn init<S>(config: PlayerConfig, sink: S) -> Result<Self>
    where
        S: AudioSink + 'static,
    {
        config.validate()?;

        let shared = Arc::new(EngineShared::new(&config));
        let worker = PlaybackWorker::new(Arc::clone(&shared), sink, config.clone());
        let (done_tx, done) = mpsc::channel();

        let thread = thread::Builder::new()
            .name("wavplay-worker".to_string())
            .spawn(move || {
                worker.run();
                let _ = done_tx.send(());
            })
            .map_err(SyncError::Spawn)?;

        info!(
            "Player started (queue_len={}, chunk_size={}, volume={}, legacy_dac_mode={})",
            config.queue_len, config.chunk_size, config.initial_volume, config.legacy_dac_mode
        );

        Ok(Self {
            shared,
            worker: Some(WorkerHandle {
                thread,
                done: Mutex::new(done),
            }),
            config,
        })
    }

    /// Stop playback, discard queued clips and wait for the worker to exit
    ///
    /// Fails with `SyncError::ShutdownTimeout` if the worker does not exit
    /// within `shutdown_timeout`; the worker is then left to finish on its
    /// own.
    pub fn deinit(mut self) -> Result<()> {
        self.shutdown()?;
        Ok(())
    }

    fn shutdown(&mut self) -> std::result::Result<(), SyncError> {
        let Some(worker) = self.worker.take() else {
            return Ok(());
        };
        info!("Shutting down player");

        self.shared.session.begin_shutdown();
        let discarded = self.shared.queue.close();
        if !discarded.is_empty() {
            debug!("Discarded {} queued clip(s)", discarded.len());
        }

        let done = worker.done.lock().unwrap_or_else(PoisonError::into_inner);
        match done.recv_timeout(self.config.shutdown_timeout) {
            Ok(()) | Err(RecvTimeoutError::Disconnected) => {}
            Err(RecvTimeoutError::Timeout) => {
                error!(
                    "Playback worker did not exit within {:?}",
                    self.config.shutdown_timeout
                );
                return Err(SyncError::ShutdownTimeout(self.config.shutdown_timeout));
            }
        }
        drop(done);

        match worker.thread.join() {
            Ok(()) => {
                info!("Player shut down");
                Ok(())
            }
            Err(e) => {
                error!("Playback worker panicked: {:?}", e);
                Err(SyncError::WorkerGone)
            }
        }
    }

    /// Read and validate the header of `source` without queueing it
    pub fn probe(source: &SourceDescriptor) -> std::result::Result<AudioProperties, ClipError> {
        let mut backend = Backend::from_source(source);
        backend.open()?;
        let properties = read_properties(&mut backend)?;
        backend.close();
        Ok(properties)
    }

    /// Validate `source` and append it to the playback queue
    ///
    /// Never blocks: a full queue is reported as `QueueError::QueueFull` and
    /// leaves the queue untouched.
    pub fn play(&self, source: SourceDescriptor) -> std::result::Result<ClipId, QueueError> {
        if self.shared.queue.is_closed() {
            return Err(QueueError::Closed);
        }

        let properties = match Self::probe(&source) {
            Ok(properties) => properties,
            Err(e) => {
                warn!("Rejected clip {}: {}", source, e);
                self.emit_rejected(&source, &e);
                return Err(QueueError::InvalidClip(e));
            }
        };

        let clip = ClipInfo {
            id: Uuid::new_v4(),
            source,
            properties,
        };
        let clip_id = clip.id;
        let description = clip.source.to_string();

        match self.shared.queue.try_push(clip) {
            Ok(queue_depth) => {
                debug!(
                    "Queued clip {} ({}), depth {}/{}",
                    clip_id,
                    description,
                    queue_depth,
                    self.shared.queue.capacity()
                );
                self.shared.events.emit_lossy(PlayerEvent::ClipQueued {
                    clip_id,
                    source: description,
                    queue_depth,
                    timestamp: Utc::now(),
                });
                Ok(clip_id)
            }
            Err(PushError::Full(clip)) => {
                warn!("Playback queue full, rejected {}", clip.source);
                self.emit_rejected(&clip.source, &QueueError::QueueFull);
                Err(QueueError::QueueFull)
            }
            Err(PushError::Closed(_)) => Err(QueueError::Closed),
        }
    }

    fn emit_rejected(&self, source: &SourceDescriptor, reason: &dyn std::fmt::Display) {
        self.shared.events.emit_lossy(PlayerEvent::ClipRejected {
            source: source.to_string(),
            reason: reason.to_string(),
            timestamp: Utc::now(),
        });
    }

    /// Abandon the current clip; the worker moves on to the next one
    pub fn stop(&self) {
        if self.shared.session.request_stop() {
            info!("Stop requested");
        } else {
            debug!("Stop requested while idle");
        }
    }

    /// Toggle pause; ignored while nothing is playing
    pub fn pause(&self) {
        match self.shared.session.toggle_pause() {
            Some(transition) => self.shared.emit_transition(transition),
            None => debug!("Pause ignored: not playing"),
        }
    }

    /// Pause or resume explicitly; ignored while nothing is playing
    pub fn set_paused(&self, paused: bool) {
        if let Some(transition) = self.shared.session.set_paused(paused) {
            self.shared.emit_transition(transition);
        }
    }

    /// Set the output level in percent; values above 100 are clamped
    ///
    /// Takes effect from the next chunk.
    pub fn set_volume(&self, volume: u8) {
        if volume > 100 {
            warn!("Volume {} out of range, clamping to 100", volume);
        }
        let volume = self.shared.session.set_volume(volume);
        debug!("Volume set to {}", volume);
        self.shared.events.emit_lossy(PlayerEvent::VolumeChanged {
            volume,
            timestamp: Utc::now(),
        });
    }

    pub fn get_volume(&self) -> u8 {
        self.shared.session.volume()
    }

    pub fn get_state(&self) -> PlaybackState {
        self.shared.session.playback_state()
    }

    /// Clips waiting behind the one currently playing
    pub fn get_queued_count(&self) -> usize {
        self.shared.queue.len()
    }

    /// Run `callback` on the worker thread each time a clip starts streaming
    pub fn set_start_callback<F>(&self, callback: F)
    where
        F: Fn(&ClipInfo) + Send + Sync + 'static,
    {
        self.shared
            .update_callbacks(|callbacks| callbacks.on_start = Some(Arc::new(callback)));
    }

    /// Run `callback` on the worker thread each time a started clip ends
    pub fn set_end_callback<F>(&self, callback: F)
    where
        F: Fn(&ClipInfo, &ClipOutcome) + Send + Sync + 'static,
    {
        self.shared
            .update_callbacks(|callbacks| callbacks.on_end = Some(Arc::new(callback)));
    }

    pub fn clear_callbacks(&self) {
        self.shared.update_callbacks(|callbacks| {
            callbacks.on_start = None;
            callbacks.on_end = None;
        });
    }

    /// Subscribe to player events emitted from now on
    pub fn subscribe(&self) -> broadcast::Receiver<PlayerEvent> {
        self.shared.events.subscribe()
    }
}

impl Drop for WavPlayer {
    fn drop(&mut self) {
        if let Err(e) = self.shutdown() {
            warn!("Player shutdown on drop failed: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::WavHeader;
    use crate::error::{ConfigError, Error, HeaderError};
    use crate::sink::NullSink;

    fn leak_clip(bit_depth: u16, sample_rate: u32, payload: usize) -> &'static [u8] {
        let mut bytes = WavHeader::pcm(1, sample_rate, bit_depth, payload as u32)
            .to_bytes()
            .to_vec();
        bytes.resize(bytes.len() + payload + 8, 0);
        Box::leak(bytes.into_boxed_slice())
    }

    #[test]
    fn test_init_rejects_invalid_config() {
        let config = PlayerConfig {
            queue_len: 0,
            ..PlayerConfig::default()
        };
        match WavPlayer::init(config, NullSink::new()) {
            Err(Error::Config(ConfigError::ZeroQueueLength)) => {}
            other => panic!("expected config error, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_fresh_player_is_idle() {
        let player = WavPlayer::init(PlayerConfig::default(), NullSink::new()).unwrap();
        assert_eq!(player.get_state(), PlaybackState::Stopped);
        assert_eq!(player.get_queued_count(), 0);
        assert_eq!(player.get_volume(), 100);
        player.deinit().unwrap();
    }

    #[test]
    fn test_volume_round_trip_and_clamp() {
        let player = WavPlayer::init(PlayerConfig::default(), NullSink::new()).unwrap();
        player.set_volume(37);
        assert_eq!(player.get_volume(), 37);
        player.set_volume(250);
        assert_eq!(player.get_volume(), 100);
    }

    #[test]
    fn test_pause_while_idle_is_ignored() {
        let player = WavPlayer::init(PlayerConfig::default(), NullSink::new()).unwrap();
        player.pause();
        player.set_paused(true);
        assert_eq!(player.get_state(), PlaybackState::Stopped);
    }

    #[test]
    fn test_play_rejects_bad_header() {
        let player = WavPlayer::init(PlayerConfig::default(), NullSink::new()).unwrap();
        let mut bytes = leak_clip(16, 22050, 64).to_vec();
        bytes[0..4].copy_from_slice(b"RIFX");
        let source = SourceDescriptor::embedded(Box::leak(bytes.into_boxed_slice()));

        match player.play(source) {
            Err(QueueError::InvalidClip(ClipError::Header(HeaderError::BadRiffTag))) => {}
            other => panic!("expected header rejection, got {:?}", other),
        }
        assert_eq!(player.get_queued_count(), 0);
    }

    #[test]
    fn test_play_after_deinit_is_refused() {
        let mut player = WavPlayer::init(PlayerConfig::default(), NullSink::new()).unwrap();
        player.shutdown().unwrap();
        let source = SourceDescriptor::embedded(leak_clip(8, 8000, 16));
        assert!(matches!(player.play(source), Err(QueueError::Closed)));
    }

    #[test]
    fn test_probe_reports_properties() {
        let source = SourceDescriptor::embedded(leak_clip(16, 22050, 44100));
        let properties = WavPlayer::probe(&source).unwrap();
        assert_eq!(properties.sample_rate, 22050);
        assert_eq!(properties.bit_depth, 16);
        assert_eq!(properties.payload_len, 44100);
        assert_eq!(properties.payload_start, 52);
    }
}
