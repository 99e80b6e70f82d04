//! Player runtime configuration
//!
//! `PlayerConfig` is what `WavPlayer::init` consumes. Defaults come from the
//! bootstrap `[player]` section so the file format and the code agree on one
//! set of values.

use crate::error::ConfigError;
use std::time::Duration;
use wavplay_common::config::PlayerSection;

/// Audio Player configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerConfig {
    /// Capacity of the playback queue (clips waiting behind the current one)
    pub queue_len: usize,

    /// Bytes per streaming iteration; also the stop/pause/volume granularity
    pub chunk_size: usize,

    /// Volume applied until the first `set_volume` (0-100)
    pub initial_volume: u8,

    /// Byte-swap 16-bit samples after scaling (TDA1543-style DACs)
    pub legacy_dac_mode: bool,

    /// Idle wait for a queued clip before re-checking for shutdown
    pub dequeue_timeout: Duration,

    /// Sleep between checks while paused
    ///
    /// A resume or stop issued while paused is observed within this interval.
    pub pause_poll_interval: Duration,

    /// Timeout handed to each sink write
    pub write_timeout: Duration,

    /// Consecutive zero-progress writes before the clip is aborted
    pub max_write_retries: u32,

    /// How long `deinit` waits for the worker to exit
    pub shutdown_timeout: Duration,

    /// Event bus buffer size
    pub event_capacity: usize,
}

impl PlayerConfig {
    /// Check every field, reporting the first violation
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.queue_len == 0 {
            return Err(ConfigError::ZeroQueueLength);
        }
        if self.chunk_size == 0 || self.chunk_size % 2 != 0 {
            return Err(ConfigError::InvalidChunkSize(self.chunk_size));
        }
        if self.initial_volume > 100 {
            return Err(ConfigError::VolumeOutOfRange(self.initial_volume));
        }
        for (name, value) in [
            ("dequeue_timeout", self.dequeue_timeout),
            ("pause_poll_interval", self.pause_poll_interval),
            ("write_timeout", self.write_timeout),
            ("shutdown_timeout", self.shutdown_timeout),
        ] {
            if value.is_zero() {
                return Err(ConfigError::ZeroDuration(name));
            }
        }
        if self.max_write_retries == 0 {
            return Err(ConfigError::ZeroWriteRetries);
        }
        if self.event_capacity == 0 {
            return Err(ConfigError::ZeroEventCapacity);
        }
        Ok(())
    }

    /// Longest time a jammed sink can hold up one chunk
    pub fn write_stall_window(&self) -> Duration {
        self.write_timeout * self.max_write_retries
    }
}

impl From<&PlayerSection> for PlayerConfig {
    fn from(section: &PlayerSection) -> Self {
        Self {
            queue_len: section.queue_len,
            chunk_size: section.chunk_size,
            initial_volume: section.initial_volume,
            legacy_dac_mode: section.legacy_dac_mode,
            dequeue_timeout: Duration::from_millis(section.dequeue_timeout_ms),
            pause_poll_interval: Duration::from_millis(section.pause_poll_interval_ms),
            write_timeout: Duration::from_millis(section.write_timeout_ms),
            max_write_retries: section.max_write_retries,
            shutdown_timeout: Duration::from_millis(section.shutdown_timeout_ms),
            event_capacity: section.event_capacity,
        }
    }
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self::from(&PlayerSection::default())
    }
}
