//! Error types for wavplay-ap
//!
//! One thiserror enum per failure family, plus a top-level `Error` that wraps
//! them for callers who do not care which layer failed.
//!
//! Propagation rules:
//! - `ConfigError` is fatal to `WavPlayer::init` and leaves nothing behind.
//! - `BackendError` and `HeaderError` affect a single clip only.
//! - `QueueError` is returned synchronously from `play`.
//! - `SyncError` is a retryable coordination failure, never swallowed.

use std::time::Duration;
use thiserror::Error;

/// Invalid initialization arguments
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("queue length must be at least 1")]
    ZeroQueueLength,

    #[error("chunk size must be a non-zero even number of bytes, got {0}")]
    InvalidChunkSize(usize),

    #[error("volume must be within 0-100, got {0}")]
    VolumeOutOfRange(u8),

    #[error("{0} must be greater than zero")]
    ZeroDuration(&'static str),

    #[error("max_write_retries must be at least 1")]
    ZeroWriteRetries,

    #[error("event capacity must be at least 1")]
    ZeroEventCapacity,
}

/// Byte source failures
#[derive(Error, Debug)]
pub enum BackendError {
    /// Underlying resource could not be acquired (empty region, failed open)
    #[error("backend unavailable: {0}")]
    Unavailable(String),

    /// read/seek attempted outside an open/close pair
    #[error("backend is not open")]
    NotOpen,

    /// I/O failure while the backend was open
    #[error("backend I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// WAV container validation failures, one per check in parse order
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HeaderError {
    #[error("header truncated: read {got} of {expected} bytes")]
    Truncated { expected: usize, got: usize },

    #[error("missing RIFF tag")]
    BadRiffTag,

    #[error("missing WAVE tag")]
    BadWaveTag,

    #[error("missing fmt chunk tag")]
    BadFmtTag,

    #[error("unsupported audio format {0} (only linear PCM is supported)")]
    UnsupportedFormat(u16),

    #[error("sample rate {0} Hz outside 8000-44100 Hz")]
    SampleRateOutOfRange(u32),

    #[error("missing data chunk tag")]
    BadDataTag,

    #[error("unsupported bit depth {0} (only 8 and 16 are supported)")]
    UnsupportedBitDepth(u16),
}

/// Hardware sink failures
#[derive(Error, Debug)]
pub enum SinkError {
    /// Device or driver failure
    #[error("audio device error: {0}")]
    Device(String),

    /// Sink accepted no bytes for the whole retry window
    #[error("sink made no progress for {0:?}")]
    Stalled(Duration),

    /// Sink cannot produce the requested format
    #[error("unsupported sink format: {0}")]
    Unsupported(String),
}

/// Lock, queue or worker coordination failures
#[derive(Error, Debug)]
pub enum SyncError {
    #[error("playback worker did not exit within {0:?}")]
    ShutdownTimeout(Duration),

    #[error("failed to spawn playback worker: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("playback worker is no longer running")]
    WorkerGone,
}

/// Failure to prepare one clip (validation or playback start)
#[derive(Error, Debug)]
pub enum ClipError {
    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error(transparent)]
    Header(#[from] HeaderError),
}

/// Enqueue failures returned from `play`
#[derive(Error, Debug)]
pub enum QueueError {
    /// Clip failed header validation and was not admitted
    #[error("invalid clip: {0}")]
    InvalidClip(#[from] ClipError),

    /// Queue is at capacity
    #[error("playback queue is full")]
    QueueFull,

    /// Player is shutting down
    #[error("playback queue is closed")]
    Closed,
}

/// Main error type for wavplay-ap
#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    #[error("Header error: {0}")]
    Header(#[from] HeaderError),

    #[error("Queue error: {0}")]
    Queue(#[from] QueueError),

    #[error("Sync error: {0}")]
    Sync(#[from] SyncError),

    #[error("Audio output error: {0}")]
    Sink(#[from] SinkError),
}

impl From<ClipError> for Error {
    fn from(err: ClipError) -> Self {
        match err {
            ClipError::Backend(e) => Error::Backend(e),
            ClipError::Header(e) => Error::Header(e),
        }
    }
}

/// Convenience Result type using wavplay-ap Error
pub type Result<T> = std::result::Result<T, Error>;
