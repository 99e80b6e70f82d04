//! Playback-related type definitions
//!
//! Supporting types for player state and clip lifecycle events.

use serde::{Deserialize, Serialize};

/// Playback state enumeration
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackState {
    /// No clip is streaming
    #[default]
    Stopped,
    /// A clip is streaming to the sink
    Playing,
    /// A clip is open but chunk transfer is suspended
    Paused,
}

impl std::fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlaybackState::Stopped => write!(f, "stopped"),
            PlaybackState::Playing => write!(f, "playing"),
            PlaybackState::Paused => write!(f, "paused"),
        }
    }
}

/// Why a started clip stopped streaming
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub enum FinishReason {
    /// Payload byte counter reached zero
    Completed,
    /// Backend returned no more bytes before the payload counter ran out
    EndOfStream,
    /// Stop was requested by a caller
    Stopped,
    /// Backend or sink failure mid-clip
    Failed,
}

impl std::fmt::Display for FinishReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FinishReason::Completed => write!(f, "Completed"),
            FinishReason::EndOfStream => write!(f, "EndOfStream"),
            FinishReason::Stopped => write!(f, "Stopped"),
            FinishReason::Failed => write!(f, "Failed"),
        }
    }
}

/// Audio format of a clip as reported in events
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClipFormat {
    pub channels: u16,
    pub sample_rate: u32,
    pub bit_depth: u16,
    pub payload_bytes: u32,
}
