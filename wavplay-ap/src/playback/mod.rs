//! Playback pipeline
//!
//! Clips flow from the control surface through a [`BoundedQueue`] to the
//! single playback worker, which streams them into the sink
//! one chunk at a time.

pub(crate) mod engine;
pub mod queue;

pub use queue::{BoundedQueue, Dequeue, PushError};

use crate::audio::{AudioProperties, SourceDescriptor};
use std::sync::Arc;
use uuid::Uuid;
use wavplay_common::events::FinishReason;

/// Identifier assigned to a clip when it is admitted to the queue
pub type ClipId = Uuid;

/// A validated clip waiting in (or taken from) the playback queue
#[derive(Debug, Clone)]
pub struct ClipInfo {
    pub id: ClipId,
    pub source: SourceDescriptor,
    /// Properties read at enqueue time; re-read when the clip starts
    pub properties: AudioProperties,
}

/// How a started clip ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClipOutcome {
    pub reason: FinishReason,
    /// Payload bytes accepted by the sink
    pub bytes_written: u64,
    /// Failure description when `reason` is `Failed`
    pub error: Option<String>,
}

impl ClipOutcome {
    pub fn finished(reason: FinishReason, bytes_written: u64) -> Self {
        Self {
            reason,
            bytes_written,
            error: None,
        }
    }

    pub fn failed(bytes_written: u64, error: impl ToString) -> Self {
        Self {
            reason: FinishReason::Failed,
            bytes_written,
            error: Some(error.to_string()),
        }
    }
}

/// Called on the playback worker when a clip starts streaming
pub type StartCallback = Arc<dyn Fn(&ClipInfo) + Send + Sync>;

/// Called on the playback worker after a started clip ends
pub type EndCallback = Arc<dyn Fn(&ClipInfo, &ClipOutcome) + Send + Sync>;

/// Registered observer callbacks
#[derive(Default, Clone)]
pub struct Callbacks {
    pub on_start: Option<StartCallback>,
    pub on_end: Option<EndCallback>,
}
