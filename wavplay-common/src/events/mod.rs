//! Event types for the wavplay event system
//!
//! Provides the shared `PlayerEvent` definitions and the `EventBus` used to
//! distribute them.

mod playback_types;

pub use playback_types::{ClipFormat, FinishReason, PlaybackState};

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Player event types
///
/// Events are broadcast via `EventBus` and can be serialized for logging or
/// forwarding to a remote observer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum PlayerEvent {
    /// Clip passed header validation and was admitted to the queue
    ClipQueued {
        clip_id: Uuid,
        /// Human-readable source description (path or embedded region)
        source: String,
        /// Queue depth after the clip was admitted
        queue_depth: usize,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Clip was refused at enqueue time
    ClipRejected {
        source: String,
        reason: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Clip started streaming
    ClipStarted {
        clip_id: Uuid,
        format: ClipFormat,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A started clip stopped streaming
    ClipFinished {
        clip_id: Uuid,
        reason: FinishReason,
        /// Payload bytes accepted by the sink
        bytes_written: u64,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Clip was dequeued but could not be started
    ClipFailed {
        clip_id: Uuid,
        error: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Playback state changed
    StateChanged {
        old_state: PlaybackState,
        new_state: PlaybackState,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Volume changed (percent)
    VolumeChanged {
        volume: u8,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

impl PlayerEvent {
    /// Clip this event refers to, if any
    pub fn clip_id(&self) -> Option<Uuid> {
        match self {
            PlayerEvent::ClipQueued { clip_id, .. }
            | PlayerEvent::ClipStarted { clip_id, .. }
            | PlayerEvent::ClipFinished { clip_id, .. }
            | PlayerEvent::ClipFailed { clip_id, .. } => Some(*clip_id),
            _ => None,
        }
    }

    /// True for events after which a clip will never produce more audio
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            PlayerEvent::ClipFinished { .. } | PlayerEvent::ClipFailed { .. }
        )
    }
}

// ========================================
// EventBus Implementation
// ========================================

/// Central event distribution bus
///
/// The EventBus uses tokio::broadcast internally, providing:
/// - Non-blocking publish (slow subscribers don't block the playback worker)
/// - Multiple concurrent subscribers
/// - Lagged message detection for slow subscribers
///
/// `emit` is synchronous and may be called from plain threads; only
/// receiving requires an async context (or `blocking_recv`).
///
/// # Examples
///
/// ```
/// use wavplay_common::events::{EventBus, PlayerEvent};
///
/// let event_bus = EventBus::new(100);
/// let mut rx = event_bus.subscribe();
///
/// event_bus.emit_lossy(PlayerEvent::VolumeChanged {
///     volume: 50,
///     timestamp: chrono::Utc::now(),
/// });
///
/// assert!(matches!(rx.try_recv(), Ok(PlayerEvent::VolumeChanged { volume: 50, .. })));
/// ```
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<PlayerEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero (tokio broadcast requirement).
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    ///
    /// Events emitted before subscription are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<PlayerEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Ok(subscriber_count)` if at least one subscriber exists.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: PlayerEvent,
    ) -> Result<usize, broadcast::error::SendError<PlayerEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: PlayerEvent) {
        let _ = self.tx.send(event);
    }

    /// Get the current number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Get the configured channel capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
