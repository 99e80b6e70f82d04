//! Shared session state
//!
//! Flags shared between the control surface and the playback worker. All
//! flags live behind one mutex so a reader always sees a consistent set.
//! The coarse [`PlaybackState`] is derived from the flags, never stored.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::{debug, warn};

pub use wavplay_common::events::PlaybackState;

/// Snapshot of the session flags
///
/// `is_paused` implies `is_playing`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionState {
    pub is_playing: bool,
    pub is_paused: bool,
    pub stop_requested: bool,
    /// Output level in percent (0..=100)
    pub volume: u8,
}

impl SessionState {
    pub fn new(volume: u8) -> Self {
        Self {
            is_playing: false,
            is_paused: false,
            stop_requested: false,
            volume: volume.min(100),
        }
    }

    pub fn playback_state(&self) -> PlaybackState {
        match (self.is_playing, self.is_paused) {
            (false, _) => PlaybackState::Stopped,
            (true, true) => PlaybackState::Paused,
            (true, false) => PlaybackState::Playing,
        }
    }
}

/// A state change caused by a control operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub old_state: PlaybackState,
    pub new_state: PlaybackState,
}

/// Session flags plus the shutdown flag
///
/// The shutdown flag sits outside the mutex: once raised it is never
/// cleared, so the clip-start reset cannot swallow it.
pub struct SharedSession {
    flags: Mutex<SessionState>,
    shutdown: AtomicBool,
}

impl SharedSession {
    pub fn new(volume: u8) -> Self {
        Self {
            flags: Mutex::new(SessionState::new(volume)),
            shutdown: AtomicBool::new(false),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.flags.lock().unwrap_or_else(|poisoned| {
            warn!("Session state lock was poisoned, recovering");
            PoisonError::into_inner(poisoned)
        })
    }

    pub fn snapshot(&self) -> SessionState {
        *self.lock()
    }

    pub fn playback_state(&self) -> PlaybackState {
        self.lock().playback_state()
    }

    pub fn volume(&self) -> u8 {
        self.lock().volume
    }

    /// Store a new volume, clamped to 100. Returns the stored value.
    pub fn set_volume(&self, volume: u8) -> u8 {
        let clamped = volume.min(100);
        self.lock().volume = clamped;
        clamped
    }

    /// Ask the worker to abandon the current clip
    ///
    /// Returns whether a clip was playing at the time.
    pub fn request_stop(&self) -> bool {
        let mut flags = self.lock();
        flags.stop_requested = true;
        flags.is_playing
    }

    /// Set the pause flag. Has no effect while nothing is playing.
    pub fn set_paused(&self, paused: bool) -> Option<Transition> {
        let mut flags = self.lock();
        if !flags.is_playing || flags.is_paused == paused {
            return None;
        }
        let old_state = flags.playback_state();
        flags.is_paused = paused;
        Some(Transition {
            old_state,
            new_state: flags.playback_state(),
        })
    }

    /// Flip the pause flag. Has no effect while nothing is playing.
    pub fn toggle_pause(&self) -> Option<Transition> {
        let mut flags = self.lock();
        if !flags.is_playing {
            return None;
        }
        let old_state = flags.playback_state();
        flags.is_paused = !flags.is_paused;
        Some(Transition {
            old_state,
            new_state: flags.playback_state(),
        })
    }

    /// Mark a clip as started, clearing any stale stop or pause request
    pub(crate) fn begin_clip(&self) -> Transition {
        let mut flags = self.lock();
        let old_state = flags.playback_state();
        flags.is_playing = true;
        flags.is_paused = false;
        flags.stop_requested = false;
        debug!("Session flags reset for new clip");
        Transition {
            old_state,
            new_state: flags.playback_state(),
        }
    }

    /// Mark the current clip as finished
    pub(crate) fn end_clip(&self) -> Transition {
        let mut flags = self.lock();
        let old_state = flags.playback_state();
        flags.is_playing = false;
        flags.is_paused = false;
        flags.stop_requested = false;
        Transition {
            old_state,
            new_state: flags.playback_state(),
        }
    }

    pub(crate) fn begin_shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
        self.lock().stop_requested = true;
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shutdown.load(Ordering::SeqCst)
    }

    /// Whether the worker should abandon the current clip
    pub fn should_stop(&self) -> bool {
        self.is_shutting_down() || self.lock().stop_requested
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_state_is_stopped() {
        let session = SharedSession::new(80);
        assert_eq!(session.playback_state(), PlaybackState::Stopped);
        assert_eq!(session.volume(), 80);
        assert!(!session.should_stop());
    }

    #[test]
    fn test_volume_is_clamped() {
        let session = SharedSession::new(150);
        assert_eq!(session.volume(), 100);
        assert_eq!(session.set_volume(101), 100);
        assert_eq!(session.set_volume(0), 0);
        assert_eq!(session.volume(), 0);
    }

    #[test]
    fn test_pause_ignored_when_not_playing() {
        let session = SharedSession::new(100);
        assert_eq!(session.toggle_pause(), None);
        assert_eq!(session.set_paused(true), None);
        assert!(!session.snapshot().is_paused);
    }

    #[test]
    fn test_pause_toggle_while_playing() {
        let session = SharedSession::new(100);
        session.begin_clip();

        let transition = session.toggle_pause().unwrap();
        assert_eq!(transition.old_state, PlaybackState::Playing);
        assert_eq!(transition.new_state, PlaybackState::Paused);
        assert_eq!(session.playback_state(), PlaybackState::Paused);

        let transition = session.toggle_pause().unwrap();
        assert_eq!(transition.new_state, PlaybackState::Playing);
    }

    #[test]
    fn test_set_paused_is_idempotent() {
        let session = SharedSession::new(100);
        session.begin_clip();
        assert!(session.set_paused(true).is_some());
        assert_eq!(session.set_paused(true), None);
        assert!(session.set_paused(false).is_some());
        assert_eq!(session.set_paused(false), None);
    }

    #[test]
    fn test_begin_clip_clears_stale_requests() {
        let session = SharedSession::new(100);
        session.begin_clip();
        session.toggle_pause();
        session.request_stop();
        session.end_clip();
        session.request_stop();

        session.begin_clip();
        let flags = session.snapshot();
        assert!(flags.is_playing);
        assert!(!flags.is_paused);
        assert!(!flags.stop_requested);
    }

    #[test]
    fn test_end_clip_returns_to_stopped() {
        let session = SharedSession::new(100);
        session.begin_clip();
        session.toggle_pause();
        let transition = session.end_clip();
        assert_eq!(transition.old_state, PlaybackState::Paused);
        assert_eq!(transition.new_state, PlaybackState::Stopped);
    }

    #[test]
    fn test_shutdown_survives_clip_start() {
        let session = SharedSession::new(100);
        session.begin_shutdown();
        session.begin_clip();
        assert!(session.should_stop());
    }
}
