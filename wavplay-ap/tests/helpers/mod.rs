//! Test helper modules for wavplay-ap integration tests
//!
//! - audio_generator: WAV fixtures (hound files and hand-built byte images)
//! - audio_capture: sinks that record or refuse what the engine writes

#![allow(dead_code)]

pub mod audio_capture;
pub mod audio_generator;

pub use audio_capture::{RecordingSink, StalledSink};
pub use audio_generator::{
    generate_silent_wav, generate_sine_wav, leak, pattern_payload, wav_bytes,
};

use std::thread;
use std::time::{Duration, Instant};

/// Poll `condition` every few milliseconds until it holds or `timeout` passes
pub fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    loop {
        if condition() {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        thread::sleep(Duration::from_millis(2));
    }
}
