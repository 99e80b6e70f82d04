//! Capturing sinks for integration tests
//!
//! The engine owns its sink, so `RecordingSink` keeps its recording behind
//! an `Arc`; the test holds a clone and inspects it while playback runs.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;
use wavplay_ap::error::SinkError;
use wavplay_ap::sink::AudioSink;

/// Clock parameters handed to `configure_clock`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClockConfig {
    pub sample_rate: u32,
    pub bit_depth: u16,
    pub channels: u16,
}

#[derive(Debug, Default)]
struct Recording {
    bytes: Vec<u8>,
    clocks: Vec<ClockConfig>,
    silences: usize,
    stops: usize,
}

/// Sink that keeps every byte written to it
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    recording: Arc<Mutex<Recording>>,
    write_delay: Option<Duration>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sleep `delay` in every write, so a clip takes a predictable time
    pub fn throttled(delay: Duration) -> Self {
        Self {
            write_delay: Some(delay),
            ..Self::default()
        }
    }

    pub fn bytes(&self) -> Vec<u8> {
        self.recording.lock().unwrap().bytes.clone()
    }

    pub fn len(&self) -> usize {
        self.recording.lock().unwrap().bytes.len()
    }

    pub fn clocks(&self) -> Vec<ClockConfig> {
        self.recording.lock().unwrap().clocks.clone()
    }

    pub fn silences(&self) -> usize {
        self.recording.lock().unwrap().silences
    }

    pub fn stops(&self) -> usize {
        self.recording.lock().unwrap().stops
    }
}

impl AudioSink for RecordingSink {
    fn configure_clock(
        &mut self,
        sample_rate: u32,
        bit_depth: u16,
        channels: u16,
    ) -> Result<(), SinkError> {
        self.recording.lock().unwrap().clocks.push(ClockConfig {
            sample_rate,
            bit_depth,
            channels,
        });
        Ok(())
    }

    fn start(&mut self) -> Result<(), SinkError> {
        Ok(())
    }

    fn write(&mut self, buf: &[u8], _timeout: Duration) -> Result<usize, SinkError> {
        if let Some(delay) = self.write_delay {
            thread::sleep(delay);
        }
        self.recording.lock().unwrap().bytes.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush_silence(&mut self) -> Result<(), SinkError> {
        self.recording.lock().unwrap().silences += 1;
        Ok(())
    }

    fn stop(&mut self) -> Result<(), SinkError> {
        self.recording.lock().unwrap().stops += 1;
        Ok(())
    }
}

/// Sink that never accepts a byte
#[derive(Debug, Clone, Default)]
pub struct StalledSink {
    silences: Arc<AtomicUsize>,
}

impl StalledSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn silences(&self) -> usize {
        self.silences.load(Ordering::SeqCst)
    }
}

impl AudioSink for StalledSink {
    fn configure_clock(&mut self, _: u32, _: u16, _: u16) -> Result<(), SinkError> {
        Ok(())
    }

    fn start(&mut self) -> Result<(), SinkError> {
        Ok(())
    }

    fn write(&mut self, _buf: &[u8], timeout: Duration) -> Result<usize, SinkError> {
        thread::sleep(timeout);
        Ok(0)
    }

    fn flush_silence(&mut self) -> Result<(), SinkError> {
        self.silences.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn stop(&mut self) -> Result<(), SinkError> {
        Ok(())
    }
}
