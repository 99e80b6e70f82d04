//! Sink that discards audio
//!
//! Useful headless and in tests. With pacing enabled it sleeps for the
//! playback time of every accepted byte, so chunk timing (and therefore
//! stop/pause latency) behaves like a real clocked peripheral.

use super::AudioSink;
use crate::error::SinkError;
use std::thread;
use std::time::Duration;
use tracing::debug;

/// Discarding sink with optional real-time pacing
#[derive(Debug, Default)]
pub struct NullSink {
    realtime: bool,
    byte_rate: u64,
    running: bool,
    bytes_accepted: u64,
}

impl NullSink {
    /// Sink that accepts every byte immediately
    pub fn new() -> Self {
        Self::default()
    }

    /// Sink that accepts bytes at the configured clip byte rate
    pub fn realtime() -> Self {
        Self {
            realtime: true,
            ..Self::default()
        }
    }

    /// Total bytes accepted since creation
    pub fn bytes_accepted(&self) -> u64 {
        self.bytes_accepted
    }
}

impl AudioSink for NullSink {
    fn configure_clock(
        &mut self,
        sample_rate: u32,
        bit_depth: u16,
        channels: u16,
    ) -> Result<(), SinkError> {
        self.byte_rate =
            u64::from(sample_rate) * u64::from(channels) * u64::from(bit_depth / 8).max(1);
        debug!(
            "Null sink clock: {} Hz, {} bit, {} ch ({} B/s)",
            sample_rate, bit_depth, channels, self.byte_rate
        );
        Ok(())
    }

    fn start(&mut self) -> Result<(), SinkError> {
        self.running = true;
        Ok(())
    }

    fn write(&mut self, buf: &[u8], timeout: Duration) -> Result<usize, SinkError> {
        let accepted = if self.realtime && self.byte_rate > 0 {
            let budget = (timeout.as_secs_f64() * self.byte_rate as f64) as usize;
            let n = buf.len().min(budget.max(1));
            thread::sleep(Duration::from_secs_f64(n as f64 / self.byte_rate as f64));
            n
        } else {
            buf.len()
        };
        self.bytes_accepted += accepted as u64;
        Ok(accepted)
    }

    fn flush_silence(&mut self) -> Result<(), SinkError> {
        Ok(())
    }

    fn stop(&mut self) -> Result<(), SinkError> {
        self.running = false;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[test]
    fn test_unpaced_accepts_everything() {
        let mut sink = NullSink::new();
        sink.configure_clock(8000, 8, 1).unwrap();
        sink.start().unwrap();
        assert_eq!(sink.write(&[0u8; 4096], Duration::from_millis(1)).unwrap(), 4096);
        assert_eq!(sink.bytes_accepted(), 4096);
    }

    #[test]
    fn test_realtime_is_bounded_by_timeout() {
        let mut sink = NullSink::realtime();
        // 8000 B/s: a 10ms timeout allows 80 bytes
        sink.configure_clock(8000, 8, 1).unwrap();
        sink.start().unwrap();

        let started = Instant::now();
        let n = sink.write(&[0u8; 8000], Duration::from_millis(10)).unwrap();
        assert_eq!(n, 80);
        assert!(started.elapsed() >= Duration::from_millis(9));
    }
}
