//! Hardware sink interface
//!
//! The engine drives exactly one `AudioSink` from `init` to `deinit`. A sink
//! is configured per clip, started, fed transformed PCM bytes with bounded
//! write timeouts, silenced when a clip ends and stopped at shutdown.

mod null;
#[cfg(feature = "cpal-output")]
mod cpal_output;

pub use null::NullSink;
#[cfg(feature = "cpal-output")]
pub use cpal_output::CpalSink;

use crate::error::SinkError;
use std::time::Duration;

/// Audio output peripheral consuming raw PCM bytes
pub trait AudioSink: Send {
    /// Set the output clock and sample format for the next clip
    fn configure_clock(
        &mut self,
        sample_rate: u32,
        bit_depth: u16,
        channels: u16,
    ) -> Result<(), SinkError>;

    /// Begin consuming samples
    fn start(&mut self) -> Result<(), SinkError>;

    /// Hand bytes to the sink, waiting at most `timeout`
    ///
    /// Returns how many bytes were accepted, which may be fewer than
    /// `buf.len()` (including zero on timeout).
    fn write(&mut self, buf: &[u8], timeout: Duration) -> Result<usize, SinkError>;

    /// Discard pending output and emit silence
    fn flush_silence(&mut self) -> Result<(), SinkError>;

    /// Stop consuming samples
    fn stop(&mut self) -> Result<(), SinkError>;
}

impl<S: AudioSink + ?Sized> AudioSink for Box<S> {
    fn configure_clock(
        &mut self,
        sample_rate: u32,
        bit_depth: u16,
        channels: u16,
    ) -> Result<(), SinkError> {
        (**self).configure_clock(sample_rate, bit_depth, channels)
    }

    fn start(&mut self) -> Result<(), SinkError> {
        (**self).start()
    }

    fn write(&mut self, buf: &[u8], timeout: Duration) -> Result<usize, SinkError> {
        (**self).write(buf, timeout)
    }

    fn flush_silence(&mut self) -> Result<(), SinkError> {
        (**self).flush_silence()
    }

    fn stop(&mut self) -> Result<(), SinkError> {
        (**self).stop()
    }
}
