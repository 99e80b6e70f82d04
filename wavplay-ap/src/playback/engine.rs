//! Playback worker
//!
//! One dedicated thread drains the queue and streams each clip into the
//! sink. Per clip:
//!
//! 1. open the backend, re-read the header, program the sink clock
//! 2. mark the session playing, fire the start callback
//! 3. stream chunks (read, scale volume, write) until the payload is
//!    exhausted, the stream ends, a stop is requested or an error occurs
//! 4. silence the sink, close the backend, mark the session stopped,
//!    fire the end callback
//!
//! Stop, pause and volume are sampled once per chunk. While paused the
//! worker sleeps `pause_poll_interval` between checks and keeps its
//! position in the payload.

use super::{BoundedQueue, Callbacks, ClipInfo, ClipOutcome, Dequeue};
use crate::audio::{read_properties, AudioProperties, Backend, SampleTransform};
use crate::config::PlayerConfig;
use crate::error::{BackendError, Result, SinkError};
use crate::sink::AudioSink;
use crate::state::{SharedSession, Transition};
use chrono::Utc;
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, trace, warn};
use wavplay_common::events::{EventBus, FinishReason, PlayerEvent};

/// State shared by the control surface and the worker
pub(crate) struct EngineShared {
    pub queue: BoundedQueue<ClipInfo>,
    pub session: SharedSession,
    pub callbacks: Mutex<Callbacks>,
    pub events: EventBus,
}

impl EngineShared {
    pub fn new(config: &PlayerConfig) -> Self {
        Self {
            queue: BoundedQueue::new(config.queue_len),
            session: SharedSession::new(config.initial_volume),
            callbacks: Mutex::new(Callbacks::default()),
            events: EventBus::new(config.event_capacity),
        }
    }

    /// Copy of the registered callbacks; the lock is released on return
    pub fn callbacks(&self) -> Callbacks {
        self.callbacks
            .lock()
            .unwrap_or_else(|poisoned| {
                warn!("Callback registry lock was poisoned, recovering");
                PoisonError::into_inner(poisoned)
            })
            .clone()
    }

    pub fn update_callbacks(&self, update: impl FnOnce(&mut Callbacks)) {
        let mut callbacks = self
            .callbacks
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        update(&mut callbacks);
    }

    pub fn emit_transition(&self, transition: Transition) {
        if transition.old_state == transition.new_state {
            return;
        }
        debug!(
            "Playback state: {} -> {}",
            transition.old_state, transition.new_state
        );
        self.events.emit_lossy(PlayerEvent::StateChanged {
            old_state: transition.old_state,
            new_state: transition.new_state,
            timestamp: Utc::now(),
        });
    }
}

/// The consumer side of the queue, run on its own thread
pub(crate) struct PlaybackWorker<S: AudioSink> {
    shared: Arc<EngineShared>,
    sink: S,
    config: PlayerConfig,
}

impl<S: AudioSink> PlaybackWorker<S> {
    pub fn new(shared: Arc<EngineShared>, sink: S, config: PlayerConfig) -> Self {
        Self {
            shared,
            sink,
            config,
        }
    }

    /// Drain the queue until it is closed or shutdown is requested
    pub fn run(mut self) {
        debug!(
            "Playback worker started (queue_len={}, chunk_size={})",
            self.config.queue_len, self.config.chunk_size
        );
        let mut buffer = vec![0u8; self.config.chunk_size];

        loop {
            match self.shared.queue.pop_timeout(self.config.dequeue_timeout) {
                Dequeue::Item(clip) => self.play_clip(clip, &mut buffer),
                Dequeue::TimedOut => {
                    if self.shared.session.is_shutting_down() {
                        debug!("Playback worker received shutdown signal");
                        break;
                    }
                }
                Dequeue::Closed => {
                    debug!("Playback queue closed");
                    break;
                }
            }
        }

        if let Err(e) = self.sink.stop() {
            warn!("Failed to stop audio sink: {}", e);
        }
        debug!("Playback worker exited");
    }

    fn play_clip(&mut self, clip: ClipInfo, buffer: &mut [u8]) {
        debug!("Dequeued clip {} ({})", clip.id, clip.source);

        let (mut backend, properties) = match self.prepare(&clip) {
            Ok(prepared) => prepared,
            Err(e) => {
                error!("Failed to start clip {} ({}): {}", clip.id, clip.source, e);
                self.shared.events.emit_lossy(PlayerEvent::ClipFailed {
                    clip_id: clip.id,
                    error: e.to_string(),
                    timestamp: Utc::now(),
                });
                return;
            }
        };
        let clip = ClipInfo { properties, ..clip };

        let transition = self.shared.session.begin_clip();
        self.shared.emit_transition(transition);
        info!(
            "Playing clip {} ({}): {} Hz, {} bit, {} ch, {} bytes ({:.2}s)",
            clip.id,
            clip.source,
            properties.sample_rate,
            properties.bit_depth,
            properties.channels,
            properties.payload_len,
            properties.duration().as_secs_f64()
        );

        if let Some(on_start) = self.shared.callbacks().on_start {
            on_start(&clip);
        }
        self.shared.events.emit_lossy(PlayerEvent::ClipStarted {
            clip_id: clip.id,
            format: properties.clip_format(),
            timestamp: Utc::now(),
        });

        let started = Instant::now();
        let outcome = self.stream(&mut backend, &properties, buffer);

        if let Err(e) = self.sink.flush_silence() {
            warn!("Failed to silence audio sink: {}", e);
        }
        backend.close();

        let transition = self.shared.session.end_clip();
        self.shared.emit_transition(transition);

        match outcome.reason {
            FinishReason::Failed => error!(
                "Clip {} failed after {} bytes: {}",
                clip.id,
                outcome.bytes_written,
                outcome.error.as_deref().unwrap_or("unknown error")
            ),
            reason => info!(
                "Clip {} finished ({:?}): {} bytes in {:.2}s",
                clip.id,
                reason,
                outcome.bytes_written,
                started.elapsed().as_secs_f64()
            ),
        }

        if let Some(on_end) = self.shared.callbacks().on_end {
            on_end(&clip, &outcome);
        }
        self.shared.events.emit_lossy(PlayerEvent::ClipFinished {
            clip_id: clip.id,
            reason: outcome.reason,
            bytes_written: outcome.bytes_written,
            timestamp: Utc::now(),
        });
    }

    /// Open the clip and program the sink; nothing is audible yet
    fn prepare(&mut self, clip: &ClipInfo) -> Result<(Backend, AudioProperties)> {
        let mut backend = Backend::from_source(&clip.source);
        backend.open()?;
        let properties = read_properties(&mut backend)?;
        self.sink.configure_clock(
            properties.sample_rate,
            properties.bit_depth,
            properties.channels,
        )?;
        self.sink.start()?;
        Ok((backend, properties))
    }

    fn stream(
        &mut self,
        backend: &mut Backend,
        properties: &AudioProperties,
        buffer: &mut [u8],
    ) -> ClipOutcome {
        let transform = SampleTransform::new(properties.bit_depth, self.config.legacy_dac_mode);
        let sample_width = usize::from(properties.bit_depth / 8).max(1);
        let mut remaining = u64::from(properties.payload_len);
        let mut written = 0u64;
        let mut paused_at: Option<Instant> = None;

        loop {
            if remaining == 0 {
                return ClipOutcome::finished(FinishReason::Completed, written);
            }

            if self.shared.session.should_stop() {
                debug!("Stop requested at payload offset {}", written);
                return ClipOutcome::finished(FinishReason::Stopped, written);
            }
            let flags = self.shared.session.snapshot();
            if flags.is_paused {
                if paused_at.is_none() {
                    debug!("Paused at payload offset {}", written);
                    paused_at = Some(Instant::now());
                }
                thread::sleep(self.config.pause_poll_interval);
                continue;
            }
            if let Some(since) = paused_at.take() {
                debug!(
                    "Resumed at payload offset {} after {:.2}s",
                    written,
                    since.elapsed().as_secs_f64()
                );
            }

            let want = usize::try_from(remaining).map_or(buffer.len(), |r| r.min(buffer.len()));
            let chunk = &mut buffer[..want];
            let read = read_whole_samples(|buf| backend.read(buf), chunk, sample_width);
            let read = match read {
                Ok(0) => {
                    debug!("End of stream with {} payload bytes outstanding", remaining);
                    return ClipOutcome::finished(FinishReason::EndOfStream, written);
                }
                Ok(n) => n,
                Err(e) => return ClipOutcome::failed(written, e),
            };
            if read < want {
                trace!("Short read: {} of {} bytes", read, want);
            }

            let chunk = &mut chunk[..read];
            transform.apply(chunk, flags.volume);

            let (accepted, result) = write_all(
                &mut self.sink,
                chunk,
                self.config.write_timeout,
                self.config.max_write_retries,
            );
            written += accepted as u64;
            remaining = remaining.saturating_sub(accepted as u64);
            if let Err(e) = result {
                return ClipOutcome::failed(written, e);
            }
        }
    }
}

/// Fill the front of `chunk` with a whole number of samples
///
/// A short read that splits a sample is followed by further reads until the
/// sample is complete, so sample boundaries stay aligned with the chunk.
/// Only end-of-stream (or the end of `chunk`) leaves a dangling byte.
/// Returns 0 at end-of-stream.
pub(crate) fn read_whole_samples<F>(
    mut read: F,
    chunk: &mut [u8],
    sample_width: usize,
) -> std::result::Result<usize, BackendError>
where
    F: FnMut(&mut [u8]) -> std::result::Result<usize, BackendError>,
{
    let mut filled = read(chunk)?;
    while filled > 0 && filled % sample_width != 0 && filled < chunk.len() {
        match read(&mut chunk[filled..])? {
            0 => {
                debug!("End of stream inside a sample after {} bytes", filled);
                break;
            }
            n => filled += n,
        }
    }
    Ok(filled)
}

/// Push all of `chunk` into the sink
///
/// Partial writes are retried from where they stopped. `max_retries`
/// consecutive writes that accept nothing abort with `SinkError::Stalled`.
/// Returns the bytes accepted either way.
pub(crate) fn write_all<S: AudioSink + ?Sized>(
    sink: &mut S,
    chunk: &[u8],
    timeout: Duration,
    max_retries: u32,
) -> (usize, std::result::Result<(), SinkError>) {
    let mut accepted = 0;
    let mut idle_writes = 0;

    while accepted < chunk.len() {
        match sink.write(&chunk[accepted..], timeout) {
            Ok(0) => {
                idle_writes += 1;
                trace!("Sink accepted nothing ({}/{})", idle_writes, max_retries);
                if idle_writes >= max_retries {
                    return (accepted, Err(SinkError::Stalled(timeout * max_retries)));
                }
            }
            Ok(n) => {
                accepted += n;
                idle_writes = 0;
            }
            Err(e) => return (accepted, Err(e)),
        }
    }
    (accepted, Ok(()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    /// Sink that replays a script of write results
    struct ScriptedSink {
        script: VecDeque<usize>,
        received: Vec<u8>,
    }

    impl ScriptedSink {
        fn new(script: &[usize]) -> Self {
            Self {
                script: script.iter().copied().collect(),
                received: Vec::new(),
            }
        }
    }

    impl AudioSink for ScriptedSink {
        fn configure_clock(&mut self, _: u32, _: u16, _: u16) -> std::result::Result<(), SinkError> {
            Ok(())
        }

        fn start(&mut self) -> std::result::Result<(), SinkError> {
            Ok(())
        }

        fn write(&mut self, buf: &[u8], _: Duration) -> std::result::Result<usize, SinkError> {
            let n = self.script.pop_front().unwrap_or(buf.len()).min(buf.len());
            self.received.extend_from_slice(&buf[..n]);
            Ok(n)
        }

        fn flush_silence(&mut self) -> std::result::Result<(), SinkError> {
            Ok(())
        }

        fn stop(&mut self) -> std::result::Result<(), SinkError> {
            Ok(())
        }
    }

    /// Reader that returns at most the scripted byte counts from `data`
    fn scripted_reader(
        data: Vec<u8>,
        script: &[usize],
    ) -> impl FnMut(&mut [u8]) -> std::result::Result<usize, BackendError> {
        let mut script: VecDeque<usize> = script.iter().copied().collect();
        let mut pos = 0;
        move |buf| {
            let limit = script.pop_front().unwrap_or(buf.len());
            let n = limit.min(buf.len()).min(data.len() - pos);
            buf[..n].copy_from_slice(&data[pos..pos + n]);
            pos += n;
            Ok(n)
        }
    }

    #[test]
    fn test_odd_short_read_keeps_samples_aligned() {
        let data: Vec<u8> = 1000i16.to_le_bytes().repeat(8);
        let mut read = scripted_reader(data, &[3, 1, 5]);
        let transform = SampleTransform::new(16, false);
        let mut buffer = [0u8; 16];
        let mut output = Vec::new();

        loop {
            let n = read_whole_samples(&mut read, &mut buffer, 2).unwrap();
            if n == 0 {
                break;
            }
            assert_eq!(n % 2, 0, "split sample in a {}-byte chunk", n);
            transform.apply(&mut buffer[..n], 50);
            output.extend_from_slice(&buffer[..n]);
        }

        let samples: Vec<i16> = output
            .chunks_exact(2)
            .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
            .collect();
        assert_eq!(samples, vec![500; 8]);
    }

    #[test]
    fn test_dangling_byte_at_end_of_stream() {
        let mut read = scripted_reader(vec![1, 2, 3], &[3]);
        let mut buffer = [0u8; 8];
        assert_eq!(read_whole_samples(&mut read, &mut buffer, 2).unwrap(), 3);
        assert_eq!(read_whole_samples(&mut read, &mut buffer, 2).unwrap(), 0);
    }

    #[test]
    fn test_8bit_short_reads_need_no_topping_up() {
        let mut read = scripted_reader(vec![7; 10], &[3]);
        let mut buffer = [0u8; 8];
        assert_eq!(read_whole_samples(&mut read, &mut buffer, 1).unwrap(), 3);
    }

    #[test]
    fn test_write_all_retries_partial_writes() {
        let mut sink = ScriptedSink::new(&[3, 0, 2, 5]);
        let chunk: Vec<u8> = (0..10).collect();

        let (accepted, result) = write_all(&mut sink, &chunk, Duration::from_millis(1), 3);
        assert!(result.is_ok());
        assert_eq!(accepted, 10);
        assert_eq!(sink.received, chunk);
    }

    #[test]
    fn test_write_all_gives_up_on_stalled_sink() {
        let mut sink = ScriptedSink::new(&[4, 0, 0, 0]);
        let chunk = [0u8; 8];

        let (accepted, result) = write_all(&mut sink, &chunk, Duration::from_millis(10), 3);
        assert_eq!(accepted, 4);
        match result {
            Err(SinkError::Stalled(window)) => assert_eq!(window, Duration::from_millis(30)),
            other => panic!("expected stall, got {:?}", other),
        }
    }

    #[test]
    fn test_progress_resets_stall_counter() {
        // Two idle writes, progress, two more idle writes: never three in a row
        let mut sink = ScriptedSink::new(&[0, 0, 1, 0, 0, 1]);
        let (accepted, result) = write_all(&mut sink, &[1, 2], Duration::from_millis(1), 3);
        assert!(result.is_ok());
        assert_eq!(accepted, 2);
    }
}
