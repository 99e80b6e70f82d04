//! Audio output using cpal
//!
//! Plays clips through the host audio device. PCM bytes written by the
//! engine are converted to f32 and pushed into a lock-free ring buffer that
//! the device callback drains; an empty ring plays silence.
//!
//! `cpal::Stream` is not `Send`, so each configured stream lives on its own
//! keep-alive thread and the sink only holds the ring producer and control
//! flags. Reconfiguring the clock replaces that thread.
//!
//! Samples are expected in little-endian order; the legacy DAC byte swap is
//! meant for I2S hardware and should stay off with this sink.

use super::AudioSink;
use crate::error::SinkError;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use ringbuf::traits::{Consumer, Observer, Producer, Split};
use ringbuf::{HeapCons, HeapProd, HeapRb};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{mpsc, Arc};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Ring capacity expressed as playback time
const RING_DURATION_MS: u64 = 200;

/// Sleep between attempts while the ring is full
const FULL_RING_BACKOFF: Duration = Duration::from_millis(1);

struct StreamThread {
    shutdown: Arc<AtomicBool>,
    handle: JoinHandle<()>,
}

/// Host audio device sink
pub struct CpalSink {
    device_name: Option<String>,
    bit_depth: u16,
    producer: Option<HeapProd<f32>>,
    flush: Arc<AtomicBool>,
    underruns: Arc<AtomicU64>,
    stream: Option<StreamThread>,
}

impl CpalSink {
    /// Sink for the named output device (None = default device)
    pub fn new(device_name: Option<String>) -> Self {
        Self {
            device_name,
            bit_depth: 16,
            producer: None,
            flush: Arc::new(AtomicBool::new(false)),
            underruns: Arc::new(AtomicU64::new(0)),
            stream: None,
        }
    }

    /// List available audio output devices
    pub fn list_devices() -> Result<Vec<String>, SinkError> {
        let host = cpal::default_host();
        let devices: Vec<String> = host
            .output_devices()
            .map_err(|e| SinkError::Device(format!("Failed to enumerate devices: {}", e)))?
            .filter_map(|device| device.name().ok())
            .collect();
        debug!("Found {} output devices", devices.len());
        Ok(devices)
    }

    /// Callbacks that found the ring empty while a stream was running
    pub fn underruns(&self) -> u64 {
        self.underruns.load(Ordering::Relaxed)
    }

    fn find_device(&self) -> Result<cpal::Device, SinkError> {
        let host = cpal::default_host();
        if let Some(name) = self.device_name.as_ref() {
            let mut devices = host
                .output_devices()
                .map_err(|e| SinkError::Device(format!("Failed to enumerate devices: {}", e)))?;
            if let Some(device) = devices.find(|d| d.name().ok().as_ref() == Some(name)) {
                return Ok(device);
            }
            warn!("Requested device '{}' not found, falling back to default device", name);
        }
        host.default_output_device()
            .ok_or_else(|| SinkError::Device("No default output device found".to_string()))
    }

    fn shutdown_stream(&mut self) {
        self.producer = None;
        if let Some(stream) = self.stream.take() {
            stream.shutdown.store(true, Ordering::Release);
            stream.handle.thread().unpark();
            if stream.handle.join().is_err() {
                error!("Audio stream thread panicked");
            }
        }
    }

    fn spawn_stream(
        &mut self,
        sample_rate: u32,
        channels: u16,
        consumer: HeapCons<f32>,
    ) -> Result<(), SinkError> {
        let device = self.find_device()?;
        let device_label = device.name().unwrap_or_else(|_| "Unknown".to_string());
        let config = cpal::StreamConfig {
            channels,
            sample_rate: cpal::SampleRate(sample_rate),
            buffer_size: cpal::BufferSize::Default,
        };

        let shutdown = Arc::new(AtomicBool::new(false));
        let flush = Arc::clone(&self.flush);
        let underruns = Arc::clone(&self.underruns);
        let thread_shutdown = Arc::clone(&shutdown);
        let (ready_tx, ready_rx) = mpsc::sync_channel::<Result<(), SinkError>>(1);

        let handle = thread::Builder::new()
            .name("wavplay-cpal".to_string())
            .spawn(move || {
                let mut consumer = consumer;
                let stream = device.build_output_stream(
                    &config,
                    move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                        if flush.swap(false, Ordering::AcqRel) {
                            consumer.clear();
                        }
                        let n = consumer.pop_slice(data);
                        if n < data.len() {
                            underruns.fetch_add(1, Ordering::Relaxed);
                            data[n..].fill(0.0);
                        }
                    },
                    move |err| {
                        error!("Audio stream error: {}", err);
                    },
                    None,
                );

                let stream = match stream {
                    Ok(stream) => stream,
                    Err(e) => {
                        let _ = ready_tx.send(Err(SinkError::Unsupported(format!(
                            "Failed to build stream: {}",
                            e
                        ))));
                        return;
                    }
                };
                if let Err(e) = stream.play() {
                    let _ = ready_tx.send(Err(SinkError::Device(format!(
                        "Failed to start stream: {}",
                        e
                    ))));
                    return;
                }
                let _ = ready_tx.send(Ok(()));

                // Keep the stream alive until asked to stop
                while !thread_shutdown.load(Ordering::Acquire) {
                    thread::park_timeout(Duration::from_millis(100));
                }
                drop(stream);
            })
            .map_err(|e| SinkError::Device(format!("Failed to spawn stream thread: {}", e)))?;

        let result = ready_rx
            .recv()
            .unwrap_or_else(|_| Err(SinkError::Device("Stream thread exited".to_string())));
        if let Err(e) = result {
            let _ = handle.join();
            return Err(e);
        }

        info!(
            "Audio stream started on '{}': {} Hz, {} ch",
            device_label, sample_rate, channels
        );
        self.stream = Some(StreamThread { shutdown, handle });
        Ok(())
    }
}

fn sample_to_f32(bytes: &[u8], bit_depth: u16) -> f32 {
    match bit_depth {
        8 => (f32::from(bytes[0]) - 128.0) / 128.0,
        _ => f32::from(i16::from_le_bytes([bytes[0], bytes[1]])) / 32768.0,
    }
}

impl AudioSink for CpalSink {
    fn configure_clock(
        &mut self,
        sample_rate: u32,
        bit_depth: u16,
        channels: u16,
    ) -> Result<(), SinkError> {
        if !matches!(bit_depth, 8 | 16) {
            return Err(SinkError::Unsupported(format!("{} bit samples", bit_depth)));
        }
        self.shutdown_stream();
        self.bit_depth = bit_depth;

        let capacity =
            (u64::from(sample_rate) * u64::from(channels) * RING_DURATION_MS / 1000).max(1024);
        let (producer, consumer) = HeapRb::<f32>::new(capacity as usize).split();
        self.spawn_stream(sample_rate, channels, consumer)?;
        self.producer = Some(producer);
        Ok(())
    }

    fn start(&mut self) -> Result<(), SinkError> {
        if self.stream.is_none() {
            return Err(SinkError::Device("Clock not configured".to_string()));
        }
        Ok(())
    }

    fn write(&mut self, buf: &[u8], timeout: Duration) -> Result<usize, SinkError> {
        let producer = self
            .producer
            .as_mut()
            .ok_or_else(|| SinkError::Device("Clock not configured".to_string()))?;

        let width = usize::from(self.bit_depth / 8);
        if buf.len() < width {
            // Dangling partial sample: nothing to play
            return Ok(buf.len());
        }

        let deadline = Instant::now() + timeout;
        let mut consumed = 0;
        let mut samples = buf.chunks_exact(width);
        loop {
            while producer.vacant_len() > 0 {
                match samples.next() {
                    Some(bytes) => {
                        let _ = producer.try_push(sample_to_f32(bytes, self.bit_depth));
                        consumed += width;
                    }
                    None => return Ok(consumed),
                }
            }
            if Instant::now() >= deadline {
                return Ok(consumed);
            }
            thread::sleep(FULL_RING_BACKOFF);
        }
    }

    fn flush_silence(&mut self) -> Result<(), SinkError> {
        self.flush.store(true, Ordering::Release);
        Ok(())
    }

    fn stop(&mut self) -> Result<(), SinkError> {
        info!("Stopping audio stream");
        self.shutdown_stream();
        Ok(())
    }
}

impl Drop for CpalSink {
    fn drop(&mut self) {
        self.shutdown_stream();
    }
}
