//! WAV fixture generation
//!
//! hound writes real files for the filesystem backend. `wav_bytes` builds
//! in-memory images with an exact, hand-chosen header for the embedded
//! backend.

use hound::{SampleFormat, WavSpec, WavWriter};
use std::f32::consts::PI;
use std::path::Path;
use wavplay_ap::audio::WavHeader;

/// Write `duration_ms` of silence
pub fn generate_silent_wav<P: AsRef<Path>>(
    path: P,
    channels: u16,
    sample_rate: u32,
    bits_per_sample: u16,
    duration_ms: u64,
) -> Result<(), hound::Error> {
    let spec = WavSpec {
        channels,
        sample_rate,
        bits_per_sample,
        sample_format: SampleFormat::Int,
    };
    let mut writer = WavWriter::create(path, spec)?;

    let total_samples = u64::from(sample_rate) * duration_ms / 1000 * u64::from(channels);
    for _ in 0..total_samples {
        match bits_per_sample {
            8 => writer.write_sample(0i8)?,
            _ => writer.write_sample(0i16)?,
        }
    }

    writer.finalize()?;
    Ok(())
}

/// Write a mono 16-bit sine wave
pub fn generate_sine_wav<P: AsRef<Path>>(
    path: P,
    sample_rate: u32,
    duration_ms: u64,
    frequency_hz: f32,
    amplitude: f32,
) -> Result<(), hound::Error> {
    let spec = WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };
    let mut writer = WavWriter::create(path, spec)?;

    let total_frames = u64::from(sample_rate) * duration_ms / 1000;
    let peak = amplitude * f32::from(i16::MAX);
    for frame in 0..total_frames {
        let t = frame as f32 / sample_rate as f32;
        writer.write_sample(((2.0 * PI * frequency_hz * t).sin() * peak) as i16)?;
    }

    writer.finalize()?;
    Ok(())
}

/// Header followed by `payload`, as a file would hold it
pub fn wav_bytes(channels: u16, sample_rate: u32, bit_depth: u16, payload: &[u8]) -> Vec<u8> {
    let header = WavHeader::pcm(channels, sample_rate, bit_depth, payload.len() as u32);
    let mut bytes = header.to_bytes().to_vec();
    bytes.extend_from_slice(payload);
    bytes
}

/// Deterministic, non-repeating-per-chunk byte pattern
pub fn pattern_payload(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i * 7 % 251) as u8).collect()
}

/// Give `bytes` a static lifetime for the embedded backend
pub fn leak(bytes: Vec<u8>) -> &'static [u8] {
    Box::leak(bytes.into_boxed_slice())
}
