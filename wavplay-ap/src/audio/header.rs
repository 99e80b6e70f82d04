//! WAV/RIFF header codec
//!
//! Parses the fixed 44-byte canonical header and validates it in a fixed
//! order: RIFF tag, WAVE tag, fmt tag, PCM format code, sample rate range,
//! data tag, bit depth. The first failing check is reported; nothing is
//! populated on failure.
//!
//! Layout (all integers little-endian):
//!
//! | offset | size | field                  |
//! |--------|------|------------------------|
//! | 0      | 4    | "RIFF"                 |
//! | 4      | 4    | file size - 8          |
//! | 8      | 4    | "WAVE"                 |
//! | 12     | 4    | "fmt "                 |
//! | 16     | 4    | fmt chunk size         |
//! | 20     | 2    | audio format (1 = PCM) |
//! | 22     | 2    | channels               |
//! | 24     | 4    | sample rate            |
//! | 28     | 4    | byte rate              |
//! | 32     | 2    | block align            |
//! | 34     | 2    | bits per sample        |
//! | 36     | 4    | "data"                 |
//! | 40     | 4    | payload byte length    |

use crate::audio::Backend;
use crate::error::{ClipError, HeaderError};
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, warn};
use wavplay_common::events::ClipFormat;

/// Size of the fixed header structure
pub const HEADER_SIZE: usize = 44;

/// Offset the payload is streamed from
///
/// The 8 extra bytes account for the data-chunk tag and length that sit
/// outside the fixed structure in the container convention this player
/// follows.
pub const PAYLOAD_START: u64 = HEADER_SIZE as u64 + 8;

/// Linear PCM format code
pub const FORMAT_PCM: u16 = 1;

/// Lowest accepted sample rate (Hz)
pub const MIN_SAMPLE_RATE: u32 = 8000;

/// Highest accepted sample rate (Hz)
pub const MAX_SAMPLE_RATE: u32 = 44100;

/// Raw header fields, decoded but not validated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WavHeader {
    pub riff_tag: [u8; 4],
    pub riff_size: u32,
    pub wave_tag: [u8; 4],
    pub fmt_tag: [u8; 4],
    pub fmt_chunk_size: u32,
    pub audio_format: u16,
    pub num_channels: u16,
    pub sample_rate: u32,
    pub byte_rate: u32,
    pub block_align: u16,
    pub bit_depth: u16,
    pub data_tag: [u8; 4],
    pub data_bytes: u32,
}

/// Audio format properties of a validated clip
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AudioProperties {
    pub channels: u16,
    pub sample_rate: u32,
    pub byte_rate: u32,
    /// Bytes per multi-channel sample frame
    pub block_align: u16,
    pub bit_depth: u16,
    /// Payload length in bytes as declared by the data chunk
    pub payload_len: u32,
    /// Offset the payload is streamed from
    pub payload_start: u64,
}

fn tag(bytes: &[u8; HEADER_SIZE], at: usize) -> [u8; 4] {
    [bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]]
}

fn le_u16(bytes: &[u8; HEADER_SIZE], at: usize) -> u16 {
    u16::from_le_bytes([bytes[at], bytes[at + 1]])
}

fn le_u32(bytes: &[u8; HEADER_SIZE], at: usize) -> u32 {
    u32::from_le_bytes(tag(bytes, at))
}

impl WavHeader {
    /// Canonical PCM header for the given format and payload length
    pub fn pcm(num_channels: u16, sample_rate: u32, bit_depth: u16, data_bytes: u32) -> Self {
        let block_align = num_channels.saturating_mul(bit_depth / 8);
        Self {
            riff_tag: *b"RIFF",
            riff_size: data_bytes.saturating_add(HEADER_SIZE as u32 - 8),
            wave_tag: *b"WAVE",
            fmt_tag: *b"fmt ",
            fmt_chunk_size: 16,
            audio_format: FORMAT_PCM,
            num_channels,
            sample_rate,
            byte_rate: sample_rate.saturating_mul(u32::from(block_align)),
            block_align,
            bit_depth,
            data_tag: *b"data",
            data_bytes,
        }
    }

    /// Decode the fixed structure
    pub fn from_bytes(bytes: &[u8; HEADER_SIZE]) -> Self {
        Self {
            riff_tag: tag(bytes, 0),
            riff_size: le_u32(bytes, 4),
            wave_tag: tag(bytes, 8),
            fmt_tag: tag(bytes, 12),
            fmt_chunk_size: le_u32(bytes, 16),
            audio_format: le_u16(bytes, 20),
            num_channels: le_u16(bytes, 22),
            sample_rate: le_u32(bytes, 24),
            byte_rate: le_u32(bytes, 28),
            block_align: le_u16(bytes, 32),
            bit_depth: le_u16(bytes, 34),
            data_tag: tag(bytes, 36),
            data_bytes: le_u32(bytes, 40),
        }
    }

    /// Encode the fixed structure
    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut out = [0u8; HEADER_SIZE];
        out[0..4].copy_from_slice(&self.riff_tag);
        out[4..8].copy_from_slice(&self.riff_size.to_le_bytes());
        out[8..12].copy_from_slice(&self.wave_tag);
        out[12..16].copy_from_slice(&self.fmt_tag);
        out[16..20].copy_from_slice(&self.fmt_chunk_size.to_le_bytes());
        out[20..22].copy_from_slice(&self.audio_format.to_le_bytes());
        out[22..24].copy_from_slice(&self.num_channels.to_le_bytes());
        out[24..28].copy_from_slice(&self.sample_rate.to_le_bytes());
        out[28..32].copy_from_slice(&self.byte_rate.to_le_bytes());
        out[32..34].copy_from_slice(&self.block_align.to_le_bytes());
        out[34..36].copy_from_slice(&self.bit_depth.to_le_bytes());
        out[36..40].copy_from_slice(&self.data_tag);
        out[40..44].copy_from_slice(&self.data_bytes.to_le_bytes());
        out
    }

    /// Run every check in order and derive the audio properties
    pub fn validate(&self) -> Result<AudioProperties, HeaderError> {
        if &self.riff_tag != b"RIFF" {
            return Err(HeaderError::BadRiffTag);
        }
        if &self.wave_tag != b"WAVE" {
            return Err(HeaderError::BadWaveTag);
        }
        if &self.fmt_tag != b"fmt " {
            return Err(HeaderError::BadFmtTag);
        }
        if self.audio_format != FORMAT_PCM {
            return Err(HeaderError::UnsupportedFormat(self.audio_format));
        }
        if !(MIN_SAMPLE_RATE..=MAX_SAMPLE_RATE).contains(&self.sample_rate) {
            return Err(HeaderError::SampleRateOutOfRange(self.sample_rate));
        }
        if &self.data_tag != b"data" {
            return Err(HeaderError::BadDataTag);
        }
        if !matches!(self.bit_depth, 8 | 16) {
            return Err(HeaderError::UnsupportedBitDepth(self.bit_depth));
        }

        Ok(AudioProperties {
            channels: self.num_channels,
            sample_rate: self.sample_rate,
            byte_rate: self.byte_rate,
            block_align: self.block_align,
            bit_depth: self.bit_depth,
            payload_len: self.data_bytes,
            payload_start: PAYLOAD_START,
        })
    }
}

/// Parse and validate a header from raw bytes
///
/// Only the first `HEADER_SIZE` bytes are examined.
pub fn parse(bytes: &[u8]) -> Result<AudioProperties, HeaderError> {
    let fixed: &[u8; HEADER_SIZE] = bytes
        .get(..HEADER_SIZE)
        .and_then(|b| b.try_into().ok())
        .ok_or(HeaderError::Truncated {
            expected: HEADER_SIZE,
            got: bytes.len(),
        })?;
    WavHeader::from_bytes(fixed).validate()
}

/// Read the header from an open backend positioned at offset 0
///
/// On success the backend is left positioned at `payload_start`.
pub fn read_properties(backend: &mut Backend) -> Result<AudioProperties, ClipError> {
    let mut buf = [0u8; HEADER_SIZE];
    let got = backend.read_full(&mut buf)?;
    if got != HEADER_SIZE {
        warn!("WAV header truncated: {} of {} bytes", got, HEADER_SIZE);
        return Err(HeaderError::Truncated {
            expected: HEADER_SIZE,
            got,
        }
        .into());
    }

    let props = parse(&buf).inspect_err(|e| warn!("WAV header rejected: {}", e))?;

    debug!(
        "WAV header: channels={}, sample_rate={}, byte_rate={}, block_align={}, bit_depth={}, data_bytes={}",
        props.channels,
        props.sample_rate,
        props.byte_rate,
        props.block_align,
        props.bit_depth,
        props.payload_len
    );

    backend.seek(props.payload_start)?;
    Ok(props)
}

impl AudioProperties {
    /// Playback time of the declared payload
    pub fn duration(&self) -> Duration {
        self.bytes_duration(u64::from(self.payload_len))
    }

    /// Playback time of `bytes` payload bytes at this format's byte rate
    pub fn bytes_duration(&self, bytes: u64) -> Duration {
        let rate = self.effective_byte_rate();
        if rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(bytes as f64 / rate as f64)
    }

    /// Byte rate derived from the format fields
    ///
    /// The declared `byte_rate` is informational only; some encoders write
    /// garbage there.
    pub fn effective_byte_rate(&self) -> u64 {
        u64::from(self.sample_rate) * u64::from(self.channels) * u64::from(self.bit_depth / 8)
    }

    /// Format summary carried in player events
    pub fn clip_format(&self) -> ClipFormat {
        ClipFormat {
            channels: self.channels,
            sample_rate: self.sample_rate,
            bit_depth: self.bit_depth,
            payload_bytes: self.payload_len,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_header() -> WavHeader {
        WavHeader::pcm(1, 22050, 16, 44100)
    }

    #[test]
    fn test_valid_header_parses() {
        let props = parse(&valid_header().to_bytes()).unwrap();
        assert_eq!(props.channels, 1);
        assert_eq!(props.sample_rate, 22050);
        assert_eq!(props.bit_depth, 16);
        assert_eq!(props.block_align, 2);
        assert_eq!(props.byte_rate, 44100);
        assert_eq!(props.payload_len, 44100);
        assert_eq!(props.payload_start, HEADER_SIZE as u64 + 8);
        assert_eq!(props.duration(), Duration::from_secs(1));
    }

    #[test]
    fn test_sample_rate_bounds_inclusive() {
        for rate in [MIN_SAMPLE_RATE, 11025, 16000, 32000, MAX_SAMPLE_RATE] {
            for (channels, depth) in [(1, 8), (2, 8), (1, 16), (2, 16)] {
                let header = WavHeader::pcm(channels, rate, depth, 1000);
                let props = header.validate().unwrap();
                assert_eq!(props.sample_rate, rate);
                assert_eq!(props.payload_start, PAYLOAD_START);
            }
        }
    }

    #[test]
    fn test_sample_rate_out_of_range() {
        for rate in [0, MIN_SAMPLE_RATE - 1, MAX_SAMPLE_RATE + 1, 48000, 96000] {
            let header = WavHeader { sample_rate: rate, ..valid_header() };
            assert_eq!(
                header.validate(),
                Err(HeaderError::SampleRateOutOfRange(rate))
            );
        }
    }

    #[test]
    fn test_non_pcm_format_rejected() {
        // 3 = IEEE float, 0xFFFE = extensible
        for format in [0u16, 2, 3, 0xFFFE] {
            let header = WavHeader { audio_format: format, ..valid_header() };
            assert_eq!(header.validate(), Err(HeaderError::UnsupportedFormat(format)));
        }
    }

    #[test]
    fn test_each_corrupted_tag_reported() {
        let cases: [(usize, HeaderError); 4] = [
            (0, HeaderError::BadRiffTag),
            (8, HeaderError::BadWaveTag),
            (12, HeaderError::BadFmtTag),
            (36, HeaderError::BadDataTag),
        ];
        for (offset, expected) in cases {
            let mut bytes = valid_header().to_bytes();
            bytes[offset] ^= 0x20;
            assert_eq!(parse(&bytes), Err(expected));
        }
    }

    #[test]
    fn test_checks_run_in_order() {
        // Bad RIFF wins over a bad sample rate and format
        let header = WavHeader {
            riff_tag: *b"RIFX",
            audio_format: 3,
            sample_rate: 96000,
            ..valid_header()
        };
        assert_eq!(header.validate(), Err(HeaderError::BadRiffTag));

        // Format is checked before sample rate
        let header = WavHeader {
            audio_format: 3,
            sample_rate: 96000,
            ..valid_header()
        };
        assert_eq!(header.validate(), Err(HeaderError::UnsupportedFormat(3)));
    }

    #[test]
    fn test_unsupported_bit_depth() {
        for depth in [0u16, 12, 24, 32] {
            let header = WavHeader { bit_depth: depth, ..valid_header() };
            assert_eq!(header.validate(), Err(HeaderError::UnsupportedBitDepth(depth)));
        }
    }

    #[test]
    fn test_truncated_input() {
        let bytes = valid_header().to_bytes();
        assert_eq!(
            parse(&bytes[..20]),
            Err(HeaderError::Truncated { expected: HEADER_SIZE, got: 20 })
        );
    }

    #[test]
    fn test_header_byte_layout() {
        let bytes = WavHeader::pcm(2, 44100, 16, 1000).to_bytes();
        assert_eq!(&bytes[0..4], b"RIFF");
        assert_eq!(u32::from_le_bytes(bytes[4..8].try_into().unwrap()), 1036);
        assert_eq!(&bytes[8..16], b"WAVEfmt ");
        assert_eq!(u16::from_le_bytes([bytes[20], bytes[21]]), 1);
        assert_eq!(u32::from_le_bytes(bytes[28..32].try_into().unwrap()), 176_400);
        assert_eq!(u16::from_le_bytes([bytes[32], bytes[33]]), 4);
        assert_eq!(&bytes[36..40], b"data");
        assert_eq!(WavHeader::from_bytes(&bytes), WavHeader::pcm(2, 44100, 16, 1000));
    }

    #[test]
    fn test_pcm_constructor_saturates_extreme_formats() {
        let header = WavHeader::pcm(u16::MAX, u32::MAX, 16, 0);
        assert_eq!(header.block_align, u16::MAX);
        assert_eq!(header.byte_rate, u32::MAX);
        assert_eq!(
            header.validate(),
            Err(HeaderError::SampleRateOutOfRange(u32::MAX))
        );
    }
}
