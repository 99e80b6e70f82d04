//! Per-chunk sample transform
//!
//! Volume scaling for unsigned 8-bit and signed little-endian 16-bit PCM,
//! plus the optional 16-bit byte swap for TDA1543-style DACs. Everything
//! works in place on the chunk buffer.

/// Scale every sample in `buf` by `volume` percent
///
/// - 8-bit: samples are unsigned around a 128 midpoint; the offset is scaled
///   and the result clamped to 0-255.
/// - 16-bit: samples are signed; scaling by a factor <= 1 cannot overflow.
///   A trailing odd byte is left untouched.
/// - Other depths pass through unchanged.
pub fn apply_volume(buf: &mut [u8], bit_depth: u16, volume: u8) {
    let volume = i32::from(volume.min(100));
    if volume == 100 {
        return;
    }
    match bit_depth {
        8 => {
            for sample in buf.iter_mut() {
                let offset = i32::from(*sample) - 128;
                let scaled = offset * volume / 100 + 128;
                *sample = scaled.clamp(0, 255) as u8;
            }
        }
        16 => {
            for pair in buf.chunks_exact_mut(2) {
                let sample = i32::from(i16::from_le_bytes([pair[0], pair[1]]));
                let scaled = (sample * volume / 100) as i16;
                pair.copy_from_slice(&scaled.to_le_bytes());
            }
        }
        _ => {}
    }
}

/// Swap the two bytes of every 16-bit sample; other depths are untouched
pub fn swap_sample_bytes(buf: &mut [u8], bit_depth: u16) {
    if bit_depth != 16 {
        return;
    }
    for pair in buf.chunks_exact_mut(2) {
        pair.swap(0, 1);
    }
}

/// Transform applied to every chunk of one clip
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampleTransform {
    pub bit_depth: u16,
    pub legacy_dac_mode: bool,
}

impl SampleTransform {
    pub fn new(bit_depth: u16, legacy_dac_mode: bool) -> Self {
        Self {
            bit_depth,
            legacy_dac_mode,
        }
    }

    /// Scale, then byte-swap if the legacy DAC mode is on
    pub fn apply(&self, buf: &mut [u8], volume: u8) {
        apply_volume(buf, self.bit_depth, volume);
        if self.legacy_dac_mode {
            swap_sample_bytes(buf, self.bit_depth);
        }
    }
}
