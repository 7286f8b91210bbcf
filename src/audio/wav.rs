// Canonical 44-byte PCM WAV header
//
// Layout (all integers little-endian):
//   0  "RIFF"        4  file length - 8     8  "WAVE"
//   12 "fmt "        16 16 (PCM fmt size)   20 1 (PCM)
//   22 channels      24 sample rate         28 byte rate
//   32 block align   34 bits per sample
//   36 "data"        40 data length         44 samples

use super::error::{AudioError, AudioResult};

pub const HEADER_LEN: usize = 44;

/// Largest payload whose RIFF length still fits the 32-bit field
pub const MAX_DATA_LEN: u32 = u32::MAX - (HEADER_LEN as u32 - 8);

/// Describes the PCM payload that follows a canonical WAV header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WavHeader {
    pub sample_rate: u32,
    pub channels: u16,
    pub bits_per_sample: u16,
    /// Length of the `data` subchunk payload in bytes
    pub data_len: u32,
}

impl WavHeader {
    pub fn byte_rate(&self) -> u32 {
        let rate = self.sample_rate as u64 * self.channels as u64 * self.bits_per_sample as u64 / 8;
        u32::try_from(rate).unwrap_or(u32::MAX)
    }

    pub fn block_align(&self) -> u16 {
        let align = self.channels as u32 * self.bits_per_sample as u32 / 8;
        u16::try_from(align).unwrap_or(u16::MAX)
    }

    /// Value of the RIFF length field (file length minus the 8-byte RIFF preamble).
    ///
    /// Saturates at `u32::MAX` for payloads above `MAX_DATA_LEN`.
    pub fn riff_len(&self) -> u32 {
        self.data_len.saturating_add(HEADER_LEN as u32 - 8)
    }

    pub fn to_bytes(&self) -> [u8; HEADER_LEN] {
        let mut header = [0u8; HEADER_LEN];

        header[0..4].copy_from_slice(b"RIFF");
        header[4..8].copy_from_slice(&self.riff_len().to_le_bytes());
        header[8..12].copy_from_slice(b"WAVE");

        header[12..16].copy_from_slice(b"fmt ");
        header[16..20].copy_from_slice(&16u32.to_le_bytes());
        header[20..22].copy_from_slice(&1u16.to_le_bytes());
        header[22..24].copy_from_slice(&self.channels.to_le_bytes());
        header[24..28].copy_from_slice(&self.sample_rate.to_le_bytes());
        header[28..32].copy_from_slice(&self.byte_rate().to_le_bytes());
        header[32..34].copy_from_slice(&self.block_align().to_le_bytes());
        header[34..36].copy_from_slice(&self.bits_per_sample.to_le_bytes());

        header[36..40].copy_from_slice(b"data");
        header[40..44].copy_from_slice(&self.data_len.to_le_bytes());

        header
    }
}

/// Build a silent WAV clip of `duration_ms`.
///
/// Fails with `AudioError::Encoding` when the payload would not fit a WAV file.
pub fn silent_wav(
    duration_ms: u32,
    sample_rate: u32,
    channels: u16,
    bits_per_sample: u16,
) -> AudioResult<Vec<u8>> {
    let samples = (sample_rate as u64 * channels as u64 * duration_ms as u64) / 1000;
    let data_len = u32::try_from(samples * (bits_per_sample as u64 / 8))
        .ok()
        .filter(|len| *len <= MAX_DATA_LEN)
        .ok_or_else(|| {
            AudioError::Encoding(format!("{} ms of audio does not fit a WAV file", duration_ms))
        })?;

    let header = WavHeader {
        sample_rate,
        channels,
        bits_per_sample,
        data_len,
    };

    let mut out = Vec::with_capacity(HEADER_LEN + data_len as usize);
    out.extend_from_slice(&header.to_bytes());
    out.resize(HEADER_LEN + data_len as usize, 0);
    Ok(out)
}
