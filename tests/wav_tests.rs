// Tests for the canonical WAV header and silent clip generation

use anyhow::Result;
use response_agent::audio::wav::{silent_wav, WavHeader, HEADER_LEN, MAX_DATA_LEN};
use response_agent::audio::AudioError;
use std::io::Cursor;

fn u32_at(bytes: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([bytes[offset], bytes[offset + 1], bytes[offset + 2], bytes[offset + 3]])
}

fn u16_at(bytes: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes([bytes[offset], bytes[offset + 1]])
}

#[test]
fn test_two_second_silence_layout() -> Result<()> {
    let wav = silent_wav(2000, 16000, 1, 16)?;

    assert_eq!(wav.len(), HEADER_LEN + 64000);
    assert_eq!(&wav[0..4], b"RIFF");
    assert_eq!(u32_at(&wav, 4), 64036);
    assert_eq!(&wav[8..12], b"WAVE");
    assert_eq!(&wav[12..16], b"fmt ");
    assert_eq!(u32_at(&wav, 16), 16);
    assert_eq!(u16_at(&wav, 20), 1, "PCM format tag");
    assert_eq!(u16_at(&wav, 22), 1);
    assert_eq!(u32_at(&wav, 24), 16000);
    assert_eq!(u32_at(&wav, 28), 32000, "byte rate");
    assert_eq!(u16_at(&wav, 32), 2, "block align");
    assert_eq!(u16_at(&wav, 34), 16);
    assert_eq!(&wav[36..40], b"data");
    assert_eq!(u32_at(&wav, 40), 64000);
    assert!(wav[HEADER_LEN..].iter().all(|b| *b == 0));

    Ok(())
}

#[test]
fn test_header_derived_fields() {
    let header = WavHeader {
        sample_rate: 48000,
        channels: 2,
        bits_per_sample: 16,
        data_len: 1000,
    };

    assert_eq!(header.byte_rate(), 192000);
    assert_eq!(header.block_align(), 4);
    assert_eq!(header.riff_len(), 1036);
}

#[test]
fn test_silent_wav_is_readable_by_hound() -> Result<()> {
    let wav = silent_wav(500, 22050, 2, 16)?;

    let reader = hound::WavReader::new(Cursor::new(wav))?;
    let spec = reader.spec();

    assert_eq!(spec.sample_rate, 22050);
    assert_eq!(spec.channels, 2);
    assert_eq!(spec.bits_per_sample, 16);
    assert_eq!(reader.duration(), 11025);

    Ok(())
}

#[test]
fn test_oversized_payload_saturates_riff_length() {
    let header = WavHeader {
        sample_rate: 48000,
        channels: 2,
        bits_per_sample: 16,
        data_len: u32::MAX - 10,
    };

    let bytes = header.to_bytes();

    assert_eq!(u32_at(&bytes, 4), u32::MAX);
    assert_eq!(u32_at(&bytes, 40), u32::MAX - 10);
}

#[test]
fn test_largest_payload_fits_exactly() {
    let header = WavHeader {
        sample_rate: 8000,
        channels: 1,
        bits_per_sample: 8,
        data_len: MAX_DATA_LEN,
    };

    assert_eq!(header.riff_len(), u32::MAX);
}

#[test]
fn test_silent_clip_too_long_for_wav() {
    // 192 kHz, 8 channels, 32-bit: about 6 MB per second, well past 4 GiB
    let result = silent_wav(u32::MAX, 192_000, 8, 32);

    assert!(matches!(result, Err(AudioError::Encoding(_))));
}
