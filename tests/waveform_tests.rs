// Tests for the RMS waveform envelope and the decoder feeding it

use anyhow::Result;
use response_agent::audio::wav::silent_wav;
use response_agent::audio::{decode_audio, rms_envelope, WAVEFORM_GAIN};

#[test]
fn test_envelope_has_one_value_per_column() {
    let samples: Vec<f32> = (0..1000).map(|i| (i as f32 / 10.0).sin() * 0.5).collect();

    let envelope = rms_envelope(&samples, 100);

    assert_eq!(envelope.len(), 100);
    assert!(envelope.iter().all(|v| (0.0..=0.5).contains(v)));
}

#[test]
fn test_envelope_of_silence_is_flat() {
    let samples = vec![0.0f32; 4800];

    let envelope = rms_envelope(&samples, 600);

    assert_eq!(envelope.len(), 600);
    assert!(envelope.iter().all(|v| *v == 0.0));
}

#[test]
fn test_envelope_empty_when_too_few_samples() {
    let samples = vec![0.25f32; 5];

    assert!(rms_envelope(&samples, 100).is_empty());
    assert!(rms_envelope(&samples, 5).is_empty());
    assert!(rms_envelope(&[], 100).is_empty());
}

#[test]
fn test_constant_signal_rms() {
    let samples = vec![-0.5f32; 200];

    let envelope = rms_envelope(&samples, 4);

    assert_eq!(envelope.len(), 4);
    for value in envelope {
        assert!((value - 0.5).abs() < 1e-6);
        // 0.5 full scale draws a 100 unit line
        assert!((value * WAVEFORM_GAIN - 100.0).abs() < 1e-3);
    }
}

#[test]
fn test_decoded_silent_wav_feeds_envelope() -> Result<()> {
    let wav = silent_wav(1000, 8000, 2, 16)?;

    let decoded = decode_audio(&wav)?;

    assert_eq!(decoded.sample_rate, 8000);
    assert_eq!(decoded.channels, 2);
    assert_eq!(decoded.frames(), 8000);
    assert!((decoded.duration_seconds() - 1.0).abs() < 1e-9);

    let left = decoded.channel(0);
    assert_eq!(left.len(), 8000);
    assert_eq!(rms_envelope(&left, 80).len(), 80);

    Ok(())
}
