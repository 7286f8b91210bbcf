// Integration tests for the voice audio component
//
// A scripted capture platform and a counting engine factory stand in for the
// microphone and speaker so the capture and playback rules can be checked
// without hardware.

use anyhow::Result;
use base64::Engine;
use response_agent::audio::wav::silent_wav;
use response_agent::audio::{
    AudioError, AudioFormat, AudioFrame, AudioResult, CaptureConstraints, CapturePlatform,
    DecodedAudio, EncoderOptions, Encoder, EngineFactory, InputDevice, PlaybackEngine, VoiceAudio,
    VoiceAudioConfig,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

/// Sender slot a test uses to feed chunks while a recording is running
type LiveChunks = Arc<Mutex<Option<mpsc::UnboundedSender<Vec<u8>>>>>;

// ============================================================================
// Capture stubs
// ============================================================================

#[derive(Default)]
struct Counters {
    opened: AtomicUsize,
    released: AtomicUsize,
}

struct StubInput {
    counters: Arc<Counters>,
    released: bool,
}

impl InputDevice for StubInput {
    fn sample_rate(&self) -> u32 {
        48000
    }

    fn channels(&self) -> u16 {
        1
    }

    fn take_frames(&mut self) -> Option<mpsc::UnboundedReceiver<AudioFrame>> {
        None
    }

    fn release(&mut self) {
        if !self.released {
            self.released = true;
            self.counters.released.fetch_add(1, Ordering::SeqCst);
        }
    }
}

struct StubEncoder {
    format: AudioFormat,
    chunks: Vec<Vec<u8>>,
    live: Option<LiveChunks>,
    tx: Option<mpsc::UnboundedSender<Vec<u8>>>,
}

impl Encoder for StubEncoder {
    fn start(&mut self) -> AudioResult<mpsc::UnboundedReceiver<Vec<u8>>> {
        let (tx, rx) = mpsc::unbounded_channel();
        if let Some(live) = &self.live {
            *live.lock().unwrap() = Some(tx.clone());
        }
        for chunk in &self.chunks {
            tx.send(chunk.clone())
                .map_err(|e| AudioError::Encoding(e.to_string()))?;
        }
        self.tx = Some(tx);
        Ok(rx)
    }

    fn stop(&mut self) {
        self.tx.take();
    }

    fn format(&self) -> &AudioFormat {
        &self.format
    }
}

struct StubPlatform {
    supported: Vec<&'static str>,
    deny: bool,
    fail_encoder: bool,
    chunks: Vec<Vec<u8>>,
    live: Option<LiveChunks>,
    counters: Arc<Counters>,
}

impl StubPlatform {
    fn new(supported: Vec<&'static str>) -> Self {
        Self {
            supported,
            deny: false,
            fail_encoder: false,
            chunks: vec![vec![1, 2, 3], vec![], vec![4, 5], vec![6]],
            live: None,
            counters: Arc::new(Counters::default()),
        }
    }
}

#[async_trait::async_trait]
impl CapturePlatform for StubPlatform {
    async fn open_input(&self, _constraints: &CaptureConstraints) -> AudioResult<Box<dyn InputDevice>> {
        self.counters.opened.fetch_add(1, Ordering::SeqCst);
        if self.deny {
            return Err(AudioError::CaptureAccessDenied("NotAllowedError".to_string()));
        }
        Ok(Box::new(StubInput {
            counters: Arc::clone(&self.counters),
            released: false,
        }))
    }

    fn is_format_supported(&self, format: &AudioFormat) -> bool {
        self.supported.contains(&format.mime())
    }

    fn open_encoder(
        &self,
        _input: &mut dyn InputDevice,
        format: &AudioFormat,
        _options: &EncoderOptions,
    ) -> AudioResult<Box<dyn Encoder>> {
        if self.fail_encoder {
            return Err(AudioError::Encoding("encoder rejected the stream".to_string()));
        }
        Ok(Box::new(StubEncoder {
            format: format.clone(),
            chunks: self.chunks.clone(),
            live: self.live.clone(),
            tx: None,
        }))
    }

    fn name(&self) -> &str {
        "stub"
    }
}

// ============================================================================
// Playback stubs
// ============================================================================

#[derive(Default)]
struct EngineCounters {
    created: AtomicUsize,
    started: AtomicUsize,
    closed: AtomicUsize,
}

struct StubEngine {
    counters: Arc<EngineCounters>,
}

impl PlaybackEngine for StubEngine {
    fn start(&mut self, _audio: DecodedAudio) -> AudioResult<()> {
        self.counters.started.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn close(&mut self) {
        self.counters.closed.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Default)]
struct StubEngines {
    counters: Arc<EngineCounters>,
}

impl EngineFactory for StubEngines {
    fn create(&self) -> AudioResult<Box<dyn PlaybackEngine>> {
        self.counters.created.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(StubEngine {
            counters: Arc::clone(&self.counters),
        }))
    }
}

fn voice_audio(platform: StubPlatform) -> (VoiceAudio, Arc<Counters>, Arc<EngineCounters>) {
    let counters = Arc::clone(&platform.counters);
    let engines = StubEngines::default();
    let engine_counters = Arc::clone(&engines.counters);
    let audio = VoiceAudio::new(
        Arc::new(platform),
        Arc::new(engines),
        VoiceAudioConfig::default(),
    );
    (audio, counters, engine_counters)
}

fn silent_wav_base64() -> String {
    base64::engine::general_purpose::STANDARD.encode(silent_wav(2000, 16000, 1, 16).unwrap())
}

/// WAV whose `fmt` chunk declares a sample rate of zero
fn zero_rate_wav_base64() -> String {
    let mut wav = silent_wav(100, 16000, 1, 16).unwrap();
    wav[24..28].copy_from_slice(&0u32.to_le_bytes());
    base64::engine::general_purpose::STANDARD.encode(wav)
}

// ============================================================================
// Capture
// ============================================================================

#[tokio::test]
async fn test_capture_concatenates_chunks_in_order() -> Result<()> {
    let (mut audio, counters, _) = voice_audio(StubPlatform::new(vec![AudioFormat::WAV]));

    let format = audio.begin_capture().await?;
    assert_eq!(format, AudioFormat::wav());
    assert!(audio.is_capturing());
    assert!(audio.capture_started_at().is_some());

    let captured = audio.end_capture().await?;

    assert_eq!(captured.bytes, vec![1, 2, 3, 4, 5, 6]);
    assert_eq!(captured.chunk_count, 3, "Empty chunks should be skipped");
    assert_eq!(captured.format, AudioFormat::wav());
    assert!(!audio.is_capturing());
    assert_eq!(counters.released.load(Ordering::SeqCst), 1);

    Ok(())
}

#[tokio::test]
async fn test_chunks_arriving_during_recording_keep_their_order() -> Result<()> {
    let live: LiveChunks = Arc::new(Mutex::new(None));
    let mut platform = StubPlatform::new(vec![AudioFormat::WAV]);
    platform.chunks = Vec::new();
    platform.live = Some(Arc::clone(&live));
    let (mut audio, _, _) = voice_audio(platform);

    audio.begin_capture().await?;

    let tx = live.lock().unwrap().take().expect("encoder started");
    for i in 0..20u8 {
        tx.send(vec![i, i])?;
        tokio::task::yield_now().await;
    }
    drop(tx);

    let captured = audio.end_capture().await?;

    let expected: Vec<u8> = (0..20u8).flat_map(|i| [i, i]).collect();
    assert_eq!(captured.bytes, expected);
    assert_eq!(captured.chunk_count, 20);

    Ok(())
}

#[tokio::test]
async fn test_capture_prefers_earliest_supported_format() -> Result<()> {
    let (mut audio, _, _) = voice_audio(StubPlatform::new(vec![
        AudioFormat::WAV,
        AudioFormat::OGG_OPUS,
    ]));

    let format = audio.begin_capture().await?;
    assert_eq!(format.mime(), AudioFormat::OGG_OPUS);

    audio.end_capture().await?;
    Ok(())
}

#[tokio::test]
async fn test_capture_unsupported_never_opens_microphone() {
    let (mut audio, counters, _) = voice_audio(StubPlatform::new(vec![]));

    let result = audio.begin_capture().await;

    assert_eq!(result, Err(AudioError::CaptureUnsupported));
    assert_eq!(counters.opened.load(Ordering::SeqCst), 0);
    assert!(!audio.is_capturing());
}

#[tokio::test]
async fn test_capture_access_denied() {
    let mut platform = StubPlatform::new(vec![AudioFormat::WAV]);
    platform.deny = true;
    let (mut audio, _, _) = voice_audio(platform);

    let result = audio.begin_capture().await;

    assert!(matches!(result, Err(AudioError::CaptureAccessDenied(_))));
    assert!(!audio.is_capturing());
}

#[tokio::test]
async fn test_encoder_failure_releases_microphone() {
    let mut platform = StubPlatform::new(vec![AudioFormat::WAV]);
    platform.fail_encoder = true;
    let (mut audio, counters, _) = voice_audio(platform);

    let result = audio.begin_capture().await;

    assert!(matches!(result, Err(AudioError::Encoding(_))));
    assert_eq!(counters.opened.load(Ordering::SeqCst), 1);
    assert_eq!(counters.released.load(Ordering::SeqCst), 1);
    assert!(!audio.is_capturing());
}

#[tokio::test]
async fn test_end_capture_without_begin() {
    let (mut audio, _, _) = voice_audio(StubPlatform::new(vec![AudioFormat::WAV]));

    let result = audio.end_capture().await;

    assert!(matches!(result, Err(AudioError::CaptureNotStarted)));
}

#[tokio::test]
async fn test_second_begin_is_rejected() -> Result<()> {
    let (mut audio, counters, _) = voice_audio(StubPlatform::new(vec![AudioFormat::WAV]));

    audio.begin_capture().await?;
    let second = audio.begin_capture().await;

    assert_eq!(second, Err(AudioError::AlreadyCapturing));
    assert_eq!(counters.opened.load(Ordering::SeqCst), 1);

    // The first recording is unaffected
    let captured = audio.end_capture().await?;
    assert_eq!(captured.bytes.len(), 6);

    Ok(())
}

#[tokio::test]
async fn test_dispose_releases_active_capture() -> Result<()> {
    let (mut audio, counters, _) = voice_audio(StubPlatform::new(vec![AudioFormat::WAV]));

    audio.begin_capture().await?;
    audio.dispose().await;

    assert_eq!(counters.released.load(Ordering::SeqCst), 1);
    Ok(())
}

// ============================================================================
// Playback
// ============================================================================

#[tokio::test]
async fn test_play_invalid_base64_creates_no_engine() {
    let (mut audio, _, engines) = voice_audio(StubPlatform::new(vec![]));

    let result = audio.play_audio("!!!").await;

    assert!(matches!(result, Err(AudioError::Base64(_))));
    assert_eq!(engines.created.load(Ordering::SeqCst), 0);
    assert!(!audio.has_engine());
}

#[tokio::test]
async fn test_play_undecodable_audio() {
    let (mut audio, _, engines) = voice_audio(StubPlatform::new(vec![]));

    // Valid base64 of bytes that are no known container
    let result = audio.play_audio("AAAAAAAAAAAA").await;

    assert!(matches!(result, Err(AudioError::Decode(_))));
    assert_eq!(engines.started.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_play_zero_sample_rate_is_decode_error() -> Result<()> {
    let (mut audio, _, engines) = voice_audio(StubPlatform::new(vec![]));

    let result = audio.play_audio(&zero_rate_wav_base64()).await;

    assert!(matches!(result, Err(AudioError::Decode(_))), "got {:?}", result);
    assert_eq!(engines.started.load(Ordering::SeqCst), 0);

    // The engine survives and still plays valid audio
    audio.play_audio(&silent_wav_base64()).await?;
    assert_eq!(engines.created.load(Ordering::SeqCst), 1);

    Ok(())
}

#[tokio::test]
async fn test_engine_is_reused_until_stopped() -> Result<()> {
    let (mut audio, _, engines) = voice_audio(StubPlatform::new(vec![]));
    let clip = silent_wav_base64();

    audio.play_audio(&clip).await?;
    audio.play_audio(&clip).await?;

    assert_eq!(engines.created.load(Ordering::SeqCst), 1);
    assert_eq!(engines.started.load(Ordering::SeqCst), 2);

    audio.stop_audio().await;
    assert!(!audio.has_engine());
    assert_eq!(engines.closed.load(Ordering::SeqCst), 1);

    // A new engine appears on next use
    audio.play_audio(&clip).await?;
    assert_eq!(engines.created.load(Ordering::SeqCst), 2);

    Ok(())
}

#[tokio::test]
async fn test_stop_audio_is_idempotent() {
    let (mut audio, _, engines) = voice_audio(StubPlatform::new(vec![]));

    audio.stop_audio().await;
    audio.stop_audio().await;

    assert_eq!(engines.closed.load(Ordering::SeqCst), 0);
    assert!(!audio.has_engine());
}

#[tokio::test]
async fn test_waveform_failure_is_swallowed() {
    let (mut audio, _, _) = voice_audio(StubPlatform::new(vec![]));

    assert!(audio.waveform("not base64 at all!", 100).await.is_none());
    assert!(audio.waveform("AAAAAAAAAAAA", 100).await.is_none());
    assert!(audio.waveform(&zero_rate_wav_base64(), 100).await.is_none());
}

#[tokio::test]
async fn test_waveform_of_silence() {
    let (mut audio, _, _) = voice_audio(StubPlatform::new(vec![]));

    let envelope = audio
        .waveform(&silent_wav_base64(), 100)
        .await
        .expect("silent WAV should decode");

    assert_eq!(envelope.len(), 100);
    assert!(envelope.iter().all(|v| *v == 0.0));
}
