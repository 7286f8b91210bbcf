use base64::Engine;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{info, warn};

use super::backend::{
    CaptureConstraints, CapturePlatform, EncoderOptions, EngineFactory, PlaybackEngine,
};
use super::capture::{CaptureSession, CapturedAudio};
use super::error::{AudioError, AudioResult};
use super::format::{default_preferences, AudioFormat};
use super::waveform::rms_envelope;

/// Settings for a `VoiceAudio` instance
#[derive(Debug, Clone)]
pub struct VoiceAudioConfig {
    /// Recording formats in priority order
    pub format_preferences: Vec<AudioFormat>,
    pub constraints: CaptureConstraints,
    pub encoder: EncoderOptions,
}

impl Default for VoiceAudioConfig {
    fn default() -> Self {
        Self {
            format_preferences: default_preferences(),
            constraints: CaptureConstraints::default(),
            encoder: EncoderOptions::default(),
        }
    }
}

/// Audio capture and playback for one user session
///
/// Holds at most one capture session and at most one decoding engine. The
/// engine is created on first use and reused until `stop_audio`.
pub struct VoiceAudio {
    config: VoiceAudioConfig,
    platform: Arc<dyn CapturePlatform>,
    engines: Arc<dyn EngineFactory>,
    capture: Option<CaptureSession>,
    engine: Option<Box<dyn PlaybackEngine>>,
}

impl VoiceAudio {
    pub fn new(
        platform: Arc<dyn CapturePlatform>,
        engines: Arc<dyn EngineFactory>,
        config: VoiceAudioConfig,
    ) -> Self {
        Self {
            config,
            platform,
            engines,
            capture: None,
            engine: None,
        }
    }

    pub fn is_capturing(&self) -> bool {
        self.capture.is_some()
    }

    pub fn capture_started_at(&self) -> Option<DateTime<Utc>> {
        self.capture.as_ref().map(|c| c.started_at())
    }

    pub fn has_engine(&self) -> bool {
        self.engine.is_some()
    }

    /// Open the microphone and start recording in the first supported format
    pub async fn begin_capture(&mut self) -> AudioResult<AudioFormat> {
        if self.capture.is_some() {
            warn!("Recording already in progress");
            return Err(AudioError::AlreadyCapturing);
        }

        let session = CaptureSession::open(
            self.platform.as_ref(),
            &self.config.format_preferences,
            &self.config.constraints,
            &self.config.encoder,
        )
        .await?;

        let format = session.format().clone();
        self.capture = Some(session);
        Ok(format)
    }

    /// Stop recording and return the encoded blob
    pub async fn end_capture(&mut self) -> AudioResult<CapturedAudio> {
        let session = self.capture.take().ok_or(AudioError::CaptureNotStarted)?;
        session.finish().await
    }

    /// Decode base64 audio and start playing it on the output device
    pub async fn play_audio(&mut self, audio_base64: &str) -> AudioResult<()> {
        let bytes = decode_base64(audio_base64)?;

        self.with_engine(move |engine| {
            let decoded = engine.decode(&bytes)?;

            info!(
                "Audio playback started ({:.1}s, {}Hz, {} channels)",
                decoded.duration_seconds(),
                decoded.sample_rate,
                decoded.channels
            );

            engine.start(decoded)
        })
        .await
    }

    /// Close the decoding engine, silencing anything still playing
    pub async fn stop_audio(&mut self) {
        if let Some(mut engine) = self.engine.take() {
            if let Err(e) = tokio::task::spawn_blocking(move || engine.close()).await {
                warn!("Audio engine close task failed: {}", e);
            }
            info!("Audio engine closed");
        }
    }

    /// RMS envelope of the first channel with roughly `columns` values.
    ///
    /// Returns `None` when the audio cannot be decoded; the waveform is
    /// cosmetic and its failure never reaches the caller as an error.
    pub async fn waveform(&mut self, audio_base64: &str, columns: usize) -> Option<Vec<f32>> {
        let result = match decode_base64(audio_base64) {
            Ok(bytes) => {
                self.with_engine(move |engine| {
                    let decoded = engine.decode(&bytes)?;
                    Ok(rms_envelope(&decoded.channel(0), columns))
                })
                .await
            }
            Err(e) => Err(e),
        };

        match result {
            Ok(envelope) => Some(envelope),
            Err(e) => {
                warn!("Waveform analysis failed: {}", e);
                None
            }
        }
    }

    /// Release every handle this instance holds
    pub async fn dispose(mut self) {
        if let Some(session) = self.capture.take() {
            if let Err(e) = session.finish().await {
                warn!("Discarding recording on dispose failed: {}", e);
            }
        }
        self.stop_audio().await;
    }

    /// Run `work` against the engine (created on first use) on the blocking
    /// pool, since decoding and opening the output device both block
    async fn with_engine<T, F>(&mut self, work: F) -> AudioResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut dyn PlaybackEngine) -> AudioResult<T> + Send + 'static,
    {
        let mut engine = match self.engine.take() {
            Some(engine) => engine,
            None => self.engines.create()?,
        };

        let (engine, result) = tokio::task::spawn_blocking(move || {
            let result = work(engine.as_mut());
            (engine, result)
        })
        .await
        .map_err(|e| AudioError::Playback(format!("audio engine task failed: {}", e)))?;

        self.engine = Some(engine);
        result
    }
}

impl Drop for VoiceAudio {
    fn drop(&mut self) {
        // Dropping the capture session releases its device
        self.capture.take();
        if let Some(mut engine) = self.engine.take() {
            engine.close();
        }
    }
}

/// Decode standard base64 text (surrounding whitespace ignored)
pub fn decode_base64(text: &str) -> AudioResult<Vec<u8>> {
    Ok(base64::engine::general_purpose::STANDARD.decode(text.trim())?)
}
