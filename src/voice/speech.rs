use anyhow::Result;
use tracing::{debug, info};

use crate::audio::wav::silent_wav;
use crate::config::VoiceConfig;

/// Speech collaborator used by the voice chat service
#[async_trait::async_trait]
pub trait SpeechBackend: Send + Sync {
    /// Speech-to-text for an encoded recording
    async fn transcribe(&self, audio: &[u8]) -> Result<String>;

    /// Text-to-speech with the configured model, voice and instructions,
    /// returning an encoded audio file
    async fn synthesize(&self, text: &str, voice: &VoiceConfig) -> Result<Vec<u8>>;
}

pub const PLACEHOLDER_TRANSCRIPT: &str = "The content of your voice message will appear here";

/// Stand-in speech backend used until a VoiceLive session is wired in.
///
/// Transcription yields a fixed notice; synthesis yields two seconds of
/// silence as 16 kHz mono 16-bit WAV.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlaceholderSpeech;

#[async_trait::async_trait]
impl SpeechBackend for PlaceholderSpeech {
    async fn transcribe(&self, audio: &[u8]) -> Result<String> {
        info!("Transcribing {} bytes of audio", audio.len());
        Ok(PLACEHOLDER_TRANSCRIPT.to_string())
    }

    async fn synthesize(&self, text: &str, voice: &VoiceConfig) -> Result<Vec<u8>> {
        info!(
            "Synthesizing speech for {} chars (model={}, voice={})",
            text.chars().count(),
            voice.model,
            voice.voice
        );
        debug!("Voice instructions: {}", voice.instructions);
        Ok(silent_wav(2000, 16000, 1, 16)?)
    }
}
