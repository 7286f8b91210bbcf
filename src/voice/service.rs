use anyhow::{bail, Context, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{error, info};

use super::speech::SpeechBackend;
use crate::config::VoiceConfig;

pub struct VoiceChatService {
    config: VoiceConfig,
    backend: Arc<dyn SpeechBackend>,
    initialized: AtomicBool,
}

impl VoiceChatService {
    pub fn new(config: VoiceConfig, backend: Arc<dyn SpeechBackend>) -> Self {
        Self {
            config,
            backend,
            initialized: AtomicBool::new(false),
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::SeqCst)
    }

    /// Validate the voice endpoint; returns false (and logs) when unusable
    pub fn initialize(&self) -> bool {
        if self.config.endpoint.trim().is_empty() {
            error!("VoiceLive endpoint is not configured");
            return false;
        }

        info!(
            "Voice client initialized (model={}, voice={})",
            self.config.model, self.config.voice
        );
        self.initialized.store(true, Ordering::SeqCst);
        true
    }

    /// Transcribe a recorded question
    pub async fn send_voice_message(&self, audio: &[u8]) -> Result<String> {
        self.ensure_initialized()?;
        info!("Sending voice message ({} bytes)", audio.len());

        let text = self
            .backend
            .transcribe(audio)
            .await
            .context("Speech-to-text failed")?;

        info!("Transcribed text: {}", text);
        Ok(text)
    }

    /// Synthesize a spoken answer
    pub async fn get_audio_response(&self, text: &str) -> Result<Vec<u8>> {
        self.ensure_initialized()?;
        info!("Generating audio response ({} chars)", text.chars().count());

        let audio = self
            .backend
            .synthesize(text, &self.config)
            .await
            .context("Text-to-speech failed")?;

        info!("Audio response generated ({} bytes)", audio.len());
        Ok(audio)
    }

    pub fn disconnect(&self) {
        if self.initialized.swap(false, Ordering::SeqCst) {
            info!("Voice client disconnected");
        }
    }

    fn ensure_initialized(&self) -> Result<()> {
        if !self.is_initialized() {
            error!("Voice client is not initialized");
            bail!("voice client is not initialized");
        }
        Ok(())
    }
}
