use anyhow::Result;
use serde::Deserialize;

use crate::audio::format::{default_preferences, AudioFormat};
use crate::audio::{EncoderOptions, VoiceAudioConfig};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    #[serde(default)]
    pub foundry: FoundryConfig,
    #[serde(default)]
    pub voice: VoiceConfig,
    #[serde(default)]
    pub audio: AudioConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
    pub http: HttpConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    pub bind: String,
    pub port: u16,
}

/// Foundry Agent project settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FoundryConfig {
    /// Project endpoint, e.g. https://<resource>.services.ai.azure.com/api/projects/<project>
    pub endpoint: String,
    pub agent_id: String,
    pub review_agent_id: String,
    pub rewrite_agent_id: String,
    pub chat_agent_id: String,
    pub api_version: String,
    /// Bearer token supplied by the hosting environment
    pub api_key: Option<String>,
}

impl Default for FoundryConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            agent_id: String::new(),
            review_agent_id: String::new(),
            rewrite_agent_id: "Answer-Rewrite".to_string(),
            chat_agent_id: String::new(),
            api_version: "2025-05-15-preview".to_string(),
            api_key: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct VoiceConfig {
    pub endpoint: String,
    pub model: String,
    pub voice: String,
    pub instructions: String,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            model: "gpt-4o".to_string(),
            voice: "ja-JP-NanaNeural".to_string(),
            instructions: "You are a helpful AI assistant. Respond naturally and conversationally. \
                Keep your responses concise but engaging."
                .to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Recording formats in priority order
    pub format_preferences: Vec<AudioFormat>,
    pub bits_per_second: u32,
    /// Default envelope width when the caller does not ask for one
    pub waveform_columns: usize,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            format_preferences: default_preferences(),
            bits_per_second: 128_000,
            waveform_columns: 600,
        }
    }
}

impl AudioConfig {
    pub fn voice_audio(&self) -> VoiceAudioConfig {
        VoiceAudioConfig {
            format_preferences: self.format_preferences.clone(),
            encoder: EncoderOptions {
                bits_per_second: self.bits_per_second,
            },
            ..VoiceAudioConfig::default()
        }
    }
}

impl Config {
    /// Load from `path` (any format the config crate understands) and
    /// `RESPONSE_AGENT__*` environment overrides
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .add_source(config::Environment::with_prefix("RESPONSE_AGENT").separator("__"))
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}
