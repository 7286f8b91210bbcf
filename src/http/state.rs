use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

use crate::agent::{AgentService, FoundryClient};
use crate::audio::{
    CapturePlatform, CpalEngineFactory, CpalPlatform, EngineFactory, VoiceAudio, VoiceAudioConfig,
};
use crate::config::Config;
use crate::voice::{PlaceholderSpeech, VoiceChatService};

/// Everything needed to build a `VoiceAudio` for a new session
#[derive(Clone)]
pub struct AudioRuntime {
    pub platform: Arc<dyn CapturePlatform>,
    pub engines: Arc<dyn EngineFactory>,
    pub config: VoiceAudioConfig,
    /// Envelope width used when a waveform request does not specify one
    pub waveform_columns: usize,
}

impl AudioRuntime {
    pub fn new_session(&self) -> VoiceAudio {
        VoiceAudio::new(
            Arc::clone(&self.platform),
            Arc::clone(&self.engines),
            self.config.clone(),
        )
    }
}

/// Shared application state for HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub agent: Arc<AgentService>,
    pub voice: Arc<VoiceChatService>,
    pub audio: AudioRuntime,
    /// Voice sessions (session_id → audio component)
    pub sessions: Arc<RwLock<HashMap<String, Arc<Mutex<VoiceAudio>>>>>,
}

impl AppState {
    pub fn new(agent: AgentService, voice: VoiceChatService, audio: AudioRuntime) -> Self {
        Self {
            agent: Arc::new(agent),
            voice: Arc::new(voice),
            audio,
            sessions: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Wire the production collaborators from configuration
    pub fn from_config(config: &Config) -> Self {
        let agent = AgentService::new(
            config.foundry.clone(),
            Arc::new(FoundryClient::new(&config.foundry)),
        );

        let voice = VoiceChatService::new(config.voice.clone(), Arc::new(PlaceholderSpeech));
        voice.initialize();

        let audio = AudioRuntime {
            platform: Arc::new(CpalPlatform::new()),
            engines: Arc::new(CpalEngineFactory),
            config: config.audio.voice_audio(),
            waveform_columns: config.audio.waveform_columns,
        };

        Self::new(agent, voice, audio)
    }

    pub async fn session(&self, session_id: &str) -> Option<Arc<Mutex<VoiceAudio>>> {
        self.sessions.read().await.get(session_id).cloned()
    }
}
