pub mod agent;
pub mod audio;
pub mod config;
pub mod document;
pub mod http;
pub mod voice;

pub use agent::{AgentBackend, AgentService, FoundryClient};
pub use audio::{
    AudioError, AudioFormat, CapturePlatform, CapturedAudio, CpalEngineFactory, CpalPlatform,
    DecodedAudio, EngineFactory, PlaybackEngine, VoiceAudio, VoiceAudioConfig,
};
pub use config::Config;
pub use http::{create_router, AppState, AudioRuntime};
pub use voice::{PlaceholderSpeech, SpeechBackend, VoiceChatService};
