//! Voice chat: speech-to-text for recorded questions and text-to-speech for answers

mod service;
mod speech;

pub use service::VoiceChatService;
pub use speech::{PlaceholderSpeech, SpeechBackend, PLACEHOLDER_TRANSCRIPT};
