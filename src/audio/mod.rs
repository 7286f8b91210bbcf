pub mod backend;
pub mod capture;
pub mod decode;
pub mod error;
pub mod format;
pub mod microphone;
pub mod speaker;
pub mod voice_audio;
pub mod wav;
pub mod waveform;

pub use backend::{
    AudioFrame, CaptureConstraints, CapturePlatform, EncoderOptions, Encoder, EngineFactory,
    InputDevice, PlaybackEngine,
};
pub use capture::{CaptureSession, CapturedAudio};
pub use decode::{decode_audio, DecodedAudio};
pub use error::{AudioError, AudioResult};
pub use format::AudioFormat;
pub use microphone::CpalPlatform;
pub use speaker::{CpalEngine, CpalEngineFactory};
pub use voice_audio::{decode_base64, VoiceAudio, VoiceAudioConfig};
pub use waveform::{rms_envelope, WAVEFORM_GAIN};
