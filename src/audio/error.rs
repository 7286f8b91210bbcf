use thiserror::Error;

pub type AudioResult<T> = std::result::Result<T, AudioError>;

/// Failures surfaced by the capture and playback component.
///
/// Variants carrying a `String` hold the platform's own error text so device
/// and format problems can be diagnosed from the message alone.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AudioError {
    #[error("microphone access was denied: {0}")]
    CaptureAccessDenied(String),

    #[error("no supported recording format is available")]
    CaptureUnsupported,

    #[error("recording not started")]
    CaptureNotStarted,

    #[error("a recording is already in progress")]
    AlreadyCapturing,

    #[error("audio encoder error: {0}")]
    Encoding(String),

    #[error("invalid base64 audio: {0}")]
    Base64(String),

    #[error("audio decode error: {0}")]
    Decode(String),

    #[error("audio playback error: {0}")]
    Playback(String),
}

impl From<base64::DecodeError> for AudioError {
    fn from(err: base64::DecodeError) -> Self {
        AudioError::Base64(err.to_string())
    }
}

impl From<symphonia::core::errors::Error> for AudioError {
    fn from(err: symphonia::core::errors::Error) -> Self {
        AudioError::Decode(err.to_string())
    }
}
