use serde::{Deserialize, Serialize};
use std::fmt;

use super::error::{AudioError, AudioResult};

/// Container/codec identifier of an encoded recording (MIME style, e.g. `audio/wav`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AudioFormat(String);

impl AudioFormat {
    pub const WEBM_OPUS: &'static str = "audio/webm;codecs=opus";
    pub const OGG_OPUS: &'static str = "audio/ogg;codecs=opus";
    pub const MP4: &'static str = "audio/mp4";
    pub const WAV: &'static str = "audio/wav";

    pub fn new(mime: impl Into<String>) -> Self {
        Self(mime.into())
    }

    pub fn wav() -> Self {
        Self::new(Self::WAV)
    }

    pub fn mime(&self) -> &str {
        &self.0
    }

    /// Container part of the identifier, without codec parameters
    pub fn container(&self) -> &str {
        self.0.split(';').next().unwrap_or_default().trim()
    }
}

impl fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Recording formats in priority order
pub fn default_preferences() -> Vec<AudioFormat> {
    [
        AudioFormat::WEBM_OPUS,
        AudioFormat::OGG_OPUS,
        AudioFormat::MP4,
        AudioFormat::WAV,
    ]
    .into_iter()
    .map(AudioFormat::new)
    .collect()
}

/// Pick the first format in `preferences` that `is_supported` accepts.
///
/// The choice is purely positional: the same runtime always yields the same format.
pub fn negotiate(
    preferences: &[AudioFormat],
    is_supported: impl Fn(&AudioFormat) -> bool,
) -> AudioResult<AudioFormat> {
    preferences
        .iter()
        .find(|format| is_supported(format))
        .cloned()
        .ok_or(AudioError::CaptureUnsupported)
}
