use tokio::sync::mpsc;

use super::decode::{decode_audio, DecodedAudio};
use super::error::AudioResult;
use super::format::AudioFormat;

/// Audio sample data (16-bit PCM, interleaved)
#[derive(Debug, Clone)]
pub struct AudioFrame {
    /// Raw audio samples (i16 PCM, interleaved)
    pub samples: Vec<i16>,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Number of channels
    pub channels: u16,
    /// Timestamp in milliseconds since capture started
    pub timestamp_ms: u64,
}

/// Capture-time DSP hints handed to the platform when opening the microphone
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureConstraints {
    pub echo_cancellation: bool,
    pub noise_suppression: bool,
    pub auto_gain_control: bool,
}

impl Default for CaptureConstraints {
    fn default() -> Self {
        Self {
            echo_cancellation: true,
            noise_suppression: true,
            auto_gain_control: true,
        }
    }
}

/// Encoder settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncoderOptions {
    /// Target bit rate for compressed formats (ignored by PCM encoders)
    pub bits_per_second: u32,
}

impl Default for EncoderOptions {
    fn default() -> Self {
        Self {
            bits_per_second: 128_000,
        }
    }
}

/// A live microphone input handle
pub trait InputDevice: Send {
    fn sample_rate(&self) -> u32;

    fn channels(&self) -> u16;

    /// Take the raw frame stream. Yields `None` once an encoder has claimed it.
    fn take_frames(&mut self) -> Option<mpsc::UnboundedReceiver<AudioFrame>>;

    /// Stop all underlying hardware tracks. Calling it twice is harmless.
    fn release(&mut self);
}

/// Turns raw frames into encoded chunks
pub trait Encoder: Send {
    /// Start encoding.
    ///
    /// Chunks are delivered on the returned receiver in capture order; the
    /// channel closes after the final chunk has been flushed.
    fn start(&mut self) -> AudioResult<mpsc::UnboundedReceiver<Vec<u8>>>;

    /// Ask the encoder to flush its final chunk and close the chunk channel
    fn stop(&mut self);

    /// Format the chunks are encoded in
    fn format(&self) -> &AudioFormat;
}

/// Platform capture subsystem: microphone access plus encoders
///
/// Implementations:
/// - `CpalPlatform`: default input device via cpal, WAV encoding
/// - test stubs driving the component without hardware
#[async_trait::async_trait]
pub trait CapturePlatform: Send + Sync {
    /// Open the microphone. Fails with `CaptureAccessDenied` when the
    /// platform refuses access or no device is available.
    async fn open_input(&self, constraints: &CaptureConstraints) -> AudioResult<Box<dyn InputDevice>>;

    /// Whether this runtime can produce recordings in `format`
    fn is_format_supported(&self, format: &AudioFormat) -> bool;

    /// Bind a new encoder to `input`
    fn open_encoder(
        &self,
        input: &mut dyn InputDevice,
        format: &AudioFormat,
        options: &EncoderOptions,
    ) -> AudioResult<Box<dyn Encoder>>;

    /// Backend name for logging
    fn name(&self) -> &str;
}

/// Decoding engine used for playback and waveform analysis
pub trait PlaybackEngine: Send {
    /// Decode an audio blob, auto-detecting its container
    fn decode(&mut self, data: &[u8]) -> AudioResult<DecodedAudio> {
        decode_audio(data)
    }

    /// Start a one-shot source for `audio` on the output device and return
    /// immediately; playback continues independently.
    fn start(&mut self, audio: DecodedAudio) -> AudioResult<()>;

    /// Release OS-level output resources
    fn close(&mut self);
}

/// Creates playback engines on demand
pub trait EngineFactory: Send + Sync {
    fn create(&self) -> AudioResult<Box<dyn PlaybackEngine>>;
}
