use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::backend::{CaptureConstraints, CapturePlatform, EncoderOptions, Encoder, InputDevice};
use super::error::{AudioError, AudioResult};
use super::format::{negotiate, AudioFormat};

/// Finished recording: every delivered chunk concatenated in delivery order
#[derive(Debug, Clone, Serialize)]
pub struct CapturedAudio {
    pub bytes: Vec<u8>,
    pub format: AudioFormat,
    pub chunk_count: usize,
}

/// Live state of one recording attempt
///
/// Owns the input device and the encoder bound to it. Chunks are appended by a
/// single collector task in the order the encoder delivers them.
pub struct CaptureSession {
    input: Option<Box<dyn InputDevice>>,
    encoder: Box<dyn Encoder>,
    collector: Option<JoinHandle<Vec<Vec<u8>>>>,
    started_at: DateTime<Utc>,
}

impl CaptureSession {
    /// Negotiate a format, open the microphone and start encoding
    pub async fn open(
        platform: &dyn CapturePlatform,
        preferences: &[AudioFormat],
        constraints: &CaptureConstraints,
        options: &EncoderOptions,
    ) -> AudioResult<Self> {
        let format = negotiate(preferences, |f| platform.is_format_supported(f))?;
        info!("Recording format negotiated: {} ({})", format, platform.name());

        let mut input = platform.open_input(constraints).await?;

        let mut encoder = match platform.open_encoder(input.as_mut(), &format, options) {
            Ok(encoder) => encoder,
            Err(e) => {
                release_input(input).await;
                return Err(e);
            }
        };

        let mut chunk_rx = match encoder.start() {
            Ok(rx) => rx,
            Err(e) => {
                release_input(input).await;
                return Err(e);
            }
        };

        let collector = tokio::spawn(async move {
            let mut chunks: Vec<Vec<u8>> = Vec::new();
            while let Some(chunk) = chunk_rx.recv().await {
                if chunk.is_empty() {
                    continue;
                }
                debug!("Chunk {} received ({} bytes)", chunks.len(), chunk.len());
                chunks.push(chunk);
            }
            chunks
        });

        info!(
            "Recording started ({}Hz, {} channels)",
            input.sample_rate(),
            input.channels()
        );

        Ok(Self {
            input: Some(input),
            encoder,
            collector: Some(collector),
            started_at: Utc::now(),
        })
    }

    pub fn format(&self) -> &AudioFormat {
        self.encoder.format()
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Stop the encoder, wait for its final chunk and release the device.
    ///
    /// The input device is released whether or not the flush succeeds.
    pub async fn finish(mut self) -> AudioResult<CapturedAudio> {
        self.encoder.stop();

        let collected = match self.collector.take() {
            Some(handle) => handle
                .await
                .map_err(|e| AudioError::Encoding(format!("chunk collector failed: {}", e))),
            None => Ok(Vec::new()),
        };

        if let Some(input) = self.input.take() {
            release_input(input).await;
        }

        let chunks = collected?;
        let chunk_count = chunks.len();
        let bytes = chunks.concat();

        info!(
            "Recording stopped: {} bytes in {} chunks ({})",
            bytes.len(),
            chunk_count,
            self.encoder.format()
        );

        Ok(CapturedAudio {
            bytes,
            format: self.encoder.format().clone(),
            chunk_count,
        })
    }
}

impl Drop for CaptureSession {
    fn drop(&mut self) {
        if let Some(handle) = self.collector.take() {
            warn!("Capture session dropped while recording; discarding audio");
            self.encoder.stop();
            handle.abort();
        }
        if let Some(mut input) = self.input.take() {
            input.release();
        }
    }
}

/// Release the device on the blocking pool; hardware teardown joins threads
async fn release_input(mut input: Box<dyn InputDevice>) {
    let released = tokio::task::spawn_blocking(move || input.release()).await;
    if let Err(e) = released {
        warn!("Input release task failed: {}", e);
    }
}
