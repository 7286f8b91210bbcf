// Microphone capture via cpal with in-process WAV encoding
//
// A cpal stream is not `Send`, so each input device lives on its own thread
// that builds the stream, reports the negotiated config back and then parks
// until the handle is released. Frames cross to the async side over an
// unbounded channel, which keeps them in callback order.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleFormat, StreamConfig};
use std::io::Cursor;
use std::sync::mpsc as std_mpsc;
use std::thread;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info};

use super::backend::{
    AudioFrame, CaptureConstraints, CapturePlatform, EncoderOptions, Encoder, InputDevice,
};
use super::error::{AudioError, AudioResult};
use super::format::AudioFormat;

/// Capture platform backed by the default cpal input device
#[derive(Debug, Default, Clone, Copy)]
pub struct CpalPlatform;

impl CpalPlatform {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait::async_trait]
impl CapturePlatform for CpalPlatform {
    async fn open_input(&self, constraints: &CaptureConstraints) -> AudioResult<Box<dyn InputDevice>> {
        let input = CpalInput::open(constraints).await?;
        Ok(Box::new(input))
    }

    fn is_format_supported(&self, format: &AudioFormat) -> bool {
        matches!(format.container(), "audio/wav" | "audio/x-wav" | "audio/wave")
    }

    fn open_encoder(
        &self,
        input: &mut dyn InputDevice,
        format: &AudioFormat,
        options: &EncoderOptions,
    ) -> AudioResult<Box<dyn Encoder>> {
        if !self.is_format_supported(format) {
            return Err(AudioError::CaptureUnsupported);
        }

        let frames = input
            .take_frames()
            .ok_or_else(|| AudioError::Encoding("input is already bound to an encoder".to_string()))?;

        debug!(
            "WAV encoder ignores bit rate hint of {} bps",
            options.bits_per_second
        );

        Ok(Box::new(WavEncoder::new(
            format.clone(),
            frames,
            input.sample_rate(),
            input.channels(),
        )))
    }

    fn name(&self) -> &str {
        "cpal"
    }
}

/// Default input device running on a dedicated stream thread
pub struct CpalInput {
    sample_rate: u32,
    channels: u16,
    frames_rx: Option<mpsc::UnboundedReceiver<AudioFrame>>,
    stop_tx: Option<std_mpsc::Sender<()>>,
    thread: Option<thread::JoinHandle<()>>,
}

impl CpalInput {
    pub async fn open(constraints: &CaptureConstraints) -> AudioResult<Self> {
        if constraints.echo_cancellation || constraints.noise_suppression || constraints.auto_gain_control {
            debug!(
                "Capture constraints {:?} are left to the OS audio stack (not exposed by cpal)",
                constraints
            );
        }

        let (frames_tx, frames_rx) = mpsc::unbounded_channel();
        let (ready_tx, ready_rx) = oneshot::channel::<Result<StreamConfig, String>>();
        let (stop_tx, stop_rx) = std_mpsc::channel::<()>();

        let thread = thread::Builder::new()
            .name("mic-capture".to_string())
            .spawn(move || {
                let (stream, config) = match build_input_stream(frames_tx) {
                    Ok(built) => built,
                    Err(msg) => {
                        let _ = ready_tx.send(Err(msg));
                        return;
                    }
                };

                if ready_tx.send(Ok(config)).is_err() {
                    return;
                }

                // Parked until release() or the handle is dropped
                let _ = stop_rx.recv();
                drop(stream);
                debug!("Input stream closed");
            })
            .map_err(|e| AudioError::CaptureAccessDenied(e.to_string()))?;

        let config = match ready_rx.await {
            Ok(Ok(config)) => config,
            Ok(Err(msg)) => {
                let _ = thread.join();
                return Err(AudioError::CaptureAccessDenied(msg));
            }
            Err(_) => {
                let _ = thread.join();
                return Err(AudioError::CaptureAccessDenied(
                    "capture thread exited before the device opened".to_string(),
                ));
            }
        };

        info!(
            "Microphone opened ({}Hz, {} channels)",
            config.sample_rate.0, config.channels
        );

        Ok(Self {
            sample_rate: config.sample_rate.0,
            channels: config.channels,
            frames_rx: Some(frames_rx),
            stop_tx: Some(stop_tx),
            thread: Some(thread),
        })
    }
}

impl InputDevice for CpalInput {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn channels(&self) -> u16 {
        self.channels
    }

    fn take_frames(&mut self) -> Option<mpsc::UnboundedReceiver<AudioFrame>> {
        self.frames_rx.take()
    }

    fn release(&mut self) {
        // Dropping the sender wakes the stream thread
        if self.stop_tx.take().is_none() {
            return;
        }
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                error!("Capture thread panicked");
            }
        }
        info!("Microphone released");
    }
}

impl Drop for CpalInput {
    fn drop(&mut self) {
        self.release();
    }
}

fn build_input_stream(
    frames_tx: mpsc::UnboundedSender<AudioFrame>,
) -> Result<(cpal::Stream, StreamConfig), String> {
    let host = cpal::default_host();
    let device = host
        .default_input_device()
        .ok_or_else(|| "no input device available".to_string())?;

    let supported = device
        .default_input_config()
        .map_err(|e| e.to_string())?;
    let sample_format = supported.sample_format();
    let config: StreamConfig = supported.into();

    let sample_rate = config.sample_rate.0;
    let channels = config.channels;
    let mut samples_seen: u64 = 0;
    let mut emit = move |samples: Vec<i16>| {
        let frames = samples_seen / channels.max(1) as u64;
        samples_seen += samples.len() as u64;
        // Receiver gone means the encoder finished; late frames are dropped
        let _ = frames_tx.send(AudioFrame {
            samples,
            sample_rate,
            channels,
            timestamp_ms: frames * 1000 / sample_rate.max(1) as u64,
        });
    };

    let err_fn = |err: cpal::StreamError| error!("Input stream error: {}", err);

    let stream = match sample_format {
        SampleFormat::F32 => device.build_input_stream(
            &config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                emit(
                    data.iter()
                        .map(|&s| (s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16)
                        .collect(),
                )
            },
            err_fn,
            None,
        ),
        SampleFormat::I16 => device.build_input_stream(
            &config,
            move |data: &[i16], _: &cpal::InputCallbackInfo| emit(data.to_vec()),
            err_fn,
            None,
        ),
        other => return Err(format!("unsupported input sample format: {:?}", other)),
    }
    .map_err(|e| e.to_string())?;

    stream.play().map_err(|e| e.to_string())?;

    Ok((stream, config))
}

/// Buffers PCM frames and emits a finished WAV file as the final chunk
pub struct WavEncoder {
    format: AudioFormat,
    frames_rx: Option<mpsc::UnboundedReceiver<AudioFrame>>,
    sample_rate: u32,
    channels: u16,
    stop_tx: Option<oneshot::Sender<()>>,
}

impl WavEncoder {
    pub fn new(
        format: AudioFormat,
        frames_rx: mpsc::UnboundedReceiver<AudioFrame>,
        sample_rate: u32,
        channels: u16,
    ) -> Self {
        Self {
            format,
            frames_rx: Some(frames_rx),
            sample_rate,
            channels,
            stop_tx: None,
        }
    }
}

impl Encoder for WavEncoder {
    fn start(&mut self) -> AudioResult<mpsc::UnboundedReceiver<Vec<u8>>> {
        let mut frames = self
            .frames_rx
            .take()
            .ok_or_else(|| AudioError::Encoding("encoder already started".to_string()))?;

        let (chunk_tx, chunk_rx) = mpsc::unbounded_channel();
        let (stop_tx, mut stop_rx) = oneshot::channel::<()>();
        self.stop_tx = Some(stop_tx);

        let sample_rate = self.sample_rate;
        let channels = self.channels;

        tokio::spawn(async move {
            let mut samples: Vec<i16> = Vec::new();

            loop {
                tokio::select! {
                    frame = frames.recv() => match frame {
                        Some(frame) => samples.extend_from_slice(&frame.samples),
                        None => break,
                    },
                    _ = &mut stop_rx => break,
                }
            }

            // Frames already queued when stop arrived still belong to the recording
            while let Ok(frame) = frames.try_recv() {
                samples.extend_from_slice(&frame.samples);
            }

            match encode_wav(&samples, sample_rate, channels) {
                Ok(bytes) => {
                    debug!("WAV encoder flushed {} samples ({} bytes)", samples.len(), bytes.len());
                    let _ = chunk_tx.send(bytes);
                }
                Err(e) => error!("Failed to encode WAV: {}", e),
            }
            // chunk_tx dropped here: the chunk channel closes after the final chunk
        });

        Ok(chunk_rx)
    }

    fn stop(&mut self) {
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(());
        }
    }

    fn format(&self) -> &AudioFormat {
        &self.format
    }
}

fn encode_wav(samples: &[i16], sample_rate: u32, channels: u16) -> Result<Vec<u8>, hound::Error> {
    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec)?;
        for &sample in samples {
            writer.write_sample(sample)?;
        }
        writer.finalize()?;
    }

    Ok(cursor.into_inner())
}
