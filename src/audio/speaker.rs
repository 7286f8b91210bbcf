// Speaker output via cpal
//
// The output stream is opened on the first `start()` and mixes every active
// one-shot source until `close()`. Like the microphone, the stream lives on
// its own thread because cpal streams are not `Send`. Opening and closing
// block on that thread, so callers run them off the async executor.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, SampleFormat, SizedSample, StreamConfig};
use rubato::{
    Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
};
use std::sync::mpsc as std_mpsc;
use std::sync::{Arc, Mutex};
use std::thread;
use tracing::{debug, error, info};

use super::backend::{EngineFactory, PlaybackEngine};
use super::decode::DecodedAudio;
use super::error::{AudioError, AudioResult};

/// One decoded clip being played
struct Source {
    samples: Vec<f32>,
    position: usize,
}

type Mixer = Arc<Mutex<Vec<Source>>>;

struct OutputStream {
    mixer: Mixer,
    sample_rate: u32,
    channels: u16,
    stop_tx: Option<std_mpsc::Sender<()>>,
    thread: Option<thread::JoinHandle<()>>,
}

impl OutputStream {
    fn open() -> AudioResult<Self> {
        let mixer: Mixer = Arc::new(Mutex::new(Vec::new()));
        let (ready_tx, ready_rx) = std_mpsc::sync_channel::<Result<StreamConfig, String>>(1);
        let (stop_tx, stop_rx) = std_mpsc::channel::<()>();

        let stream_mixer = Arc::clone(&mixer);
        let thread = thread::Builder::new()
            .name("speaker-output".to_string())
            .spawn(move || {
                let (stream, config) = match build_output_stream(stream_mixer) {
                    Ok(built) => built,
                    Err(msg) => {
                        let _ = ready_tx.send(Err(msg));
                        return;
                    }
                };

                if ready_tx.send(Ok(config)).is_err() {
                    return;
                }

                let _ = stop_rx.recv();
                drop(stream);
                debug!("Output stream closed");
            })
            .map_err(|e| AudioError::Playback(e.to_string()))?;

        let config = match ready_rx.recv() {
            Ok(Ok(config)) => config,
            Ok(Err(msg)) => {
                let _ = thread.join();
                return Err(AudioError::Playback(msg));
            }
            Err(_) => {
                let _ = thread.join();
                return Err(AudioError::Playback(
                    "output thread exited before the device opened".to_string(),
                ));
            }
        };

        info!(
            "Speaker opened ({}Hz, {} channels)",
            config.sample_rate.0, config.channels
        );

        Ok(Self {
            mixer,
            sample_rate: config.sample_rate.0,
            channels: config.channels,
            stop_tx: Some(stop_tx),
            thread: Some(thread),
        })
    }

    fn close(&mut self) {
        if self.stop_tx.take().is_none() {
            return;
        }
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                error!("Output thread panicked");
            }
        }
    }
}

impl Drop for OutputStream {
    fn drop(&mut self) {
        self.close();
    }
}

fn build_output_stream(mixer: Mixer) -> Result<(cpal::Stream, StreamConfig), String> {
    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .ok_or_else(|| "no output device available".to_string())?;

    let supported = device
        .default_output_config()
        .map_err(|e| e.to_string())?;
    let sample_format = supported.sample_format();
    let config: StreamConfig = supported.into();

    let stream = match sample_format {
        SampleFormat::F32 => build_typed_stream::<f32>(&device, &config, mixer),
        SampleFormat::I16 => build_typed_stream::<i16>(&device, &config, mixer),
        SampleFormat::U16 => build_typed_stream::<u16>(&device, &config, mixer),
        other => return Err(format!("unsupported output sample format: {:?}", other)),
    }
    .map_err(|e| e.to_string())?;

    stream.play().map_err(|e| e.to_string())?;

    Ok((stream, config))
}

fn build_typed_stream<T>(
    device: &cpal::Device,
    config: &StreamConfig,
    mixer: Mixer,
) -> Result<cpal::Stream, cpal::BuildStreamError>
where
    T: SizedSample + FromSample<f32>,
{
    let mut mixed: Vec<f32> = Vec::new();

    device.build_output_stream(
        config,
        move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
            mixed.clear();
            mixed.resize(data.len(), 0.0);
            mix_into(&mixer, &mut mixed);
            for (out, sample) in data.iter_mut().zip(mixed.iter()) {
                *out = T::from_sample(sample.clamp(-1.0, 1.0));
            }
        },
        |err| error!("Output stream error: {}", err),
        None,
    )
}

/// Sum every active source into `out` and drop the ones that finished
fn mix_into(mixer: &Mixer, out: &mut [f32]) {
    let Ok(mut sources) = mixer.lock() else {
        return;
    };

    for source in sources.iter_mut() {
        let remaining = &source.samples[source.position..];
        for (acc, sample) in out.iter_mut().zip(remaining) {
            *acc += sample;
        }
        source.position = (source.position + out.len()).min(source.samples.len());
    }

    sources.retain(|s| s.position < s.samples.len());
}

/// Convert decoded audio to the device's channel layout and sample rate
pub fn prepare_for_output(
    audio: &DecodedAudio,
    sample_rate: u32,
    channels: u16,
) -> AudioResult<Vec<f32>> {
    let in_channels = audio.channels.max(1) as usize;
    let out_channels = channels.max(1) as usize;
    let frames = audio.frames();

    // Channel mapping: extra output channels repeat the last input channel
    let mut remapped = Vec::with_capacity(frames * out_channels);
    for frame in audio.samples.chunks_exact(in_channels) {
        for c in 0..out_channels {
            remapped.push(frame[c.min(in_channels - 1)]);
        }
    }

    if audio.sample_rate == sample_rate || audio.sample_rate == 0 || sample_rate == 0 {
        return Ok(remapped);
    }

    resample(&remapped, out_channels, audio.sample_rate, sample_rate)
}

/// Band-limited sinc resampling of interleaved samples.
///
/// The output holds exactly `frames * to_rate / from_rate` frames, aligned
/// with the input (the filter delay is trimmed).
fn resample(samples: &[f32], channels: usize, from_rate: u32, to_rate: u32) -> AudioResult<Vec<f32>> {
    let in_frames = samples.len() / channels;
    if in_frames == 0 {
        return Ok(Vec::new());
    }

    let params = SincInterpolationParameters {
        sinc_len: 128,
        f_cutoff: 0.95,
        interpolation: SincInterpolationType::Linear,
        oversampling_factor: 128,
        window: WindowFunction::BlackmanHarris2,
    };

    let ratio = to_rate as f64 / from_rate as f64;
    let chunk_size = in_frames.max(1024);
    let mut resampler = SincFixedIn::<f32>::new(ratio, 1.0, params, chunk_size, channels)
        .map_err(|e| AudioError::Playback(format!("resampler setup failed: {}", e)))?;

    let mut planar: Vec<Vec<f32>> = vec![Vec::with_capacity(in_frames); channels];
    for frame in samples.chunks_exact(channels) {
        for (c, &sample) in frame.iter().enumerate() {
            planar[c].push(sample);
        }
    }

    let delay = resampler.output_delay();
    let out_frames = (in_frames as u64 * to_rate as u64 / from_rate as u64) as usize;

    let mut output: Vec<Vec<f32>> = resampler
        .process_partial(Some(planar.as_slice()), None)
        .map_err(|e| AudioError::Playback(format!("resampling failed: {}", e)))?;

    // Push zeros through until the delayed tail has come out
    while output[0].len() < delay + out_frames {
        let tail = resampler
            .process_partial(None::<&[Vec<f32>]>, None)
            .map_err(|e| AudioError::Playback(format!("resampling failed: {}", e)))?;
        if tail[0].is_empty() {
            break;
        }
        for (channel, rest) in output.iter_mut().zip(tail) {
            channel.extend(rest);
        }
    }

    let mut out = Vec::with_capacity(out_frames * channels);
    for i in delay..delay + out_frames {
        for channel in &output {
            out.push(channel.get(i).copied().unwrap_or(0.0));
        }
    }

    Ok(out)
}

/// Playback engine rendering to the default output device
#[derive(Default)]
pub struct CpalEngine {
    output: Option<OutputStream>,
}

impl CpalEngine {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PlaybackEngine for CpalEngine {
    fn start(&mut self, audio: DecodedAudio) -> AudioResult<()> {
        if self.output.is_none() {
            self.output = Some(OutputStream::open()?);
        }
        let output = self
            .output
            .as_ref()
            .ok_or_else(|| AudioError::Playback("output stream unavailable".to_string()))?;

        let samples = prepare_for_output(&audio, output.sample_rate, output.channels)?;
        debug!("Queued source of {} output samples", samples.len());

        let mut sources = output
            .mixer
            .lock()
            .map_err(|_| AudioError::Playback("output mixer lock poisoned".to_string()))?;
        sources.push(Source {
            samples,
            position: 0,
        });

        Ok(())
    }

    fn close(&mut self) {
        if let Some(mut output) = self.output.take() {
            output.close();
        }
    }
}

/// Creates `CpalEngine`s; the output device is only touched on first playback
#[derive(Debug, Default, Clone, Copy)]
pub struct CpalEngineFactory;

impl EngineFactory for CpalEngineFactory {
    fn create(&self) -> AudioResult<Box<dyn PlaybackEngine>> {
        Ok(Box::new(CpalEngine::new()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mono(samples: Vec<f32>, sample_rate: u32) -> DecodedAudio {
        DecodedAudio {
            samples,
            sample_rate,
            channels: 1,
        }
    }

    #[test]
    fn test_prepare_duplicates_mono_to_stereo() {
        let audio = mono(vec![0.1, 0.2, 0.3], 48000);
        let out = prepare_for_output(&audio, 48000, 2).unwrap();
        assert_eq!(out, vec![0.1, 0.1, 0.2, 0.2, 0.3, 0.3]);
    }

    #[test]
    fn test_prepare_resamples_to_device_rate() {
        let audio = mono(vec![0.0; 16000], 16000);
        let out = prepare_for_output(&audio, 48000, 1).unwrap();
        assert_eq!(out.len(), 48000);
    }

    #[test]
    fn test_resample_keeps_level_and_alignment() {
        let audio = mono(vec![0.5; 4410], 44100);
        let out = prepare_for_output(&audio, 48000, 2).unwrap();

        assert_eq!(out.len(), 4800 * 2);
        // Away from the edges a constant signal stays constant
        for sample in &out[2000..8000] {
            assert!((sample - 0.5).abs() < 0.02, "got {}", sample);
        }
    }

    #[test]
    fn test_resample_downsamples_short_clip() {
        let audio = mono(vec![0.25; 100], 48000);
        let out = prepare_for_output(&audio, 16000, 1).unwrap();
        assert_eq!(out.len(), 33);
    }

    #[test]
    fn test_mix_sums_and_retires_sources() {
        let mixer: Mixer = Arc::new(Mutex::new(vec![
            Source {
                samples: vec![0.25; 4],
                position: 0,
            },
            Source {
                samples: vec![0.5; 2],
                position: 0,
            },
        ]));

        let mut out = vec![0.0; 4];
        mix_into(&mixer, &mut out);
        assert_eq!(out, vec![0.75, 0.75, 0.25, 0.25]);
        assert!(mixer.lock().unwrap().is_empty());
    }
}
