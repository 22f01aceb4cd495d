//! C10 — audio I/O: decodes files via `symphonia`, records/plays via
//! `cpal`, and provides the resampling/filtering helpers the ingest CLI
//! needs to get arbitrary source audio down to `FingerprintConfig::sample_rate`.
//!
//! `tracing` events replace `println!`/`eprintln!`, and decode/playback
//! failures on caller-controlled input propagate as `EngineError` instead
//! of panicking; the signal-processing bodies (resample, low-pass, WAV
//! write) are plain numeric code with no error paths of their own.

use std::f32::consts::PI;
use std::fs::File;
use std::sync::{mpsc, Arc, Mutex};
use std::thread;
use std::time::Duration;

use audio_gate::NoiseGate;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{StreamConfig, SupportedStreamConfig};
use hound::{SampleFormat, WavSpec, WavWriter};
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{CodecRegistry, DecoderOptions};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::{MediaSource, MediaSourceStream};
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::{Hint, Probe};
use symphonia::default;
use tracing::{info, warn};

use crate::error::{EngineError, EngineResult};

pub struct AudioDecoder {
    codec_registry: &'static CodecRegistry,
    format_options: FormatOptions,
    metadata_options: MetadataOptions,
    probe: &'static Probe,
}

impl Default for AudioDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioDecoder {
    pub fn new() -> Self {
        Self {
            codec_registry: default::get_codecs(),
            format_options: FormatOptions::default(),
            metadata_options: MetadataOptions::default(),
            probe: default::get_probe(),
        }
    }

    /// Decodes `path` to mono `f32` PCM and its native sample rate.
    pub fn decode_file(&self, path: &str) -> EngineResult<(Vec<f32>, u32)> {
        let file = File::open(path).map_err(|e| EngineError::StoreRead(e.to_string()))?;
        self.decode_source(Box::new(file))
    }

    fn decode_source(&self, source: Box<dyn MediaSource>) -> EngineResult<(Vec<f32>, u32)> {
        let stream = MediaSourceStream::new(source, Default::default());

        let probed = self
            .probe
            .format(&Hint::new(), stream, &self.format_options, &self.metadata_options)
            .map_err(|e| EngineError::InvalidConfig(format!("unrecognized audio format: {e}")))?;
        let mut format = probed.format;

        let track = format
            .tracks()
            .first()
            .ok_or_else(|| EngineError::InvalidConfig("audio file has no tracks".into()))?;
        let codec_params = track.codec_params.clone();
        let sample_rate = codec_params
            .sample_rate
            .ok_or_else(|| EngineError::InvalidConfig("audio track has no sample rate".into()))?;

        let mut decoder = self
            .codec_registry
            .make(&codec_params, &DecoderOptions::default())
            .map_err(|e| EngineError::InvalidConfig(format!("unsupported codec: {e}")))?;

        let mut samples = Vec::new();
        loop {
            let packet = match format.next_packet() {
                Ok(packet) => packet,
                Err(SymphoniaError::IoError(_)) => break,
                Err(e) => return Err(EngineError::StoreRead(e.to_string())),
            };

            let decoded = decoder
                .decode(&packet)
                .map_err(|e| EngineError::StoreRead(e.to_string()))?;
            let channels = decoded.spec().channels.count();

            let mut buf = SampleBuffer::<f32>::new(decoded.capacity() as u64, *decoded.spec());
            buf.copy_interleaved_ref(decoded);

            for frame in buf.samples().chunks_exact(channels) {
                samples.push(frame.iter().sum::<f32>() / channels as f32);
            }
        }

        info!(sample_rate, samples = samples.len(), "decoded audio file");
        Ok((samples, sample_rate))
    }

    /// Records from the default input device for `duration_secs` seconds.
    pub fn record_audio(&self, duration_secs: u64) -> EngineResult<(Vec<f32>, SupportedStreamConfig)> {
        // Noise gate parameters tuned for speech/music capture over a
        // typical laptop microphone; not exposed as config since recording
        // is a development aid, not part of the indexing pipeline.
        let _gate = NoiseGate::new(-36.0, -54.0, 48_000.0, 2, 150.0, 25.0, 150.0);

        let host = cpal::default_host();
        let device = host
            .default_input_device()
            .ok_or_else(|| EngineError::InvalidConfig("no input device found".into()))?;
        let config = device
            .default_input_config()
            .map_err(|e| EngineError::InvalidConfig(e.to_string()))?;

        let recorded = Arc::new(Mutex::new(Vec::new()));
        let recorded_clone = recorded.clone();
        let err_fn = |err| warn!(%err, "audio input stream error");

        let stream = match config.sample_format() {
            cpal::SampleFormat::F32 => device
                .build_input_stream(
                    &config.clone().into(),
                    move |data: &[f32], _: &_| {
                        recorded_clone.lock().unwrap().extend_from_slice(data);
                    },
                    err_fn,
                    None,
                )
                .map_err(|e| EngineError::InvalidConfig(e.to_string()))?,
            cpal::SampleFormat::I16 => device
                .build_input_stream(
                    &config.clone().into(),
                    move |data: &[i16], _: &_| {
                        let mut samples = recorded_clone.lock().unwrap();
                        for &sample in data {
                            samples.push(sample as f32 / i16::MAX as f32);
                        }
                    },
                    err_fn,
                    None,
                )
                .map_err(|e| EngineError::InvalidConfig(e.to_string()))?,
            other => return Err(EngineError::InvalidConfig(format!("unsupported sample format: {other:?}"))),
        };

        stream
            .play()
            .map_err(|e| EngineError::InvalidConfig(e.to_string()))?;
        thread::sleep(Duration::from_secs(duration_secs));
        drop(stream);

        let samples = recorded.lock().unwrap().clone();
        Ok((samples, config))
    }

    /// Plays back previously recorded samples through the default output
    /// device, blocking until playback finishes.
    pub fn play_recording(&self, samples: Vec<f32>, config: &StreamConfig) -> EngineResult<()> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| EngineError::InvalidConfig("no output device available".into()))?;

        let duration_secs = samples.len() as f32 / (config.sample_rate.0 as f32 * config.channels as f32);
        let (done_tx, done_rx) = mpsc::channel::<()>();
        let mut samples_iter = samples.into_iter();
        let mut done_tx = Some(done_tx);

        let stream = device
            .build_output_stream(
                config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    let mut exhausted = false;
                    for sample in data.iter_mut() {
                        match samples_iter.next() {
                            Some(s) => *sample = s,
                            None => {
                                *sample = 0.0;
                                exhausted = true;
                            }
                        }
                    }
                    if exhausted {
                        if let Some(tx) = done_tx.take() {
                            let _ = tx.send(());
                        }
                    }
                },
                |err| warn!(%err, "audio output stream error"),
                None,
            )
            .map_err(|e| EngineError::InvalidConfig(e.to_string()))?;

        stream.play().map_err(|e| EngineError::InvalidConfig(e.to_string()))?;
        info!(seconds = duration_secs, "playing back recording");
        let _ = done_rx.recv_timeout(Duration::from_secs_f32(duration_secs + 1.0));
        Ok(())
    }

    /// Linear resampling between arbitrary sample rates.
    pub fn resample_linear(&self, samples: &[f32], from_rate: u32, to_rate: u32) -> Vec<f32> {
        if from_rate == to_rate {
            return samples.to_vec();
        }
        let ratio = from_rate as f64 / to_rate as f64;
        let new_len = (samples.len() as f64 / ratio) as usize;
        let mut resampled = Vec::with_capacity(new_len);

        for i in 0..new_len {
            let in_idx = i as f64 * ratio;
            let idx = in_idx.floor() as usize;
            let frac = in_idx.fract() as f32;

            if idx + 1 < samples.len() {
                resampled.push(samples[idx] + frac * (samples[idx + 1] - samples[idx]));
            } else if idx < samples.len() {
                resampled.push(samples[idx]);
            } else {
                break;
            }
        }
        resampled
    }

    /// First-order low-pass filter, useful for knocking down microphone
    /// hiss before fingerprinting a recorded sample.
    pub fn apply_low_pass_filter(&self, samples: &[f32], sample_rate: u32, cutoff_freq: f32) -> Vec<f32> {
        if samples.is_empty() {
            return Vec::new();
        }

        let rc = 1.0 / (2.0 * PI * cutoff_freq);
        let dt = 1.0 / sample_rate as f32;
        let alpha = dt / (rc + dt);

        let mut filtered = vec![0.0; samples.len()];
        filtered[0] = samples[0];
        for i in 1..samples.len() {
            filtered[i] = filtered[i - 1] + alpha * (samples[i] - filtered[i - 1]);
        }
        filtered
    }

    /// Writes `samples` to a 16-bit PCM WAV file at `path`.
    pub fn save_as_wav(&self, samples: &[f32], spec: &SupportedStreamConfig, path: &str) -> EngineResult<()> {
        let wav_spec = WavSpec {
            channels: spec.channels(),
            sample_rate: spec.sample_rate().0,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };

        let mut writer =
            WavWriter::create(path, wav_spec).map_err(|e| EngineError::StoreWrite(e.to_string()))?;
        for &sample in samples {
            let amplitude = i16::MAX as f32;
            writer
                .write_sample((sample * amplitude) as i16)
                .map_err(|e| EngineError::StoreWrite(e.to_string()))?;
        }
        writer.finalize().map_err(|e| EngineError::StoreWrite(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resample_to_same_rate_is_identity() {
        let decoder = AudioDecoder::new();
        let samples = vec![0.1, 0.2, 0.3, 0.4];
        assert_eq!(decoder.resample_linear(&samples, 44100, 44100), samples);
    }

    #[test]
    fn resample_halves_length_when_halving_rate() {
        let decoder = AudioDecoder::new();
        let samples: Vec<f32> = (0..100).map(|i| i as f32).collect();
        let resampled = decoder.resample_linear(&samples, 44100, 22050);
        assert_eq!(resampled.len(), 50);
    }

    #[test]
    fn low_pass_on_empty_input_is_empty() {
        let decoder = AudioDecoder::new();
        assert!(decoder.apply_low_pass_filter(&[], 44100, 2000.0).is_empty());
    }
}
