use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use std::sync::Arc;

use super::playback::AudioSink;
use super::synth::AudioSignal;
use crate::error::PlaybackError;

pub struct CpalSink {
    device: cpal::Device,
    config: cpal::StreamConfig,
    /// Output stream (kept alive while playing)
    stream: Option<cpal::Stream>,
}

impl CpalSink {
    pub fn open() -> Result<Self, PlaybackError> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| PlaybackError::Unavailable("no audio output device found".into()))?;

        let supported = device
            .default_output_config()
            .map_err(|e| PlaybackError::Unavailable(format!("failed to get audio config: {e}")))?;
        if supported.sample_format() != cpal::SampleFormat::F32 {
            return Err(PlaybackError::Unavailable(format!(
                "unsupported sample format {:?}",
                supported.sample_format()
            )));
        }

        log::info!(
            "Audio: {} @ {}Hz",
            device.name().unwrap_or_else(|_| "Unknown".to_string()),
            supported.sample_rate().0
        );

        Ok(Self {
            device,
            config: supported.into(),
            stream: None,
        })
    }

    /// Device rate; synthesize at this rate so offsets map 1:1 to samples.
    pub fn sample_rate(&self) -> u32 {
        self.config.sample_rate.0
    }
}

impl AudioSink for CpalSink {
    fn start(&mut self, signal: Arc<AudioSignal>, offset: f64) -> Result<(), PlaybackError> {
        self.stop();

        let channels = self.config.channels as usize;
        let len = signal.samples.len();
        let mut cursor = if len == 0 {
            0
        } else {
            (offset * signal.sample_rate as f64) as usize % len
        };

        let stream = self
            .device
            .build_output_stream(
                &self.config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    for frame in data.chunks_mut(channels) {
                        let sample = if len == 0 {
                            0.0
                        } else {
                            let s = signal.samples[cursor];
                            cursor = (cursor + 1) % len;
                            s
                        };
                        frame.fill(sample);
                    }
                },
                |err| log::warn!("Audio stream error: {}", err),
                None,
            )
            .map_err(|e| PlaybackError::Unavailable(format!("failed to build audio stream: {e}")))?;

        stream
            .play()
            .map_err(|e| PlaybackError::Unavailable(format!("failed to start audio stream: {e}")))?;

        self.stream = Some(stream);
        Ok(())
    }

    fn stop(&mut self) {
        if let Some(stream) = self.stream.take() {
            let _ = stream.pause();
        }
    }
}
