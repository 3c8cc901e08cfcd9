use std::sync::Arc;

use crate::render::frame::{ProcessedFrame, BYTES_PER_PIXEL};

pub const DEFAULT_SAMPLE_RATE: u32 = 44_100;
pub const DEFAULT_SMOOTHING: f32 = 0.5;

/// Mono sample stream derived from one processed frame.
#[derive(Clone, Debug, PartialEq)]
pub struct AudioSignal {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl AudioSignal {
    /// Seconds of audio: `samples / sample_rate`.
    pub fn duration(&self) -> f64 {
        duration_of(self.samples.len(), self.sample_rate)
    }
}

/// Clamps into `[0, 0.999]`; NaN falls back to the default.
pub fn sanitize_smoothing(smoothing: f32) -> f32 {
    if smoothing.is_nan() {
        DEFAULT_SMOOTHING
    } else {
        smoothing.clamp(0.0, 0.999)
    }
}

pub fn duration_of(sample_count: usize, sample_rate: u32) -> f64 {
    if sample_rate == 0 {
        return 0.0;
    }
    sample_count as f64 / sample_rate as f64
}

/// Maps R, G, B of every pixel to three consecutive samples and runs a one-pole
/// low-pass across the whole stream.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Synthesizer {
    sample_rate: u32,
    /// Feedback coefficient `k`: `y[i] = y[i-1] * k + x[i] * (1 - k)`, `y[-1] = 0`.
    smoothing: f32,
}

impl Default for Synthesizer {
    fn default() -> Self {
        Self {
            sample_rate: DEFAULT_SAMPLE_RATE,
            smoothing: DEFAULT_SMOOTHING,
        }
    }
}

impl Synthesizer {
    pub fn new(sample_rate: u32, smoothing: f32) -> Self {
        Self {
            sample_rate,
            smoothing: sanitize_smoothing(smoothing),
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn smoothing(&self) -> f32 {
        self.smoothing
    }

    /// Duration a frame of this size will sonify to, without synthesizing it.
    pub fn duration_for(&self, frame: &ProcessedFrame) -> f64 {
        duration_of(frame.pixel_count() * 3, self.sample_rate)
    }

    pub fn synthesize(&self, frame: &ProcessedFrame) -> AudioSignal {
        let k = self.smoothing as f64;
        let mut samples = Vec::with_capacity(frame.pixel_count() * 3);
        let mut prev = 0.0f32;
        for px in frame.pixels.chunks_exact(BYTES_PER_PIXEL) {
            for &channel in &px[..3] {
                let raw = channel as f64 / 128.0 - 1.0;
                prev = (prev as f64 * k + raw * (1.0 - k)) as f32;
                samples.push(prev);
            }
        }
        AudioSignal {
            samples,
            sample_rate: self.sample_rate,
        }
    }

    pub fn synthesize_shared(&self, frame: &ProcessedFrame) -> Arc<AudioSignal> {
        Arc::new(self.synthesize(frame))
    }
}
