use anyhow::{Context, Result};
use std::io::{Cursor, Seek, Write};
use std::path::Path;

use crate::audio::synth::AudioSignal;

/// Float sample to signed 16-bit: clamp to `[-1, 1]`, scale negatives by
/// `0x8000` and the rest by `0x7FFF`, truncating toward zero.
#[inline]
pub fn to_pcm16(sample: f32) -> i16 {
    let s = if sample.is_nan() { 0.0 } else { sample.clamp(-1.0, 1.0) };
    if s < 0.0 {
        (s * 32768.0) as i16
    } else {
        (s * 32767.0) as i16
    }
}

fn mono_pcm16(sample_rate: u32) -> hound::WavSpec {
    hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    }
}

fn write_samples<W: Write + Seek>(
    out: W,
    samples: &[f32],
    sample_rate: u32,
) -> Result<(), hound::Error> {
    let mut writer = hound::WavWriter::new(out, mono_pcm16(sample_rate))?;
    for &sample in samples {
        writer.write_sample(to_pcm16(sample))?;
    }
    writer.finalize()
}

/// Mono 16-bit PCM file image: 44-byte RIFF header, then little-endian samples.
pub fn encode_wav(samples: &[f32], sample_rate: u32) -> Result<Vec<u8>, hound::Error> {
    let mut bytes = Vec::with_capacity(44 + samples.len() * 2);
    write_samples(Cursor::new(&mut bytes), samples, sample_rate)?;
    Ok(bytes)
}

pub fn write_wav(path: &Path, signal: &AudioSignal) -> Result<()> {
    let file = std::fs::File::create(path)
        .with_context(|| format!("Failed to create WAV: {}", path.display()))?;
    write_samples(std::io::BufWriter::new(file), &signal.samples, signal.sample_rate)
        .with_context(|| format!("Failed to write WAV: {}", path.display()))?;
    log::info!(
        "Wrote {} ({} samples, {:.2}s)",
        path.display(),
        signal.samples.len(),
        signal.duration()
    );
    Ok(())
}
