// Synthesized fallback beep

use crate::sound::output::Clip;
use std::f32::consts::TAU;

pub const SAMPLE_RATE: u32 = 44_100;

const START_HZ: f32 = 800.0;
const END_HZ: f32 = 600.0;
const SWEEP_SECS: f32 = 0.1;
const START_GAIN: f32 = 0.3;
const END_GAIN: f32 = 0.01;
const DURATION_SECS: f32 = 0.2;

/// Exponential ramp from `from` to `to` over `span` seconds, holding `to` afterwards
fn exp_ramp(from: f32, to: f32, t: f32, span: f32) -> f32 {
    if t >= span {
        return to;
    }
    from * (to / from).powf(t / span)
}

/// Sine sweep 800 Hz to 600 Hz with a decaying envelope, 16-bit mono
pub fn beep_samples() -> Vec<i16> {
    let count = (DURATION_SECS * SAMPLE_RATE as f32).round() as usize;
    let mut samples = Vec::with_capacity(count);
    let mut phase = 0.0f32;

    for n in 0..count {
        let t = n as f32 / SAMPLE_RATE as f32;
        let gain = exp_ramp(START_GAIN, END_GAIN, t, DURATION_SECS);
        samples.push((phase.sin() * gain * i16::MAX as f32) as i16);

        let freq = exp_ramp(START_HZ, END_HZ, t, SWEEP_SECS);
        phase = (phase + TAU * freq / SAMPLE_RATE as f32) % TAU;
    }

    samples
}

/// Wrap PCM samples in a canonical 44-byte-header WAV container
pub fn encode_wav(samples: &[i16], sample_rate: u32) -> Vec<u8> {
    const CHANNELS: u16 = 1;
    const BITS: u16 = 16;

    let block_align = CHANNELS * BITS / 8;
    let byte_rate = sample_rate * block_align as u32;
    let data_len = (samples.len() * block_align as usize) as u32;

    let mut out = Vec::with_capacity(44 + data_len as usize);
    out.extend_from_slice(b"RIFF");
    out.extend_from_slice(&(36 + data_len).to_le_bytes());
    out.extend_from_slice(b"WAVE");

    out.extend_from_slice(b"fmt ");
    out.extend_from_slice(&16u32.to_le_bytes());
    out.extend_from_slice(&1u16.to_le_bytes()); // PCM
    out.extend_from_slice(&CHANNELS.to_le_bytes());
    out.extend_from_slice(&sample_rate.to_le_bytes());
    out.extend_from_slice(&byte_rate.to_le_bytes());
    out.extend_from_slice(&block_align.to_le_bytes());
    out.extend_from_slice(&BITS.to_le_bytes());

    out.extend_from_slice(b"data");
    out.extend_from_slice(&data_len.to_le_bytes());
    for sample in samples {
        out.extend_from_slice(&sample.to_le_bytes());
    }

    out
}

/// The fallback beep as a playable clip
pub fn beep_clip() -> Clip {
    Clip {
        bytes: encode_wav(&beep_samples(), SAMPLE_RATE),
        extension: "wav".to_string(),
    }
}
