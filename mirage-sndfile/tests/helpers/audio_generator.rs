//! Audio Test File Generation Utilities
//!
//! Generate deterministic audio data with known sample values for
//! validating the virtual PCM stream:
//! - Ramps (every frame distinct, easy to locate)
//! - Sine waves
//!
//! Data is produced in memory; wrap it in a `MemoryStream` with a filename
//! whose suffix matches the container.

use hound::{SampleFormat, WavSpec, WavWriter};
use std::f32::consts::PI;
use std::io::Cursor;

/// Interleaved samples of a ramp: left rises, right mirrors it
pub fn ramp_samples(channels: u16, frames: usize) -> Vec<i16> {
    let mut samples = Vec::with_capacity(frames * channels as usize);
    for frame in 0..frames {
        let value = ((frame * 7) % 20000) as i16 - 10000;
        for ch in 0..channels {
            samples.push(if ch % 2 == 0 { value } else { -value });
        }
    }
    samples
}

/// Interleaved stereo ramp rising by one per frame, wrapping every 30000
/// frames; right mirrors left
pub fn unit_ramp_samples(frames: usize) -> Vec<i16> {
    let mut samples = Vec::with_capacity(frames * 2);
    for frame in 0..frames {
        let value = (frame % 30000) as i16 - 15000;
        samples.push(value);
        samples.push(-value);
    }
    samples
}

/// Interleaved stereo samples of a sine wave at half amplitude
pub fn sine_samples(sample_rate: u32, frames: usize, frequency: f32) -> Vec<i16> {
    let mut samples = Vec::with_capacity(frames * 2);
    for frame in 0..frames {
        let t = frame as f32 / sample_rate as f32;
        let value = ((2.0 * PI * frequency * t).sin() * 16384.0) as i16;
        samples.push(value); // Left
        samples.push(value); // Right
    }
    samples
}

/// Encode interleaved 16-bit samples as a WAV file
pub fn wav_bytes(sample_rate: u32, channels: u16, samples: &[i16]) -> Vec<u8> {
    let spec = WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = WavWriter::new(&mut cursor, spec).unwrap();
        for &sample in samples {
            writer.write_sample(sample).unwrap();
        }
        writer.finalize().unwrap();
    }
    cursor.into_inner()
}

/// Overwrite the sample rate (and matching byte rate) in a WAV header
pub fn patch_wav_sample_rate(wav: &mut [u8], sample_rate: u32) {
    let fmt = wav
        .windows(4)
        .position(|w| w == b"fmt ")
        .expect("WAV has a fmt chunk");
    let channels = u16::from_le_bytes([wav[fmt + 10], wav[fmt + 11]]) as u32;
    let byte_rate = sample_rate.wrapping_mul(channels * 2);

    wav[fmt + 12..fmt + 16].copy_from_slice(&sample_rate.to_le_bytes());
    wav[fmt + 16..fmt + 20].copy_from_slice(&byte_rate.to_le_bytes());
}

/// Encode interleaved 16-bit stereo samples as a 44.1 kHz AIFF file
pub fn aiff_bytes(samples: &[i16]) -> Vec<u8> {
    let frames = (samples.len() / 2) as u32;
    let data_len = samples.len() as u32 * 2;

    let mut bytes = Vec::new();
    bytes.extend_from_slice(b"FORM");
    bytes.extend_from_slice(&(4 + 26 + 16 + data_len).to_be_bytes());
    bytes.extend_from_slice(b"AIFF");

    // COMM: channels, frames, bits per sample, 80-bit extended sample rate
    bytes.extend_from_slice(b"COMM");
    bytes.extend_from_slice(&18u32.to_be_bytes());
    bytes.extend_from_slice(&2u16.to_be_bytes());
    bytes.extend_from_slice(&frames.to_be_bytes());
    bytes.extend_from_slice(&16u16.to_be_bytes());
    bytes.extend_from_slice(&[0x40, 0x0E, 0xAC, 0x44, 0, 0, 0, 0, 0, 0]);

    // SSND: offset, block size, big-endian sample data
    bytes.extend_from_slice(b"SSND");
    bytes.extend_from_slice(&(8 + data_len).to_be_bytes());
    bytes.extend_from_slice(&0u32.to_be_bytes());
    bytes.extend_from_slice(&0u32.to_be_bytes());
    for &sample in samples {
        bytes.extend_from_slice(&sample.to_be_bytes());
    }

    bytes
}

/// Serialize samples as the virtual stream presents them
pub fn pcm_bytes(samples: &[i16]) -> Vec<u8> {
    samples.iter().flat_map(|s| s.to_le_bytes()).collect()
}

/// Decode virtual stream bytes back into samples
pub fn pcm_samples(bytes: &[u8]) -> Vec<i16> {
    bytes
        .chunks_exact(2)
        .map(|b| i16::from_le_bytes([b[0], b[1]]))
        .collect()
}
