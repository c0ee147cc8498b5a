//! Test helper modules for mirage-sndfile integration tests

#![allow(dead_code, unused_imports)]

pub mod audio_generator;

pub use audio_generator::{
    aiff_bytes, patch_wav_sample_rate, pcm_bytes, pcm_samples, ramp_samples, sine_samples,
    unit_ramp_samples, wav_bytes,
};
