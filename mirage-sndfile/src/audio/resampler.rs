//! Block resampling using rubato
//!
//! Converts one block of native-rate audio at a time to 44.1 kHz. Blocks
//! are treated as independent: callers reset the resampler before each
//! block, and each block is processed as a complete input (flushed to the
//! end) so one native block yields one virtual block.

use crate::audio::types::TARGET_SAMPLE_RATE;
use mirage_common::{Error, Result};
use rubato::{FastFixedIn, PolynomialDegree, Resampler as RubatoResamplerTrait};
use serde::Deserialize;
use thiserror::Error as ThisError;
use tracing::debug;

/// Interpolation quality of the resampler
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResamplerQuality {
    Nearest,
    /// Linear interpolation (default)
    #[default]
    Linear,
    Cubic,
    Quintic,
    Septic,
}

impl ResamplerQuality {
    fn degree(self) -> PolynomialDegree {
        match self {
            ResamplerQuality::Nearest => PolynomialDegree::Nearest,
            ResamplerQuality::Linear => PolynomialDegree::Linear,
            ResamplerQuality::Cubic => PolynomialDegree::Cubic,
            ResamplerQuality::Quintic => PolynomialDegree::Quintic,
            ResamplerQuality::Septic => PolynomialDegree::Septic,
        }
    }
}

impl std::str::FromStr for ResamplerQuality {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "nearest" => Ok(ResamplerQuality::Nearest),
            "linear" => Ok(ResamplerQuality::Linear),
            "cubic" => Ok(ResamplerQuality::Cubic),
            "quintic" => Ok(ResamplerQuality::Quintic),
            "septic" => Ok(ResamplerQuality::Septic),
            other => Err(Error::Config(format!("Unknown resampler quality '{}'", other))),
        }
    }
}

/// Frames consumed and produced by one `process` call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ResampleOutcome {
    pub input_frames_used: usize,
    pub output_frames_generated: usize,
}

/// Non-fatal resampling problem; output for the block may be degraded
#[derive(ThisError, Debug)]
#[error("Resampling failed: {0}")]
pub struct ResampleWarning(pub String);

/// Resampling primitive operating on interleaved float blocks.
pub trait BlockResampler: Send {
    /// Clear internal filter history
    fn reset(&mut self);

    /// Resample `input` into `output`.
    ///
    /// Both buffers are interleaved. With `end_of_input` the resampler
    /// drains its internal delay so the whole input is represented in the
    /// output. Frames of `output` past the generated count are left
    /// untouched.
    fn process(
        &mut self,
        input: &[f32],
        output: &mut [f32],
        end_of_input: bool,
    ) -> std::result::Result<ResampleOutcome, ResampleWarning>;
}

/// Input frames a freshly reset `FastFixedIn` starts ahead of its first
/// input frame (half the 8-point interpolation window)
const INTERPOLATION_LEAD: f64 = 4.0;

/// Output frames to drop so output frame 0 sits on input frame 0.
///
/// After a reset, output frame `n` is interpolated at input position
/// `(n + 1) / ratio - INTERPOLATION_LEAD` for every polynomial degree.
fn alignment_delay(ratio: f64) -> usize {
    (INTERPOLATION_LEAD * ratio - 1.0).round().max(0.0) as usize
}

/// rubato polynomial resampler sized for one block.
pub struct RubatoResampler {
    inner: FastFixedIn<f32>,
    channels: usize,
    chunk_frames: usize,

    /// Leading output frames discarded from every block
    delay: usize,

    /// Planar input staging ([L, L, ...], [R, R, ...])
    planar_in: Vec<Vec<f32>>,
}

impl RubatoResampler {
    /// Create a resampler from `input_rate` to 44.1 kHz.
    ///
    /// # Arguments
    /// - `quality`: Interpolation degree
    /// - `channels`: Number of interleaved channels
    /// - `input_rate`: Native sample rate
    /// - `chunk_frames`: Maximum native frames per block
    ///
    /// # Errors
    /// `ResourceExhausted` if the staging buffers cannot be allocated,
    /// `InitializationFailure` if rubato rejects the parameters.
    pub fn new(
        quality: ResamplerQuality,
        channels: usize,
        input_rate: u32,
        chunk_frames: usize,
    ) -> Result<Self> {
        let ratio = TARGET_SAMPLE_RATE as f64 / input_rate as f64;

        let mut planar_in = Vec::new();
        planar_in.try_reserve_exact(channels).map_err(|e| {
            Error::ResourceExhausted(format!("Failed to allocate resampler staging: {}", e))
        })?;
        for _ in 0..channels {
            let mut channel = Vec::new();
            channel.try_reserve_exact(chunk_frames).map_err(|e| {
                Error::ResourceExhausted(format!(
                    "Failed to allocate resampler staging ({} frames): {}",
                    chunk_frames, e
                ))
            })?;
            planar_in.push(channel);
        }

        let inner = FastFixedIn::<f32>::new(
            ratio,
            1.0, // max_relative_ratio (no runtime changes)
            quality.degree(),
            chunk_frames,
            channels,
        )
        .map_err(|e| Error::InitializationFailure(format!("Failed to create resampler: {}", e)))?;

        let delay = alignment_delay(ratio);
        debug!(
            "Resampler ready: {} Hz -> {} Hz, {:?}, {} frames per chunk, delay {}",
            input_rate, TARGET_SAMPLE_RATE, quality, chunk_frames, delay
        );

        Ok(Self {
            inner,
            channels,
            chunk_frames,
            delay,
            planar_in,
        })
    }

    /// Convert interleaved samples into the planar staging buffers.
    fn deinterleave(&mut self, samples: &[f32]) {
        for channel in &mut self.planar_in {
            channel.clear();
        }

        for frame in samples.chunks_exact(self.channels) {
            for (ch_idx, &sample) in frame.iter().enumerate() {
                self.planar_in[ch_idx].push(sample);
            }
        }
    }
}

impl BlockResampler for RubatoResampler {
    fn reset(&mut self) {
        self.inner.reset();
    }

    fn process(
        &mut self,
        input: &[f32],
        output: &mut [f32],
        end_of_input: bool,
    ) -> std::result::Result<ResampleOutcome, ResampleWarning> {
        self.deinterleave(input);
        let input_frames = self.planar_in.first().map_or(0, Vec::len);

        let mut planar_out = self
            .inner
            .process_partial(Some(self.planar_in.as_slice()), None)
            .map_err(|e| ResampleWarning(e.to_string()))?;

        if end_of_input {
            // A full chunk is flushed with its last frame held so the final
            // frames interpolate towards it rather than towards silence. A
            // short chunk has already been zero-padded by rubato.
            let tail = if input_frames == self.chunk_frames {
                for channel in &mut self.planar_in {
                    let last = channel.last().copied().unwrap_or(0.0);
                    channel.fill(last);
                }
                self.inner.process_partial(Some(self.planar_in.as_slice()), None)
            } else {
                self.inner.process_partial::<Vec<f32>>(None, None)
            }
            .map_err(|e| ResampleWarning(e.to_string()))?;
            for (channel, rest) in planar_out.iter_mut().zip(tail) {
                channel.extend(rest);
            }
        }

        let delay = self.delay;
        let available = planar_out.first().map_or(0, Vec::len).saturating_sub(delay);
        let capacity = output.len() / self.channels;
        let generated = available.min(capacity);

        for frame_idx in 0..generated {
            for (ch_idx, channel) in planar_out.iter().enumerate() {
                output[frame_idx * self.channels + ch_idx] = channel[delay + frame_idx];
            }
        }

        Ok(ResampleOutcome {
            input_frames_used: input_frames,
            output_frames_generated: generated,
        })
    }
}
