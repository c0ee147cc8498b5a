//! Block cache and resampling engine
//!
//! The virtual PCM stream is divided into blocks of [`BLOCK_FRAMES`] frames
//! (one second of CD audio). A read maps its byte position to a block; if
//! that block is not the one currently cached, exactly one block's worth
//! of frames is fetched from the codec (and resampled to 44.1 kHz if the
//! native rate differs) before the requested bytes are copied out.
//!
//! The cache holds a single block. Reads never cross a block boundary: a
//! request reaching past the end of the block is cut short and the host is
//! expected to issue another read for the rest.
//!
//! When resampling, each block is treated as independent: the resampler's
//! history is reset before every fill and the block's input is flushed
//! completely, so no state carries across block boundaries.

use crate::audio::codec::{float_to_i16, AudioCodec};
use crate::audio::resampler::{BlockResampler, ResamplerQuality, RubatoResampler};
use crate::audio::try_alloc;
use crate::audio::types::{StreamFormat, BLOCK_FRAMES, BYTES_PER_SAMPLE};
use mirage_common::Result;
use tracing::{debug, trace, warn};

/// Resampling buffers and primitive, present only when the native rate
/// differs from 44.1 kHz
pub struct ResamplerState {
    /// Native rate / 44100
    io_ratio: f64,

    /// 44100 / native rate, the factor applied by the resampler
    conversion_ratio: f64,

    /// Native frames making up one virtual block
    native_block_frames: usize,

    /// Interleaved native-rate input for one block
    input: Vec<f32>,

    /// Interleaved 44.1 kHz output for one block
    output: Vec<f32>,

    resampler: Box<dyn BlockResampler>,
}

impl ResamplerState {
    /// Create the rubato resampler and its block buffers for `format`.
    ///
    /// The block buffers are allocated first so an oversized block fails
    /// with `ResourceExhausted` before rubato sizes its own buffers.
    pub fn new(format: &StreamFormat, quality: ResamplerQuality) -> Result<Self> {
        let (input, output) = Self::allocate(format)?;
        let resampler = RubatoResampler::new(
            quality,
            format.channels as usize,
            format.sample_rate,
            format.native_block_frames(),
        )?;
        Ok(Self::assemble(format, input, output, Box::new(resampler)))
    }

    /// Allocate block buffers around an existing resampler
    pub fn with_resampler(format: &StreamFormat, resampler: Box<dyn BlockResampler>) -> Result<Self> {
        let (input, output) = Self::allocate(format)?;
        Ok(Self::assemble(format, input, output, resampler))
    }

    fn allocate(format: &StreamFormat) -> Result<(Vec<f32>, Vec<f32>)> {
        let channels = format.channels as usize;

        let output = try_alloc(channels * BLOCK_FRAMES, 0.0f32, "resampler output buffer")?;
        debug!(
            "resampler output buffer: {} bytes",
            output.len() * std::mem::size_of::<f32>()
        );

        let input = try_alloc(
            channels * format.native_block_frames(),
            0.0f32,
            "resampler input buffer",
        )?;
        debug!(
            "resampler input buffer: {} bytes",
            input.len() * std::mem::size_of::<f32>()
        );

        Ok((input, output))
    }

    fn assemble(
        format: &StreamFormat,
        input: Vec<f32>,
        output: Vec<f32>,
        resampler: Box<dyn BlockResampler>,
    ) -> Self {
        Self {
            io_ratio: format.io_ratio(),
            conversion_ratio: 1.0 / format.io_ratio(),
            native_block_frames: format.native_block_frames(),
            input,
            output,
            resampler,
        }
    }

    pub fn io_ratio(&self) -> f64 {
        self.io_ratio
    }

    pub fn conversion_ratio(&self) -> f64 {
        self.conversion_ratio
    }

    pub fn native_block_frames(&self) -> usize {
        self.native_block_frames
    }
}

/// Single-slot cache of one decoded block.
pub struct BlockCache {
    channels: usize,

    /// Block size in bytes
    block_size: usize,

    /// Index of the cached block, `None` if nothing is cached
    cached_block: Option<u64>,

    /// Interleaved samples of the cached block
    samples: Vec<i16>,

    /// Cached block serialized as little-endian bytes
    bytes: Vec<u8>,

    resampling: Option<ResamplerState>,
}

impl BlockCache {
    /// Allocate the block buffers for `channels` interleaved channels
    pub fn new(channels: usize, resampling: Option<ResamplerState>) -> Result<Self> {
        let block_size = channels * BLOCK_FRAMES * BYTES_PER_SAMPLE;
        debug!("buffer length: {} bytes", block_size);

        Ok(Self {
            channels,
            block_size,
            cached_block: None,
            samples: try_alloc(channels * BLOCK_FRAMES, 0i16, "read buffer")?,
            bytes: try_alloc(block_size, 0u8, "read buffer")?,
            resampling,
        })
    }

    pub fn block_size(&self) -> usize {
        self.block_size
    }

    pub fn cached_block(&self) -> Option<u64> {
        self.cached_block
    }

    pub fn resampling(&self) -> Option<&ResamplerState> {
        self.resampling.as_ref()
    }

    /// Forget the cached block if it lies in `[start_block, end_block)`
    pub fn invalidate_range(&mut self, start_block: u64, end_block: u64) {
        if let Some(block) = self.cached_block {
            if block >= start_block && block < end_block {
                trace!("cached block #{} overwritten; dropping it", block);
                self.cached_block = None;
            }
        }
    }

    /// Copy bytes of the virtual stream at `position` into `buf`.
    ///
    /// Returns the number of bytes copied, which never extends past the end
    /// of the block containing `position`. Returns 0 if the codec has no
    /// frames for that block (end of stream).
    pub fn read(
        &mut self,
        codec: &mut dyn AudioCodec,
        position: u64,
        buf: &mut [u8],
    ) -> Result<usize> {
        // Block within the final, possibly resampled, stream
        let block = position / self.block_size as u64;
        trace!(
            "stream position: {} (0x{:X}) -> block #{} (cached: {:?})",
            position,
            position,
            block,
            self.cached_block
        );

        if self.cached_block != Some(block) {
            debug!("block #{} not cached, reading...", block);

            let frames = match self.resampling.as_mut() {
                None => Self::fill_native(codec, &mut self.samples, self.channels, block)?,
                Some(state) => Self::fill_resampled(codec, state, &mut self.samples, self.channels, block)?,
            };

            if frames == 0 {
                debug!("block #{} not read; EOF reached?", block);
                return Ok(0);
            }

            for (bytes, sample) in self.bytes.chunks_exact_mut(2).zip(&self.samples) {
                bytes.copy_from_slice(&sample.to_le_bytes());
            }

            self.cached_block = Some(block);
        } else {
            trace!("block #{} already cached", block);
        }

        let offset_in_block = (position % self.block_size as u64) as usize;
        let count = buf.len().min(self.block_size - offset_in_block);
        trace!("offset within block: {}, copying {} bytes", offset_in_block, count);

        buf[..count].copy_from_slice(&self.bytes[offset_in_block..offset_in_block + count]);
        Ok(count)
    }

    /// Read a block at the native rate straight into `samples`
    fn fill_native(
        codec: &mut dyn AudioCodec,
        samples: &mut [i16],
        channels: usize,
        block: u64,
    ) -> Result<usize> {
        let Some(offset) = block.checked_mul(BLOCK_FRAMES as u64) else {
            debug!("block #{} lies beyond any addressable frame", block);
            return Ok(0);
        };
        codec.seek_frames(offset).map_err(|e| {
            warn!("failed to seek to frame {} in underlying stream", offset);
            e
        })?;

        let frames = codec.read_frames_i16(samples)?;

        // Short final block: clear what the previous block left behind
        samples[frames * channels..].fill(0);
        Ok(frames)
    }

    /// Read a block's worth of native frames, resample, convert to 16-bit
    fn fill_resampled(
        codec: &mut dyn AudioCodec,
        state: &mut ResamplerState,
        samples: &mut [i16],
        channels: usize,
        block: u64,
    ) -> Result<usize> {
        // Offset within the native-rate stream
        let Some(offset) = block.checked_mul(state.native_block_frames as u64) else {
            debug!("block #{} lies beyond any addressable frame", block);
            return Ok(0);
        };
        codec.seek_frames(offset).map_err(|e| {
            warn!("failed to seek to frame {} in underlying stream", offset);
            e
        })?;

        let frames = codec.read_frames_f32(&mut state.input)?;
        if frames == 0 {
            return Ok(0);
        }

        state.output.fill(0.0);

        // Blocks are unrelated; start from clean filter history
        state.resampler.reset();
        match state
            .resampler
            .process(&state.input[..frames * channels], &mut state.output, true)
        {
            Ok(outcome) => debug!(
                "resampler: read {} input frames, generated {} output frames",
                outcome.input_frames_used, outcome.output_frames_generated
            ),
            Err(e) => warn!("failed to resample frames: {}", e),
        }

        float_to_i16(&state.output, samples);
        Ok(frames)
    }
}
