//! SNDFILE filter stream
//!
//! Presents an audio file (WAV, AIFF, FLAC, OGG or raw PCM) as a virtual
//! stream of 16-bit little-endian stereo PCM at 44.1 kHz, the layout of
//! CD-DA sector data.
//!
//! - [`negotiator`]: opening, format validation and setup
//! - [`block_cache`]: block reads with optional resampling
//! - [`write`]: writing PCM through to the codec

pub mod block_cache;
pub mod negotiator;
pub mod write;

use crate::audio::codec::AudioCodec;
use crate::audio::resampler::ResamplerQuality;
use crate::audio::types::{StreamFormat, VirtualStreamGeometry};
use block_cache::BlockCache;
use mirage_common::{FileType, FilterStream, FilterStreamInfo, Result, Stream};
use tracing::trace;

/// Filter identifier
pub const FILTER_ID: &str = "FILTER-SNDFILE";

/// Human-readable filter name
pub const FILTER_NAME: &str = "SNDFILE File Filter";

/// Tunables applied when opening a filter
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SndfileOptions {
    /// Interpolation used when the native rate is not 44.1 kHz
    pub resampler_quality: ResamplerQuality,
}

/// Static description of the SNDFILE filter
pub fn filter_info() -> FilterStreamInfo {
    FilterStreamInfo {
        id: FILTER_ID,
        name: FILTER_NAME,
        writable: true,
        file_types: vec![
            FileType {
                description: "WAV audio files",
                mime_type: "audio/wav",
            },
            FileType {
                description: "AIFF audio files",
                mime_type: "audio/x-aiff",
            },
            FileType {
                description: "FLAC audio files",
                mime_type: "audio/x-flac",
            },
            FileType {
                description: "OGG audio files",
                mime_type: "audio/x-ogg",
            },
        ],
    }
}

/// Audio file presented as 44.1 kHz 16-bit stereo PCM.
///
/// Created by [`SndfileFilterStream::open_with_options`] (or the
/// [`FilterStream::open`] trait constructor with default options) and
/// normally driven through [`mirage_common::SimplifiedStream`].
pub struct SndfileFilterStream {
    codec: Box<dyn AudioCodec>,

    /// Format as reported at open; `frames` follows writes
    format: StreamFormat,

    geometry: VirtualStreamGeometry,
    cache: BlockCache,
    writable: bool,

    /// Decoded samples of the last write
    write_scratch: Vec<i16>,
}

impl SndfileFilterStream {
    /// Format of the underlying audio
    pub fn format(&self) -> &StreamFormat {
        &self.format
    }

    /// Current virtual stream geometry
    pub fn geometry(&self) -> VirtualStreamGeometry {
        self.geometry
    }

    /// Index of the block currently held in the cache
    pub fn cached_block(&self) -> Option<u64> {
        self.cache.cached_block()
    }

    /// Whether reads go through the resampler
    pub fn is_resampling(&self) -> bool {
        self.cache.resampling().is_some()
    }
}

impl FilterStream for SndfileFilterStream {
    fn open(stream: Box<dyn Stream>, writable: bool) -> Result<Self> {
        Self::open_with_options(stream, writable, &SndfileOptions::default())
    }

    fn info(&self) -> FilterStreamInfo {
        filter_info()
    }

    fn stream_length(&self) -> u64 {
        self.geometry.length
    }

    fn is_writable(&self) -> bool {
        self.writable
    }

    fn partial_read(&mut self, position: u64, buf: &mut [u8]) -> Result<usize> {
        trace!("read {} (0x{:X}) bytes at position {}", buf.len(), buf.len(), position);
        self.cache.read(self.codec.as_mut(), position, buf)
    }

    fn partial_write(&mut self, position: u64, buf: &[u8]) -> Result<usize> {
        self.write_at(position, buf)
    }
}

impl std::fmt::Debug for SndfileFilterStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SndfileFilterStream")
            .field("format", &self.format)
            .field("geometry", &self.geometry)
            .field("cached_block", &self.cache.cached_block())
            .field("writable", &self.writable)
            .finish_non_exhaustive()
    }
}
