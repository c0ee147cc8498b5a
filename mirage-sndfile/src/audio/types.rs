//! Core audio data types
//!
//! Defines the format reported by a codec and the geometry of the virtual
//! PCM stream derived from it.
//!
//! **Virtual stream format:**
//! - 16-bit signed little-endian samples
//! - Stereo interleaved: [L, R, L, R, ...]
//! - Sample rate always 44100 Hz (resampled if the file differs)

use std::fmt;
use std::path::Path;

/// Sample rate of the virtual PCM stream
pub const TARGET_SAMPLE_RATE: u32 = 44100;

/// Highest native sample rate accepted; one block holds a second of input
pub const MAX_SAMPLE_RATE: u32 = 768_000;

/// Channel count required at the virtual-stream boundary
pub const REQUIRED_CHANNELS: u16 = 2;

/// Bytes per sample at the virtual-stream boundary (16-bit)
pub const BYTES_PER_SAMPLE: usize = 2;

/// Frames per cache block: 588 frames/sector, 75 sectors/second
pub const BLOCK_FRAMES: usize = 588 * 75;

/// Container or codec of the encoded file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerKind {
    Wav,
    Aiff,
    Flac,
    Ogg,
    /// Headerless 16-bit little-endian PCM
    Raw,
}

impl ContainerKind {
    /// Pick a container from a filename suffix (case-insensitive).
    ///
    /// Returns `None` for unknown or missing suffixes; callers decide on
    /// the fallback.
    pub fn from_filename(filename: &str) -> Option<Self> {
        let extension = Path::new(filename).extension()?.to_str()?;

        if extension.eq_ignore_ascii_case("wav") {
            Some(ContainerKind::Wav)
        } else if extension.eq_ignore_ascii_case("aiff") {
            Some(ContainerKind::Aiff)
        } else if extension.eq_ignore_ascii_case("flac") {
            Some(ContainerKind::Flac)
        } else if extension.eq_ignore_ascii_case("ogg") {
            Some(ContainerKind::Ogg)
        } else {
            None
        }
    }
}

impl fmt::Display for ContainerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ContainerKind::Wav => "WAV",
            ContainerKind::Aiff => "AIFF",
            ContainerKind::Flac => "FLAC",
            ContainerKind::Ogg => "OGG",
            ContainerKind::Raw => "raw PCM",
        };
        f.write_str(name)
    }
}

/// Format of the encoded stream as reported (or assigned) at open time.
///
/// Immutable after open except `frames`, which grows as frames are written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamFormat {
    /// Native sample rate in Hz
    pub sample_rate: u32,

    /// Number of channels (must be 2 for the filter to accept it)
    pub channels: u16,

    /// Number of native frames in the stream
    pub frames: u64,

    pub container: ContainerKind,

    /// Number of sections (tracks) in the container
    pub sections: u32,

    pub seekable: bool,
}

impl StreamFormat {
    /// Format assigned when creating a new file: 44.1 kHz stereo, empty
    pub fn for_creation(container: ContainerKind, seekable: bool) -> Self {
        Self {
            sample_rate: TARGET_SAMPLE_RATE,
            channels: REQUIRED_CHANNELS,
            frames: 0,
            container,
            sections: 1,
            seekable,
        }
    }

    /// Bytes per interleaved 16-bit frame
    pub fn bytes_per_frame(&self) -> usize {
        self.channels as usize * BYTES_PER_SAMPLE
    }

    /// Native rate divided by the virtual stream rate
    pub fn io_ratio(&self) -> f64 {
        self.sample_rate as f64 / TARGET_SAMPLE_RATE as f64
    }

    pub fn needs_resampling(&self) -> bool {
        self.sample_rate != TARGET_SAMPLE_RATE
    }

    /// Native frames covering one virtual block (`BLOCK_FRAMES * ratio`)
    pub fn native_block_frames(&self) -> usize {
        (BLOCK_FRAMES as u64 * self.sample_rate as u64 / TARGET_SAMPLE_RATE as u64) as usize
    }
}

/// Byte geometry of the virtual PCM stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VirtualStreamGeometry {
    /// Length of the virtual stream in bytes
    pub length: u64,

    /// Size of one cache block in bytes
    pub block_size: usize,
}

impl VirtualStreamGeometry {
    /// Compute the geometry for a format.
    ///
    /// Length is `frames * channels * 2`; when the native rate differs from
    /// 44.1 kHz it is divided by the rate ratio and rounded to nearest.
    pub fn from_format(format: &StreamFormat) -> Self {
        let raw_length = format.frames * format.bytes_per_frame() as u64;
        let length = if format.needs_resampling() {
            (raw_length as f64 / format.io_ratio()).round() as u64
        } else {
            raw_length
        };

        Self {
            length,
            block_size: format.channels as usize * BLOCK_FRAMES * BYTES_PER_SAMPLE,
        }
    }

    /// Index of the block containing `position`
    pub fn block_index(&self, position: u64) -> u64 {
        position / self.block_size as u64
    }
}
