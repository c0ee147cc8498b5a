//! # mirage-sndfile
//!
//! Filter stream presenting audio files as CD-DA PCM data.
//!
//! An audio file (WAV, AIFF, FLAC, OGG, or headerless PCM) is exposed as a
//! virtual byte stream of 16-bit little-endian stereo samples at 44.1 kHz.
//! Files at other sample rates are resampled one block (one second) at a
//! time. Opened for writing, the filter creates a new 44.1 kHz stereo file
//! and writes PCM through to it.
//!
//! ```no_run
//! use mirage_common::{FileStream, SimplifiedStream};
//! use mirage_sndfile::SndfileFilterStream;
//! use std::io::Read;
//!
//! let file = FileStream::open("track01.flac")?;
//! let mut pcm = SimplifiedStream::<SndfileFilterStream>::open(Box::new(file), false)?;
//!
//! let mut sector = vec![0u8; 2352];
//! pcm.read_exact(&mut sector)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod audio;
pub mod config;
pub mod filter;

pub use audio::types::{ContainerKind, StreamFormat, VirtualStreamGeometry};
pub use audio::ResamplerQuality;
pub use filter::{filter_info, SndfileFilterStream, SndfileOptions};
