//! Audio processing modules
//!
//! - `types`: stream format and virtual stream geometry
//! - `bridge`: adapts an underlying stream for the codecs
//! - `codec`: codec interface and sample conversion
//! - `decoder`: symphonia-based reading of WAV, AIFF, FLAC and OGG
//! - `writer`: WAV and raw PCM creation
//! - `resampler`: rubato-based block resampling to 44.1 kHz

pub mod bridge;
pub mod codec;
pub mod decoder;
pub mod resampler;
pub mod types;
pub mod writer;

pub use codec::{AudioCodec, OpenMode};
pub use resampler::{BlockResampler, ResamplerQuality};
pub use types::{ContainerKind, StreamFormat, VirtualStreamGeometry};

use mirage_common::{Error, Result};

/// Allocate a buffer of `len` elements, reporting failure instead of aborting
pub(crate) fn try_alloc<T: Clone>(len: usize, value: T, what: &str) -> Result<Vec<T>> {
    let mut buffer = Vec::new();
    buffer.try_reserve_exact(len).map_err(|e| {
        Error::ResourceExhausted(format!("Failed to allocate {} ({} elements): {}", what, len, e))
    })?;
    buffer.resize(len, value);
    Ok(buffer)
}
