//! Codec interface
//!
//! The filter talks to container/codec implementations through
//! [`AudioCodec`], which works in native frames: seek to a frame, read
//! interleaved frames as 16-bit integers or floats, write 16-bit frames.
//! Dropping a codec closes it.

use crate::audio::bridge::StreamBridge;
use crate::audio::decoder::SymphoniaCodec;
use crate::audio::types::{ContainerKind, StreamFormat};
use crate::audio::writer::{RawPcmCodec, WavWriterCodec};
use mirage_common::{Error, Result};

/// Frame-addressed access to an encoded audio stream.
///
/// Buffers are interleaved; their length must be a multiple of the
/// channel count. All counts returned are in frames.
pub trait AudioCodec: Send {
    /// Format of the stream; `frames` reflects writes made so far
    fn format(&self) -> &StreamFormat;

    /// Current number of native frames
    fn frames(&self) -> u64 {
        self.format().frames
    }

    /// Position the codec so the next read or write starts at `frame`.
    ///
    /// Seeking at or past the end is allowed for reading and yields
    /// end-of-stream on the next read.
    fn seek_frames(&mut self, frame: u64) -> Result<u64>;

    /// Read frames as 16-bit samples; 0 means end of stream
    fn read_frames_i16(&mut self, out: &mut [i16]) -> Result<usize>;

    /// Read frames as float samples in [-1.0, 1.0]; 0 means end of stream
    fn read_frames_f32(&mut self, out: &mut [f32]) -> Result<usize>;

    /// Write frames of 16-bit samples at the current position
    fn write_frames_i16(&mut self, input: &[i16]) -> Result<usize>;
}

/// How a codec is opened on top of the stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OpenMode {
    /// Parse existing data; the codec reports the format
    Read,

    /// Create new content with the given format
    Create(StreamFormat),
}

/// Open a codec over `bridge`.
///
/// Reading supports everything symphonia can probe. Creating supports WAV
/// (via hound) and raw PCM; there is no encoder for AIFF, FLAC or OGG.
pub fn open_codec(bridge: StreamBridge, mode: OpenMode) -> Result<Box<dyn AudioCodec>> {
    match mode {
        OpenMode::Read => Ok(Box::new(SymphoniaCodec::open(bridge)?)),
        OpenMode::Create(format) => match format.container {
            ContainerKind::Wav => Ok(Box::new(WavWriterCodec::create(bridge, format)?)),
            ContainerKind::Raw => Ok(Box::new(RawPcmCodec::new(bridge, format))),
            other => Err(Error::UnsupportedFormat(format!(
                "Creating {} files is not supported; no encoder available",
                other
            ))),
        },
    }
}

/// Convert float samples to 16-bit with clipping.
///
/// Scales by 32768 so that values decoded from 16-bit sources convert back
/// exactly.
pub fn float_to_i16(input: &[f32], output: &mut [i16]) {
    for (out, &sample) in output.iter_mut().zip(input) {
        *out = (sample * 32768.0).round().clamp(i16::MIN as f32, i16::MAX as f32) as i16;
    }
}

/// Convert 16-bit samples to floats in [-1.0, 1.0)
pub fn i16_to_float(input: &[i16], output: &mut [f32]) {
    for (out, &sample) in output.iter_mut().zip(input) {
        *out = sample as f32 / 32768.0;
    }
}
