//! Write path
//!
//! Writes are passed straight to the codec in native frames. They are not
//! resampled; a writable filter is always created at 44.1 kHz, so native
//! frames and virtual frames coincide.

use super::SndfileFilterStream;
use crate::audio::try_alloc;
use crate::audio::types::{VirtualStreamGeometry, BLOCK_FRAMES, BYTES_PER_SAMPLE, REQUIRED_CHANNELS};
use mirage_common::{Error, Result};
use std::io::{self, Read, Write};
use tracing::{debug, trace};

const PCM_FRAME_BYTES: usize = REQUIRED_CHANNELS as usize * BYTES_PER_SAMPLE;

/// Copy raw PCM from `reader` into `writer` in whole frames.
///
/// Reads may return any number of bytes; partial frames are carried over
/// to the next write. Returns the bytes written and the count of trailing
/// bytes at end of input that did not make up a frame and were dropped.
pub fn copy_whole_frames<R: Read, W: Write>(
    reader: &mut R,
    writer: &mut W,
) -> io::Result<(u64, usize)> {
    let mut buffer = vec![0u8; BLOCK_FRAMES * PCM_FRAME_BYTES];
    let mut pending = 0;
    let mut copied = 0u64;

    loop {
        let n = match reader.read(&mut buffer[pending..]) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        pending += n;

        let whole = pending - pending % PCM_FRAME_BYTES;
        writer.write_all(&buffer[..whole])?;
        copied += whole as u64;

        buffer.copy_within(whole..pending, 0);
        pending -= whole;
    }

    Ok((copied, pending))
}

impl SndfileFilterStream {
    /// Write PCM bytes at virtual `position`.
    ///
    /// Only whole frames are written; trailing bytes that do not form a
    /// frame are ignored. Returns the number of bytes written, after which
    /// the stream length reflects the codec's new frame count.
    pub(crate) fn write_at(&mut self, position: u64, buf: &[u8]) -> Result<usize> {
        if !self.writable {
            return Err(Error::NotWritable);
        }

        let bytes_per_frame = self.format.bytes_per_frame();
        let frame_offset = position / bytes_per_frame as u64;
        trace!(
            "writing {} (0x{:X}) bytes at position {} (frame {})",
            buf.len(),
            buf.len(),
            position,
            frame_offset
        );

        self.codec.seek_frames(frame_offset)?;

        let frame_count = buf.len() / bytes_per_frame;
        let sample_count = frame_count * self.format.channels as usize;
        if self.write_scratch.len() < sample_count {
            self.write_scratch = try_alloc(sample_count, 0i16, "write buffer")?;
        }

        let samples = &mut self.write_scratch[..sample_count];
        for (sample, bytes) in samples.iter_mut().zip(buf.chunks_exact(2)) {
            *sample = i16::from_le_bytes([bytes[0], bytes[1]]);
        }

        let frames_written = self.codec.write_frames_i16(samples)?;
        let bytes_written = frames_written * bytes_per_frame;
        trace!("wrote {} frames", frames_written);

        // Blocks touched by the write no longer match the cache
        let start_block = self.geometry.block_index(position);
        let end_block = self
            .geometry
            .block_index(position + bytes_written as u64 + self.geometry.block_size as u64 - 1);
        self.cache.invalidate_range(start_block, end_block);

        self.format.frames = self.codec.frames();
        self.geometry = VirtualStreamGeometry::from_format(&self.format);
        debug!("stream length now {} bytes", self.geometry.length);

        Ok(bytes_written)
    }
}
