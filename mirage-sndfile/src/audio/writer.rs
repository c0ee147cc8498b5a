//! Codecs for creating audio files
//!
//! - [`WavWriterCodec`]: 16-bit PCM WAV via hound. The header is rewritten
//!   after every write so the file is valid at any point. Writes append;
//!   seeking forward pads with silence, seeking backward is not supported.
//! - [`RawPcmCodec`]: headerless 16-bit little-endian interleaved PCM with
//!   random-access reads and writes.

use crate::audio::bridge::StreamBridge;
use crate::audio::codec::{i16_to_float, AudioCodec};
use crate::audio::types::StreamFormat;
use hound::{SampleFormat, WavSpec, WavWriter};
use mirage_common::{Error, Result};
use std::io::{Read, Seek, SeekFrom, Write};
use tracing::{debug, trace};

fn hound_error(e: hound::Error) -> Error {
    match e {
        hound::Error::IoError(e) => Error::Io(e),
        other => Error::Codec(format!("WAV writer error: {}", other)),
    }
}

/// Appending WAV encoder
pub struct WavWriterCodec {
    writer: WavWriter<StreamBridge>,
    format: StreamFormat,

    /// Frame the next write lands on
    position: u64,
}

impl WavWriterCodec {
    /// Write a WAV header for `format` and prepare for appending frames
    pub fn create(bridge: StreamBridge, format: StreamFormat) -> Result<Self> {
        let spec = WavSpec {
            channels: format.channels,
            sample_rate: format.sample_rate,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };

        let writer = WavWriter::new(bridge, spec).map_err(hound_error)?;
        debug!(
            "Created WAV writer: {} Hz, {} channels",
            format.sample_rate, format.channels
        );

        Ok(Self {
            writer,
            format: StreamFormat { frames: 0, ..format },
            position: 0,
        })
    }

    fn written_frames(&self) -> u64 {
        self.writer.len() as u64 / self.format.channels as u64
    }

    fn write_silence(&mut self, frames: u64) -> Result<()> {
        trace!("Padding {} frames of silence", frames);
        for _ in 0..frames * self.format.channels as u64 {
            self.writer.write_sample(0i16).map_err(hound_error)?;
        }
        Ok(())
    }
}

impl AudioCodec for WavWriterCodec {
    fn format(&self) -> &StreamFormat {
        &self.format
    }

    fn seek_frames(&mut self, frame: u64) -> Result<u64> {
        let written = self.written_frames();
        if frame < written {
            return Err(Error::Codec(format!(
                "Cannot seek back to frame {} in WAV being written ({} frames written)",
                frame, written
            )));
        }

        self.position = frame;
        Ok(frame)
    }

    fn read_frames_i16(&mut self, _out: &mut [i16]) -> Result<usize> {
        Err(Error::Codec("WAV files being created cannot be read back".to_string()))
    }

    fn read_frames_f32(&mut self, _out: &mut [f32]) -> Result<usize> {
        Err(Error::Codec("WAV files being created cannot be read back".to_string()))
    }

    fn write_frames_i16(&mut self, input: &[i16]) -> Result<usize> {
        let channels = self.format.channels as usize;
        let frames = input.len() / channels;

        let written = self.written_frames();
        if self.position > written {
            self.write_silence(self.position - written)?;
        }

        for &sample in &input[..frames * channels] {
            self.writer.write_sample(sample).map_err(hound_error)?;
        }

        // Update header so the file is consistent after every write
        self.writer.flush().map_err(hound_error)?;

        self.position += frames as u64;
        self.format.frames = self.written_frames();
        Ok(frames)
    }
}

/// Headerless 16-bit little-endian PCM
pub struct RawPcmCodec {
    bridge: StreamBridge,
    format: StreamFormat,
    byte_buf: Vec<u8>,
    sample_scratch: Vec<i16>,
}

impl RawPcmCodec {
    pub fn new(bridge: StreamBridge, format: StreamFormat) -> Self {
        let frames = bridge.initial_length().unwrap_or(0) / format.bytes_per_frame() as u64;

        Self {
            bridge,
            format: StreamFormat { frames, ..format },
            byte_buf: Vec::new(),
            sample_scratch: Vec::new(),
        }
    }

    fn bytes_per_frame(&self) -> u64 {
        self.format.bytes_per_frame() as u64
    }
}

impl AudioCodec for RawPcmCodec {
    fn format(&self) -> &StreamFormat {
        &self.format
    }

    fn seek_frames(&mut self, frame: u64) -> Result<u64> {
        self.bridge
            .seek(SeekFrom::Start(frame * self.bytes_per_frame()))?;
        Ok(frame)
    }

    fn read_frames_i16(&mut self, out: &mut [i16]) -> Result<usize> {
        let bytes_per_frame = self.bytes_per_frame() as usize;
        let wanted = out.len() / self.format.channels as usize * bytes_per_frame;
        self.byte_buf.resize(wanted, 0);

        let mut filled = 0;
        while filled < wanted {
            let n = self.bridge.read(&mut self.byte_buf[filled..])?;
            if n == 0 {
                break;
            }
            filled += n;
        }

        // Leave a trailing partial frame for the next read
        let frames = filled / bytes_per_frame;
        let leftover = filled - frames * bytes_per_frame;
        if leftover > 0 {
            self.bridge.seek(SeekFrom::Current(-(leftover as i64)))?;
        }

        for (sample, bytes) in out
            .iter_mut()
            .zip(self.byte_buf[..frames * bytes_per_frame].chunks_exact(2))
        {
            *sample = i16::from_le_bytes([bytes[0], bytes[1]]);
        }

        Ok(frames)
    }

    fn read_frames_f32(&mut self, out: &mut [f32]) -> Result<usize> {
        let mut scratch = std::mem::take(&mut self.sample_scratch);
        scratch.resize(out.len(), 0);

        let result = self.read_frames_i16(&mut scratch);
        if let Ok(frames) = &result {
            let samples = *frames * self.format.channels as usize;
            i16_to_float(&scratch[..samples], &mut out[..samples]);
        }

        self.sample_scratch = scratch;
        result
    }

    fn write_frames_i16(&mut self, input: &[i16]) -> Result<usize> {
        let channels = self.format.channels as usize;
        let frames = input.len() / channels;

        self.byte_buf.clear();
        for &sample in &input[..frames * channels] {
            self.byte_buf.extend_from_slice(&sample.to_le_bytes());
        }
        self.bridge.write_all(&self.byte_buf)?;

        let end_frame = self.bridge.stream_position()? / self.bytes_per_frame();
        self.format.frames = self.format.frames.max(end_frame);
        Ok(frames)
    }
}
