//! Audio decoder using symphonia
//!
//! Decodes WAV, AIFF, FLAC and OGG/Vorbis streams read through the
//! [`StreamBridge`] and serves them as frame-addressed interleaved samples.
//!
//! Seeking uses symphonia's accurate seek mode. The demuxer may land on a
//! packet boundary before the requested frame; the frames in between are
//! decoded and discarded so reads start exactly at the requested frame.

use crate::audio::bridge::StreamBridge;
use crate::audio::codec::{float_to_i16, AudioCodec};
use crate::audio::types::{ContainerKind, StreamFormat};
use mirage_common::{Error, Result};
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{
    Decoder, DecoderOptions, CODEC_TYPE_FLAC, CODEC_TYPE_NULL, CODEC_TYPE_VORBIS,
};
use symphonia::core::errors::{Error as SymphoniaError, SeekErrorKind};
use symphonia::core::formats::{FormatOptions, FormatReader, SeekMode, SeekTo};
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::{debug, trace, warn};

/// Frame-addressed decoder over a symphonia format reader.
pub struct SymphoniaCodec {
    /// Symphonia format reader
    format_reader: Box<dyn FormatReader>,

    /// Symphonia decoder
    decoder: Box<dyn Decoder>,

    /// Track being decoded
    track_id: u32,

    format: StreamFormat,

    /// Interleaved samples decoded but not yet returned
    pending: Vec<f32>,
    pending_pos: usize,

    /// Scratch for packet conversion, grown to the largest packet seen
    sample_buf: Option<SampleBuffer<f32>>,

    /// Scratch for 16-bit reads
    float_scratch: Vec<f32>,

    /// Frames to discard after a seek landed early
    skip_frames: u64,

    /// Frame index of the next frame returned by a read
    position: u64,

    end_of_stream: bool,
}

impl SymphoniaCodec {
    /// Probe the stream and open a decoder for its default audio track.
    ///
    /// # Errors
    /// `UnsupportedFormat` if the data cannot be probed, has no audio track,
    /// or does not report sample rate, channel count or length.
    pub fn open(bridge: StreamBridge) -> Result<Self> {
        let seekable = bridge.is_seekable();

        // Create a hint to help the format registry guess the format
        let mut hint = Hint::new();
        let filename = bridge.filename().map(str::to_owned);
        if let Some(extension) = filename
            .as_deref()
            .and_then(|f| std::path::Path::new(f).extension())
            .and_then(|e| e.to_str())
        {
            hint.with_extension(extension);
        }

        let mss = MediaSourceStream::new(Box::new(bridge), Default::default());

        let probed = symphonia::default::get_probe()
            .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
            .map_err(|e| Error::UnsupportedFormat(format!("Failed to probe format: {}", e)))?;

        let format_reader = probed.format;
        let sections = format_reader
            .tracks()
            .iter()
            .filter(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .count() as u32;

        // Get the default audio track
        let track = format_reader
            .default_track()
            .filter(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or_else(|| Error::UnsupportedFormat("No audio track found".to_string()))?;

        let track_id = track.id;
        let codec_params = track.codec_params.clone();

        let sample_rate = codec_params
            .sample_rate
            .ok_or_else(|| Error::UnsupportedFormat("Sample rate not found".to_string()))?;
        let channels = codec_params
            .channels
            .map(|c| c.count() as u16)
            .ok_or_else(|| Error::UnsupportedFormat("Channel count not found".to_string()))?;
        let frames = codec_params
            .n_frames
            .ok_or_else(|| Error::UnsupportedFormat("Stream length not found".to_string()))?;

        let container = if codec_params.codec == CODEC_TYPE_FLAC {
            ContainerKind::Flac
        } else if codec_params.codec == CODEC_TYPE_VORBIS {
            ContainerKind::Ogg
        } else {
            filename
                .as_deref()
                .and_then(ContainerKind::from_filename)
                .unwrap_or(ContainerKind::Wav)
        };

        let decoder = symphonia::default::get_codecs()
            .make(&codec_params, &DecoderOptions::default())
            .map_err(|e| Error::UnsupportedFormat(format!("Failed to create decoder: {}", e)))?;

        Ok(Self {
            format_reader,
            decoder,
            track_id,
            format: StreamFormat {
                sample_rate,
                channels,
                frames,
                container,
                sections,
                seekable,
            },
            pending: Vec::new(),
            pending_pos: 0,
            sample_buf: None,
            float_scratch: Vec::new(),
            skip_frames: 0,
            position: 0,
            end_of_stream: false,
        })
    }

    fn channels(&self) -> usize {
        self.format.channels as usize
    }

    fn clear_pending(&mut self) {
        self.pending.clear();
        self.pending_pos = 0;
    }

    /// Decode the next packet of our track into `pending`.
    ///
    /// Returns false at end of stream.
    fn decode_next_packet(&mut self) -> Result<bool> {
        loop {
            let packet = match self.format_reader.next_packet() {
                Ok(packet) => packet,
                Err(SymphoniaError::IoError(ref e))
                    if e.kind() == std::io::ErrorKind::UnexpectedEof =>
                {
                    trace!("Reached end of stream");
                    self.end_of_stream = true;
                    return Ok(false);
                }
                Err(SymphoniaError::ResetRequired) => {
                    self.decoder.reset();
                    continue;
                }
                Err(e) => return Err(Error::Codec(format!("Error reading packet: {}", e))),
            };

            // Skip packets for other tracks
            if packet.track_id() != self.track_id {
                continue;
            }

            let decoded = match self.decoder.decode(&packet) {
                Ok(decoded) => decoded,
                Err(SymphoniaError::DecodeError(e)) => {
                    warn!("Decode error: {}", e);
                    continue;
                }
                Err(e) => return Err(Error::Codec(format!("Decoder failed: {}", e))),
            };

            let spec = *decoded.spec();
            let capacity = decoded.capacity() as u64;
            let needs_new_buffer = self
                .sample_buf
                .as_ref()
                .map_or(true, |buf| (buf.capacity() as u64) < capacity * spec.channels.count() as u64);
            if needs_new_buffer {
                self.sample_buf = Some(SampleBuffer::<f32>::new(capacity, spec));
            }

            let Some(sample_buf) = self.sample_buf.as_mut() else {
                continue;
            };
            sample_buf.copy_interleaved_ref(decoded);

            let channels = self.format.channels as usize;
            self.pending.clear();
            self.pending.extend_from_slice(sample_buf.samples());
            self.pending_pos = 0;

            // Discard frames before the seek target
            if self.skip_frames > 0 {
                let available = (self.pending.len() / channels) as u64;
                let skipped = self.skip_frames.min(available);
                self.pending_pos = skipped as usize * channels;
                self.skip_frames -= skipped;
            }

            return Ok(true);
        }
    }
}

impl AudioCodec for SymphoniaCodec {
    fn format(&self) -> &StreamFormat {
        &self.format
    }

    fn seek_frames(&mut self, frame: u64) -> Result<u64> {
        if frame == self.position && self.skip_frames == 0 {
            return Ok(frame);
        }

        if frame >= self.format.frames {
            trace!("Seek to frame {} is past end ({} frames)", frame, self.format.frames);
            self.clear_pending();
            self.skip_frames = 0;
            self.position = frame;
            self.end_of_stream = true;
            return Ok(frame);
        }

        let seeked = match self.format_reader.seek(
            SeekMode::Accurate,
            SeekTo::TimeStamp {
                ts: frame,
                track_id: self.track_id,
            },
        ) {
            Ok(seeked) => seeked,
            Err(SymphoniaError::SeekError(SeekErrorKind::OutOfRange)) => {
                self.clear_pending();
                self.position = frame;
                self.end_of_stream = true;
                return Ok(frame);
            }
            Err(e) => return Err(Error::Codec(format!("Failed to seek to frame {}: {}", frame, e))),
        };

        self.decoder.reset();
        self.clear_pending();
        self.skip_frames = seeked.required_ts.saturating_sub(seeked.actual_ts);
        self.position = frame;
        self.end_of_stream = false;

        debug!(
            "Seeked to frame {} (landed at {}, skipping {})",
            frame, seeked.actual_ts, self.skip_frames
        );

        Ok(frame)
    }

    fn read_frames_f32(&mut self, out: &mut [f32]) -> Result<usize> {
        let channels = self.channels();
        let wanted = out.len() / channels * channels;
        let mut filled = 0;

        while filled < wanted {
            if self.pending_pos >= self.pending.len() {
                if self.end_of_stream || !self.decode_next_packet()? {
                    break;
                }
                continue;
            }

            let count = (wanted - filled).min(self.pending.len() - self.pending_pos);
            out[filled..filled + count]
                .copy_from_slice(&self.pending[self.pending_pos..self.pending_pos + count]);
            filled += count;
            self.pending_pos += count;
        }

        let frames = filled / channels;
        self.position += frames as u64;
        Ok(frames)
    }

    fn read_frames_i16(&mut self, out: &mut [i16]) -> Result<usize> {
        let mut scratch = std::mem::take(&mut self.float_scratch);
        scratch.resize(out.len(), 0.0);

        let result = self.read_frames_f32(&mut scratch);
        if let Ok(frames) = &result {
            let samples = *frames * self.channels();
            float_to_i16(&scratch[..samples], &mut out[..samples]);
        }

        self.float_scratch = scratch;
        result
    }

    fn write_frames_i16(&mut self, _input: &[i16]) -> Result<usize> {
        Err(Error::NotWritable)
    }
}

impl std::fmt::Debug for SymphoniaCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SymphoniaCodec")
            .field("track_id", &self.track_id)
            .field("format", &self.format)
            .field("position", &self.position)
            .finish()
    }
}
