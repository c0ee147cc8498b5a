//! Virtual I/O bridge between codecs and the underlying stream
//!
//! symphonia reads through a `MediaSource`, hound writes through any
//! `Write + Seek`; both are served by the same boxed [`Stream`].

use mirage_common::Stream;
use std::io::{Read, Seek, SeekFrom, Write};
use symphonia::core::io::MediaSource;
use tracing::warn;

/// Adapts a boxed [`Stream`] to the codec libraries' I/O traits
pub struct StreamBridge {
    stream: Box<dyn Stream>,

    /// Length measured when the bridge was created; `MediaSource::byte_len`
    /// cannot seek through `&self`
    length: Option<u64>,
}

impl StreamBridge {
    pub fn new(mut stream: Box<dyn Stream>) -> Self {
        let length = if stream.is_seekable() {
            match stream.file_length() {
                Ok(length) => Some(length),
                Err(e) => {
                    warn!("Failed to determine stream length: {}", e);
                    None
                }
            }
        } else {
            None
        };

        Self { stream, length }
    }

    pub fn filename(&self) -> Option<&str> {
        self.stream.filename()
    }

    pub fn is_seekable(&self) -> bool {
        self.stream.is_seekable()
    }

    /// Stream length at the time the bridge was created
    pub fn initial_length(&self) -> Option<u64> {
        self.length
    }
}

impl Read for StreamBridge {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.stream.read(buf)
    }
}

impl Write for StreamBridge {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.stream.write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.stream.flush()
    }
}

impl Seek for StreamBridge {
    fn seek(&mut self, pos: SeekFrom) -> std::io::Result<u64> {
        self.stream.seek(pos)
    }
}

impl MediaSource for StreamBridge {
    fn is_seekable(&self) -> bool {
        self.stream.is_seekable()
    }

    fn byte_len(&self) -> Option<u64> {
        self.length
    }
}

impl std::fmt::Debug for StreamBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamBridge")
            .field("filename", &self.stream.filename())
            .field("length", &self.length)
            .finish()
    }
}
