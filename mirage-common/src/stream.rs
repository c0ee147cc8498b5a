//! Underlying stream abstraction
//!
//! A [`Stream`] is the byte source/sink a filter stream is opened on top of.
//! It is a plain `Read + Write + Seek` object that additionally knows its
//! filename (used to pick a container when creating files) and whether it
//! may be written to or seeked.

use crate::{Error, Result};
use std::fs::{File, OpenOptions};
use std::io::{Cursor, Read, Seek, SeekFrom, Write};
use std::path::Path;

/// Seekable byte stream underneath a filter stream.
pub trait Stream: Read + Write + Seek + Send + Sync {
    /// Filename of the stream, if it is backed by a file
    fn filename(&self) -> Option<&str>;

    /// Whether the stream accepts writes
    fn is_writable(&self) -> bool;

    /// Whether the stream supports random access
    fn is_seekable(&self) -> bool {
        true
    }

    /// Length of the stream in bytes.
    ///
    /// Derived by seeking to the end and restoring the previous position.
    fn file_length(&mut self) -> std::io::Result<u64> {
        let position = self.stream_position()?;
        let length = self.seek(SeekFrom::End(0))?;
        self.seek(SeekFrom::Start(position))?;
        Ok(length)
    }
}

/// Stream backed by a file on disk.
#[derive(Debug)]
pub struct FileStream {
    file: File,
    filename: String,
    writable: bool,
}

impl FileStream {
    /// Open an existing file read-only
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path.as_ref()).map_err(|e| {
            Error::Io(std::io::Error::new(
                e.kind(),
                format!("Failed to open {}: {}", path.as_ref().display(), e),
            ))
        })?;

        Ok(Self {
            file,
            filename: path.as_ref().to_string_lossy().into_owned(),
            writable: false,
        })
    }

    /// Create (or truncate) a file for reading and writing
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path.as_ref())
            .map_err(|e| {
                Error::Io(std::io::Error::new(
                    e.kind(),
                    format!("Failed to create {}: {}", path.as_ref().display(), e),
                ))
            })?;

        Ok(Self {
            file,
            filename: path.as_ref().to_string_lossy().into_owned(),
            writable: true,
        })
    }
}

impl Read for FileStream {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.file.read(buf)
    }
}

impl Write for FileStream {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        if !self.writable {
            return Err(Error::NotWritable.into());
        }
        self.file.write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.file.flush()
    }
}

impl Seek for FileStream {
    fn seek(&mut self, pos: SeekFrom) -> std::io::Result<u64> {
        self.file.seek(pos)
    }
}

impl Stream for FileStream {
    fn filename(&self) -> Option<&str> {
        Some(&self.filename)
    }

    fn is_writable(&self) -> bool {
        self.writable
    }
}

/// In-memory stream over a byte vector.
///
/// Always writable. Can be flagged non-seekable to model pipes and
/// sockets; the flag is advisory and only reported through
/// [`Stream::is_seekable`].
#[derive(Debug, Default)]
pub struct MemoryStream {
    data: Cursor<Vec<u8>>,
    filename: Option<String>,
    seekable: bool,
}

impl MemoryStream {
    pub fn new(data: Vec<u8>) -> Self {
        Self {
            data: Cursor::new(data),
            filename: None,
            seekable: true,
        }
    }

    /// Attach a filename (used for suffix-based container selection)
    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }

    pub fn non_seekable(mut self) -> Self {
        self.seekable = false;
        self
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.data.into_inner()
    }
}

impl Read for MemoryStream {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.data.read(buf)
    }
}

impl Write for MemoryStream {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.data.write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl Seek for MemoryStream {
    fn seek(&mut self, pos: SeekFrom) -> std::io::Result<u64> {
        self.data.seek(pos)
    }
}

impl Stream for MemoryStream {
    fn filename(&self) -> Option<&str> {
        self.filename.as_deref()
    }

    fn is_writable(&self) -> bool {
        true
    }

    fn is_seekable(&self) -> bool {
        self.seekable
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_length_restores_position() {
        let mut stream = MemoryStream::new(vec![0u8; 100]);
        stream.seek(SeekFrom::Start(42)).unwrap();

        assert_eq!(stream.file_length().unwrap(), 100);
        assert_eq!(stream.stream_position().unwrap(), 42);
    }

    #[test]
    fn test_memory_stream_flags() {
        let stream = MemoryStream::new(Vec::new())
            .with_filename("track01.wav")
            .non_seekable();

        assert_eq!(stream.filename(), Some("track01.wav"));
        assert!(!stream.is_seekable());
        assert!(stream.is_writable());
    }

    #[test]
    fn test_file_stream_read_only_rejects_writes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.bin");
        std::fs::write(&path, b"abcd").unwrap();

        let mut stream = FileStream::open(&path).unwrap();
        assert!(!stream.is_writable());
        assert!(stream.write(b"x").is_err());

        let mut buf = [0u8; 4];
        stream.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"abcd");
    }

    #[test]
    fn test_file_stream_create_is_writable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.raw");

        let mut stream = FileStream::create(&path).unwrap();
        stream.write_all(b"pcm!").unwrap();
        stream.flush().unwrap();

        assert!(stream.filename().unwrap().ends_with("out.raw"));
        assert_eq!(stream.file_length().unwrap(), 4);
    }

    #[test]
    fn test_open_missing_file_fails() {
        let result = FileStream::open("/nonexistent/track.wav");
        assert!(matches!(result, Err(Error::Io(_))));
    }
}
