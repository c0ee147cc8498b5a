//! Filter stream framework
//!
//! A filter stream is opened on top of an underlying [`Stream`] and
//! presents a different view of its data (for example, decoded PCM on top
//! of an encoded audio file).
//!
//! Filters implement the small [`FilterStream`] capability set and
//! register the length of the stream they present. [`SimplifiedStream`]
//! hosts a filter: it owns the current position, splits reads and writes
//! into partial operations, and exposes the result through
//! `std::io::{Read, Write, Seek}`.

use crate::stream::Stream;
use crate::{Error, Result};
use std::io::{Read, Seek, SeekFrom, Write};
use tracing::{trace, warn};

/// File type handled by a filter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileType {
    pub description: &'static str,
    pub mime_type: &'static str,
}

/// Static description of a filter stream implementation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterStreamInfo {
    pub id: &'static str,
    pub name: &'static str,
    pub writable: bool,
    pub file_types: Vec<FileType>,
}

/// Capability set of a filter stream implementation.
///
/// `partial_read` and `partial_write` may transfer fewer bytes than
/// requested; the host calls them repeatedly. A partial read returning 0
/// means no more data is available at `position`.
pub trait FilterStream: Send {
    /// Open the filter on top of `stream`.
    ///
    /// With `writable` set, the filter creates new content in the stream
    /// instead of parsing existing data.
    fn open(stream: Box<dyn Stream>, writable: bool) -> Result<Self>
    where
        Self: Sized;

    /// Description of the filter
    fn info(&self) -> FilterStreamInfo;

    /// Length of the presented stream, as registered by the filter
    fn stream_length(&self) -> u64;

    /// Whether the filter was opened for writing
    fn is_writable(&self) -> bool;

    /// Read up to `buf.len()` bytes at `position`
    fn partial_read(&mut self, position: u64, buf: &mut [u8]) -> Result<usize>;

    /// Write up to `buf.len()` bytes at `position`
    fn partial_write(&mut self, _position: u64, _buf: &[u8]) -> Result<usize> {
        Err(Error::NotWritable)
    }
}

/// Host that manages position for a [`FilterStream`].
#[derive(Debug)]
pub struct SimplifiedStream<F: FilterStream> {
    filter: F,
    position: u64,
}

impl<F: FilterStream> SimplifiedStream<F> {
    /// Open filter `F` on top of `stream` and wrap it
    pub fn open(stream: Box<dyn Stream>, writable: bool) -> Result<Self> {
        Ok(Self::new(F::open(stream, writable)?))
    }

    /// Wrap an already opened filter
    pub fn new(filter: F) -> Self {
        Self { filter, position: 0 }
    }

    pub fn filter(&self) -> &F {
        &self.filter
    }

    pub fn filter_mut(&mut self) -> &mut F {
        &mut self.filter
    }

    pub fn into_inner(self) -> F {
        self.filter
    }

    pub fn position(&self) -> u64 {
        self.position
    }

    pub fn stream_length(&self) -> u64 {
        self.filter.stream_length()
    }

    /// Read until `buf` is full or the end of the stream is reached
    pub fn read_filtered(&mut self, buf: &mut [u8]) -> Result<usize> {
        trace!(
            "read {} bytes from position {} (0x{:X})",
            buf.len(),
            self.position,
            self.position
        );

        let mut total_read = 0;
        while total_read < buf.len() {
            let length = self.filter.stream_length();
            if self.position >= length {
                trace!("end of stream reached");
                break;
            }

            // Never hand out data past the registered length
            let remaining = (length - self.position).min((buf.len() - total_read) as u64) as usize;
            let read_len = self
                .filter
                .partial_read(self.position, &mut buf[total_read..total_read + remaining])?;
            if read_len == 0 {
                trace!("partial read returned no data; treating as end of stream");
                break;
            }

            total_read += read_len;
            self.position += read_len as u64;
        }

        Ok(total_read)
    }

    /// Write all of `buf`, or as much as the filter accepts
    pub fn write_filtered(&mut self, buf: &[u8]) -> Result<usize> {
        trace!(
            "write {} bytes at position {} (0x{:X})",
            buf.len(),
            self.position,
            self.position
        );

        if !self.filter.is_writable() {
            warn!("stream is not writable");
            return Err(Error::NotWritable);
        }

        let mut total_written = 0;
        while total_written < buf.len() {
            let write_len = self
                .filter
                .partial_write(self.position, &buf[total_written..])?;
            if write_len == 0 {
                break;
            }

            total_written += write_len;
            self.position += write_len as u64;
        }

        Ok(total_written)
    }

    /// Move to a new position; positions past the end are allowed
    pub fn seek_filtered(&mut self, pos: SeekFrom) -> Result<u64> {
        let new_position = match pos {
            SeekFrom::Start(offset) => Some(offset),
            SeekFrom::Current(delta) => self.position.checked_add_signed(delta),
            SeekFrom::End(delta) => self.filter.stream_length().checked_add_signed(delta),
        };

        let new_position = new_position.ok_or_else(|| {
            Error::InvalidSeek("Seek before beginning of stream not allowed".to_string())
        })?;

        trace!("seeking to position {} (0x{:X})", new_position, new_position);
        self.position = new_position;
        Ok(new_position)
    }
}

impl<F: FilterStream> Read for SimplifiedStream<F> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        Ok(self.read_filtered(buf)?)
    }
}

impl<F: FilterStream> Write for SimplifiedStream<F> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        Ok(self.write_filtered(buf)?)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl<F: FilterStream> Seek for SimplifiedStream<F> {
    fn seek(&mut self, pos: SeekFrom) -> std::io::Result<u64> {
        Ok(self.seek_filtered(pos)?)
    }
}
