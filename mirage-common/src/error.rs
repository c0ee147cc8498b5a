//! Common error types for mirage filter streams

use thiserror::Error;

/// Common result type for filter stream operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors shared by the filter stream framework and its filters
#[derive(Error, Debug)]
pub enum Error {
    /// Data cannot be handled by the filter (not seekable, wrong channel
    /// count, codec could not be opened, no encoder for the container)
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// Working buffer could not be allocated
    #[error("Resource exhausted: {0}")]
    ResourceExhausted(String),

    /// A collaborator (e.g. the resampler) failed to construct
    #[error("Initialization failure: {0}")]
    InitializationFailure(String),

    /// Codec failed while seeking, decoding or encoding
    #[error("Codec error: {0}")]
    Codec(String),

    /// Write attempted on a stream opened read-only
    #[error("Stream is not writable")]
    NotWritable,

    /// Seek target is invalid (e.g. before beginning of stream)
    #[error("Invalid seek: {0}")]
    InvalidSeek(String),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<Error> for std::io::Error {
    fn from(err: Error) -> Self {
        match err {
            Error::Io(e) => e,
            Error::InvalidSeek(msg) => std::io::Error::new(std::io::ErrorKind::InvalidInput, msg),
            Error::NotWritable => {
                std::io::Error::new(std::io::ErrorKind::PermissionDenied, Error::NotWritable)
            }
            other => std::io::Error::other(other),
        }
    }
}
