//! # Mirage Common Library
//!
//! Shared code for mirage filter streams:
//! - Underlying stream abstraction (`Stream`, `FileStream`, `MemoryStream`)
//! - Filter stream capability trait and the position-managing host
//! - Error types
//! - Configuration file resolution

pub mod config;
pub mod error;
pub mod filter_stream;
pub mod stream;

pub use error::{Error, Result};
pub use filter_stream::{FileType, FilterStream, FilterStreamInfo, SimplifiedStream};
pub use stream::{FileStream, MemoryStream, Stream};
