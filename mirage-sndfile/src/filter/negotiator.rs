//! Format negotiation
//!
//! Opens the codec on the underlying stream, checks that its format can be
//! presented as CD-DA PCM, computes the virtual stream geometry and sets up
//! the block cache and resampler.

use super::block_cache::{BlockCache, ResamplerState};
use super::{SndfileFilterStream, SndfileOptions};
use crate::audio::bridge::StreamBridge;
use crate::audio::codec::{open_codec, AudioCodec, OpenMode};
use crate::audio::resampler::BlockResampler;
use crate::audio::types::{
    ContainerKind, StreamFormat, VirtualStreamGeometry, MAX_SAMPLE_RATE, REQUIRED_CHANNELS,
};
use mirage_common::{Error, Result, Stream};
use std::io::{Seek, SeekFrom};
use tracing::{debug, info, warn};

/// Format to create for a new file, chosen by the filename's suffix.
///
/// Unknown or missing suffixes fall back to headerless PCM.
pub fn creation_format(filename: Option<&str>, seekable: bool) -> StreamFormat {
    let container = match filename.and_then(ContainerKind::from_filename) {
        Some(container) => container,
        None => {
            warn!(
                "cannot determine container format for {:?}; writing raw PCM",
                filename
            );
            ContainerKind::Raw
        }
    };

    StreamFormat::for_creation(container, seekable)
}

/// Reject formats that cannot back a virtual CD-DA stream
pub fn validate_format(format: &StreamFormat) -> Result<()> {
    if !format.seekable {
        return Err(Error::UnsupportedFormat(
            "Sound file is not seekable".to_string(),
        ));
    }

    if format.channels != REQUIRED_CHANNELS {
        return Err(Error::UnsupportedFormat(format!(
            "Invalid number of channels in sound file (only 2 channels supported, got {})",
            format.channels
        )));
    }

    // Checked before any block buffer is sized from the rate
    if format.sample_rate == 0 || format.sample_rate > MAX_SAMPLE_RATE {
        return Err(Error::UnsupportedFormat(format!(
            "Unsupported sample rate {} Hz (maximum {} Hz)",
            format.sample_rate, MAX_SAMPLE_RATE
        )));
    }

    Ok(())
}

fn log_format(format: &StreamFormat) {
    debug!("sound file format:");
    debug!(" container: {}", format.container);
    debug!(" frames: {}", format.frames);
    debug!(" samplerate: {}", format.sample_rate);
    debug!(" channels: {}", format.channels);
    debug!(" sections: {}", format.sections);
    debug!(" seekable: {}", format.seekable);
}

impl SndfileFilterStream {
    /// Open the filter on `stream`.
    ///
    /// Without `writable` the stream is parsed as an existing audio file.
    /// With `writable` a new file is created, its container chosen by the
    /// stream's filename suffix, at 44.1 kHz stereo.
    ///
    /// # Errors
    /// - `UnsupportedFormat`: unparseable data, not seekable, not stereo,
    ///   or a container that cannot be created
    /// - `ResourceExhausted`: buffers could not be allocated
    /// - `InitializationFailure`: the resampler could not be created
    pub fn open_with_options(
        stream: Box<dyn Stream>,
        writable: bool,
        options: &SndfileOptions,
    ) -> Result<Self> {
        let mut bridge = StreamBridge::new(stream);

        let mode = if writable {
            OpenMode::Create(creation_format(bridge.filename(), bridge.is_seekable()))
        } else {
            OpenMode::Read
        };

        bridge.seek(SeekFrom::Start(0))?;

        let codec = open_codec(bridge, mode).map_err(|e| {
            debug!("failed to open sound file: {}", e);
            e
        })?;

        Self::from_codec(codec, writable, options)
    }

    /// Set up the filter around an already opened codec
    pub fn from_codec(
        codec: Box<dyn AudioCodec>,
        writable: bool,
        options: &SndfileOptions,
    ) -> Result<Self> {
        let format = codec.format().clone();
        if !writable {
            log_format(&format);
        }
        validate_format(&format)?;

        let resampling = if format.needs_resampling() {
            debug!(
                "sample rate {} Hz differs from 44100 Hz; resampling with {:?} interpolation",
                format.sample_rate, options.resampler_quality
            );
            Some(ResamplerState::new(&format, options.resampler_quality)?)
        } else {
            None
        };

        Self::assemble(codec, format, writable, resampling)
    }

    /// Set up a read-only filter that resamples with `resampler`.
    ///
    /// The resampler is only used if the codec's rate is not 44.1 kHz.
    pub fn with_resampler(
        codec: Box<dyn AudioCodec>,
        resampler: Box<dyn BlockResampler>,
    ) -> Result<Self> {
        let format = codec.format().clone();
        log_format(&format);
        validate_format(&format)?;

        let resampling = if format.needs_resampling() {
            Some(ResamplerState::with_resampler(&format, resampler)?)
        } else {
            None
        };

        Self::assemble(codec, format, false, resampling)
    }

    fn assemble(
        codec: Box<dyn AudioCodec>,
        format: StreamFormat,
        writable: bool,
        resampling: Option<ResamplerState>,
    ) -> Result<Self> {
        let geometry = VirtualStreamGeometry::from_format(&format);
        debug!("virtual stream length: {} bytes", geometry.length);

        if let Some(state) = &resampling {
            debug!(
                "io ratio: {:.4}, {} native frames per block",
                state.io_ratio(),
                state.native_block_frames()
            );
        }

        let cache = BlockCache::new(format.channels as usize, resampling)?;

        info!(
            "opened {} stream: {} Hz, {} frames, {} virtual bytes{}",
            format.container,
            format.sample_rate,
            format.frames,
            geometry.length,
            if writable { " (writable)" } else { "" }
        );

        Ok(Self {
            codec,
            format,
            geometry,
            cache,
            writable,
            write_scratch: Vec::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::resampler::{ResampleOutcome, ResampleWarning};
    use crate::filter::test_support::MockCodec;
    use mirage_common::{FilterStream, MemoryStream};

    /// Writes half-scale samples and counts its calls
    struct ConstantResampler {
        calls: std::sync::Arc<std::sync::atomic::AtomicUsize>,
    }

    impl BlockResampler for ConstantResampler {
        fn reset(&mut self) {}

        fn process(
            &mut self,
            input: &[f32],
            output: &mut [f32],
            _end_of_input: bool,
        ) -> std::result::Result<ResampleOutcome, ResampleWarning> {
            self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            output.fill(0.5);
            Ok(ResampleOutcome {
                input_frames_used: input.len() / 2,
                output_frames_generated: output.len() / 2,
            })
        }
    }

    #[test]
    fn test_creation_format_by_suffix() {
        assert_eq!(creation_format(Some("out.wav"), true).container, ContainerKind::Wav);
        assert_eq!(creation_format(Some("OUT.OGG"), true).container, ContainerKind::Ogg);
        assert_eq!(creation_format(Some("image.bin"), true).container, ContainerKind::Raw);
        assert_eq!(creation_format(None, true).container, ContainerKind::Raw);
    }

    #[test]
    fn test_mono_is_rejected() {
        let codec = MockCodec::new(44100, 1, 1000);
        let result = SndfileFilterStream::from_codec(Box::new(codec), false, &SndfileOptions::default());
        assert!(matches!(result, Err(Error::UnsupportedFormat(_))));
    }

    #[test]
    fn test_non_seekable_is_rejected() {
        let codec = MockCodec::new(44100, 2, 1000).non_seekable();
        let result = SndfileFilterStream::from_codec(Box::new(codec), false, &SndfileOptions::default());
        assert!(matches!(result, Err(Error::UnsupportedFormat(_))));
    }

    #[test]
    fn test_implausible_sample_rate_is_rejected() {
        for rate in [0, MAX_SAMPLE_RATE + 1, 2_000_000_000] {
            let codec = MockCodec::new(rate, 2, 10);
            let result =
                SndfileFilterStream::from_codec(Box::new(codec), false, &SndfileOptions::default());
            assert!(matches!(result, Err(Error::UnsupportedFormat(_))), "rate {}", rate);
        }

        let codec = MockCodec::new(MAX_SAMPLE_RATE, 2, 10);
        let filter =
            SndfileFilterStream::from_codec(Box::new(codec), false, &SndfileOptions::default())
                .unwrap();
        assert!(filter.is_resampling());
    }

    #[test]
    fn test_custom_resampler_is_used_for_reads() {
        let calls = std::sync::Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let resampler = ConstantResampler {
            calls: calls.clone(),
        };
        let codec = MockCodec::new(32000, 2, 32000);
        let mut filter = SndfileFilterStream::with_resampler(Box::new(codec), Box::new(resampler))
            .unwrap();

        assert!(filter.is_resampling());
        assert!(!filter.is_writable());
        assert_eq!(filter.stream_length(), 176400);

        let mut buf = [0u8; 8];
        assert_eq!(filter.partial_read(100, &mut buf).unwrap(), 8);
        assert_eq!(i16::from_le_bytes([buf[0], buf[1]]), 16384);
        assert_eq!(i16::from_le_bytes([buf[6], buf[7]]), 16384);
        assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 1);
    }

    #[test]
    fn test_custom_resampler_ignored_at_native_rate() {
        let calls = std::sync::Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let resampler = ConstantResampler {
            calls: calls.clone(),
        };
        let codec = MockCodec::new(44100, 2, 100);
        let mut filter = SndfileFilterStream::with_resampler(Box::new(codec), Box::new(resampler))
            .unwrap();

        let mut buf = [0u8; 4];
        filter.partial_read(4, &mut buf).unwrap();
        assert!(!filter.is_resampling());
        assert_eq!(i16::from_le_bytes([buf[0], buf[1]]), 1);
        assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 0);
    }

    #[test]
    fn test_native_rate_length_is_exact() {
        let codec = MockCodec::new(44100, 2, 44100);
        let filter =
            SndfileFilterStream::from_codec(Box::new(codec), false, &SndfileOptions::default())
                .unwrap();

        assert_eq!(filter.stream_length(), 176400);
        assert_eq!(filter.geometry().block_size, 176400);
        assert!(!filter.is_resampling());
        assert_eq!(filter.cached_block(), None);
    }

    #[test]
    fn test_resampled_length() {
        let codec = MockCodec::new(22050, 2, 44100);
        let filter =
            SndfileFilterStream::from_codec(Box::new(codec), false, &SndfileOptions::default())
                .unwrap();

        assert_eq!(filter.stream_length(), 352800);
        assert!(filter.is_resampling());
    }

    #[test]
    fn test_open_garbage_fails() {
        let stream = MemoryStream::new(vec![0x5Au8; 4096]).with_filename("noise.wav");
        let result = SndfileFilterStream::open(Box::new(stream), false);
        assert!(matches!(result, Err(Error::UnsupportedFormat(_))));
    }

    #[test]
    fn test_create_unknown_suffix_is_raw() {
        let stream = MemoryStream::new(Vec::new()).with_filename("track01.bin");
        let filter = SndfileFilterStream::open(Box::new(stream), true).unwrap();

        assert_eq!(filter.format().container, ContainerKind::Raw);
        assert_eq!(filter.stream_length(), 0);
        assert!(filter.is_writable());
    }

    #[test]
    fn test_create_flac_fails() {
        let stream = MemoryStream::new(Vec::new()).with_filename("track01.flac");
        let result = SndfileFilterStream::open(Box::new(stream), true);
        assert!(matches!(result, Err(Error::UnsupportedFormat(_))));
    }
}
