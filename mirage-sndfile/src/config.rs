//! Configuration for mirage-sndfile
//!
//! Settings come from an optional TOML file (see
//! [`mirage_common::config`] for how the file is located). Every field has
//! a built-in default, so an empty or missing file is valid.
//!
//! ```toml
//! [logging]
//! level = "debug"
//!
//! [resampler]
//! quality = "cubic"
//! ```
//!
//! Command-line arguments override file values.

use crate::audio::resampler::ResamplerQuality;
use crate::filter::SndfileOptions;
use serde::Deserialize;

/// Configuration loaded from TOML file
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlConfig {
    /// Logging configuration (optional)
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Resampler configuration (optional)
    #[serde(default)]
    pub resampler: ResamplerConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// Resampler configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResamplerConfig {
    /// Interpolation quality (nearest, linear, cubic, quintic, septic)
    #[serde(default)]
    pub quality: ResamplerQuality,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl TomlConfig {
    /// Filter options, with `quality` overriding the configured quality
    pub fn filter_options(&self, quality: Option<ResamplerQuality>) -> SndfileOptions {
        SndfileOptions {
            resampler_quality: quality.unwrap_or(self.resampler.quality),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_log_level() {
        assert_eq!(default_log_level(), "info");
    }

    #[test]
    fn test_empty_file_uses_defaults() {
        let config: TomlConfig = toml::from_str("").unwrap();
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.resampler.quality, ResamplerQuality::Linear);
    }

    #[test]
    fn test_parse_full_file() {
        let config: TomlConfig = toml::from_str(
            r#"
            [logging]
            level = "trace"

            [resampler]
            quality = "septic"
            "#,
        )
        .unwrap();

        assert_eq!(config.logging.level, "trace");
        assert_eq!(config.resampler.quality, ResamplerQuality::Septic);
    }

    #[test]
    fn test_unknown_quality_is_rejected() {
        let result: Result<TomlConfig, _> = toml::from_str("[resampler]\nquality = \"sinc\"\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_quality_overrides_file() {
        let config: TomlConfig = toml::from_str("[resampler]\nquality = \"cubic\"\n").unwrap();

        assert_eq!(
            config.filter_options(None).resampler_quality,
            ResamplerQuality::Cubic
        );
        assert_eq!(
            config.filter_options(Some(ResamplerQuality::Nearest)).resampler_quality,
            ResamplerQuality::Nearest
        );
    }
}
