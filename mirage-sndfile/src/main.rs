//! mirage-sndfile - Main entry point
//!
//! Command-line front end for the SNDFILE filter stream:
//! - `info`: show the format of an audio file and its virtual PCM stream
//! - `extract`: dump virtual PCM bytes of an audio file
//! - `import`: write raw 44.1 kHz stereo PCM into a new audio file

use std::fs::File;
use std::io::{self, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use mirage_common::{FileStream, FilterStream, SimplifiedStream};
use mirage_sndfile::config::TomlConfig;
use mirage_sndfile::filter::write::copy_whole_frames;
use mirage_sndfile::{ResamplerQuality, SndfileFilterStream, SndfileOptions};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line arguments for mirage-sndfile
#[derive(Parser, Debug)]
#[command(name = "mirage-sndfile")]
#[command(about = "Present audio files as CD-DA PCM streams")]
#[command(version)]
struct Args {
    /// Configuration file (TOML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Resampler interpolation (nearest, linear, cubic, quintic, septic)
    #[arg(short, long, global = true)]
    quality: Option<ResamplerQuality>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show audio format and virtual stream geometry
    Info {
        /// Audio file
        input: PathBuf,
    },

    /// Write virtual PCM data to a file or stdout
    Extract {
        /// Audio file
        input: PathBuf,

        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Byte offset into the virtual stream
        #[arg(long, default_value = "0")]
        offset: u64,

        /// Number of bytes to extract (to end of stream if omitted)
        #[arg(long)]
        length: Option<u64>,
    },

    /// Create an audio file from raw 16-bit stereo 44.1 kHz PCM
    Import {
        /// Raw PCM input
        raw: PathBuf,

        /// Audio file to create; the suffix selects the container
        output: PathBuf,
    },
}

fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse();

    let config: TomlConfig =
        mirage_common::config::load_config(args.config.as_deref()).unwrap_or_default();

    // Initialize tracing; RUST_LOG takes precedence over the config file
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.logging.level.as_str().into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let options = config.filter_options(args.quality);

    match args.command {
        Command::Info { input } => run_info(&input, &options),
        Command::Extract {
            input,
            output,
            offset,
            length,
        } => run_extract(&input, output.as_deref(), offset, length, &options),
        Command::Import { raw, output } => run_import(&raw, &output),
    }
}

fn open_filter(input: &std::path::Path, options: &SndfileOptions) -> Result<SndfileFilterStream> {
    let stream = FileStream::open(input)
        .with_context(|| format!("Failed to open {}", input.display()))?;

    SndfileFilterStream::open_with_options(Box::new(stream), false, options)
        .with_context(|| format!("Failed to open {} as audio", input.display()))
}

fn run_info(input: &std::path::Path, options: &SndfileOptions) -> Result<()> {
    let filter = open_filter(input, options)?;
    let format = filter.format();
    let geometry = filter.geometry();
    let filter_info = filter.info();

    println!("{} ({})", filter_info.name, filter_info.id);
    println!("File:          {}", input.display());
    println!("Container:     {}", format.container);
    println!("Sample rate:   {} Hz", format.sample_rate);
    println!("Channels:      {}", format.channels);
    println!("Frames:        {}", format.frames);
    println!("Sections:      {}", format.sections);
    println!(
        "Resampling:    {}",
        if filter.is_resampling() {
            format!("yes ({:?})", options.resampler_quality)
        } else {
            "no".to_string()
        }
    );
    println!("Stream length: {} bytes", geometry.length);
    println!("Block size:    {} bytes", geometry.block_size);
    println!("Sectors:       {:.2}", geometry.length as f64 / 2352.0);

    Ok(())
}

fn run_extract(
    input: &std::path::Path,
    output: Option<&std::path::Path>,
    offset: u64,
    length: Option<u64>,
    options: &SndfileOptions,
) -> Result<()> {
    let filter = open_filter(input, options)?;
    let mut pcm = SimplifiedStream::new(filter);
    pcm.seek(SeekFrom::Start(offset))
        .context("Failed to seek in virtual stream")?;

    let limit = length.unwrap_or(u64::MAX);
    let mut source = (&mut pcm).take(limit);

    let copied = match output {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create {}", path.display()))?;
            let mut writer = BufWriter::new(file);
            let copied = io::copy(&mut source, &mut writer).context("Failed to extract PCM")?;
            writer.flush()?;
            copied
        }
        None => {
            let stdout = io::stdout();
            let mut writer = stdout.lock();
            io::copy(&mut source, &mut writer).context("Failed to extract PCM")?
        }
    };

    info!("Extracted {} bytes starting at offset {}", copied, offset);
    Ok(())
}

fn run_import(raw: &std::path::Path, output: &std::path::Path) -> Result<()> {
    let mut input =
        File::open(raw).with_context(|| format!("Failed to open {}", raw.display()))?;

    let stream = FileStream::create(output)
        .with_context(|| format!("Failed to create {}", output.display()))?;
    let mut pcm = SimplifiedStream::<SndfileFilterStream>::open(Box::new(stream), true)
        .with_context(|| format!("Failed to create audio file {}", output.display()))?;

    let (copied, trailing) =
        copy_whole_frames(&mut input, &mut pcm).context("Failed to write PCM")?;
    if trailing > 0 {
        warn!("Ignoring {} trailing bytes that do not form a whole frame", trailing);
    }
    pcm.flush()?;

    info!(
        "Imported {} bytes into {} ({} bytes in stream)",
        copied,
        output.display(),
        pcm.stream_length()
    );
    Ok(())
}
